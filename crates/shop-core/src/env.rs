//! # Environment Helpers
//!
//! Small helpers shared by the config loaders of every crate.
//! Secrets may be published under more than one name (deploy secret vs.
//! local `.env`), so lookups take an ordered list of fallbacks.

use std::env;

/// Return the first non-empty value among `names`.
pub fn secret_from_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Read `name`, falling back to `default` when unset or blank.
pub fn var_or(name: &str, default: &str) -> String {
    secret_from_env(&[name]).unwrap_or_else(|| default.to_string())
}

/// Strip a single trailing slash from a base URL.
pub fn trim_base_url(url: &str) -> String {
    url.strip_suffix('/').unwrap_or(url).to_string()
}

/// Split a comma separated list, dropping blanks.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
