//! Fixtures shared by the unit tests: a throwaway RSA key and token minting.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

pub const PROJECT_ID: &str = "shop-9thform";
pub const KID: &str = "test-key-1";
pub const PRIVATE_KEY_PEM: &str = include_str!("../testdata/rsa_private.pem");

const MODULUS: &str = "2UWCdPIGxxLn1kv4p9WlmCIhGsHu3f9LaUewS4oYNvJSnZmZccEaCcQn3lXwswWNg7zcsNE7wdinUoScj78VfKEEbrUiEBgTwUzkdfPPxXMPXpd6hW4MOtJs9LjjMA14eo_H6eTxHhxNxXmBEqhO4WAQZa52gvkAPhmvmPIgftZnXZUh1lHPVMU0g5K2EXzQpEaXS8vGPx_WaGH6IuxlxmufOzPs5Qv20LE0SUIUIgdQCk-ViQJtBBdP1u59Bqxh_hHSk51fKASnl9eIffOzj8bgFCY0ywX2YAgzEB5VLo_4bwx9u5f5qxCEwteSGLBIt3b8l5jBQGmW62khH-aPjQ";

pub fn jwks() -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "kid": KID,
            "n": MODULUS,
            "e": "AQAB"
        }]
    })
}

/// Claims of a freshly issued ID token for `uid`
pub fn claims(uid: &str) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "iss": format!("https://securetoken.google.com/{}", PROJECT_ID),
        "aud": PROJECT_ID,
        "auth_time": now - 60,
        "user_id": uid,
        "sub": uid,
        "iat": now - 60,
        "exp": now + 3600,
        "email": "buyer@example.com",
        "email_verified": true,
        "firebase": {
            "identities": { "email": ["buyer@example.com"] },
            "sign_in_provider": "password"
        }
    })
}

pub fn sign_with_kid(claims: &Value, kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY_PEM.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

pub fn sign(claims: &Value) -> String {
    sign_with_kid(claims, KID)
}
