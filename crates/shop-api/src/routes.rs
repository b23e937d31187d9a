//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::error::panic_response;
use crate::handlers;
use crate::middleware::{capture_raw_body, require_principal};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

/// Create the main application router
///
/// Routes:
/// - GET  /, /health - Health check
/// - GET  /products - Catalog listing
/// - POST /stripe/create-checkout-session - Create checkout session
/// - POST /stripe/webhook - Stripe webhook (raw body)
/// - POST /auth/verify - Verify an ID token
/// - POST /auth/register - Create an account
/// - GET  /auth/user/{uid} - Read own profile (auth gate)
/// - PUT  /auth/user/{uid} - Update own profile (auth gate)
pub fn create_router(state: AppState) -> Router {
    let stripe_routes = Router::new()
        .route(
            "/create-checkout-session",
            post(handlers::create_checkout_session),
        )
        .route(
            "/webhook",
            post(handlers::stripe_webhook)
                .layer(middleware::from_fn_with_state(state.clone(), capture_raw_body)),
        );

    let user_routes = Router::new()
        .route(
            "/user/{uid}",
            get(handlers::get_user).put(handlers::update_user),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_principal));

    let auth_routes = Router::new()
        .route("/verify", post(handlers::verify_token))
        .route("/register", post(handlers::register))
        .merge(user_routes);

    let router = Router::new()
        .route("/", get(handlers::health))
        .route("/health", get(handlers::health))
        .route("/products", get(handlers::list_products))
        .nest("/stripe", stripe_routes)
        .nest("/auth", auth_routes);

    with_service_layers(router).with_state(state)
}

/// Tracing, CORS and the panic boundary, outermost first
fn with_service_layers(router: Router<AppState>) -> Router<AppState> {
    // Mirrors the request origin, so credentialed browser calls work
    let cors = CorsLayer::very_permissive();

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(CatchPanicLayer::custom(panic_response)),
    )
}
