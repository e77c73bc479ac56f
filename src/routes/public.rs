use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any
/// client. These are the identity gateway (registration, login) and the
/// monitoring check; everything else in the application sits behind the
/// bearer-token layer.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load
        // balancer checks. Returns "ok" immediately.
        .route("/health", get(|| async { "ok" }))
        // POST /api/users/register
        // New account creation. Enforces username/email uniqueness (409).
        .route("/api/users/register", post(handlers::register_user))
        // POST /api/users/login
        // Credential verification and bearer-token issuance.
        .route("/api/users/login", post(handlers::login))
}
