use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token. Login is the only place tokens are issued.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/signup
        // Self-registration; always creates a `user`.
        .route("/api/auth/signup", post(handlers::signup))
        // POST /api/auth/login
        // Exchanges credentials for a bearer token.
        .route("/api/auth/login", post(handlers::login))
}
