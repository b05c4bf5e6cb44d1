use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Authenticated Router Module
///
/// Routes open to any holder of a valid token, whatever the role. `create_router`
/// wraps this router in the `authenticate` layer, so every handler here can take
/// `AuthUser` as an argument.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET/POST /api/users
        // Lists users (never including secrets) and creates users with the placeholder secret.
        .route("/api/users", get(handlers::get_users).post(handlers::create_user))
        // GET/PUT /api/users/{id}
        // Reads or partially updates one user. Role changes are checked in the handler.
        .route(
            "/api/users/{id}",
            get(handlers::get_user).put(handlers::update_user),
        )
        // PUT /api/auth/password
        // Changes the caller's own password and clears the reset flag.
        .route("/api/auth/password", put(handlers::change_password))
}
