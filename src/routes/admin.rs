use crate::{AppState, auth, handlers};
use axum::{Router, middleware, routing::delete};

/// Admin Router Module
///
/// Routes restricted to the `admin` role. The `require_admin` layer is applied
/// here, once, for the whole module; `create_router` then nests it inside the
/// authentication layer so the role check always sees a verified identity.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // DELETE /api/users/{id}
        // Removes a user. Non-admins get 403 before the handler runs.
        .route("/api/users/{id}", delete(handlers::delete_user))
        .route_layer(middleware::from_fn(auth::require_admin))
}
