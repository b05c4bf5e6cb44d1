use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod token;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::AuthUser;
pub use config::AppConfig;
pub use errors::ApiError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use token::TokenService;

/// ApiDoc
///
/// OpenAPI document for every handler and schema, served at `/api-docs/openapi.json`
/// and browsable through Swagger UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::signup, handlers::login, handlers::change_password,
        handlers::get_users, handlers::get_user, handlers::create_user,
        handlers::update_user, handlers::delete_user
    ),
    components(
        schemas(
            models::Role, models::UserProfile, models::MessageResponse, models::LoginResponse,
            models::SignupRequest, models::LoginRequest, models::ChangePasswordRequest,
            models::CreateUserRequest, models::UpdateUserRequest,
        )
    ),
    tags(
        (name = "user-gate", description = "Authenticated user management API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, cloneable container of everything a request may need. Only the
/// repository holds mutable data; the token service and config are fixed at startup.
#[derive(Clone)]
pub struct AppState {
    /// Credential store, Postgres or in-memory.
    pub repo: RepositoryState,
    /// Token issuance and verification, keyed by the process-wide secret.
    pub tokens: Arc<TokenService>,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the state from a loaded config, deriving the token service from it.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        let tokens = Arc::new(TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl));
        Self { repo, tokens, config }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(app_state: &AppState) -> Arc<TokenService> {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing structure and the gate chain:
/// request → `authenticate` → (`require_admin`) → handler.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // Admin routes are merged first so the authentication layer below wraps them too.
    let protected = authenticated::authenticated_routes()
        .merge(admin::admin_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(protected)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// ensure_admin
///
/// Creates the configured bootstrap admin if no account uses its email yet. An
/// existing account is left untouched, whatever its role. Returns whether a
/// record was created.
pub async fn ensure_admin(
    repo: &RepositoryState,
    seed: &config::AdminSeed,
    bcrypt_cost: u32,
) -> Result<bool, ApiError> {
    let email = seed.email.trim().to_lowercase();
    if repo
        .find_one(models::UserFilter::by_email(email.clone()))
        .await?
        .is_some()
    {
        return Ok(false);
    }

    let password_hash = password::hash_password(&seed.password, bcrypt_cost).await?;
    let admin = repo
        .create(models::NewUser {
            name: "Administrator".to_string(),
            email,
            role: models::Role::Admin,
            password_hash,
            must_reset_password: false,
        })
        .await?;

    tracing::info!(user_id = %admin.id, "bootstrap admin created");
    Ok(true)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` set by the layer above
/// so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
