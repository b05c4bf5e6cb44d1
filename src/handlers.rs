use crate::{
    AppState,
    auth::{AuthUser, authorize},
    errors::ApiError,
    extract::{ApiJson, ApiQuery},
    models::{
        ChangePasswordRequest, CreateUserRequest, LoginRequest, LoginResponse, MessageResponse,
        NewUser, Role, SignupRequest, UpdateUserRequest, UserFilter, UserPatch, UserProfile,
    },
    password::{self, PLACEHOLDER_PASSWORD},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

// --- Helpers ---

/// Ids that are not UUIDs cannot exist in the store, so they read as "not found".
fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}

fn required_field(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn normalize_email(value: &str) -> Result<String, ApiError> {
    Ok(required_field(value, "email")?.to_lowercase())
}

// --- Auth Handlers ---

/// signup
///
/// [Public Route] Self-registration. The account always gets the `user` role.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Registered", body = MessageResponse),
        (status = 409, description = "Email already registered", body = MessageResponse)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let name = required_field(&payload.name, "name")?;
    let email = normalize_email(&payload.email)?;
    if payload.password.is_empty() {
        return Err(ApiError::Validation("password is required".to_string()));
    }

    let password_hash = password::hash_password(&payload.password, state.config.bcrypt_cost).await?;
    let user = state
        .repo
        .create(NewUser {
            name,
            email,
            role: Role::User,
            password_hash,
            must_reset_password: false,
        })
        .await?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully")),
    ))
}

/// login
///
/// [Public Route] Exchanges email and password for a bearer token. Unknown email
/// and wrong password produce the same answer.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Invalid credentials", body = MessageResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let Some(user) = state.repo.find_one(UserFilter::by_email(email)).await? else {
        password::verify_against_dummy(&payload.password, state.config.bcrypt_cost).await?;
        tracing::info!("login rejected: unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !password::verify_password(&payload.password, &user.password_hash).await? {
        tracing::info!(user_id = %user.id, "login rejected: wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .tokens
        .issue(&user.id.to_string(), user.role)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(user_id = %user.id, role = %user.role, "token issued");
    Ok(Json(LoginResponse {
        token,
        expires_in: state.tokens.ttl().as_secs(),
        role: user.role,
        must_reset_password: user.must_reset_password,
    }))
}

/// change_password
///
/// [Authenticated Route] Replaces the caller's own secret and clears the
/// `must_reset_password` flag.
#[utoipa::path(
    put,
    path = "/api/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid credentials", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = MessageResponse)
    )
)]
pub async fn change_password(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.new_password.is_empty() {
        return Err(ApiError::Validation("new_password is required".to_string()));
    }

    // The token may outlive the account it was issued for.
    let user_id = parse_user_id(&id)?;
    let user = state.repo.find_by_id(user_id).await?.ok_or(ApiError::NotFound)?;

    if !password::verify_password(&payload.current_password, &user.password_hash).await? {
        return Err(ApiError::InvalidCredentials);
    }

    let password_hash = password::hash_password(&payload.new_password, state.config.bcrypt_cost).await?;
    state
        .repo
        .update_by_id(
            user_id,
            UserPatch {
                password_hash: Some(password_hash),
                must_reset_password: Some(false),
                ..UserPatch::default()
            },
        )
        .await?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(%user_id, "password changed");
    Ok(Json(MessageResponse::new("Password updated")))
}

// --- User Handlers ---

/// get_users
///
/// [Authenticated Route] Lists users, optionally filtered by `email` or `role`.
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserFilter),
    responses(
        (status = 200, description = "Users", body = [UserProfile]),
        (status = 401, description = "Missing or invalid token", body = MessageResponse)
    )
)]
pub async fn get_users(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let users = state.repo.find(filter).await?;
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

/// get_user
///
/// [Authenticated Route] Reads one user by id.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserProfile),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let id = parse_user_id(&id)?;
    match state.repo.find_by_id(id).await? {
        Some(user) => Ok(Json(user.into())),
        None => Err(ApiError::NotFound),
    }
}

/// create_user
///
/// [Authenticated Route] Creates a user on someone else's behalf. The account gets
/// the placeholder secret and is flagged for a reset. Only admins may create admins.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserProfile),
        (status = 403, description = "Only admins may grant admin", body = MessageResponse),
        (status = 409, description = "Email already registered", body = MessageResponse)
    )
)]
pub async fn create_user(
    caller: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let role = payload.role.unwrap_or_default();
    if role == Role::Admin {
        authorize(&caller, Role::Admin)?;
    }

    let name = required_field(&payload.name, "name")?;
    let email = normalize_email(&payload.email)?;
    let password_hash = password::hash_password(PLACEHOLDER_PASSWORD, state.config.bcrypt_cost).await?;

    let user = state
        .repo
        .create(NewUser {
            name,
            email,
            role,
            password_hash,
            must_reset_password: true,
        })
        .await?;

    tracing::info!(user_id = %user.id, created_by = %caller.id, %role, "user created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// update_user
///
/// [Authenticated Route] Partial update of name, email or role. Changing a role
/// requires an admin caller.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 403, description = "Only admins may change roles", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn update_user(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let id = parse_user_id(&id)?;
    if payload.role.is_some() {
        authorize(&caller, Role::Admin)?;
    }

    let patch = UserPatch {
        name: payload.name.as_deref().map(|n| required_field(n, "name")).transpose()?,
        email: payload.email.as_deref().map(normalize_email).transpose()?,
        role: payload.role,
        ..UserPatch::default()
    };

    let updated = if patch.is_empty() {
        state.repo.find_by_id(id).await?
    } else {
        state.repo.update_by_id(id, patch).await?
    };

    match updated {
        Some(user) => Ok(Json(user.into())),
        None => Err(ApiError::NotFound),
    }
}

/// delete_user
///
/// [Admin Route] Removes a user. The admin check runs in the route layer before
/// this handler is reached.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Admins only", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn delete_user(
    AuthUser { id: admin_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_user_id(&id)?;
    match state.repo.delete_by_id(id).await? {
        Some(user) => {
            tracing::info!(user_id = %user.id, deleted_by = %admin_id, "user deleted");
            Ok(Json(MessageResponse::new("User deleted")))
        }
        None => Err(ApiError::NotFound),
    }
}
