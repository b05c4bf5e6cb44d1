use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The closed set of access levels. Stored as the Postgres enum `user_role` and
/// serialized as the lowercase variant name (`"user"`, `"admin"`) in JSON and in
/// token claims. Any other string fails to deserialize.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User
///
/// The canonical user record as held by the credential store. It deliberately does
/// not implement `Serialize`: responses go through [`UserProfile`], which has no
/// secret field.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    /// Primary key. Assigned at creation and never changed.
    pub id: Uuid,
    pub name: String,
    /// Login identifier, unique across all records.
    pub email: String,
    pub role: Role,
    /// bcrypt hash of the user's secret.
    pub password_hash: String,
    /// Set for accounts created with the placeholder secret.
    pub must_reset_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// NewUser
///
/// Insert payload for the credential store. The secret is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    pub must_reset_password: bool,
}

/// UserPatch
///
/// Partial update applied by `update_by_id`. `None` leaves the column untouched.
/// There is no `id` field: identity is immutable.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
    pub must_reset_password: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.password_hash.is_none()
            && self.must_reset_password.is_none()
    }
}

/// UserFilter
///
/// Equality filter for `find` / `find_one`. Unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct UserFilter {
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl UserFilter {
    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, user: &User) -> bool {
        self.email.as_deref().is_none_or(|email| user.email == email)
            && self.role.is_none_or(|role| user.role == role)
    }
}

// --- Output Schemas ---

/// UserProfile
///
/// The public view of a user returned by every read path. The password hash never
/// reaches this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub must_reset_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            must_reset_password: user.must_reset_password,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// MessageResponse
///
/// Plain `{"message": ...}` acknowledgement (signup, delete, password change).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// LoginResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    /// Seconds until the token expires.
    pub expires_in: u64,
    pub role: Role,
    pub must_reset_password: bool,
}

// --- Request Payloads (Input Schemas) ---

/// SignupRequest
///
/// Self-registration payload (POST /api/auth/signup). Signup never grants `admin`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// CreateUserRequest
///
/// Payload for POST /api/users. No secret is accepted; the account receives the
/// placeholder secret and must reset it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// UpdateUserRequest
///
/// Partial update payload for PUT /api/users/{id}. Unknown fields (including any
/// attempt to set `id` or `password`) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}
