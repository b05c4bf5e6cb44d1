use crate::models::{NewUser, User, UserFilter, UserPatch};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// RepositoryError
///
/// Failures the credential store reports to its callers. "Not found" is not an
/// error here; lookups return `Option`.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The email is already used by another record.
    #[error("email already in use")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::DuplicateEmail,
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The credential store contract the handlers depend on. Handlers only ever see
/// `Arc<dyn Repository>`, so Postgres and the in-memory store are interchangeable.
///
/// **Send + Sync + async_trait** are required to share the trait object across
/// Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>>;
    /// First record matching the filter, if any.
    async fn find_one(&self, filter: UserFilter) -> RepositoryResult<Option<User>>;
    /// All matching records, oldest first.
    async fn find(&self, filter: UserFilter) -> RepositoryResult<Vec<User>>;
    async fn create(&self, user: NewUser) -> RepositoryResult<User>;
    /// Applies the patch and returns the updated record, or `None` if absent.
    async fn update_by_id(&self, id: Uuid, patch: UserPatch) -> RepositoryResult<Option<User>>;
    /// Removes the record and returns it, or `None` if absent.
    async fn delete_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str =
    "id, name, email, role, password_hash, must_reset_password, created_at, updated_at";

/// PostgresRepository
///
/// The production implementation backed by the `users` table (see `migrations/`).
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends `WHERE` clauses for every set filter field.
    fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: UserFilter) {
        let mut prefix = " WHERE ";
        if let Some(email) = filter.email {
            builder.push(prefix).push("email = ").push_bind(email);
            prefix = " AND ";
        }
        if let Some(role) = filter.role {
            builder.push(prefix).push("role = ").push_bind(role);
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_one(&self, filter: UserFilter) -> RepositoryResult<Option<User>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        Self::push_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at, id LIMIT 1");

        let user = builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// find
    ///
    /// Filtered listing built with QueryBuilder so every value is a bound parameter.
    async fn find(&self, filter: UserFilter) -> RepositoryResult<Vec<User>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        Self::push_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at, id");

        let users = builder.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, role, password_hash, must_reset_password, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user.name)
        .bind(user.email)
        .bind(user.role)
        .bind(user.password_hash)
        .bind(user.must_reset_password)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// update_by_id
    ///
    /// Uses `COALESCE` so that `None` fields keep their current value.
    async fn update_by_id(&self, id: Uuid, patch: UserPatch) -> RepositoryResult<Option<User>> {
        let updated = sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET name = COALESCE($2, name), \
                 email = COALESCE($3, email), \
                 role = COALESCE($4, role), \
                 password_hash = COALESCE($5, password_hash), \
                 must_reset_password = COALESCE($6, must_reset_password), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.email)
        .bind(patch.role)
        .bind(patch.password_hash)
        .bind(patch.must_reset_password)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let deleted = sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(deleted)
    }
}

/// InMemoryRepository
///
/// A process-local store used for local development without `DATABASE_URL` and
/// by the test suite. Records are kept in insertion order and the email uniqueness
/// rule matches the Postgres unique index.
#[derive(Default)]
pub struct InMemoryRepository {
    users: RwLock<Vec<User>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_one(&self, filter: UserFilter) -> RepositoryResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| filter.matches(u)).cloned())
    }

    async fn find(&self, filter: UserFilter) -> RepositoryResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(users.iter().filter(|u| filter.matches(u)).cloned().collect())
    }

    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::DuplicateEmail);
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            role: user.role,
            password_hash: user.password_hash,
            must_reset_password: user.must_reset_password,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn update_by_id(&self, id: Uuid, patch: UserPatch) -> RepositoryResult<Option<User>> {
        let mut users = self.users.write().await;

        // A missing record wins over an email clash, as with `UPDATE ... WHERE id`.
        let Some(index) = users.iter().position(|u| u.id == id) else {
            return Ok(None);
        };

        if let Some(email) = &patch.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(RepositoryError::DuplicateEmail);
            }
        }

        let user = &mut users[index];

        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        if let Some(flag) = patch.must_reset_password {
            user.must_reset_password = flag;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn delete_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users
            .iter()
            .position(|u| u.id == id)
            .map(|index| users.remove(index)))
    }
}
