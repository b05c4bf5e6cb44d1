use std::{env, fmt, time::Duration};

use thiserror::Error;

/// Fallback signing secret for local development only. Production refuses to start
/// without `JWT_SECRET`.
pub const LOCAL_JWT_SECRET: &str = "local-dev-secret-change-me";
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
pub const DEFAULT_PORT: u16 = 5000;

/// AppConfig
///
/// Holds the application's entire configuration. Loaded once at startup and
/// immutable afterwards; pulled into handlers and gates through `FromRef`.
/// The `Debug` output redacts the signing secret and the admin password.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Controls strictness and log format.
    pub env: Env,
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub database_url: Option<String>,
    // Process-wide secret used to sign and verify bearer tokens.
    pub jwt_secret: String,
    // Lifetime of every issued token.
    pub token_ttl: Duration,
    pub port: u16,
    // bcrypt work factor.
    pub bcrypt_cost: u32,
    // Admin account ensured at startup, when both parts are configured.
    pub bootstrap_admin: Option<AdminSeed>,
}

/// Env
///
/// Defines the runtime context: relaxed defaults locally, mandatory secrets in production.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

const REDACTED: &str = "<redacted>";

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("database_url", &self.database_url.as_ref().map(|_| REDACTED))
            .field("jwt_secret", &REDACTED)
            .field("token_ttl", &self.token_ttl)
            .field("port", &self.port)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("bootstrap_admin", &self.bootstrap_admin)
            .finish()
    }
}

impl fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &REDACTED)
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl Default for AppConfig {
    /// default
    ///
    /// A non-panicking configuration for tests: in-memory store, fixed secret and
    /// the cheapest bcrypt cost.
    fn default() -> Self {
        Self {
            env: Env::Local,
            database_url: None,
            jwt_secret: "super-secure-test-secret-value-local".to_string(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            port: DEFAULT_PORT,
            bcrypt_cost: 4,
            bootstrap_admin: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables and fails fast when a
    /// value required for the current environment is missing or unparsable.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match (env, non_empty_var("JWT_SECRET")) {
            (_, Some(secret)) => secret,
            (Env::Production, None) => return Err(ConfigError::Missing("JWT_SECRET")),
            (Env::Local, None) => LOCAL_JWT_SECRET.to_string(),
        };

        let database_url = match (env, non_empty_var("DATABASE_URL")) {
            (Env::Production, None) => return Err(ConfigError::Missing("DATABASE_URL")),
            (_, url) => url,
        };

        let ttl_secs = parse_var("TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        if ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "TOKEN_TTL_SECS",
                value: "0".to_string(),
                reason: "must be greater than zero",
            });
        }

        let bcrypt_cost = parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
                reason: "must be between 4 and 31",
            });
        }

        let bootstrap_admin = match (non_empty_var("ADMIN_EMAIL"), non_empty_var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            _ => None,
        };

        Ok(Self {
            env,
            database_url,
            jwt_secret,
            token_ttl: Duration::from_secs(ttl_secs),
            port: parse_var("PORT", DEFAULT_PORT)?,
            bcrypt_cost,
            bootstrap_admin,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value,
            reason: "not a valid number",
        }),
    }
}
