use crate::utils::error::{AppError, AppResult};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://kartchat.db?mode=rwc";
pub const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    /// Exact origin allowed to call the API with credentials. `None` means
    /// any origin, without credentials.
    pub client_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Internal("JWT_SECRET not set".to_string()))?;

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| AppError::Internal(format!("Invalid PORT value: {}", raw)))?,
            None => DEFAULT_PORT,
        };

        let client_origin = lookup("CLIENT_ORIGIN").filter(|o| !o.is_empty() && o != "*");

        Ok(Self {
            database_url,
            jwt_secret,
            port,
            client_origin,
        })
    }
}
