use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct EnvVars {
    pub database_url: String,
    pub database_max_connections: u32,
    pub mailchimp_api_key: String,
    pub mailchimp_api_base_url: Option<String>, // Override for testing
    pub port: u16,
    // CORS configuration; empty means any origin
    pub cors_allowed_origins: Vec<String>,
}

impl EnvVars {
    /// Read configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first if `.env` files should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS", 20)?,
            mailchimp_api_key: required("MAILCHIMP_API_KEY")?,
            mailchimp_api_base_url: optional("MAILCHIMP_API_BASE_URL"),
            port: parsed("PORT", 3002)?,
            cors_allowed_origins: optional("CORS_ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
