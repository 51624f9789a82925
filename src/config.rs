use std::env;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    // Shared secret for signed billing events (events endpoint disabled when unset)
    pub billing_webhook_secret: Option<String>,
    // Pterodactyl panel HTTP client
    pub panel_request_timeout_secs: u64,
    // Guest endpoints
    pub guest_rate_limit_per_minute: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

fn parse_var<T>(var: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env::var(var)
        .ok()
        .map(|v| {
            v.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                var: var.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ok if it doesn't exist)
        // Skip loading .env in test mode to allow tests to control env vars
        if env::var("PTERO_TEST_MODE").is_err() {
            dotenvy::dotenv().ok();
        }

        // Required variables
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;

        // Optional variables with defaults
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = parse_var::<u16>("PORT")?.unwrap_or(8080);

        let billing_webhook_secret = env::var("BILLING_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let panel_request_timeout_secs =
            parse_var::<u64>("PANEL_REQUEST_TIMEOUT_SECS")?.unwrap_or(30);

        let guest_rate_limit_per_minute =
            parse_var::<u32>("GUEST_RATE_LIMIT_PER_MINUTE")?.unwrap_or(30);
        if guest_rate_limit_per_minute == 0 {
            return Err(ConfigError::InvalidValue {
                var: "GUEST_RATE_LIMIT_PER_MINUTE".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            billing_webhook_secret,
            panel_request_timeout_secs,
            guest_rate_limit_per_minute,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
