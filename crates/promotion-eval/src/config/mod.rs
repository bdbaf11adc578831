use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::promotion::access::{AccessPolicy, CallerRole};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub access: AccessConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "5001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let reader_tokens = parse_token_list("APP_READER_TOKENS")?;
        let admin_tokens = parse_token_list("APP_ADMIN_TOKENS")?;

        if environment == AppEnvironment::Production
            && reader_tokens.is_empty()
            && admin_tokens.is_empty()
        {
            return Err(ConfigError::MissingTokens);
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            access: AccessConfig {
                reader_tokens,
                admin_tokens,
            },
        })
    }
}

fn parse_token_list(key: &'static str) -> Result<Vec<String>, ConfigError> {
    let raw = match env::var(key) {
        Ok(raw) => raw,
        Err(_) => return Ok(Vec::new()),
    };

    let mut tokens = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        if token.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidToken { key });
        }
        tokens.push(token.to_string());
    }
    Ok(tokens)
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Bearer tokens accepted by the API, grouped by role.
#[derive(Debug, Clone, Default)]
pub struct AccessConfig {
    pub reader_tokens: Vec<String>,
    pub admin_tokens: Vec<String>,
}

impl AccessConfig {
    pub fn policy(&self) -> AccessPolicy {
        let mut policy = AccessPolicy::default();
        for token in &self.reader_tokens {
            policy.grant(token.clone(), CallerRole::Reader);
        }
        for token in &self.admin_tokens {
            policy.grant(token.clone(), CallerRole::Admin);
        }
        policy
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidToken { key: &'static str },
    MissingTokens,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidToken { key } => {
                write!(f, "{key} entries must not contain whitespace")
            }
            ConfigError::MissingTokens => write!(
                f,
                "production requires APP_READER_TOKENS or APP_ADMIN_TOKENS to be set"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidToken { .. }
            | ConfigError::MissingTokens => None,
        }
    }
}
