//! Process configuration.
//!
//! Everything is read once from the environment at startup and then shared
//! read-only for the lifetime of the process.

use std::time::Duration;

use jsonwebtoken::Algorithm;
use thiserror::Error;

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_MINUTES: u64 = 365 * 24 * 60;

/// Longest accepted delegated login timeout.
pub const MAX_BACKEND_TIMEOUT_SECS: u64 = 600;

/// Errors raised while loading configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is absent or empty.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A variable is present but cannot be interpreted.
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Local developer credential rule used by the zero-dependency login path.
#[derive(Debug, Clone)]
pub struct DevCredentials {
    pub email: String,
    pub password: String,
}

/// Configuration of the bearer-token gateway.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared signing secret.
    pub jwt_secret: String,
    /// Signing algorithm, restricted to the HMAC family.
    pub jwt_algorithm: Algorithm,
    /// Default token lifetime.
    pub token_ttl: Duration,
    /// Route on which this service issues tokens.
    pub token_route: String,
    /// Base URL of the external identity provider.
    pub backend_url: Option<String>,
    /// Login sub-route on the identity provider.
    pub backend_login_route: String,
    /// Upper bound on the delegated login call.
    pub backend_timeout: Duration,
    /// Optional local developer credentials.
    pub dev_credentials: Option<DevCredentials>,
}

impl AuthConfig {
    /// Minimal configuration with only a signing secret; both login paths disabled.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            jwt_algorithm: Algorithm::HS256,
            token_ttl: Duration::from_secs(30 * 60),
            token_route: format!("{}/auth/login", crate::api_prefix()),
            backend_url: None,
            backend_login_route: "/auth/login".to_string(),
            backend_timeout: Duration::from_secs(10),
            dev_credentials: None,
        }
    }

    /// Full URL of the delegated login endpoint, if a provider is configured.
    pub fn backend_login_url(&self) -> Option<String> {
        self.backend_url.as_ref().map(|base| {
            format!(
                "{}{}",
                base.trim_end_matches('/'),
                self.backend_login_route
            )
        })
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address the HTTP server binds to.
    pub bind_addr: String,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let jwt_algorithm = match get("JWT_SIGN_ALG") {
            Some(alg) => parse_algorithm(&alg)?,
            None => Algorithm::HS256,
        };

        let ttl_minutes = parse_number(
            get("TOKEN_TTL_MINUTES"),
            "TOKEN_TTL_MINUTES",
            30,
            MAX_TOKEN_TTL_MINUTES,
        )?;
        let timeout_secs = parse_number(
            get("AUTH_BACKEND_TIMEOUT_SECS"),
            "AUTH_BACKEND_TIMEOUT_SECS",
            10,
            MAX_BACKEND_TIMEOUT_SECS,
        )?;
        let token_route = match get("AUTH_TOKEN_ROUTE") {
            Some(route) => validate_token_route(route)?,
            None => format!("{}/auth/login", crate::api_prefix()),
        };

        let dev_credentials = get("AUTH_DEV_EMAIL").map(|email| DevCredentials {
            email,
            password: lookup("AUTH_DEV_PASSWORD").unwrap_or_default(),
        });

        let host = get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = get("PORT").unwrap_or_else(|| "8080".to_string());
        port.parse::<u16>().map_err(|_| ConfigError::Invalid {
            name: "PORT",
            value: port.clone(),
        })?;

        Ok(Self {
            bind_addr: format!("{}:{}", host, port),
            auth: AuthConfig {
                jwt_secret,
                jwt_algorithm,
                token_ttl: Duration::from_secs(ttl_minutes * 60),
                token_route,
                backend_url: get("AUTH_BACKEND_URL"),
                backend_login_route: get("AUTH_BACKEND_LOGIN_ROUTE")
                    .unwrap_or_else(|| "/auth/login".to_string()),
                backend_timeout: Duration::from_secs(timeout_secs),
                dev_credentials,
            },
        })
    }
}

/// Only shared-secret algorithms make sense with a single process-wide secret.
fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(ConfigError::Invalid {
            name: "JWT_SIGN_ALG",
            value: value.to_string(),
        }),
    }
}

/// The token route is mounted next to the fixed routes; it must be a plain
/// absolute path that none of them already claims.
fn validate_token_route(route: String) -> Result<String, ConfigError> {
    let prefix = crate::api_prefix();
    let fixed = [
        format!("{}/status/", prefix),
        format!("{}/auth/refresh", prefix),
        format!("{}/models/", prefix),
        format!("{}/models/implemented", prefix),
    ];
    let route_trimmed = route.trim();
    let malformed = !route_trimmed.starts_with('/')
        || route_trimmed.contains(|c: char| c == ':' || c == '*' || c.is_whitespace());
    let collides = fixed.iter().any(|r| r == route_trimmed)
        || route_trimmed.starts_with(&format!("{}/models/", prefix));
    if malformed || collides {
        return Err(ConfigError::Invalid {
            name: "AUTH_TOKEN_ROUTE",
            value: route,
        });
    }
    Ok(route_trimmed.to_string())
}

fn parse_number(
    value: Option<String>,
    name: &'static str,
    default: u64,
    max: u64,
) -> Result<u64, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(n) if (1..=max).contains(&n) => Ok(n),
            _ => Err(ConfigError::Invalid { name, value: raw }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_secret_only() {
        let config = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.auth.jwt_algorithm, Algorithm::HS256);
        assert_eq!(config.auth.token_ttl, Duration::from_secs(1800));
        assert_eq!(config.auth.backend_timeout, Duration::from_secs(10));
        assert!(config.auth.backend_url.is_none());
        assert!(config.auth.dev_credentials.is_none());
        assert_eq!(
            config.auth.token_route,
            format!("{}/auth/login", crate::api_prefix())
        );
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn test_non_hmac_algorithm_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_SIGN_ALG", "RS256"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "JWT_SIGN_ALG", .. }));
    }

    #[test]
    fn test_backend_and_dev_credentials() {
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_SIGN_ALG", "hs512"),
            ("AUTH_BACKEND_URL", "http://idp.local/"),
            ("AUTH_BACKEND_LOGIN_ROUTE", "/api/v1/auth/login"),
            ("AUTH_DEV_EMAIL", "dev@example.org"),
            ("AUTH_DEV_PASSWORD", "letmein"),
            ("PORT", "9000"),
        ]))
        .unwrap();
        assert_eq!(config.auth.jwt_algorithm, Algorithm::HS512);
        assert_eq!(
            config.auth.backend_login_url().as_deref(),
            Some("http://idp.local/api/v1/auth/login")
        );
        let dev = config.auth.dev_credentials.unwrap();
        assert_eq!(dev.email, "dev@example.org");
        assert_eq!(dev.password, "letmein");
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("TOKEN_TTL_MINUTES", "0"),
        ]))
        .is_err());
        assert!(AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s3cret"), ("PORT", "http")])).is_err());
    }

    #[test]
    fn test_oversized_durations_are_rejected() {
        let max_ttl = MAX_TOKEN_TTL_MINUTES.to_string();
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("TOKEN_TTL_MINUTES", max_ttl.as_str()),
        ]))
        .unwrap();
        assert_eq!(
            config.auth.token_ttl,
            Duration::from_secs(MAX_TOKEN_TTL_MINUTES * 60)
        );

        let too_long = (MAX_TOKEN_TTL_MINUTES + 1).to_string();
        let huge = u64::MAX.to_string();
        for ttl in [too_long.as_str(), huge.as_str()] {
            let err = AppConfig::from_lookup(lookup(&[
                ("JWT_SECRET", "s3cret"),
                ("TOKEN_TTL_MINUTES", ttl),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { name: "TOKEN_TTL_MINUTES", .. }));
        }

        let err = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("AUTH_BACKEND_TIMEOUT_SECS", "601"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { name: "AUTH_BACKEND_TIMEOUT_SECS", .. }
        ));
    }

    #[test]
    fn test_token_route_validation() {
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("AUTH_TOKEN_ROUTE", "/token"),
        ]))
        .unwrap();
        assert_eq!(config.auth.token_route, "/token");

        let refresh = format!("{}/auth/refresh", crate::api_prefix());
        let model = format!("{}/models/login", crate::api_prefix());
        for route in ["token", "/auth/:user", refresh.as_str(), model.as_str()] {
            let err = AppConfig::from_lookup(lookup(&[
                ("JWT_SECRET", "s3cret"),
                ("AUTH_TOKEN_ROUTE", route),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { name: "AUTH_TOKEN_ROUTE", .. }));
        }
    }
}
