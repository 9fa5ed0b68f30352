//! Configuration from the process environment.
//!
//! The service is configured entirely through environment variables; there
//! are no config files. `REDIS_ADDRS` is required and the process refuses to
//! start without it.

use anyhow::{bail, Context, Result};

/// Comma-separated `host:port` list of the key-value store (required).
pub const ENV_REDIS_ADDRS: &str = "REDIS_ADDRS";
/// Password for the key-value store (optional).
pub const ENV_REDIS_PASSWORD: &str = "REDIS_PASSWORD";
/// Build revision surfaced by the health endpoint (optional).
pub const ENV_REVISION: &str = "REVISION";
/// HTTP listen port (optional).
pub const ENV_HTTP_PORT: &str = "HTTP_PORT";

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key-value store connection settings.
    pub redis: RedisConfig,

    /// HTTP listener settings.
    pub http: HttpConfig,

    /// Build revision reported by the health endpoint.
    pub revision: String,
}

/// Key-value store connection settings.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// `host:port` addresses; the first one is dialled.
    pub addrs: Vec<String>,

    /// Optional AUTH password.
    pub password: Option<String>,
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Listen port.
    pub port: u16,
}

fn default_http_port() -> u16 {
    9580
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset, matching how the deployment
    /// tooling clears variables.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| get(name).filter(|value| !value.is_empty());

        let addrs_raw = get(ENV_REDIS_ADDRS).with_context(|| {
            format!("the {ENV_REDIS_ADDRS} environment variable is not specified")
        })?;
        let addrs: Vec<String> = addrs_raw
            .split(',')
            .map(|addr| addr.trim().to_string())
            .collect();

        let port = match get(ENV_HTTP_PORT) {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("{ENV_HTTP_PORT} must be a port number, got: {raw}"))?,
            None => default_http_port(),
        };

        let config = Config {
            redis: RedisConfig {
                addrs,
                password: get(ENV_REDIS_PASSWORD),
            },
            http: HttpConfig { port },
            revision: get(ENV_REVISION).unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        if self.redis.addrs.is_empty() {
            bail!("{ENV_REDIS_ADDRS} must contain at least one address");
        }
        if self.redis.addrs.iter().any(|addr| addr.is_empty()) {
            bail!("{ENV_REDIS_ADDRS} contains an empty address");
        }
        if self.http.port == 0 {
            bail!("{ENV_HTTP_PORT} must be non-zero");
        }
        Ok(())
    }
}

impl RedisConfig {
    /// Connection URL for the primary (first) address.
    pub fn primary_url(&self) -> String {
        let addr = &self.addrs[0];
        match &self.password {
            Some(password) => format!("redis://:{password}@{addr}"),
            None => format!("redis://{addr}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |name| map.get(name).map(|value| value.to_string())
    }

    #[test]
    fn test_requires_redis_addrs() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains(ENV_REDIS_ADDRS));
    }

    #[test]
    fn test_empty_addrs_is_unset() {
        assert!(Config::from_lookup(lookup(&[(ENV_REDIS_ADDRS, "")])).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[(ENV_REDIS_ADDRS, "localhost:6379")])).unwrap();
        assert_eq!(config.redis.addrs, vec!["localhost:6379".to_string()]);
        assert_eq!(config.http.port, 9580);
        assert!(config.redis.password.is_none());
        assert!(config.revision.is_empty());
    }

    #[test]
    fn test_address_list_and_overrides() {
        let config = Config::from_lookup(lookup(&[
            (ENV_REDIS_ADDRS, "redis-a:6379, redis-b:6379"),
            (ENV_REDIS_PASSWORD, "hunter2"),
            (ENV_REVISION, "abc123"),
            (ENV_HTTP_PORT, "8080"),
        ]))
        .unwrap();
        assert_eq!(config.redis.addrs.len(), 2);
        assert_eq!(config.redis.addrs[1], "redis-b:6379");
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.revision, "abc123");
        assert_eq!(
            config.redis.primary_url(),
            "redis://:hunter2@redis-a:6379"
        );
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup(&[
            (ENV_REDIS_ADDRS, "localhost:6379"),
            (ENV_HTTP_PORT, "not-a-port"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(ENV_HTTP_PORT));
    }

    #[test]
    fn test_primary_url_without_password() {
        let config = Config::from_lookup(lookup(&[(ENV_REDIS_ADDRS, "localhost:6379")])).unwrap();
        assert_eq!(config.redis.primary_url(), "redis://localhost:6379");
    }
}
