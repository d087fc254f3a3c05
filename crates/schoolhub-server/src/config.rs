use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct ServerConfig {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub token_ttl: chrono::Duration,
    /// (login, password) of the director account to create at startup.
    pub director_seed: Option<(String, String)>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("SCHOOLHUB_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("SCHOOLHUB_JWT_SECRET is unset or still a placeholder");
        }

        let db_path: PathBuf = var("SCHOOLHUB_DB_PATH")
            .unwrap_or_else(|| "schoolhub.db".into())
            .into();
        let host = var("SCHOOLHUB_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("SCHOOLHUB_PORT")
            .unwrap_or_else(|| "5001".into())
            .parse::<u16>()
            .context("SCHOOLHUB_PORT must be a port number")?;
        let addr = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .context("SCHOOLHUB_HOST must be an IP address")?;

        let ttl_hours: i64 = var("SCHOOLHUB_TOKEN_TTL_HOURS")
            .map(|v| v.parse::<i64>())
            .transpose()
            .context("SCHOOLHUB_TOKEN_TTL_HOURS must be a whole number of hours")?
            .unwrap_or(24);
        if ttl_hours <= 0 {
            bail!("SCHOOLHUB_TOKEN_TTL_HOURS must be positive");
        }

        let director_seed = match (
            var("SCHOOLHUB_DIRECTOR_LOGIN"),
            var("SCHOOLHUB_DIRECTOR_PASSWORD"),
        ) {
            (Some(login), Some(password)) if !login.is_empty() && !password.is_empty() => {
                Some((login, password))
            }
            _ => None,
        };

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            token_ttl: chrono::Duration::hours(ttl_hours),
            director_seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<ServerConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = load(&[("SCHOOLHUB_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.addr.port(), 5001);
        assert_eq!(config.db_path, PathBuf::from("schoolhub.db"));
        assert_eq!(config.token_ttl, chrono::Duration::hours(24));
        assert!(config.director_seed.is_none());
    }

    #[test]
    fn missing_or_placeholder_secret_is_fatal() {
        assert!(load(&[]).is_err());
        assert!(load(&[("SCHOOLHUB_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn director_seed_needs_both_values() {
        let config = load(&[
            ("SCHOOLHUB_JWT_SECRET", "s3cret"),
            ("SCHOOLHUB_DIRECTOR_LOGIN", "0996055020"),
        ])
        .unwrap();
        assert!(config.director_seed.is_none());

        let config = load(&[
            ("SCHOOLHUB_JWT_SECRET", "s3cret"),
            ("SCHOOLHUB_DIRECTOR_LOGIN", "0996055020"),
            ("SCHOOLHUB_DIRECTOR_PASSWORD", "pw"),
            ("SCHOOLHUB_PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(config.director_seed, Some(("0996055020".to_string(), "pw".to_string())));
        assert_eq!(config.addr.port(), 8080);
    }

    #[test]
    fn bad_numbers_are_reported() {
        assert!(load(&[("SCHOOLHUB_JWT_SECRET", "s"), ("SCHOOLHUB_PORT", "http")]).is_err());
        assert!(load(&[("SCHOOLHUB_JWT_SECRET", "s"), ("SCHOOLHUB_TOKEN_TTL_HOURS", "0")]).is_err());
    }
}
