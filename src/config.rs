use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEV_JWT_SECRET: &str = "your_jwt_secret";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    NotANumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// sled directory; `None` runs on a temporary store.
    pub database_path: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_validity_days: i64,
    pub bcrypt_cost: u32,
    pub seed_file: Option<PathBuf>,
}

fn parse<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::NotANumber { name, value }),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            database_path: lookup("CONNECTION_URI").map(PathBuf::from),
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_owned()),
            port: parse("PORT", lookup("PORT"), 8080)?,
            jwt_secret: lookup("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_owned()),
            token_validity_days: parse("TOKEN_VALIDITY_DAYS", lookup("TOKEN_VALIDITY_DAYS"), 7)?,
            bcrypt_cost: parse("BCRYPT_COST", lookup("BCRYPT_COST"), bcrypt::DEFAULT_COST)?,
            seed_file: lookup("SEED_FILE").map(PathBuf::from),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.database_path, None);
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.token_validity_days, 7);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.seed_file, None);
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("CONNECTION_URI", "/var/lib/myflix"),
            ("HOST", "0.0.0.0"),
            ("PORT", "3000"),
            ("JWT_SECRET", "s3cret"),
            ("BCRYPT_COST", "10"),
        ])
        .unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("/var/lib/myflix")));
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.bcrypt_cost, 10);
    }

    #[test]
    fn malformed_port_is_an_error() {
        assert_eq!(
            config(&[("PORT", "eighty")]).unwrap_err(),
            ConfigError::NotANumber {
                name: "PORT",
                value: "eighty".to_owned()
            }
        );
    }
}
