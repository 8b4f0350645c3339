use crate::auth::TokenIssuer;
use crate::config::Config;
use crate::credentials::PasswordHasher;
use actix_web::web;
use chrono::Duration;
use log::info;

pub type Db = web::Data<sled::Db>;
pub type Tera = web::Data<tera::Tera>;
pub type Tokens = web::Data<TokenIssuer>;
pub type Hasher = web::Data<PasswordHasher>;

/// Everything a request handler may reach, built once at startup and
/// registered as app data on every worker.
#[derive(Clone)]
pub struct AppContext {
    pub db: sled::Db,
    pub tera: tera::Tera,
    pub tokens: TokenIssuer,
    pub hasher: PasswordHasher,
}

pub fn templates() -> tera::Result<tera::Tera> {
    tera::Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*"))
}

impl AppContext {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let db = match &config.database_path {
            Some(path) => {
                info!("opening database at {}", path.display());
                sled::open(path)?
            }
            None => {
                info!("CONNECTION_URI not set, using a temporary database");
                sled::Config::new().temporary(true).open()?
            }
        };
        Ok(AppContext {
            db,
            tera: templates()?,
            tokens: TokenIssuer::new(
                config.jwt_secret.as_bytes(),
                Duration::days(config.token_validity_days),
            ),
            hasher: PasswordHasher::new(config.bcrypt_cost),
        })
    }

    #[cfg(test)]
    pub fn temporary() -> Self {
        AppContext {
            db: sled::Config::new().temporary(true).open().unwrap(),
            tera: templates().unwrap(),
            tokens: TokenIssuer::new(b"test secret", Duration::days(7)),
            hasher: PasswordHasher::new(4),
        }
    }
}
