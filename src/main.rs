mod auth;
mod config;
mod context;
mod credentials;
mod database;
mod error;
mod model;
mod movies;
mod routes;
mod seed;
mod session;
mod users;
mod validation;

use actix_identity::IdentityService;
use actix_web::{middleware::Logger, App, HttpServer};
use auth::BearerTokenPolicy;
use config::{Config, DEV_JWT_SECRET};
use context::AppContext;
use env_logger::Env;
use log::{info, warn};

/// Apache Common Log Format.
const COMMON_LOG_FORMAT: &str = "%a - - %t \"%r\" %s %b";

#[actix_rt::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("myflix=debug,actix_web=info"))
        .init();

    let config = Config::from_env()?;
    if config.jwt_secret == DEV_JWT_SECRET {
        warn!("JWT_SECRET not set, signing tokens with the development secret");
    }

    let ctx = AppContext::new(&config)?;
    seed::seed_if_empty(&ctx.db, config.seed_file.as_deref())?;

    let address = config.bind_address();
    info!("Your app is listening on {}", address);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new(COMMON_LOG_FORMAT))
            .wrap(IdentityService::new(BearerTokenPolicy::new(
                ctx.tokens.clone(),
            )))
            .configure(|cfg| routes::configure(cfg, &ctx))
    })
    .bind(address.as_str())?
    .run()
    .await?;
    Ok(())
}
