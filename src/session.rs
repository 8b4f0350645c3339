use crate::context::{Db, Hasher, Tera, Tokens};
use crate::database::UserDb;
use crate::error::ApiError;
use crate::model::{Document, User};
use crate::routes::ENDPOINTS;
use actix_web::{web, HttpResponse};
use log::debug;
use serde::{Deserialize, Serialize};

pub async fn welcome() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Welcome to myFlix!")
}

pub async fn documentation(tera: Tera) -> Result<HttpResponse, ApiError> {
    let mut ctx = tera::Context::new();
    ctx.insert("endpoints", ENDPOINTS);
    let body = tera.render("documentation.html", &ctx)?;
    Ok(HttpResponse::Ok().content_type("text/html").body(body))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginParams {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    user: Document<User>,
    token: String,
}

pub async fn login(
    params: web::Json<LoginParams>,
    db: Db,
    hasher: Hasher,
    tokens: Tokens,
) -> Result<HttpResponse, ApiError> {
    let (id, user) = match db.get_user_by_username(&params.username)? {
        Some(found) => found,
        None => {
            debug!("login for unknown user {}", params.username);
            return Err(ApiError::InvalidCredentials);
        }
    };
    if !hasher.verify(&params.password, &user.password_hash)? {
        debug!("wrong password for {}", params.username);
        return Err(ApiError::InvalidCredentials);
    }
    let token = tokens.issue(id, &user.username)?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        user: Document::new(id, user),
        token,
    }))
}
