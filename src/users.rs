use crate::auth::Caller;
use crate::context::{Db, Hasher};
use crate::database::UserDb;
use crate::error::ApiError;
use crate::model::{Document, User};
use crate::validation::{self, SignupRequest, UpdateRequest};
use actix_web::{web, HttpResponse};
use log::info;

/// Signup. The username is claimed by the store in the same transaction
/// that writes the document, so concurrent signups cannot both win.
pub async fn create_user(
    body: web::Bytes,
    db: Db,
    hasher: Hasher,
) -> Result<HttpResponse, ApiError> {
    let request: SignupRequest = validation::parse_body(&body)?;
    validation::check(&request)?;
    let user = User {
        username: request.username,
        password_hash: hasher.hash(&request.password)?,
        email: request.email,
        birthday: request.birthday,
        favorite_movies: Vec::new(),
    };
    match db.add_user(&user)? {
        Some(id) => {
            info!("created user {}", user.username);
            Ok(HttpResponse::Created().json(Document::new(id, user)))
        }
        None => Err(ApiError::AlreadyExists(user.username)),
    }
}

pub async fn list_users(_caller: Caller, db: Db) -> Result<HttpResponse, ApiError> {
    let users: Vec<Document<User>> = db.users()?.into_iter().map(Document::from).collect();
    Ok(HttpResponse::Ok().json(users))
}

pub async fn get_user(
    _caller: Caller,
    db: Db,
    username: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user = db.get_user_by_username(&username)?.map(Document::from);
    Ok(HttpResponse::Ok().json(user))
}

fn updated(username: String, user: Option<(u64, User)>) -> Result<HttpResponse, ApiError> {
    match user {
        Some(user) => Ok(HttpResponse::Ok().json(Document::from(user))),
        None => Err(ApiError::NotFound(username)),
    }
}

pub async fn update_user(
    caller: Caller,
    db: Db,
    hasher: Hasher,
    username: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    caller.ensure_is(&username)?;
    let request: UpdateRequest = validation::parse_body(&body)?;
    validation::check(&request)?;
    let password_hash = match &request.password {
        Some(password) => Some(hasher.hash(password)?),
        None => None,
    };
    let user = db.update_user(&username, |user| {
        user.username = request.username.clone();
        user.email = request.email.clone();
        if let Some(hash) = &password_hash {
            user.password_hash = hash.clone();
        }
        if request.birthday.is_some() {
            user.birthday = request.birthday;
        }
    })?;
    updated(username.into_inner(), user)
}

/// Duplicates are kept; adding the same movie twice lists it twice.
pub async fn add_favorite(
    caller: Caller,
    db: Db,
    path: web::Path<(String, u64)>,
) -> Result<HttpResponse, ApiError> {
    let (username, movie_id) = path.into_inner();
    caller.ensure_is(&username)?;
    let user = db.update_user(&username, |user| user.favorite_movies.push(movie_id))?;
    updated(username, user)
}

/// Removes the most recently added occurrence of the movie.
pub async fn remove_favorite(
    caller: Caller,
    db: Db,
    path: web::Path<(String, u64)>,
) -> Result<HttpResponse, ApiError> {
    let (username, movie_id) = path.into_inner();
    caller.ensure_is(&username)?;
    let user = db.update_user(&username, |user| {
        if let Some(position) = user.favorite_movies.iter().rposition(|id| *id == movie_id) {
            user.favorite_movies.remove(position);
        }
    })?;
    updated(username, user)
}

pub async fn delete_user(
    caller: Caller,
    db: Db,
    username: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let username = username.into_inner();
    caller.ensure_is(&username)?;
    match db.delete_user(&username)? {
        Some(_id) => {
            info!("deleted user {}", username);
            Ok(HttpResponse::Ok()
                .content_type("text/plain; charset=utf-8")
                .body(format!("{} was deleted.", username)))
        }
        None => Err(ApiError::NotFound(username)),
    }
}
