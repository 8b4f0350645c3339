use crate::database::DbError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use thiserror::Error;

/// One rejected input field, as reported in a 422 body.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FieldError {
    pub param: String,
    pub msg: String,
    pub location: &'static str,
}

#[derive(Serialize)]
struct ValidationBody<'a> {
    errors: &'a [FieldError],
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request body")]
    Validation(Vec<FieldError>),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Incorrect username or password.")]
    InvalidCredentials,
    #[error("Permission denied")]
    Forbidden,
    #[error("{0} was not found")]
    NotFound(String),
    #[error("Error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(source: &'static str, err: E) -> Self {
        error!("{} error: {}", source, err);
        ApiError::Internal(err.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::AlreadyExists(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Validation(errors) => {
                HttpResponse::build(self.status_code()).json(ValidationBody { errors })
            }
            _ => HttpResponse::build(self.status_code())
                .content_type("text/plain; charset=utf-8")
                .body(self.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::AlreadyExists(username) => ApiError::AlreadyExists(username),
            err => ApiError::internal("Database", err),
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ApiError::internal("Hashing", err)
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ApiError::internal("Token", err)
    }
}

impl From<tera::Error> for ApiError {
    fn from(err: tera::Error) -> Self {
        ApiError::internal("Template", err)
    }
}
