//! Request bodies for account creation and profile updates, with their
//! declarative field rules.

use crate::error::{ApiError, FieldError};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use unic_ucd_category::GeneralCategory;
use validator::{Validate, ValidationError, ValidationErrors};

fn is_alphanumeric(c: char) -> bool {
    let category = GeneralCategory::of(c);
    category.is_letter() || category.is_number()
}

fn alphanumeric(username: &str) -> Result<(), ValidationError> {
    if username.chars().all(is_alphanumeric) {
        Ok(())
    } else {
        let mut error = ValidationError::new("alphanumeric");
        error.message = Some(Cow::from(
            "Username contains non alphanumeric characters - not allowed.",
        ));
        Err(error)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(
        length(min = 5, message = "Username is required and must be at least 5 characters"),
        custom = "alphanumeric"
    )]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default)]
    #[validate(email(message = "Email does not appear to be valid"))]
    pub email: String,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
}

/// Same rules as signup; a missing password keeps the stored hash.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateRequest {
    #[serde(default)]
    #[validate(
        length(min = 5, message = "Username is required and must be at least 5 characters"),
        custom = "alphanumeric"
    )]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Email does not appear to be valid"))]
    pub email: String,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
}

fn param_name(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldError {
                param: param_name(field),
                msg: error
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", error.code)),
                location: "body",
            })
        })
        .collect();
    fields.sort_by(|a, b| a.param.cmp(&b.param));
    fields
}

fn body_error(msg: String) -> FieldError {
    FieldError {
        param: "body".to_owned(),
        msg,
        location: "body",
    }
}

/// Decodes a JSON request body. A malformed document or a field of the
/// wrong type is a 422 like any other rule violation, naming each field
/// that could not be read.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|error| ApiError::Validation(vec![body_error(error.to_string())]))?;
    let whole_error = match serde_json::from_value::<T>(value.clone()) {
        Ok(request) => return Ok(request),
        Err(error) => error,
    };
    // Every request field has a default, so each key can be decoded alone.
    let fields: Vec<FieldError> = match value {
        Value::Object(object) => object
            .into_iter()
            .filter_map(|(key, value)| {
                let mut single = Map::new();
                single.insert(key.clone(), value);
                serde_json::from_value::<T>(Value::Object(single))
                    .err()
                    .map(|error| FieldError {
                        param: key,
                        msg: error.to_string(),
                        location: "body",
                    })
            })
            .collect(),
        _ => Vec::new(),
    };
    if fields.is_empty() {
        Err(ApiError::Validation(vec![body_error(whole_error.to_string())]))
    } else {
        Err(ApiError::Validation(fields))
    }
}

/// Runs the field rules, turning failures into a 422.
pub fn check<T: Validate>(request: &T) -> Result<(), ApiError> {
    request
        .validate()
        .map_err(|errors| ApiError::Validation(field_errors(&errors)))
}
