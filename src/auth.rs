//! Bearer token issuing and the identity policy that reads tokens back.

use crate::database::UserDb;
use crate::error::ApiError;
use actix_identity::{IdentityPolicy, RequestIdentity};
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::http::{header, HeaderMap};
use actix_web::{web, Error, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures::future::{ok, ready, Ready};
use jsonwebtoken::{decode, encode, errors, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Store id of the account, so a recycled username never matches.
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validity: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], validity: Duration) -> Self {
        TokenIssuer {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validity,
        }
    }

    pub fn issue(&self, id: u64, username: &str) -> errors::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: id.to_string(),
            username: username.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> errors::Result<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Identity policy backed by `Authorization: Bearer` tokens. A missing or
/// invalid token leaves the request anonymous; handlers that need a caller
/// reject it through the [`Caller`] extractor.
pub struct BearerTokenPolicy {
    tokens: TokenIssuer,
}

impl BearerTokenPolicy {
    pub fn new(tokens: TokenIssuer) -> Self {
        BearerTokenPolicy { tokens }
    }
}

impl IdentityPolicy for BearerTokenPolicy {
    type Future = Ready<Result<Option<String>, Error>>;
    type ResponseFuture = Ready<Result<(), Error>>;

    fn from_request(&self, request: &mut ServiceRequest) -> Self::Future {
        let identity = bearer_token(request.headers()).and_then(|token| {
            match self.tokens.verify(token) {
                Ok(claims) => Some(claims.sub),
                Err(error) => {
                    debug!("rejected bearer token: {}", error);
                    None
                }
            }
        });
        ok(identity)
    }

    // Tokens travel in response bodies, never in headers or cookies.
    fn to_response<B>(
        &self,
        _identity: Option<String>,
        _changed: bool,
        _response: &mut ServiceResponse<B>,
    ) -> Self::ResponseFuture {
        ok(())
    }
}

/// The authenticated account. Extraction fails with 401 for anonymous
/// requests and for tokens whose account no longer exists, before the
/// handler body runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub id: u64,
    pub username: String,
}

impl Caller {
    /// Only the account owner may touch `username`.
    pub fn ensure_is(&self, username: &str) -> Result<(), ApiError> {
        if self.username == username {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    fn load(req: &HttpRequest) -> Result<Self, ApiError> {
        let id = req
            .get_identity()
            .and_then(|sub| sub.parse::<u64>().ok())
            .ok_or(ApiError::Unauthorized)?;
        let db = req
            .app_data::<web::Data<sled::Db>>()
            .ok_or_else(|| ApiError::internal("Identity", "user store is not configured"))?;
        match db.get_user(id)? {
            Some(user) => Ok(Caller {
                id,
                username: user.username,
            }),
            None => {
                debug!("Token for removed account {}", id);
                Err(ApiError::Unauthorized)
            }
        }
    }
}

impl FromRequest for Caller {
    type Error = ApiError;
    type Future = Ready<Result<Self, ApiError>>;
    type Config = ();

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Caller::load(req))
    }
}
