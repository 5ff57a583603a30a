use crate::database::{DbError, UserDb};
use crate::error::{ApiError, AuthScheme};
use crate::model::User;
use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use log::debug;
use std::future::{ready, Ready};

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// Malformed hashes count as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    bcrypt::verify(password, password_hash).unwrap_or_else(|err| {
        debug!("password verification failed: {:?}", err);
        false
    })
}

/// Looks up the owner of `token`, provided the token has not expired at `now`.
pub fn check_token(
    db: &sled::Db,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<(u64, User)>, DbError> {
    Ok(db
        .get_user_by_token(token)?
        .filter(|(_, user)| user.token_valid(now)))
}

fn authorization<'a>(req: &'a HttpRequest, scheme: &str) -> Option<&'a str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (given, credentials) = value.split_once(' ')?;
    if given.eq_ignore_ascii_case(scheme) {
        Some(credentials.trim())
    } else {
        None
    }
}

fn parse_basic(credentials: &str) -> Option<(String, String)> {
    let decoded = String::from_utf8(STANDARD.decode(credentials).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_owned(), password.to_owned()))
}

fn database(req: &HttpRequest) -> Result<&sled::Db, ApiError> {
    req.app_data::<web::Data<sled::Db>>()
        .map(|db| db.get_ref())
        .ok_or(ApiError::Internal("database not configured"))
}

/// Id of a user authenticated with `Authorization: Basic`. Handlers read the
/// user record from storage themselves.
pub struct BasicUser {
    pub id: u64,
}

impl BasicUser {
    fn authenticate(req: &HttpRequest) -> Result<Self, ApiError> {
        let unauthorized = || ApiError::Unauthorized(AuthScheme::Basic);
        let (username, password) = authorization(req, "Basic")
            .and_then(parse_basic)
            .ok_or_else(unauthorized)?;
        match database(req)?.get_user_by_username(&username)? {
            Some((id, user)) if verify_password(&password, &user.password_hash) => {
                Ok(BasicUser { id })
            }
            _ => Err(unauthorized()),
        }
    }
}

impl FromRequest for BasicUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(BasicUser::authenticate(req))
    }
}

/// Id of a user authenticated with `Authorization: Bearer`.
pub struct TokenUser {
    pub id: u64,
}

impl TokenUser {
    fn authenticate(req: &HttpRequest) -> Result<Self, ApiError> {
        let unauthorized = || ApiError::Unauthorized(AuthScheme::Bearer);
        let token = authorization(req, "Bearer")
            .filter(|token| !token.is_empty())
            .ok_or_else(unauthorized)?;
        check_token(database(req)?, token, Utc::now())?
            .map(|(id, _)| TokenUser { id })
            .ok_or_else(unauthorized)
    }
}

impl FromRequest for TokenUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(TokenUser::authenticate(req))
    }
}
