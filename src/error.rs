use crate::database::DbError;
use actix_web::{
    error::UrlGenerationError,
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use log::{debug, error};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthScheme {
    Basic,
    Bearer,
}

impl AuthScheme {
    fn challenge(self) -> &'static str {
        match self {
            AuthScheme::Basic => "Basic realm=\"Authentication Required\"",
            AuthScheme::Bearer => "Bearer realm=\"Authentication Required\"",
        }
    }
}

/// Errors of the JSON api. Rendered as `{"error": <reason>, "message": <detail>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("missing or invalid credentials")]
    Unauthorized(AuthScheme),
    #[error("You don't have the permission to access the requested resource.")]
    Forbidden,
    #[error("The requested URL was not found on the server.")]
    NotFound,
    #[error(transparent)]
    Database(DbError),
    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    Url(#[from] UrlGenerationError),
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UsernameTaken => ApiError::bad_request("Please use a different username"),
            DbError::EmailTaken => ApiError::bad_request("Please use a different email address"),
            DbError::NotFound(_) => ApiError::NotFound,
            err => ApiError::Database(err),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Database(_)
            | ApiError::Hash(_)
            | ApiError::Url(_)
            | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut payload = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("Unknown error"),
        });
        let mut response = HttpResponse::build(status);
        match self {
            ApiError::BadRequest(_) | ApiError::Forbidden | ApiError::NotFound => {
                payload["message"] = self.to_string().into();
            }
            ApiError::Unauthorized(scheme) => {
                debug!("{:?} authentication failed", scheme);
                response.insert_header((header::WWW_AUTHENTICATE, scheme.challenge()));
            }
            err => error!("{:?}", err),
        }
        response.json(payload)
    }
}
