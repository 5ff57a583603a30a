use super::Db;
use crate::auth::{BasicUser, TokenUser};
use crate::config::Config;
use crate::database::UserDb;
use crate::error::ApiError;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::debug;

pub async fn get_token(
    auth: BasicUser,
    db: Db,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let now = Utc::now();
    let (_, token) =
        db.update_user_with(auth.id, |user| user.get_token(now, config.token_lifetime))?;
    debug!("token issued for user {}", auth.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "token": token })))
}

pub async fn revoke_token(auth: TokenUser, db: Db) -> Result<HttpResponse, ApiError> {
    let now = Utc::now();
    db.update_user_with(auth.id, |user| user.revoke_token(now))?;
    debug!("token revoked for user {}", auth.id);
    Ok(HttpResponse::NoContent().finish())
}
