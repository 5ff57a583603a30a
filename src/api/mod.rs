//! JSON api mounted under `/api`.
//!
//! Tokens are obtained with basic authentication on `POST /api/tokens`; every
//! other endpoint except user registration requires `Authorization: Bearer`.

mod movies;
mod tokens;
mod users;

use crate::error::ApiError;
use actix_web::{web, HttpRequest};
use serde::de::DeserializeOwned;

pub type Db = web::Data<sled::Db>;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/tokens")
                    .route(web::post().to(tokens::get_token))
                    .route(web::delete().to(tokens::revoke_token)),
            )
            .service(
                web::resource("/users")
                    .name("api.get_users")
                    .route(web::get().to(users::get_users))
                    .route(web::post().to(users::create_user)),
            )
            .service(
                web::resource("/users/{id}")
                    .name("api.get_user")
                    .route(web::get().to(users::get_user))
                    .route(web::put().to(users::update_user)),
            )
            .service(
                web::resource("/users/{id}/movies")
                    .name("api.get_user_movies")
                    .route(web::get().to(users::get_user_movies)),
            )
            .service(
                web::resource("/movies")
                    .name("api.get_movies")
                    .route(web::get().to(movies::get_movies))
                    .route(web::post().to(movies::create_movie)),
            )
            .service(
                web::resource("/movies/{id}")
                    .name("api.get_movie")
                    .route(web::get().to(movies::get_movie))
                    .route(web::put().to(movies::update_movie))
                    .route(web::delete().to(movies::delete_movie)),
            ),
    );
}

/// Parses a JSON object request body. An empty body or `null` reads as an empty
/// object; any other non-object value is rejected.
fn json_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|err| ApiError::bad_request(format!("Malformed JSON body: {}", err)))?;
    if value.is_null() {
        return Ok(T::default());
    }
    if !value.is_object() {
        return Err(ApiError::bad_request("Request body must be a JSON object"));
    }
    serde_json::from_value(value).map_err(|err| ApiError::bad_request(err.to_string()))
}

/// Absolute url of a named api resource.
fn link(req: &HttpRequest, name: &str, id: Option<u64>) -> Result<String, ApiError> {
    let url = match id {
        Some(id) => req.url_for(name, [id.to_string()])?,
        None => req.url_for_static(name)?,
    };
    Ok(url.to_string())
}
