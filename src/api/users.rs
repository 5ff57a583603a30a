use super::{json_body, link, movies::MovieResponse, Db};
use crate::auth::{hash_password, TokenUser};
use crate::config::Config;
use crate::database::{MovieDb, UserDb};
use crate::error::ApiError;
use crate::model::{identity_field, User};
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct UserLinks {
    #[serde(rename = "self")]
    pub this: String,
    pub movies: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: u64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub movie_count: usize,
    #[serde(rename = "_links")]
    pub links: UserLinks,
}

impl UserResponse {
    fn new(
        req: &HttpRequest,
        db: &sled::Db,
        id: u64,
        user: &User,
        include_email: bool,
    ) -> Result<Self, ApiError> {
        Ok(UserResponse {
            id,
            username: user.username.clone(),
            email: if include_email {
                Some(user.email.clone())
            } else {
                None
            },
            movie_count: db.count_movies_by_owner(id)?,
            links: UserLinks {
                this: link(req, "api.get_user", Some(id))?,
                movies: link(req, "api.get_user_movies", Some(id))?,
            },
        })
    }
}

#[derive(Deserialize, Default)]
pub struct NewUser {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct UserChanges {
    username: Option<String>,
    email: Option<String>,
}

/// Fetches user `id` on behalf of `auth`, who may only see themselves.
fn own_user(db: &sled::Db, auth: &TokenUser, id: u64) -> Result<User, ApiError> {
    let user = db.get_user(id)?.ok_or(ApiError::NotFound)?;
    if id != auth.id {
        return Err(ApiError::Forbidden);
    }
    Ok(user)
}

pub async fn get_users(
    _auth: TokenUser,
    req: HttpRequest,
    db: Db,
) -> Result<HttpResponse, ApiError> {
    let users = db
        .list_users()?
        .iter()
        .map(|(id, user)| UserResponse::new(&req, &db, *id, user, false))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "users": users,
        "_links": {
            "self": link(&req, "api.get_users", None)?,
        },
    })))
}

pub async fn get_user(
    auth: TokenUser,
    req: HttpRequest,
    db: Db,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let user = own_user(&db, &auth, id)?;
    Ok(HttpResponse::Ok().json(UserResponse::new(&req, &db, id, &user, false)?))
}

pub async fn create_user(
    req: HttpRequest,
    db: Db,
    config: web::Data<Config>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let data: NewUser = json_body(&body)?;
    let username = data
        .username
        .as_deref()
        .and_then(identity_field)
        .ok_or_else(|| ApiError::bad_request("Must include username field"))?;
    let email = data
        .email
        .as_deref()
        .and_then(identity_field)
        .ok_or_else(|| ApiError::bad_request("Must include email field"))?;
    let password = data
        .password
        .ok_or_else(|| ApiError::bad_request("Must include password field"))?;

    if db.get_user_by_username(&username)?.is_some() {
        return Err(ApiError::bad_request("Please use a different username"));
    }
    if db.get_user_by_email(&email)?.is_some() {
        return Err(ApiError::bad_request("Please use a different email address"));
    }

    let user = User::new(
        username,
        email,
        hash_password(&password, config.bcrypt_cost)?,
    );
    let id = db.add_user(&user)?;
    info!("registered user {} ({})", user.username, id);

    let response = UserResponse::new(&req, &db, id, &user, true)?;
    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, response.links.this.clone()))
        .json(response))
}

pub async fn update_user(
    auth: TokenUser,
    req: HttpRequest,
    db: Db,
    path: web::Path<u64>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    own_user(&db, &auth, id)?;
    let changes: UserChanges = json_body(&body)?;
    let username = changes
        .username
        .map(|username| {
            identity_field(&username)
                .ok_or_else(|| ApiError::bad_request("Username must not be blank"))
        })
        .transpose()?;
    let email = changes
        .email
        .map(|email| {
            identity_field(&email)
                .ok_or_else(|| ApiError::bad_request("Email must not be blank"))
        })
        .transpose()?;

    // Uniqueness is enforced by the index trees inside the update.
    let (user, _) = db.update_user_with(id, |user| {
        if let Some(username) = &username {
            user.username = username.clone();
        }
        if let Some(email) = &email {
            user.email = email.clone();
        }
    })?;
    info!("updated user {} ({})", user.username, id);

    Ok(HttpResponse::Ok().json(UserResponse::new(&req, &db, id, &user, false)?))
}

pub async fn get_user_movies(
    auth: TokenUser,
    req: HttpRequest,
    db: Db,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    own_user(&db, &auth, id)?;
    let movies = db
        .list_movies_by_owner(id)?
        .iter()
        .map(|(movie_id, movie)| MovieResponse::new(&req, *movie_id, movie))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "movies": movies,
        "_links": {
            "self": link(&req, "api.get_user_movies", Some(id))?,
            "user": link(&req, "api.get_user", Some(id))?,
        },
    })))
}
