use super::{json_body, link, Db};
use crate::auth::TokenUser;
use crate::database::MovieDb;
use crate::error::ApiError;
use crate::model::Movie;
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct MovieLinks {
    #[serde(rename = "self")]
    pub this: String,
    pub owner: String,
}

#[derive(Serialize)]
pub struct MovieResponse {
    pub id: u64,
    pub name: String,
    pub year: i32,
    pub oscars: u32,
    pub user_id: u64,
    #[serde(rename = "_links")]
    pub links: MovieLinks,
}

impl MovieResponse {
    pub fn new(req: &HttpRequest, id: u64, movie: &Movie) -> Result<Self, ApiError> {
        Ok(MovieResponse {
            id,
            name: movie.name.clone(),
            year: movie.year,
            oscars: movie.oscars,
            user_id: movie.user_id,
            links: MovieLinks {
                this: link(req, "api.get_movie", Some(id))?,
                owner: link(req, "api.get_user", Some(movie.user_id))?,
            },
        })
    }
}

#[derive(Deserialize, Default)]
pub struct MovieData {
    name: Option<String>,
    year: Option<i32>,
    oscars: Option<u32>,
}

impl MovieData {
    fn apply(self, movie: &mut Movie) {
        if let Some(name) = self.name {
            movie.name = name;
        }
        if let Some(year) = self.year {
            movie.year = year;
        }
        if let Some(oscars) = self.oscars {
            movie.oscars = oscars;
        }
    }
}

/// Fetches movie `id` for modification by `auth`, who must own it.
fn owned_movie(db: &sled::Db, auth: &TokenUser, id: u64) -> Result<Movie, ApiError> {
    let movie = db.get_movie(id)?.ok_or(ApiError::NotFound)?;
    if movie.user_id != auth.id {
        return Err(ApiError::Forbidden);
    }
    Ok(movie)
}

pub async fn get_movies(
    _auth: TokenUser,
    req: HttpRequest,
    db: Db,
) -> Result<HttpResponse, ApiError> {
    let movies = db
        .list_movies()?
        .iter()
        .map(|(id, movie)| MovieResponse::new(&req, *id, movie))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "movies": movies,
        "_links": {
            "self": link(&req, "api.get_movies", None)?,
        },
    })))
}

pub async fn get_movie(
    _auth: TokenUser,
    req: HttpRequest,
    db: Db,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let movie = db.get_movie(id)?.ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(MovieResponse::new(&req, id, &movie)?))
}

pub async fn create_movie(
    auth: TokenUser,
    req: HttpRequest,
    db: Db,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let data: MovieData = json_body(&body)?;
    let movie = Movie {
        name: data
            .name
            .ok_or_else(|| ApiError::bad_request("Must include name field"))?,
        year: data
            .year
            .ok_or_else(|| ApiError::bad_request("Must include year field"))?,
        oscars: data
            .oscars
            .ok_or_else(|| ApiError::bad_request("Must include oscars field"))?,
        user_id: auth.id,
    };
    let id = db.add_movie(&movie)?;

    let response = MovieResponse::new(&req, id, &movie)?;
    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, response.links.this.clone()))
        .json(response))
}

pub async fn update_movie(
    auth: TokenUser,
    req: HttpRequest,
    db: Db,
    path: web::Path<u64>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let mut movie = owned_movie(&db, &auth, id)?;
    let data: MovieData = json_body(&body)?;
    data.apply(&mut movie);
    let movie = db.update_movie(id, &movie)?;
    Ok(HttpResponse::Ok().json(MovieResponse::new(&req, id, &movie)?))
}

pub async fn delete_movie(
    auth: TokenUser,
    db: Db,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    owned_movie(&db, &auth, id)?;
    db.remove_movie(id)?;
    Ok(HttpResponse::NoContent().finish())
}
