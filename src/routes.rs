use crate::auth::{hash_password, verify_password};
use crate::config::Config;
use crate::database::*;
use crate::model::*;
use actix_identity::Identity;
use actix_web::{error, http::header, web, HttpResponse};
use log::{debug, info};
use serde::{Deserialize, Serialize};

type Tera = web::Data<tera::Tera>;
type Db = web::Data<sled::Db>;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/login", web::get().to(login))
        .route("/login", web::post().to(login_post))
        .route("/logout", web::get().to(logout))
        .route("/register", web::get().to(register))
        .route("/register", web::post().to(register_post))
        .route("/add_movie", web::get().to(edit_movie))
        .route("/add_movie", web::post().to(edit_movie_post))
        .route("/delete_movie/{id}", web::post().to(delete_movie));
}

fn log_error<E: std::fmt::Debug>(err: E, message: &'static str) -> error::Error {
    debug!("{:?}", err);
    error::ErrorInternalServerError(message)
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn render(
    tera: &tera::Tera,
    template: &str,
    ctx: &tera::Context,
) -> actix_web::Result<HttpResponse> {
    let body = tera
        .render(template, ctx)
        .map_err(|err| log_error(err, "Template error"))?;
    Ok(HttpResponse::Ok().content_type("text/html").body(body))
}

/// The user behind the session cookie. Stale sessions are dropped.
fn session_user(id: &Identity, db: &sled::Db) -> actix_web::Result<Option<(u64, User)>> {
    let user_id = match id.identity().and_then(|identity| identity.parse::<u64>().ok()) {
        Some(user_id) => user_id,
        None => return Ok(None),
    };
    match db
        .get_user(user_id)
        .map_err(|err| log_error(err, "Database error"))?
    {
        Some(user) => Ok(Some((user_id, user))),
        None => {
            debug!("session for unknown user {}", user_id);
            id.forget();
            Ok(None)
        }
    }
}

/// A movie of the session user, or a 404 for anything else.
fn owned_movie(db: &sled::Db, user_id: u64, movie_id: u64) -> actix_web::Result<Movie> {
    db.get_movie(movie_id)
        .map_err(|err| log_error(err, "Database error"))?
        .filter(|movie| movie.user_id == user_id)
        .ok_or_else(|| error::ErrorNotFound("Movie not found."))
}

#[derive(Serialize)]
struct MovieRow {
    id: u64,
    name: String,
    year: i32,
    oscars: u32,
}

async fn index(id: Identity, tera: Tera, db: Db) -> actix_web::Result<HttpResponse> {
    let mut ctx = tera::Context::new();
    if let Some((user_id, user)) = session_user(&id, &db)? {
        ctx.insert("username", &user.username);
        let movies = db
            .list_movies_by_owner(user_id)
            .map_err(|err| log_error(err, "Database error"))?
            .into_iter()
            .map(|(id, movie)| MovieRow {
                id,
                name: movie.name,
                year: movie.year,
                oscars: movie.oscars,
            })
            .collect::<Vec<_>>();
        ctx.insert("movies", &movies);
    }
    render(&tera, "index.html", &ctx)
}

type Notices = web::Query<std::collections::HashMap<String, String>>;

async fn login(tera: Tera, query: Notices) -> actix_web::Result<HttpResponse> {
    let mut ctx = tera::Context::new();
    for notice in &["wrong_password", "logout", "registered"] {
        ctx.insert(*notice, &query.contains_key(*notice));
    }
    render(&tera, "login.html", &ctx)
}

#[derive(Serialize, Deserialize)]
struct LoginParams {
    username: String,
    password: String,
}

async fn login_post(
    params: web::Form<LoginParams>,
    id: Identity,
    db: Db,
) -> actix_web::Result<HttpResponse> {
    if let Some((user_id, user)) = db
        .get_user_by_username(&params.username)
        .map_err(|err| log_error(err, "Database error"))?
    {
        if verify_password(&params.password, &user.password_hash) {
            id.remember(user_id.to_string());
            return Ok(redirect("/"));
        }
    }
    Ok(redirect("/login?wrong_password"))
}

async fn logout(id: Identity) -> actix_web::Result<HttpResponse> {
    id.forget();
    Ok(redirect("/login?logout"))
}

async fn register(tera: Tera) -> actix_web::Result<HttpResponse> {
    render(&tera, "register.html", &tera::Context::new())
}

#[derive(Serialize, Deserialize)]
struct RegisterParams {
    username: String,
    email: String,
    password: String,
}

async fn register_post(
    params: web::Form<RegisterParams>,
    tera: Tera,
    db: Db,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    let params = params.into_inner();
    let mut ctx = tera::Context::new();
    ctx.insert("form_username", &params.username);
    ctx.insert("form_email", &params.email);

    let (username, email) = match (
        identity_field(&params.username),
        identity_field(&params.email),
    ) {
        (Some(username), Some(email)) if !params.password.is_empty() => (username, email),
        _ => {
            ctx.insert("error", "All fields are required.");
            return render(&tera, "register.html", &ctx);
        }
    };

    let password_hash = hash_password(&params.password, config.bcrypt_cost)
        .map_err(|err| log_error(err, "Hashing error"))?;
    let user = User::new(username, email, password_hash);
    match db.add_user(&user) {
        Ok(user_id) => {
            info!("registered user {} ({})", user.username, user_id);
            Ok(redirect("/login?registered"))
        }
        Err(DbError::UsernameTaken) => {
            ctx.insert("error", "Please use a different username.");
            render(&tera, "register.html", &ctx)
        }
        Err(DbError::EmailTaken) => {
            ctx.insert("error", "Please use a different email address.");
            render(&tera, "register.html", &ctx)
        }
        Err(err) => Err(log_error(err, "Database error")),
    }
}

#[derive(Deserialize)]
struct EditQuery {
    id: Option<u64>,
}

#[derive(Serialize, Deserialize)]
struct MovieForm {
    #[serde(default)]
    id: String,
    name: String,
    year: String,
    oscars: String,
}

async fn edit_movie(
    id: Identity,
    tera: Tera,
    db: Db,
    query: web::Query<EditQuery>,
) -> actix_web::Result<HttpResponse> {
    let (user_id, user) = match session_user(&id, &db)? {
        Some(session) => session,
        None => return Ok(redirect("/login")),
    };
    let mut ctx = tera::Context::new();
    ctx.insert("username", &user.username);
    if let Some(movie_id) = query.id {
        let movie = owned_movie(&db, user_id, movie_id)?;
        ctx.insert(
            "movie",
            &MovieForm {
                id: movie_id.to_string(),
                name: movie.name,
                year: movie.year.to_string(),
                oscars: movie.oscars.to_string(),
            },
        );
    }
    render(&tera, "add_movie.html", &ctx)
}

async fn edit_movie_post(
    form: web::Form<MovieForm>,
    id: Identity,
    tera: Tera,
    db: Db,
) -> actix_web::Result<HttpResponse> {
    let (user_id, user) = match session_user(&id, &db)? {
        Some(session) => session,
        None => return Ok(redirect("/login")),
    };
    let form = form.into_inner();
    let movie_id = match form.id.trim() {
        "" => None,
        movie_id => Some(
            movie_id
                .parse::<u64>()
                .map_err(|_| error::ErrorNotFound("Movie not found."))?,
        ),
    };
    if let Some(movie_id) = movie_id {
        owned_movie(&db, user_id, movie_id)?;
    }

    let name = form.name.trim().to_owned();
    let year = form.year.trim().parse::<i32>();
    let oscars = form.oscars.trim().parse::<u32>();
    let (year, oscars) = match (year, oscars) {
        (Ok(year), Ok(oscars)) if !name.is_empty() => (year, oscars),
        _ => {
            let mut ctx = tera::Context::new();
            ctx.insert("username", &user.username);
            ctx.insert(
                "error",
                "Name is required, year and Oscars must be whole numbers.",
            );
            ctx.insert("movie", &form);
            return render(&tera, "add_movie.html", &ctx);
        }
    };
    let movie = Movie {
        name,
        year,
        oscars,
        user_id,
    };
    match movie_id {
        Some(movie_id) => {
            db.update_movie(movie_id, &movie)
                .map_err(|err| log_error(err, "Database error"))?;
        }
        None => {
            db.add_movie(&movie)
                .map_err(|err| log_error(err, "Database error"))?;
        }
    }
    Ok(redirect("/"))
}

async fn delete_movie(
    id: Identity,
    db: Db,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    let (user_id, _user) = match session_user(&id, &db)? {
        Some(session) => session,
        None => return Ok(redirect("/login")),
    };
    let movie_id = path.into_inner();
    owned_movie(&db, user_id, movie_id)?;
    db.remove_movie(movie_id)
        .map_err(|err| log_error(err, "There was a problem deleting that movie."))?;
    Ok(redirect("/"))
}
