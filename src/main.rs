// Builds the application with the session layer, shared state and both route
// sets. A macro rather than a function because `App<T>` with the wrapped
// middleware has an unnameable service factory type, and main and the tests
// need the same builder.
macro_rules! movielist_app {
    ($config:expr, $tera:expr, $db:expr) => {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(actix_identity::IdentityService::new(
                actix_identity::CookieIdentityPolicy::new(&$config.secret_key)
                    .name("auth-cookie")
                    .secure(false),
            ))
            .app_data($config.clone())
            .app_data($tera.clone())
            .app_data($db.clone())
            .configure(crate::routes::configure)
            .configure(crate::api::configure)
    };
}

mod api;
mod auth;
mod config;
mod database;
mod error;
mod model;
mod routes;

use actix_web::{web, HttpServer};
use config::Config;
use log::info;
use std::io;

#[actix_rt::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("movielist=debug,actix_web=info"),
    )
    .init();

    let config = Config::load().map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    let tera = tera::Tera::new(&config.templates)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    let db = config.open_database()?;
    let bind_address = config.bind_address.clone();

    let config = web::Data::new(config);
    let tera = web::Data::new(tera);
    let db = web::Data::new(db);

    info!("listening on {}", bind_address);
    HttpServer::new(move || movielist_app!(config, tera, db))
        .bind(bind_address)?
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MovieDb, UserDb};
    use actix_web::{
        body::MessageBody,
        cookie::Cookie,
        dev::ServiceResponse,
        http::{header, StatusCode},
        test::{self, TestRequest},
    };
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde_json::{json, Value};

    fn state() -> (
        web::Data<Config>,
        web::Data<tera::Tera>,
        web::Data<sled::Db>,
    ) {
        let config = Config::for_tests();
        let tera = tera::Tera::new(&config.templates).unwrap();
        let db = config.open_database().unwrap();
        (web::Data::new(config), web::Data::new(tera), web::Data::new(db))
    }

    fn basic(username: &str, password: &str) -> (header::HeaderName, String) {
        let credentials = STANDARD.encode(format!("{}:{}", username, password));
        (header::AUTHORIZATION, format!("Basic {}", credentials))
    }

    fn bearer(token: &str) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }

    fn new_user(username: &str) -> TestRequest {
        TestRequest::post().uri("/api/users").set_json(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "secret",
        }))
    }

    macro_rules! call_json {
        ($app:expr, $req:expr) => {{
            let resp = test::call_service(&$app, $req.to_request()).await;
            let status = resp.status();
            let body: Value = test::read_body_json(resp).await;
            (status, body)
        }};
    }

    /// Registers `username` and returns its id and a bearer token.
    macro_rules! user_with_token {
        ($app:expr, $username:expr) => {{
            let (status, user) = call_json!($app, new_user($username));
            assert_eq!(status, StatusCode::CREATED);
            let (status, token) = call_json!(
                $app,
                TestRequest::post()
                    .uri("/api/tokens")
                    .insert_header(basic($username, "secret"))
            );
            assert_eq!(status, StatusCode::OK);
            (
                user["id"].as_u64().unwrap(),
                token["token"].as_str().unwrap().to_owned(),
            )
        }};
    }

    #[actix_rt::test]
    async fn register_users() {
        let (config, tera, db) = state();
        let app = test::init_service(movielist_app!(config, tera, db)).await;

        let (status, body) = call_json!(
            app,
            TestRequest::post()
                .uri("/api/users")
                .set_json(json!({"username": "alice", "password": "secret"}))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"error": "Bad Request", "message": "Must include email field"})
        );

        let (status, body) = call_json!(app, TestRequest::post().uri("/api/users"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Must include username field");

        let resp = test::call_service(&app, new_user("alice").to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let location = resp.headers().get(header::LOCATION).unwrap().clone();
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["username"], "alice");
        assert_eq!(body["email"], "alice@example.com");
        assert_eq!(body["movie_count"], 0);
        assert_eq!(body["_links"]["self"], location.to_str().unwrap());
        assert!(location.to_str().unwrap().starts_with("http://"));

        let (status, body) = call_json!(app, new_user("alice"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Please use a different username");

        let (status, body) = call_json!(
            app,
            TestRequest::post().uri("/api/users").set_json(json!({
                "username": "alice2",
                "email": "alice@example.com",
                "password": "secret",
            }))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Please use a different email address");
    }

    #[actix_rt::test]
    async fn token_lifecycle() {
        let (config, tera, db) = state();
        let app = test::init_service(movielist_app!(config, tera, db)).await;
        call_json!(app, new_user("alice"));

        let resp =
            test::call_service(&app, TestRequest::post().uri("/api/tokens").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"Authentication Required\""
        );

        let (status, body) = call_json!(
            app,
            TestRequest::post()
                .uri("/api/tokens")
                .insert_header(basic("alice", "wrong"))
        );
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"error": "Unauthorized"}));

        let (_, first) = call_json!(
            app,
            TestRequest::post()
                .uri("/api/tokens")
                .insert_header(basic("alice", "secret"))
        );
        let (_, second) = call_json!(
            app,
            TestRequest::post()
                .uri("/api/tokens")
                .insert_header(basic("alice", "secret"))
        );
        let token = first["token"].as_str().unwrap();
        assert_eq!(second["token"], token);

        let (status, _) = call_json!(
            app,
            TestRequest::get()
                .uri("/api/movies")
                .insert_header(bearer(token))
        );
        assert_eq!(status, StatusCode::OK);

        let resp = test::call_service(
            &app,
            TestRequest::delete()
                .uri("/api/tokens")
                .insert_header(bearer(token))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let (status, _) = call_json!(
            app,
            TestRequest::get()
                .uri("/api/movies")
                .insert_header(bearer(token))
        );
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, renewed) = call_json!(
            app,
            TestRequest::post()
                .uri("/api/tokens")
                .insert_header(basic("alice", "secret"))
        );
        assert_ne!(renewed["token"], token);
    }

    #[actix_rt::test]
    async fn users_only_see_themselves() {
        let (config, tera, db) = state();
        let app = test::init_service(movielist_app!(config, tera, db)).await;
        let (alice, token) = user_with_token!(app, "alice");
        let (bob, _) = user_with_token!(app, "bob");

        let (status, body) = call_json!(
            app,
            TestRequest::get().uri("/api/users").insert_header(bearer(&token))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["users"].as_array().unwrap().len(), 2);
        assert!(body["_links"]["self"].as_str().unwrap().ends_with("/api/users"));

        let (status, body) = call_json!(
            app,
            TestRequest::get()
                .uri(&format!("/api/users/{}", alice))
                .insert_header(bearer(&token))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
        assert!(body.get("email").is_none());

        let (status, _) = call_json!(
            app,
            TestRequest::get()
                .uri(&format!("/api/users/{}", bob))
                .insert_header(bearer(&token))
        );
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call_json!(
            app,
            TestRequest::get()
                .uri("/api/users/999999")
                .insert_header(bearer(&token))
        );
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call_json!(
            app,
            TestRequest::put()
                .uri(&format!("/api/users/{}", alice))
                .insert_header(bearer(&token))
                .set_json(json!({"username": "bob"}))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Please use a different username");

        let (status, body) = call_json!(
            app,
            TestRequest::put()
                .uri(&format!("/api/users/{}", alice))
                .insert_header(bearer(&token))
                .set_json(json!({"username": "alicia", "email": "alicia@example.com"}))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alicia");

        // the token survives the rename
        let (status, _) = call_json!(
            app,
            TestRequest::get()
                .uri(&format!("/api/users/{}", alice))
                .insert_header(bearer(&token))
        );
        assert_eq!(status, StatusCode::OK);
    }

    #[actix_rt::test]
    async fn movies_are_owned() {
        let (config, tera, db) = state();
        let app = test::init_service(movielist_app!(config, tera, db)).await;
        let (alice, alice_token) = user_with_token!(app, "alice");
        let (bob, bob_token) = user_with_token!(app, "bob");

        let (status, body) = call_json!(
            app,
            TestRequest::post()
                .uri("/api/movies")
                .insert_header(bearer(&alice_token))
                .set_json(json!({"name": "Inception", "year": 2010}))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Must include oscars field");

        let (status, body) = call_json!(
            app,
            TestRequest::post()
                .uri("/api/movies")
                .insert_header(bearer(&alice_token))
                .set_json(json!({"name": "Inception", "year": 2010, "oscars": -1}))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad Request");

        let (status, movie) = call_json!(
            app,
            TestRequest::post()
                .uri("/api/movies")
                .insert_header(bearer(&alice_token))
                .set_json(json!({"name": "Inception", "year": 2010, "oscars": 4, "genre": "Sci-Fi"}))
        );
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(movie["user_id"], alice);
        assert_eq!(movie["oscars"], 4);
        let movie_uri = format!("/api/movies/{}", movie["id"]);

        let (status, body) = call_json!(
            app,
            TestRequest::get().uri(&movie_uri).insert_header(bearer(&bob_token))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Inception");
        assert!(body["_links"]["owner"]
            .as_str()
            .unwrap()
            .ends_with(&format!("/api/users/{}", alice)));

        let (status, _) = call_json!(
            app,
            TestRequest::put()
                .uri(&movie_uri)
                .insert_header(bearer(&bob_token))
                .set_json(json!({"oscars": 11}))
        );
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call_json!(
            app,
            TestRequest::delete()
                .uri(&movie_uri)
                .insert_header(bearer(&bob_token))
        );
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call_json!(
            app,
            TestRequest::put()
                .uri(&movie_uri)
                .insert_header(bearer(&alice_token))
                .set_json(json!({"oscars": 5}))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["oscars"], 5);
        assert_eq!(body["year"], 2010);

        let (status, _) = call_json!(
            app,
            TestRequest::get()
                .uri(&format!("/api/users/{}/movies", alice))
                .insert_header(bearer(&bob_token))
        );
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = call_json!(
            app,
            TestRequest::get()
                .uri(&format!("/api/users/{}/movies", bob))
                .insert_header(bearer(&bob_token))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["movies"], json!([]));
        let (_, body) = call_json!(
            app,
            TestRequest::get()
                .uri(&format!("/api/users/{}", alice))
                .insert_header(bearer(&alice_token))
        );
        assert_eq!(body["movie_count"], 1);

        let resp = test::call_service(
            &app,
            TestRequest::delete()
                .uri(&movie_uri)
                .insert_header(bearer(&alice_token))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let (status, body) = call_json!(
            app,
            TestRequest::get().uri(&movie_uri).insert_header(bearer(&alice_token))
        );
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
    }

    fn location<B>(resp: &ServiceResponse<B>) -> String {
        resp.headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned()
    }

    macro_rules! login {
        ($app:expr, $username:expr) => {{
            let resp = test::call_service(
                &$app,
                TestRequest::post()
                    .uri("/register")
                    .set_form(&[
                        ("username", $username),
                        ("email", format!("{}@example.com", $username).as_str()),
                        ("password", "secret"),
                    ])
                    .to_request(),
            )
            .await;
            assert_eq!(location(&resp), "/login?registered");
            let resp = test::call_service(
                &$app,
                TestRequest::post()
                    .uri("/login")
                    .set_form(&[("username", $username), ("password", "secret")])
                    .to_request(),
            )
            .await;
            assert_eq!(location(&resp), "/");
            let cookie: Cookie<'static> = resp
                .response()
                .cookies()
                .find(|cookie| cookie.name() == "auth-cookie")
                .unwrap()
                .into_owned();
            cookie
        }};
    }

    async fn body_text<B: MessageBody>(resp: ServiceResponse<B>) -> String {
        String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
    }

    #[actix_rt::test]
    async fn html_movie_list() {
        let (config, tera, db) = state();
        let app = test::init_service(movielist_app!(config, tera, db)).await;

        let resp = test::call_service(&app, TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("create an account"));

        let resp =
            test::call_service(&app, TestRequest::get().uri("/add_movie").to_request()).await;
        assert_eq!(location(&resp), "/login");

        let resp = test::call_service(
            &app,
            TestRequest::post()
                .uri("/login")
                .set_form(&[("username", "nobody"), ("password", "secret")])
                .to_request(),
        )
        .await;
        assert_eq!(location(&resp), "/login?wrong_password");

        let alice = login!(app, "alice");
        let resp = test::call_service(
            &app,
            TestRequest::post()
                .uri("/add_movie")
                .cookie(alice.clone())
                .set_form(&[
                    ("id", ""),
                    ("name", "Pulp Fiction"),
                    ("year", "1994"),
                    ("oscars", "1"),
                ])
                .to_request(),
        )
        .await;
        assert_eq!(location(&resp), "/");

        let resp = test::call_service(
            &app,
            TestRequest::post()
                .uri("/add_movie")
                .cookie(alice.clone())
                .set_form(&[("id", ""), ("name", "Heat"), ("year", "soon"), ("oscars", "0")])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("must be whole numbers"));

        let resp = test::call_service(
            &app,
            TestRequest::get().uri("/").cookie(alice.clone()).to_request(),
        )
        .await;
        let page = body_text(resp).await;
        assert!(page.contains("Pulp Fiction"));
        assert!(!page.contains("Heat"));

        let movie_id = db.list_movies().unwrap()[0].0;
        let resp = test::call_service(
            &app,
            TestRequest::post()
                .uri("/add_movie")
                .cookie(alice.clone())
                .set_form(&[
                    ("id", movie_id.to_string().as_str()),
                    ("name", "Pulp Fiction"),
                    ("year", "1994"),
                    ("oscars", "2"),
                ])
                .to_request(),
        )
        .await;
        assert_eq!(location(&resp), "/");
        assert_eq!(db.get_movie(movie_id).unwrap().unwrap().oscars, 2);

        let bob = login!(app, "bob");
        let resp = test::call_service(
            &app,
            TestRequest::post()
                .uri(&format!("/delete_movie/{}", movie_id))
                .cookie(bob)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(
            &app,
            TestRequest::post()
                .uri(&format!("/delete_movie/{}", movie_id))
                .cookie(alice)
                .to_request(),
        )
        .await;
        assert_eq!(location(&resp), "/");
        assert!(db.get_movie(movie_id).unwrap().is_none());
    }

    #[actix_rt::test]
    async fn html_registration_conflict() {
        let (config, tera, db) = state();
        let app = test::init_service(movielist_app!(config, tera, db)).await;
        login!(app, "alice");

        let resp = test::call_service(
            &app,
            TestRequest::post()
                .uri("/register")
                .set_form(&[
                    ("username", "alice"),
                    ("email", "other@example.com"),
                    ("password", "secret"),
                ])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Please use a different username."));
    }

    #[actix_rt::test]
    async fn html_edit_form_and_logout() {
        let (config, tera, db) = state();
        let app = test::init_service(movielist_app!(config, tera, db)).await;
        let alice = login!(app, "alice");
        let bob = login!(app, "bob");

        test::call_service(
            &app,
            TestRequest::post()
                .uri("/add_movie")
                .cookie(alice.clone())
                .set_form(&[
                    ("id", ""),
                    ("name", "Pulp Fiction"),
                    ("year", "1994"),
                    ("oscars", "1"),
                ])
                .to_request(),
        )
        .await;
        let movie_id = db.list_movies().unwrap()[0].0;
        let edit_uri = format!("/add_movie?id={}", movie_id);

        let resp = test::call_service(
            &app,
            TestRequest::get().uri(&edit_uri).cookie(alice.clone()).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let page = body_text(resp).await;
        assert!(page.contains("Edit movie"));
        assert!(page.contains(&format!("name=\"id\" value=\"{}\"", movie_id)));
        assert!(page.contains("value=\"Pulp Fiction\""));
        assert!(page.contains("value=\"1994\""));

        let resp = test::call_service(
            &app,
            TestRequest::get().uri(&edit_uri).cookie(bob).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = test::call_service(
            &app,
            TestRequest::get()
                .uri("/add_movie?id=999999")
                .cookie(alice.clone())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(
            &app,
            TestRequest::get().uri("/logout").cookie(alice).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/login?logout");
        let resp =
            test::call_service(&app, TestRequest::get().uri("/login?logout").to_request()).await;
        assert!(body_text(resp).await.contains("You have been logged out."));
    }

    #[actix_rt::test]
    async fn html_registration_requires_fields() {
        let (config, tera, db) = state();
        let app = test::init_service(movielist_app!(config, tera, db)).await;

        let resp = test::call_service(
            &app,
            TestRequest::post()
                .uri("/register")
                .set_form(&[
                    ("username", "   "),
                    ("email", "alice@example.com"),
                    ("password", "secret"),
                ])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("All fields are required."));
        assert!(db.list_users().unwrap().is_empty());

        // usernames registered over the api are trimmed the same way
        let (status, body) = call_json!(
            app,
            TestRequest::post().uri("/api/users").set_json(json!({
                "username": " alice ",
                "email": " alice@example.com\t",
                "password": "secret",
            }))
        );
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["username"], "alice");
        assert_eq!(body["email"], "alice@example.com");

        let resp = test::call_service(
            &app,
            TestRequest::post()
                .uri("/register")
                .set_form(&[
                    ("username", "alice "),
                    ("email", "other@example.com"),
                    ("password", "secret"),
                ])
                .to_request(),
        )
        .await;
        assert!(body_text(resp).await.contains("Please use a different username."));
    }

    #[actix_rt::test]
    async fn user_updates_are_checked() {
        let (config, tera, db) = state();
        let app = test::init_service(movielist_app!(config, tera, db)).await;
        let (alice, token) = user_with_token!(app, "alice");
        let (bob, _) = user_with_token!(app, "bob");
        let alice_uri = format!("/api/users/{}", alice);

        let (status, body) = call_json!(
            app,
            TestRequest::put()
                .uri(&format!("/api/users/{}", bob))
                .insert_header(bearer(&token))
                .set_json(json!({"username": "mallory"}))
        );
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Forbidden");

        let (status, _) = call_json!(
            app,
            TestRequest::put()
                .uri("/api/users/999999")
                .insert_header(bearer(&token))
                .set_json(json!({"username": "mallory"}))
        );
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call_json!(
            app,
            TestRequest::put()
                .uri(&alice_uri)
                .insert_header(bearer(&token))
                .set_json(json!({"email": "bob@example.com"}))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Please use a different email address");

        let (status, body) = call_json!(
            app,
            TestRequest::put()
                .uri(&alice_uri)
                .insert_header(bearer(&token))
                .set_json(json!({"username": "  "}))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Username must not be blank");

        let (status, body) = call_json!(
            app,
            TestRequest::put()
                .uri(&alice_uri)
                .insert_header(bearer(&token))
                .set_json(json!(["alicia", "alicia@example.com"]))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Request body must be a JSON object");

        let (status, body) = call_json!(
            app,
            TestRequest::post()
                .uri("/api/users")
                .set_json(json!(["carol", "carol@example.com", "secret"]))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Request body must be a JSON object");

        let (status, body) = call_json!(
            app,
            TestRequest::put()
                .uri(&alice_uri)
                .insert_header(bearer(&token))
                .set_json(json!({"username": " alicia "}))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alicia");
        assert!(db.get_user_by_username("alice").unwrap().is_none());
        assert_eq!(db.get_user(alice).unwrap().unwrap().email, "alice@example.com");
    }

    #[actix_rt::test]
    async fn missing_movies_and_tokens() {
        let (config, tera, db) = state();
        let app = test::init_service(movielist_app!(config, tera, db)).await;
        let (_, token) = user_with_token!(app, "alice");

        let (status, body) = call_json!(
            app,
            TestRequest::put()
                .uri("/api/movies/999999")
                .insert_header(bearer(&token))
                .set_json(json!({"oscars": 1}))
        );
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");

        let (status, _) = call_json!(
            app,
            TestRequest::delete()
                .uri("/api/movies/999999")
                .insert_header(bearer(&token))
        );
        assert_eq!(status, StatusCode::NOT_FOUND);

        let resp =
            test::call_service(&app, TestRequest::delete().uri("/api/tokens").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer realm=\"Authentication Required\""
        );
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Unauthorized"}));
    }
}
