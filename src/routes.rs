use crate::context::AppContext;
use crate::{movies, session, users};
use actix_web::web;
use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct Endpoint {
    pub method: &'static str,
    pub path: &'static str,
    pub auth: bool,
    pub description: &'static str,
}

const fn endpoint(
    method: &'static str,
    path: &'static str,
    auth: bool,
    description: &'static str,
) -> Endpoint {
    Endpoint {
        method,
        path,
        auth,
        description,
    }
}

/// Rendered by the documentation page; keep in step with [`configure`].
pub const ENDPOINTS: &[Endpoint] = &[
    endpoint("GET", "/", false, "Welcome message"),
    endpoint("GET", "/documentation", false, "This page"),
    endpoint("POST", "/login", false, "Exchange Username and Password for a token"),
    endpoint("GET", "/movies", true, "List all movies"),
    endpoint("GET", "/movies/{Title}", true, "Get a movie by its exact title"),
    endpoint("GET", "/movies/genre/{Name}", true, "Get a genre by name"),
    endpoint("GET", "/movies/directors/{Name}", true, "Get a director by name"),
    endpoint("POST", "/users", false, "Register a new account"),
    endpoint("GET", "/users", true, "List all users"),
    endpoint("GET", "/users/{Username}", true, "Get a user by username"),
    endpoint("PUT", "/users/{Username}", true, "Update your own profile"),
    endpoint("POST", "/users/{Username}/movies/{MovieID}", true, "Add a movie to your favorites"),
    endpoint("DELETE", "/users/{Username}/movies/{MovieID}", true, "Remove a movie from your favorites"),
    endpoint("DELETE", "/users/{Username}", true, "Delete your own account"),
];

pub fn configure(cfg: &mut web::ServiceConfig, ctx: &AppContext) {
    cfg.data(ctx.db.clone())
        .data(ctx.tera.clone())
        .data(ctx.tokens.clone())
        .data(ctx.hasher)
        .service(web::resource("/").route(web::get().to(session::welcome)))
        .service(web::resource("/documentation").route(web::get().to(session::documentation)))
        .service(web::resource("/login").route(web::post().to(session::login)))
        .service(web::resource("/movies").route(web::get().to(movies::list_movies)))
        .service(web::resource("/movies/genre/{name}").route(web::get().to(movies::get_genre)))
        .service(
            web::resource("/movies/directors/{name}").route(web::get().to(movies::get_director)),
        )
        .service(web::resource("/movies/{title}").route(web::get().to(movies::get_movie)))
        .service(
            web::resource("/users")
                .route(web::get().to(users::list_users))
                .route(web::post().to(users::create_user)),
        )
        .service(
            web::resource("/users/{username}")
                .route(web::get().to(users::get_user))
                .route(web::put().to(users::update_user))
                .route(web::delete().to(users::delete_user)),
        )
        .service(
            web::resource("/users/{username}/movies/{movie_id}")
                .route(web::post().to(users::add_favorite))
                .route(web::delete().to(users::remove_favorite)),
        );
}
