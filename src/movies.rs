use crate::auth::Caller;
use crate::context::Db;
use crate::database::MovieDb;
use crate::error::ApiError;
use crate::model::{Document, Movie};
use actix_web::{web, HttpResponse};

pub async fn list_movies(_caller: Caller, db: Db) -> Result<HttpResponse, ApiError> {
    let movies: Vec<Document<Movie>> = db.movies()?.into_iter().map(Document::from).collect();
    Ok(HttpResponse::Ok().json(movies))
}

/// Unknown titles answer `null`, not 404.
pub async fn get_movie(
    _caller: Caller,
    db: Db,
    title: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let movie = db.get_movie_by_title(&title)?.map(Document::from);
    Ok(HttpResponse::Ok().json(movie))
}

pub async fn get_genre(
    _caller: Caller,
    db: Db,
    name: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let genre = db
        .find_movie(|movie| movie.genre.name == name.as_str())?
        .map(|(_id, movie)| movie.genre);
    Ok(HttpResponse::Ok().json(genre))
}

pub async fn get_director(
    _caller: Caller,
    db: Db,
    name: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let director = db
        .find_movie(|movie| movie.director.name == name.as_str())?
        .map(|(_id, movie)| movie.director);
    Ok(HttpResponse::Ok().json(director))
}
