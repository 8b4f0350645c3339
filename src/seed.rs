use crate::database::{DbError, MovieDb};
use crate::model::Movie;
use log::info;
use std::path::Path;
use thiserror::Error;

/// Films loaded into an empty store when no seed file is configured.
pub const BUNDLED_MOVIES: &str = include_str!("../data/movies.json");

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("reading seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing seed data: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Db(#[from] DbError),
}

pub fn parse_movies(data: &str) -> Result<Vec<Movie>, SeedError> {
    Ok(serde_json::from_str(data)?)
}

/// Adds every movie whose title is not stored yet; returns how many were added.
pub fn insert_movies(db: &sled::Db, movies: &[Movie]) -> Result<usize, SeedError> {
    let mut added = 0;
    for movie in movies {
        if db.add_movie(movie)?.is_some() {
            added += 1;
        }
    }
    Ok(added)
}

/// Seeds the movie collection if it is empty.
pub fn seed_if_empty(db: &sled::Db, seed_file: Option<&Path>) -> Result<usize, SeedError> {
    if !db.movies()?.is_empty() {
        return Ok(0);
    }
    let movies = match seed_file {
        Some(path) => parse_movies(&std::fs::read_to_string(path)?)?,
        None => parse_movies(BUNDLED_MOVIES)?,
    };
    let added = insert_movies(db, &movies)?;
    info!("seeded {} movies", added);
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temporary() -> sled::Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    #[test]
    fn bundled_movies_parse() {
        let movies = parse_movies(BUNDLED_MOVIES).unwrap();
        assert_eq!(movies.len(), 10);
        assert!(movies.iter().any(|m| m.title == "The Dark Knight"));
    }

    #[test]
    fn seeding_happens_once() {
        let db = temporary();
        assert_eq!(seed_if_empty(&db, None).unwrap(), 10);
        assert_eq!(seed_if_empty(&db, None).unwrap(), 0);
        assert_eq!(db.movies().unwrap().len(), 10);
    }

    #[test]
    fn duplicate_titles_are_skipped() {
        let db = temporary();
        let movies = parse_movies(BUNDLED_MOVIES).unwrap();
        let twice: Vec<Movie> = movies.iter().chain(movies.iter()).cloned().collect();
        assert_eq!(insert_movies(&db, &twice).unwrap(), 10);
    }

    #[test]
    fn missing_seed_file_is_an_error() {
        let db = temporary();
        match seed_if_empty(&db, Some(Path::new("/nonexistent/movies.json"))) {
            Err(SeedError::Io(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
