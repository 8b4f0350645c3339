use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Genre {
    pub name: String,
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Director {
    pub name: String,
    pub bio: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Movie {
    pub title: String,
    pub description: String,
    pub genre: Genre,
    pub director: Director,
    pub actors: Vec<String>,
    pub image_path: String,
    pub featured: bool,
}

/// A registered account. Stored with bincode, so no `skip_serializing_if`
/// or `flatten` attributes here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    pub username: String,
    #[serde(rename = "Password")]
    pub password_hash: String,
    pub email: String,
    pub birthday: Option<NaiveDate>,
    pub favorite_movies: Vec<u64>,
}

/// A stored record together with its generated id, as sent to clients.
#[derive(Serialize, Debug)]
pub struct Document<T> {
    #[serde(rename = "_id")]
    pub id: u64,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Document<T> {
    pub fn new(id: u64, body: T) -> Self {
        Document { id, body }
    }
}

impl<T> From<(u64, T)> for Document<T> {
    fn from((id, body): (u64, T)) -> Self {
        Document::new(id, body)
    }
}
