use crate::model::*;
use sled::transaction::{abort, ConflictableTransactionResult, TransactionError, Transactional};
use std::convert::TryInto;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Storage(#[from] sled::Error),
    #[error("document encoding: {0}")]
    Codec(#[from] bincode::Error),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("index entry {0:?} points to a missing document")]
    BrokenIndex(String),
    #[error("malformed document key")]
    MalformedKey,
}

// Big-endian so that tree iteration follows id order.
fn serialize_id(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn deserialize_id<V: AsRef<[u8]>>(id: V) -> Result<u64, DbError> {
    let bytes: [u8; 8] = id.as_ref().try_into().map_err(|_| DbError::MalformedKey)?;
    Ok(u64::from_be_bytes(bytes))
}

fn finish<T>(result: Result<T, TransactionError<DbError>>) -> Result<T, DbError> {
    match result {
        Ok(value) => Ok(value),
        Err(TransactionError::Abort(err)) => Err(err),
        Err(TransactionError::Storage(err)) => Err(err.into()),
    }
}

pub trait MovieDb {
    type Error;
    /// Returns `None` if a movie with the same title is already stored.
    fn add_movie(&self, movie: &Movie) -> Result<Option<u64>, Self::Error>;
    fn get_movie_by_title(&self, title: &str) -> Result<Option<(u64, Movie)>, Self::Error>;
    fn movies(&self) -> Result<Vec<(u64, Movie)>, Self::Error>;
    /// First movie in id order matching `predicate`.
    fn find_movie<P>(&self, predicate: P) -> Result<Option<(u64, Movie)>, Self::Error>
    where
        P: Fn(&Movie) -> bool;
}

pub trait UserDb {
    type Error;
    /// Returns `None` if the username is taken.
    fn add_user(&self, user: &User) -> Result<Option<u64>, Self::Error>;
    fn get_user(&self, id: u64) -> Result<Option<User>, Self::Error>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<(u64, User)>, Self::Error>;
    fn users(&self) -> Result<Vec<(u64, User)>, Self::Error>;
    /// Applies `change` to the user in one transaction, moving the username
    /// index entry if the username changed.
    fn update_user<F>(&self, username: &str, change: F) -> Result<Option<(u64, User)>, Self::Error>
    where
        F: Fn(&mut User);
    fn delete_user(&self, username: &str) -> Result<Option<u64>, Self::Error>;
}

const MOVIES: &[u8] = b"movies";
const MOVIES_TITLE: &[u8] = b"MOVIES_TITLE";
const USERS: &[u8] = b"users";
const USERS_USERNAME: &[u8] = b"USERS_USERNAME";

/// Inserts a document keyed by a fresh id and claims `unique_key` in the
/// index tree. Aborts without writing if the key is already claimed.
fn insert_indexed(
    db: &sled::Db,
    documents: &[u8],
    index: &[u8],
    unique_key: &str,
    encoded: Vec<u8>,
) -> Result<Option<u64>, DbError> {
    let documents = db.open_tree(documents)?;
    let index = db.open_tree(index)?;
    let id = db.generate_id()?;
    let key = serialize_id(id);
    let result = (&documents, &index).transaction(
        |(documents, index)| -> ConflictableTransactionResult<bool, DbError> {
            if index.insert(unique_key.as_bytes(), &key[..])?.is_some() {
                return abort(DbError::AlreadyExists(unique_key.to_owned()));
            }
            documents.insert(&key[..], encoded.clone())?;
            Ok(true)
        },
    );
    match finish(result) {
        Ok(_) => Ok(Some(id)),
        Err(DbError::AlreadyExists(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

fn get_indexed<T: serde::de::DeserializeOwned>(
    db: &sled::Db,
    documents: &[u8],
    index: &[u8],
    unique_key: &str,
) -> Result<Option<(u64, T)>, DbError> {
    let index = db.open_tree(index)?;
    let documents = db.open_tree(documents)?;
    if let Some(id) = index.get(unique_key)? {
        let data = documents
            .get(&id)?
            .ok_or_else(|| DbError::BrokenIndex(unique_key.to_owned()))?;
        Ok(Some((deserialize_id(id)?, bincode::deserialize(&data)?)))
    } else {
        Ok(None)
    }
}

fn get_by_id<T: serde::de::DeserializeOwned>(
    db: &sled::Db,
    documents: &[u8],
    id: u64,
) -> Result<Option<T>, DbError> {
    match db.open_tree(documents)?.get(serialize_id(id))? {
        Some(data) => Ok(Some(bincode::deserialize(&data)?)),
        None => Ok(None),
    }
}

fn scan<T: serde::de::DeserializeOwned>(
    db: &sled::Db,
    documents: &[u8],
) -> Result<Vec<(u64, T)>, DbError> {
    db.open_tree(documents)?
        .iter()
        .map(|entry| -> Result<(u64, T), DbError> {
            let (key, data) = entry?;
            Ok((deserialize_id(key)?, bincode::deserialize(&data)?))
        })
        .collect()
}

impl MovieDb for sled::Db {
    type Error = DbError;

    fn add_movie(&self, movie: &Movie) -> Result<Option<u64>, DbError> {
        let encoded = bincode::serialize(movie)?;
        insert_indexed(self, MOVIES, MOVIES_TITLE, &movie.title, encoded)
    }

    fn get_movie_by_title(&self, title: &str) -> Result<Option<(u64, Movie)>, DbError> {
        get_indexed(self, MOVIES, MOVIES_TITLE, title)
    }

    fn movies(&self) -> Result<Vec<(u64, Movie)>, DbError> {
        scan(self, MOVIES)
    }

    fn find_movie<P>(&self, predicate: P) -> Result<Option<(u64, Movie)>, DbError>
    where
        P: Fn(&Movie) -> bool,
    {
        for entry in self.open_tree(MOVIES)?.iter() {
            let (key, data) = entry?;
            let movie: Movie = bincode::deserialize(&data)?;
            if predicate(&movie) {
                return Ok(Some((deserialize_id(key)?, movie)));
            }
        }
        Ok(None)
    }
}

impl UserDb for sled::Db {
    type Error = DbError;

    fn add_user(&self, user: &User) -> Result<Option<u64>, DbError> {
        let encoded = bincode::serialize(user)?;
        insert_indexed(self, USERS, USERS_USERNAME, &user.username, encoded)
    }

    fn get_user(&self, id: u64) -> Result<Option<User>, DbError> {
        get_by_id(self, USERS, id)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<(u64, User)>, DbError> {
        get_indexed(self, USERS, USERS_USERNAME, username)
    }

    fn users(&self) -> Result<Vec<(u64, User)>, DbError> {
        scan(self, USERS)
    }

    fn update_user<F>(&self, username: &str, change: F) -> Result<Option<(u64, User)>, DbError>
    where
        F: Fn(&mut User),
    {
        let users = self.open_tree(USERS)?;
        let users_username = self.open_tree(USERS_USERNAME)?;
        let result = (&users, &users_username).transaction(
            |(users, users_username)| -> ConflictableTransactionResult<_, DbError> {
                let key = match users_username.get(username.as_bytes())? {
                    Some(key) => key,
                    None => return Ok(None),
                };
                let id = match deserialize_id(&key) {
                    Ok(id) => id,
                    Err(err) => return abort(err),
                };
                let data = match users.get(key.clone())? {
                    Some(data) => data,
                    None => return abort(DbError::BrokenIndex(username.to_owned())),
                };
                let mut user: User = match bincode::deserialize(&data) {
                    Ok(user) => user,
                    Err(err) => return abort(err.into()),
                };
                change(&mut user);
                if user.username != username {
                    if users_username
                        .insert(user.username.as_bytes(), key.clone())?
                        .is_some()
                    {
                        return abort(DbError::AlreadyExists(user.username));
                    }
                    users_username.remove(username.as_bytes())?;
                }
                let encoded = match bincode::serialize(&user) {
                    Ok(encoded) => encoded,
                    Err(err) => return abort(err.into()),
                };
                users.insert(key, encoded)?;
                Ok(Some((id, user)))
            },
        );
        finish(result)
    }

    fn delete_user(&self, username: &str) -> Result<Option<u64>, DbError> {
        let users = self.open_tree(USERS)?;
        let users_username = self.open_tree(USERS_USERNAME)?;
        let result = (&users, &users_username).transaction(
            |(users, users_username)| -> ConflictableTransactionResult<_, DbError> {
                match users_username.remove(username.as_bytes())? {
                    Some(key) => {
                        users.remove(key.clone())?;
                        match deserialize_id(&key) {
                            Ok(id) => Ok(Some(id)),
                            Err(err) => abort(err),
                        }
                    }
                    None => Ok(None),
                }
            },
        );
        finish(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn temporary() -> sled::Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    fn movie(title: &str, genre: &str, director: &str) -> Movie {
        Movie {
            title: title.to_owned(),
            description: format!("About {}", title),
            genre: Genre {
                name: genre.to_owned(),
                description: format!("{} films", genre),
            },
            director: Director {
                name: director.to_owned(),
                bio: format!("{} directs films", director),
            },
            actors: vec!["Someone".to_owned()],
            image_path: format!("{}.png", title),
            featured: false,
        }
    }

    fn user(username: &str) -> User {
        User {
            username: username.to_owned(),
            password_hash: "hash".to_owned(),
            email: format!("{}@example.com", username),
            birthday: None,
            favorite_movies: Vec::new(),
        }
    }

    #[test]
    fn movie_titles_are_unique() {
        let db = temporary();
        assert!(db.add_movie(&movie("Up", "Animation", "Pete Docter")).unwrap().is_some());
        assert!(db.add_movie(&movie("Up", "Drama", "Someone Else")).unwrap().is_none());
        assert_eq!(db.movies().unwrap().len(), 1);
    }

    #[test]
    fn movie_lookup_by_title_is_exact() {
        let db = temporary();
        let id = db
            .add_movie(&movie("Fight Club", "Drama", "David Fincher"))
            .unwrap()
            .unwrap();
        let (found_id, found) = db.get_movie_by_title("Fight Club").unwrap().unwrap();
        assert_eq!(found_id, id);
        assert_eq!(found.title, "Fight Club");
        assert!(db.get_movie_by_title("fight club").unwrap().is_none());
        assert_eq!(db.movies().unwrap(), vec![(id, found)]);
    }

    #[test]
    fn find_movie_returns_first_in_id_order() {
        let db = temporary();
        db.add_movie(&movie("Pulp Fiction", "Crime", "Quentin Tarantino"))
            .unwrap();
        db.add_movie(&movie("Django Unchained", "Western", "Quentin Tarantino"))
            .unwrap();
        let (_, found) = db
            .find_movie(|m| m.director.name == "Quentin Tarantino")
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "Pulp Fiction");
        assert!(db.find_movie(|m| m.genre.name == "Horror").unwrap().is_none());
    }

    #[test]
    fn usernames_are_claimed_once() {
        let db = temporary();
        let id = db.add_user(&user("alice")).unwrap().unwrap();
        assert!(db.add_user(&user("alice")).unwrap().is_none());
        let users = db.users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].0, id);
        assert_eq!(users[0].1.username, "alice");
    }

    #[test]
    fn concurrent_signups_claim_a_username_once() {
        let db = temporary();
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    db.add_user(&user("alice")).unwrap()
                })
            })
            .collect();
        let winners: Vec<u64> = handles
            .into_iter()
            .filter_map(|handle| handle.join().unwrap())
            .collect();
        assert_eq!(winners.len(), 1);
        let users = db.users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].0, winners[0]);
        assert_eq!(db.get_user_by_username("alice").unwrap().unwrap().0, winners[0]);
    }

    #[test]
    fn users_are_fetched_by_id() {
        let db = temporary();
        let id = db.add_user(&user("alice")).unwrap().unwrap();
        assert_eq!(db.get_user(id).unwrap().unwrap().username, "alice");
        db.delete_user("alice").unwrap();
        assert!(db.get_user(id).unwrap().is_none());
    }

    #[test]
    fn rename_moves_the_index_entry() {
        let db = temporary();
        let id = db.add_user(&user("alice")).unwrap().unwrap();
        let (updated_id, updated) = db
            .update_user("alice", |u| u.username = "alicia".to_owned())
            .unwrap()
            .unwrap();
        assert_eq!(updated_id, id);
        assert_eq!(updated.username, "alicia");
        assert!(db.get_user_by_username("alice").unwrap().is_none());
        assert_eq!(db.get_user_by_username("alicia").unwrap().unwrap().0, id);
    }

    #[test]
    fn rename_onto_taken_username_is_rejected() {
        let db = temporary();
        db.add_user(&user("alice")).unwrap();
        db.add_user(&user("bobby")).unwrap();
        match db.update_user("alice", |u| u.username = "bobby".to_owned()) {
            Err(DbError::AlreadyExists(name)) => assert_eq!(name, "bobby"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(
            db.get_user_by_username("alice").unwrap().unwrap().1.username,
            "alice"
        );
    }

    #[test]
    fn update_of_missing_user_is_none() {
        let db = temporary();
        assert!(db.update_user("ghost", |_| {}).unwrap().is_none());
    }

    #[test]
    fn delete_removes_document_and_index() {
        let db = temporary();
        let id = db.add_user(&user("alice")).unwrap().unwrap();
        assert_eq!(db.delete_user("alice").unwrap(), Some(id));
        assert!(db.users().unwrap().is_empty());
        assert!(db.get_user_by_username("alice").unwrap().is_none());
        assert_eq!(db.delete_user("alice").unwrap(), None);
        assert!(db.add_user(&user("alice")).unwrap().is_some());
    }
}
