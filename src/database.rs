use crate::model::*;
use serde::de::DeserializeOwned;
use sled::transaction::{abort, TransactionError, Transactional};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("username is already taken")]
    UsernameTaken,
    #[error("email address is already registered")]
    EmailTaken,
    #[error("no record with id {0}")]
    NotFound(u64),
    #[error("corrupt entry in {0}")]
    CorruptIndex(&'static str),
}

impl From<TransactionError<DbError>> for DbError {
    fn from(err: TransactionError<DbError>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => DbError::Storage(e),
        }
    }
}

// Big endian so that tree iteration and prefix scans follow id order.
fn serialize_id(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn deserialize_id<V: AsRef<[u8]>>(id: V, tree: &'static str) -> Result<u64, DbError> {
    use std::convert::TryInto;
    id.as_ref()
        .try_into()
        .map(u64::from_be_bytes)
        .map_err(|_| DbError::CorruptIndex(tree))
}

fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, DbError> {
    Ok(bincode::deserialize(data)?)
}

fn owner_key(user_id: u64, movie_id: u64) -> Vec<u8> {
    let mut key = serialize_id(user_id).to_vec();
    key.extend_from_slice(&serialize_id(movie_id));
    key
}

pub trait UserDb {
    type Error;
    fn add_user(&self, user: &User) -> Result<u64, Self::Error>;
    fn get_user(&self, id: u64) -> Result<Option<User>, Self::Error>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<(u64, User)>, Self::Error>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<(u64, User)>, Self::Error>;
    fn get_user_by_token(&self, token: &str) -> Result<Option<(u64, User)>, Self::Error>;
    fn list_users(&self) -> Result<Vec<(u64, User)>, Self::Error>;
    /// Applies `change` to the stored record of user `id` within one transaction
    /// and returns the stored result. `change` may run more than once.
    fn update_user_with<R, F>(&self, id: u64, change: F) -> Result<(User, R), Self::Error>
    where
        F: Fn(&mut User) -> R;
}

pub trait MovieDb {
    type Error;
    fn add_movie(&self, movie: &Movie) -> Result<u64, Self::Error>;
    fn get_movie(&self, id: u64) -> Result<Option<Movie>, Self::Error>;
    fn list_movies(&self) -> Result<Vec<(u64, Movie)>, Self::Error>;
    fn list_movies_by_owner(&self, user_id: u64) -> Result<Vec<(u64, Movie)>, Self::Error>;
    fn count_movies_by_owner(&self, user_id: u64) -> Result<usize, Self::Error>;
    /// Stores new movie data under `id`. The owner of the stored record is kept.
    fn update_movie(&self, id: u64, movie: &Movie) -> Result<Movie, Self::Error>;
    fn remove_movie(&self, id: u64) -> Result<Option<Movie>, Self::Error>;
}

const USERS: &str = "users";
const USERS_USERNAME: &str = "users_username";
const USERS_EMAIL: &str = "users_email";
const USERS_TOKEN: &str = "users_token";
const MOVIES: &str = "movies";
const MOVIES_OWNER: &str = "movies_owner";

fn lookup_user(
    db: &sled::Db,
    index: &'static str,
    value: &str,
) -> Result<Option<(u64, User)>, DbError> {
    let index_tree = db.open_tree(index)?;
    if let Some(id) = index_tree.get(value.as_bytes())? {
        let id = deserialize_id(id, index)?;
        let user = db.get_user(id)?.ok_or(DbError::CorruptIndex(index))?;
        Ok(Some((id, user)))
    } else {
        Ok(None)
    }
}

impl UserDb for sled::Db {
    type Error = DbError;

    fn add_user(&self, user: &User) -> Result<u64, DbError> {
        let users = self.open_tree(USERS)?;
        let users_username = self.open_tree(USERS_USERNAME)?;
        let users_email = self.open_tree(USERS_EMAIL)?;
        let users_token = self.open_tree(USERS_TOKEN)?;
        let id = self.generate_id()?;
        let key = serialize_id(id);
        let data = bincode::serialize(user)?;
        (&users, &users_username, &users_email, &users_token).transaction(
            |(users, users_username, users_email, users_token)| {
                if users_username
                    .insert(user.username.as_bytes(), &key[..])?
                    .is_some()
                {
                    return abort(DbError::UsernameTaken);
                }
                if users_email.insert(user.email.as_bytes(), &key[..])?.is_some() {
                    return abort(DbError::EmailTaken);
                }
                if let Some(token) = &user.token {
                    users_token.insert(token.as_bytes(), &key[..])?;
                }
                users.insert(&key[..], data.as_slice())?;
                Ok(())
            },
        )?;
        Ok(id)
    }

    fn get_user(&self, id: u64) -> Result<Option<User>, DbError> {
        let users = self.open_tree(USERS)?;
        users
            .get(serialize_id(id))?
            .map(|d| decode(&d))
            .transpose()
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<(u64, User)>, DbError> {
        lookup_user(self, USERS_USERNAME, username)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<(u64, User)>, DbError> {
        lookup_user(self, USERS_EMAIL, email)
    }

    fn get_user_by_token(&self, token: &str) -> Result<Option<(u64, User)>, DbError> {
        lookup_user(self, USERS_TOKEN, token)
    }

    fn list_users(&self) -> Result<Vec<(u64, User)>, DbError> {
        let users = self.open_tree(USERS)?;
        users
            .iter()
            .map(|entry| -> Result<(u64, User), DbError> {
                let (id, data) = entry?;
                Ok((deserialize_id(id, USERS)?, decode(&data)?))
            })
            .collect()
    }

    fn update_user_with<R, F>(&self, id: u64, change: F) -> Result<(User, R), DbError>
    where
        F: Fn(&mut User) -> R,
    {
        let users = self.open_tree(USERS)?;
        let users_username = self.open_tree(USERS_USERNAME)?;
        let users_email = self.open_tree(USERS_EMAIL)?;
        let users_token = self.open_tree(USERS_TOKEN)?;
        let key = serialize_id(id);
        let updated = (&users, &users_username, &users_email, &users_token).transaction(
            |(users, users_username, users_email, users_token)| {
                let old: User = match users.get(&key)? {
                    Some(old) => match bincode::deserialize(&old) {
                        Ok(old) => old,
                        Err(err) => return abort(DbError::Codec(err)),
                    },
                    None => return abort(DbError::NotFound(id)),
                };
                let mut user = old.clone();
                let result = change(&mut user);
                if old.username != user.username {
                    users_username.remove(old.username.as_bytes())?;
                    if users_username
                        .insert(user.username.as_bytes(), &key[..])?
                        .is_some()
                    {
                        return abort(DbError::UsernameTaken);
                    }
                }
                if old.email != user.email {
                    users_email.remove(old.email.as_bytes())?;
                    if users_email.insert(user.email.as_bytes(), &key[..])?.is_some() {
                        return abort(DbError::EmailTaken);
                    }
                }
                if old.token != user.token {
                    if let Some(token) = &old.token {
                        users_token.remove(token.as_bytes())?;
                    }
                    if let Some(token) = &user.token {
                        users_token.insert(token.as_bytes(), &key[..])?;
                    }
                }
                match bincode::serialize(&user) {
                    Ok(data) => users.insert(&key[..], data)?,
                    Err(err) => return abort(DbError::Codec(err)),
                };
                Ok((user, result))
            },
        )?;
        Ok(updated)
    }
}

impl MovieDb for sled::Db {
    type Error = DbError;

    fn add_movie(&self, movie: &Movie) -> Result<u64, DbError> {
        let movies = self.open_tree(MOVIES)?;
        let movies_owner = self.open_tree(MOVIES_OWNER)?;
        let id = self.generate_id()?;
        let key = serialize_id(id);
        let data = bincode::serialize(movie)?;
        (&movies, &movies_owner).transaction(|(movies, movies_owner)| {
            movies.insert(&key[..], data.as_slice())?;
            movies_owner.insert(owner_key(movie.user_id, id), Vec::<u8>::new())?;
            Ok::<_, sled::transaction::ConflictableTransactionError<DbError>>(())
        })?;
        Ok(id)
    }

    fn get_movie(&self, id: u64) -> Result<Option<Movie>, DbError> {
        let movies = self.open_tree(MOVIES)?;
        movies
            .get(serialize_id(id))?
            .map(|d| decode(&d))
            .transpose()
    }

    fn list_movies(&self) -> Result<Vec<(u64, Movie)>, DbError> {
        let movies = self.open_tree(MOVIES)?;
        movies
            .iter()
            .map(|entry| -> Result<(u64, Movie), DbError> {
                let (id, data) = entry?;
                Ok((deserialize_id(id, MOVIES)?, decode(&data)?))
            })
            .collect()
    }

    fn list_movies_by_owner(&self, user_id: u64) -> Result<Vec<(u64, Movie)>, DbError> {
        let movies_owner = self.open_tree(MOVIES_OWNER)?;
        movies_owner
            .scan_prefix(serialize_id(user_id))
            .keys()
            .map(|key| -> Result<(u64, Movie), DbError> {
                let key = key?;
                let id = deserialize_id(&key[8..], MOVIES_OWNER)?;
                let movie = self
                    .get_movie(id)?
                    .ok_or(DbError::CorruptIndex(MOVIES_OWNER))?;
                Ok((id, movie))
            })
            .collect()
    }

    fn count_movies_by_owner(&self, user_id: u64) -> Result<usize, DbError> {
        let movies_owner = self.open_tree(MOVIES_OWNER)?;
        let mut count = 0;
        for key in movies_owner.scan_prefix(serialize_id(user_id)).keys() {
            key?;
            count += 1;
        }
        Ok(count)
    }

    fn update_movie(&self, id: u64, movie: &Movie) -> Result<Movie, DbError> {
        let movies = self.open_tree(MOVIES)?;
        let key = serialize_id(id);
        let stored = movies.transaction(|movies| {
            let old: Movie = match movies.get(&key)? {
                Some(old) => match bincode::deserialize(&old) {
                    Ok(old) => old,
                    Err(err) => return abort(DbError::Codec(err)),
                },
                None => return abort(DbError::NotFound(id)),
            };
            let stored = Movie {
                user_id: old.user_id,
                ..movie.clone()
            };
            match bincode::serialize(&stored) {
                Ok(data) => movies.insert(&key[..], data)?,
                Err(err) => return abort(DbError::Codec(err)),
            };
            Ok(stored)
        })?;
        Ok(stored)
    }

    fn remove_movie(&self, id: u64) -> Result<Option<Movie>, DbError> {
        let movies = self.open_tree(MOVIES)?;
        let movies_owner = self.open_tree(MOVIES_OWNER)?;
        let key = serialize_id(id);
        let removed = (&movies, &movies_owner).transaction(|(movies, movies_owner)| {
            let movie: Movie = match movies.remove(&key[..])? {
                Some(data) => match bincode::deserialize(&data) {
                    Ok(movie) => movie,
                    Err(err) => return abort(DbError::Codec(err)),
                },
                None => return Ok(None),
            };
            movies_owner.remove(owner_key(movie.user_id, id))?;
            Ok(Some(movie))
        })?;
        Ok(removed)
    }
}
