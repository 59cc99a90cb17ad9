//! Registered users storage

use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::prelude::Type;

use crate::model::credentials::PasswordHash;

/// Newtype for user id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// User registration data
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub first: String,
    pub last: String,
    /// Login identifier, unique among users
    pub email: String,
}

impl User {
    /// Helper to create an user
    pub fn new(first: impl Into<String>, last: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            last: last.into(),
            email: email.into(),
        }
    }

    /// Creates user in the database
    ///
    /// Fails if the email is already taken or any of the names is blank.
    pub async fn create(
        self,
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
        password: &PasswordHash,
    ) -> Result<UserId> {
        let result =
            sqlx::query("insert into users(first, last, email, password) values (?, ?, ?, ?)")
                .bind(self.first)
                .bind(self.last)
                .bind(self.email)
                .bind(password)
                .execute(db)
                .await?;

        Ok(UserId(result.last_insert_rowid()))
    }

    /// Looks up the stored credentials of the user registered with the email
    pub async fn credentials(
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
        email: &str,
    ) -> Result<Option<(UserId, PasswordHash)>> {
        let row = sqlx::query_as("select id, password from users where email = ?")
            .bind(email)
            .fetch_optional(db)
            .await?;

        Ok(row)
    }

    /// Checks the email and password, returning the user they belong to
    ///
    /// An unknown email is verified against `placeholder` instead, so it takes as long as a wrong
    /// password does.
    pub async fn authenticate(
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
        placeholder: &PasswordHash,
        email: &str,
        password: String,
    ) -> Result<Option<UserId>> {
        let (user, hash) = match Self::credentials(db, email).await? {
            Some((user, hash)) => (Some(user), hash),
            None => (None, placeholder.clone()),
        };

        let valid = hash.verify(password).await?;
        Ok(user.filter(|_| valid))
    }
}
