//! Service data model

use std::path::PathBuf;

use color_eyre::{Report, Result};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;

use credentials::PasswordHash;

pub mod credentials;
pub mod session;
pub mod signatures;
pub mod users;

use crate::config;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Invalid SQLite path: {path}")]
    InvalidSQLitePath { path: PathBuf },
}

/// Persistence handle shared by all the request handlers
#[derive(Clone)]
pub struct Model {
    /// Database access
    db: sqlx::SqlitePool,
    /// Verified when logging in with an unknown email
    placeholder: PasswordHash,
}

impl Model {
    /// Model for testing purposes - using the in-memory SQLite database
    #[cfg(test)]
    pub async fn test() -> Result<Self> {
        Self::with_config(config::Database::Memory).await
    }

    /// Model from configuration
    ///
    /// If the database is created in-memory, the migrations are being executed automatically. If
    /// database is file based migrations would be executed only if requested by configuration.
    pub async fn with_config(config: config::Database) -> Result<Self> {
        use config::Database::*;

        let db = match config {
            Memory => {
                let opts = SqliteConnectOptions::new()
                    .filename(":memory:")
                    .foreign_keys(true);

                // Dropping the connection drops the whole in-memory database
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_lazy_with(opts);

                sqlx::migrate!("model/migrations").run(&pool).await?;
                pool
            }

            SqLite {
                path,
                max_connections,
                migrate,
            } => {
                let path = path
                    .as_path()
                    .to_str()
                    .ok_or_else(|| Error::InvalidSQLitePath { path: path.clone() })?;

                let opts = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .foreign_keys(true);

                let pool = SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .connect_lazy_with(opts);

                if migrate {
                    sqlx::migrate!("model/migrations").run(&pool).await?;
                }

                pool
            }
        };

        let placeholder = PasswordHash::placeholder().await?;
        Ok(Self { db, placeholder })
    }

    /// Replaces the hash verified for unknown emails
    #[cfg(test)]
    pub fn with_placeholder(self, placeholder: PasswordHash) -> Self {
        Self {
            placeholder,
            ..self
        }
    }

    /// Accesses the DB pool
    pub fn db(&self) -> &sqlx::SqlitePool {
        &self.db
    }

    /// Password hash standing in for users that do not exist
    pub fn placeholder(&self) -> &PasswordHash {
        &self.placeholder
    }
}

/// Checks if the storage failure is the storage refusing the data, rather than the storage being
/// unavailable.
///
/// Constraint violations mean the submitted row is invalid and retrying would not help.
pub fn is_rejection(err: &Report) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(err)) => !matches!(err.kind(), ErrorKind::Other),
        _ => false,
    }
}
