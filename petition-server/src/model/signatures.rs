//! Petition signatures storage

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::prelude::Type;

/// Newtype for signature id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct SignatureId(i64);

impl std::fmt::Display for SignatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SignatureId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<SignatureId> for i64 {
    fn from(id: SignatureId) -> Self {
        id.0
    }
}

impl SignatureId {
    /// Fetches `Signature` with this id from database
    pub async fn fetch(
        self,
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
    ) -> Result<Option<Signature>> {
        Signature::fetch(db, self).await
    }
}

/// Single petition signature
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    /// Signer first name
    pub first: String,
    /// Signer last name
    pub last: String,
    /// Signature payload, usually an image data URL
    pub signature: String,
    /// When the petition was signed
    pub signed_at: DateTime<Utc>,
}

/// Signer as shown on the signers list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerName {
    pub first: String,
    pub last: String,
}

impl std::fmt::Display for SignerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.first, self.last)
    }
}

impl Signature {
    /// Helper to create a signature signed right now
    pub fn new(
        first: impl Into<String>,
        last: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            first: first.into(),
            last: last.into(),
            signature: signature.into(),
            signed_at: Utc::now(),
        }
    }

    /// Stores the signature returning the id assigned by the database.
    ///
    /// Blank names or an empty signature are refused by the table constraints.
    pub async fn create(
        self,
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
    ) -> Result<SignatureId> {
        let result = sqlx::query(
            "insert into signatures(first, last, signature, signed_at) values (?, ?, ?, ?)",
        )
        .bind(self.first)
        .bind(self.last)
        .bind(self.signature)
        .bind(self.signed_at)
        .execute(db)
        .await?;

        Ok(SignatureId(result.last_insert_rowid()))
    }

    /// Fetches signature from the database
    pub async fn fetch(
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
        id: SignatureId,
    ) -> Result<Option<Self>> {
        let row: Option<(String, String, String, DateTime<Utc>)> = sqlx::query_as(
            "select first, last, signature, signed_at from signatures where id = ?",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;

        Ok(row.map(|(first, last, signature, signed_at)| Self {
            first,
            last,
            signature,
            signed_at,
        }))
    }

    /// Total number of signatures
    pub async fn count(db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("select count(*) from signatures")
            .fetch_one(db)
            .await?;
        Ok(count)
    }

    /// Names of all the signers, in signing order
    pub async fn names(
        db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
    ) -> Result<Vec<SignerName>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("select first, last from signatures order by id")
                .fetch_all(db)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(first, last)| SignerName { first, last })
            .collect())
    }
}
