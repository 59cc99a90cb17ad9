//! Service configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use derivative::Derivative;
use serde::{Deserialize, Deserializer};
use tracing_subscriber::filter::Directive;

/// Logging output format
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Logging {
    /// Additional filtering directives
    #[serde(default, deserialize_with = "Logging::deserialize_filters")]
    pub filters: Vec<Directive>,

    /// Logging format
    #[serde(default)]
    pub format: LogFormat,
}

impl Logging {
    fn deserialize_filters<'de, D>(deserializer: D) -> Result<Vec<Directive>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let dirs: Vec<String> = Deserialize::deserialize(deserializer)?;
        dirs.into_iter()
            .map(|dir| dir.parse().map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(tag = "kind")]
pub enum Database {
    /// In-memory database, always migrated on startup
    ///
    /// Every connection would see its own database, so it is limited to a single connection.
    #[default]
    Memory,
    /// File based SQLite database
    SqLite {
        path: PathBuf,
        #[serde(default = "Database::default_max_connections")]
        max_connections: u32,
        /// Run migrations on startup
        #[serde(default)]
        migrate: bool,
    },
}

impl Database {
    fn default_max_connections() -> u32 {
        4
    }
}

/// Session cookie configuration
#[derive(Derivative, Clone, Deserialize)]
#[derivative(Debug)]
pub struct Session {
    /// Server secret the session keys are derived from
    #[derivative(Debug = "ignore")]
    pub secret: String,

    /// Absolute session lifetime in days
    #[serde(default = "Session::default_max_age_days")]
    pub max_age_days: u64,

    /// Emit the `Secure` cookie attribute
    #[serde(default)]
    pub secure: bool,
}

impl Session {
    fn default_max_age_days() -> u64 {
        14
    }
}

/// Top level service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address where to host the service
    #[serde(default = "Config::default_host")]
    pub host: SocketAddr,

    /// Logging configuration
    #[serde(default)]
    pub logging: Logging,

    /// Database configuration
    #[serde(default)]
    pub db: Database,

    /// Session configuration
    pub session: Session,
}

impl Config {
    fn default_host() -> SocketAddr {
        ([127, 0, 0, 1], 8080).into()
    }
}
