//! Configuration loading and representation.
//!
//! Values come from the process environment, which is seeded from a local
//! `.env` file at startup. Once built, an [`AppConfig`] is passed around
//! explicitly; nothing reads the environment after that.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::loader::BatchSize;

pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_BULK_ROWS: usize = 1_000_000;
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load env file {path}: {message}")]
    EnvFile { path: String, message: String },

    #[error("missing required variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Load variables from `path`, or from `.env` in the current directory (or
/// any parent) when `path` is `None`.
///
/// Variables already present in the environment are not overridden.
pub fn load_dotenv(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match path {
        Some(path) => {
            dotenv::from_path(path).map_err(|e| ConfigError::EnvFile {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            Ok(path.to_path_buf())
        }
        None => dotenv::dotenv().map_err(|e| ConfigError::EnvFile {
            path: ".env".to_string(),
            message: e.to_string(),
        }),
    }
}

/// Which SQL backend to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Driver {
    #[default]
    MySql,
    Sqlite,
}

impl FromStr for Driver {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::Invalid {
                key: "DB_DRIVER",
                message: format!("unknown driver '{other}' (expected mysql or sqlite)"),
            }),
        }
    }
}

/// Connection parameters for the products store.
///
/// For [`Driver::Sqlite`] only `database` is used; it holds the file path
/// (or `:memory:`).
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub driver: Driver,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl DbConfig {
    /// MySQL connection parameters.
    pub fn mysql(
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Self {
        Self {
            driver: Driver::MySql,
            user: user.into(),
            password: password.into(),
            host: host.into(),
            port,
            database: database.into(),
        }
    }

    /// SQLite database at `path` (`:memory:` for a private in-memory database).
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            driver: Driver::Sqlite,
            user: String::new(),
            password: String::new(),
            host: String::new(),
            port: 0,
            database: path.into(),
        }
    }

    /// Build from the process environment (`DB_*` variables).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let driver = match non_empty(&lookup, "DB_DRIVER") {
            Some(value) => value.parse()?,
            None => Driver::default(),
        };

        let config = match driver {
            Driver::Sqlite => Self::sqlite(required(&lookup, "DB_NAME")?),
            Driver::MySql => {
                let port = match non_empty(&lookup, "DB_PORT") {
                    Some(value) => parse_value("DB_PORT", &value)?,
                    None => DEFAULT_MYSQL_PORT,
                };
                Self::mysql(
                    required(&lookup, "DB_USER")?,
                    lookup("DB_PASSWORD").unwrap_or_default(),
                    required(&lookup, "DB_HOST")?,
                    port,
                    required(&lookup, "DB_NAME")?,
                )
            }
        };

        debug!(dsn = %config.redacted_dsn(), "database configuration loaded");
        Ok(config)
    }

    /// Connection string in `user:password@tcp(host:port)/database` form.
    pub fn dsn(&self) -> String {
        self.render_dsn(&self.password)
    }

    /// Same as [`dsn`](Self::dsn) with the password masked; safe to log.
    pub fn redacted_dsn(&self) -> String {
        if self.password.is_empty() {
            self.render_dsn("")
        } else {
            self.render_dsn("***")
        }
    }

    fn render_dsn(&self, password: &str) -> String {
        match self.driver {
            Driver::MySql => format!(
                "{}:{}@tcp({}:{})/{}",
                self.user, password, self.host, self.port, self.database
            ),
            Driver::Sqlite => format!("sqlite:{}", self.database),
        }
    }
}

impl core::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DbConfig")
            .field("driver", &self.driver)
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

/// Bulk load parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSettings {
    /// Number of synthetic products to generate.
    pub rows: usize,
    pub batch_size: BatchSize,
    /// Generate records lazily while loading instead of materializing them
    /// all before the first write.
    pub streaming: bool,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            rows: DEFAULT_BULK_ROWS,
            batch_size: BatchSize::default(),
            streaming: false,
        }
    }
}

impl LoadSettings {
    /// Build from `BULK_ROWS`, `BULK_BATCH_SIZE` and `BULK_STREAMING`; unset
    /// variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(value) = non_empty(&lookup, "BULK_ROWS") {
            settings.rows = parse_value("BULK_ROWS", &value)?;
        }
        if let Some(value) = non_empty(&lookup, "BULK_BATCH_SIZE") {
            let size: usize = parse_value("BULK_BATCH_SIZE", &value)?;
            settings.batch_size = BatchSize::new(size).map_err(|e| ConfigError::Invalid {
                key: "BULK_BATCH_SIZE",
                message: e.to_string(),
            })?;
        }
        if let Some(value) = non_empty(&lookup, "BULK_STREAMING") {
            settings.streaming = parse_flag("BULK_STREAMING", &value)?;
        }

        Ok(settings)
    }
}

/// Everything the binary needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DbConfig,
    pub load: LoadSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database: DbConfig::from_lookup(&lookup)?,
            load: LoadSettings::from_lookup(&lookup)?,
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key).ok_or(ConfigError::Missing(key))
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: format!("'{value}': {e}"),
    })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            message: format!("'{other}' is not a boolean"),
        }),
    }
}
