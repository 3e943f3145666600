//! Product store boundary.
//!
//! [`ProductStore`] is the persistence interface for the `products` table.
//! Backends:
//!
//! - [`MySqlProductStore`]: the production target.
//! - [`SqliteProductStore`]: a file or in-memory SQLite database.
//! - [`InMemoryProductStore`]: tests/dev, with failure injection.
//!
//! The SQL backends share their queries through `sql::ProductsTable` and keep
//! a pool capped at one connection. Every operation checks the connection out
//! for its own duration and hands it back on every exit path; transactions
//! that are dropped uncommitted roll back.

pub mod in_memory;
pub mod mysql;
mod sql;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use prodload_core::ProductId;
use prodload_products::{NewProduct, Product};

use crate::config::{DbConfig, Driver};

pub use in_memory::InMemoryProductStore;
pub use mysql::MySqlProductStore;
pub use sqlite::SqliteProductStore;

/// Product store operation error.
///
/// `NotFound` is kept apart from the fault variants so callers can branch on
/// absence without inspecting driver errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no product with id {0}")]
    NotFound(ProductId),

    #[error("failed to connect to {target}")]
    Connect {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to prepare statement for {operation}")]
    Prepare {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("{operation} failed")]
    Execution {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Failure raised by a backend without a driver error behind it.
    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub(crate) fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }
}

/// Map a sqlx error raised while running `operation`.
///
/// `fetch_optional` / `rows_affected` carry absence, so `RowNotFound` only
/// shows up on scans that expected a row and is treated as a fault.
pub(crate) fn map_sqlx_error(operation: &'static str, source: sqlx::Error) -> StoreError {
    StoreError::Execution { operation, source }
}

/// Persistence interface for the `products` table.
///
/// Implementations must:
/// - let the store assign identifiers (never reuse the caller's)
/// - report a missing row as [`StoreError::NotFound`] from `get` and `delete`
/// - run `insert_batch` as a single transaction: every record commits, or the
///   first failing record rolls the whole batch back and later records are
///   not attempted
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert one product and return the identifier the store assigned.
    async fn insert(&self, product: &NewProduct) -> Result<ProductId, StoreError>;

    /// Insert `products` inside one transaction. Returns the number of rows
    /// committed. An empty slice opens no transaction.
    async fn insert_batch(&self, products: &[NewProduct]) -> Result<u64, StoreError>;

    /// Every row, in the store's default order.
    async fn list(&self) -> Result<Vec<Product>, StoreError>;

    async fn get(&self, id: ProductId) -> Result<Product, StoreError>;

    async fn delete(&self, id: ProductId) -> Result<(), StoreError>;

    /// Remove every row and report how many were deleted.
    async fn clear(&self) -> Result<u64, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Release the store's connections. Later calls fail.
    async fn close(&self);
}

/// Open the backend selected by `config.driver`.
pub async fn connect(config: &DbConfig) -> Result<Box<dyn ProductStore>, StoreError> {
    let store: Box<dyn ProductStore> = match config.driver {
        Driver::MySql => Box::new(MySqlProductStore::connect(config).await?),
        Driver::Sqlite => Box::new(SqliteProductStore::open(&config.database).await?),
    };
    tracing::info!(dsn = %config.redacted_dsn(), "connected to products store");
    Ok(store)
}
