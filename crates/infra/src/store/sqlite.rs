//! SQLite-backed product store.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::Sqlite;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteQueryResult};

use prodload_core::ProductId;
use prodload_products::{NewProduct, Product};

use super::sql::{ProductsTable, SqlBackend};
use super::{ProductStore, StoreError, map_sqlx_error};

/// `AUTOINCREMENT` keeps ids monotonic across deletes, like MySQL's
/// auto-increment counter.
const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS products (
        id    INTEGER PRIMARY KEY AUTOINCREMENT,
        name  TEXT    NOT NULL,
        price REAL    NOT NULL
    )
"#;

impl SqlBackend for Sqlite {
    fn rows_affected(result: &SqliteQueryResult) -> u64 {
        result.rows_affected()
    }

    fn last_insert_id(result: &SqliteQueryResult) -> Result<ProductId, StoreError> {
        Ok(ProductId::new(result.last_insert_rowid()))
    }
}

/// SQLite-backed product store.
///
/// The pool holds exactly one connection that never expires, so an in-memory
/// database lives as long as the store.
#[derive(Debug)]
pub struct SqliteProductStore {
    table: ProductsTable<Sqlite>,
}

impl SqliteProductStore {
    /// Open (creating if missing) the database at `path` and make sure the
    /// `products` table exists. `:memory:` opens a private in-memory database.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let connect_error = |source: sqlx::Error| StoreError::Connect {
            target: format!("sqlite:{path}"),
            source,
        };

        let options = if path == ":memory:" {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(connect_error)?
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .map_err(connect_error)?;

        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| map_sqlx_error("create_table", e))?;

        Ok(Self {
            table: ProductsTable::new(pool),
        })
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:").await
    }
}

#[async_trait]
impl ProductStore for SqliteProductStore {
    async fn insert(&self, product: &NewProduct) -> Result<ProductId, StoreError> {
        self.table.insert(product).await
    }

    async fn insert_batch(&self, products: &[NewProduct]) -> Result<u64, StoreError> {
        self.table.insert_batch(products).await
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        self.table.list().await
    }

    async fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        self.table.get(id).await
    }

    async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        self.table.delete(id).await
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        self.table.clear().await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.table.count().await
    }

    async fn close(&self) {
        self.table.close().await;
    }
}
