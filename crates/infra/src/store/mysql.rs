//! MySQL-backed product store.
//!
//! Expects the table from `schema/mysql.sql` (`BIGINT` id, `DOUBLE` price);
//! sqlx decodes strictly, so narrower column types fail at read time.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::MySql;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlQueryResult};

use prodload_core::ProductId;
use prodload_products::{NewProduct, Product};

use super::sql::{ProductsTable, SqlBackend};
use super::{ProductStore, StoreError};
use crate::config::DbConfig;

/// A refused connection is retried until this elapses.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

impl SqlBackend for MySql {
    fn rows_affected(result: &MySqlQueryResult) -> u64 {
        result.rows_affected()
    }

    fn last_insert_id(result: &MySqlQueryResult) -> Result<ProductId, StoreError> {
        let raw = result.last_insert_id();
        i64::try_from(raw)
            .map(ProductId::new)
            .map_err(|_| StoreError::backend("insert", format!("id {raw} out of range")))
    }
}

/// MySQL-backed product store.
///
/// Holds a pool limited to a single connection: the program has one thread of
/// control, and batches must run on the connection that opened them.
#[derive(Debug)]
pub struct MySqlProductStore {
    table: ProductsTable<MySql>,
}

impl MySqlProductStore {
    /// Connect using the network fields of `config`. Establishing the pool
    /// opens (and thereby verifies) the first connection.
    pub async fn connect(config: &DbConfig) -> Result<Self, StoreError> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|source| StoreError::Connect {
                target: config.redacted_dsn(),
                source,
            })?;

        Ok(Self {
            table: ProductsTable::new(pool),
        })
    }
}

#[async_trait]
impl ProductStore for MySqlProductStore {
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
