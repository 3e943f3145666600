//! Table access shared by the SQL backends.
//!
//! [`ProductsTable`] holds every query against `products` once, generic over
//! the sqlx driver. A backend contributes its pool and the two result
//! accessors sqlx does not put behind a trait ([`SqlBackend`]).

use sqlx::{
    Database, Encode, Executor, FromRow, IntoArguments, Pool, Statement, Transaction, Type,
};
use tracing::{debug, instrument, warn};

use prodload_core::ProductId;
use prodload_products::{NewProduct, Product};

use super::{StoreError, map_sqlx_error};

// Both drivers accept `?` placeholders.
const INSERT: &str = "INSERT INTO products (name, price) VALUES (?, ?)";
const SELECT_ALL: &str = "SELECT id, name, price FROM products";
const SELECT_BY_ID: &str = "SELECT id, name, price FROM products WHERE id = ?";
const DELETE_BY_ID: &str = "DELETE FROM products WHERE id = ?";
const DELETE_ALL: &str = "DELETE FROM products";
const COUNT: &str = "SELECT COUNT(*) FROM products";

/// Driver-specific accessors on a statement's result.
pub(crate) trait SqlBackend: Database {
    fn rows_affected(result: &Self::QueryResult) -> u64;

    /// Identifier assigned by the last `INSERT`.
    fn last_insert_id(result: &Self::QueryResult) -> Result<ProductId, StoreError>;
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: i64,
    name: String,
    price: f64,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product::new(ProductId::new(row.id), row.name, row.price)
    }
}

/// The `products` table behind a pool capped at one connection.
pub(crate) struct ProductsTable<DB: Database> {
    pool: Pool<DB>,
}

impl<DB: Database> core::fmt::Debug for ProductsTable<DB> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProductsTable")
            .field("driver", &DB::NAME)
            .field("pool", &self.pool)
            .finish()
    }
}

impl<DB: Database> ProductsTable<DB> {
    pub(crate) fn new(pool: Pool<DB>) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &Pool<DB> {
        &self.pool
    }

    pub(crate) async fn close(&self) {
        self.pool.close().await;
    }
}

impl<DB> ProductsTable<DB>
where
    DB: SqlBackend,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
    for<'q> &'q str: Encode<'q, DB> + Type<DB>,
    for<'q> f64: Encode<'q, DB> + Type<DB>,
    for<'q> i64: Encode<'q, DB> + Type<DB>,
    for<'r> ProductRow: FromRow<'r, DB::Row>,
    for<'r> (i64,): FromRow<'r, DB::Row>,
{
    #[instrument(skip(self, product), fields(driver = DB::NAME, name = %product.name))]
    pub(crate) async fn insert(&self, product: &NewProduct) -> Result<ProductId, StoreError> {
        let result = sqlx::query::<DB>(INSERT)
            .bind(product.name.as_str())
            .bind(product.price)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;

        DB::last_insert_id(&result)
    }

    /// One transaction with a single prepared `INSERT`. The first failing
    /// record rolls the transaction back; later records are not attempted.
    #[instrument(skip(self, products), fields(driver = DB::NAME, batch_len = products.len()))]
    pub(crate) async fn insert_batch(&self, products: &[NewProduct]) -> Result<u64, StoreError> {
        if products.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let prepared = (&mut *tx).prepare(INSERT).await;
        let statement = match prepared {
            Ok(statement) => statement,
            Err(source) => {
                rollback(tx).await;
                return Err(StoreError::Prepare {
                    operation: "insert_batch",
                    source,
                });
            }
        };

        for (index, product) in products.iter().enumerate() {
            let executed = statement
                .query()
                .bind(product.name.as_str())
                .bind(product.price)
                .execute(&mut *tx)
                .await;

            if let Err(e) = executed {
                debug!(index, "insert failed inside batch");
                rollback(tx).await;
                return Err(map_sqlx_error("insert_batch", e));
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(products.len() as u64)
    }

    #[instrument(skip(self), fields(driver = DB::NAME))]
    pub(crate) async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<DB, ProductRow>(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    #[instrument(skip(self), fields(driver = DB::NAME))]
    pub(crate) async fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        let row = sqlx::query_as::<DB, ProductRow>(SELECT_BY_ID)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.map(Product::from).ok_or(StoreError::NotFound(id))
    }

    #[instrument(skip(self), fields(driver = DB::NAME))]
    pub(crate) async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query::<DB>(DELETE_BY_ID)
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        if DB::rows_affected(&result) == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(driver = DB::NAME))]
    pub(crate) async fn clear(&self) -> Result<u64, StoreError> {
        let result = sqlx::query::<DB>(DELETE_ALL)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("clear", e))?;

        Ok(DB::rows_affected(&result))
    }

    pub(crate) async fn count(&self) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<DB, i64>(COUNT)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count", e))?;

        Ok(count.max(0) as u64)
    }
}

async fn rollback<DB: Database>(tx: Transaction<'_, DB>) {
    if let Err(err) = tx.rollback().await {
        // Dropping the connection discards the transaction server-side.
        warn!(error = %err, "rollback failed");
    }
}
