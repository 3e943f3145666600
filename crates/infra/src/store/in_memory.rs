//! In-memory product store.

use std::collections::{BTreeMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use prodload_core::ProductId;
use prodload_products::{NewProduct, Product};

use super::{ProductStore, StoreError};

#[derive(Debug)]
struct Table {
    rows: BTreeMap<ProductId, Product>,
    next_id: i64,
    commits: u64,
    closed: bool,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
            commits: 0,
            closed: false,
        }
    }
}

impl Table {
    fn assign_id(&mut self) -> ProductId {
        let id = ProductId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

/// In-memory product store.
///
/// Intended for tests/dev. Every successful write counts as one committed
/// transaction, and names registered with [`reject_name`](Self::reject_name)
/// fail on insert so batch rollback can be exercised without a database.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    table: RwLock<Table>,
    rejected: RwLock<HashSet<String>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert of a product called `name` fail.
    pub fn reject_name(&self, name: impl Into<String>) -> Result<(), StoreError> {
        self.rejected
            .write()
            .map_err(|_| StoreError::backend("reject_name", "lock poisoned"))?
            .insert(name.into());
        Ok(())
    }

    /// Number of committed write transactions so far.
    pub fn commits(&self) -> u64 {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .commits
    }

    fn check_rejected(&self, operation: &'static str, product: &NewProduct) -> Result<(), StoreError> {
        let rejected = self
            .rejected
            .read()
            .map_err(|_| StoreError::backend(operation, "lock poisoned"))?;
        if rejected.contains(&product.name) {
            return Err(StoreError::backend(
                operation,
                format!("insert of '{}' rejected", product.name),
            ));
        }
        Ok(())
    }

    fn write(&self, operation: &'static str) -> Result<RwLockWriteGuard<'_, Table>, StoreError> {
        let table = self
            .table
            .write()
            .map_err(|_| StoreError::backend(operation, "lock poisoned"))?;
        if table.closed {
            return Err(StoreError::backend(operation, "store closed"));
        }
        Ok(table)
    }

    fn read(&self, operation: &'static str) -> Result<RwLockReadGuard<'_, Table>, StoreError> {
        let table = self
            .table
            .read()
            .map_err(|_| StoreError::backend(operation, "lock poisoned"))?;
        if table.closed {
            return Err(StoreError::backend(operation, "store closed"));
        }
        Ok(table)
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn insert(&self, product: &NewProduct) -> Result<ProductId, StoreError> {
        self.check_rejected("insert", product)?;

        let mut table = self.write("insert")?;
        let id = table.assign_id();
        table.rows.insert(id, product.clone().with_id(id));
        table.commits += 1;
        Ok(id)
    }

    async fn insert_batch(&self, products: &[NewProduct]) -> Result<u64, StoreError> {
        if products.is_empty() {
            return Ok(0);
        }

        // Stage the whole batch first; nothing is applied unless every
        // record passes.
        for product in products {
            self.check_rejected("insert_batch", product)?;
        }

        let mut table = self.write("insert_batch")?;
        for product in products {
            let id = table.assign_id();
            table.rows.insert(id, product.clone().with_id(id));
        }
        table.commits += 1;
        Ok(products.len() as u64)
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let table = self.read("list")?;
        Ok(table.rows.values().cloned().collect())
    }

    async fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        let table = self.read("get")?;
        table.rows.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        let mut table = self.write("delete")?;
        table.rows.remove(&id).ok_or(StoreError::NotFound(id))?;
        table.commits += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        let mut table = self.write("clear")?;
        let removed = table.rows.len() as u64;
        table.rows.clear();
        table.commits += 1;
        Ok(removed)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.read("count")?.rows.len() as u64)
    }

    async fn close(&self) {
        // A poisoned table is still closed.
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn assigns_increasing_ids() {
        let store = InMemoryProductStore::new();
        let a = store.insert(&NewProduct::new("a", 1.0)).await.unwrap();
        let b = store.insert(&NewProduct::new("b", 2.0)).await.unwrap();
        assert_eq!(a, ProductId::new(1));
        assert_eq!(b, ProductId::new(2));
    }

    #[tokio::test]
    async fn rejected_name_aborts_whole_batch() {
        let store = InMemoryProductStore::new();
        store.reject_name("bad").unwrap();
        let batch = vec![
            NewProduct::new("good", 1.0),
            NewProduct::new("bad", 2.0),
            NewProduct::new("never", 3.0),
        ];

        let err = store.insert_batch(&batch).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend { operation: "insert_batch", .. }));
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.commits(), 0);
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let store = InMemoryProductStore::new();
        assert!(store.get(ProductId::new(1)).await.unwrap_err().is_not_found());
        assert!(store.delete(ProductId::new(1)).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn closed_store_refuses_operations() {
        let store = InMemoryProductStore::new();
        store.close().await;
        assert!(store.list().await.is_err());
    }

    fn poison_table(store: &InMemoryProductStore) {
        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = store.table.write().unwrap();
                    panic!("poison the table lock");
                })
                .join();
        });
    }

    fn poison_rejected(store: &InMemoryProductStore) {
        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = store.rejected.write().unwrap();
                    panic!("poison the rejected-names lock");
                })
                .join();
        });
    }

    #[test]
    fn reject_name_reports_poisoned_lock() {
        let store = InMemoryProductStore::new();
        poison_rejected(&store);

        let err = store.reject_name("bad").unwrap_err();
        assert!(matches!(
            err,
            StoreError::Backend { operation: "reject_name", ref message } if message == "lock poisoned"
        ));
    }

    #[tokio::test]
    async fn close_takes_effect_on_poisoned_table() {
        let store = InMemoryProductStore::new();
        store.insert(&NewProduct::new("a", 1.0)).await.unwrap();
        poison_table(&store);

        store.close().await;

        assert!(store.table.read().unwrap_or_else(PoisonError::into_inner).closed);
        assert_eq!(store.commits(), 1);
    }

    #[tokio::test]
    async fn poisoned_table_fails_operations() {
        let store = InMemoryProductStore::new();
        poison_table(&store);

        let err = store.count().await.unwrap_err();
        assert!(matches!(err, StoreError::Backend { operation: "count", .. }));
    }
}
