//! Tests against a live MySQL server.
//!
//! Ignored by default. Point the `DB_*` variables (or a `.env` file) at a
//! scratch database containing the table from `schema/mysql.sql`, then run
//! `cargo test -p prodload-infra -- --ignored`. Every test clears the table.

use prodload_core::ProductId;
use prodload_infra::config::load_dotenv;
use prodload_infra::{
    BatchLoader, BatchSize, DbConfig, MySqlProductStore, ProductStore, StoreError,
};
use prodload_products::{synthetic_products, NewProduct};
use rand::rngs::StdRng;
use rand::SeedableRng;

async fn store() -> MySqlProductStore {
    let _ = load_dotenv(None);
    let config = DbConfig::from_env().expect("DB_* variables must describe a MySQL server");
    let store = MySqlProductStore::connect(&config).await.unwrap();
    store.clear().await.unwrap();
    store
}

#[tokio::test]
#[ignore = "needs a MySQL server"]
async fn insert_get_delete_roundtrip() {
    let store = store().await;

    let id = store.insert(&NewProduct::new("Test Name", 1000.0)).await.unwrap();
    let product = store.get(id).await.unwrap();
    assert_eq!(product.name, "Test Name");
    assert_eq!(product.price, 1000.0);

    store.delete(id).await.unwrap();
    assert!(store.get(id).await.unwrap_err().is_not_found());
    assert!(store.delete(id).await.unwrap_err().is_not_found());
    store.close().await;
}

#[tokio::test]
#[ignore = "needs a MySQL server"]
async fn missing_id_is_not_found() {
    let store = store().await;
    let err = store.get(ProductId::new(i64::MAX)).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    store.close().await;
}

#[tokio::test]
#[ignore = "needs a MySQL server"]
async fn loader_commits_every_batch() {
    let store = store().await;
    let products = synthetic_products(1_050, &mut StdRng::seed_from_u64(3));

    let report = BatchLoader::new(&store, BatchSize::new(100).unwrap())
        .load(&products)
        .await
        .unwrap();

    assert_eq!(report.batches, 11);
    assert_eq!(store.count().await.unwrap(), 1_050);
    assert_eq!(store.clear().await.unwrap(), 1_050);
    store.close().await;
}

#[tokio::test]
#[ignore = "needs a MySQL server"]
async fn oversized_name_rolls_back_its_batch() {
    let store = store().await;
    let mut products = synthetic_products(30, &mut StdRng::seed_from_u64(5));
    // `name` is VARCHAR(255); strict mode rejects longer values.
    products[25].name = "x".repeat(300);

    let err = BatchLoader::new(&store, BatchSize::new(10).unwrap())
        .load(&products)
        .await
        .unwrap_err();

    assert_eq!(err.failed_batch, 3);
    assert_eq!(err.committed_rows, 20);
    assert_eq!(store.count().await.unwrap(), 20);
    store.close().await;
}
