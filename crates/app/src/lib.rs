//! The run-once product loader.
//!
//! [`run`] drives the whole sequence against whatever store the config
//! selects and writes the human-readable progress to `out`. Errors come back
//! to the caller; deciding to exit is left to `main`.

use std::io::Write;

use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::StdRng;

use prodload_core::ProductId;
use prodload_infra::{AppConfig, BatchLoader, LoadReport, ProductStore, connect};
use prodload_products::{NewProduct, SyntheticProducts, synthetic_products};

/// Record fetched and then deleted at the end of the run.
pub const SAMPLE_ID: ProductId = ProductId::new(1);

/// Clear the table, bulk-load synthetic rows, then exercise every single-row
/// operation once.
pub async fn run<W: Write>(config: &AppConfig, out: &mut W) -> anyhow::Result<()> {
    let store = connect(&config.database)
        .await
        .context("failed to connect to products store")?;

    let result = run_steps(store.as_ref(), config, out).await;
    store.close().await;
    result
}

/// Print a failed run's error chain as a single `error: ...` line.
pub fn report_failure<W: Write>(err: &anyhow::Error, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "error: {err:#}")?;
    out.flush()
}

async fn run_steps<W: Write>(
    store: &dyn ProductStore,
    config: &AppConfig,
    out: &mut W,
) -> anyhow::Result<()> {
    let removed = store.clear().await.context("failed to clear products")?;
    tracing::info!(removed, "products cleared");
    writeln!(out, "Success clear products.")?;

    let report = bulk_load(store, config)
        .await
        .context("bulk load failed")?;
    writeln!(
        out,
        "Success insert {} products in {} batches",
        report.rows, report.batches
    )?;

    let id = store
        .insert(&NewProduct::new("Test Name", 1000.0))
        .await
        .context("failed to insert product")?;
    writeln!(out)?;
    writeln!(out, "Success insert with Id {id}")?;

    let products = store.list().await.context("failed to list products")?;
    writeln!(out)?;
    for product in &products {
        writeln!(out, "{product}")?;
    }

    let product = store
        .get(SAMPLE_ID)
        .await
        .with_context(|| format!("failed to get product {SAMPLE_ID}"))?;
    writeln!(out)?;
    writeln!(
        out,
        "Product found: ID: {}, Name: {}, Price: {:.2}",
        product.id, product.name, product.price
    )?;

    store
        .delete(SAMPLE_ID)
        .await
        .with_context(|| format!("failed to delete product {SAMPLE_ID}"))?;
    writeln!(out)?;
    writeln!(out, "Deleted product by Id: {SAMPLE_ID}")?;

    out.flush()?;
    Ok(())
}

async fn bulk_load(
    store: &dyn ProductStore,
    config: &AppConfig,
) -> Result<LoadReport, prodload_infra::LoadError> {
    let settings = &config.load;
    let loader = BatchLoader::new(store, settings.batch_size);
    let mut rng = StdRng::from_entropy();

    if settings.streaming {
        loader
            .load_iter(SyntheticProducts::new(settings.rows, rng))
            .await
    } else {
        let products = synthetic_products(settings.rows, &mut rng);
        loader.load(&products).await
    }
}
