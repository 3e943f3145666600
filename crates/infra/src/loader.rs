//! Batched bulk loading.
//!
//! A load splits its records into fixed-size batches and hands each one to
//! [`ProductStore::insert_batch`], which runs it as a single transaction.
//! Batches commit one after another; the first failing batch is rolled back
//! and the load stops there. Batches committed before it stay committed.

use std::num::NonZeroUsize;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use prodload_core::{DomainError, DomainResult};
use prodload_products::NewProduct;

use crate::config::DEFAULT_BATCH_SIZE;
use crate::store::{ProductStore, StoreError};

/// Maximum number of records per transaction. Never zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BatchSize(NonZeroUsize);

impl BatchSize {
    pub fn new(size: usize) -> DomainResult<Self> {
        NonZeroUsize::new(size)
            .map(Self)
            .ok_or_else(|| DomainError::validation("batch size must be positive"))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }

    /// Number of transactions needed for `rows` records: `ceil(rows / size)`.
    pub fn batches_for(self, rows: usize) -> usize {
        rows.div_ceil(self.get())
    }
}

const DEFAULT_SIZE: NonZeroUsize = match NonZeroUsize::new(DEFAULT_BATCH_SIZE) {
    Some(size) => size,
    None => panic!("DEFAULT_BATCH_SIZE must be non-zero"),
};

impl Default for BatchSize {
    fn default() -> Self {
        Self(DEFAULT_SIZE)
    }
}

/// Outcome of a load where every batch committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Committed transactions.
    pub batches: usize,
    /// Committed rows.
    pub rows: u64,
}

/// A batch failed and was rolled back.
///
/// `committed_batches` / `committed_rows` describe the prefix that is durably
/// stored; nothing after the failed batch was attempted.
#[derive(Debug, Error)]
#[error(
    "batch {failed_batch} rolled back after {committed_batches} committed batches ({committed_rows} rows)"
)]
pub struct LoadError {
    /// 1-based number of the batch that failed.
    pub failed_batch: usize,
    pub committed_batches: usize,
    pub committed_rows: u64,
    #[source]
    pub source: StoreError,
}

impl LoadError {
    pub fn committed(&self) -> LoadReport {
        LoadReport {
            batches: self.committed_batches,
            rows: self.committed_rows,
        }
    }
}

/// Writes records through a [`ProductStore`] in transactions of at most
/// `batch_size` records.
#[derive(Debug)]
pub struct BatchLoader<'a, S: ?Sized> {
    store: &'a S,
    batch_size: BatchSize,
}

impl<'a, S> BatchLoader<'a, S>
where
    S: ProductStore + ?Sized,
{
    pub fn new(store: &'a S, batch_size: BatchSize) -> Self {
        Self { store, batch_size }
    }

    /// Load a fully materialized collection.
    pub async fn load(&self, products: &[NewProduct]) -> Result<LoadReport, LoadError> {
        let started = Instant::now();
        let expected_batches = self.batch_size.batches_for(products.len());
        info!(
            rows = products.len(),
            batch_size = self.batch_size.get(),
            expected_batches,
            "bulk load started"
        );

        let mut report = LoadReport::default();
        for batch in products.chunks(self.batch_size.get()) {
            self.commit_batch(batch, &mut report).await?;
        }

        info!(
            batches = report.batches,
            rows = report.rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "bulk load finished"
        );
        Ok(report)
    }

    /// Load records pulled from `products`, holding at most one batch in
    /// memory at a time.
    pub async fn load_iter<I>(&self, products: I) -> Result<LoadReport, LoadError>
    where
        I: IntoIterator<Item = NewProduct>,
    {
        let started = Instant::now();
        let size = self.batch_size.get();
        info!(batch_size = size, "streaming bulk load started");

        let mut products = products.into_iter();
        let mut buffer = Vec::with_capacity(size);
        let mut report = LoadReport::default();
        loop {
            buffer.clear();
            buffer.extend(products.by_ref().take(size));
            if buffer.is_empty() {
                break;
            }
            self.commit_batch(&buffer, &mut report).await?;
        }

        info!(
            batches = report.batches,
            rows = report.rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "streaming bulk load finished"
        );
        Ok(report)
    }

    async fn commit_batch(
        &self,
        batch: &[NewProduct],
        report: &mut LoadReport,
    ) -> Result<(), LoadError> {
        let batch_number = report.batches + 1;
        match self.store.insert_batch(batch).await {
            Ok(rows) => {
                report.batches = batch_number;
                report.rows += rows;
                debug!(batch = batch_number, rows, "batch committed");
                Ok(())
            }
            Err(source) => {
                warn!(
                    batch = batch_number,
                    committed_batches = report.batches,
                    committed_rows = report.rows,
                    error = %source,
                    "batch rolled back; stopping load"
                );
                Err(LoadError {
                    failed_batch: batch_number,
                    committed_batches: report.batches,
                    committed_rows: report.rows,
                    source,
                })
            }
        }
    }
}
