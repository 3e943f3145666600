//! Infrastructure layer: configuration, product stores, batch loading.

pub mod config;
pub mod loader;
pub mod store;

pub use config::{AppConfig, ConfigError, DbConfig, Driver, LoadSettings};
pub use loader::{BatchLoader, BatchSize, LoadError, LoadReport};
pub use store::{
    connect, InMemoryProductStore, MySqlProductStore, ProductStore, SqliteProductStore,
    StoreError,
};
