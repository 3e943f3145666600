//! Products domain module.
//!
//! Plain product records plus the synthetic generator that feeds the bulk
//! loader. Deterministic given an RNG; no IO, no storage.

pub mod product;
pub mod synthetic;

pub use product::{NewProduct, Product};
pub use synthetic::{synthetic_products, SyntheticProducts, MAX_SYNTHETIC_PRICE};
