//! Synthetic product generation for bulk loads.
//!
//! Record `i` (0-based) is named `Product {i}` and priced uniformly in
//! `[0, MAX_SYNTHETIC_PRICE)`.

use rand::Rng;

use crate::product::NewProduct;

/// Exclusive upper bound of generated prices.
pub const MAX_SYNTHETIC_PRICE: f64 = 100.0;

fn synthetic_product<R: Rng>(index: usize, rng: &mut R) -> NewProduct {
    NewProduct {
        name: format!("Product {index}"),
        price: rng.gen_range(0.0..MAX_SYNTHETIC_PRICE),
    }
}

/// Materialize `count` synthetic products up front.
pub fn synthetic_products<R: Rng>(count: usize, rng: &mut R) -> Vec<NewProduct> {
    let mut products = Vec::with_capacity(count);
    for index in 0..count {
        products.push(synthetic_product(index, rng));
    }
    products
}

/// Lazy generator yielding the same sequence as [`synthetic_products`] for the
/// same RNG state, one record at a time.
#[derive(Debug, Clone)]
pub struct SyntheticProducts<R> {
    next: usize,
    count: usize,
    rng: R,
}

impl<R: Rng> SyntheticProducts<R> {
    pub fn new(count: usize, rng: R) -> Self {
        Self { next: 0, count, rng }
    }
}

impl<R: Rng> Iterator for SyntheticProducts<R> {
    type Item = NewProduct;

    fn next(&mut self) -> Option<NewProduct> {
        if self.next >= self.count {
            return None;
        }
        let product = synthetic_product(self.next, &mut self.rng);
        self.next += 1;
        Some(product)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl<R: Rng> ExactSizeIterator for SyntheticProducts<R> {}
