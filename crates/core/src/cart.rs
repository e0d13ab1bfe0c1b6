//! Client-side shopping cart.
//!
//! Pure quantity bookkeeping keyed by product id. The cart never talks to
//! the network; checkout converts its contents into [`OrderItem`] lines for
//! the orders endpoint client.

use std::collections::BTreeMap;

use crate::types::{Order, OrderItem, Product};

/// An in-memory cart: product id → quantity.
///
/// Quantities floor at zero; a zero-quantity entry is dropped rather than
/// kept around, so `total_items` and `checkout_lines` agree with what a UI
/// badge would show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    quantities: BTreeMap<String, u32>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit of a product.
    pub fn add(&mut self, product_id: &str) {
        *self.quantities.entry(product_id.to_string()).or_insert(0) += 1;
    }

    /// Remove one unit of a product, flooring at zero.
    pub fn remove(&mut self, product_id: &str) {
        if let Some(quantity) = self.quantities.get_mut(product_id) {
            *quantity = quantity.saturating_sub(1);
            if *quantity == 0 {
                self.quantities.remove(product_id);
            }
        }
    }

    /// Quantity currently in the cart for a product.
    #[must_use]
    pub fn quantity(&self, product_id: &str) -> u32 {
        self.quantities.get(product_id).copied().unwrap_or(0)
    }

    /// Total number of units across all products.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.quantities.values().sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// Empty the cart (after a successful checkout).
    pub fn clear(&mut self) {
        self.quantities.clear();
    }

    /// Convert the cart into checkout lines against the given catalog.
    ///
    /// Products that are no longer in the catalog are silently skipped, the
    /// same way the storefront drops stale cart entries.
    #[must_use]
    pub fn checkout_lines(&self, products: &[Product]) -> Vec<OrderItem> {
        self.quantities
            .iter()
            .filter(|&(_, &quantity)| quantity > 0)
            .filter_map(|(product_id, &quantity)| {
                let product = products.iter().find(|p| &p.id == product_id)?;
                Some(OrderItem {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    price: product.price,
                    count: quantity,
                })
            })
            .collect()
    }

    /// Seed a cart from an existing order (the "buy again" path).
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        let mut cart = Self::new();
        cart.quantities.insert(order.product_id.clone(), order.count);
        cart
    }
}
