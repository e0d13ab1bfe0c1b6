//! Wishlist persistence.
//!
//! The wishlist lives in the same key-value store as the session but is
//! deliberately independent of it: logging out clears credentials, never
//! the wishlist.

use std::sync::Arc;

use tracing::debug;

use crate::error::{ClientError, Result};
use crate::store::{KeyValueStore, WISHLIST_KEY};

/// Product ids the customer has hearted, persisted as a JSON array.
#[derive(Clone)]
pub struct Wishlist {
    store: Arc<dyn KeyValueStore>,
}

impl Wishlist {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// All wishlisted product ids, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Store` on storage failure and
    /// `ClientError::Parse` if the stored value is not a JSON array.
    pub fn items(&self) -> Result<Vec<String>> {
        match self.store.get(WISHLIST_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(ClientError::Parse),
            None => Ok(Vec::new()),
        }
    }

    /// Whether a product is wishlisted.
    ///
    /// # Errors
    ///
    /// See [`Wishlist::items`].
    pub fn contains(&self, product_id: &str) -> Result<bool> {
        Ok(self.items()?.iter().any(|id| id == product_id))
    }

    /// Toggle a product in or out of the wishlist.
    ///
    /// Returns `true` if the product is wishlisted after the toggle.
    ///
    /// # Errors
    ///
    /// See [`Wishlist::items`].
    pub fn toggle(&self, product_id: &str) -> Result<bool> {
        let mut items = self.items()?;
        let added = if let Some(position) = items.iter().position(|id| id == product_id) {
            items.remove(position);
            false
        } else {
            items.push(product_id.to_string());
            true
        };

        self.persist(&items)?;
        debug!(product_id, added, "wishlist toggled");
        Ok(added)
    }

    /// Empty the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Store` on storage failure.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(WISHLIST_KEY)?;
        Ok(())
    }

    fn persist(&self, items: &[String]) -> Result<()> {
        let json = serde_json::to_string(items)?;
        self.store.set(WISHLIST_KEY, &json)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn wishlist() -> Wishlist {
        Wishlist::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_empty_wishlist() {
        let wishlist = wishlist();
        assert!(wishlist.items().unwrap().is_empty());
        assert!(!wishlist.contains("p1").unwrap());
    }

    #[test]
    fn test_toggle_in_and_out() {
        let wishlist = wishlist();

        assert!(wishlist.toggle("p1").unwrap());
        assert!(wishlist.contains("p1").unwrap());

        assert!(!wishlist.toggle("p1").unwrap());
        assert!(!wishlist.contains("p1").unwrap());
    }

    #[test]
    fn test_insertion_order_preserved() {
        let wishlist = wishlist();
        wishlist.toggle("p2").unwrap();
        wishlist.toggle("p1").unwrap();
        wishlist.toggle("p3").unwrap();

        assert_eq!(wishlist.items().unwrap(), vec!["p2", "p1", "p3"]);
    }

    #[test]
    fn test_corrupt_payload_is_a_parse_error() {
        let store = Arc::new(MemoryStore::new());
        store.set(WISHLIST_KEY, "not an array").unwrap();
        let wishlist = Wishlist::new(store);

        assert!(matches!(wishlist.items(), Err(ClientError::Parse(_))));
    }
}
