//! Product catalog client with response caching.
//!
//! The catalog and its images change rarely and are fetched on every page
//! visit, so both are cached in-process for five minutes.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use shoplive_core::Product;

use crate::error::Result;
use crate::session::SessionManager;

const CACHE_CAPACITY: u64 = 1000;
const CACHE_TTL: Duration = Duration::from_secs(300); // 5 minutes

/// Cache key for catalog responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Products,
    Image(String),
}

/// Cached value types.
#[derive(Clone)]
enum CacheValue {
    Products(Arc<Vec<Product>>),
    Image(Arc<Vec<u8>>),
}

/// Client for the product catalog endpoints.
#[derive(Clone)]
pub struct ProductsClient {
    session: SessionManager,
    cache: Cache<CacheKey, CacheValue>,
}

impl ProductsClient {
    /// Create a new catalog client.
    #[must_use]
    pub fn new(session: SessionManager) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();
        Self { session, cache }
    }

    /// Fetch the product listing (`GET /products`), cached.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport, auth, or decode failure.
    pub async fn list(&self) -> Result<Arc<Vec<Product>>> {
        if let Some(CacheValue::Products(products)) = self.cache.get(&CacheKey::Products).await {
            debug!("product listing served from cache");
            return Ok(products);
        }

        let products: Arc<Vec<Product>> = Arc::new(self.session.get_json("/products").await?);
        self.cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// Fetch a product image (`GET /products/{id}/image`), cached.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport or auth failure.
    pub async fn image(&self, product_id: &str) -> Result<Arc<Vec<u8>>> {
        let key = CacheKey::Image(product_id.to_string());
        if let Some(CacheValue::Image(bytes)) = self.cache.get(&key).await {
            return Ok(bytes);
        }

        let bytes = Arc::new(
            self.session
                .get_bytes(&format!("/products/{product_id}/image"))
                .await?,
        );
        self.cache
            .insert(key, CacheValue::Image(Arc::clone(&bytes)))
            .await;
        Ok(bytes)
    }

    /// Drop all cached responses (after an admin catalog mutation).
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}
