//! ShopLive client SDK.
//!
//! Headless client for the ShopLive e-commerce backend. The SDK owns the
//! two stateful cores - session management with silent token refresh
//! ([`session::SessionManager`]) and live order synchronization
//! ([`sync::OrderSync`]) - plus typed clients for every REST surface the
//! storefront and admin panel consume. Rendering, routing, and styling are
//! deliberately out of scope: UI layers subscribe to
//! [`session::SessionEvent`]s and render the snapshots this crate hands
//! them.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shoplive_client::{ClientConfig, SessionManager, OrderSync, MemoryStore};
//!
//! let config = ClientConfig::from_env()?;
//! let session = SessionManager::new(config, Arc::new(MemoryStore::new()));
//! session.login("ada", "hunter2").await?;
//!
//! let sync = OrderSync::new(session.clone());
//! sync.load_orders().await?;
//! sync.connect().await; // push updates merge into sync.orders()
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod body;
pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod sync;
pub mod wishlist;

pub use api::{AdminClient, OrdersClient, ProductsClient, ReviewsClient};
pub use body::{FormData, RequestBody};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, Result};
pub use session::{SessionEvent, SessionManager};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use sync::{OrderSync, StatusProgress};
pub use wishlist::Wishlist;
