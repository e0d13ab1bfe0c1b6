//! Checkout and order-history client.

use reqwest::Method;
use reqwest::header::HeaderMap;
use tracing::info;

use shoplive_core::{Order, OrderItem};

use crate::body::RequestBody;
use crate::error::{ClientError, Result};
use crate::session::{SessionManager, check_status};

/// Client for the order endpoints.
#[derive(Clone)]
pub struct OrdersClient {
    session: SessionManager,
}

impl OrdersClient {
    #[must_use]
    pub const fn new(session: SessionManager) -> Self {
        Self { session }
    }

    /// Place an order (`POST /orders`).
    ///
    /// The backend throttles checkout per customer; a 429 surfaces as
    /// [`ClientError::RateLimited`] carrying the server's message so the UI
    /// can show it verbatim.
    ///
    /// # Errors
    ///
    /// - `ClientError::RateLimited` when checkout is throttled
    /// - `ClientError::Api` for other rejections
    /// - `ClientError::Http` / `ClientError::SessionInvalid` per the session
    ///   manager's contract
    pub async fn place(&self, items: &[OrderItem]) -> Result<()> {
        if items.is_empty() {
            return Err(ClientError::Api {
                status: 400,
                message: "cart is empty".to_string(),
            });
        }

        let response = self
            .session
            .request(
                Method::POST,
                "/orders",
                RequestBody::json(&items)?,
                HeaderMap::new(),
            )
            .await?;
        check_status(response).await?;
        info!(lines = items.len(), "order placed");
        Ok(())
    }

    /// Fetch the authenticated customer's order history
    /// (`GET /customer/my/orders`).
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport, auth, or decode failure.
    pub async fn my_orders(&self) -> Result<Vec<Order>> {
        self.session.get_json("/customer/my/orders").await
    }
}
