//! Admin panel client.
//!
//! Everything under `/admin` is role-gated server-side; this client just
//! shapes the requests. Product upload is the one multipart surface in the
//! SDK - the session manager must not force a JSON content type onto it.

use reqwest::Method;
use reqwest::header::HeaderMap;
use tracing::info;

use shoplive_core::{AdminStats, Customer, NewProduct, Order, OrderStatus, Product};

use crate::body::{FormData, RequestBody};
use crate::error::Result;
use crate::session::{SessionManager, check_status};

/// Client for the admin endpoints.
#[derive(Clone)]
pub struct AdminClient {
    session: SessionManager,
}

impl AdminClient {
    #[must_use]
    pub const fn new(session: SessionManager) -> Self {
        Self { session }
    }

    /// Dashboard aggregate counts (`GET /admin/stats`).
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport, auth, or decode failure.
    pub async fn stats(&self) -> Result<AdminStats> {
        self.session.get_json("/admin/stats").await
    }

    /// All customers (`GET /admin/customers`).
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport, auth, or decode failure.
    pub async fn customers(&self) -> Result<Vec<Customer>> {
        self.session.get_json("/admin/customers").await
    }

    /// One customer's orders (`GET /admin/customers/{id}/orders`).
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport, auth, or decode failure.
    pub async fn customer_orders(&self, customer_id: &str) -> Result<Vec<Order>> {
        self.session
            .get_json(&format!("/admin/customers/{customer_id}/orders"))
            .await
    }

    /// Delete a customer and all their orders
    /// (`DELETE /admin/customers/{id}`).
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport, auth, or API failure.
    pub async fn delete_customer(&self, customer_id: &str) -> Result<()> {
        self.expect_ok(Method::DELETE, &format!("/admin/customers/{customer_id}"))
            .await
    }

    /// Move an order to a new status
    /// (`PUT /admin/orders/{id}/status?status=...`).
    ///
    /// The backend fans the change out to the order events topic, so the
    /// customer's live sync picks it up without polling.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport, auth, or API failure.
    pub async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> Result<()> {
        self.expect_ok(
            Method::PUT,
            &format!("/admin/orders/{order_id}/status?status={status}"),
        )
        .await?;
        info!(order_id, status = %status, "order status updated");
        Ok(())
    }

    /// Delete an order (`DELETE /admin/orders/{id}`).
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport, auth, or API failure.
    pub async fn delete_order(&self, order_id: &str) -> Result<()> {
        self.expect_ok(Method::DELETE, &format!("/admin/orders/{order_id}"))
            .await
    }

    /// The full catalog, admin view (`GET /admin/products`).
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport, auth, or decode failure.
    pub async fn products(&self) -> Result<Vec<Product>> {
        self.session.get_json("/admin/products").await
    }

    /// Upload a product with its image
    /// (`POST /admin/products/upload`, multipart).
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport, auth, or API failure.
    pub async fn upload_product(&self, product: &NewProduct) -> Result<()> {
        let form = FormData::new()
            .text("name", product.name.clone())
            .text("description", product.description.clone())
            .text("price", product.price.to_string())
            .file(
                "image",
                product.image.bytes.clone(),
                product.image.file_name.clone(),
                product.image.content_type.clone(),
            );

        let response = self
            .session
            .request(
                Method::POST,
                "/admin/products/upload",
                RequestBody::Form(form),
                HeaderMap::new(),
            )
            .await?;
        check_status(response).await?;
        info!(name = %product.name, "product uploaded");
        Ok(())
    }

    /// Delete a product (`DELETE /admin/products/{id}`).
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport, auth, or API failure.
    pub async fn delete_product(&self, product_id: &str) -> Result<()> {
        self.expect_ok(Method::DELETE, &format!("/admin/products/{product_id}"))
            .await
    }

    async fn expect_ok(&self, method: Method, path: &str) -> Result<()> {
        let response = self
            .session
            .request(method, path, RequestBody::Empty, HeaderMap::new())
            .await?;
        check_status(response).await.map(drop)
    }
}
