//! Product review client.

use shoplive_core::{NewReview, Review};

use crate::error::Result;
use crate::session::SessionManager;

/// Client for the review endpoints.
#[derive(Clone)]
pub struct ReviewsClient {
    session: SessionManager,
}

impl ReviewsClient {
    #[must_use]
    pub const fn new(session: SessionManager) -> Self {
        Self { session }
    }

    /// Fetch the reviews for a product (`GET /reviews/{productId}`).
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport, auth, or decode failure.
    pub async fn list(&self, product_id: &str) -> Result<Vec<Review>> {
        self.session.get_json(&format!("/reviews/{product_id}")).await
    }

    /// Submit a review (`POST /reviews/{productId}`).
    ///
    /// The backend attributes the username from the bearer token and echoes
    /// the saved review back, ready for optimistic insertion into the list.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport, auth, or decode failure.
    pub async fn submit(&self, product_id: &str, review: &NewReview) -> Result<Review> {
        self.session
            .post_json(&format!("/reviews/{product_id}"), review)
            .await
    }
}
