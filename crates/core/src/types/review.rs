//! Product review types.

use serde::{Deserialize, Serialize};

/// A review as returned by `GET /reviews/{productId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub username: String,
    pub text: String,
    pub stars: u8,
}

/// A review being submitted; the backend attributes the username from the
/// bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub text: String,
    pub stars: u8,
}

impl NewReview {
    /// Build a review, clamping stars into the 1..=5 range the UI offers.
    #[must_use]
    pub fn new(text: impl Into<String>, stars: u8) -> Self {
        Self {
            text: text.into(),
            stars: stars.clamp(1, 5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_review_clamps_stars() {
        assert_eq!(NewReview::new("great", 9).stars, 5);
        assert_eq!(NewReview::new("awful", 0).stars, 1);
        assert_eq!(NewReview::new("fine", 3).stars, 3);
    }
}
