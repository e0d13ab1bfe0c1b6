//! Customer and admin-dashboard types.

use serde::{Deserialize, Serialize};

/// A customer row from the admin listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
}

/// Aggregate counts shown on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AdminStats {
    pub customers: u64,
    pub orders: u64,
    pub products: u64,
}
