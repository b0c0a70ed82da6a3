//! HTTP handlers, one module per resource

pub mod admin_orders;
pub mod catalog;
pub mod customers;
pub mod health;
pub mod orders;
pub mod payment_webhooks;

use serde::Deserialize;
use utoipa::IntoParams;

/// `limit`/`offset` query used by the list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Maximum number of items to return
    pub limit: Option<u64>,
    /// Number of items to skip
    pub offset: Option<u64>,
}

/// Upper bound on any page size requested by a client
pub const MAX_PAGE_SIZE: u64 = 100;

impl PageQuery {
    pub fn limit_or(&self, default: u64) -> u64 {
        self.limit.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }
}
