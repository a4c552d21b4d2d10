//! Commerce backend: catalog, customers and draft orders.
//!
//! The backend owns all persistent state. Calls are one-shot request /
//! response with no retries; a failure is reported once to the caller.

use async_trait::async_trait;
use thiserror::Error;
use crate::domain::aggregates::{Customer, DraftOrderInput, DraftOrderOutcome, Product, RecentOrder};
use crate::domain::value_objects::ProductId;

pub mod memory;
pub mod shopify;

pub use memory::InMemoryBackend;
pub use shopify::ShopifyAdminClient;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[async_trait]
pub trait CommerceBackend: Send + Sync {
    /// `None` when the product does not exist.
    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, BackendError>;

    /// Open draft orders created by this tool, most recently updated first.
    async fn recent_draft_orders(&self) -> Result<Vec<RecentOrder>, BackendError>;

    async fn search_customers(&self, query: &str) -> Result<Vec<Customer>, BackendError>;

    async fn create_draft_order(&self, input: &DraftOrderInput) -> Result<DraftOrderOutcome, BackendError>;
}
