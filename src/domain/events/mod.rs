//! Domain events
use serde::Serialize;
use crate::domain::value_objects::{CustomerId, DraftOrderId, ProductId};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    ProductSelected { product_id: ProductId },
    CartCleared { product_id: Option<ProductId> },
    RecentOrderLoaded { order_id: DraftOrderId, units: u64 },
    DraftOrderCreated { order_id: DraftOrderId, name: String, customer_id: Option<CustomerId>, total_items: u64 },
}

impl DomainEvent {
    /// Subject suffix used when publishing, e.g. `matrix.draft_order_created`.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::ProductSelected { .. } => "product_selected",
            Self::CartCleared { .. } => "cart_cleared",
            Self::RecentOrderLoaded { .. } => "recent_order_loaded",
            Self::DraftOrderCreated { .. } => "draft_order_created",
        }
    }
}
