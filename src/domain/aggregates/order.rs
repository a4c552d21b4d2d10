//! Draft order shapes exchanged with the commerce backend

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{CustomerId, DiscountKind, DraftOrderId, ProductId, VariantId};

/// Display name used when a recent order has no customer attached.
pub const WALK_IN: &str = "Walk-in";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecentOrder {
    pub id: DraftOrderId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub invoice_url: Option<String>,
    pub customer: String,
    pub items: Vec<RecentOrderItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)] pub struct RecentOrderItem { pub product_id: Option<ProductId>, pub variant_id: Option<VariantId>, pub quantity: u32 }

impl RecentOrder {
    pub fn contains_product(&self, product_id: &ProductId) -> bool {
        self.items.iter().any(|i| i.product_id.as_ref() == Some(product_id))
    }

    /// `(variant, quantity)` for every line that still references a variant.
    pub fn variant_quantities(&self) -> impl Iterator<Item = (VariantId, u32)> + '_ {
        self.items.iter().filter_map(|i| i.variant_id.clone().map(|v| (v, i.quantity)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub display_name: String,
    pub email: Option<String>,
}

impl Customer {
    /// `"First Last"`, falling back to the email when both names are blank.
    pub fn display_name_for(first: Option<&str>, last: Option<&str>, email: Option<&str>) -> String {
        let name = format!("{} {}", first.unwrap_or(""), last.unwrap_or(""));
        match name.trim() {
            "" => email.unwrap_or("").to_string(),
            trimmed => trimmed.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrderInput {
    pub line_items: Vec<DraftLineItem>,
    pub note: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_discount: Option<AppliedDiscount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftLineItem { pub variant_id: VariantId, pub quantity: u32 }

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub value_type: DiscountKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOrderConfirmation {
    pub id: DraftOrderId,
    pub name: String,
    pub invoice_url: Option<String>,
}

impl DraftOrderConfirmation {
    /// Admin deep link for the created draft order.
    pub fn admin_path(&self) -> String { format!("shopify:admin/draft_orders/{}", self.id.numeric_tail()) }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)] pub struct UserError { pub field: Option<Vec<String>>, pub message: String }

/// Result of a draft order mutation that reached the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DraftOrderOutcome {
    Created(DraftOrderConfirmation),
    Rejected(Vec<UserError>),
}
