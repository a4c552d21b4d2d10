//! Turns the cart and order form into a draft order request.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::aggregates::cart::QuantityStore;
use crate::domain::aggregates::order::{
    AppliedDiscount, Customer, DraftLineItem, DraftOrderConfirmation, DraftOrderInput, DraftOrderOutcome, RecentOrder,
};
use crate::domain::services::summary::OrderSummary;
use crate::domain::value_objects::{DiscountSetting, ProductId};

/// Tag placed on every draft order created here; recent orders are found by it.
pub const MATRIX_TAG: &str = "MatrixApp";
pub const DISCOUNT_DESCRIPTION: &str = "Custom Discount";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Not enough stock")]
    Oversell,

    /// First validation message reported by the backend, verbatim.
    #[error("{0}")]
    Rejected(String),
}

/// Free-form fields of the order form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(default)]
    pub note: String,
    pub po_number: Option<String>,
    pub discount: Option<DiscountSetting>,
}

impl OrderDetails {
    pub fn po_number(&self) -> Option<&str> {
        self.po_number.as_deref().map(str::trim).filter(|po| !po.is_empty())
    }

    pub fn active_discount(&self) -> Option<&DiscountSetting> { self.discount.as_ref().filter(|d| d.is_active()) }

    fn note_field(&self) -> String {
        match self.po_number() {
            Some(po) => format!("PO#: {po}\n{}", self.note),
            None => self.note.clone(),
        }
    }

    fn tags(&self) -> Vec<String> {
        let mut tags = vec![MATRIX_TAG.to_string()];
        if let Some(po) = self.po_number() {
            tags.push(format!("PO_{po}"));
        }
        tags
    }
}

/// Checks the client-side gates and builds the backend request.
pub fn prepare_draft_order(
    store: &QuantityStore,
    summary: &OrderSummary,
    customer: Option<&Customer>,
    details: &OrderDetails,
) -> Result<DraftOrderInput, SubmissionError> {
    if store.total() == 0 { return Err(SubmissionError::EmptyCart); }
    if summary.has_overselling { return Err(SubmissionError::Oversell); }

    Ok(DraftOrderInput {
        line_items: store.iter().map(|(id, quantity)| DraftLineItem { variant_id: id.clone(), quantity }).collect(),
        note: details.note_field(),
        tags: details.tags(),
        applied_discount: details.active_discount().map(|d| AppliedDiscount {
            description: DISCOUNT_DESCRIPTION.to_string(),
            value: d.value,
            value_type: d.kind,
        }),
        customer_id: customer.map(|c| c.id.clone()),
    })
}

pub fn interpret_outcome(outcome: DraftOrderOutcome) -> Result<DraftOrderConfirmation, SubmissionError> {
    match outcome {
        DraftOrderOutcome::Created(confirmation) => Ok(confirmation),
        DraftOrderOutcome::Rejected(errors) => Err(SubmissionError::Rejected(
            errors.into_iter().next().map(|e| e.message).unwrap_or_else(|| "Draft order was rejected".to_string()),
        )),
    }
}

/// Recent orders worth offering for "repeat": those containing the selected
/// product (all of them when nothing is selected), newest first, at most `limit`.
pub fn recent_orders_for_product(orders: Vec<RecentOrder>, product: Option<&ProductId>, limit: usize) -> Vec<RecentOrder> {
    orders
        .into_iter()
        .filter(|o| product.map_or(true, |p| o.contains_product(p)))
        .take(limit)
        .collect()
}
