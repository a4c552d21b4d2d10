//! Order summary derived from the cart.
//!
//! Recomputed in full on every change; variant counts are small enough that
//! nothing is cached.

use serde::Serialize;
use crate::domain::aggregates::cart::QuantityStore;
use crate::domain::services::variant_index::VariantIndex;
use crate::domain::value_objects::{DiscountSetting, Money, VariantId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SummaryLine {
    pub variant_id: VariantId,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
    pub available: i64,
    /// Quantity exceeds a positive stock level.
    pub oversold: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub lines: Vec<SummaryLine>,
    pub total_items: u64,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub final_total: Money,
    pub has_overselling: bool,
}

impl OrderSummary {
    pub fn is_empty(&self) -> bool { self.total_items == 0 }
}

/// Prices the cart against the indexed product.
///
/// Entries for variants the index does not know are skipped. Lines come out
/// in catalog order, each rounded to cents before it joins the subtotal.
pub fn summarize(store: &QuantityStore, index: &VariantIndex, discount: Option<&DiscountSetting>) -> OrderSummary {
    let mut summary = OrderSummary::default();

    for variant in index.variants() {
        let quantity = store.get(&variant.id);
        if quantity == 0 { continue; }

        let stock = variant.stock();
        let oversold = stock > 0 && i64::from(quantity) > stock;
        let line_total = variant.price.line_total(quantity);

        summary.total_items += u64::from(quantity);
        summary.subtotal = summary.subtotal + line_total;
        summary.has_overselling |= oversold;
        summary.lines.push(SummaryLine {
            variant_id: variant.id.clone(),
            title: variant.option_label(),
            quantity,
            unit_price: variant.price,
            line_total,
            available: stock,
            oversold,
        });
    }

    summary.discount_amount = discount.map(|d| d.amount_for(summary.subtotal)).unwrap_or(Money::ZERO);
    summary.final_total = summary.subtotal.saturating_sub(summary.discount_amount);
    summary
}
