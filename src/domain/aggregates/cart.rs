//! Quantity store: the session cart
//!
//! Sparse map from variant to requested quantity. A present entry is always
//! positive; zero is represented by absence.

use serde::Serialize;
use std::collections::BTreeMap;
use crate::domain::services::variant_index::VariantIndex;
use crate::domain::value_objects::{parse_quantity, VariantId};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuantityStore {
    entries: BTreeMap<VariantId, u32>,
}

impl QuantityStore {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, variant_id: &VariantId) -> u32 { self.entries.get(variant_id).copied().unwrap_or(0) }
    pub fn iter(&self) -> impl Iterator<Item = (&VariantId, u32)> { self.entries.iter().map(|(id, q)| (id, *q)) }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Manual entry. Anything that is not a positive integer clears the cell.
    pub fn set(&mut self, variant_id: VariantId, raw: &str) -> u32 {
        let qty = parse_quantity(raw).unwrap_or(0);
        self.set_or_remove(variant_id, qty);
        qty
    }

    pub fn set_or_remove(&mut self, variant_id: VariantId, qty: u32) {
        if qty == 0 {
            self.entries.remove(&variant_id);
        } else {
            self.entries.insert(variant_id, qty);
        }
    }

    /// Replaces the cart with `pairs`, keeping only variants of the indexed
    /// product. Returns the units applied; when that is zero the current
    /// cart is left untouched.
    pub fn bulk_load<I>(&mut self, pairs: I, index: &VariantIndex) -> u64
    where
        I: IntoIterator<Item = (VariantId, u32)>,
    {
        let mut loaded = QuantityStore::new();
        for (variant_id, qty) in pairs {
            if qty > 0 && index.contains(&variant_id) {
                loaded.set_or_remove(variant_id, qty);
            }
        }
        let applied = loaded.total();
        if applied > 0 { *self = loaded; }
        applied
    }

    pub fn clear(&mut self) { self.entries.clear(); }

    pub fn total(&self) -> u64 { self.entries.values().map(|q| u64::from(*q)).sum() }
}
