//! Variant lookups for the active product.
//!
//! Rebuilt from scratch whenever the product changes.

use std::collections::HashMap;
use tracing::warn;
use crate::domain::aggregates::product::{GridShape, Product, ProductError, ProductOption, Variant};
use crate::domain::services::navigation::Cell;
use crate::domain::value_objects::VariantId;

#[derive(Clone, Debug)]
pub struct VariantIndex {
    shape: GridShape,
    options: Vec<ProductOption>,
    variants: Vec<Variant>,
    by_id: HashMap<VariantId, usize>,
    by_value: HashMap<String, usize>,
    by_coordinate: HashMap<(String, String), usize>,
}

/// What the presentation layer shows at a grid coordinate.
#[derive(Clone, Copy, Debug)]
pub enum CellState<'a> {
    /// No variant exists for this option combination.
    Unavailable,
    /// Variant exists but has no positive stock; entry is disabled.
    OutOfStock(&'a Variant),
    Open(&'a Variant),
}

impl<'a> CellState<'a> {
    pub fn variant(&self) -> Option<&'a Variant> {
        match *self {
            CellState::Unavailable => None,
            CellState::OutOfStock(v) | CellState::Open(v) => Some(v),
        }
    }
}

impl VariantIndex {
    pub fn build(product: &Product) -> Result<Self, ProductError> {
        let shape = product.grid_shape()?;
        let mut index = Self {
            shape,
            options: product.options.clone(),
            variants: product.variants.clone(),
            by_id: HashMap::with_capacity(product.variants.len()),
            by_value: HashMap::new(),
            by_coordinate: HashMap::new(),
        };

        for (pos, variant) in product.variants.iter().enumerate() {
            index.by_id.insert(variant.id.clone(), pos);
            let value_of = |option: &ProductOption| {
                variant.selected_options.iter().find(|o| o.name == option.name).map(|o| o.value.clone())
            };
            match product.options.as_slice() {
                [only] => {
                    if let Some(value) = value_of(only) {
                        index.by_value.entry(value).or_insert(pos);
                    }
                }
                [rows, cols] => {
                    if let (Some(r), Some(c)) = (value_of(rows), value_of(cols)) {
                        if index.by_coordinate.contains_key(&(r.clone(), c.clone())) {
                            warn!(variant = %variant.id, row = %r, col = %c, "duplicate variant for grid coordinate, keeping first");
                        } else {
                            index.by_coordinate.insert((r, c), pos);
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(index)
    }

    pub fn shape(&self) -> GridShape { self.shape }
    pub fn options(&self) -> &[ProductOption] { &self.options }

    /// Variants in catalog declaration order.
    pub fn variants(&self) -> &[Variant] { &self.variants }

    pub fn contains(&self, id: &VariantId) -> bool { self.by_id.contains_key(id) }
    pub fn by_id(&self, id: &VariantId) -> Option<&Variant> { self.by_id.get(id).map(|&pos| &self.variants[pos]) }

    pub fn by_coordinate(&self, row_value: &str, col_value: &str) -> Option<&Variant> {
        self.by_coordinate
            .get(&(row_value.to_string(), col_value.to_string()))
            .map(|&pos| &self.variants[pos])
    }

    fn by_value(&self, value: &str) -> Option<&Variant> { self.by_value.get(value).map(|&pos| &self.variants[pos]) }

    /// Whether keyboard focus can land on `cell`. Grid cells keep their input
    /// when stocked out, so a column is walked past them; single-option lists
    /// render no input for out-of-stock rows.
    pub fn is_focusable(&self, cell: Cell) -> bool {
        match self.cell(cell) {
            CellState::Open(_) => true,
            CellState::OutOfStock(_) => matches!(self.shape, GridShape::Matrix { .. }),
            CellState::Unavailable => false,
        }
    }

    pub fn cell(&self, cell: Cell) -> CellState<'_> {
        let variant = match (self.shape, cell) {
            (GridShape::Single { .. }, Cell::Index(i)) => {
                self.options[0].values.get(i).and_then(|value| self.by_value(value))
            }
            (GridShape::Matrix { .. }, Cell::Grid { row, col }) => {
                match (self.options[0].values.get(row), self.options[1].values.get(col)) {
                    (Some(r), Some(c)) => self.by_coordinate(r, c),
                    _ => None,
                }
            }
            _ => None,
        };
        match variant {
            None => CellState::Unavailable,
            Some(v) if v.is_out_of_stock() => CellState::OutOfStock(v),
            Some(v) => CellState::Open(v),
        }
    }
}
