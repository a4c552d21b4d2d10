//! Product Aggregate

use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{Money, ProductId, VariantId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub options: Vec<ProductOption>,
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub media: Vec<ProductMedia>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)] pub struct ProductOption { pub name: String, pub values: Vec<String> }
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)] pub struct SelectedOption { pub name: String, pub value: String }
#[derive(Clone, Debug, Serialize, Deserialize)] pub struct ProductMedia { pub url: String, pub alt_text: Option<String> }

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub title: String,
    pub price: Money,
    pub inventory_quantity: Option<i64>,
    pub selected_options: Vec<SelectedOption>,
}

/// How a product's variants are laid out for entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GridShape {
    Single { len: usize },
    Matrix { rows: usize, cols: usize },
}

impl Variant {
    pub fn stock(&self) -> i64 { self.inventory_quantity.unwrap_or(0) }
    pub fn is_out_of_stock(&self) -> bool { self.stock() <= 0 }

    pub fn has_option(&self, name: &str, value: &str) -> bool {
        self.selected_options.iter().any(|o| o.name == name && o.value == value)
    }

    /// `Size: M | Color: Red`, in option declaration order.
    pub fn option_label(&self) -> String {
        self.selected_options.iter().map(|o| format!("{}: {}", o.name, o.value)).collect::<Vec<_>>().join(" | ")
    }
}

impl Product {
    pub fn id(&self) -> &ProductId { &self.id }

    pub fn grid_shape(&self) -> Result<GridShape, ProductError> {
        match self.options.as_slice() {
            [only] => Ok(GridShape::Single { len: only.values.len() }),
            [rows, cols] => Ok(GridShape::Matrix { rows: rows.values.len(), cols: cols.values.len() }),
            _ => Err(ProductError::Incompatible { title: self.title.clone(), option_count: self.options.len() }),
        }
    }

    pub fn option_summary(&self) -> String {
        self.options.iter().map(|o| o.name.as_str()).collect::<Vec<_>>().join(" / ")
    }

    pub fn featured_image(&self) -> Option<&ProductMedia> { self.media.first() }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { Incompatible { title: String, option_count: usize } }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incompatible { title, option_count } => write!(f, "Product \"{title}\" has {option_count} options. Only products with 1 or 2 options are supported."),
        }
    }
}
