//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{GridShape, Product, ProductError, ProductMedia, ProductOption, SelectedOption, Variant};
pub use order::{Customer, DraftOrderConfirmation, DraftOrderInput, DraftOrderOutcome, RecentOrder, RecentOrderItem, UserError};
pub use cart::QuantityStore;
