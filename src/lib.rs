//! Matrix Quick Order
//!
//! Draft order entry over a product's variant grid, for storefront admins.
//!
//! ## Features
//! - One- and two-option variant grids with keyboard navigation
//! - Spreadsheet paste straight into a grid column
//! - Live order summary with discounts and overselling detection
//! - Repeat a recent draft order
//! - Draft order submission to the Shopify Admin API

use thiserror::Error;

pub mod api;
pub mod backend;
pub mod config;
pub mod domain;
pub mod session;

pub use backend::{BackendError, CommerceBackend};
pub use domain::aggregates::{ProductError, QuantityStore};
pub use domain::services::{OrderSummary, SubmissionError, VariantIndex};
pub use session::{Session, SessionStore};

use domain::value_objects::VariantId;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Product not found")]
    ProductNotFound,

    #[error("No product selected")]
    NoProductSelected,

    #[error("{0}")]
    IncompatibleProduct(#[from] ProductError),

    #[error("Variant not found: {0}")]
    VariantNotFound(VariantId),

    #[error("Variant is out of stock: {0}")]
    OutOfStock(VariantId),

    #[error("Recent order not found")]
    RecentOrderNotFound,

    #[error("An order submission is already in progress")]
    SubmissionPending,

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

pub type Result<T> = std::result::Result<T, MatrixError>;
