//! Stateless services over the aggregates
pub mod variant_index;
pub mod navigation;
pub mod summary;
pub mod submission;

pub use variant_index::{CellState, VariantIndex};
pub use navigation::{navigate, navigate_index, paste, Cell, NavKey, Navigation};
pub use summary::{summarize, OrderSummary, SummaryLine};
pub use submission::{interpret_outcome, prepare_draft_order, recent_orders_for_product, OrderDetails, SubmissionError};
