//! Per-session order entry state.
//!
//! Each session owns its cart; nothing here is shared between sessions.
//! Operations run to completion under the store's lock, one event at a time.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::domain::aggregates::{Customer, DraftOrderConfirmation, DraftOrderInput, GridShape, Product, QuantityStore, RecentOrder};
use crate::domain::events::DomainEvent;
use crate::domain::services::{
    navigate_index, paste, prepare_draft_order, summarize, Cell, CellState, NavKey, Navigation, OrderDetails, OrderSummary,
    VariantIndex,
};
use crate::domain::value_objects::{parse_quantity, Money, VariantId};
use crate::{MatrixError, Result};

/// User-facing toast message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub message: String,
    pub is_error: bool,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self { Self { message: message.into(), is_error: false } }
    pub fn error(message: impl Into<String>) -> Self { Self { message: message.into(), is_error: true } }
}

#[derive(Clone, Debug)]
struct ActiveProduct {
    product: Product,
    index: VariantIndex,
}

/// A draft order handed to the backend and not yet answered.
#[derive(Clone, Copy, Debug)]
struct PendingSubmission {
    attempt: u64,
    total_items: u64,
}

/// Returned by `Session::begin_submission`: the request to send and the
/// attempt it belongs to.
#[derive(Clone, Debug)]
pub struct SubmissionTicket {
    pub attempt: u64,
    pub input: DraftOrderInput,
}

#[derive(Clone, Debug)]
pub struct Session {
    id: Uuid,
    active: Option<ActiveProduct>,
    quantities: QuantityStore,
    customer: Option<Customer>,
    details: OrderDetails,
    pending: Option<PendingSubmission>,
    attempts: u64,
    last_order: Option<DraftOrderConfirmation>,
    events: Vec<DomainEvent>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id, active: None, quantities: QuantityStore::new(), customer: None, details: OrderDetails::default(),
            pending: None, attempts: 0, last_order: None, events: vec![], created_at: now, updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn quantities(&self) -> &QuantityStore { &self.quantities }
    pub fn customer(&self) -> Option<&Customer> { self.customer.as_ref() }
    pub fn details(&self) -> &OrderDetails { &self.details }
    pub fn is_submitting(&self) -> bool { self.pending.is_some() }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn product(&self) -> Option<&Product> { self.active.as_ref().map(|a| &a.product) }

    fn index(&self) -> Result<&VariantIndex> {
        self.active.as_ref().map(|a| &a.index).ok_or(MatrixError::NoProductSelected)
    }

    /// The cart and the order form are frozen while a submission is pending.
    fn ensure_idle(&self) -> Result<()> {
        match self.pending {
            Some(_) => Err(MatrixError::SubmissionPending),
            None => Ok(()),
        }
    }

    /// Switches the active product. The cart and customer are reset even
    /// when the product turns out to be incompatible.
    pub fn select_product(&mut self, product: Product) -> Result<()> {
        self.ensure_idle()?;
        self.quantities.clear();
        self.customer = None;
        self.active = None;
        self.touch();

        let index = VariantIndex::build(&product)?;
        info!(session = %self.id, product = %product.id, variants = product.variants.len(), "product selected");
        self.raise_event(DomainEvent::ProductSelected { product_id: product.id.clone() });
        self.active = Some(ActiveProduct { product, index });
        Ok(())
    }

    /// Manual entry into a quantity input; returns the stored quantity.
    pub fn set_quantity(&mut self, variant_id: VariantId, raw: &str) -> Result<u32> {
        self.ensure_idle()?;
        let variant = self.index()?.by_id(&variant_id).ok_or_else(|| MatrixError::VariantNotFound(variant_id.clone()))?;
        if variant.is_out_of_stock() && parse_quantity(raw).unwrap_or(0) > 0 {
            return Err(MatrixError::OutOfStock(variant_id));
        }
        let qty = self.quantities.set(variant_id, raw);
        self.touch();
        Ok(qty)
    }

    pub fn navigate(&self, from: Cell, key: NavKey) -> Result<Navigation> {
        Ok(navigate_index(self.index()?, from, key))
    }

    pub fn paste(&mut self, start: Cell, text: &str) -> Result<usize> {
        self.ensure_idle()?;
        let index = &self.active.as_ref().ok_or(MatrixError::NoProductSelected)?.index;
        let written = paste(&mut self.quantities, index, start, text);
        debug!(session = %self.id, ?start, written, "paste applied");
        self.touch();
        Ok(written)
    }

    pub fn clear_cart(&mut self) -> Result<Notice> {
        self.ensure_idle()?;
        self.quantities.clear();
        let product_id = self.product().map(|p| p.id.clone());
        self.raise_event(DomainEvent::CartCleared { product_id });
        self.touch();
        Ok(Notice::info("Cart cleared"))
    }

    pub fn set_customer(&mut self, customer: Option<Customer>) -> Result<()> {
        self.ensure_idle()?;
        self.customer = customer;
        self.touch();
        Ok(())
    }

    pub fn update_details(&mut self, details: OrderDetails) -> Result<()> {
        self.ensure_idle()?;
        self.details = details;
        self.touch();
        Ok(())
    }

    pub fn summary(&self) -> OrderSummary {
        match &self.active {
            Some(active) => summarize(&self.quantities, &active.index, self.details.active_discount()),
            None => OrderSummary::default(),
        }
    }

    /// Repeats a previous order by replacing the cart with its quantities.
    pub fn load_recent_order(&mut self, order: &RecentOrder) -> Result<Notice> {
        self.ensure_idle()?;
        let index = &self.active.as_ref().ok_or(MatrixError::NoProductSelected)?.index;
        let units = self.quantities.bulk_load(order.variant_quantities(), index);
        if units == 0 {
            return Ok(Notice::error("No matching items found for this product"));
        }
        self.raise_event(DomainEvent::RecentOrderLoaded { order_id: order.id.clone(), units });
        self.touch();
        Ok(Notice::info(format!("Loaded {units} items from {}", order.name)))
    }

    /// Gates the cart and marks the session as submitting. Until the attempt
    /// is finished or abandoned, further submissions and every edit to the
    /// cart or the form fail with `SubmissionPending`.
    pub fn begin_submission(&mut self) -> Result<SubmissionTicket> {
        self.ensure_idle()?;
        let summary = self.summary();
        let input = prepare_draft_order(&self.quantities, &summary, self.customer.as_ref(), &self.details)?;
        self.attempts += 1;
        self.pending = Some(PendingSubmission { attempt: self.attempts, total_items: summary.total_items });
        Ok(SubmissionTicket { attempt: self.attempts, input })
    }

    /// Records the outcome of a submission. Success resets the cart and the
    /// form fields; failure keeps everything so the user can resubmit.
    pub fn finish_submission(&mut self, result: Result<DraftOrderConfirmation>) -> Result<DraftOrderConfirmation> {
        let pending = self.pending.take();
        self.touch();
        let confirmation = result?;

        info!(session = %self.id, order = %confirmation.name, "draft order created");
        self.raise_event(DomainEvent::DraftOrderCreated {
            order_id: confirmation.id.clone(),
            name: confirmation.name.clone(),
            customer_id: self.customer.as_ref().map(|c| c.id.clone()),
            total_items: pending.map_or_else(|| self.quantities.total(), |p| p.total_items),
        });
        self.quantities.clear();
        self.details = OrderDetails::default();
        self.last_order = Some(confirmation.clone());
        Ok(confirmation)
    }

    /// Releases `attempt` when its request went away before the backend
    /// answered. Returns false when that attempt is no longer pending.
    pub fn abandon_submission(&mut self, attempt: u64) -> bool {
        match self.pending {
            Some(p) if p.attempt == attempt => {
                warn!(session = %self.id, attempt, "submission abandoned before the backend answered");
                self.pending = None;
                self.touch();
                true
            }
            _ => false,
        }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }

    pub fn view(&self) -> SessionView {
        let summary = self.summary();
        let submit = SubmitState::of(self, &summary);
        SessionView {
            id: self.id,
            product: self.active.as_ref().map(|a| ProductView {
                id: a.product.id.to_string(),
                title: a.product.title.clone(),
                options: a.product.option_summary(),
                image_url: a.product.featured_image().map(|m| m.url.clone()),
                grid: GridView::build(&a.index, &self.quantities, &summary),
            }),
            customer: self.customer.clone(),
            details: self.details.clone(),
            submit_label: submit.label(self.customer.as_ref()),
            submit,
            summary,
            last_order: self.last_order.as_ref().map(|o| LastOrderView { admin_path: o.admin_path(), order: o.clone() }),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitState {
    Empty,
    NotEnoughStock,
    Pending,
    Ready,
}

impl SubmitState {
    fn of(session: &Session, summary: &OrderSummary) -> Self {
        if session.pending.is_some() { SubmitState::Pending }
        else if session.quantities.total() == 0 { SubmitState::Empty }
        else if summary.has_overselling { SubmitState::NotEnoughStock }
        else { SubmitState::Ready }
    }

    fn label(&self, customer: Option<&Customer>) -> String {
        match (self, customer) {
            (SubmitState::NotEnoughStock, _) => "Not Enough Stock".to_string(),
            (_, Some(c)) => format!("Create Order for {}", c.display_name),
            (_, None) => "Create Draft Order".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub product: Option<ProductView>,
    pub customer: Option<Customer>,
    pub details: OrderDetails,
    pub summary: OrderSummary,
    pub submit: SubmitState,
    pub submit_label: String,
    pub last_order: Option<LastOrderView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProductView {
    pub id: String,
    pub title: String,
    pub options: String,
    pub image_url: Option<String>,
    pub grid: GridView,
}

#[derive(Clone, Debug, Serialize)]
pub struct LastOrderView {
    #[serde(flatten)]
    pub order: DraftOrderConfirmation,
    pub admin_path: String,
}

/// Rows follow the first option's values; columns the second's (none for
/// single-option products).
#[derive(Clone, Debug, Serialize)]
pub struct GridView {
    pub shape: GridShape,
    pub row_option: String,
    pub col_option: Option<String>,
    pub rows: Vec<String>,
    pub cols: Vec<String>,
    pub cells: Vec<Vec<CellView>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CellView {
    pub cell: Cell,
    pub state: CellKind,
    pub variant_id: Option<VariantId>,
    pub price: Option<Money>,
    pub available: Option<i64>,
    pub quantity: u32,
    pub oversold: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Unavailable,
    OutOfStock,
    Open,
}

impl GridView {
    fn build(index: &VariantIndex, store: &QuantityStore, summary: &OrderSummary) -> Self {
        let options = index.options();
        let rows = options[0].values.clone();
        let cols = options.get(1).map(|o| o.values.clone()).unwrap_or_default();
        let cell_view = |cell: Cell| {
            let state = index.cell(cell);
            let variant = state.variant();
            let quantity = variant.map(|v| store.get(&v.id)).unwrap_or(0);
            CellView {
                cell,
                state: match state {
                    CellState::Unavailable => CellKind::Unavailable,
                    CellState::OutOfStock(_) => CellKind::OutOfStock,
                    CellState::Open(_) => CellKind::Open,
                },
                variant_id: variant.map(|v| v.id.clone()),
                price: variant.map(|v| v.price),
                available: variant.map(|v| v.stock()),
                quantity,
                oversold: variant.is_some_and(|v| summary.lines.iter().any(|l| l.variant_id == v.id && l.oversold)),
            }
        };
        let cells: Vec<Vec<CellView>> = match index.shape() {
            GridShape::Single { len } => (0..len).map(|i| vec![cell_view(Cell::Index(i))]).collect(),
            GridShape::Matrix { rows: row_count, cols: col_count } => (0..row_count)
                .map(|row| (0..col_count).map(|col| cell_view(Cell::Grid { row, col })).collect())
                .collect(),
        };
        GridView {
            shape: index.shape(),
            row_option: options[0].name.clone(),
            col_option: options.get(1).map(|o| o.name.clone()),
            rows,
            cols,
            cells,
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self { Self::default() }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::now_v7();
        self.inner.write().await.insert(id, Session::new(id));
        id
    }

    /// Runs `f` against the session under the write lock.
    pub async fn with<T>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let mut sessions = self.inner.write().await;
        let session = sessions.get_mut(&id).ok_or(MatrixError::SessionNotFound)?;
        f(session)
    }

    /// Runs `f` against the session under the read lock.
    pub async fn read<T>(&self, id: Uuid, f: impl FnOnce(&Session) -> T) -> Result<T> {
        let sessions = self.inner.read().await;
        sessions.get(&id).map(f).ok_or(MatrixError::SessionNotFound)
    }

    pub async fn view(&self, id: Uuid) -> Result<SessionView> {
        self.read(id, Session::view).await
    }

    pub async fn remove(&self, id: Uuid) -> Result<()> {
        self.inner.write().await.remove(&id).map(|_| ()).ok_or(MatrixError::SessionNotFound)
    }

    /// Drops sessions untouched since `cutoff`. Sessions waiting on the
    /// backend are kept. Returns how many were removed.
    pub async fn evict_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.is_submitting() || s.updated_at >= cutoff);
        before - sessions.len()
    }

    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        self.evict_before(Utc::now() - max_idle).await
    }

    pub async fn len(&self) -> usize { self.inner.read().await.len() }
}

/// Evicts idle sessions every `every` until the runtime shuts down.
pub fn spawn_idle_sweep(store: SessionStore, max_idle: Duration, every: std::time::Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let evicted = store.evict_idle(max_idle).await;
            if evicted > 0 {
                info!(evicted, "idle sessions evicted");
            }
        }
    })
}
