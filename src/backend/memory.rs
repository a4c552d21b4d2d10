//! In-process backend with the same observable behavior as the Admin API:
//! created draft orders show up as recent orders, newest first.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use crate::backend::{BackendError, CommerceBackend};
use crate::domain::aggregates::order::WALK_IN;
use crate::domain::aggregates::{
    Customer, DraftOrderConfirmation, DraftOrderInput, DraftOrderOutcome, Product, RecentOrder, RecentOrderItem, UserError,
};
use crate::domain::value_objects::{DraftOrderId, ProductId, VariantId};

#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    customers: Vec<Customer>,
    draft_orders: Vec<RecentOrder>,
    submitted: Vec<DraftOrderInput>,
    reject_next: Option<String>,
    next_number: u64,
}

impl InMemoryBackend {
    pub fn new() -> Self { Self::default() }

    pub fn with_product(self, product: Product) -> Self {
        self.lock().products.insert(product.id.clone(), product);
        self
    }

    pub fn with_customer(self, customer: Customer) -> Self {
        self.lock().customers.push(customer);
        self
    }

    /// Seeds an existing draft order; later seeds are treated as older.
    pub fn with_recent_order(self, order: RecentOrder) -> Self {
        self.lock().draft_orders.push(order);
        self
    }

    /// Makes the next draft order creation fail validation with `message`.
    pub fn reject_next(&self, message: impl Into<String>) { self.lock().reject_next = Some(message.into()); }

    /// Every request that produced a draft order, oldest first.
    pub fn submitted(&self) -> Vec<DraftOrderInput> { self.lock().submitted.clone() }

    fn lock(&self) -> MutexGuard<'_, MemoryState> { self.state.lock().unwrap_or_else(|e| e.into_inner()) }
}

impl MemoryState {
    fn product_of(&self, variant_id: &VariantId) -> Option<ProductId> {
        self.products.values().find(|p| p.variants.iter().any(|v| &v.id == variant_id)).map(|p| p.id.clone())
    }
}

#[async_trait]
impl CommerceBackend for InMemoryBackend {
    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, BackendError> {
        Ok(self.lock().products.get(id).cloned())
    }

    async fn recent_draft_orders(&self) -> Result<Vec<RecentOrder>, BackendError> {
        Ok(self.lock().draft_orders.iter().take(50).cloned().collect())
    }

    async fn search_customers(&self, query: &str) -> Result<Vec<Customer>, BackendError> {
        let needle = query.to_lowercase();
        Ok(self
            .lock()
            .customers
            .iter()
            .filter(|c| {
                c.display_name.to_lowercase().contains(&needle)
                    || c.email.as_deref().is_some_and(|e| e.to_lowercase().contains(&needle))
            })
            .take(10)
            .cloned()
            .collect())
    }

    async fn create_draft_order(&self, input: &DraftOrderInput) -> Result<DraftOrderOutcome, BackendError> {
        let mut state = self.lock();
        if let Some(message) = state.reject_next.take() {
            return Ok(DraftOrderOutcome::Rejected(vec![UserError { field: None, message }]));
        }

        state.next_number += 1;
        let number = 1000 + state.next_number;
        let confirmation = DraftOrderConfirmation {
            id: DraftOrderId::new(format!("gid://shopify/DraftOrder/{number}")),
            name: format!("#D{number}"),
            invoice_url: Some(format!("https://example.myshopify.com/invoices/{number}")),
        };
        let items = input
            .line_items
            .iter()
            .map(|l| RecentOrderItem { product_id: state.product_of(&l.variant_id), variant_id: Some(l.variant_id.clone()), quantity: l.quantity })
            .collect();
        let customer = input
            .customer_id
            .as_ref()
            .and_then(|id| state.customers.iter().find(|c| &c.id == id))
            .map(|c| c.display_name.clone())
            .unwrap_or_else(|| WALK_IN.to_string());

        state.draft_orders.insert(0, RecentOrder {
            id: confirmation.id.clone(),
            name: confirmation.name.clone(),
            created_at: Utc::now(),
            invoice_url: confirmation.invoice_url.clone(),
            customer,
            items,
        });
        state.submitted.push(input.clone());
        Ok(DraftOrderOutcome::Created(confirmation))
    }
}
