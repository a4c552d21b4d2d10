//! Shopify Admin GraphQL client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};
use crate::backend::{BackendError, CommerceBackend};
use crate::config::ShopifySettings;
use crate::domain::aggregates::order::WALK_IN;
use crate::domain::aggregates::{
    Customer, DraftOrderConfirmation, DraftOrderInput, DraftOrderOutcome, Product, ProductMedia, ProductOption,
    RecentOrder, RecentOrderItem, SelectedOption, UserError, Variant,
};
use crate::domain::services::submission::MATRIX_TAG;
use crate::domain::value_objects::{CustomerId, DraftOrderId, Money, ProductId, VariantId};

const PRODUCT_QUERY: &str = r#"
query product($id: ID!) {
  product(id: $id) {
    id, title, options { name, values },
    media(first: 10) { edges { node { ... on MediaImage { image { url, altText } } } } },
    variants(first: 50) {
      edges { node { id, title, price, inventoryQuantity, selectedOptions { name, value } } }
    }
  }
}"#;

const RECENT_DRAFT_ORDERS_QUERY: &str = r#"
query recentDraftOrders($query: String!) {
  draftOrders(first: 50, query: $query, sortKey: UPDATED_AT, reverse: true) {
    edges {
      node {
        id, name, createdAt, invoiceUrl,
        customer { displayName },
        lineItems(first: 20) { edges { node { quantity, product { id }, variant { id } } } }
      }
    }
  }
}"#;

const CUSTOMER_SEARCH_QUERY: &str = r#"
query searchCustomers($query: String!) {
  customers(first: 10, query: $query) {
    edges { node { id, firstName, lastName, email } }
  }
}"#;

const DRAFT_ORDER_CREATE_MUTATION: &str = r#"
mutation draftOrderCreate($input: DraftOrderInput!) {
  draftOrderCreate(input: $input) {
    draftOrder { id, name, invoiceUrl }
    userErrors { field, message }
  }
}"#;

pub struct ShopifyAdminClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl ShopifyAdminClient {
    pub fn new(settings: &ShopifySettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("https://{}/admin/api/{}/graphql.json", settings.shop, settings.api_version),
            access_token: settings.access_token.clone(),
        }
    }

    async fn execute<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, BackendError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("X-Shopify-Access-Token", &self.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        decode_response(body)
    }
}

#[derive(Debug, Deserialize)] struct GraphQlResponse<T> { data: Option<T>, #[serde(default)] errors: Vec<GraphQlError> }
#[derive(Debug, Deserialize)] struct GraphQlError { message: String }
#[derive(Debug, Deserialize)] struct Connection<T> { edges: Vec<Edge<T>> }
#[derive(Debug, Deserialize)] struct Edge<T> { node: T }
#[derive(Debug, Deserialize)] struct IdRef { id: String }

impl<T> Connection<T> {
    fn nodes(self) -> impl Iterator<Item = T> { self.edges.into_iter().map(|e| e.node) }
}

fn decode_response<T: DeserializeOwned>(body: Value) -> Result<T, BackendError> {
    let response: GraphQlResponse<T> = serde_json::from_value(body)?;
    if let Some(error) = response.errors.into_iter().next() {
        return Err(BackendError::GraphQl(error.message));
    }
    response.data.ok_or_else(|| BackendError::GraphQl("response carried no data".to_string()))
}

#[derive(Debug, Deserialize)] struct ProductData { product: Option<ProductNode> }

#[derive(Debug, Deserialize)]
struct ProductNode {
    id: String,
    title: String,
    options: Vec<ProductOption>,
    media: Connection<MediaNode>,
    variants: Connection<VariantNode>,
}

#[derive(Debug, Deserialize)] struct MediaNode { #[serde(default)] image: Option<ImageNode> }
#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] struct ImageNode { url: String, alt_text: Option<String> }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantNode {
    id: String,
    title: String,
    price: Money,
    inventory_quantity: Option<i64>,
    selected_options: Vec<SelectedOption>,
}

impl From<ProductNode> for Product {
    fn from(node: ProductNode) -> Self {
        Product {
            id: ProductId::new(node.id),
            title: node.title,
            options: node.options,
            media: node.media.nodes().filter_map(|m| m.image).map(|i| ProductMedia { url: i.url, alt_text: i.alt_text }).collect(),
            variants: node
                .variants
                .nodes()
                .map(|v| Variant {
                    id: VariantId::new(v.id),
                    title: v.title,
                    price: v.price,
                    inventory_quantity: v.inventory_quantity,
                    selected_options: v.selected_options,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] struct DraftOrdersData { draft_orders: Connection<DraftOrderNode> }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftOrderNode {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    invoice_url: Option<String>,
    customer: Option<CustomerRef>,
    line_items: Connection<LineItemNode>,
}

#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] struct CustomerRef { display_name: String }
#[derive(Debug, Deserialize)] struct LineItemNode { quantity: u32, product: Option<IdRef>, variant: Option<IdRef> }

impl From<DraftOrderNode> for RecentOrder {
    fn from(node: DraftOrderNode) -> Self {
        RecentOrder {
            id: DraftOrderId::new(node.id),
            name: node.name,
            created_at: node.created_at,
            invoice_url: node.invoice_url,
            customer: node.customer.map(|c| c.display_name).unwrap_or_else(|| WALK_IN.to_string()),
            items: node
                .line_items
                .nodes()
                .map(|l| RecentOrderItem {
                    product_id: l.product.map(|p| ProductId::new(p.id)),
                    variant_id: l.variant.map(|v| VariantId::new(v.id)),
                    quantity: l.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)] struct CustomersData { customers: Connection<CustomerNode> }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerNode { id: String, first_name: Option<String>, last_name: Option<String>, email: Option<String> }

impl From<CustomerNode> for Customer {
    fn from(node: CustomerNode) -> Self {
        Customer {
            display_name: Customer::display_name_for(node.first_name.as_deref(), node.last_name.as_deref(), node.email.as_deref()),
            id: CustomerId::new(node.id),
            email: node.email,
        }
    }
}

#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] struct DraftOrderCreateData { draft_order_create: DraftOrderCreatePayload }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftOrderCreatePayload { draft_order: Option<CreatedDraftOrder>, #[serde(default)] user_errors: Vec<UserError> }

#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] struct CreatedDraftOrder { id: String, name: String, invoice_url: Option<String> }

impl DraftOrderCreatePayload {
    fn into_outcome(self) -> Result<DraftOrderOutcome, BackendError> {
        if !self.user_errors.is_empty() {
            return Ok(DraftOrderOutcome::Rejected(self.user_errors));
        }
        let created = self.draft_order.ok_or_else(|| BackendError::GraphQl("draftOrderCreate returned no draft order".to_string()))?;
        Ok(DraftOrderOutcome::Created(DraftOrderConfirmation {
            id: DraftOrderId::new(created.id),
            name: created.name,
            invoice_url: created.invoice_url,
        }))
    }
}

#[async_trait]
impl CommerceBackend for ShopifyAdminClient {
    #[instrument(skip(self))]
    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, BackendError> {
        let data: ProductData = self.execute(PRODUCT_QUERY, json!({ "id": id })).await?;
        Ok(data.product.map(Product::from))
    }

    #[instrument(skip(self))]
    async fn recent_draft_orders(&self) -> Result<Vec<RecentOrder>, BackendError> {
        let query = format!("tag:{MATRIX_TAG} AND status:OPEN");
        let data: DraftOrdersData = self.execute(RECENT_DRAFT_ORDERS_QUERY, json!({ "query": query })).await?;
        Ok(data.draft_orders.nodes().map(RecentOrder::from).collect())
    }

    #[instrument(skip(self))]
    async fn search_customers(&self, query: &str) -> Result<Vec<Customer>, BackendError> {
        let data: CustomersData = self.execute(CUSTOMER_SEARCH_QUERY, json!({ "query": format!("*{query}*") })).await?;
        Ok(data.customers.nodes().map(Customer::from).collect())
    }

    #[instrument(skip(self, input), fields(lines = input.line_items.len()))]
    async fn create_draft_order(&self, input: &DraftOrderInput) -> Result<DraftOrderOutcome, BackendError> {
        let data: DraftOrderCreateData = self.execute(DRAFT_ORDER_CREATE_MUTATION, json!({ "input": input })).await?;
        let outcome = data.draft_order_create.into_outcome()?;
        debug!(?outcome, "draftOrderCreate");
        Ok(outcome)
    }
}
