//! HTTP surface: one JSON API per order entry session.

use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post, put}, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};
use crate::backend::CommerceBackend;
use crate::domain::aggregates::{Customer, RecentOrder};
use crate::domain::events::DomainEvent;
use crate::domain::services::{interpret_outcome, recent_orders_for_product, Cell, NavKey, Navigation, OrderDetails, OrderSummary, SubmissionError};
use crate::domain::value_objects::{DiscountSetting, DraftOrderId, ProductId, VariantId};
use crate::session::{LastOrderView, Notice, Session, SessionStore, SessionView};
use crate::MatrixError;

type ApiResult<T> = Result<T, (StatusCode, String)>;

/// Customer search needs at least this many characters.
const MIN_QUERY_LEN: usize = 2;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub backend: Arc<dyn CommerceBackend>,
    pub nats: Option<async_nats::Client>,
    pub recent_order_limit: usize,
}

impl AppState {
    pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
        Self { sessions: SessionStore::new(), backend, nats: None, recent_order_limit: 5 }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "matrix-quick-order"})) }))
        .route("/api/v1/sessions", post(create_session))
        .route("/api/v1/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/v1/sessions/:id/product", put(select_product))
        .route("/api/v1/sessions/:id/quantities", put(set_quantities).delete(clear_cart))
        .route("/api/v1/sessions/:id/quantities/:variant_id", put(set_quantity).delete(remove_quantity))
        .route("/api/v1/sessions/:id/navigate", post(navigate))
        .route("/api/v1/sessions/:id/paste", post(paste))
        .route("/api/v1/sessions/:id/customer", put(set_customer).delete(clear_customer))
        .route("/api/v1/sessions/:id/details", put(update_details))
        .route("/api/v1/sessions/:id/summary", get(get_summary))
        .route("/api/v1/sessions/:id/recent-orders", get(recent_orders))
        .route("/api/v1/sessions/:id/recent-orders/load", post(load_recent_order))
        .route("/api/v1/sessions/:id/orders", post(submit_order))
        .route("/api/v1/customers", get(search_customers))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

fn reject(e: MatrixError) -> (StatusCode, String) {
    let status = match &e {
        MatrixError::SessionNotFound | MatrixError::ProductNotFound | MatrixError::RecentOrderNotFound | MatrixError::VariantNotFound(_) => StatusCode::NOT_FOUND,
        MatrixError::IncompatibleProduct(_) | MatrixError::Submission(SubmissionError::Rejected(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        MatrixError::NoProductSelected | MatrixError::OutOfStock(_) | MatrixError::SubmissionPending | MatrixError::Submission(_) => StatusCode::CONFLICT,
        MatrixError::Backend(_) => StatusCode::BAD_GATEWAY,
    };
    if status.is_server_error() { error!(error = %e, "request failed"); }
    (status, e.to_string())
}

fn invalid(e: validator::ValidationErrors) -> (StatusCode, String) { (StatusCode::BAD_REQUEST, e.to_string()) }

/// Runs `f` against the session, then publishes whatever events it raised.
async fn mutate<T>(state: &AppState, id: Uuid, f: impl FnOnce(&mut Session) -> crate::Result<T>) -> ApiResult<T> {
    let (value, events) = state
        .sessions
        .with(id, |s| {
            let result = f(s);
            let events = s.take_events();
            result.map(|v| (v, events))
        })
        .await
        .map_err(reject)?;
    publish_events(state, events).await;
    Ok(value)
}

async fn publish_events(state: &AppState, events: Vec<DomainEvent>) {
    let Some(nats) = &state.nats else { return };
    for event in events {
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => { warn!(error = %e, "failed to encode event"); continue; }
        };
        if let Err(e) = nats.publish(format!("matrix.{}", event.subject()), payload.into()).await {
            warn!(error = %e, subject = event.subject(), "failed to publish event");
        }
    }
}

#[derive(Debug, Serialize)] pub struct NoticeResponse { pub notice: Notice, pub summary: OrderSummary }
#[derive(Debug, Serialize)] pub struct QuantityResponse { pub variant_id: VariantId, pub quantity: u32, pub summary: OrderSummary }
#[derive(Debug, Serialize)] pub struct PasteResponse { pub written: usize, pub summary: OrderSummary }
#[derive(Debug, Serialize)] pub struct SubmitResponse { pub notice: Notice, pub order: LastOrderView }

async fn create_session(State(s): State<AppState>) -> ApiResult<(StatusCode, Json<SessionView>)> {
    let id = s.sessions.create().await;
    info!(session = %id, "session created");
    Ok((StatusCode::CREATED, Json(s.sessions.view(id).await.map_err(reject)?)))
}

async fn get_session(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<SessionView>> {
    s.sessions.view(id).await.map(Json).map_err(reject)
}

async fn delete_session(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    s.sessions.remove(id).await.map_err(reject)?;
    info!(session = %id, "session closed");
    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_session(state: &AppState, id: Uuid) -> ApiResult<()> {
    state.sessions.read(id, |_| ()).await.map_err(reject)
}

#[derive(Debug, Deserialize)] pub struct SelectProductRequest { pub product_id: String }

async fn select_product(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<SelectProductRequest>) -> ApiResult<Json<SessionView>> {
    ensure_session(&s, id).await?;
    let product = s
        .backend
        .fetch_product(&ProductId::new(r.product_id))
        .await
        .map_err(|e| reject(e.into()))?
        .ok_or_else(|| reject(MatrixError::ProductNotFound))?;
    mutate(&s, id, |session| {
        session.select_product(product)?;
        Ok(session.view())
    })
    .await
    .map(Json)
}

/// A quantity as typed: text (`"12"`, `""`) or a JSON number. Numbers go
/// through the same parsing as text, so `-3` clears and `2.5` reads as 2.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawQuantity { Text(String), Integer(i64), Unsigned(u64), Float(f64) }

impl RawQuantity {
    fn as_text(&self) -> String {
        match self {
            RawQuantity::Text(t) => t.clone(),
            RawQuantity::Integer(n) => n.to_string(),
            RawQuantity::Unsigned(n) => n.to_string(),
            RawQuantity::Float(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)] pub struct SetQuantityRequest { pub quantity: RawQuantity }
#[derive(Debug, Deserialize)] pub struct QuantityEntry { pub variant_id: VariantId, pub quantity: RawQuantity }
#[derive(Debug, Deserialize)] pub struct SetQuantitiesRequest { pub entries: Vec<QuantityEntry> }

async fn set_quantity(State(s): State<AppState>, Path((id, variant_id)): Path<(Uuid, String)>, Json(r): Json<SetQuantityRequest>) -> ApiResult<Json<QuantityResponse>> {
    let variant_id = VariantId::new(variant_id);
    mutate(&s, id, |session| {
        let quantity = session.set_quantity(variant_id.clone(), &r.quantity.as_text())?;
        Ok(QuantityResponse { variant_id, quantity, summary: session.summary() })
    })
    .await
    .map(Json)
}

async fn remove_quantity(State(s): State<AppState>, Path((id, variant_id)): Path<(Uuid, String)>) -> ApiResult<Json<QuantityResponse>> {
    let variant_id = VariantId::new(variant_id);
    mutate(&s, id, |session| {
        let quantity = session.set_quantity(variant_id.clone(), "")?;
        Ok(QuantityResponse { variant_id, quantity, summary: session.summary() })
    })
    .await
    .map(Json)
}

/// Applies several manual entries; the first rejected entry stops the batch
/// and earlier entries stay applied.
async fn set_quantities(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<SetQuantitiesRequest>) -> ApiResult<Json<OrderSummary>> {
    mutate(&s, id, |session| {
        for entry in r.entries {
            session.set_quantity(entry.variant_id, &entry.quantity.as_text())?;
        }
        Ok(session.summary())
    })
    .await
    .map(Json)
}

async fn clear_cart(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<NoticeResponse>> {
    mutate(&s, id, |session| {
        let notice = session.clear_cart()?;
        Ok(NoticeResponse { notice, summary: session.summary() })
    })
    .await
    .map(Json)
}

#[derive(Debug, Deserialize)] pub struct NavigateRequest { pub from: Cell, pub key: NavKey }

async fn navigate(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<NavigateRequest>) -> ApiResult<Json<Navigation>> {
    s.sessions.read(id, |session| session.navigate(r.from, r.key)).await.and_then(|nav| nav).map(Json).map_err(reject)
}

#[derive(Debug, Deserialize)] pub struct PasteRequest { pub start: Cell, pub text: String }

async fn paste(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<PasteRequest>) -> ApiResult<Json<PasteResponse>> {
    mutate(&s, id, |session| {
        let written = session.paste(r.start, &r.text)?;
        Ok(PasteResponse { written, summary: session.summary() })
    })
    .await
    .map(Json)
}

async fn set_customer(State(s): State<AppState>, Path(id): Path<Uuid>, Json(customer): Json<Customer>) -> ApiResult<Json<SessionView>> {
    mutate(&s, id, |session| {
        session.set_customer(Some(customer))?;
        Ok(session.view())
    })
    .await
    .map(Json)
}

async fn clear_customer(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<SessionView>> {
    mutate(&s, id, |session| {
        session.set_customer(None)?;
        Ok(session.view())
    })
    .await
    .map(Json)
}

#[derive(Debug, Deserialize, Validate)]
pub struct DetailsRequest {
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub note: String,
    #[validate(length(max = 64))]
    pub po_number: Option<String>,
    #[validate(custom = "non_negative_discount")]
    pub discount: Option<DiscountSetting>,
}

fn non_negative_discount(discount: &DiscountSetting) -> Result<(), ValidationError> {
    if discount.value.is_sign_negative() { return Err(ValidationError::new("negative_discount")); }
    Ok(())
}

async fn update_details(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<DetailsRequest>) -> ApiResult<Json<SessionView>> {
    r.validate().map_err(invalid)?;
    let details = OrderDetails { note: r.note, po_number: r.po_number, discount: r.discount };
    mutate(&s, id, |session| {
        session.update_details(details)?;
        Ok(session.view())
    })
    .await
    .map(Json)
}

async fn get_summary(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<OrderSummary>> {
    s.sessions.read(id, Session::summary).await.map(Json).map_err(reject)
}

async fn recent_orders(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Vec<RecentOrder>>> {
    let product = s.sessions.read(id, |session| session.product().map(|p| p.id.clone())).await.map_err(reject)?;
    let orders = s.backend.recent_draft_orders().await.map_err(|e| reject(e.into()))?;
    Ok(Json(recent_orders_for_product(orders, product.as_ref(), s.recent_order_limit)))
}

#[derive(Debug, Deserialize)] pub struct LoadRecentOrderRequest { pub order_id: DraftOrderId }

async fn load_recent_order(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<LoadRecentOrderRequest>) -> ApiResult<Json<NoticeResponse>> {
    ensure_session(&s, id).await?;
    let order = s
        .backend
        .recent_draft_orders()
        .await
        .map_err(|e| reject(e.into()))?
        .into_iter()
        .find(|o| o.id == r.order_id)
        .ok_or_else(|| reject(MatrixError::RecentOrderNotFound))?;
    mutate(&s, id, |session| {
        let notice = session.load_recent_order(&order)?;
        Ok(NoticeResponse { notice, summary: session.summary() })
    })
    .await
    .map(Json)
}

/// Releases a pending submission whose request is dropped (client gone,
/// timeout) before the backend answered.
struct SubmissionGuard {
    sessions: SessionStore,
    id: Uuid,
    attempt: u64,
    armed: bool,
}

impl SubmissionGuard {
    fn disarm(mut self) { self.armed = false; }
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        if !self.armed { return; }
        let (sessions, id, attempt) = (self.sessions.clone(), self.id, self.attempt);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = sessions.with(id, |session| Ok(session.abandon_submission(attempt))).await {
                        debug!(session = %id, error = %e, "abandoned submission already gone");
                    }
                });
            }
            Err(_) => warn!(session = %id, attempt, "no runtime to release abandoned submission"),
        }
    }
}

async fn submit_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let ticket = s.sessions.with(id, |session| session.begin_submission()).await.map_err(reject)?;
    let guard = SubmissionGuard { sessions: s.sessions.clone(), id, attempt: ticket.attempt, armed: true };
    let result = match s.backend.create_draft_order(&ticket.input).await {
        Ok(outcome) => interpret_outcome(outcome).map_err(MatrixError::from),
        Err(e) => Err(MatrixError::from(e)),
    };
    if let Err(e) = &result { warn!(session = %id, error = %e, "draft order not created"); }
    let finished = s
        .sessions
        .with(id, |session| {
            let result = session.finish_submission(result);
            Ok((result, session.take_events()))
        })
        .await;
    guard.disarm();
    let (result, events) = finished.map_err(reject)?;
    publish_events(&s, events).await;
    let confirmation = result.map_err(reject)?;
    let notice = Notice::info(format!("Draft order {} created", confirmation.name));
    let order = LastOrderView { admin_path: confirmation.admin_path(), order: confirmation };
    Ok((StatusCode::CREATED, Json(SubmitResponse { notice, order })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerQuery {
    #[serde(default)]
    #[validate(length(max = 100))]
    pub query: String,
}

async fn search_customers(State(s): State<AppState>, Query(q): Query<CustomerQuery>) -> ApiResult<Json<Vec<Customer>>> {
    q.validate().map_err(invalid)?;
    let query = q.query.trim();
    if query.chars().count() < MIN_QUERY_LEN { return Ok(Json(vec![])); }
    let customers = s.backend.search_customers(query).await.map_err(|e| reject(e.into()))?;
    Ok(Json(customers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::domain::aggregates::product::fixtures::{option, tee};
    use crate::backend::BackendError;
    use crate::domain::aggregates::{DraftOrderInput, DraftOrderOutcome, Product};
    use crate::domain::value_objects::CustomerId;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    /// Never answers the first draft order creation; everything else goes
    /// to the in-memory backend.
    struct StallOnce {
        inner: Arc<InMemoryBackend>,
        stall: AtomicBool,
    }

    #[async_trait]
    impl CommerceBackend for StallOnce {
        async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, BackendError> { self.inner.fetch_product(id).await }
        async fn recent_draft_orders(&self) -> Result<Vec<RecentOrder>, BackendError> { self.inner.recent_draft_orders().await }
        async fn search_customers(&self, query: &str) -> Result<Vec<Customer>, BackendError> { self.inner.search_customers(query).await }

        async fn create_draft_order(&self, input: &DraftOrderInput) -> Result<DraftOrderOutcome, BackendError> {
            if self.stall.swap(false, Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            self.inner.create_draft_order(input).await
        }
    }

    struct TestApp {
        app: Router,
        backend: Arc<InMemoryBackend>,
    }

    impl TestApp {
        fn new() -> Self {
            let memory = Self::memory();
            Self { app: router(AppState::new(memory.clone())), backend: memory }
        }

        fn stalling_once() -> Self {
            let memory = Self::memory();
            let backend = Arc::new(StallOnce { inner: memory.clone(), stall: AtomicBool::new(true) });
            Self { app: router(AppState::new(backend)), backend: memory }
        }

        fn memory() -> Arc<InMemoryBackend> {
            let mut three_options = tee();
            three_options.id = ProductId::new("gid://shopify/Product/3");
            three_options.options.push(option("Fit", &["Slim"]));
            for v in &mut three_options.variants {
                v.id = VariantId::new(format!("fit-{}", v.id));
            }
            Arc::new(
                InMemoryBackend::new()
                    .with_product(tee())
                    .with_product(three_options)
                    .with_customer(Customer { id: CustomerId::new("gid://shopify/Customer/7"), display_name: "Ada Lovelace".into(), email: Some("ada@example.com".into()) }),
            )
        }

        async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let builder = Request::builder().method(method).uri(uri);
            let request = match body {
                Some(b) => builder.header("content-type", "application/json").body(Body::from(b.to_string())).unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            (status, value)
        }

        /// New session with the tee selected; returns its base path.
        async fn session_with_tee(&self) -> String {
            let (status, session) = self.send("POST", "/api/v1/sessions", None).await;
            assert_eq!(status, StatusCode::CREATED);
            let base = format!("/api/v1/sessions/{}", session["id"].as_str().unwrap());
            let (status, _) = self.send("PUT", &format!("{base}/product"), Some(json!({"product_id": "gid://shopify/Product/1"}))).await;
            assert_eq!(status, StatusCode::OK);
            base
        }
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = TestApp::new().send("GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_entry_and_summary() {
        let t = TestApp::new();
        let base = t.session_with_tee().await;

        let (status, body) = t.send("PUT", &format!("{base}/quantities/v-s-red"), Some(json!({"quantity": "3"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quantity"], 3);
        assert_eq!(body["summary"]["subtotal"], "30.00");

        let (status, _) = t.send("PUT", &format!("{base}/quantities/v-m-red"), Some(json!({"quantity": 2}))).await;
        assert_eq!(status, StatusCode::OK);

        let (_, summary) = t.send("GET", &format!("{base}/summary"), None).await;
        assert_eq!(summary["total_items"], 5);
        assert_eq!(summary["subtotal"], "55.00");

        let (status, _) = t.send("PUT", &format!("{base}/quantities/v-l-red"), Some(json!({"quantity": "1"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = t.send("PUT", &format!("{base}/quantities/nope"), Some(json!({"quantity": "1"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = t.send("DELETE", &format!("{base}/quantities/v-m-red"), None).await;
        assert_eq!(body["summary"]["total_items"], 3);

        let (_, body) = t.send("DELETE", &format!("{base}/quantities"), None).await;
        assert_eq!(body["notice"]["message"], "Cart cleared");
        assert_eq!(body["notice"]["is_error"], false);
        assert_eq!(body["summary"]["total_items"], 0);
    }

    #[tokio::test]
    async fn test_unknown_session_and_product() {
        let t = TestApp::new();
        let (status, _) = t.send("GET", &format!("/api/v1/sessions/{}", Uuid::now_v7()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, session) = t.send("POST", "/api/v1/sessions", None).await;
        let base = format!("/api/v1/sessions/{}", session["id"].as_str().unwrap());
        let (status, _) = t.send("PUT", &format!("{base}/product"), Some(json!({"product_id": "missing"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = t.send("PUT", &format!("{base}/product"), Some(json!({"product_id": "gid://shopify/Product/3"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_navigate_and_paste() {
        let t = TestApp::new();
        let base = t.session_with_tee().await;

        let (status, nav) = t
            .send("POST", &format!("{base}/navigate"), Some(json!({"from": {"grid": {"row": 0, "col": 0}}, "key": "ArrowDown"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(nav, json!({"action": "move", "cell": {"grid": {"row": 1, "col": 0}}}));

        let (_, nav) = t.send("POST", &format!("{base}/navigate"), Some(json!({"from": {"grid": {"row": 0, "col": 0}}, "key": "a"}))).await;
        assert_eq!(nav["action"], "unhandled");

        let (status, body) = t.send("POST", &format!("{base}/paste"), Some(json!({"start": {"grid": {"row": 0, "col": 0}}, "text": "2\r\n1\n"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["written"], 2);
        assert_eq!(body["summary"]["total_items"], 3);
    }

    #[tokio::test]
    async fn test_navigate_from_extreme_coordinates() {
        let t = TestApp::new();
        let base = t.session_with_tee().await;
        let (status, nav) = t
            .send("POST", &format!("{base}/navigate"), Some(json!({"from": {"grid": {"row": 0, "col": u64::MAX}}, "key": "ArrowRight"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(nav, json!({"action": "stay"}));
        let (status, nav) = t
            .send("POST", &format!("{base}/navigate"), Some(json!({"from": {"grid": {"row": u64::MAX, "col": u64::MAX}}, "key": "Enter"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(nav, json!({"action": "stay"}));
    }

    #[tokio::test]
    async fn test_numeric_quantities_parse_like_text() {
        let t = TestApp::new();
        let base = t.session_with_tee().await;
        let (status, body) = t.send("PUT", &format!("{base}/quantities/v-s-red"), Some(json!({"quantity": 2.5}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quantity"], 2);
        let (status, body) = t.send("PUT", &format!("{base}/quantities/v-s-red"), Some(json!({"quantity": -3}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quantity"], 0);
        assert_eq!(body["summary"]["total_items"], 0);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let t = TestApp::new();
        let base = t.session_with_tee().await;
        let (status, _) = t.send("DELETE", &base, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = t.send("GET", &base, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = t.send("DELETE", &base, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dropped_submission_releases_session() {
        let t = TestApp::stalling_once();
        let base = t.session_with_tee().await;
        t.send("PUT", &format!("{base}/quantities/v-s-red"), Some(json!({"quantity": "2"}))).await;

        let first = tokio::time::timeout(Duration::from_millis(50), t.send("POST", &format!("{base}/orders"), None)).await;
        assert!(first.is_err());

        let mut submit = Value::Null;
        for _ in 0..50 {
            let (_, view) = t.send("GET", &base, None).await;
            submit = view["submit"].clone();
            if submit != "pending" { break; }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(submit, "ready");

        let (status, body) = t.send("POST", &format!("{base}/orders"), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["order"]["name"], "#D1001");
        assert_eq!(t.backend.submitted().len(), 1);
    }

    #[tokio::test]
    async fn test_edits_rejected_while_submission_pending() {
        let t = TestApp::stalling_once();
        let base = t.session_with_tee().await;
        t.send("PUT", &format!("{base}/quantities/v-s-red"), Some(json!({"quantity": "2"}))).await;

        let app = t.app.clone();
        let uri = format!("{base}/orders");
        let pending = tokio::spawn(async move {
            let request = Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap();
            app.oneshot(request).await
        });
        let mut submit = Value::Null;
        for _ in 0..50 {
            let (_, view) = t.send("GET", &base, None).await;
            submit = view["submit"].clone();
            if submit == "pending" { break; }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(submit, "pending");

        let (status, _) = t.send("PUT", &format!("{base}/quantities/v-m-red"), Some(json!({"quantity": "4"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = t.send("POST", &format!("{base}/orders"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (_, summary) = t.send("GET", &format!("{base}/summary"), None).await;
        assert_eq!(summary["total_items"], 2);
        pending.abort();
    }

    #[tokio::test]
    async fn test_submit_and_repeat() {
        let t = TestApp::new();
        let base = t.session_with_tee().await;

        let (status, _) = t.send("POST", &format!("{base}/orders"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        t.send("PUT", &format!("{base}/quantities/v-s-red"), Some(json!({"quantity": "3"}))).await;
        let (status, view) = t
            .send("PUT", &format!("{base}/details"), Some(json!({"note": "rush", "po_number": "5544", "discount": {"kind": "PERCENTAGE", "value": "10"}})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["summary"]["final_total"], "27.00");

        let (status, body) = t.send("POST", &format!("{base}/orders"), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["notice"]["message"], "Draft order #D1001 created");
        assert_eq!(body["order"]["admin_path"], "shopify:admin/draft_orders/1001");

        let submitted = t.backend.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].note, "PO#: 5544\nrush");
        assert_eq!(submitted[0].tags, vec!["MatrixApp".to_string(), "PO_5544".to_string()]);

        let (_, view) = t.send("GET", &base, None).await;
        assert_eq!(view["summary"]["total_items"], 0);
        assert_eq!(view["details"]["note"], "");

        let (_, orders) = t.send("GET", &format!("{base}/recent-orders"), None).await;
        assert_eq!(orders.as_array().unwrap().len(), 1);
        assert_eq!(orders[0]["customer"], "Walk-in");

        let order_id = orders[0]["id"].clone();
        let (status, body) = t.send("POST", &format!("{base}/recent-orders/load"), Some(json!({"order_id": order_id}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["notice"]["message"], "Loaded 3 items from #D1001");
        assert_eq!(body["summary"]["total_items"], 3);

        let (status, _) = t.send("POST", &format!("{base}/recent-orders/load"), Some(json!({"order_id": "gid://shopify/DraftOrder/1"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rejected_and_oversold_submissions() {
        let t = TestApp::new();
        let base = t.session_with_tee().await;

        t.send("PUT", &format!("{base}/quantities/v-s-red"), Some(json!({"quantity": "1"}))).await;
        t.backend.reject_next("Customer is blocked");
        let (status, body) = t.send("POST", &format!("{base}/orders"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, "Customer is blocked");

        let (_, view) = t.send("GET", &base, None).await;
        assert_eq!(view["summary"]["total_items"], 1);
        assert_eq!(view["submit"], "ready");

        t.send("PUT", &format!("{base}/quantities/v-l-blue"), Some(json!({"quantity": "4"}))).await;
        let (status, _) = t.send("POST", &format!("{base}/orders"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(t.backend.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_details_validation() {
        let t = TestApp::new();
        let base = t.session_with_tee().await;
        let (status, _) = t.send("PUT", &format!("{base}/details"), Some(json!({"po_number": "9".repeat(65)}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = t
            .send("PUT", &format!("{base}/details"), Some(json!({"discount": {"kind": "FIXED_AMOUNT", "value": "-5"}})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_customer_search_and_label() {
        let t = TestApp::new();
        let (_, found) = t.send("GET", "/api/v1/customers?query=a", None).await;
        assert_eq!(found, json!([]));
        let (_, found) = t.send("GET", "/api/v1/customers?query=lov", None).await;
        assert_eq!(found[0]["display_name"], "Ada Lovelace");

        let base = t.session_with_tee().await;
        let (_, view) = t.send("PUT", &format!("{base}/customer"), Some(found[0].clone())).await;
        assert_eq!(view["submit_label"], "Create Order for Ada Lovelace");
        let (_, view) = t.send("DELETE", &format!("{base}/customer"), None).await;
        assert_eq!(view["submit_label"], "Create Draft Order");
    }
}
