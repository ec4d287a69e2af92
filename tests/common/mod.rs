#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use leadboard::domain::error::AppError;
use leadboard::domain::filter::{LeadFilter, ListingQuery};
use leadboard::domain::model::{
    Inbound, LeadAudit, LeadHeader, LeadMessage, LeadSummary, SaleRecord,
};
use leadboard::domain::traits::{LeadStore, WebhookSink, WebhookTarget};
use leadboard::infrastructure::config::Config;
use leadboard::infrastructure::storage::db::{init_in_memory, SqliteLeadStore};
use leadboard::interfaces::http::create_router;
use leadboard::state::AppState;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const ANA: &str = "11111111-1111-1111-1111-111111111111";
pub const BRUNO: &str = "22222222-2222-2222-2222-222222222222";
pub const CARLA: &str = "33333333-3333-3333-3333-333333333333";
pub const UNKNOWN: &str = "99999999-9999-9999-9999-999999999999";

pub const FIXTURE: &str = r#"
INSERT INTO leads (id, name, phone, mail, created_at) VALUES
    ('11111111-1111-1111-1111-111111111111', 'Ana Souza', '61999990001', 'ana@example.com', '2025-03-01T10:00:00.000Z'),
    ('22222222-2222-2222-2222-222222222222', 'Bruno Lima', '61999990002', NULL, '2025-03-05T10:00:00.000Z'),
    ('33333333-3333-3333-3333-333333333333', 'Carla Dias', NULL, NULL, '2025-02-10T08:00:00.000Z'),
    ('44444444-4444-4444-4444-444444444444', 'Davi Rocha', '61999990004', NULL, '2025-01-20T08:00:00.000Z');
INSERT INTO inbounds (id, lead_id, status, pipefy_id, utm_source, utm_medium, created_at, updated_at) VALUES
    ('i1', '11111111-1111-1111-1111-111111111111', 'won', '987', 'meta', 'cpc', '2025-03-01T11:00:00.000Z', '2025-03-01T11:00:00.000Z'),
    ('i2', '11111111-1111-1111-1111-111111111111', NULL, NULL, 'google', 'cpc', '2025-03-02T11:00:00.000Z', '2025-03-02T11:00:00.000Z'),
    ('i3', '22222222-2222-2222-2222-222222222222', 'open', NULL, NULL, NULL, '2025-03-05T11:00:00.000Z', '2025-03-05T11:00:00.000Z'),
    ('i4', '44444444-4444-4444-4444-444444444444', 'won', NULL, 'meta', 'organic', '2025-01-20T09:00:00.000Z', '2025-01-20T09:00:00.000Z');
INSERT INTO sales (id, inbound_id, amount, service_count, description, created_at, updated_at) VALUES
    ('s1', 'i1', 150.5, 1, '[{"Serviço":"Corte","Qtd":"1","Preço":"R$ 150,50"}]', '2025-03-03T12:00:00.000Z', '2025-03-03T12:00:00.000Z'),
    ('s2', 'i1', 49.5, 1, '{"items":[{"name":"Escova","price":49.5}]}', '2025-03-04T12:00:00.000Z', '2025-03-04T12:00:00.000Z'),
    ('s3', 'i4', NULL, NULL, NULL, '2025-01-21T12:00:00.000Z', '2025-01-21T12:00:00.000Z');
INSERT INTO sales_analytics (id, lead_id, qualy_audit, time_audit, created_at, updated_at) VALUES
    ('a1', '33333333-3333-3333-3333-333333333333', '{"score":8}', '{"minutes":12}', '2025-02-11T09:00:00.000Z', '2025-02-11T09:00:00.000Z');
INSERT INTO lead_messages (id, message_id, lead_id, message_type, body, sent_at, author_number, author_role, created_at) VALUES
    ('m1', 'w1', '22222222-2222-2222-2222-222222222222', 'text', 'Oi!', '2025-03-05T12:00:00.000Z', '5561999990002', 'LEAD', '2025-03-05T12:00:00.000Z'),
    ('m2', 'w2', '22222222-2222-2222-2222-222222222222', 'text', 'Olá, Bruno', '2025-03-05T12:01:00.000Z', '5561000000000', 'atendente', '2025-03-05T12:01:00.000Z');
"#;

/// Counts calls before delegating to the wrapped store.
pub struct CountingStore {
    inner: SqliteLeadStore,
    pub calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LeadStore for CountingStore {
    async fn find_leads(&self, query: &ListingQuery) -> Result<Vec<LeadSummary>, AppError> {
        self.hit();
        self.inner.find_leads(query).await
    }

    async fn count_leads(&self, filter: &LeadFilter) -> Result<u64, AppError> {
        self.hit();
        self.inner.count_leads(filter).await
    }

    async fn lead_header(&self, lead_id: &str) -> Result<Option<LeadHeader>, AppError> {
        self.hit();
        self.inner.lead_header(lead_id).await
    }

    async fn lead_inbounds(&self, lead_id: &str) -> Result<Vec<Inbound>, AppError> {
        self.hit();
        self.inner.lead_inbounds(lead_id).await
    }

    async fn lead_messages(&self, lead_id: &str) -> Result<Vec<LeadMessage>, AppError> {
        self.hit();
        self.inner.lead_messages(lead_id).await
    }

    async fn lead_sales(&self, lead_id: &str) -> Result<Vec<SaleRecord>, AppError> {
        self.hit();
        self.inner.lead_sales(lead_id).await
    }

    async fn lead_audits(&self, lead_id: &str) -> Result<Vec<LeadAudit>, AppError> {
        self.hit();
        self.inner.lead_audits(lead_id).await
    }
}

/// Records deliveries and answers with a fixed status.
pub struct RecordingWebhook {
    pub status: u16,
    pub deliveries: Mutex<Vec<(WebhookTarget, Value)>>,
}

impl RecordingWebhook {
    pub fn deliveries(&self) -> Vec<(WebhookTarget, Value)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookSink for RecordingWebhook {
    async fn deliver(&self, target: WebhookTarget, payload: &Value) -> Result<u16, AppError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((target, payload.clone()));
        Ok(self.status)
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<CountingStore>,
    pub webhook: Arc<RecordingWebhook>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_webhook_status(200).await
    }

    pub async fn with_webhook_status(status: u16) -> Self {
        Self::build(status, Config::default()).await
    }

    pub async fn with_cache_ttl_ms(ttl_ms: u64) -> Self {
        let mut config = Config::default();
        config.cache.ttl_ms = ttl_ms;
        Self::build(200, config).await
    }

    async fn build(status: u16, config: Config) -> Self {
        let conn = init_in_memory().await.unwrap();
        conn.call(|c| -> rusqlite::Result<()> { c.execute_batch(FIXTURE) })
            .await
            .unwrap();

        let store = Arc::new(CountingStore {
            inner: SqliteLeadStore::new(conn),
            calls: AtomicUsize::new(0),
        });
        let webhook = Arc::new(RecordingWebhook {
            status,
            deliveries: Mutex::new(Vec::new()),
        });
        let state = AppState::with_parts(store.clone(), webhook.clone(), config);

        Self {
            router: create_router(state),
            store,
            webhook,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
