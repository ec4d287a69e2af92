use crate::domain::error::AppError;
use crate::domain::filter::{LeadFilter, ListingQuery};
use crate::domain::model::{Inbound, LeadAudit, LeadHeader, LeadMessage, LeadSummary, SaleRecord};
use async_trait::async_trait;
use serde_json::Value;

/// Read access to the lead tables.
///
/// The SQLite implementation lives in `infrastructure::storage::db`; tests
/// wrap it to count calls.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// One page of leads matching the query, newest first
    async fn find_leads(&self, query: &ListingQuery) -> Result<Vec<LeadSummary>, AppError>;

    /// Number of leads matching the filter, ignoring pagination
    async fn count_leads(&self, filter: &LeadFilter) -> Result<u64, AppError>;

    async fn lead_header(&self, lead_id: &str) -> Result<Option<LeadHeader>, AppError>;

    async fn lead_inbounds(&self, lead_id: &str) -> Result<Vec<Inbound>, AppError>;

    async fn lead_messages(&self, lead_id: &str) -> Result<Vec<LeadMessage>, AppError>;

    async fn lead_sales(&self, lead_id: &str) -> Result<Vec<SaleRecord>, AppError>;

    async fn lead_audits(&self, lead_id: &str) -> Result<Vec<LeadAudit>, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookTarget {
    Contact,
    NewLead,
}

/// Outbound form forwarding.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    /// Posts `payload` as JSON and returns the upstream status code.
    async fn deliver(&self, target: WebhookTarget, payload: &Value) -> Result<u16, AppError>;
}
