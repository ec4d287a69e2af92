use crate::domain::error::AppError;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const PIPEFY_CARD_URL: &str = "https://app.pipefy.com/open-cards/";

// Listing item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadSummary {
    pub id: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub mail: Option<String>,
    pub instagram: Option<String>,
    pub remote_jid: Option<String>,
    pub created_at: String,
    #[serde(rename = "hasInbound")]
    pub has_inbound: bool,
    #[serde(rename = "hasSales")]
    pub has_sales: bool,
    #[serde(rename = "hasAudit")]
    pub has_audit: bool,
    #[serde(rename = "hasMessages")]
    pub has_messages: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadListPage {
    pub items: Vec<LeadSummary>,
    pub total: u64,
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
}

// Header shared by every per-lead payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadHeader {
    pub id: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inbound {
    pub id: String,
    pub status: Option<String>,
    pub pipefy_id: Option<String>,
    pub gclid: Option<String>,
    pub fbclid: Option<String>,
    pub ctwaclid: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub pipefy_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundStatusCount {
    pub status: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundChannelCount {
    pub source: Option<String>,
    pub medium: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundTotals {
    pub inbounds: u64,
    #[serde(rename = "byStatus")]
    pub by_status: Vec<InboundStatusCount>,
    #[serde(rename = "byChannel")]
    pub by_channel: Vec<InboundChannelCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadInboundsResponse {
    pub lead: LeadHeader,
    pub totals: InboundTotals,
    pub inbounds: Vec<Inbound>,
}

// Message author role; anything unknown is reported as `team`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthorRole {
    Lead,
    #[default]
    Team,
    Bot,
}

impl AuthorRole {
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(str::to_lowercase).as_deref() {
            Some("lead") => Self::Lead,
            Some("bot") => Self::Bot,
            _ => Self::Team,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageAuthor {
    pub number: Option<String>,
    pub role: AuthorRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadMessage {
    pub id: String,
    pub message_id: Option<String>,
    pub lead_id: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
    pub body: Option<String>,
    pub raw_payload: Option<Value>,
    pub sent_at: Option<String>,
    pub author: MessageAuthor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadMessagesResponse {
    pub lead: LeadHeader,
    pub messages: Vec<LeadMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleService {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleInboundSummary {
    pub id: String,
    pub pipefy_id: Option<String>,
    pub pipefy_url: Option<String>,
    pub status: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub created_at: String,
}

/// Sale as stored, before the description is reshaped.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    pub id: String,
    pub amount: Option<f64>,
    pub service_count: Option<i64>,
    pub fbtrace_id: Option<String>,
    pub description: Option<Value>,
    pub created_at: String,
    pub updated_at: String,
    pub inbound: Option<SaleInboundSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadSale {
    pub id: String,
    pub amount: Option<f64>,
    pub service_count: Option<i64>,
    pub fbtrace_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub services: Vec<SaleService>,
    pub raw_description: Option<Value>,
    pub inbound: Option<SaleInboundSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesTotals {
    pub sales: u64,
    #[serde(rename = "totalAmount")]
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadSalesResponse {
    pub lead: LeadHeader,
    pub totals: SalesTotals,
    pub sales: Vec<LeadSale>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadAudit {
    pub id: String,
    pub lead_id: String,
    pub qualy_audit: Option<Value>,
    pub time_audit: Option<Value>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadAuditResponse {
    pub lead: LeadHeader,
    pub audits: Vec<LeadAudit>,
}

pub fn pipefy_url(pipefy_id: Option<&str>) -> Option<String> {
    pipefy_id
        .filter(|id| !id.is_empty())
        .map(|id| format!("{PIPEFY_CARD_URL}{id}"))
}

/// Lenient timestamp parse covering RFC 3339 and SQL dump forms such as
/// `2024-05-01 12:00:00.123+00`. Zone-less values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Canonical wire and storage form: `2024-05-01T12:00:00.000Z`.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Re-renders a stored timestamp canonically; unparseable input is kept.
pub fn iso_timestamp(raw: &str) -> String {
    parse_timestamp(raw)
        .map(format_timestamp)
        .unwrap_or_else(|| raw.to_string())
}

/// Response payloads are checked before they leave the process.
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

fn check(condition: bool, message: impl FnOnce() -> String) -> Result<(), AppError> {
    if condition {
        Ok(())
    } else {
        Err(AppError::Schema(message()))
    }
}

fn check_timestamp(field: &str, value: &str) -> Result<(), AppError> {
    check(parse_timestamp(value).is_some(), || {
        format!("{field} is not a timestamp: {value:?}")
    })
}

fn check_url(field: &str, value: Option<&str>) -> Result<(), AppError> {
    match value {
        Some(url) => check(
            url.starts_with("https://") && url.len() > "https://".len(),
            || format!("{field} is not an absolute URL: {url:?}"),
        ),
        None => Ok(()),
    }
}

impl Validate for LeadHeader {
    fn validate(&self) -> Result<(), AppError> {
        check(!self.id.is_empty(), || "lead.id is empty".to_string())?;
        check_timestamp("lead.created_at", &self.created_at)
    }
}

impl Validate for LeadListPage {
    fn validate(&self) -> Result<(), AppError> {
        check(self.page >= 1, || "page must be positive".to_string())?;
        check(self.page_size >= 1, || "pageSize must be positive".to_string())?;
        check(self.items.len() <= self.page_size as usize, || {
            format!("{} items exceed pageSize {}", self.items.len(), self.page_size)
        })?;
        for item in &self.items {
            check(!item.id.is_empty(), || "item.id is empty".to_string())?;
            check_timestamp("item.created_at", &item.created_at)?;
        }
        Ok(())
    }
}

impl Validate for LeadInboundsResponse {
    fn validate(&self) -> Result<(), AppError> {
        self.lead.validate()?;
        let count = self.inbounds.len() as u64;
        check(self.totals.inbounds == count, || {
            format!("totals.inbounds {} != {count}", self.totals.inbounds)
        })?;
        let by_status: u64 = self.totals.by_status.iter().map(|s| s.count).sum();
        check(by_status == count, || {
            format!("byStatus sums to {by_status}, expected {count}")
        })?;
        let by_channel: u64 = self.totals.by_channel.iter().map(|c| c.count).sum();
        check(by_channel == count, || {
            format!("byChannel sums to {by_channel}, expected {count}")
        })?;
        for inbound in &self.inbounds {
            check_timestamp("inbound.created_at", &inbound.created_at)?;
            check_timestamp("inbound.updated_at", &inbound.updated_at)?;
            check_url("inbound.pipefy_url", inbound.pipefy_url.as_deref())?;
        }
        Ok(())
    }
}

impl Validate for LeadMessagesResponse {
    fn validate(&self) -> Result<(), AppError> {
        self.lead.validate()?;
        for message in &self.messages {
            check(!message.id.is_empty(), || "message.id is empty".to_string())?;
            if let Some(sent_at) = &message.sent_at {
                check_timestamp("message.sent_at", sent_at)?;
            }
        }
        Ok(())
    }
}

impl Validate for LeadSalesResponse {
    fn validate(&self) -> Result<(), AppError> {
        self.lead.validate()?;
        let count = self.sales.len() as u64;
        check(self.totals.sales == count, || {
            format!("totals.sales {} != {count}", self.totals.sales)
        })?;
        check(self.totals.total_amount.is_finite(), || {
            "totals.totalAmount is not finite".to_string()
        })?;
        for sale in &self.sales {
            check(sale.amount.map_or(true, f64::is_finite), || {
                format!("sale {} amount is not finite", sale.id)
            })?;
            check_timestamp("sale.created_at", &sale.created_at)?;
            if let Some(inbound) = &sale.inbound {
                check_url("sale.inbound.pipefy_url", inbound.pipefy_url.as_deref())?;
            }
        }
        Ok(())
    }
}

impl Validate for LeadAuditResponse {
    fn validate(&self) -> Result<(), AppError> {
        self.lead.validate()?;
        for audit in &self.audits {
            check(audit.lead_id == self.lead.id, || {
                format!("audit {} belongs to another lead", audit.id)
            })?;
            check_timestamp("audit.created_at", &audit.created_at)?;
        }
        Ok(())
    }
}
