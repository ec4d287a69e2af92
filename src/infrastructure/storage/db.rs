use crate::domain::error::AppError;
use crate::domain::filter::{LeadFilter, ListingQuery};
use crate::domain::model::{
    format_timestamp, iso_timestamp, pipefy_url, AuthorRole, Inbound, LeadAudit, LeadHeader, LeadMessage,
    LeadSummary, MessageAuthor, SaleInboundSummary, SaleRecord,
};
use crate::domain::traits::LeadStore;
use async_trait::async_trait;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use serde_json::Value;
use std::path::Path;
use tokio_rusqlite::Connection;

/// Every table the dashboard reads, parents before children.
pub const TABLES: &[&str] = &[
    "leads",
    "inbounds",
    "sales",
    "sales_analytics",
    "lead_messages",
];

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS leads (
    id TEXT PRIMARY KEY,
    name TEXT,
    phone TEXT,
    mail TEXT,
    instagram TEXT,
    remote_jid TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS inbounds (
    id TEXT PRIMARY KEY,
    lead_id TEXT REFERENCES leads(id),
    status TEXT,
    pipefy_id TEXT,
    gclid TEXT,
    fbclid TEXT,
    ctwaclid TEXT,
    utm_source TEXT,
    utm_medium TEXT,
    utm_campaign TEXT,
    utm_term TEXT,
    utm_content TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS sales (
    id TEXT PRIMARY KEY,
    inbound_id TEXT REFERENCES inbounds(id),
    fbtrace_id TEXT,
    description TEXT,
    service_count INTEGER,
    amount NUMERIC,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS sales_analytics (
    id TEXT PRIMARY KEY,
    lead_id TEXT REFERENCES leads(id),
    qualy_audit TEXT,
    time_audit TEXT,
    conversation TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS lead_messages (
    id TEXT PRIMARY KEY,
    message_id TEXT,
    lead_id TEXT REFERENCES leads(id),
    message_type TEXT,
    body TEXT,
    raw_payload TEXT,
    sent_at TEXT,
    author_number TEXT,
    author_role TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_leads_created ON leads(created_at);
CREATE INDEX IF NOT EXISTS idx_inbounds_lead ON inbounds(lead_id);
CREATE INDEX IF NOT EXISTS idx_sales_inbound ON sales(inbound_id);
CREATE INDEX IF NOT EXISTS idx_sales_analytics_lead ON sales_analytics(lead_id);
CREATE INDEX IF NOT EXISTS idx_lead_messages_lead ON lead_messages(lead_id);
";

pub async fn init_database(db_path: &Path) -> Result<Connection, AppError> {
    let db = Connection::open(db_path.to_path_buf()).await?;
    apply_schema(&db).await?;
    Ok(db)
}

/// Fresh schema in memory; used by tests and dry runs.
pub async fn init_in_memory() -> Result<Connection, AppError> {
    let db = Connection::open_in_memory().await?;
    apply_schema(&db).await?;
    Ok(db)
}

/// `fold(x)`: Unicode lowercase of a text value, for case-insensitive `LIKE`.
/// SQLite's own `LIKE` only folds ASCII.
fn register_fold(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let folded = match ctx.get_raw(0) {
                ValueRef::Null | ValueRef::Blob(_) => None,
                ValueRef::Integer(i) => Some(i.to_string()),
                ValueRef::Real(f) => Some(f.to_string()),
                ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).to_lowercase()),
            };
            Ok(folded)
        },
    )
}

async fn apply_schema(db: &Connection) -> Result<(), AppError> {
    db.call(|conn| -> rusqlite::Result<()> {
        register_fold(conn)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)
    })
    .await?;
    Ok(())
}

/// Row count per table in `TABLES` order.
pub async fn table_counts(db: &Connection) -> Result<Vec<(String, i64)>, AppError> {
    let counts = db
        .call(|conn| -> rusqlite::Result<Vec<(String, i64)>> {
            TABLES
                .iter()
                .map(|table| {
                    let count: i64 =
                        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                            row.get(0)
                        })?;
                    Ok((table.to_string(), count))
                })
                .collect()
        })
        .await?;
    Ok(counts)
}

const HAS_INBOUND: &str = "EXISTS (SELECT 1 FROM inbounds i WHERE i.lead_id = l.id)";
const HAS_SALES: &str = "EXISTS (SELECT 1 FROM inbounds i JOIN sales s ON s.inbound_id = i.id \
                         WHERE i.lead_id = l.id)";
const HAS_AUDIT: &str = "EXISTS (SELECT 1 FROM sales_analytics a WHERE a.lead_id = l.id)";
const HAS_MESSAGES: &str = "EXISTS (SELECT 1 FROM lead_messages m WHERE m.lead_id = l.id)";

const SEARCH_COLUMNS: &[&str] = &["l.name", "l.phone", "l.mail", "l.instagram", "l.remote_jid"];

fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn existence(clause: &str, wanted: bool) -> String {
    if wanted {
        clause.to_string()
    } else {
        format!("NOT {clause}")
    }
}

/// Translates the resolved filter into a `WHERE` clause over `leads l`.
/// Returns an empty clause when nothing is filtered.
pub fn where_clause(filter: &LeadFilter) -> (String, Vec<SqlValue>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(search) = &filter.search {
        let pattern = like_pattern(&search.text);
        let mut ors: Vec<String> = SEARCH_COLUMNS
            .iter()
            .map(|column| {
                values.push(SqlValue::Text(pattern.clone()));
                format!("fold({column}) LIKE fold(?) ESCAPE '\\'")
            })
            .collect();
        if search.match_id {
            ors.push("l.id = ?".to_string());
            values.push(SqlValue::Text(search.text.clone()));
        }
        conditions.push(format!("({})", ors.join(" OR ")));
    }

    if let Some(bounds) = &filter.created {
        conditions.push("julianday(l.created_at) BETWEEN julianday(?) AND julianday(?)".to_string());
        values.push(SqlValue::Text(format_timestamp(bounds.gte)));
        values.push(SqlValue::Text(format_timestamp(bounds.lte)));
    }

    for (flag, clause) in [
        (filter.has_inbound, HAS_INBOUND),
        (filter.has_sales, HAS_SALES),
        (filter.has_messages, HAS_MESSAGES),
        (filter.has_audit, HAS_AUDIT),
    ] {
        if let Some(wanted) = flag {
            conditions.push(existence(clause, wanted));
        }
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), values)
    }
}

fn text_or_json(value: ValueRef<'_>) -> Option<Value> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(Value::from(i)),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map(Value::Number),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            Some(serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.into_owned())))
        }
    }
}

fn numeric(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

fn only_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    let raw: String = row.get(idx)?;
    Ok(iso_timestamp(&raw))
}

fn optional_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw.as_deref().map(iso_timestamp))
}

/// SQLite-backed `LeadStore`
pub struct SqliteLeadStore {
    conn: Connection,
}

impl SqliteLeadStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl LeadStore for SqliteLeadStore {
    async fn find_leads(&self, query: &ListingQuery) -> Result<Vec<LeadSummary>, AppError> {
        let (clause, mut values) = where_clause(&query.filter);
        values.push(SqlValue::Integer(i64::from(query.page_size)));
        values.push(SqlValue::Integer(query.offset() as i64));

        let sql = format!(
            "SELECT l.id, l.name, l.phone, l.mail, l.instagram, l.remote_jid, l.created_at,
                    {HAS_INBOUND}, {HAS_SALES}, {HAS_AUDIT}, {HAS_MESSAGES}
             FROM leads l
             {clause}
             ORDER BY julianday(l.created_at) DESC, l.id
             LIMIT ? OFFSET ?"
        );

        let leads = self
            .conn
            .call(move |conn| -> rusqlite::Result<Vec<LeadSummary>> {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(values), |row| {
                    Ok(LeadSummary {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        phone: row.get(2)?,
                        mail: row.get(3)?,
                        instagram: row.get(4)?,
                        remote_jid: row.get(5)?,
                        created_at: timestamp(row, 6)?,
                        has_inbound: row.get(7)?,
                        has_sales: row.get(8)?,
                        has_audit: row.get(9)?,
                        has_messages: row.get(10)?,
                    })
                })?;
                rows.collect()
            })
            .await?;

        Ok(leads)
    }

    async fn count_leads(&self, filter: &LeadFilter) -> Result<u64, AppError> {
        let (clause, values) = where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM leads l {clause}");

        let total = self
            .conn
            .call(move |conn| -> rusqlite::Result<i64> {
                conn.query_row(&sql, params_from_iter(values), |row| row.get(0))
            })
            .await?;

        Ok(total.max(0) as u64)
    }

    async fn lead_header(&self, lead_id: &str) -> Result<Option<LeadHeader>, AppError> {
        let lead_id = lead_id.to_string();
        let header = self
            .conn
            .call(move |conn| -> rusqlite::Result<Option<LeadHeader>> {
                conn.query_row(
                    "SELECT id, name, phone, created_at FROM leads WHERE id = ?",
                    params![lead_id],
                    |row| {
                        Ok(LeadHeader {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            phone: row.get(2)?,
                            created_at: timestamp(row, 3)?,
                        })
                    },
                )
                .optional()
            })
            .await?;

        Ok(header)
    }

    async fn lead_inbounds(&self, lead_id: &str) -> Result<Vec<Inbound>, AppError> {
        let lead_id = lead_id.to_string();
        let inbounds = self
            .conn
            .call(move |conn| -> rusqlite::Result<Vec<Inbound>> {
                let mut stmt = conn.prepare(
                    "SELECT id, status, pipefy_id, gclid, fbclid, ctwaclid, utm_source,
                            utm_medium, utm_campaign, utm_term, utm_content, created_at, updated_at
                     FROM inbounds
                     WHERE lead_id = ?
                     ORDER BY julianday(created_at) DESC, id",
                )?;
                let rows = stmt.query_map(params![lead_id], |row| {
                    let pipefy_id: Option<String> = row.get(2)?;
                    Ok(Inbound {
                        id: row.get(0)?,
                        status: row.get(1)?,
                        pipefy_url: pipefy_url(pipefy_id.as_deref()),
                        pipefy_id,
                        gclid: row.get(3)?,
                        fbclid: row.get(4)?,
                        ctwaclid: row.get(5)?,
                        utm_source: row.get(6)?,
                        utm_medium: row.get(7)?,
                        utm_campaign: row.get(8)?,
                        utm_term: row.get(9)?,
                        utm_content: row.get(10)?,
                        created_at: timestamp(row, 11)?,
                        updated_at: timestamp(row, 12)?,
                    })
                })?;
                rows.collect()
            })
            .await?;

        Ok(inbounds)
    }

    async fn lead_messages(&self, lead_id: &str) -> Result<Vec<LeadMessage>, AppError> {
        let lead_id = lead_id.to_string();
        let messages = self
            .conn
            .call(move |conn| -> rusqlite::Result<Vec<LeadMessage>> {
                // Unsent messages sort after sent ones
                let mut stmt = conn.prepare(
                    "SELECT id, message_id, lead_id, message_type, body, raw_payload, sent_at,
                            author_number, author_role
                     FROM lead_messages
                     WHERE lead_id = ?
                     ORDER BY sent_at IS NULL, julianday(sent_at), julianday(created_at), id",
                )?;
                let rows = stmt.query_map(params![lead_id], |row| {
                    let role: Option<String> = row.get(8)?;
                    Ok(LeadMessage {
                        id: row.get(0)?,
                        message_id: row.get(1)?,
                        lead_id: row.get(2)?,
                        message_type: row.get(3)?,
                        body: only_text(row.get_ref(4)?),
                        raw_payload: text_or_json(row.get_ref(5)?),
                        sent_at: optional_timestamp(row, 6)?,
                        author: MessageAuthor {
                            number: row.get(7)?,
                            role: AuthorRole::normalize(role.as_deref()),
                        },
                    })
                })?;
                rows.collect()
            })
            .await?;

        Ok(messages)
    }

    async fn lead_sales(&self, lead_id: &str) -> Result<Vec<SaleRecord>, AppError> {
        let lead_id = lead_id.to_string();
        let sales = self
            .conn
            .call(move |conn| -> rusqlite::Result<Vec<SaleRecord>> {
                let mut stmt = conn.prepare(
                    "SELECT s.id, s.amount, s.service_count, s.fbtrace_id, s.description,
                            s.created_at, s.updated_at,
                            i.id, i.pipefy_id, i.status, i.utm_source, i.utm_medium,
                            i.utm_campaign, i.created_at
                     FROM sales s
                     JOIN inbounds i ON i.id = s.inbound_id
                     WHERE i.lead_id = ?
                     ORDER BY julianday(s.created_at) DESC, s.id",
                )?;
                let rows = stmt.query_map(params![lead_id], |row| {
                    let inbound_pipefy: Option<String> = row.get(8)?;
                    Ok(SaleRecord {
                        id: row.get(0)?,
                        amount: numeric(row.get_ref(1)?),
                        service_count: row.get(2)?,
                        fbtrace_id: row.get(3)?,
                        description: text_or_json(row.get_ref(4)?),
                        created_at: timestamp(row, 5)?,
                        updated_at: timestamp(row, 6)?,
                        inbound: Some(SaleInboundSummary {
                            id: row.get(7)?,
                            pipefy_url: pipefy_url(inbound_pipefy.as_deref()),
                            pipefy_id: inbound_pipefy,
                            status: row.get(9)?,
                            utm_source: row.get(10)?,
                            utm_medium: row.get(11)?,
                            utm_campaign: row.get(12)?,
                            created_at: timestamp(row, 13)?,
                        }),
                    })
                })?;
                rows.collect()
            })
            .await?;

        Ok(sales)
    }

    async fn lead_audits(&self, lead_id: &str) -> Result<Vec<LeadAudit>, AppError> {
        let lead_id = lead_id.to_string();
        let audits = self
            .conn
            .call(move |conn| -> rusqlite::Result<Vec<LeadAudit>> {
                let mut stmt = conn.prepare(
                    "SELECT id, lead_id, qualy_audit, time_audit, created_at, updated_at
                     FROM sales_analytics
                     WHERE lead_id = ?
                     ORDER BY julianday(created_at), id",
                )?;
                let rows = stmt.query_map(params![lead_id], |row| {
                    let owner: Option<String> = row.get(1)?;
                    Ok(LeadAudit {
                        id: row.get(0)?,
                        lead_id: owner.unwrap_or_default(),
                        qualy_audit: text_or_json(row.get_ref(2)?),
                        time_audit: text_or_json(row.get_ref(3)?),
                        created_at: timestamp(row, 4)?,
                        updated_at: timestamp(row, 5)?,
                    })
                })?;
                rows.collect()
            })
            .await?;

        Ok(audits)
    }
}
