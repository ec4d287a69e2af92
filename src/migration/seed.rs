//! One-time load of the production SQL dumps into the local database.

use crate::domain::error::AppError;
use crate::domain::model::{format_timestamp, parse_timestamp};
use crate::infrastructure::storage::db::table_counts;
use rusqlite::params;
use std::path::{Path, PathBuf};
use tokio_rusqlite::Connection;
use tracing::{info, warn};

/// Dump files in load order, parents first.
pub const DUMPS: &[SeedDump] = &[
    SeedDump::required("leads", "leads_rows_sql.sql"),
    SeedDump::required("inbounds", "inbounds_rows.sql"),
    SeedDump::required("sales", "sales_rows.sql"),
    SeedDump::optional("sales_analytics", "sales_analytics_rows.sql"),
    SeedDump::optional("lead_messages", "lead_messages_rows.sql"),
];

const CLEAR_ORDER: &[&str] = &[
    "lead_messages",
    "sales_analytics",
    "sales",
    "inbounds",
    "leads",
];

const TIMESTAMP_COLUMNS: &[(&str, &str)] = &[
    ("leads", "created_at"),
    ("inbounds", "created_at"),
    ("inbounds", "updated_at"),
    ("sales", "created_at"),
    ("sales", "updated_at"),
    ("sales_analytics", "created_at"),
    ("sales_analytics", "updated_at"),
    ("lead_messages", "sent_at"),
    ("lead_messages", "created_at"),
];

#[derive(Debug, Clone, Copy)]
pub struct SeedDump {
    pub table: &'static str,
    pub file: &'static str,
    pub required: bool,
}

impl SeedDump {
    const fn required(table: &'static str, file: &'static str) -> Self {
        Self {
            table,
            file,
            required: true,
        }
    }

    const fn optional(table: &'static str, file: &'static str) -> Self {
        Self {
            table,
            file,
            required: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub loaded: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
    pub counts: Vec<(String, i64)>,
    pub normalized_timestamps: usize,
    pub unparsed_timestamps: usize,
}

#[derive(Debug, Default)]
struct LoadOutcome {
    normalized: usize,
    unparsed: usize,
    violations: Vec<String>,
}

/// Dumps come from Postgres and qualify tables with the `public` schema,
/// which SQLite would read as an attached database.
/// Only the target of `INSERT INTO` is rewritten; quoted values are copied
/// through untouched.
fn adapt_dump(sql: &str) -> String {
    const QUALIFIED: [&str; 2] = ["INSERT INTO \"public\".", "INSERT INTO public."];

    let mut out = String::with_capacity(sql.len());
    let mut in_literal = false;
    let mut rest = sql;
    while let Some(c) = rest.chars().next() {
        if !in_literal {
            if let Some(prefix) = QUALIFIED.iter().find(|p| rest.starts_with(**p)) {
                out.push_str("INSERT INTO ");
                rest = &rest[prefix.len()..];
                continue;
            }
        }
        if c == '\'' {
            in_literal = !in_literal;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

async fn read_dumps(dir: &Path) -> Result<Vec<(SeedDump, String)>, AppError> {
    let mut scripts = Vec::new();
    for dump in DUMPS {
        let path: PathBuf = dir.join(dump.file);
        match tokio::fs::read_to_string(&path).await {
            Ok(sql) => scripts.push((*dump, adapt_dump(&sql))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !dump.required => {
                println!("{} not found, skipping {}.", dump.file, dump.table);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::Seed(format!(
                    "required dump {} is missing",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(scripts)
}

/// Replaces the contents of every lead table with the dumps found in `dir`.
///
/// Runs as a single transaction: a missing required dump, a failing
/// statement or a dangling foreign key leaves the database untouched.
pub async fn seed_database(db: &Connection, dir: &Path) -> Result<SeedReport, AppError> {
    println!("Reading dumps from {}...", dir.display());
    let scripts = read_dumps(dir).await?;

    let mut report = SeedReport::default();
    for dump in DUMPS {
        if scripts.iter().any(|(loaded, _)| loaded.file == dump.file) {
            report.loaded.push(dump.table);
        } else {
            report.skipped.push(dump.table);
        }
    }

    println!("Loading {} dump(s)...", scripts.len());
    let outcome = db
        .call(move |conn| -> rusqlite::Result<LoadOutcome> {
            let tx = conn.transaction()?;
            tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;

            for table in CLEAR_ORDER {
                tx.execute(&format!("DELETE FROM {table}"), [])?;
            }
            for (dump, sql) in &scripts {
                tracing::debug!(file = dump.file, "executing dump");
                tx.execute_batch(sql)?;
            }

            let mut outcome = normalize_timestamps(&tx)?;
            outcome.violations = foreign_key_violations(&tx)?;
            if outcome.violations.is_empty() {
                tx.commit()?;
            }
            Ok(outcome)
        })
        .await
        .map_err(|e| AppError::Seed(format!("loading dumps failed: {e}")))?;

    if !outcome.violations.is_empty() {
        return Err(AppError::Seed(format!(
            "{} foreign key violation(s): {}",
            outcome.violations.len(),
            outcome.violations.join(", ")
        )));
    }

    report.normalized_timestamps = outcome.normalized;
    report.unparsed_timestamps = outcome.unparsed;
    if outcome.unparsed > 0 {
        warn!(count = outcome.unparsed, "timestamps left as-is, unable to parse");
    }

    report.counts = table_counts(db).await?;
    for (table, count) in &report.counts {
        println!("  {table}: {count} rows");
    }
    info!(normalized = report.normalized_timestamps, "seed complete");
    Ok(report)
}

/// Rewrites every parseable timestamp into `YYYY-MM-DDTHH:MM:SS.sssZ` so
/// that SQLite date functions and text ordering agree.
fn normalize_timestamps(tx: &rusqlite::Transaction<'_>) -> rusqlite::Result<LoadOutcome> {
    let mut outcome = LoadOutcome::default();

    for (table, column) in TIMESTAMP_COLUMNS {
        let rows: Vec<(i64, String)> = {
            let mut stmt = tx.prepare(&format!(
                "SELECT rowid, {column} FROM {table} WHERE {column} IS NOT NULL"
            ))?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let mut update = tx.prepare(&format!("UPDATE {table} SET {column} = ? WHERE rowid = ?"))?;
        for (rowid, raw) in rows {
            match parse_timestamp(&raw).map(format_timestamp) {
                Some(canonical) if canonical != raw => {
                    update.execute(params![canonical, rowid])?;
                    outcome.normalized += 1;
                }
                Some(_) => {}
                None => outcome.unparsed += 1,
            }
        }
    }

    Ok(outcome)
}

fn foreign_key_violations(tx: &rusqlite::Transaction<'_>) -> rusqlite::Result<Vec<String>> {
    let mut stmt = tx.prepare("PRAGMA foreign_key_check")?;
    let rows = stmt.query_map([], |row| {
        let table: String = row.get(0)?;
        let rowid: Option<i64> = row.get(1)?;
        let parent: String = row.get(2)?;
        Ok(format!(
            "{table} row {} -> {parent}",
            rowid.map_or_else(|| "?".to_string(), |id| id.to_string())
        ))
    })?;
    rows.collect()
}
