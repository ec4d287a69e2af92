//! Per-lead sub-resources shown in the dashboard drawer.

use crate::domain::error::AppError;
use crate::domain::model::{
    Inbound, InboundChannelCount, InboundStatusCount, InboundTotals, LeadAuditResponse,
    LeadHeader, LeadInboundsResponse, LeadMessagesResponse, LeadSale, LeadSalesResponse,
    SaleRecord, SalesTotals, Validate,
};
use crate::domain::services::normalize_services;
use crate::state::AppState;
use tracing::debug;
use uuid::Uuid;

/// Canonical (lowercase, hyphenated) form of a lead id, or `InvalidId`.
pub fn parse_lead_id(raw: &str) -> Result<String, AppError> {
    Uuid::parse_str(raw.trim())
        .map(|id| id.hyphenated().to_string())
        .map_err(|_| AppError::InvalidId(raw.to_string()))
}

async fn load_header(state: &AppState, raw_id: &str) -> Result<LeadHeader, AppError> {
    let lead_id = parse_lead_id(raw_id)?;
    state
        .store
        .lead_header(&lead_id)
        .await?
        .ok_or(AppError::NotFound(lead_id))
}

pub async fn lead_inbounds(state: &AppState, raw_id: &str) -> Result<LeadInboundsResponse, AppError> {
    let lead = load_header(state, raw_id).await?;
    let inbounds = state.store.lead_inbounds(&lead.id).await?;
    debug!(lead_id = %lead.id, count = inbounds.len(), "loaded inbounds");

    let payload = LeadInboundsResponse {
        totals: inbound_totals(&inbounds),
        lead,
        inbounds,
    };
    payload.validate()?;
    Ok(payload)
}

/// Counts grouped by status and by (source, medium), each in first-seen order.
pub fn inbound_totals(inbounds: &[Inbound]) -> InboundTotals {
    let mut by_status: Vec<InboundStatusCount> = Vec::new();
    let mut by_channel: Vec<InboundChannelCount> = Vec::new();

    for inbound in inbounds {
        match by_status.iter_mut().find(|s| s.status == inbound.status) {
            Some(entry) => entry.count += 1,
            None => by_status.push(InboundStatusCount {
                status: inbound.status.clone(),
                count: 1,
            }),
        }

        let source = inbound.utm_source.as_deref().unwrap_or("");
        let medium = inbound.utm_medium.as_deref().unwrap_or("");
        match by_channel.iter_mut().find(|c| {
            c.source.as_deref().unwrap_or("") == source
                && c.medium.as_deref().unwrap_or("") == medium
        }) {
            Some(entry) => entry.count += 1,
            None => by_channel.push(InboundChannelCount {
                source: inbound.utm_source.clone(),
                medium: inbound.utm_medium.clone(),
                count: 1,
            }),
        }
    }

    InboundTotals {
        inbounds: inbounds.len() as u64,
        by_status,
        by_channel,
    }
}

pub async fn lead_messages(state: &AppState, raw_id: &str) -> Result<LeadMessagesResponse, AppError> {
    let lead = load_header(state, raw_id).await?;
    let messages = state.store.lead_messages(&lead.id).await?;

    let payload = LeadMessagesResponse { lead, messages };
    payload.validate()?;
    Ok(payload)
}

pub async fn lead_sales(state: &AppState, raw_id: &str) -> Result<LeadSalesResponse, AppError> {
    let lead = load_header(state, raw_id).await?;
    let sales: Vec<LeadSale> = state
        .store
        .lead_sales(&lead.id)
        .await?
        .into_iter()
        .map(reshape_sale)
        .collect();

    let total_amount = sales.iter().filter_map(|s| s.amount).sum();
    let payload = LeadSalesResponse {
        lead,
        totals: SalesTotals {
            sales: sales.len() as u64,
            total_amount,
        },
        sales,
    };
    payload.validate()?;
    Ok(payload)
}

fn reshape_sale(record: SaleRecord) -> LeadSale {
    LeadSale {
        services: normalize_services(record.description.as_ref()),
        id: record.id,
        amount: record.amount,
        service_count: record.service_count,
        fbtrace_id: record.fbtrace_id,
        created_at: record.created_at,
        updated_at: record.updated_at,
        raw_description: record.description,
        inbound: record.inbound,
    }
}

pub async fn lead_audits(state: &AppState, raw_id: &str) -> Result<LeadAuditResponse, AppError> {
    let lead = load_header(state, raw_id).await?;
    let audits = state.store.lead_audits(&lead.id).await?;

    let payload = LeadAuditResponse { lead, audits };
    payload.validate()?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn inbound(status: Option<&str>, source: Option<&str>, medium: Option<&str>) -> Inbound {
        Inbound {
            id: "i".into(),
            status: status.map(Into::into),
            pipefy_id: None,
            gclid: None,
            fbclid: None,
            ctwaclid: None,
            utm_source: source.map(Into::into),
            utm_medium: medium.map(Into::into),
            utm_campaign: None,
            utm_term: None,
            utm_content: None,
            created_at: "2025-03-01T10:00:00.000Z".into(),
            updated_at: "2025-03-01T10:00:00.000Z".into(),
            pipefy_url: None,
        }
    }

    #[rstest]
    #[case("3F1C2A9E-8B7D-4C6E-9F00-123456789ABC", "3f1c2a9e-8b7d-4c6e-9f00-123456789abc")]
    #[case(" 3f1c2a9e-8b7d-4c6e-9f00-123456789abc ", "3f1c2a9e-8b7d-4c6e-9f00-123456789abc")]
    fn lead_ids_are_canonicalized(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(parse_lead_id(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("not-a-uuid")]
    #[case("3f1c2a9e-8b7d-4c6e-9f00-123456789abz")]
    fn malformed_ids_are_rejected(#[case] raw: &str) {
        assert!(matches!(parse_lead_id(raw), Err(AppError::InvalidId(_))));
    }

    #[test]
    fn totals_group_in_first_seen_order() {
        let inbounds = vec![
            inbound(Some("open"), Some("meta"), Some("cpc")),
            inbound(None, Some("google"), Some("cpc")),
            inbound(Some("open"), Some("meta"), Some("cpc")),
            inbound(None, None, None),
        ];
        let totals = inbound_totals(&inbounds);

        assert_eq!(totals.inbounds, 4);
        let statuses: Vec<_> = totals
            .by_status
            .iter()
            .map(|s| (s.status.as_deref(), s.count))
            .collect();
        assert_eq!(statuses, vec![(Some("open"), 2), (None, 2)]);

        let channels: Vec<_> = totals
            .by_channel
            .iter()
            .map(|c| (c.source.as_deref(), c.count))
            .collect();
        assert_eq!(channels, vec![(Some("meta"), 2), (Some("google"), 1), (None, 1)]);
    }

    #[test]
    fn missing_and_blank_channels_are_one_group() {
        let inbounds = vec![
            inbound(None, None, Some("cpc")),
            inbound(None, Some(""), Some("cpc")),
            inbound(None, Some(""), None),
            inbound(None, None, Some("")),
        ];
        let channels: Vec<_> = inbound_totals(&inbounds)
            .by_channel
            .into_iter()
            .map(|c| (c.source, c.medium, c.count))
            .collect();
        assert_eq!(
            channels,
            vec![
                (None, Some("cpc".to_string()), 2),
                (Some(String::new()), None, 2),
            ]
        );
    }

    #[test]
    fn empty_inbounds_have_empty_totals() {
        let totals = inbound_totals(&[]);
        assert_eq!(totals.inbounds, 0);
        assert!(totals.by_status.is_empty() && totals.by_channel.is_empty());
    }
}
