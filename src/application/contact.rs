use crate::domain::contact::{ContactEnvelope, NewLeadForm};
use crate::domain::error::{AppError, ValidationIssue};
use crate::domain::traits::WebhookTarget;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

/// Decodes a raw request body; malformed JSON is reported like any other
/// invalid field.
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        AppError::Validation(vec![ValidationIssue::new("body", format!("JSON inválido: {e}"))])
    })
}

pub async fn submit_contact(state: &AppState, body: &[u8], now: DateTime<Utc>) -> Result<(), AppError> {
    let envelope: ContactEnvelope = decode_body(body)?;
    let submission = envelope.into_form().validate(now)?;
    forward(state, WebhookTarget::Contact, &submission).await?;
    info!(source = %submission.tracking.traffic_source, "contact forwarded");
    Ok(())
}

pub async fn submit_new_lead(state: &AppState, body: &[u8], now: DateTime<Utc>) -> Result<(), AppError> {
    let form: NewLeadForm = decode_body(body)?;
    let submission = form.validate(now)?;
    forward(state, WebhookTarget::NewLead, &submission).await?;
    info!(origin = ?submission.origin, "new lead forwarded");
    Ok(())
}

async fn forward<T: Serialize>(
    state: &AppState,
    target: WebhookTarget,
    payload: &T,
) -> Result<(), AppError> {
    let payload = serde_json::to_value(payload)?;
    let status = state.webhook.deliver(target, &payload).await?;
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(AppError::Upstream(status))
    }
}
