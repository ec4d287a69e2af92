use crate::application::{contact, lead_details, listing};
use crate::domain::filter::ListingParams;
use crate::domain::model::{
    LeadAuditResponse, LeadInboundsResponse, LeadListPage, LeadMessagesResponse,
    LeadSalesResponse,
};
use crate::interfaces::http::error::ApiError;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/leads
pub async fn list_leads(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<LeadListPage>, ApiError> {
    let params = ListingParams::from_pairs(pairs);
    listing::list_leads(&state, &params, Utc::now())
        .await
        .map(Json)
        .map_err(|e| ApiError::from_app(e, "Failed to fetch leads"))
}

/// GET /api/leads/{lead_id}/inbounds
pub async fn lead_inbounds(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> Result<Json<LeadInboundsResponse>, ApiError> {
    lead_details::lead_inbounds(&state, &lead_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_app(e, "Não foi possível carregar os inbounds"))
}

/// GET /api/leads/{lead_id}/messages
pub async fn lead_messages(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> Result<Json<LeadMessagesResponse>, ApiError> {
    lead_details::lead_messages(&state, &lead_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_app(e, "Não foi possível carregar as mensagens"))
}

/// GET /api/leads/{lead_id}/sales
pub async fn lead_sales(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> Result<Json<LeadSalesResponse>, ApiError> {
    lead_details::lead_sales(&state, &lead_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_app(e, "Não foi possível carregar as vendas"))
}

/// GET /api/leads/{lead_id}/audits
pub async fn lead_audits(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> Result<Json<LeadAuditResponse>, ApiError> {
    lead_details::lead_audits(&state, &lead_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_app(e, "Não foi possível carregar a auditoria"))
}

// Bodies are taken as raw bytes so that malformed JSON yields a 400 with
// an issue list instead of axum's plain-text rejection.

/// POST /api/contact
pub async fn submit_contact(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    contact::submit_contact(&state, &body, Utc::now())
        .await
        .map(|()| Json(SuccessResponse { success: true }))
        .map_err(|e| ApiError::from_app(e, "Erro ao processar requisição"))
}

/// POST /api/new-lead
pub async fn submit_new_lead(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    contact::submit_new_lead(&state, &body, Utc::now())
        .await
        .map(|()| Json(SuccessResponse { success: true }))
        .map_err(|e| ApiError::from_app(e, "Erro ao processar requisição"))
}
