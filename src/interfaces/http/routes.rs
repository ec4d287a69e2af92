//! | Method | Path                              | Handler           |
//! |--------|-----------------------------------|-------------------|
//! | GET    | /api/leads                        | `list_leads`      |
//! | GET    | /api/leads/{lead_id}/inbounds     | `lead_inbounds`   |
//! | GET    | /api/leads/{lead_id}/messages     | `lead_messages`   |
//! | GET    | /api/leads/{lead_id}/sales        | `lead_sales`      |
//! | GET    | /api/leads/{lead_id}/audits       | `lead_audits`     |
//! | POST   | /api/contact                      | `submit_contact`  |
//! | POST   | /api/new-lead                     | `submit_new_lead` |
//! | GET    | /health                           | `health_check`    |

use crate::interfaces::http::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/leads", get(handlers::list_leads))
        .route("/leads/{lead_id}/inbounds", get(handlers::lead_inbounds))
        .route("/leads/{lead_id}/messages", get(handlers::lead_messages))
        .route("/leads/{lead_id}/sales", get(handlers::lead_sales))
        .route("/leads/{lead_id}/audits", get(handlers::lead_audits))
        .route("/contact", post(handlers::submit_contact))
        .route("/new-lead", post(handlers::submit_new_lead));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer())
        .with_state(state)
}

// The landing page and the dashboard are served from other origins
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
