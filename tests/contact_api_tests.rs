mod common;

use axum::http::StatusCode;
use common::*;
use leadboard::domain::traits::WebhookTarget;
use rstest::rstest;
use serde_json::json;

const LANDING_PAGE_BODY: &str = r#"{
    "body": {
        "name": "Carlos Mendes",
        "phone": "(61) 99999-8888",
        "createdAt": "2025-03-10T09:00:00-03:00",
        "tracking": {
            "trafficSource": "instagram",
            "utm_source": null,
            "utm_medium": null,
            "utm_campaign": null,
            "fbclid": "fb-123",
            "gclid": null
        }
    }
}"#;

#[tokio::test]
async fn contact_is_normalized_and_forwarded() {
    let app = TestApp::new().await;
    let (status, body) = app.post("/api/contact", LANDING_PAGE_BODY).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let deliveries = app.webhook.deliveries();
    assert_eq!(deliveries.len(), 1);
    let (target, payload) = &deliveries[0];
    assert_eq!(*target, WebhookTarget::Contact);
    assert_eq!(payload["name"], "Carlos Mendes");
    assert_eq!(payload["phone"], "61999998888");
    assert_eq!(payload["submittedAt"], "2025-03-10T12:00:00.000Z");
    assert_eq!(
        payload["tracking"],
        json!({
            "trafficSource": "instagram",
            "utm_source": "instagram",
            "utm_medium": "organic",
            "utm_campaign": "link-bio",
            "utm_term": null,
            "utm_content": "button-whatsapp",
            "fbclid": "fb-123",
            "gclid": null
        })
    );
}

#[tokio::test]
async fn contact_without_name_is_rejected_before_forwarding() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/api/contact",
            r#"{ "phone": "61999998888", "submittedAt": "2025-03-10T12:00:00Z",
                 "tracking": { "trafficSource": "google" } }"#,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let issues = body["issues"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["path"], "name");
    assert!(issues[0]["message"].as_str().is_some());
    assert!(app.webhook.deliveries().is_empty());
}

#[rstest]
#[case("not json at all")]
#[case("")]
#[case("[1, 2, 3]")]
#[tokio::test]
async fn unreadable_contact_body_is_a_bad_request(#[case] raw: &str) {
    let app = TestApp::new().await;
    let (status, body) = app.post("/api/contact", raw).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["issues"].is_array());
    assert!(app.webhook.deliveries().is_empty());
}

#[rstest]
#[case(500)]
#[case(404)]
#[case(503)]
#[tokio::test]
async fn upstream_failure_status_is_mirrored(#[case] upstream: u16) {
    let app = TestApp::with_webhook_status(upstream).await;
    let (status, body) = app.post("/api/contact", LANDING_PAGE_BODY).await;

    assert_eq!(status.as_u16(), upstream);
    assert_eq!(body["error"], format!("Erro ao enviar ({upstream})"));
    assert_eq!(app.webhook.deliveries().len(), 1);
}

#[tokio::test]
async fn new_lead_is_forwarded_with_utm_fields() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/api/new-lead",
            r#"{ "name": "Fernanda", "whatsapp": "(61) 98888-7777",
                 "origin": "Indicação", "medium": "Orgânico" }"#,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let deliveries = app.webhook.deliveries();
    let (target, payload) = &deliveries[0];
    assert_eq!(*target, WebhookTarget::NewLead);
    assert_eq!(payload["whatsapp"], "5561988887777");
    assert_eq!(payload["utm_source"], "Indicação");
    assert_eq!(payload["utm_medium"], "Orgânico");
    assert!(payload["submittedAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn new_lead_with_unknown_origin_is_rejected() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post("/api/new-lead", r#"{ "name": "Fernanda", "origin": "TikTok" }"#)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["issues"][0]["path"], "origin");
    assert!(app.webhook.deliveries().is_empty());
}
