/// HTTP-level tests for the dashboard routes
/// Drives the router in-process against a mocked CRM backend
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use chrono::{Duration, Utc};
use rust_leads_dashboard::api_client::DashboardApiClient;
use rust_leads_dashboard::config::Config;
use rust_leads_dashboard::dashboard::Dashboard;
use rust_leads_dashboard::handlers::{router, AppState};
use rust_leads_dashboard::session::SessionStore;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: String, webhook_secret: Option<&str>) -> Config {
    Config {
        api_base_url: base_url,
        session_file: PathBuf::from(".test_session.json"),
        port: 3000,
        webhook_secret: webhook_secret.map(str::to_string),
        request_timeout_secs: 5,
    }
}

async fn setup(webhook_secret: Option<&str>) -> (MockServer, Arc<AppState>) {
    let mock_server = MockServer::start().await;

    let recent = (Utc::now() - Duration::days(2)).to_rfc3339();
    Mock::given(method("GET"))
        .and(path("/lead"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"_id": "l1", "name": "Ravi", "phone": "111", "source": "Instagram", "status": "Hot", "createdAt": recent},
            {"_id": "l2", "name": "Kiran", "phone": "222", "source": "Linktree", "status": "Cold", "createdAt": recent},
            {"_id": "l3", "name": "Asha", "phone": "333", "status": "Cold", "createdAt": recent}
        ])))
        .mount(&mock_server)
        .await;
    for list in ["/users", "/projects", "/site-visits"] {
        Mock::given(method("GET"))
            .and(path(list))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;
    }

    let config = test_config(mock_server.uri(), webhook_secret);
    let client = DashboardApiClient::new(
        config.api_base_url.clone(),
        SessionStore::with_token(None),
        StdDuration::from_secs(5),
    )
    .unwrap();
    let dashboard = Dashboard::new(client);
    dashboard.refresh().await.unwrap();

    (mock_server, Arc::new(AppState { config, dashboard }))
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (_server, state) = setup(None).await;
    let response = router(state)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_dashboard_applies_filters_and_chart_selection() {
    let (_server, state) = setup(None).await;

    let response = router(state)
        .oneshot(
            Request::get("/api/v1/dashboard?status=Cold&selected_status=Hot")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["loading"], false);
    assert_eq!(body["totalLeads"], 3);
    assert_eq!(body["leads"].as_array().unwrap().len(), 2);
    assert_eq!(body["selectedStatus"], "Hot");
    assert_eq!(body["highlightColor"], "#ef4444");
    assert_eq!(body["impact"]["projectName"], "No Projects Found");
    assert_eq!(
        body["impact"]["strategyTip"],
        "Schedule personal site visits immediately. Urgency closes deals."
    );
}

#[tokio::test]
async fn test_dashboard_rejects_unknown_date_range() {
    let (_server, state) = setup(None).await;
    let response = router(state)
        .oneshot(
            Request::get("/api/v1/dashboard?date_range=yesterday")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_patch_route() {
    let (server, state) = setup(None).await;
    Mock::given(method("PATCH"))
        .and(path("/lead/l2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = router(state.clone())
        .oneshot(json_request(
            "PATCH",
            "/api/v1/leads/l2/status",
            json!({"status": "Warm"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let leads = state.dashboard.lead_store().leads().await;
    let lead = leads.iter().find(|l| l.id == "l2").unwrap();
    assert_eq!(lead.status.label(), "Warm");
}

#[tokio::test]
async fn test_selection_and_export() {
    let (_server, state) = setup(None).await;
    let app = router(state);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/leads/selection",
            json!({"action": "toggle", "id": "l3"}),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["selected"], json!(["l3"]));

    let response = app
        .oneshot(Request::get("/api/v1/leads/export").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("leads_export.csv"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("Asha,333,Website,Cold,Unassigned,"));
}

#[tokio::test]
async fn test_dashboard_criteria_carry_over_to_export() {
    let (_server, state) = setup(None).await;
    let app = router(state);

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/v1/dashboard?status=Hot")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // No parameters here: the stored criteria from the request above apply.
    let response = app
        .oneshot(Request::get("/api/v1/leads/export").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let rows: Vec<&str> = csv.lines().skip(1).collect();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("Ravi,111,Instagram,Hot,"));
}

#[tokio::test]
async fn test_webhook_requires_token_when_configured() {
    let (_server, state) = setup(Some("s3cret")).await;
    let payload = json!({
        "event": "newLead",
        "lead": {"_id": "l9", "name": "Dev"}
    });

    let response = router(state.clone())
        .oneshot(json_request("POST", "/api/v1/webhooks/leads", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut request = json_request("POST", "/api/v1/webhooks/leads", payload);
    request
        .headers_mut()
        .insert("X-Webhook-Token", "s3cret".parse().unwrap());
    let response = router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["queued"], 1);

    // The push is applied by the queue consumer, not by the handler.
    let mut leads = state.dashboard.lead_store().leads().await;
    for _ in 0..100 {
        if leads.len() == 4 {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
        leads = state.dashboard.lead_store().leads().await;
    }
    assert_eq!(leads.len(), 4);
    assert_eq!(leads[0].id, "l9");
}
