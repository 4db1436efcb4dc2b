use crate::errors::AppError;
use crate::handlers::AppState;
use crate::lead_sync::LeadEvent;
use crate::webhook_models::{LeadPushPayload, LeadPushResponse};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

/// Lead push webhook
///
/// Receives realtime lead events (`lead-added`, `newLead`, `lead-updated`)
/// and enqueues them in arrival order on the lead queue. Events are applied
/// by the queue consumer, not by this handler.
///
/// Expected payload: single event object OR array of events
/// Authentication: X-Webhook-Token header must match WEBHOOK_SECRET when it is set
pub async fn lead_push_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LeadPushPayload>,
) -> Result<(StatusCode, Json<LeadPushResponse>), AppError> {
    validate_webhook_secret(&state, &headers)?;

    let events = payload.into_events();
    let received = events.len();
    tracing::info!("Received {} lead push event(s)", received);

    let store = state.dashboard.lead_store();
    let mut queued = 0;
    for event in events {
        tracing::debug!("Queueing {:?} for lead {}", event.event, event.lead.id);
        store.push(LeadEvent::from(event))?;
        queued += 1;
    }

    Ok((
        StatusCode::OK,
        Json(LeadPushResponse {
            status: "received".to_string(),
            received,
            queued,
        }),
    ))
}

/// Validate webhook secret from X-Webhook-Token header
fn validate_webhook_secret(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(ref expected_secret) = state.config.webhook_secret else {
        return Ok(());
    };

    let token = headers
        .get("X-Webhook-Token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing X-Webhook-Token header".to_string()))?;

    if !constant_time_compare(token, expected_secret) {
        tracing::warn!("Invalid webhook token received");
        return Err(AppError::Unauthorized("Invalid webhook token".to_string()));
    }

    Ok(())
}

/// Constant-time string comparison
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
