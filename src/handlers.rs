use crate::analytics::ChartView;
use crate::config::Config;
use crate::dashboard::{Dashboard, DashboardView};
use crate::errors::AppError;
use crate::export::EXPORT_FILE_NAME;
use crate::filters::FilterCriteria;
use crate::models::{Attendance, Expense, LeadStatus, NewAttendance, VisitStatus};
use crate::webhook_handler;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Dashboard state and backend client.
    pub dashboard: Dashboard,
}

/// Routes under `/api/v1`.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/dashboard", get(get_dashboard))
        .route("/api/v1/dashboard/refresh", post(refresh_dashboard))
        .route("/api/v1/leads/:id/status", patch(update_lead_status))
        .route("/api/v1/leads/:id/assignee", patch(assign_lead))
        .route("/api/v1/leads/bulk-assign", post(bulk_assign))
        .route("/api/v1/leads/selection", post(update_selection))
        .route("/api/v1/leads/export", get(export_leads))
        .route(
            "/api/v1/webhooks/leads",
            post(webhook_handler::lead_push_webhook),
        )
        .route("/api/v1/attendance", get(list_attendance).post(create_attendance))
        .route("/api/v1/expenses", get(list_expenses))
        .route("/api/v1/site-visits/:id", patch(update_visit_status))
}

/// Health check plus API routes, without transport-level layers.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(api_routes())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-leads-dashboard",
            "version": "0.1.0"
        })),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub status: Option<String>,
    pub source: Option<String>,
    pub assignee: Option<String>,
    pub date_range: Option<String>,
    pub view: Option<ChartView>,
    pub selected_status: Option<String>,
}

/// GET /api/v1/dashboard
///
/// Applies the filter and chart parameters to the dashboard state and returns
/// the assembled page. Absent filters mean `All` and the last 30 days.
///
/// The dashboard holds one interaction state (criteria, chart selection, row
/// selection) for the whole service, as a single operator console. The
/// parameters given here are stored and stay in effect for later calls from
/// any client, including `select_all` and the CSV export, until the next
/// dashboard request replaces them.
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardQuery>,
) -> Result<Json<DashboardView>, AppError> {
    tracing::debug!("GET /dashboard - params: {:?}", params);

    let criteria = FilterCriteria::from_raw(
        params.status.as_deref(),
        params.source.as_deref(),
        params.assignee.as_deref(),
        params.date_range.as_deref(),
    )?;

    let dashboard = &state.dashboard;
    dashboard.set_criteria(criteria).await;
    if let Some(view) = params.view {
        dashboard.set_chart_view(view).await;
    }
    if let Some(ref label) = params.selected_status {
        if !dashboard.select_segment(label).await {
            tracing::debug!("Segment selection '{}' ignored", label);
        }
    }

    Ok(Json(dashboard.view(Utc::now()).await))
}

/// POST /api/v1/dashboard/refresh
pub async fn refresh_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.dashboard.refresh().await?;
    Ok(Json(json!({ "status": "refreshed" })))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

/// PATCH /api/v1/leads/:id/status
pub async fn update_lead_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<StatusCode, AppError> {
    if body.status.trim().is_empty() {
        return Err(AppError::BadRequest("status is required".to_string()));
    }
    state
        .dashboard
        .update_status(&id, LeadStatus::parse(Some(&body.status)))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub user_id: String,
}

/// PATCH /api/v1/leads/:id/assignee
pub async fn assign_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AssignRequest>,
) -> Result<StatusCode, AppError> {
    state.dashboard.assign_lead(&id, &body.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct BulkAssignResponse {
    pub updated: usize,
}

/// POST /api/v1/leads/bulk-assign
///
/// Assigns every selected lead to the given user.
pub async fn bulk_assign(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AssignRequest>,
) -> Result<Json<BulkAssignResponse>, AppError> {
    let updated = state.dashboard.bulk_assign_selected(&body.user_id).await?;
    Ok(Json(BulkAssignResponse { updated }))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SelectionRequest {
    Toggle { id: String },
    SelectAll,
    Clear,
}

/// POST /api/v1/leads/selection
pub async fn update_selection(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SelectionRequest>,
) -> Json<serde_json::Value> {
    let dashboard = &state.dashboard;
    let selected = match body {
        SelectionRequest::Toggle { id } => dashboard.toggle_selection(&id).await,
        SelectionRequest::SelectAll => dashboard.select_all_filtered(Utc::now()).await,
        SelectionRequest::Clear => {
            dashboard.clear_selection().await;
            Vec::new()
        }
    };
    Json(json!({ "selected": selected }))
}

/// GET /api/v1/leads/export
pub async fn export_leads(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let body = state.dashboard.export_csv(Utc::now()).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        body,
    ))
}

/// GET /api/v1/attendance
pub async fn list_attendance(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Attendance>>, AppError> {
    Ok(Json(state.dashboard.client().get_attendance().await?))
}

/// POST /api/v1/attendance
pub async fn create_attendance(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewAttendance>,
) -> Result<(StatusCode, Json<Attendance>), AppError> {
    if body.shift.trim().is_empty() {
        return Err(AppError::BadRequest("shift is required".to_string()));
    }
    let created = state.dashboard.client().create_attendance(&body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/expenses
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Expense>>, AppError> {
    Ok(Json(state.dashboard.client().get_expenses().await?))
}

#[derive(Debug, Deserialize)]
pub struct VisitStatusRequest {
    pub status: VisitStatus,
}

/// PATCH /api/v1/site-visits/:id
pub async fn update_visit_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<VisitStatusRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = state
        .dashboard
        .client()
        .update_visit_status(&id, &body.status)
        .await?;
    Ok(Json(updated))
}
