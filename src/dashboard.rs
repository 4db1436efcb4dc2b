//! Lead analytics dashboard state.
//!
//! Owns the fetched lists, the lead queue and the interaction state (filters,
//! row selection, chart selection), and assembles the view served to clients.

use crate::analytics::{ChartSlice, ChartView, LeadMetrics};
use crate::api_client::DashboardApiClient;
use crate::errors::AppError;
use crate::export::{export_rows, leads_to_csv};
use crate::filters::{FilterCriteria, FilteredView};
use crate::impact::{derive_impact, ChartSelection, ImpactSummary};
use crate::lead_actions::{
    apply_optimistic, bulk_assign, resolve_assignee, FailurePolicy, LeadSelection,
    BULK_UPDATE_POLICY, SINGLE_UPDATE_POLICY,
};
use crate::lead_sync::{LeadEvent, LeadStore};
use crate::lead_table::LeadChange;
use crate::models::{Lead, LeadPatch, LeadStatus, Project, User, Visit};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Default, Clone)]
struct ReferenceData {
    users: Vec<User>,
    projects: Vec<Project>,
    visits: Vec<Visit>,
}

#[derive(Debug, Default)]
struct InteractionState {
    criteria: FilterCriteria,
    selection: LeadSelection,
    chart: ChartSelection,
    filtered: FilteredView,
    metrics: Option<(u64, LeadMetrics)>,
}

/// Everything the analytics page renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub loading: bool,
    pub total_leads: usize,
    pub chart_view: ChartView,
    pub chart: Vec<ChartSlice>,
    pub selected_status: LeadStatus,
    pub highlight_color: &'static str,
    pub metrics: LeadMetrics,
    pub impact: ImpactSummary,
    pub leads: Vec<Lead>,
    pub selected_lead_ids: Vec<String>,
}

pub struct Dashboard {
    client: DashboardApiClient,
    leads: LeadStore,
    reference: RwLock<ReferenceData>,
    interaction: Mutex<InteractionState>,
    loading: AtomicBool,
}

impl Dashboard {
    /// Creates an empty dashboard in the loading state. Must be called inside a tokio runtime.
    pub fn new(client: DashboardApiClient) -> Self {
        Self {
            client,
            leads: LeadStore::spawn(),
            reference: RwLock::new(ReferenceData::default()),
            interaction: Mutex::new(InteractionState::default()),
            loading: AtomicBool::new(true),
        }
    }

    pub fn client(&self) -> &DashboardApiClient {
        &self.client
    }

    pub fn lead_store(&self) -> &LeadStore {
        &self.leads
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Fetches leads, users, projects and visits concurrently and replaces all
    /// four lists.
    ///
    /// On failure nothing is replaced, the loading flag keeps its value and the
    /// error is logged and returned. There is no retry.
    pub async fn refresh(&self) -> Result<(), AppError> {
        self.leads.push(LeadEvent::RefetchStarted)?;

        let fetched = tokio::try_join!(
            self.client.get_leads(),
            self.client.get_users(),
            self.client.get_projects(),
            self.client.get_site_visits(),
        );

        match fetched {
            Ok((leads, users, projects, visits)) => {
                tracing::info!(
                    "Fetched {} lead(s), {} user(s), {} project(s), {} visit(s)",
                    leads.len(),
                    users.len(),
                    projects.len(),
                    visits.len()
                );
                self.leads.apply(LeadEvent::Snapshot(leads)).await?;
                *self.reference.write().await = ReferenceData {
                    users,
                    projects,
                    visits,
                };
                self.loading.store(false, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to fetch dashboard data: {}", e);
                self.leads.apply(LeadEvent::RefetchFailed).await?;
                Err(e)
            }
        }
    }

    pub async fn users(&self) -> Vec<User> {
        self.reference.read().await.users.clone()
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.reference.read().await.projects.clone()
    }

    pub async fn visits(&self) -> Vec<Visit> {
        self.reference.read().await.visits.clone()
    }

    pub async fn criteria(&self) -> FilterCriteria {
        self.interaction.lock().await.criteria.clone()
    }

    pub async fn set_criteria(&self, criteria: FilterCriteria) {
        self.interaction.lock().await.criteria = criteria;
    }

    pub async fn set_chart_view(&self, view: ChartView) {
        self.interaction.lock().await.chart.set_view(view);
    }

    /// Selects a chart segment. Ignored while the source breakdown is shown.
    pub async fn select_segment(&self, label: &str) -> bool {
        self.interaction.lock().await.chart.select_segment(label)
    }

    pub async fn selection(&self) -> Vec<String> {
        self.interaction.lock().await.selection.ids().to_vec()
    }

    pub async fn toggle_selection(&self, lead_id: &str) -> Vec<String> {
        let mut state = self.interaction.lock().await;
        state.selection.toggle(lead_id);
        state.selection.ids().to_vec()
    }

    pub async fn clear_selection(&self) {
        self.interaction.lock().await.selection.clear();
    }

    /// Selects every lead in the current filtered view.
    pub async fn select_all_filtered(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut state = self.interaction.lock().await;
        let InteractionState {
            criteria,
            selection,
            filtered,
            ..
        } = &mut *state;
        self.leads
            .read(|table| selection.select_all(filtered.get(table, criteria, now)))
            .await;
        selection.ids().to_vec()
    }

    /// Assembles the page: metrics over all leads, the filtered table, the
    /// chart for the current view and the impact card.
    pub async fn view(&self, now: DateTime<Utc>) -> DashboardView {
        let mut state = self.interaction.lock().await;
        let reference = self.reference.read().await;

        let InteractionState {
            criteria,
            selection,
            chart,
            filtered,
            metrics,
        } = &mut *state;

        let (total_leads, leads, metrics) = self
            .leads
            .read(|table| {
                let cached = metrics
                    .as_ref()
                    .filter(|(version, _)| *version == table.version())
                    .map(|(_, cached)| cached.clone());
                let fresh = match cached {
                    Some(cached) => cached,
                    None => {
                        let computed = LeadMetrics::compute(table.iter());
                        *metrics = Some((table.version(), computed.clone()));
                        computed
                    }
                };
                let leads = filtered.get(table, criteria, now).to_vec();
                (table.len(), leads, fresh)
            })
            .await;

        DashboardView {
            loading: self.is_loading(),
            total_leads,
            chart_view: chart.view,
            chart: metrics.chart(chart.view).to_vec(),
            selected_status: chart.selected_status.clone(),
            highlight_color: metrics.highlight_color(chart.view, &chart.selected_status),
            impact: derive_impact(&reference.projects, &reference.visits, &chart.selected_status),
            metrics,
            leads,
            selected_lead_ids: selection.ids().to_vec(),
        }
    }

    /// Sets a lead's status locally, then confirms with the backend.
    pub async fn update_status(&self, lead_id: &str, status: LeadStatus) -> Result<(), AppError> {
        let result = apply_optimistic(
            &self.client,
            &self.leads,
            lead_id,
            LeadChange::Status(status.clone()),
            &LeadPatch::status(status),
        )
        .await;
        self.recover(result, SINGLE_UPDATE_POLICY).await
    }

    /// Assigns a lead locally, then confirms with the backend.
    pub async fn assign_lead(&self, lead_id: &str, user_id: &str) -> Result<(), AppError> {
        if user_id.trim().is_empty() {
            return Err(AppError::BadRequest("A user id is required".to_string()));
        }
        let assignee = resolve_assignee(&self.reference.read().await.users, user_id);
        let result = apply_optimistic(
            &self.client,
            &self.leads,
            lead_id,
            LeadChange::Assignee(Some(assignee)),
            &LeadPatch::assignee(user_id),
        )
        .await;
        self.recover(result, SINGLE_UPDATE_POLICY).await
    }

    /// Assigns every selected lead to `user_id`. The selection is cleared on success.
    pub async fn bulk_assign_selected(&self, user_id: &str) -> Result<usize, AppError> {
        let ids = self.selection().await;
        let assignee = resolve_assignee(&self.reference.read().await.users, user_id);

        match bulk_assign(&self.client, &self.leads, &ids, assignee).await {
            Ok(count) => {
                self.clear_selection().await;
                Ok(count)
            }
            Err(e) => self.recover(Err(e), BULK_UPDATE_POLICY).await,
        }
    }

    /// CSV of the selected leads, or of the filtered view when nothing is selected.
    pub async fn export_csv(&self, now: DateTime<Utc>) -> Result<String, AppError> {
        let mut state = self.interaction.lock().await;
        let InteractionState {
            criteria,
            selection,
            filtered,
            ..
        } = &mut *state;
        self.leads
            .read(|table| {
                let visible = filtered.get(table, criteria, now);
                leads_to_csv(export_rows(table, selection, visible))
            })
            .await
    }

    async fn recover<T>(&self, result: Result<T, AppError>, policy: FailurePolicy) -> Result<T, AppError> {
        let e = match result {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if matches!(e, AppError::NotFound(_) | AppError::BadRequest(_)) {
            return Err(e);
        }

        match policy {
            FailurePolicy::Resync => {
                tracing::warn!("Update failed, resynchronizing: {}", e);
                if let Err(refetch_error) = self.refresh().await {
                    tracing::error!("Resynchronization failed: {}", refetch_error);
                }
            }
            FailurePolicy::Discard => {
                tracing::error!("Update failed, local state left unchanged: {}", e);
            }
        }
        Err(e)
    }
}
