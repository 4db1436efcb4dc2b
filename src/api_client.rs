use crate::errors::AppError;
use crate::models::{
    Attendance, Expense, Lead, LeadPatch, NewAttendance, Project, User, Visit, VisitStatus,
};
use crate::session::SessionStore;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use url::Url;

/// Client for the dashboard REST backend.
///
/// Every request looks up the bearer token from the session store and sends it
/// as `Authorization: Bearer <token>` when present. Without a token the request
/// goes out unauthenticated and the backend decides.
///
/// Record ids are appended as escaped path segments, never spliced into the
/// path text, so an id cannot reach another endpoint.
#[derive(Clone)]
pub struct DashboardApiClient {
    client: reqwest::Client,
    base_url: String,
    base: Url,
    session: SessionStore,
}

impl DashboardApiClient {
    /// Creates a new `DashboardApiClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Backend base URL, e.g. `http://localhost:5000/api`.
    /// * `session` - Storage the bearer token is read from.
    /// * `timeout` - Per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        session: SessionStore,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let base = Url::parse(&base_url).map_err(|e| {
            AppError::BadRequest(format!("Invalid backend URL '{}': {}", base_url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(AppError::BadRequest(format!(
                "Backend URL '{}' cannot carry a path",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create backend client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            base,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins path segments onto the base URL, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.trim().is_empty() || **s == "." || **s == "..")
        {
            return Err(AppError::BadRequest(format!("Invalid path segment '{}'", bad)));
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::InternalError("Backend URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");

        match self.session.token().await {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    /// Sends a request and checks the status.
    ///
    /// Transport failures map to `ExternalApiError`, non-2xx responses to `Rejected`.
    async fn send<B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<reqwest::Response, AppError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        tracing::debug!("{} {}", method, url);

        let mut builder = self.request(method.clone(), url).await;
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            AppError::ExternalApiError(format!("{} {} failed: {}", method, path, e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!("{} {} returned {}: {}", method, path, status, error_text);
            return Err(AppError::Rejected {
                status: status.as_u16(),
                body: error_text,
            });
        }

        Ok(response)
    }

    /// Sends a request and decodes the JSON response.
    async fn execute<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, AppError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(method, segments, body).await?;
        response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!(
                "Failed to parse /{} response: {}",
                segments.join("/"),
                e
            ))
        })
    }

    /// Fetches a list endpoint, reading `null` as an empty list.
    async fn get_list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, AppError> {
        let items: Option<Vec<T>> = self
            .execute::<(), _>(Method::GET, &[collection], None)
            .await?;
        let items = items.unwrap_or_default();
        tracing::debug!("GET /{} returned {} record(s)", collection, items.len());
        Ok(items)
    }

    /// `GET /lead`. Leads are normalized as they are decoded.
    pub async fn get_leads(&self) -> Result<Vec<Lead>, AppError> {
        self.get_list("lead").await
    }

    /// `PATCH /lead/:id`.
    pub async fn update_lead(&self, lead_id: &str, patch: &LeadPatch) -> Result<(), AppError> {
        tracing::info!("Updating lead {}", lead_id);
        self.send(Method::PATCH, &["lead", lead_id], Some(patch))
            .await?;
        Ok(())
    }

    /// `GET /users`.
    pub async fn get_users(&self) -> Result<Vec<User>, AppError> {
        self.get_list("users").await
    }

    /// `GET /projects`.
    pub async fn get_projects(&self) -> Result<Vec<Project>, AppError> {
        self.get_list("projects").await
    }

    /// `GET /site-visits`.
    pub async fn get_site_visits(&self) -> Result<Vec<Visit>, AppError> {
        self.get_list("site-visits").await
    }

    /// `PATCH /site-visits/:id` with `{ status }`.
    pub async fn update_visit_status(
        &self,
        visit_id: &str,
        status: &VisitStatus,
    ) -> Result<serde_json::Value, AppError> {
        tracing::info!("Updating site visit {} status", visit_id);
        let body = json!({ "status": String::from(status.clone()) });
        self.execute(Method::PATCH, &["site-visits", visit_id], Some(&body))
            .await
    }

    /// `GET /attendance`.
    pub async fn get_attendance(&self) -> Result<Vec<Attendance>, AppError> {
        self.get_list("attendance").await
    }

    /// `POST /attendance`.
    pub async fn create_attendance(&self, entry: &NewAttendance) -> Result<Attendance, AppError> {
        tracing::info!("Recording attendance for shift {}", entry.shift);
        self.execute(Method::POST, &["attendance"], Some(entry)).await
    }

    /// `GET /expenses`.
    pub async fn get_expenses(&self) -> Result<Vec<Expense>, AppError> {
        self.get_list("expenses").await
    }
}
