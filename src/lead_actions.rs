//! Optimistic lead mutations and row selection.
//!
//! Every mutation follows the same shape: apply locally, confirm with the
//! backend, then act on the outcome according to a [`FailurePolicy`]:
//!
//! - single-row updates apply first and resynchronize on failure;
//! - bulk assignment waits for every request and only then commits, so a
//!   failure leaves the table untouched and triggers nothing else.

use crate::api_client::DashboardApiClient;
use crate::errors::{AppError, ResultExt};
use crate::lead_sync::{LeadEvent, LeadStore};
use crate::lead_table::LeadChange;
use crate::models::{Assignee, Lead, LeadPatch, User};
use tokio::task::JoinSet;

/// Recovery applied when the backend does not confirm a local change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Refetch the authoritative lists.
    Resync,
    /// Log and keep the local state as it is.
    Discard,
}

pub const SINGLE_UPDATE_POLICY: FailurePolicy = FailurePolicy::Resync;
pub const BULK_UPDATE_POLICY: FailurePolicy = FailurePolicy::Discard;

/// Resolves a user id to an assignee, taking the display name from `users`.
pub fn resolve_assignee(users: &[User], user_id: &str) -> Assignee {
    let user = users.iter().find(|u| u.id == user_id);
    if user.is_none() {
        tracing::debug!("Assignee {} not in user list", user_id);
    }
    let name = user
        .map(|u| u.name.clone())
        .filter(|name| !name.trim().is_empty());
    Assignee {
        id: user_id.to_string(),
        name,
    }
}

/// Applies `change` locally, then sends `patch` for the same lead.
///
/// The local change is already visible when this returns an error; the caller
/// decides how to recover. A rejected change is withdrawn from the replay log
/// first, so a refetch can never bring it back.
pub async fn apply_optimistic(
    client: &DashboardApiClient,
    store: &LeadStore,
    lead_id: &str,
    change: LeadChange,
    patch: &LeadPatch,
) -> Result<(), AppError> {
    let known = store.read(|table| table.contains(lead_id)).await;
    if !known {
        return Err(AppError::NotFound(format!("Lead {} not found", lead_id)));
    }

    store
        .apply(LeadEvent::Patch {
            id: lead_id.to_string(),
            change,
        })
        .await?;

    let result = client
        .update_lead(lead_id, patch)
        .await
        .with_context(|| format!("Updating lead {}", lead_id));

    if result.is_err() {
        store
            .apply(LeadEvent::PatchRejected {
                id: lead_id.to_string(),
            })
            .await?;
    }
    result
}

/// Assigns every id in `lead_ids` to `assignee`, one request per lead, all in flight at once.
///
/// Local state is committed in one step only if every request succeeded.
/// Returns the number of leads updated.
pub async fn bulk_assign(
    client: &DashboardApiClient,
    store: &LeadStore,
    lead_ids: &[String],
    assignee: Assignee,
) -> Result<usize, AppError> {
    if assignee.id.trim().is_empty() {
        return Err(AppError::BadRequest("A user id is required".to_string()));
    }
    if lead_ids.is_empty() {
        return Ok(0);
    }

    tracing::info!(
        "Bulk assigning {} lead(s) to user {}",
        lead_ids.len(),
        assignee.id
    );

    let patch = LeadPatch::assignee(assignee.id.clone());
    let mut requests = JoinSet::new();
    for id in lead_ids {
        let client = client.clone();
        let patch = patch.clone();
        let id = id.clone();
        requests.spawn(async move {
            let result = client.update_lead(&id, &patch).await;
            (id, result)
        });
    }

    let mut failures = Vec::new();
    while let Some(joined) = requests.join_next().await {
        match joined {
            Ok((_, Ok(()))) => {}
            Ok((id, Err(e))) => failures.push(format!("{}: {}", id, e)),
            Err(e) => failures.push(format!("request task failed: {}", e)),
        }
    }

    if !failures.is_empty() {
        tracing::error!(
            "Bulk assignment failed for {} of {} lead(s): {}",
            failures.len(),
            lead_ids.len(),
            failures.join("; ")
        );
        return Err(AppError::ExternalApiError(format!(
            "Bulk assignment failed for {} of {} lead(s)",
            failures.len(),
            lead_ids.len()
        )));
    }

    store
        .apply(LeadEvent::PatchMany {
            ids: lead_ids.to_vec(),
            change: LeadChange::Assignee(Some(assignee)),
        })
        .await?;

    Ok(lead_ids.len())
}

/// Ids of the rows ticked in the table, in the order they were ticked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadSelection {
    ids: Vec<String>,
}

impl LeadSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    /// Adds the id if absent, removes it otherwise.
    pub fn toggle(&mut self, id: &str) {
        if let Some(pos) = self.ids.iter().position(|s| s == id) {
            self.ids.remove(pos);
        } else {
            self.ids.push(id.to_string());
        }
    }

    /// Replaces the selection with every currently visible lead.
    pub fn select_all<'a>(&mut self, visible: impl IntoIterator<Item = &'a Lead>) {
        self.ids = visible.into_iter().map(|l| l.id.clone()).collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LeadSource, LeadStatus};

    fn lead(id: &str) -> Lead {
        Lead {
            id: id.to_string(),
            name: String::new(),
            phone: String::new(),
            source: LeadSource::Website,
            status: LeadStatus::New,
            assigned_to: None,
            created_at: None,
        }
    }

    #[test]
    fn test_resolve_assignee_name() {
        let users = vec![User {
            id: "u1".to_string(),
            name: "Meera".to_string(),
        }];
        assert_eq!(resolve_assignee(&users, "u1").name.as_deref(), Some("Meera"));
        let nameless = vec![User {
            id: "u3".to_string(),
            name: String::new(),
        }];
        assert_eq!(resolve_assignee(&nameless, "u3").name, None);
        let unknown = resolve_assignee(&users, "u2");
        assert_eq!(unknown.id, "u2");
        assert_eq!(unknown.name, None);
    }

    #[test]
    fn test_selection_toggle_and_select_all() {
        let mut selection = LeadSelection::new();
        selection.toggle("a");
        selection.toggle("b");
        selection.toggle("a");
        assert_eq!(selection.ids(), &["b".to_string()]);

        let visible = vec![lead("x"), lead("y")];
        selection.select_all(&visible);
        assert_eq!(selection.ids(), &["x".to_string(), "y".to_string()]);
        assert!(selection.contains("y"));

        selection.clear();
        assert!(selection.is_empty());
    }

    #[test]
    fn test_policies() {
        assert_eq!(SINGLE_UPDATE_POLICY, FailurePolicy::Resync);
        assert_eq!(BULK_UPDATE_POLICY, FailurePolicy::Discard);
    }
}
