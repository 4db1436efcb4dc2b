//! Ordered application of every lead mutation.
//!
//! Refetch snapshots, push events and optimistic patches all travel through a
//! single channel drained by one task, which is the only writer of the lead
//! table. Pushes and patches that land while a refetch is outstanding are
//! recorded and replayed on top of that refetch's snapshot, so a snapshot taken
//! before a push arrived cannot erase it.
//!
//! A rejected optimistic patch is withdrawn from the replay log, so the
//! resynchronization that follows the rejection shows the backend's value.
//! A replayed `lead-added` push is skipped when the snapshot already holds
//! that id, since the snapshot was read after the lead existed.

use crate::errors::AppError;
use crate::lead_table::{LeadChange, LeadTable};
use crate::models::Lead;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};

#[derive(Debug, Clone)]
pub enum LeadEvent {
    /// A full refetch has been issued.
    RefetchStarted,
    /// The refetch completed with this authoritative list.
    Snapshot(Vec<Lead>),
    /// The refetch failed; the table is left as it is.
    RefetchFailed,
    /// `lead-added` / `newLead` push: insert at the head or replace by id.
    Added(Lead),
    /// `lead-updated` push: replace by id, ignored for unknown ids.
    Updated(Lead),
    /// Local field change from an optimistic update.
    Patch { id: String, change: LeadChange },
    /// The backend rejected the optimistic patches for this lead.
    PatchRejected { id: String },
    /// One change applied to several leads at once (committed bulk assignment).
    PatchMany { ids: Vec<String>, change: LeadChange },
}

/// Sequential state machine behind the queue.
#[derive(Debug, Default)]
pub struct LeadSyncWorker {
    pending_refetches: usize,
    replay: Vec<LeadEvent>,
}

impl LeadSyncWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_refetches(&self) -> usize {
        self.pending_refetches
    }

    pub fn handle(&mut self, event: LeadEvent, table: &mut LeadTable) {
        match event {
            LeadEvent::RefetchStarted => {
                self.pending_refetches += 1;
                tracing::debug!("Refetch started ({} pending)", self.pending_refetches);
            }
            LeadEvent::Snapshot(leads) => {
                tracing::info!("Applying lead snapshot with {} record(s)", leads.len());
                let fetched: HashSet<String> = leads.iter().map(|l| l.id.clone()).collect();
                table.replace_all(leads);
                if !self.replay.is_empty() {
                    tracing::debug!(
                        "Replaying {} change(s) received during refetch",
                        self.replay.len()
                    );
                    for event in &self.replay {
                        if let LeadEvent::Added(lead) = event {
                            if fetched.contains(&lead.id) {
                                continue;
                            }
                        }
                        Self::apply_change(event, table);
                    }
                }
                self.finish_refetch();
            }
            LeadEvent::RefetchFailed => {
                tracing::warn!("Refetch failed, keeping current lead table");
                self.finish_refetch();
            }
            LeadEvent::PatchRejected { id } => {
                let before = self.replay.len();
                self.replay
                    .retain(|event| !matches!(event, LeadEvent::Patch { id: patched, .. } if *patched == id));
                tracing::debug!(
                    "Withdrew {} pending patch(es) for rejected lead {}",
                    before - self.replay.len(),
                    id
                );
            }
            change => {
                Self::apply_change(&change, table);
                if self.pending_refetches > 0 {
                    self.replay.push(change);
                }
            }
        }
    }

    fn finish_refetch(&mut self) {
        self.pending_refetches = self.pending_refetches.saturating_sub(1);
        if self.pending_refetches == 0 {
            self.replay.clear();
        }
    }

    fn apply_change(event: &LeadEvent, table: &mut LeadTable) {
        match event {
            LeadEvent::Added(lead) => {
                if table.upsert(lead.clone()) {
                    tracing::debug!("Lead {} added", lead.id);
                }
            }
            LeadEvent::Updated(lead) => {
                if table.contains(&lead.id) {
                    table.upsert(lead.clone());
                } else {
                    tracing::debug!("Ignoring update for unknown lead {}", lead.id);
                }
            }
            LeadEvent::Patch { id, change } => {
                if !table.patch(id, change) {
                    tracing::debug!("Ignoring patch for unknown lead {}", id);
                }
            }
            LeadEvent::PatchMany { ids, change } => {
                let applied = ids.iter().filter(|id| table.patch(id, change)).count();
                tracing::debug!("Patched {} of {} lead(s)", applied, ids.len());
            }
            LeadEvent::RefetchStarted
            | LeadEvent::Snapshot(_)
            | LeadEvent::RefetchFailed
            | LeadEvent::PatchRejected { .. } => {}
        }
    }
}

struct Command {
    event: LeadEvent,
    ack: Option<oneshot::Sender<()>>,
}

/// Handle to the lead table and its mutation queue.
#[derive(Clone)]
pub struct LeadStore {
    tx: mpsc::UnboundedSender<Command>,
    table: Arc<RwLock<LeadTable>>,
}

impl LeadStore {
    /// Starts the consumer task. Must be called inside a tokio runtime.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();
        let table = Arc::new(RwLock::new(LeadTable::new()));

        let writer = table.clone();
        tokio::spawn(async move {
            let mut worker = LeadSyncWorker::new();
            while let Some(command) = rx.recv().await {
                {
                    let mut table = writer.write().await;
                    worker.handle(command.event, &mut table);
                }
                if let Some(ack) = command.ack {
                    let _ = ack.send(());
                }
            }
            tracing::debug!("Lead queue closed");
        });

        Self { tx, table }
    }

    /// Enqueues an event without waiting for it to be applied.
    pub fn push(&self, event: LeadEvent) -> Result<(), AppError> {
        self.tx
            .send(Command { event, ack: None })
            .map_err(|_| AppError::InternalError("Lead queue is closed".to_string()))
    }

    /// Enqueues an event and waits until it has been applied.
    pub async fn apply(&self, event: LeadEvent) -> Result<(), AppError> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(Command {
                event,
                ack: Some(ack),
            })
            .map_err(|_| AppError::InternalError("Lead queue is closed".to_string()))?;
        done.await
            .map_err(|_| AppError::InternalError("Lead queue dropped the event".to_string()))
    }

    /// Runs `f` against the current table under a read lock.
    pub async fn read<R>(&self, f: impl FnOnce(&LeadTable) -> R) -> R {
        let table = self.table.read().await;
        f(&table)
    }

    pub async fn leads(&self) -> Vec<Lead> {
        self.read(LeadTable::to_vec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LeadSource, LeadStatus};

    fn lead(id: &str, status: LeadStatus) -> Lead {
        Lead {
            id: id.to_string(),
            name: id.to_uppercase(),
            phone: String::new(),
            source: LeadSource::Website,
            status,
            assigned_to: None,
            created_at: None,
        }
    }

    #[test]
    fn test_push_during_refetch_survives_snapshot() {
        let mut worker = LeadSyncWorker::new();
        let mut table = LeadTable::from_leads(vec![lead("a", LeadStatus::New)]);

        worker.handle(LeadEvent::RefetchStarted, &mut table);
        worker.handle(LeadEvent::Added(lead("pushed", LeadStatus::Hot)), &mut table);
        // Snapshot was read by the backend before the push existed.
        worker.handle(LeadEvent::Snapshot(vec![lead("a", LeadStatus::Cold)]), &mut table);

        let ids: Vec<_> = table.iter().map(|l| l.id.clone()).collect();
        assert_eq!(ids, vec!["pushed", "a"]);
        assert_eq!(table.get("a").unwrap().status, LeadStatus::Cold);
        assert_eq!(worker.pending_refetches(), 0);
    }

    #[test]
    fn test_replay_log_cleared_after_refetch() {
        let mut worker = LeadSyncWorker::new();
        let mut table = LeadTable::new();

        worker.handle(LeadEvent::RefetchStarted, &mut table);
        worker.handle(LeadEvent::Added(lead("x", LeadStatus::New)), &mut table);
        worker.handle(LeadEvent::RefetchFailed, &mut table);
        assert!(table.contains("x"));

        worker.handle(LeadEvent::Snapshot(vec![lead("a", LeadStatus::New)]), &mut table);
        assert!(!table.contains("x"));
    }

    #[test]
    fn test_update_for_unknown_lead_ignored() {
        let mut worker = LeadSyncWorker::new();
        let mut table = LeadTable::from_leads(vec![lead("a", LeadStatus::New)]);

        worker.handle(LeadEvent::Updated(lead("ghost", LeadStatus::Hot)), &mut table);
        assert_eq!(table.len(), 1);

        worker.handle(LeadEvent::Updated(lead("a", LeadStatus::Warm)), &mut table);
        assert_eq!(table.get("a").unwrap().status, LeadStatus::Warm);
    }

    #[test]
    fn test_rejected_patch_not_replayed_over_resync() {
        let mut worker = LeadSyncWorker::new();
        let mut table = LeadTable::from_leads(vec![lead("a", LeadStatus::New)]);
        let patch = |id: &str, status| LeadEvent::Patch {
            id: id.to_string(),
            change: LeadChange::Status(status),
        };

        worker.handle(LeadEvent::RefetchStarted, &mut table);
        worker.handle(patch("a", LeadStatus::Hot), &mut table);
        worker.handle(LeadEvent::PatchRejected { id: "a".to_string() }, &mut table);
        // Resynchronization issued after the rejection.
        worker.handle(LeadEvent::RefetchStarted, &mut table);

        worker.handle(LeadEvent::Snapshot(vec![lead("a", LeadStatus::New)]), &mut table);
        assert_eq!(table.get("a").unwrap().status, LeadStatus::New);
        worker.handle(LeadEvent::Snapshot(vec![lead("a", LeadStatus::New)]), &mut table);
        assert_eq!(table.get("a").unwrap().status, LeadStatus::New);
        assert_eq!(worker.pending_refetches(), 0);
    }

    #[test]
    fn test_rejection_keeps_other_pending_patches() {
        let mut worker = LeadSyncWorker::new();
        let mut table =
            LeadTable::from_leads(vec![lead("a", LeadStatus::New), lead("b", LeadStatus::New)]);

        worker.handle(LeadEvent::RefetchStarted, &mut table);
        worker.handle(
            LeadEvent::Patch {
                id: "a".to_string(),
                change: LeadChange::Status(LeadStatus::Hot),
            },
            &mut table,
        );
        worker.handle(
            LeadEvent::Patch {
                id: "b".to_string(),
                change: LeadChange::Status(LeadStatus::Warm),
            },
            &mut table,
        );
        worker.handle(LeadEvent::PatchRejected { id: "a".to_string() }, &mut table);
        worker.handle(
            LeadEvent::Snapshot(vec![lead("a", LeadStatus::New), lead("b", LeadStatus::New)]),
            &mut table,
        );

        assert_eq!(table.get("a").unwrap().status, LeadStatus::New);
        assert_eq!(table.get("b").unwrap().status, LeadStatus::Warm);
    }

    #[test]
    fn test_added_push_not_replayed_over_fetched_record() {
        let mut worker = LeadSyncWorker::new();
        let mut table = LeadTable::new();

        worker.handle(LeadEvent::RefetchStarted, &mut table);
        worker.handle(LeadEvent::Added(lead("n", LeadStatus::New)), &mut table);
        // The backend already moved the new lead on by the time it was read.
        worker.handle(LeadEvent::Snapshot(vec![lead("n", LeadStatus::Converted)]), &mut table);

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("n").unwrap().status, LeadStatus::Converted);
    }

    #[tokio::test]
    async fn test_store_applies_in_arrival_order() {
        let store = LeadStore::spawn();
        store
            .apply(LeadEvent::Snapshot(vec![lead("a", LeadStatus::New)]))
            .await
            .unwrap();

        store
            .push(LeadEvent::Patch {
                id: "a".to_string(),
                change: LeadChange::Status(LeadStatus::Hot),
            })
            .unwrap();
        store
            .apply(LeadEvent::Patch {
                id: "a".to_string(),
                change: LeadChange::Status(LeadStatus::Converted),
            })
            .await
            .unwrap();

        let leads = store.leads().await;
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].status, LeadStatus::Converted);
    }
}
