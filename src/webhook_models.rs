use crate::lead_sync::LeadEvent;
use crate::models::Lead;
use serde::{Deserialize, Serialize};

/// Lead push payload - can be a single event or an array
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LeadPushPayload {
    Single(LeadPushEvent),
    Batch(Vec<LeadPushEvent>),
}

impl LeadPushPayload {
    /// Convert to a vec of events for uniform processing
    pub fn into_events(self) -> Vec<LeadPushEvent> {
        match self {
            LeadPushPayload::Single(event) => vec![event],
            LeadPushPayload::Batch(events) => events,
        }
    }
}

/// Event names emitted by the backend's realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LeadPushKind {
    #[serde(rename = "lead-added")]
    LeadAdded,
    #[serde(rename = "newLead")]
    NewLead,
    #[serde(rename = "lead-updated")]
    LeadUpdated,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeadPushEvent {
    pub event: LeadPushKind,
    /// Normalized on decode, same as fetched leads.
    pub lead: Lead,
}

impl From<LeadPushEvent> for LeadEvent {
    fn from(push: LeadPushEvent) -> Self {
        match push.event {
            LeadPushKind::LeadAdded | LeadPushKind::NewLead => LeadEvent::Added(push.lead),
            LeadPushKind::LeadUpdated => LeadEvent::Updated(push.lead),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadPushResponse {
    pub status: String,
    pub received: usize,
    pub queued: usize,
}
