//! In-memory lead table keyed by lead id.
//!
//! Display order follows the backend's list order, with leads first seen
//! through a push placed at the head. Every mutation bumps `version`, which
//! memoized views use to decide whether to recompute.

use crate::models::{Assignee, Lead, LeadStatus};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct LeadTable {
    order: Vec<String>,
    records: HashMap<String, Lead>,
    version: u64,
}

/// Field-level change applied to a lead already in the table.
#[derive(Debug, Clone, PartialEq)]
pub enum LeadChange {
    Status(LeadStatus),
    Assignee(Option<Assignee>),
}

impl LeadTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_leads(leads: Vec<Lead>) -> Self {
        let mut table = Self::new();
        table.replace_all(leads);
        table
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Lead> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Leads in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Lead> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn to_vec(&self) -> Vec<Lead> {
        self.iter().cloned().collect()
    }

    /// Replaces the whole table with an authoritative snapshot.
    ///
    /// Duplicate ids keep their first position and last content.
    pub fn replace_all(&mut self, leads: Vec<Lead>) {
        self.order.clear();
        self.records.clear();
        for lead in leads {
            if !self.records.contains_key(&lead.id) {
                self.order.push(lead.id.clone());
            }
            self.records.insert(lead.id.clone(), lead);
        }
        self.version += 1;
    }

    /// Replaces a lead in place, or inserts it at the head when the id is new.
    ///
    /// Returns true when the lead was new.
    pub fn upsert(&mut self, lead: Lead) -> bool {
        let inserted = !self.records.contains_key(&lead.id);
        if inserted {
            self.order.insert(0, lead.id.clone());
        }
        self.records.insert(lead.id.clone(), lead);
        self.version += 1;
        inserted
    }

    /// Applies a field change. Returns false when the id is unknown.
    pub fn patch(&mut self, id: &str, change: &LeadChange) -> bool {
        let Some(lead) = self.records.get_mut(id) else {
            return false;
        };
        match change {
            LeadChange::Status(status) => lead.status = status.clone(),
            LeadChange::Assignee(assignee) => lead.assigned_to = assignee.clone(),
        }
        self.version += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LeadSource;

    fn lead(id: &str, status: LeadStatus) -> Lead {
        Lead {
            id: id.to_string(),
            name: format!("Lead {}", id),
            phone: String::new(),
            source: LeadSource::Website,
            status,
            assigned_to: None,
            created_at: None,
        }
    }

    fn ids(table: &LeadTable) -> Vec<&str> {
        table.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn test_replace_all_keeps_backend_order() {
        let table = LeadTable::from_leads(vec![
            lead("a", LeadStatus::New),
            lead("b", LeadStatus::Hot),
            lead("c", LeadStatus::Cold),
        ]);
        assert_eq!(ids(&table), vec!["a", "b", "c"]);
        assert_eq!(table.version(), 1);
    }

    #[test]
    fn test_duplicate_ids_in_snapshot_collapse() {
        let table = LeadTable::from_leads(vec![
            lead("a", LeadStatus::New),
            lead("b", LeadStatus::New),
            lead("a", LeadStatus::Hot),
        ]);
        assert_eq!(ids(&table), vec!["a", "b"]);
        assert_eq!(table.get("a").unwrap().status, LeadStatus::Hot);
    }

    #[test]
    fn test_upsert_prepends_new_and_replaces_existing_in_place() {
        let mut table = LeadTable::from_leads(vec![lead("a", LeadStatus::New), lead("b", LeadStatus::New)]);

        assert!(table.upsert(lead("z", LeadStatus::Hot)));
        assert_eq!(ids(&table), vec!["z", "a", "b"]);

        assert!(!table.upsert(lead("b", LeadStatus::Converted)));
        assert_eq!(ids(&table), vec!["z", "a", "b"]);
        assert_eq!(table.get("b").unwrap().status, LeadStatus::Converted);
    }

    #[test]
    fn test_patch_unknown_id_is_noop() {
        let mut table = LeadTable::from_leads(vec![lead("a", LeadStatus::New)]);
        let before = table.version();
        assert!(!table.patch("missing", &LeadChange::Status(LeadStatus::Hot)));
        assert_eq!(table.version(), before);
    }

    #[test]
    fn test_patch_assignee() {
        let mut table = LeadTable::from_leads(vec![lead("a", LeadStatus::New)]);
        let assignee = Assignee {
            id: "u1".to_string(),
            name: Some("Meera".to_string()),
        };
        assert!(table.patch("a", &LeadChange::Assignee(Some(assignee.clone()))));
        assert_eq!(table.get("a").unwrap().assigned_to, Some(assignee));
        assert_eq!(table.version(), 2);
    }
}
