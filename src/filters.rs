//! Lead table filtering.
//!
//! Filters narrow the table view only. Aggregated counts are always computed
//! over the full lead list.

use crate::errors::AppError;
use crate::lead_table::LeadTable;
use crate::models::{Lead, LeadSource, LeadStatus, UNASSIGNED};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const ALL: &str = "All";

/// A criterion that is either inactive (`All`) or pinned to one value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Selection<T> {
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(expected) => expected == value,
        }
    }
}

/// Assignee criterion: any lead, only unassigned leads, or one user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssigneeFilter {
    #[default]
    All,
    Unassigned,
    User(String),
}

impl AssigneeFilter {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | ALL => AssigneeFilter::All,
            UNASSIGNED => AssigneeFilter::Unassigned,
            id => AssigneeFilter::User(id.to_string()),
        }
    }

    pub fn admits(&self, lead: &Lead) -> bool {
        match self {
            AssigneeFilter::All => true,
            AssigneeFilter::Unassigned => lead.assignee_key() == UNASSIGNED,
            AssigneeFilter::User(id) => lead.assignee_key() == id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateRange {
    #[serde(rename = "7_days")]
    Last7Days,
    #[default]
    #[serde(rename = "30_days")]
    Last30Days,
    #[serde(rename = "all_time")]
    AllTime,
}

impl DateRange {
    /// Oldest creation time still inside the range, or `None` for all time.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            DateRange::Last7Days => Some(now - Duration::days(7)),
            DateRange::Last30Days => Some(now - Duration::days(30)),
            DateRange::AllTime => None,
        }
    }
}

impl FromStr for DateRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "7_days" => Ok(DateRange::Last7Days),
            "30_days" => Ok(DateRange::Last30Days),
            "all_time" | "all" => Ok(DateRange::AllTime),
            other => Err(AppError::BadRequest(format!(
                "Unknown date range '{}', expected 7_days, 30_days or all_time",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub status: Selection<LeadStatus>,
    pub source: Selection<LeadSource>,
    pub assignee: AssigneeFilter,
    pub date_range: DateRange,
}

impl FilterCriteria {
    /// Criteria that keep every lead.
    pub fn unfiltered() -> Self {
        Self {
            date_range: DateRange::AllTime,
            ..Default::default()
        }
    }

    /// Builds criteria from raw query values; absent values mean `All`
    /// (and `30_days` for the date range).
    pub fn from_raw(
        status: Option<&str>,
        source: Option<&str>,
        assignee: Option<&str>,
        date_range: Option<&str>,
    ) -> Result<Self, AppError> {
        let status = match status.map(str::trim) {
            None | Some("") | Some(ALL) => Selection::All,
            Some(raw) => Selection::Only(LeadStatus::parse(Some(raw))),
        };
        let source = match source.map(str::trim) {
            None | Some("") | Some(ALL) => Selection::All,
            Some(raw) => Selection::Only(LeadSource::parse(Some(raw))),
        };
        let date_range = match date_range {
            None => DateRange::default(),
            Some(raw) => raw.parse()?,
        };

        Ok(Self {
            status,
            source,
            assignee: assignee.map(AssigneeFilter::parse).unwrap_or_default(),
            date_range,
        })
    }

    pub fn admits(&self, lead: &Lead, cutoff: Option<DateTime<Utc>>) -> bool {
        if !self.status.admits(&lead.status) {
            return false;
        }
        if !self.source.admits(&lead.source) {
            return false;
        }
        if !self.assignee.admits(lead) {
            return false;
        }
        match cutoff {
            None => true,
            Some(cutoff) => lead.created_at.map(|t| t >= cutoff).unwrap_or(false),
        }
    }
}

/// Returns the leads matching every active criterion, in their original order.
pub fn filter_leads<'a, I>(leads: I, criteria: &FilterCriteria, now: DateTime<Utc>) -> Vec<&'a Lead>
where
    I: IntoIterator<Item = &'a Lead>,
{
    let cutoff = criteria.date_range.cutoff(now);
    leads
        .into_iter()
        .filter(|lead| criteria.admits(lead, cutoff))
        .collect()
}

/// Caches the filtered view until the table version, the criteria or the
/// date cutoff change. A moving window therefore recomputes as `now` advances.
#[derive(Debug, Default)]
pub struct FilteredView {
    key: Option<(u64, FilterCriteria, Option<DateTime<Utc>>)>,
    leads: Vec<Lead>,
}

impl FilteredView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, table: &LeadTable, criteria: &FilterCriteria, now: DateTime<Utc>) -> &[Lead] {
        let cutoff = criteria.date_range.cutoff(now);
        let stale = match &self.key {
            Some((version, cached, cached_cutoff)) => {
                *version != table.version() || cached != criteria || *cached_cutoff != cutoff
            }
            None => true,
        };

        if stale {
            self.leads = table
                .iter()
                .filter(|lead| criteria.admits(lead, cutoff))
                .cloned()
                .collect();
            self.key = Some((table.version(), criteria.clone(), cutoff));
            tracing::debug!(
                "Recomputed filtered view: {} of {} lead(s)",
                self.leads.len(),
                table.len()
            );
        }

        &self.leads
    }
}
