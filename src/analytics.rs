//! Lead distribution metrics for the status/source charts.

use crate::models::{Lead, LeadSource, LeadStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One chart segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSlice {
    pub name: String,
    pub value: usize,
    pub color: &'static str,
}

/// Which breakdown feeds the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChartView {
    #[default]
    Status,
    Source,
}

pub fn status_color(status: &LeadStatus) -> &'static str {
    match status {
        LeadStatus::Hot => "#ef4444",
        LeadStatus::Warm => "#f97316",
        LeadStatus::Cold => "#3b82f6",
        LeadStatus::New => "#A0A0A0",
        LeadStatus::Converted => "#10B981",
        LeadStatus::Unrecognized(_) => "#3b82f6",
    }
}

pub fn source_color(source: &LeadSource) -> &'static str {
    match source {
        LeadSource::WhatsAppButton => "#25D366",
        LeadSource::Linktree => "#43E660",
        LeadSource::Instagram => "#E1306C",
        LeadSource::Website => "#3b82f6",
        LeadSource::Other => "#A0A0A0",
        LeadSource::Unrecognized(_) => "#A0A0A0",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadMetrics {
    /// Size of the full lead list, including unrecognized values.
    pub total: usize,
    /// Every recognized status, zeros included.
    pub status_counts: HashMap<LeadStatus, usize>,
    /// Every recognized source, zeros included.
    pub source_counts: HashMap<LeadSource, usize>,
    pub status_chart: Vec<ChartSlice>,
    pub source_chart: Vec<ChartSlice>,
}

impl LeadMetrics {
    /// Aggregates over the full lead list. Leads with an unrecognized status
    /// or source are left out of that breakdown.
    pub fn compute<'a, I>(leads: I) -> Self
    where
        I: IntoIterator<Item = &'a Lead>,
    {
        let mut status_counts: HashMap<LeadStatus, usize> =
            LeadStatus::ordered().into_iter().map(|s| (s, 0)).collect();
        let mut source_counts: HashMap<LeadSource, usize> =
            LeadSource::ordered().into_iter().map(|s| (s, 0)).collect();
        let mut total = 0;

        for lead in leads {
            total += 1;
            if let Some(count) = status_counts.get_mut(&lead.status) {
                *count += 1;
            }
            if let Some(count) = source_counts.get_mut(&lead.source) {
                *count += 1;
            }
        }

        let status_chart = LeadStatus::ordered()
            .into_iter()
            .filter_map(|status| {
                let value = status_counts.get(&status).copied().unwrap_or(0);
                (value > 0).then(|| ChartSlice {
                    name: status.label().to_string(),
                    value,
                    color: status_color(&status),
                })
            })
            .collect();

        let source_chart = LeadSource::ordered()
            .into_iter()
            .filter_map(|source| {
                let value = source_counts.get(&source).copied().unwrap_or(0);
                (value > 0).then(|| ChartSlice {
                    name: source.chart_label().to_string(),
                    value,
                    color: source_color(&source),
                })
            })
            .collect();

        Self {
            total,
            status_counts,
            source_counts,
            status_chart,
            source_chart,
        }
    }

    pub fn status_count(&self, status: &LeadStatus) -> usize {
        self.status_counts.get(status).copied().unwrap_or(0)
    }

    pub fn source_count(&self, source: &LeadSource) -> usize {
        self.source_counts.get(source).copied().unwrap_or(0)
    }

    /// Chart data for the current view.
    pub fn chart(&self, view: ChartView) -> &[ChartSlice] {
        match view {
            ChartView::Status => &self.status_chart,
            ChartView::Source => &self.source_chart,
        }
    }

    /// Indicator color for the selected status card: the status slice color
    /// when that slice is on the chart, otherwise blue.
    pub fn highlight_color(&self, view: ChartView, selected: &LeadStatus) -> &'static str {
        match view {
            ChartView::Status => self
                .status_chart
                .iter()
                .find(|slice| slice.name == selected.label())
                .map(|slice| slice.color)
                .unwrap_or("#3b82f6"),
            ChartView::Source => "#3b82f6",
        }
    }
}
