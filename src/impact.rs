//! Summary card for the selected lead status.

use crate::analytics::ChartView;
use crate::models::{LeadStatus, Project, Visit};
use serde::Serialize;

pub const COLD_TIP: &str =
    "Send a re-engagement email sequence highlighting new project amenities.";
pub const HOT_TIP: &str = "Schedule personal site visits immediately. Urgency closes deals.";
pub const DEFAULT_TIP: &str = "Add to monthly newsletter for long-term brand awareness.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactSummary {
    pub project_name: String,
    /// Unsold units; negative when more units are sold than exist.
    pub availability: i64,
    pub sold_percentage: i64,
    pub upcoming_visits: usize,
    pub strategy_tip: &'static str,
}

/// Only `Cold` and `Hot` get their own advice.
pub fn strategy_tip(selected: &LeadStatus) -> &'static str {
    match selected {
        LeadStatus::Cold => COLD_TIP,
        LeadStatus::Hot => HOT_TIP,
        _ => DEFAULT_TIP,
    }
}

/// `round(sold / total * 100)`, or 0 when there are no units.
pub fn sold_percentage(sold: i64, total: i64) -> i64 {
    if total == 0 {
        return 0;
    }
    (sold as f64 / total as f64 * 100.0).round() as i64
}

pub fn derive_impact(projects: &[Project], visits: &[Visit], selected: &LeadStatus) -> ImpactSummary {
    let placeholder;
    let project = match projects.first() {
        Some(project) => project,
        None => {
            placeholder = Project::placeholder();
            &placeholder
        }
    };

    ImpactSummary {
        project_name: project.title.clone(),
        availability: project.total_units - project.sold_units,
        sold_percentage: sold_percentage(project.sold_units, project.total_units),
        upcoming_visits: visits.iter().filter(|v| v.status.is_upcoming()).count(),
        strategy_tip: strategy_tip(selected),
    }
}

/// Chart interaction state that drives the impact card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSelection {
    pub view: ChartView,
    pub selected_status: LeadStatus,
}

impl Default for ChartSelection {
    fn default() -> Self {
        Self {
            view: ChartView::Status,
            selected_status: LeadStatus::Cold,
        }
    }
}

impl ChartSelection {
    pub fn set_view(&mut self, view: ChartView) {
        self.view = view;
    }

    /// Selecting a segment only changes the status while the status breakdown
    /// is shown. Returns whether the selection changed.
    pub fn select_segment(&mut self, label: &str) -> bool {
        if self.view != ChartView::Status {
            return false;
        }
        let status = LeadStatus::parse(Some(label));
        if status == self.selected_status {
            return false;
        }
        self.selected_status = status;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VisitStatus;

    fn project(total: i64, sold: i64) -> Project {
        Project {
            id: "p1".to_string(),
            title: "Saffron Greens".to_string(),
            total_units: total,
            sold_units: sold,
        }
    }

    fn visit(status: &str) -> Visit {
        Visit {
            id: String::new(),
            status: VisitStatus::from(status.to_string()),
        }
    }

    #[test]
    fn test_impact_scenario() {
        let visits = vec![visit("Scheduled"), visit("Completed"), visit("Confirmed")];
        let impact = derive_impact(&[project(100, 45)], &visits, &LeadStatus::Cold);

        assert_eq!(impact.project_name, "Saffron Greens");
        assert_eq!(impact.availability, 55);
        assert_eq!(impact.sold_percentage, 45);
        assert_eq!(impact.upcoming_visits, 2);
        assert_eq!(impact.strategy_tip, COLD_TIP);
    }

    #[test]
    fn test_only_first_project_is_used() {
        let impact = derive_impact(&[project(10, 1), project(50, 50)], &[], &LeadStatus::Hot);
        assert_eq!(impact.availability, 9);
        assert_eq!(impact.sold_percentage, 10);
    }

    #[test]
    fn test_placeholder_project_when_empty() {
        let impact = derive_impact(&[], &[], &LeadStatus::New);
        assert_eq!(impact.project_name, "No Projects Found");
        assert_eq!(impact.availability, 100);
        assert_eq!(impact.sold_percentage, 0);
        assert_eq!(impact.upcoming_visits, 0);
    }

    #[test]
    fn test_zero_total_and_oversold() {
        let impact = derive_impact(&[project(0, 0)], &[], &LeadStatus::New);
        assert_eq!(impact.sold_percentage, 0);

        let impact = derive_impact(&[project(10, 12)], &[], &LeadStatus::New);
        assert_eq!(impact.availability, -2);
        assert_eq!(impact.sold_percentage, 120);
    }

    #[test]
    fn test_sold_percentage_rounds_half_up() {
        assert_eq!(sold_percentage(1, 8), 13); // 12.5
        assert_eq!(sold_percentage(1, 3), 33);
        assert_eq!(sold_percentage(2, 3), 67);
    }

    #[test]
    fn test_strategy_tips() {
        assert_eq!(strategy_tip(&LeadStatus::Hot), HOT_TIP);
        assert_eq!(strategy_tip(&LeadStatus::Cold), COLD_TIP);
        assert_eq!(strategy_tip(&LeadStatus::Warm), strategy_tip(&LeadStatus::Converted));
        assert_eq!(strategy_tip(&LeadStatus::New), DEFAULT_TIP);
    }

    #[test]
    fn test_segment_selection_disabled_in_source_view() {
        let mut selection = ChartSelection::default();
        assert_eq!(selection.selected_status, LeadStatus::Cold);

        assert!(selection.select_segment("Hot"));
        assert_eq!(selection.selected_status, LeadStatus::Hot);

        selection.set_view(ChartView::Source);
        assert!(!selection.select_segment("Warm"));
        assert_eq!(selection.selected_status, LeadStatus::Hot);
    }
}
