use crate::errors::AppError;
use crate::lead_actions::LeadSelection;
use crate::lead_table::LeadTable;
use crate::models::Lead;

pub const EXPORT_FILE_NAME: &str = "leads_export.csv";

const HEADER: [&str; 6] = ["Name", "Phone", "Source", "Status", "Assigned To", "Date"];

/// Picks the rows to export: the selected leads when any are selected,
/// otherwise the filtered view.
pub fn export_rows<'a>(
    table: &'a LeadTable,
    selection: &LeadSelection,
    filtered: &'a [Lead],
) -> Vec<&'a Lead> {
    if selection.is_empty() {
        filtered.iter().collect()
    } else {
        table.iter().filter(|l| selection.contains(&l.id)).collect()
    }
}

/// Renders leads as CSV, one row per lead, in the given order.
pub fn leads_to_csv<'a>(leads: impl IntoIterator<Item = &'a Lead>) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;

    let mut rows = 0usize;
    for lead in leads {
        let date = lead
            .created_at
            .map(|t| t.format("%-m/%-d/%Y").to_string())
            .unwrap_or_default();
        writer.write_record([
            lead.name.as_str(),
            lead.phone.as_str(),
            lead.source.label(),
            lead.status.label(),
            lead.assignee_name(),
            date.as_str(),
        ])?;
        rows += 1;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::InternalError(format!("CSV flush failed: {}", e)))?;
    tracing::info!("Exported {} lead(s) to CSV", rows);

    String::from_utf8(bytes)
        .map_err(|e| AppError::InternalError(format!("CSV output is not UTF-8: {}", e)))
}
