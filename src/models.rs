use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Assignee filter token and export label for leads without an assignee.
pub const UNASSIGNED: &str = "Unassigned";

// ============ Lead vocabulary ============

/// Pipeline status of a lead.
///
/// Values outside the known vocabulary are kept verbatim so they still compare
/// in filters, but they never count toward any aggregation bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeadStatus {
    New,
    Hot,
    Warm,
    Cold,
    Converted,
    Unrecognized(String),
}

impl LeadStatus {
    /// Normalizes a wire value. Absent or empty reads as `New`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => LeadStatus::New,
            Some("New") => LeadStatus::New,
            Some("Hot") => LeadStatus::Hot,
            Some("Warm") => LeadStatus::Warm,
            Some("Cold") => LeadStatus::Cold,
            Some("Converted") => LeadStatus::Converted,
            Some(other) => LeadStatus::Unrecognized(other.to_string()),
        }
    }

    /// Chart order of the recognized statuses.
    pub fn ordered() -> [LeadStatus; 5] {
        [
            LeadStatus::Hot,
            LeadStatus::Warm,
            LeadStatus::Cold,
            LeadStatus::New,
            LeadStatus::Converted,
        ]
    }

    pub fn label(&self) -> &str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Hot => "Hot",
            LeadStatus::Warm => "Warm",
            LeadStatus::Cold => "Cold",
            LeadStatus::Converted => "Converted",
            LeadStatus::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, LeadStatus::Unrecognized(_))
    }
}

impl Default for LeadStatus {
    fn default() -> Self {
        LeadStatus::New
    }
}

impl From<String> for LeadStatus {
    fn from(raw: String) -> Self {
        LeadStatus::parse(Some(&raw))
    }
}

impl From<LeadStatus> for String {
    fn from(status: LeadStatus) -> Self {
        status.label().to_string()
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Acquisition channel of a lead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeadSource {
    WhatsAppButton,
    Linktree,
    Instagram,
    Website,
    Other,
    Unrecognized(String),
}

impl LeadSource {
    /// Normalizes a wire value. Absent or empty reads as `Website`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => LeadSource::Website,
            Some("WhatsApp Button") => LeadSource::WhatsAppButton,
            Some("Linktree") => LeadSource::Linktree,
            Some("Instagram") => LeadSource::Instagram,
            Some("Website") => LeadSource::Website,
            Some("Other") => LeadSource::Other,
            Some(other) => LeadSource::Unrecognized(other.to_string()),
        }
    }

    /// Chart order of the recognized sources.
    pub fn ordered() -> [LeadSource; 5] {
        [
            LeadSource::WhatsAppButton,
            LeadSource::Linktree,
            LeadSource::Instagram,
            LeadSource::Website,
            LeadSource::Other,
        ]
    }

    /// Wire label, as stored by the backend.
    pub fn label(&self) -> &str {
        match self {
            LeadSource::WhatsAppButton => "WhatsApp Button",
            LeadSource::Linktree => "Linktree",
            LeadSource::Instagram => "Instagram",
            LeadSource::Website => "Website",
            LeadSource::Other => "Other",
            LeadSource::Unrecognized(raw) => raw,
        }
    }

    /// Short label used on charts.
    pub fn chart_label(&self) -> &str {
        match self {
            LeadSource::WhatsAppButton => "WhatsApp",
            other => other.label(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, LeadSource::Unrecognized(_))
    }
}

impl Default for LeadSource {
    fn default() -> Self {
        LeadSource::Website
    }
}

impl From<String> for LeadSource {
    fn from(raw: String) -> Self {
        LeadSource::parse(Some(&raw))
    }
}

impl From<LeadSource> for String {
    fn from(source: LeadSource) -> Self {
        source.label().to_string()
    }
}

impl fmt::Display for LeadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============ Lead records ============

/// `assignedTo` arrives either as a bare user id or as a populated user document.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum WireAssignee {
    Id(String),
    Populated {
        #[serde(rename = "_id")]
        id: String,
        #[serde(default)]
        name: Option<String>,
    },
}

/// Lead exactly as the backend sends it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLead {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<WireAssignee>,
    /// RFC 3339 string or epoch milliseconds.
    #[serde(default)]
    pub created_at: Option<Value>,
}

/// Reference to the user a lead is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: Option<String>,
}

/// A lead after ingestion: defaults filled, enums typed, timestamp parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawLead", rename_all = "camelCase")]
pub struct Lead {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub phone: String,
    pub source: LeadSource,
    pub status: LeadStatus,
    pub assigned_to: Option<Assignee>,
    /// `None` when the backend sent no usable creation time.
    pub created_at: Option<DateTime<Utc>>,
}

impl Lead {
    /// Assignee id, or `Unassigned`.
    pub fn assignee_key(&self) -> &str {
        self.assigned_to
            .as_ref()
            .map(|a| a.id.as_str())
            .unwrap_or(UNASSIGNED)
    }

    /// Assignee display name, or `Unassigned` when none is known.
    pub fn assignee_name(&self) -> &str {
        self.assigned_to
            .as_ref()
            .and_then(|a| a.name.as_deref())
            .unwrap_or(UNASSIGNED)
    }
}

impl From<RawLead> for Lead {
    fn from(raw: RawLead) -> Self {
        let assigned_to = raw.assigned_to.and_then(|a| match a {
            WireAssignee::Id(id) if id.trim().is_empty() => None,
            WireAssignee::Id(id) => Some(Assignee { id, name: None }),
            WireAssignee::Populated { id, name } => Some(Assignee { id, name }),
        });

        let created_at = raw.created_at.as_ref().and_then(parse_timestamp);
        if raw.created_at.is_some() && created_at.is_none() {
            tracing::debug!("Lead {} has an unparseable createdAt", raw.id);
        }

        Lead {
            id: raw.id,
            name: raw.name.unwrap_or_default(),
            phone: raw.phone.unwrap_or_default(),
            source: LeadSource::parse(raw.source.as_deref()),
            status: LeadStatus::parse(raw.status.as_deref()),
            assigned_to,
            created_at,
        }
    }
}

/// Parses an RFC 3339 string or epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok(),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

/// Partial lead update sent as `PATCH /lead/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

impl LeadPatch {
    pub fn status(status: LeadStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn assignee(user_id: impl Into<String>) -> Self {
        Self {
            assigned_to: Some(user_id.into()),
            ..Default::default()
        }
    }
}

// ============ Reference data ============

/// Reads `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_units: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sold_units: i64,
}

impl Project {
    /// Stand-in used when the backend has no projects.
    pub fn placeholder() -> Self {
        Self {
            id: String::new(),
            title: "No Projects Found".to_string(),
            total_units: 100,
            sold_units: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VisitStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    Other(String),
}

/// An absent status matches nothing in the vocabulary.
impl Default for VisitStatus {
    fn default() -> Self {
        VisitStatus::Other(String::new())
    }
}

impl VisitStatus {
    pub fn is_upcoming(&self) -> bool {
        matches!(self, VisitStatus::Scheduled | VisitStatus::Confirmed)
    }
}

impl From<String> for VisitStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Scheduled" => VisitStatus::Scheduled,
            "Confirmed" => VisitStatus::Confirmed,
            "Completed" => VisitStatus::Completed,
            "Cancelled" => VisitStatus::Cancelled,
            _ => VisitStatus::Other(raw),
        }
    }
}

impl From<VisitStatus> for String {
    fn from(status: VisitStatus) -> Self {
        match status {
            VisitStatus::Scheduled => "Scheduled".to_string(),
            VisitStatus::Confirmed => "Confirmed".to_string(),
            VisitStatus::Completed => "Completed".to_string(),
            VisitStatus::Cancelled => "Cancelled".to_string(),
            VisitStatus::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: VisitStatus,
}

/// Site attendance record; fields other than the id pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Body of `POST /attendance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttendance {
    pub shift: String,
    #[serde(default)]
    pub present: u32,
    #[serde(default)]
    pub absent: u32,
}

/// Site expense record; fields other than the id pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
