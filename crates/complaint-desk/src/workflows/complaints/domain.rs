use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Public reference handed to complainants, formatted `REF-####`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComplaintId(pub String);

pub const REFERENCE_PREFIX: &str = "REF-";

impl ComplaintId {
    /// Draw a random reference in `REF-1000..=REF-9999`. Uniqueness is the caller's concern.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let number: u16 = rng.gen_range(1000..=9999);
        Self(format!("{REFERENCE_PREFIX}{number}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        match self.0.strip_prefix(REFERENCE_PREFIX) {
            Some(digits) => digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit()),
            None => false,
        }
    }

    /// Case-insensitive comparison against user-typed input.
    pub fn matches(&self, raw: &str) -> bool {
        self.0.eq_ignore_ascii_case(raw.trim())
    }
}

impl fmt::Display for ComplaintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which intake form produced the submission. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplaintType {
    Client,
    Employee,
    External,
}

impl ComplaintType {
    pub const fn label(self) -> &'static str {
        match self {
            ComplaintType::Client => "client",
            ComplaintType::Employee => "employee",
            ComplaintType::External => "external",
        }
    }

    /// Department keys offered by each form.
    pub const fn department_options(self) -> &'static [&'static str] {
        match self {
            ComplaintType::Client => &["commercial", "finance", "logistique", "autre"],
            ComplaintType::Employee => &["rh", "it", "production", "maintenance", "finance", "autre"],
            ComplaintType::External => &["achats", "logistique", "dg", "autre"],
        }
    }
}

pub const RELATION_TYPE_OPTIONS: &[&str] = &[
    "client-direct",
    "client-indirect",
    "distributor",
    "retailer",
    "other",
];

impl fmt::Display for ComplaintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown complaint type '{0}' (expected client, employee or external)")]
pub struct UnknownComplaintType(pub String);

impl FromStr for ComplaintType {
    type Err = UnknownComplaintType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(ComplaintType::Client),
            "employee" => Ok(ComplaintType::Employee),
            "external" => Ok(ComplaintType::External),
            _ => Err(UnknownComplaintType(raw.to_string())),
        }
    }
}

/// Stored review status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplaintStatus {
    Pending,
    Accepted,
    Declined,
    Appeal,
}

impl ComplaintStatus {
    pub const ALL: [ComplaintStatus; 4] = [
        ComplaintStatus::Pending,
        ComplaintStatus::Accepted,
        ComplaintStatus::Declined,
        ComplaintStatus::Appeal,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::Accepted => "accepted",
            ComplaintStatus::Declined => "declined",
            ComplaintStatus::Appeal => "appeal",
        }
    }

    /// Outcome of applying a reviewer decision to a record in this status.
    pub fn review(self, decision: ReviewDecision) -> ReviewTransition {
        let target = decision.target_status();
        match self {
            ComplaintStatus::Pending | ComplaintStatus::Appeal => ReviewTransition::Apply(target),
            current if current == target => ReviewTransition::Unchanged,
            _ => ReviewTransition::Rejected,
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ComplaintStatus {
    type Err = UnknownStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        ComplaintStatus::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| UnknownStatus(raw.to_string()))
    }
}

/// Reviewer actions available from the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Accept,
    Decline,
}

impl ReviewDecision {
    pub const fn target_status(self) -> ComplaintStatus {
        match self {
            ReviewDecision::Accept => ComplaintStatus::Accepted,
            ReviewDecision::Decline => ComplaintStatus::Declined,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewTransition {
    Apply(ComplaintStatus),
    Unchanged,
    Rejected,
}

/// Display status. `DeclinedFinal` is a decline on a record that already went through appeal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLabel {
    Pending,
    Accepted,
    Declined,
    DeclinedFinal,
    Appeal,
}

impl StatusLabel {
    pub const fn key(self) -> &'static str {
        match self {
            StatusLabel::Pending => "pending",
            StatusLabel::Accepted => "accepted",
            StatusLabel::Declined => "declined",
            StatusLabel::DeclinedFinal => "declined_final",
            StatusLabel::Appeal => "appeal",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Appeal attached when a declined record is contested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppealData {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    pub date: NaiveDate,
}

/// Optional contact and incident fields. Which ones apply depends on the complaint type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Department on our side that an external party dealt with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schb_department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persons_involved: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "incident_format"
    )]
    pub incident_date: Option<NaiveDateTime>,
    #[serde(default = "default_anonymous")]
    pub anonymous: bool,
}

fn default_anonymous() -> bool {
    true
}

impl Default for ContactDetails {
    fn default() -> Self {
        Self {
            full_name: None,
            company: None,
            phone: None,
            order_number: None,
            department: None,
            schb_department: None,
            relation_type: None,
            employee_id: None,
            position: None,
            supervisor: None,
            location: None,
            persons_involved: None,
            incident_date: None,
            anonymous: default_anonymous(),
        }
    }
}

/// The persisted complaint record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: ComplaintId,
    #[serde(rename = "type")]
    pub complaint_type: ComplaintType,
    pub status: ComplaintStatus,
    pub date_submitted: NaiveDate,
    pub email: String,
    #[serde(flatten)]
    pub details: ContactDetails,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, rename = "appealData", skip_serializing_if = "Option::is_none")]
    pub appeal: Option<AppealData>,
}

impl Submission {
    pub fn status_label(&self) -> StatusLabel {
        match self.status {
            ComplaintStatus::Pending => StatusLabel::Pending,
            ComplaintStatus::Accepted => StatusLabel::Accepted,
            ComplaintStatus::Declined if self.appeal.is_some() => StatusLabel::DeclinedFinal,
            ComplaintStatus::Declined => StatusLabel::Declined,
            ComplaintStatus::Appeal => StatusLabel::Appeal,
        }
    }

    /// A single appeal is allowed, and only against a first decline.
    pub fn appeal_available(&self) -> bool {
        self.status == ComplaintStatus::Declined && self.appeal.is_none()
    }
}

/// `datetime-local` style timestamps (`2026-01-05T10:30`), seconds optional.
pub(crate) mod incident_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";
    const SECOND_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub(crate) fn parse(raw: &str) -> Result<NaiveDateTime, String> {
        let trimmed = raw.trim();
        NaiveDateTime::parse_from_str(trimmed, MINUTE_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(trimmed, SECOND_FORMAT))
            .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DDTHH:MM ({err})"))
    }

    pub(crate) fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(MINUTE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;
        match opt {
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse(&raw).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
