use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::domain::{ComplaintType, ContactDetails, RELATION_TYPE_OPTIONS};
use super::sanitize::{evidence_name, non_blank, sanitize_name, sanitize_phone};

/// Inline validation failures. Each one blocks the current wizard step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("'{value}' is not a valid e-mail address")]
    InvalidEmail { value: String },
    #[error("incident date must be on or after {earliest}")]
    IncidentTooEarly { earliest: NaiveDateTime },
    #[error("'{value}' is not an allowed {field}")]
    UnknownOption { field: &'static str, value: String },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field } | ValidationError::UnknownOption { field, .. } => {
                field
            }
            ValidationError::InvalidEmail { .. } => "email",
            ValidationError::IncidentTooEarly { .. } => "incidentDate",
        }
    }
}

/// Incidents reported through the desk cannot predate its opening.
pub fn earliest_incident() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Lightweight shape check; ownership is proven by the one-time code, not here.
pub fn validate_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(ValidationError::MissingField { field: "email" });
    }

    let invalid = || ValidationError::InvalidEmail {
        value: email.to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let domain_ok = domain
        .split('.')
        .all(|label| !label.is_empty())
        && domain.contains('.');
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    Ok(email.to_string())
}

/// Form payload submitted at the FormEntry step. The e-mail is not part of it: the
/// wizard pins the verified contact address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintForm {
    #[serde(flatten)]
    pub details: ContactDetails,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub evidence: Option<String>,
}

/// Sanitized fields ready to be stamped into a `Submission`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedForm {
    pub details: ContactDetails,
    pub description: String,
    pub evidence: Option<String>,
}

impl ComplaintForm {
    /// Sanitize, drop fields the type's form does not offer, and enforce required ones.
    pub fn validate(self, complaint_type: ComplaintType) -> Result<ValidatedForm, ValidationError> {
        let ComplaintForm {
            details,
            description,
            evidence,
        } = self;

        let description = description.trim().to_string();
        if description.is_empty() {
            return Err(ValidationError::MissingField {
                field: "description",
            });
        }

        let names = |value: Option<String>| non_blank(value.map(|raw| sanitize_name(&raw)));
        let phone = non_blank(details.phone.map(|raw| sanitize_phone(&raw)));
        let department = non_blank(details.department);
        let incident_date = details.incident_date;

        let details = match complaint_type {
            ComplaintType::Client => ContactDetails {
                full_name: names(details.full_name),
                company: non_blank(details.company),
                phone,
                order_number: non_blank(details.order_number),
                department,
                relation_type: non_blank(details.relation_type),
                incident_date,
                anonymous: details.anonymous,
                ..ContactDetails::default()
            },
            ComplaintType::Employee => ContactDetails {
                employee_id: non_blank(details.employee_id),
                department,
                position: non_blank(details.position),
                supervisor: names(details.supervisor),
                location: non_blank(details.location),
                persons_involved: names(details.persons_involved),
                incident_date,
                anonymous: details.anonymous,
                ..ContactDetails::default()
            },
            ComplaintType::External => ContactDetails {
                full_name: names(details.full_name),
                phone,
                schb_department: non_blank(details.schb_department),
                persons_involved: names(details.persons_involved),
                incident_date,
                anonymous: details.anonymous,
                ..ContactDetails::default()
            },
        };

        for field in required_fields(complaint_type) {
            if !is_present(&details, field) {
                return Err(ValidationError::MissingField { field });
            }
        }

        if let Some(incident) = details.incident_date {
            let earliest = earliest_incident();
            if incident < earliest {
                return Err(ValidationError::IncidentTooEarly { earliest });
            }
        }

        for (field, value) in [
            ("department", &details.department),
            ("schbDepartment", &details.schb_department),
        ] {
            if let Some(value) = value {
                if !complaint_type.department_options().contains(&value.as_str()) {
                    return Err(ValidationError::UnknownOption {
                        field,
                        value: value.clone(),
                    });
                }
            }
        }

        if let Some(value) = &details.relation_type {
            if !RELATION_TYPE_OPTIONS.contains(&value.as_str()) {
                return Err(ValidationError::UnknownOption {
                    field: "relationType",
                    value: value.clone(),
                });
            }
        }

        Ok(ValidatedForm {
            details,
            description,
            evidence: evidence.as_deref().and_then(evidence_name),
        })
    }
}

pub fn required_fields(complaint_type: ComplaintType) -> &'static [&'static str] {
    match complaint_type {
        ComplaintType::Client => &["fullName", "phone", "incidentDate"],
        ComplaintType::Employee => &["employeeId", "incidentDate"],
        ComplaintType::External => &["fullName", "incidentDate"],
    }
}

fn is_present(details: &ContactDetails, field: &str) -> bool {
    match field {
        "fullName" => details.full_name.is_some(),
        "phone" => details.phone.is_some(),
        "employeeId" => details.employee_id.is_some(),
        "incidentDate" => details.incident_date.is_some(),
        _ => true,
    }
}
