//! Landing-page contact form and counter-staff lead registration: incoming
//! shapes, validation and the normalized payloads forwarded to webhooks.

use crate::domain::error::{AppError, ValidationIssue};
use crate::domain::model::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DEFAULT_UTM_MEDIUM: &str = "organic";
const DEFAULT_UTM_CAMPAIGN: &str = "link-bio";
const DEFAULT_UTM_CONTENT: &str = "button-whatsapp";
const BRAZIL_COUNTRY_CODE: &str = "55";

pub const LEAD_ORIGINS: &[&str] = &[
    "Instagram",
    "Messenger",
    "Whatsapp",
    "Indicação",
    "Ligação",
    "Balcão",
    "Google Meu Negócio",
    "Banner Externo",
    "Flyer",
    "Evento",
    "Parceria Comercial",
    "Reativação de Cliente Antigo",
];

pub const LEAD_MEDIUMS: &[&str] = &["Pago", "Orgânico"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingForm {
    #[serde(rename = "trafficSource")]
    pub traffic_source: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub fbclid: Option<String>,
    pub gclid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "submittedAt", alias = "createdAt")]
    pub submitted_at: Option<String>,
    pub tracking: Option<TrackingForm>,
}

/// The landing page posts `{ "body": { ... } }`; other clients post the form
/// directly.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContactEnvelope {
    Wrapped { body: ContactForm },
    Flat(ContactForm),
}

impl ContactEnvelope {
    pub fn into_form(self) -> ContactForm {
        match self {
            Self::Wrapped { body } => body,
            Self::Flat(form) => form,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tracking {
    #[serde(rename = "trafficSource")]
    pub traffic_source: String,
    pub utm_source: String,
    pub utm_medium: String,
    pub utm_campaign: String,
    pub utm_term: Option<String>,
    pub utm_content: String,
    pub fbclid: Option<String>,
    pub gclid: Option<String>,
}

/// What the contact webhook receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactSubmission {
    pub name: String,
    pub phone: String,
    #[serde(rename = "submittedAt")]
    pub submitted_at: String,
    pub tracking: Tracking,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLeadForm {
    pub name: Option<String>,
    pub whatsapp: Option<String>,
    pub origin: Option<String>,
    pub medium: Option<String>,
}

/// What the new-lead webhook receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewLeadSubmission {
    pub name: String,
    pub whatsapp: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(rename = "submittedAt")]
    pub submitted_at: String,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Strips the input mask: `(61) 3142-4384` -> `6131424384`.
pub fn phone_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Area code plus number, optionally prefixed with the country code.
pub fn is_valid_phone(digits: &str) -> bool {
    (10..=13).contains(&digits.len())
}

/// WhatsApp numbers are forwarded with the country code.
pub fn normalize_whatsapp(raw: &str) -> String {
    let digits = phone_digits(raw);
    if digits.len() <= 11 {
        format!("{BRAZIL_COUNTRY_CODE}{digits}")
    } else {
        digits
    }
}

impl ContactForm {
    /// Collects every issue before failing; `now` stamps submissions that
    /// arrive without a timestamp.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ContactSubmission, AppError> {
        let mut issues = Vec::new();

        let name = non_blank(self.name.as_deref());
        if name.is_none() {
            issues.push(ValidationIssue::new("name", "Informe o nome"));
        }

        let phone = self.phone.as_deref().map(phone_digits);
        match &phone {
            None => issues.push(ValidationIssue::new("phone", "Informe o telefone")),
            Some(digits) if !is_valid_phone(digits) => {
                issues.push(ValidationIssue::new("phone", "Informe um telefone válido"))
            }
            Some(_) => {}
        }

        let submitted_at = match non_blank(self.submitted_at.as_deref()) {
            None => Some(now),
            Some(raw) => {
                let parsed = parse_timestamp(&raw);
                if parsed.is_none() {
                    issues.push(ValidationIssue::new("submittedAt", "Data de envio inválida"));
                }
                parsed
            }
        };

        let tracking = self.tracking.unwrap_or_default();
        let traffic_source = non_blank(tracking.traffic_source.as_deref());
        if traffic_source.is_none() {
            issues.push(ValidationIssue::new(
                "tracking.trafficSource",
                "Origem do tráfego obrigatória",
            ));
        }

        match (name, phone, submitted_at, traffic_source) {
            (Some(name), Some(phone), Some(submitted_at), Some(traffic_source))
                if issues.is_empty() =>
            {
                Ok(ContactSubmission {
                    name,
                    phone,
                    submitted_at: format_timestamp(submitted_at),
                    tracking: Tracking {
                        utm_source: non_blank(tracking.utm_source.as_deref())
                            .unwrap_or_else(|| traffic_source.clone()),
                        utm_medium: non_blank(tracking.utm_medium.as_deref())
                            .unwrap_or_else(|| DEFAULT_UTM_MEDIUM.to_string()),
                        utm_campaign: non_blank(tracking.utm_campaign.as_deref())
                            .unwrap_or_else(|| DEFAULT_UTM_CAMPAIGN.to_string()),
                        utm_term: non_blank(tracking.utm_term.as_deref()),
                        utm_content: non_blank(tracking.utm_content.as_deref())
                            .unwrap_or_else(|| DEFAULT_UTM_CONTENT.to_string()),
                        fbclid: non_blank(tracking.fbclid.as_deref()),
                        gclid: non_blank(tracking.gclid.as_deref()),
                        traffic_source,
                    },
                })
            }
            _ => Err(AppError::Validation(issues)),
        }
    }
}

impl NewLeadForm {
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewLeadSubmission, AppError> {
        let mut issues = Vec::new();

        let name = non_blank(self.name.as_deref());
        if name.is_none() {
            issues.push(ValidationIssue::new("name", "Informe o nome"));
        }

        let whatsapp = non_blank(self.whatsapp.as_deref());
        if let Some(raw) = &whatsapp {
            if !is_valid_phone(&phone_digits(raw)) {
                issues.push(ValidationIssue::new("whatsapp", "Informe um WhatsApp válido"));
            }
        }

        let origin = non_blank(self.origin.as_deref());
        if origin.as_deref().is_some_and(|o| !LEAD_ORIGINS.contains(&o)) {
            issues.push(ValidationIssue::new("origin", "Selecione uma origem válida"));
        }

        let medium = non_blank(self.medium.as_deref());
        if medium.as_deref().is_some_and(|m| !LEAD_MEDIUMS.contains(&m)) {
            issues.push(ValidationIssue::new("medium", "Selecione um meio válido"));
        }

        match name {
            Some(name) if issues.is_empty() => Ok(NewLeadSubmission {
                name,
                whatsapp: whatsapp.as_deref().map(normalize_whatsapp),
                utm_source: origin.clone(),
                utm_medium: medium.clone(),
                origin,
                medium,
                submitted_at: format_timestamp(now),
            }),
            _ => Err(AppError::Validation(issues)),
        }
    }
}
