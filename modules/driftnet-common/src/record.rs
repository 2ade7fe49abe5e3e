use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use typed_builder::TypedBuilder;

use crate::domain::{derive_domain, parse_web_url};
use crate::error::{RecordError, RecordResult};
use crate::geo::{locations_from_value, GeoPoint};
use crate::id::RecordId;
use crate::time::timestamp_from_value;

/// A scraped web page, stored under the id derived from its URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct WebPage {
    pub id: RecordId,
    /// Natural key.
    #[builder(setter(into))]
    pub url: String,
    #[builder(setter(into))]
    pub domain: String,
    /// Paragraph text, newline-joined in document order.
    #[builder(setter(into))]
    pub text: String,
    /// Raw fetched markup. Stored, never searched.
    #[builder(setter(into))]
    pub html: String,
    #[builder(default)]
    #[serde(default)]
    pub labels: Vec<String>,
    pub captured_at: DateTime<Utc>,
    #[builder(default)]
    #[serde(default)]
    pub geo: Vec<GeoPoint>,
}

impl WebPage {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Trim, drop empties, and dedupe labels while keeping first-seen order.
pub fn normalize_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        let label = label.as_ref().trim();
        if !label.is_empty() && !out.iter().any(|l| l == label) {
            out.push(label.to_string());
        }
    }
    out
}

/// Loosely-typed page as it arrives over JSON. Timestamps and geopoints may be
/// in any supported representation; [`RawWebPage::into_record`] normalizes them.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWebPage {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub labels: Value,
    #[serde(default, alias = "now")]
    pub captured_at: Option<Value>,
    #[serde(default, alias = "locations")]
    pub geo: Value,
}

impl RawWebPage {
    pub fn into_record(self) -> RecordResult<WebPage> {
        parse_web_url(&self.url)?;
        let id = RecordId::derive(&self.url)?;
        if let Some(supplied) = self.id {
            if supplied != id.as_str() {
                return Err(RecordError::InvalidId {
                    id: supplied,
                    reason: "does not encode the page URL".to_string(),
                });
            }
        }

        let domain = match self.domain {
            Some(d) => d,
            None => derive_domain(&self.url)?,
        };

        let labels = match self.labels {
            Value::Null => Vec::new(),
            Value::String(s) => normalize_labels([s]),
            Value::Array(items) => {
                let strings = items
                    .iter()
                    .map(|v| {
                        v.as_str().ok_or_else(|| RecordError::InvalidField {
                            field: "labels",
                            reason: format!("expected string, got {v}"),
                        })
                    })
                    .collect::<RecordResult<Vec<&str>>>()?;
                normalize_labels(strings)
            }
            other => {
                return Err(RecordError::InvalidField {
                    field: "labels",
                    reason: format!("expected string or list, got {other}"),
                })
            }
        };

        let captured_at = match self.captured_at {
            Some(v) if !v.is_null() => timestamp_from_value(&v)?,
            _ => Utc::now(),
        };

        Ok(WebPage {
            id,
            url: self.url,
            domain,
            text: self.text,
            html: self.html,
            labels,
            captured_at,
            geo: locations_from_value(&self.geo)?,
        })
    }
}

impl TryFrom<RawWebPage> for WebPage {
    type Error = RecordError;

    fn try_from(raw: RawWebPage) -> RecordResult<Self> {
        raw.into_record()
    }
}
