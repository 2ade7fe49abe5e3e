//! Reversible record identifiers.
//!
//! A record's id is the URL-safe base64 of its natural key, so re-ingesting the
//! same URL always lands on the same id and the URL can be read back out of
//! the id without a lookup table.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{RecordError, RecordResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Derive the id for a natural key. Deterministic across processes and runs.
    pub fn derive(natural_key: &str) -> RecordResult<Self> {
        if natural_key.is_empty() {
            return Err(RecordError::EmptyKey);
        }
        Ok(Self(URL_SAFE.encode(natural_key.as_bytes())))
    }

    /// Accept an externally supplied id, rejecting anything that does not decode.
    pub fn parse(raw: &str) -> RecordResult<Self> {
        let id = Self(raw.to_string());
        id.recover()?;
        Ok(id)
    }

    /// Decode the natural key this id was derived from.
    pub fn recover(&self) -> RecordResult<String> {
        let bytes = URL_SAFE.decode(&self.0).map_err(|e| self.invalid(e.to_string()))?;
        let key = String::from_utf8(bytes).map_err(|e| self.invalid(e.to_string()))?;
        if key.is_empty() {
            return Err(self.invalid("decodes to an empty key".to_string()));
        }
        Ok(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn invalid(&self, reason: String) -> RecordError {
        RecordError::InvalidId {
            id: self.0.clone(),
            reason,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for RecordId {
    type Err = RecordError;

    fn from_str(s: &str) -> RecordResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RecordId {
    type Error = RecordError;

    fn try_from(value: String) -> RecordResult<Self> {
        Self::parse(&value)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}
