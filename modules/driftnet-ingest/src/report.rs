use std::fmt;

use driftnet_common::RecordId;
use serde::Serialize;

/// Where a key's processing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Derive,
    Fetch,
    Extract,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Derive => "derive",
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
        })
    }
}

/// Terminal state of one natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum KeyOutcome {
    /// Already present; nothing was fetched.
    Skipped { id: RecordId },
    Stored { id: RecordId },
    Failed { stage: Stage, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyReport {
    pub key: String,
    #[serde(flatten)]
    pub outcome: KeyOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub keys: Vec<KeyReport>,
    /// Keys handed to the renderer, successful or not.
    pub fetched: usize,
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    pub(crate) fn record(&mut self, key: &str, outcome: KeyOutcome) {
        match &outcome {
            KeyOutcome::Skipped { .. } => self.skipped += 1,
            KeyOutcome::Stored { .. } => self.stored += 1,
            KeyOutcome::Failed { .. } => self.failed += 1,
        }
        self.keys.push(KeyReport {
            key: key.to_string(),
            outcome,
        });
    }

    pub fn outcome(&self, key: &str) -> Option<&KeyOutcome> {
        self.keys.iter().find(|r| r.key == key).map(|r| &r.outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = &KeyReport> {
        self.keys
            .iter()
            .filter(|r| matches!(r.outcome, KeyOutcome::Failed { .. }))
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}
