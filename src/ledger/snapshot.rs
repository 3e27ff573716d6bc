use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::contributor::Contributor;

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

/// Serializable copy of the ledger contents exchanged with persistence adapters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerSnapshot {
    #[serde(default = "LedgerSnapshot::schema_version_default")]
    pub schema_version: u8,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub contributors: Vec<Contributor>,
}

impl LedgerSnapshot {
    pub fn new(contributors: Vec<Contributor>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            saved_at: Utc::now(),
            contributors,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty()
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }
}
