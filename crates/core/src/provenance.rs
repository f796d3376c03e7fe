//! # Provenance
//!
//! Who produced a file and when. Always passed in explicitly so that stamping is
//! deterministic under test.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Creator identity and creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Provenance {
    pub fn new(created_by: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            created_by: created_by.into(),
            created_at,
        }
    }

    /// Stamp with the current wall-clock time
    pub fn now(created_by: impl Into<String>) -> Self {
        Self::new(created_by, Utc::now())
    }

    /// RFC 3339 timestamp at second precision, e.g. `2025-01-31T09:30:00Z`
    pub fn timestamp(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}
