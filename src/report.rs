//! Report payloads produced by one orchestration run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one specialist's inference call. Transient — lives only for
/// the duration of a single orchestration run, before being folded into the
/// report's per-specialist fields.
#[derive(Debug, Clone)]
pub struct SpecialistResult {
    pub specialist_id: &'static str,
    /// Generated analysis text, or the upstream failure message.
    pub outcome: Result<String, String>,
    /// Which attempt produced this outcome. Always 1 today — specialist
    /// calls are not retried.
    pub attempt: u32,
}

impl SpecialistResult {
    /// The textual outcome the report retains: the analysis, or the empty
    /// placeholder when the call failed.
    pub fn text_or_empty(&self) -> &str {
        self.outcome.as_deref().unwrap_or("")
    }
}

/// Composed diagnosis payload, before persistence assigns an id.
///
/// `analyses` maps each specialist's report field (`cardiologist_analysis`,
/// …) to its outcome text — possibly the empty string for a failed call,
/// never a missing key. Serde-flattened so the stored JSON document keeps
/// the flat per-specialist field shape the presentation layer reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisReport {
    pub patient_id: String,
    #[serde(flatten)]
    pub analyses: BTreeMap<String, String>,
    pub final_diagnosis: String,
    pub created_at: DateTime<Utc>,
}

impl DiagnosisReport {
    /// Outcome text for one specialist report field, if the field exists.
    pub fn analysis(&self, report_field: &str) -> Option<&str> {
        self.analyses.get(report_field).map(String::as_str)
    }
}

/// A persisted report — [`DiagnosisReport`] plus its store-assigned id.
/// Immutable once written; the presentation layer only ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: String,
    #[serde(flatten)]
    pub report: DiagnosisReport,
}
