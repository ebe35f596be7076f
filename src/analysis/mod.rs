//! Analysis orchestrator — fan-out, all-settle join, synthesis.
//!
//! One `analyze` run is a two-level DAG with a single synchronization point:
//!
//! ```text
//! patient record ──┬─> cardiologist  ──┐
//!                  ├─> pulmonologist ──┼─(all settle)─> synthesis ─> report
//!                  └─> psychologist  ──┘
//! ```
//!
//! The fan-out is a barrier over every registered specialist, not a race:
//! one branch failing or stalling never cancels the others, and synthesis
//! does not start until every branch has settled. Specialist failures
//! degrade to an empty outcome in the report; a synthesis failure fails the
//! whole run, because a report without a final diagnosis has no value.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::llm::LlmProvider;
use crate::patient::PatientRecord;
use crate::report::{DiagnosisReport, SpecialistResult};
use crate::specialists::{self, SpecialistDefinition};

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The final synthesis call failed — not locally recoverable.
    #[error("synthesis failed: {0}")]
    Synthesis(String),
}

/// Drives one orchestration run per [`analyze`](Orchestrator::analyze) call.
///
/// Holds only shared immutable state (the provider is an internally
/// reference-counted handle, the registry is static), so a single instance
/// serves concurrent runs without synchronization.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    provider: LlmProvider,
    registry: &'static [SpecialistDefinition],
    specialist_timeout: Duration,
}

impl Orchestrator {
    pub fn new(provider: LlmProvider, specialist_timeout: Duration) -> Self {
        Self { provider, registry: specialists::registry(), specialist_timeout }
    }

    /// Run the full pipeline for one validated patient record and return the
    /// composed report, ready for persistence.
    ///
    /// The record is serialized once; every inference call sees the same
    /// payload. Input bounds are the intake boundary's job — no validation
    /// happens here.
    pub async fn analyze(
        &self,
        patient_id: &str,
        record: &PatientRecord,
    ) -> Result<DiagnosisReport, AnalysisError> {
        let payload = record.inference_payload();

        info!(
            patient_id,
            specialists = self.registry.len(),
            "starting diagnostic analysis"
        );

        let results = self.fan_out(&payload).await;

        // Compose outcomes in registry order; completion order is irrelevant.
        let outcomes: Vec<(&SpecialistDefinition, &str)> = self
            .registry
            .iter()
            .map(|def| {
                let result = &results[def.id];
                if let Err(reason) = &result.outcome {
                    warn!(specialist = def.id, %reason, "specialist analysis degraded to empty");
                }
                (def, result.text_or_empty())
            })
            .collect();

        let synthesis = specialists::synthesis_prompt(&outcomes);
        let final_diagnosis = self
            .provider
            .complete(&synthesis, &payload)
            .await
            .map_err(|e| AnalysisError::Synthesis(e.to_string()))?;

        debug!(patient_id, diagnosis_len = final_diagnosis.len(), "synthesis complete");

        Ok(DiagnosisReport {
            patient_id: patient_id.to_string(),
            analyses: outcomes
                .iter()
                .map(|(def, text)| (def.report_field.to_string(), text.to_string()))
                .collect(),
            final_diagnosis,
            created_at: Utc::now(),
        })
    }

    /// Phase 1: issue every specialist call concurrently and wait for all of
    /// them to settle. Returns one entry per registered specialist, keyed by
    /// id — errors, timeouts and panicked tasks are captured as failed
    /// outcomes, never dropped and never aborting their siblings.
    async fn fan_out(&self, payload: &str) -> HashMap<&'static str, SpecialistResult> {
        let mut set = JoinSet::new();
        let mut task_ids = HashMap::with_capacity(self.registry.len());

        for def in self.registry {
            let provider = self.provider.clone();
            let payload = payload.to_string();
            let timeout = self.specialist_timeout;
            let handle = set.spawn(async move {
                match tokio::time::timeout(timeout, provider.complete(def.role_prompt, &payload))
                    .await
                {
                    Ok(Ok(text)) => Ok(text),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err(format!("timed out after {}s", timeout.as_secs())),
                }
            });
            task_ids.insert(handle.id(), def.id);
        }

        let mut results = HashMap::with_capacity(self.registry.len());
        while let Some(joined) = set.join_next_with_id().await {
            let (specialist_id, outcome) = match joined {
                Ok((task_id, outcome)) => (task_ids[&task_id], outcome),
                // Task panicked — degrade that specialist like any other failure.
                Err(join_err) => (task_ids[&join_err.id()], Err(join_err.to_string())),
            };
            results.insert(
                specialist_id,
                SpecialistResult { specialist_id, outcome, attempt: 1 },
            );
        }

        debug_assert_eq!(results.len(), self.registry.len());
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::scripted::ScriptedProvider;
    use crate::patient::{Gender, VitalSigns};

    fn record() -> PatientRecord {
        PatientRecord {
            patient_name: "Test Patient".into(),
            age: 45,
            gender: Gender::Male,
            symptoms: vec!["chest pain".into()],
            vital_signs: VitalSigns {
                blood_pressure_systolic: 120,
                blood_pressure_diastolic: 80,
                heart_rate: 75,
                temperature: 98.6,
            },
            medical_history: None,
        }
    }

    fn all_ok_provider() -> LlmProvider {
        LlmProvider::Scripted(
            ScriptedProvider::new()
                .reply("cardiologist", "cardio findings")
                .reply("pulmonologist", "pulmo findings")
                .reply("psychologist", "psych findings")
                .reply("diagnostician", "final assessment")
                .build(),
        )
    }

    #[tokio::test]
    async fn fan_out_settles_every_specialist() {
        let orch = Orchestrator::new(all_ok_provider(), Duration::from_secs(30));
        let results = orch.fan_out("payload").await;
        assert_eq!(results.len(), specialists::registry().len());
        for def in specialists::registry() {
            assert!(results.contains_key(def.id), "missing outcome for {}", def.id);
        }
    }

    #[tokio::test]
    async fn failed_specialist_keeps_its_key() {
        let provider = LlmProvider::Scripted(
            ScriptedProvider::new()
                .reply("cardiologist", "cardio findings")
                .reply("pulmonologist", "pulmo findings")
                .fail("psychologist", "HTTP 500: upstream")
                .build(),
        );
        let orch = Orchestrator::new(provider, Duration::from_secs(30));
        let results = orch.fan_out("payload").await;
        assert_eq!(results["psychologist"].text_or_empty(), "");
        assert_eq!(results["cardiologist"].text_or_empty(), "cardio findings");
        assert_eq!(results["psychologist"].attempt, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_specialist_times_out_to_empty() {
        let provider = LlmProvider::Scripted(
            ScriptedProvider::new()
                .reply("cardiologist", "cardio findings")
                .reply("pulmonologist", "pulmo findings")
                .reply_after("psychologist", "too late", Duration::from_secs(600))
                .build(),
        );
        let orch = Orchestrator::new(provider, Duration::from_secs(30));
        let results = orch.fan_out("payload").await;
        let psych = &results["psychologist"];
        assert_eq!(psych.text_or_empty(), "");
        assert!(psych.outcome.as_ref().unwrap_err().contains("timed out after 30s"));
    }

    #[tokio::test]
    async fn analyze_composes_report_in_registry_shape() {
        let orch = Orchestrator::new(all_ok_provider(), Duration::from_secs(30));
        let report = orch.analyze("p-42", &record()).await.unwrap();
        assert_eq!(report.patient_id, "p-42");
        assert_eq!(report.analysis("cardiologist_analysis"), Some("cardio findings"));
        assert_eq!(report.analysis("pulmonologist_analysis"), Some("pulmo findings"));
        assert_eq!(report.analysis("psychologist_analysis"), Some("psych findings"));
        assert_eq!(report.final_diagnosis, "final assessment");
    }

    #[tokio::test]
    async fn synthesis_failure_fails_the_run() {
        let provider = LlmProvider::Scripted(
            ScriptedProvider::new()
                .reply("cardiologist", "a")
                .reply("pulmonologist", "b")
                .reply("psychologist", "c")
                .fail("diagnostician", "HTTP 429: rate limited")
                .build(),
        );
        let orch = Orchestrator::new(provider, Duration::from_secs(30));
        let err = orch.analyze("p-1", &record()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Synthesis(_)));
        assert!(err.to_string().contains("429"));
    }
}
