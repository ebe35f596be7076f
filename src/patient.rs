//! Patient record types and intake validation.
//!
//! The HTTP boundary deserializes into [`PatientIntake`], a loose-typed
//! mirror of the form payload, then narrows it into a [`PatientRecord`]
//! through [`PatientIntake::into_record`] — the single place every field
//! bound is checked. Out-of-range numbers (age 300, negative vitals) must
//! surface as field-level validation issues, so the intake shape is wide
//! enough to represent them; the validated record uses the tight types.
//! The orchestrator trusts its input and never re-validates. Ranges mirror
//! the intake form: they are sanity bounds on form entry, not clinical
//! reference ranges.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed symptom vocabulary the intake form offers.
pub const SYMPTOM_VOCABULARY: &[&str] = &[
    "fatigue",
    "shortness of breath",
    "chest pain",
    "anxiety",
    "depression",
    "cough",
    "fever",
    "headache",
    "weight gain",
    "weight loss",
];

/// Maximum number of symptoms a single record may carry.
pub const MAX_SYMPTOMS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Serialize)]
pub struct VitalSigns {
    pub blood_pressure_systolic: u16,
    pub blood_pressure_diastolic: u16,
    pub heart_rate: u16,
    /// Body temperature in °F, one decimal of precision expected.
    pub temperature: f32,
}

/// Validated intake record handed to the orchestrator. Identity-less: the
/// durable report id is assigned at persistence time, not here.
#[derive(Debug, Clone, Serialize)]
pub struct PatientRecord {
    pub patient_name: String,
    pub age: u8,
    pub gender: Gender,
    pub symptoms: Vec<String>,
    pub vital_signs: VitalSigns,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
}

/// One or more field-level rejects, in form-field order.
#[derive(Debug, Error)]
#[error("invalid patient record: {}", issues.join("; "))]
pub struct ValidationError {
    pub issues: Vec<String>,
}

// ── Loose intake shape ────────────────────────────────────────────────────────

/// Raw analyze-request body, tolerant of any in-band JSON number so that a
/// bound violation reaches validation instead of dying in deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientIntake {
    pub patient_name: String,
    pub age: i64,
    pub gender: String,
    pub symptoms: Vec<String>,
    pub vital_signs: VitalSignsIntake,
    #[serde(default)]
    pub medical_history: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VitalSignsIntake {
    pub blood_pressure_systolic: i64,
    pub blood_pressure_diastolic: i64,
    pub heart_rate: i64,
    pub temperature: f64,
}

impl PatientIntake {
    /// Check every field bound, collecting all rejects rather than stopping
    /// at the first one, so the form can surface everything at once. On
    /// success the narrowed, validated record is returned.
    pub fn into_record(self) -> Result<PatientRecord, ValidationError> {
        let mut issues = Vec::new();

        let name = self.patient_name.trim();
        if name.len() < 2 || name.len() > 50 {
            issues.push("patient_name must be 2-50 characters".to_string());
        }
        if !name.chars().all(|c| c.is_ascii_alphabetic() || c == ' ') {
            issues.push("patient_name can only contain letters and spaces".to_string());
        }

        if !(0..=120).contains(&self.age) {
            issues.push("age must be 0-120".to_string());
        }

        let gender = match self.gender.as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => {
                issues.push("gender must be one of: male, female, other".to_string());
                None
            }
        };

        if self.symptoms.is_empty() {
            issues.push("select at least one symptom".to_string());
        }
        if self.symptoms.len() > MAX_SYMPTOMS {
            issues.push(format!("at most {MAX_SYMPTOMS} symptoms can be selected"));
        }
        for s in &self.symptoms {
            if !SYMPTOM_VOCABULARY.contains(&s.as_str()) {
                issues.push(format!("unknown symptom: {s}"));
            }
        }

        let v = &self.vital_signs;
        if !(70..=200).contains(&v.blood_pressure_systolic) {
            issues.push("systolic pressure must be 70-200".to_string());
        }
        if !(40..=130).contains(&v.blood_pressure_diastolic) {
            issues.push("diastolic pressure must be 40-130".to_string());
        }
        if !(40..=200).contains(&v.heart_rate) {
            issues.push("heart rate must be 40-200 bpm".to_string());
        }
        if !v.temperature.is_finite() || !(95.0..=105.0).contains(&v.temperature) {
            issues.push("temperature must be 95.0-105.0 °F".to_string());
        }

        if let Some(history) = &self.medical_history {
            if history.len() > 1000 {
                issues.push("medical_history must be at most 1000 characters".to_string());
            }
        }

        if !issues.is_empty() {
            return Err(ValidationError { issues });
        }

        Ok(PatientRecord {
            patient_name: self.patient_name,
            age: self.age as u8,
            gender: gender.unwrap_or(Gender::Other),
            symptoms: self.symptoms,
            vital_signs: VitalSigns {
                blood_pressure_systolic: v.blood_pressure_systolic as u16,
                blood_pressure_diastolic: v.blood_pressure_diastolic as u16,
                heart_rate: v.heart_rate as u16,
                temperature: v.temperature as f32,
            },
            medical_history: self.medical_history,
        })
    }
}

impl PatientRecord {
    /// Serialize the full record into the model-consumable user payload.
    /// The whole structured record goes to the model so every specialist
    /// sees every field.
    pub fn inference_payload(&self) -> String {
        let json = serde_json::to_string(self)
            .unwrap_or_else(|e| format!("<record serialization failed: {e}>"));
        format!("Analyze this patient data: {json}")
    }
}
