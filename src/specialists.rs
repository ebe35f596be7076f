//! Specialist registry — the fixed set of analysis personas.
//!
//! Compiled-in configuration: an ordered, read-only list of role prompts.
//! The orchestrator enumerates this list and never hardcodes its length, so
//! adding a specialist is one new entry here and nothing else. The set is
//! fixed per deployment — there is no runtime mutation.

/// One configured specialist persona.
#[derive(Debug)]
pub struct SpecialistDefinition {
    /// Stable identifier, used to key results (`"cardiologist"`, …).
    pub id: &'static str,
    /// Human-readable discipline name used in the synthesis prompt.
    pub discipline: &'static str,
    /// Field name the stored report uses for this specialist's outcome.
    pub report_field: &'static str,
    /// System role prompt sent with every inference call for this specialist.
    pub role_prompt: &'static str,
}

/// Ordered registry of all specialists. Order is the order their outcomes
/// appear in the synthesis prompt — deterministic regardless of which call
/// finishes first at runtime.
pub fn registry() -> &'static [SpecialistDefinition] {
    REGISTRY
}

/// Build the second-stage system prompt embedding every specialist outcome.
///
/// `outcomes` must be in registry order and carry one entry per registered
/// specialist; failed analyses contribute their empty placeholder.
pub fn synthesis_prompt(outcomes: &[(&SpecialistDefinition, &str)]) -> String {
    let mut sections = String::new();
    for (def, text) in outcomes {
        sections.push_str(&format!("      {}: {}\n", def.discipline, text));
    }

    format!(
        "You are an expert medical diagnostician.\n\
         \n\
         Review and synthesize these specialty analyses:\n\
         {sections}\n\
         Provide a comprehensive final diagnosis that:\n\
         1. Identifies primary conditions\n\
         2. Notes interactions between different systems\n\
         3. Highlights key concerns\n\
         4. Recommends next steps\n\
         Format your response as a clear clinical assessment."
    )
}

static REGISTRY: &[SpecialistDefinition] = &[
    SpecialistDefinition {
        id: "cardiologist",
        discipline: "Cardiology",
        report_field: "cardiologist_analysis",
        role_prompt: "You are an expert cardiologist with extensive experience in cardiovascular medicine.\n\
            \n\
            Focus your analysis on:\n\
            - Heart rhythm and rate\n\
            - Blood pressure patterns\n\
            - Chest pain characteristics\n\
            - Cardiovascular risk factors\n\
            - ECG interpretations\n\
            - Exercise tolerance\n\
            - Circulation issues\n\
            \n\
            Consider common cardiac conditions such as:\n\
            - Coronary artery disease\n\
            - Arrhythmias\n\
            - Heart failure\n\
            - Hypertension\n\
            - Valve disorders\n\
            \n\
            Provide specific cardiac-focused insights and note any concerning symptoms that require immediate attention.",
    },
    SpecialistDefinition {
        id: "pulmonologist",
        discipline: "Pulmonology",
        report_field: "pulmonologist_analysis",
        role_prompt: "You are an expert pulmonologist specializing in respiratory medicine.\n\
            \n\
            Focus your analysis on:\n\
            - Breathing patterns\n\
            - Respiratory rate\n\
            - Shortness of breath\n\
            - Cough characteristics\n\
            - Oxygen saturation\n\
            - Lung sounds\n\
            - Exercise capacity\n\
            \n\
            Consider common respiratory conditions such as:\n\
            - Asthma\n\
            - COPD\n\
            - Bronchitis\n\
            - Pneumonia\n\
            - Sleep apnea\n\
            - Pulmonary embolism\n\
            \n\
            Evaluate respiratory symptoms and their relationship to other systemic conditions.\n\
            Note any concerning respiratory patterns that require immediate attention.",
    },
    SpecialistDefinition {
        id: "psychologist",
        discipline: "Psychology",
        report_field: "psychologist_analysis",
        role_prompt: "You are an expert psychologist specializing in behavioral health and mental disorders.\n\
            \n\
            Focus your analysis on:\n\
            - Anxiety and depression symptoms\n\
            - Panic attack patterns\n\
            - Stress-related manifestations\n\
            - Sleep disturbances\n\
            - Behavioral changes\n\
            - Cognitive function\n\
            - Social interactions\n\
            \n\
            Consider common psychological conditions such as:\n\
            - Anxiety disorders\n\
            - Depression\n\
            - Panic disorder\n\
            - PTSD\n\
            - Somatization disorders\n\
            \n\
            Evaluate how psychological factors might be contributing to or affected by physical symptoms.\n\
            Provide insights into the mental health aspects of the patient's condition.",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_ordered_and_nonempty() {
        let ids: Vec<_> = registry().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["cardiologist", "pulmonologist", "psychologist"]);
    }

    #[test]
    fn ids_and_report_fields_are_unique() {
        let n = registry().len();
        let ids: std::collections::HashSet<_> = registry().iter().map(|d| d.id).collect();
        let fields: std::collections::HashSet<_> =
            registry().iter().map(|d| d.report_field).collect();
        assert_eq!(ids.len(), n);
        assert_eq!(fields.len(), n);
    }

    #[test]
    fn report_fields_follow_id_suffix_convention() {
        for def in registry() {
            assert_eq!(def.report_field, format!("{}_analysis", def.id));
        }
    }

    #[test]
    fn role_prompts_are_distinct_and_substantial() {
        for def in registry() {
            assert!(def.role_prompt.len() > 100, "{} prompt too short", def.id);
            assert!(def.role_prompt.contains(def.id), "{} prompt misses its role", def.id);
        }
    }

    #[test]
    fn synthesis_prompt_embeds_outcomes_in_order() {
        let reg = registry();
        let outcomes: Vec<_> = reg
            .iter()
            .zip(["heart ok", "", "mild anxiety"])
            .collect();
        let prompt = synthesis_prompt(&outcomes);

        let cardio = prompt.find("Cardiology: heart ok").expect("cardiology section");
        let pulmo = prompt.find("Pulmonology: ").expect("pulmonology section");
        let psych = prompt.find("Psychology: mild anxiety").expect("psychology section");
        assert!(cardio < pulmo && pulmo < psych, "sections out of registry order");
        assert!(prompt.contains("Identifies primary conditions"));
        assert!(prompt.contains("Recommends next steps"));
    }
}
