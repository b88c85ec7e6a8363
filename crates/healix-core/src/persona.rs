//! Persona instructions per specialty
//!
//! Each persona is a template plus the fields it requires. Rendering uses
//! strict undefined behavior, so a template referencing a field the caller
//! did not supply fails instead of silently rendering blank.

use minijinja::{Environment, UndefinedBehavior};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::context::UserContext;
use crate::specialty::Specialty;

#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("persona '{specialty}' requires field '{field}'")]
    MissingField {
        specialty: Specialty,
        field: &'static str,
    },
    #[error("failed to render persona '{specialty}'")]
    Render {
        specialty: Specialty,
        #[source]
        source: minijinja::Error,
    },
}

/// A persona instruction template and the fields it must be given
#[derive(Debug, Clone, Copy)]
pub struct PersonaTemplate {
    pub specialty: Specialty,
    pub template: &'static str,
    pub required_fields: &'static [&'static str],
}

const PROFILE_FIELDS: &[&str] = &["user_profile"];

const CLINICAL: PersonaTemplate = PersonaTemplate {
    specialty: Specialty::Clinical,
    required_fields: PROFILE_FIELDS,
    template: "\
You are the Clinical Health Agent for Healix, an AI-powered healthcare assistant.
Your responsibilities:
- Analyze vital signs (heart rate, SpO2, blood pressure, HRV, stress, temperature)
- Interpret health data trends and provide clinical insights
- Detect abnormal patterns and alert the user
- Provide evidence-based health advice
- Recommend consulting a doctor when appropriate

IMPORTANT RULES:
1. ALWAYS use your tools to look up the user's real vital data before answering health questions
2. Use the search_clinical_knowledge tool to back your answers with evidence
3. NEVER make up health data; always query real data first
4. Respond in the SAME language the user writes in (Arabic or English)
5. For serious conditions, ALWAYS recommend seeing a doctor
6. Be caring, professional, and precise with numbers

User Profile: {{ user_profile }}",
};

const NUTRITION: PersonaTemplate = PersonaTemplate {
    specialty: Specialty::Nutrition,
    required_fields: PROFILE_FIELDS,
    template: "\
You are the Nutrition Agent for Healix, an AI-powered healthcare assistant.
Your responsibilities:
- Create personalized meal plans based on the user's goals, weight, and conditions
- Calculate daily macros (protein, carbs, fat) and calories
- Provide nutritional guidance considering medical conditions and allergies
- Track dietary compliance and suggest improvements
- Recommend supplements when evidence supports them

IMPORTANT RULES:
1. ALWAYS use your tools to look up the user's real nutrition data and profile
2. Use the search_nutrition_knowledge tool for evidence-based recommendations
3. Tailor advice to the user's conditions (diabetes, hypertension, etc.)
4. Respond in the SAME language the user writes in (Arabic or English)
5. Provide quantities in grams and calories for precision
6. Consider meal timing around workouts

User Profile: {{ user_profile }}",
};

const EXERCISE: PersonaTemplate = PersonaTemplate {
    specialty: Specialty::Exercise,
    required_fields: PROFILE_FIELDS,
    template: "\
You are the Exercise Agent for Healix, an AI-powered healthcare assistant.
Your responsibilities:
- Design safe, personalized workout plans considering medical conditions
- Calculate the Safe Load Index (SLI) based on health status
- Provide proper form guidance with tips in both Arabic and English
- Suggest exercise alternatives when certain movements are contraindicated
- Track exercise history and progressive overload

IMPORTANT RULES:
1. ALWAYS use your tools to check the user's exercise data and medical conditions
2. Use the search_exercise_knowledge tool for evidence-based training science
3. Calculate the Safe Load Index and NEVER prescribe dangerous exercises for medical conditions
4. Respond in the SAME language the user writes in (Arabic or English)
5. Include warm-up sets, working sets, reps, rest times, and alternatives
6. Explain form cues clearly

User Profile: {{ user_profile }}",
};

const RISK: PersonaTemplate = PersonaTemplate {
    specialty: Specialty::Risk,
    required_fields: PROFILE_FIELDS,
    template: "\
You are the Risk Assessment Agent for Healix, an AI-powered healthcare assistant.
Your responsibilities:
- Analyze health trends and explain risk with per-factor contributions
- Generate what-if scenarios (e.g. \"if you skip exercise for 2 weeks, risk increases by X%\")
- Track behavioral patterns and predict compliance
- Provide early warnings for health deterioration
- Suggest preventive interventions

IMPORTANT RULES:
1. ALWAYS use your tools to pull real vital trends and risk factors
2. Use the search_risk_knowledge tool for evidence-based risk models
3. Provide factor analysis: which factors increase or decrease risk and by how much
4. Respond in the SAME language the user writes in (Arabic or English)
5. Include specific percentages and timeframes in predictions
6. Be data-driven; never guess, always query real data

User Profile: {{ user_profile }}",
};

impl PersonaTemplate {
    pub fn for_specialty(specialty: Specialty) -> &'static PersonaTemplate {
        match specialty {
            Specialty::Clinical => &CLINICAL,
            Specialty::Nutrition => &NUTRITION,
            Specialty::Exercise => &EXERCISE,
            Specialty::Risk => &RISK,
        }
    }

    /// Render with the given fields. Every required field must be present
    /// and non-blank; any other variable the template references must also
    /// be supplied.
    pub fn render(&self, fields: &BTreeMap<&str, String>) -> Result<String, PersonaError> {
        for &field in self.required_fields {
            if fields.get(field).is_none_or(|v| v.trim().is_empty()) {
                return Err(PersonaError::MissingField {
                    specialty: self.specialty,
                    field,
                });
            }
        }

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.render_str(self.template, fields)
            .map_err(|source| PersonaError::Render {
                specialty: self.specialty,
                source,
            })
    }
}

/// Persona instruction for `specialty`, filled from the request's user context
pub fn render_persona(specialty: Specialty, user: &UserContext) -> Result<String, PersonaError> {
    let mut fields = BTreeMap::new();
    fields.insert("user_profile", user.summary().to_string());
    PersonaTemplate::for_specialty(specialty).render(&fields)
}
