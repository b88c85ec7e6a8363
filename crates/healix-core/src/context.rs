//! Per-request user context

use healix_store::UserProfile;
use serde::{Deserialize, Serialize};

use crate::text::num;

/// Summary used when the profile carries no usable field
pub const EMPTY_PROFILE_SUMMARY: &str = "New user — limited profile data available.";

/// Identity plus profile attributes for one request. Built fresh each turn
/// and never mutated by tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub profile: UserProfile,
    summary: String,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>, profile: UserProfile) -> Self {
        let summary = profile_summary(&profile);
        Self {
            user_id: user_id.into(),
            profile,
            summary,
        }
    }

    /// `"Name: X; Age: 30; ..."` or [`EMPTY_PROFILE_SUMMARY`]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Whether the profile describes an athlete; low resting heart rate is
    /// expected then
    pub fn is_athlete(&self) -> bool {
        self.summary.to_lowercase().contains("athlete")
    }
}

fn text(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.trim().is_empty())
}

fn positive(v: Option<f64>) -> Option<f64> {
    v.filter(|x| *x > 0.0)
}

fn profile_summary(p: &UserProfile) -> String {
    let mut parts = Vec::new();
    if let Some(name) = text(&p.name) {
        parts.push(format!("Name: {}", name));
    }
    if let Some(age) = p.age.filter(|a| *a > 0) {
        parts.push(format!("Age: {}", age));
    }
    if let Some(gender) = text(&p.gender) {
        parts.push(format!("Gender: {}", gender));
    }
    if let Some(weight) = positive(p.weight) {
        parts.push(format!("Weight: {}kg", num(weight)));
    }
    if let Some(height) = positive(p.height) {
        parts.push(format!("Height: {}cm", num(height)));
    }
    if !p.medical_conditions.is_empty() {
        parts.push(format!("Conditions: {}", p.medical_conditions.join(", ")));
    }
    if !p.allergies.is_empty() {
        parts.push(format!("Allergies: {}", p.allergies.join(", ")));
    }
    if let Some(level) = text(&p.fitness_level) {
        parts.push(format!("Fitness Level: {}", level));
    }
    if !p.fitness_goals.is_empty() {
        parts.push(format!("Goals: {}", p.fitness_goals.join(", ")));
    }

    if parts.is_empty() {
        EMPTY_PROFILE_SUMMARY.to_string()
    } else {
        parts.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_profile_summary() {
        let profile = UserProfile {
            name: Some("Omar".to_string()),
            age: Some(30),
            gender: Some("male".to_string()),
            weight: Some(82.5),
            height: Some(178.0),
            medical_conditions: vec!["hypertension".to_string(), "knee injury".to_string()],
            allergies: vec![],
            fitness_level: Some("intermediate".to_string()),
            fitness_goals: vec!["muscle gain".to_string()],
        };
        let ctx = UserContext::new("u1", profile);
        assert_eq!(
            ctx.summary(),
            "Name: Omar; Age: 30; Gender: male; Weight: 82.5kg; Height: 178cm; \
             Conditions: hypertension, knee injury; Fitness Level: intermediate; Goals: muscle gain"
        );
        assert!(!ctx.is_athlete());
    }

    #[test]
    fn test_empty_profile() {
        let ctx = UserContext::new("u2", UserProfile::default());
        assert_eq!(ctx.summary(), EMPTY_PROFILE_SUMMARY);
    }

    #[test]
    fn test_athlete_detection() {
        let profile = UserProfile {
            fitness_level: Some("Athlete".to_string()),
            ..Default::default()
        };
        assert!(UserContext::new("u3", profile).is_athlete());
    }
}
