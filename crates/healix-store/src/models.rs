//! Typed views over record bodies
//!
//! Every field is optional: records come from wearables and user input, and a
//! missing field means "not measured", never zero.

use serde::{Deserialize, Serialize};

/// Profile fields the agents personalize on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub medical_conditions: Vec<String>,
    pub allergies: Vec<String>,
    pub fitness_level: Option<String>,
    pub fitness_goals: Vec<String>,
}

/// One wearable upload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalSnapshot {
    pub heart_rate: Option<f64>,
    pub spo2: Option<f64>,
    pub blood_pressure_sys: Option<f64>,
    pub blood_pressure_dia: Option<f64>,
    pub stress_level: Option<f64>,
    pub hrv: Option<f64>,
    pub body_temp: Option<f64>,
    pub steps: Option<f64>,
    pub calories_burned: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub sleep_quality: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthAlert {
    pub severity: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Macros {
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodItem {
    pub name: Option<String>,
    pub name_ar: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Meal {
    #[serde(rename = "type")]
    pub meal_type: Option<String>,
    pub time: Option<String>,
    pub foods: Vec<FoodItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionPlan {
    pub daily_calories_target: Option<f64>,
    pub macros: Macros,
    pub water_target_liters: Option<f64>,
    pub meals: Vec<Meal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionLog {
    pub foods: Vec<FoodItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannedExercise {
    pub name: Option<String>,
    pub name_ar: Option<String>,
    pub warmup_sets: Option<u32>,
    pub sets: Option<u32>,
    #[serde(deserialize_with = "string_or_number")]
    pub reps: Option<String>,
    pub rest_seconds: Option<u32>,
    pub muscle_group: Option<String>,
    pub tips: Option<String>,
    pub tips_en: Option<String>,
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExercisePlan {
    pub user_level: Option<String>,
    pub safe_load_index: Option<f64>,
    pub exercises: Vec<PlannedExercise>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseLog {
    pub exercise_name: Option<String>,
    pub completed: bool,
    pub calories_burned: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Medication {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub time: Option<String>,
    pub status: Option<String>,
}

/// Rep targets arrive either as a count (`8`) or a range (`"6-8"`)
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
