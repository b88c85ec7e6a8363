//! Exercise tools: current plan, session history, Safe Load Index

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::TimeDelta;
use serde_json::Value;

use healix_store::{Collection, ExerciseLog, ExercisePlan};

use super::{ToolContext, ToolHandler, days_arg, json_schema, query_schema, str_arg, window_start};
use crate::scoring::safe_load_index;
use crate::text::num_or;

const DEFAULT_REST_SECONDS: u32 = 60;

pub struct ExercisePlanTool {
    ctx: ToolContext,
}

impl ExercisePlanTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn plan(&self) -> Result<String> {
        let Some(record) = self
            .ctx
            .store
            .latest(Collection::ExercisePlans, &self.ctx.user.user_id)
            .await?
        else {
            return Ok("No exercise plan found. Use exercise knowledge to design one based on \
                       the user profile."
                .to_string());
        };
        let plan: ExercisePlan = record.parse()?;

        let mut parts = vec![
            format!("=== Exercise Plan for {} ===", self.ctx.user.summary()),
            format!(
                "Level: {} | Safe Load Index: {}%",
                plan.user_level.as_deref().unwrap_or("?"),
                num_or(plan.safe_load_index, "?")
            ),
        ];
        for (i, ex) in plan.exercises.iter().enumerate() {
            parts.push(format!(
                "\n{}. {} ({})",
                i + 1,
                ex.name.as_deref().unwrap_or(""),
                ex.name_ar.as_deref().unwrap_or("")
            ));
            parts.push(format!(
                "   Sets: {} warmup + {} working x {} reps",
                ex.warmup_sets.unwrap_or(0),
                ex.sets.unwrap_or(0),
                ex.reps.as_deref().unwrap_or("0")
            ));
            parts.push(format!(
                "   Rest: {}s | Muscle: {}",
                ex.rest_seconds.unwrap_or(DEFAULT_REST_SECONDS),
                ex.muscle_group.as_deref().unwrap_or("")
            ));
            if let Some(tips) = ex.tips.as_deref().filter(|t| !t.is_empty()) {
                parts.push(format!("   Tips (AR): {}", tips));
            }
            if let Some(tips) = ex.tips_en.as_deref().filter(|t| !t.is_empty()) {
                parts.push(format!("   Tips (EN): {}", tips));
            }
            if !ex.alternatives.is_empty() {
                parts.push(format!("   Alternatives: {}", ex.alternatives.join(", ")));
            }
        }
        Ok(parts.join("\n"))
    }
}

#[async_trait]
impl ToolHandler for ExercisePlanTool {
    fn name(&self) -> &str {
        "get_exercise_plan"
    }

    fn description(&self) -> &str {
        "Get the user's personalized exercise plan. Contains exercises with sets, reps, \
         muscle groups, tips (AR/EN), alternatives, and the plan's safe load index."
    }

    fn input_schema(&self) -> Value {
        query_schema("What the user asked about")
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        Ok(self
            .plan()
            .await
            .unwrap_or_else(|e| format!("Error retrieving exercise plan: {:#}", e)))
    }
}

pub struct ExerciseHistoryTool {
    ctx: ToolContext,
}

impl ExerciseHistoryTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn history(&self, days: i64) -> Result<String> {
        let start = window_start(TimeDelta::try_days(days));
        let records = self
            .ctx
            .store
            .since(Collection::ExerciseLogs, &self.ctx.user.user_id, start)
            .await?;
        if records.is_empty() {
            return Ok(format!("No exercise logs found for the past {} days.", days));
        }

        let logs = records
            .iter()
            .map(|r| r.parse::<ExerciseLog>())
            .collect::<Result<Vec<_>>>()?;
        let completed = logs.iter().filter(|l| l.completed).count();
        let calories: f64 = logs.iter().filter_map(|l| l.calories_burned).sum();

        let mut exercises: Vec<&str> = Vec::new();
        for name in logs.iter().filter_map(|l| l.exercise_name.as_deref()) {
            if !name.is_empty() && !exercises.contains(&name) {
                exercises.push(name);
            }
        }
        let exercises = if exercises.is_empty() {
            "None logged".to_string()
        } else {
            exercises.join(", ")
        };

        Ok(format!(
            "=== Exercise History ({} days) ===\n\
             Total Sessions: {}\n\
             Completed: {}/{} ({:.0}%)\n\
             Calories Burned: {:.0} kcal\n\
             Exercises: {}",
            days,
            logs.len(),
            completed,
            logs.len(),
            completed as f64 / logs.len() as f64 * 100.0,
            calories,
            exercises
        ))
    }
}

#[async_trait]
impl ToolHandler for ExerciseHistoryTool {
    fn name(&self) -> &str {
        "get_exercise_history"
    }

    fn description(&self) -> &str {
        "Get the user's exercise logging history. Pass the number of days as a string \
         (e.g. '7'). Returns session count, completion rate and calories burned."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "days": {
                    "type": "string",
                    "description": "Number of days to look back, e.g. '7'"
                }
            }),
            vec!["days"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let days = days_arg(&input)?;
        Ok(self
            .history(days)
            .await
            .unwrap_or_else(|e| format!("Error retrieving exercise history: {:#}", e)))
    }
}

/// Pure scoring over the conditions the model passes in
pub struct SafeLoadIndexTool;

#[async_trait]
impl ToolHandler for SafeLoadIndexTool {
    fn name(&self) -> &str {
        "calculate_safe_load_index"
    }

    fn description(&self) -> &str {
        "Calculate the Safe Load Index (SLI) from the user's medical conditions. Pass \
         conditions comma-separated (e.g. 'hypertension, knee injury'). Returns a safety \
         score and exercise restrictions."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "conditions": {
                    "type": "string",
                    "description": "Comma-separated medical conditions"
                }
            }),
            vec!["conditions"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let conditions = str_arg(&input, "conditions")?
            .ok_or_else(|| anyhow!("Missing 'conditions' parameter"))?;
        Ok(safe_load_index(&conditions).render())
    }
}
