//! Nutrition tools: current plan and meal log history

use anyhow::Result;
use async_trait::async_trait;
use chrono::TimeDelta;
use serde_json::Value;

use healix_store::{Collection, NutritionLog, NutritionPlan};

use super::{ToolContext, ToolHandler, days_arg, json_schema, query_schema, window_start};
use crate::text::{num, num_or};

pub struct NutritionPlanTool {
    ctx: ToolContext,
}

impl NutritionPlanTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn plan(&self) -> Result<String> {
        let Some(record) = self
            .ctx
            .store
            .latest(Collection::NutritionPlans, &self.ctx.user.user_id)
            .await?
        else {
            return Ok("No nutrition plan found for this user yet. Use nutrition knowledge to \
                       create a recommendation based on the user profile."
                .to_string());
        };
        let plan: NutritionPlan = record.parse()?;

        let mut parts = vec![
            format!("=== Nutrition Plan for {} ===", self.ctx.user.summary()),
            format!("Daily Target: {} kcal", num_or(plan.daily_calories_target, "?")),
            format!(
                "Macros: {}g Protein | {}g Carbs | {}g Fat",
                num_or(plan.macros.protein, "?"),
                num_or(plan.macros.carbs, "?"),
                num_or(plan.macros.fat, "?")
            ),
            format!("Water Target: {}L/day", num_or(plan.water_target_liters, "?")),
        ];
        for meal in &plan.meals {
            parts.push(format!(
                "\n{} ({}):",
                meal.meal_type.as_deref().unwrap_or("Meal").to_uppercase(),
                meal.time.as_deref().unwrap_or("")
            ));
            for food in &meal.foods {
                parts.push(format!(
                    "  - {} ({}): {} kcal, {}g protein",
                    food.name.as_deref().unwrap_or(""),
                    food.name_ar.as_deref().unwrap_or(""),
                    num(food.calories.unwrap_or(0.0)),
                    num(food.protein.unwrap_or(0.0))
                ));
            }
        }
        Ok(parts.join("\n"))
    }
}

#[async_trait]
impl ToolHandler for NutritionPlanTool {
    fn name(&self) -> &str {
        "get_nutrition_plan"
    }

    fn description(&self) -> &str {
        "Get the user's personalized nutrition plan. Contains the daily calorie target, \
         macros, water target, and the full meal structure with foods."
    }

    fn input_schema(&self) -> Value {
        query_schema("What the user asked about")
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        Ok(self
            .plan()
            .await
            .unwrap_or_else(|e| format!("Error retrieving nutrition plan: {:#}", e)))
    }
}

pub struct NutritionHistoryTool {
    ctx: ToolContext,
}

impl NutritionHistoryTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn history(&self, days: i64) -> Result<String> {
        let start = window_start(TimeDelta::try_days(days));
        let records = self
            .ctx
            .store
            .since(Collection::NutritionLogs, &self.ctx.user.user_id, start)
            .await?;
        if records.is_empty() {
            return Ok(format!("No nutrition logs found for the past {} days.", days));
        }

        let mut calories = 0.0;
        let mut protein = 0.0;
        for record in &records {
            let log: NutritionLog = record.parse()?;
            for food in &log.foods {
                calories += food.calories.unwrap_or(0.0);
                protein += food.protein.unwrap_or(0.0);
            }
        }
        let per_day = days.max(1) as f64;

        Ok(format!(
            "=== Nutrition History ({} days, {} meals logged) ===\n\
             Total Calories: {:.0} kcal\n\
             Avg Daily Calories: {:.0} kcal\n\
             Total Protein: {:.0}g\n\
             Avg Daily Protein: {:.0}g",
            days,
            records.len(),
            calories,
            calories / per_day,
            protein,
            protein / per_day
        ))
    }
}

#[async_trait]
impl ToolHandler for NutritionHistoryTool {
    fn name(&self) -> &str {
        "get_nutrition_history"
    }

    fn description(&self) -> &str {
        "Get the user's meal logging history. Pass the number of days as a string \
         (e.g. '7'). Returns calorie and protein totals and daily averages."
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
            .unwrap_or_else(|e| format!("Error retrieving nutrition history: {:#}", e)))
    }
}
