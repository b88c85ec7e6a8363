//! Clinical tools: latest vitals, vital trends, health alerts

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use tracing::debug;

use healix_store::{Collection, HealthAlert, VitalSnapshot};

use super::{ToolContext, ToolHandler, json_schema, query_schema, readings, str_arg, timestamp, window_start};
use crate::text::{num, num_or};

const ALERTS_FETCHED: usize = 10;
const ALERTS_SHOWN: usize = 5;

pub struct LookupVitalsTool {
    ctx: ToolContext,
}

impl LookupVitalsTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn lookup(&self) -> Result<String> {
        let Some(record) = self
            .ctx
            .store
            .latest(Collection::Vitals, &self.ctx.user.user_id)
            .await?
        else {
            return Ok("No vital signs data found. The user needs to upload vitals from \
                       their wearable device first."
                .to_string());
        };
        let v: VitalSnapshot = record.parse()?;
        let present = |x: Option<f64>| x.filter(|n| *n != 0.0);

        let mut parts = vec![format!("=== Real-Time Vitals for {} ===", self.ctx.user.summary())];
        if let Some(hr) = present(v.heart_rate) {
            parts.push(format!("Heart Rate: {} bpm", num(hr)));
        }
        if let Some(spo2) = present(v.spo2) {
            parts.push(format!("SpO2: {}%", num(spo2)));
        }
        if let Some(sys) = present(v.blood_pressure_sys) {
            parts.push(format!(
                "Blood Pressure: {}/{} mmHg",
                num(sys),
                num_or(v.blood_pressure_dia, "?")
            ));
        }
        if let Some(stress) = present(v.stress_level) {
            parts.push(format!("Stress Level: {}/100", num(stress)));
        }
        if let Some(hrv) = present(v.hrv) {
            parts.push(format!("HRV: {} ms", num(hrv)));
        }
        if let Some(temp) = present(v.body_temp) {
            parts.push(format!("Body Temp: {}°C", num(temp)));
        }
        if let Some(steps) = present(v.steps) {
            parts.push(format!("Steps Today: {}", num(steps)));
        }
        if let Some(kcal) = present(v.calories_burned) {
            parts.push(format!("Calories Burned: {} kcal", num(kcal)));
        }
        if let Some(sleep) = present(v.sleep_hours) {
            parts.push(format!(
                "Sleep: {}h (Quality: {}%)",
                num(sleep),
                num_or(v.sleep_quality, "?")
            ));
        }
        parts.push(format!("Recorded: {}", timestamp(record.recorded_at)));
        Ok(parts.join("\n"))
    }
}

#[async_trait]
impl ToolHandler for LookupVitalsTool {
    fn name(&self) -> &str {
        "lookup_vitals"
    }

    fn description(&self) -> &str {
        "Look up the user's current vital signs. Returns real-time heart rate, SpO2, \
         blood pressure, stress, HRV, temperature, steps, calories and sleep data. \
         ALWAYS call this before answering health questions."
    }

    fn input_schema(&self) -> Value {
        query_schema("What the user asked about")
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        debug!("Looking up vitals for {}", self.ctx.user.user_id);
        Ok(self
            .lookup()
            .await
            .unwrap_or_else(|e| format!("Error retrieving vitals: {:#}", e)))
    }
}

/// Trend window for a period label; unknown labels mean the last 24 hours
fn period_span(period: &str) -> Option<TimeDelta> {
    match period {
        "7d" => TimeDelta::try_days(7),
        "30d" => TimeDelta::try_days(30),
        _ => TimeDelta::try_hours(24),
    }
}

pub struct VitalTrendsTool {
    ctx: ToolContext,
}

impl VitalTrendsTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn trends(&self, period: &str, start: DateTime<Utc>) -> Result<String> {
        let records = self
            .ctx
            .store
            .since(Collection::Vitals, &self.ctx.user.user_id, start)
            .await?;
        if records.is_empty() {
            return Ok(format!("No vital history found for the past {}.", period));
        }
        let snapshots = records
            .iter()
            .map(|r| r.parse::<VitalSnapshot>())
            .collect::<Result<Vec<_>>>()?;

        let hrs = readings(&snapshots, |v| v.heart_rate);
        let spo2s = readings(&snapshots, |v| v.spo2);
        let stress = readings(&snapshots, |v| v.stress_level);
        let bps = readings(&snapshots, |v| v.blood_pressure_sys);

        let mut parts = vec![format!(
            "=== Vital Trends ({}) — {} records ===",
            period,
            records.len()
        )];
        if let Some(s) = Summary::of(&hrs) {
            parts.push(format!(
                "Heart Rate: avg {} bpm (min {}, max {})",
                num(s.mean.floor()),
                num(s.min),
                num(s.max)
            ));
        }
        if let Some(s) = Summary::of(&spo2s) {
            parts.push(format!("SpO2: avg {:.1}% (min {}%)", s.mean, num(s.min)));
        }
        if let Some(s) = Summary::of(&stress) {
            parts.push(format!(
                "Stress: avg {}/100 (max {})",
                num(s.mean.floor()),
                num(s.max)
            ));
        }
        if let Some(s) = Summary::of(&bps) {
            parts.push(format!(
                "Systolic BP: avg {} mmHg (max {})",
                num(s.mean.floor()),
                num(s.max)
            ));
        }
        Ok(parts.join("\n"))
    }
}

/// Mean, min and max of a non-empty series
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Summary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().sum();
        Some(Self {
            mean: sum / values.len() as f64,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

#[async_trait]
impl ToolHandler for VitalTrendsTool {
    fn name(&self) -> &str {
        "get_vital_trends"
    }

    fn description(&self) -> &str {
        "Get vital sign trends over a period. Use '24h', '7d', or '30d'. \
         Returns averages and min/max for heart rate, SpO2, stress and blood pressure."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "period": {
                    "type": "string",
                    "enum": ["24h", "7d", "30d"],
                    "description": "Time window to summarize"
                }
            }),
            vec!["period"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let period = str_arg(&input, "period")?.unwrap_or_else(|| "24h".to_string());
        let start = window_start(period_span(period.trim()));
        debug!("Vital trends for {} over {}", self.ctx.user.user_id, period);
        Ok(self
            .trends(&period, start)
            .await
            .unwrap_or_else(|e| format!("Error retrieving trends: {:#}", e)))
    }
}

pub struct HealthAlertsTool {
    ctx: ToolContext,
}

impl HealthAlertsTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn alerts(&self) -> Result<String> {
        let records = self
            .ctx
            .store
            .latest_n(Collection::Alerts, &self.ctx.user.user_id, ALERTS_FETCHED)
            .await?;
        if records.is_empty() {
            return Ok("No active health alerts. All vitals are within normal ranges.".to_string());
        }

        let mut parts = vec![format!("=== Health Alerts ({} active) ===", records.len())];
        for record in records.iter().take(ALERTS_SHOWN) {
            let alert: HealthAlert = record.parse()?;
            parts.push(format!(
                "[{}] {} — {}",
                alert.severity.as_deref().unwrap_or("info").to_uppercase(),
                alert.message.as_deref().unwrap_or("Alert"),
                timestamp(record.recorded_at)
            ));
        }
        Ok(parts.join("\n"))
    }
}

#[async_trait]
impl ToolHandler for HealthAlertsTool {
    fn name(&self) -> &str {
        "check_health_alerts"
    }

    fn description(&self) -> &str {
        "Check the user's recent health alerts and critical notifications from the monitoring system."
    }

    fn input_schema(&self) -> Value {
        query_schema("What the user asked about")
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        Ok(self
            .alerts()
            .await
            .unwrap_or_else(|e| format!("Error checking alerts: {:#}", e)))
    }
}
