//! Risk tools: factor analysis, what-if scenarios, medication compliance

use anyhow::Result;
use async_trait::async_trait;
use chrono::TimeDelta;
use serde_json::{Value, json};

use healix_store::{Collection, Medication, RecordFilter, VitalSnapshot};

use super::{ToolContext, ToolHandler, query_schema, window_start};
use crate::scoring::{Adherence, RiskInputs, assess_risk};
use crate::text::num;

const MEDICATIONS_SHOWN: usize = 10;
const WEEK_DAYS: i64 = 7;

/// Reads shared by the risk tools
async fn latest_vitals(ctx: &ToolContext) -> Result<Option<VitalSnapshot>> {
    ctx.store
        .latest(Collection::Vitals, &ctx.user.user_id)
        .await?
        .map(|r| r.parse())
        .transpose()
}

async fn adherence(ctx: &ToolContext) -> Result<Adherence> {
    let user = &ctx.user.user_id;
    let total = ctx
        .store
        .count(Collection::Medications, user, &RecordFilter::default())
        .await?;
    let taken = ctx
        .store
        .count(
            Collection::Medications,
            user,
            &RecordFilter::default().field_eq("status", json!("taken")),
        )
        .await?;
    Ok(Adherence { total, taken })
}

async fn weekly_sessions(ctx: &ToolContext) -> Result<u64> {
    let filter = RecordFilter::since(window_start(TimeDelta::try_days(WEEK_DAYS)))
        .field_eq("completed", json!(true));
    ctx.store
        .count(Collection::ExerciseLogs, &ctx.user.user_id, &filter)
        .await
}

pub struct RiskFactorsTool {
    ctx: ToolContext,
}

impl RiskFactorsTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn analyze(&self) -> Result<String> {
        let (vitals, adherence, weekly_sessions) = tokio::try_join!(
            latest_vitals(&self.ctx),
            adherence(&self.ctx),
            weekly_sessions(&self.ctx)
        )?;
        let inputs = RiskInputs {
            vitals,
            adherence,
            weekly_sessions,
            is_athlete: self.ctx.user.is_athlete(),
        };
        Ok(assess_risk(&inputs).render())
    }
}

#[async_trait]
impl ToolHandler for RiskFactorsTool {
    fn name(&self) -> &str {
        "analyze_risk_factors"
    }

    fn description(&self) -> &str {
        "Analyze the user's health risk factors from their real vitals, medication \
         adherence and weekly exercise. Returns an overall risk score with the signed \
         contribution of every factor."
    }

    fn input_schema(&self) -> Value {
        query_schema("What the user asked about")
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        Ok(self
            .analyze()
            .await
            .unwrap_or_else(|e| format!("Error analyzing risk: {:#}", e)))
    }
}

/// What-if projections from the latest heart rate, stress and systolic pressure
pub fn prediction_scenarios(vitals: Option<&VitalSnapshot>) -> String {
    let hr = vitals.and_then(|v| v.heart_rate).unwrap_or(72.0);
    let stress = vitals.and_then(|v| v.stress_level).unwrap_or(30.0);
    let bp = vitals.and_then(|v| v.blood_pressure_sys).unwrap_or(120.0);

    let scenarios = [
        format!(
            "Scenario 1: Follow AI plan strictly for 3 months\n\
             \x20  Risk reduction: -35 to -40%\n\
             \x20  Heart Rate: {} -> {} bpm\n\
             \x20  Blood Pressure: {} -> {} mmHg\n\
             \x20  Stress: {} -> {}/100\n\
             \x20  Overall: Significant improvement expected",
            num(hr),
            num((hr - 8.0).max(58.0)),
            num(bp),
            num((bp - 10.0).max(110.0)),
            num(stress),
            num((stress - 15.0).max(10.0))
        ),
        format!(
            "Scenario 2: Skip exercise for 2 weeks\n\
             \x20  Risk increase: +18 to +25%\n\
             \x20  Cardio fitness loss: 5-10%\n\
             \x20  Stress: {} -> {}/100\n\
             \x20  Muscle mass loss begins after 10 days",
            num(stress),
            num((stress + 20.0).min(90.0))
        ),
        format!(
            "Scenario 3: Sleep < 5 hours for 1 month\n\
             \x20  Risk increase: +20 to +25%\n\
             \x20  Cortisol elevation: 30-40%\n\
             \x20  Blood Pressure: {} -> {} mmHg\n\
             \x20  Immune function decline: 15-20%",
            num(bp),
            num((bp + 12.0).min(165.0))
        ),
        "Scenario 4: Stop medications without doctor approval\n\
         \x20  Risk increase: +30 to +50% (condition dependent)\n\
         \x20  Potential rebound effects within 48-72 hours\n\
         \x20  WARNING: NEVER stop medications without consulting your doctor"
            .to_string(),
    ];
    format!("=== Predictive Health Scenarios ===\n\n{}", scenarios.join("\n\n"))
}

pub struct PredictionScenariosTool {
    ctx: ToolContext,
}

impl PredictionScenariosTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ToolHandler for PredictionScenariosTool {
    fn name(&self) -> &str {
        "get_prediction_scenarios"
    }

    fn description(&self) -> &str {
        "Generate predictive what-if health scenarios showing what happens if the user \
         follows or ignores recommendations, with numbers from their real data."
    }

    fn input_schema(&self) -> Value {
        query_schema("What the user asked about")
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        Ok(match latest_vitals(&self.ctx).await {
            Ok(vitals) => prediction_scenarios(vitals.as_ref()),
            Err(e) => format!("Error generating predictions: {:#}", e),
        })
    }
}

pub struct MedicationComplianceTool {
    ctx: ToolContext,
}

impl MedicationComplianceTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn report(&self) -> Result<String> {
        let mut records = self
            .ctx
            .store
            .latest_n(Collection::Medications, &self.ctx.user.user_id, MEDICATIONS_SHOWN)
            .await?;
        if records.is_empty() {
            return Ok("No medications registered for this user.".to_string());
        }
        let adherence = adherence(&self.ctx).await?;

        let mut parts = vec![
            "=== Medication Compliance Report ===".to_string(),
            format!("Overall Compliance: {}%", num(adherence.rate())),
            format!("Total Medications: {}", adherence.total),
            format!("Taken on Time: {}", adherence.taken),
            "\nMedication List:".to_string(),
        ];
        records.reverse();
        for record in &records {
            let med: Medication = record.parse()?;
            parts.push(format!(
                "  - {} ({}) — {} at {} — Status: {}",
                med.name.as_deref().unwrap_or("?"),
                med.dosage.as_deref().unwrap_or(""),
                med.frequency.as_deref().unwrap_or(""),
                med.time.as_deref().unwrap_or(""),
                med.status.as_deref().unwrap_or("unknown")
            ));
        }
        Ok(parts.join("\n"))
    }
}

#[async_trait]
impl ToolHandler for MedicationComplianceTool {
    fn name(&self) -> &str {
        "check_medication_compliance"
    }

    fn description(&self) -> &str {
        "Check the user's medication list, compliance rate and adherence."
    }

    fn input_schema(&self) -> Value {
        query_schema("What the user asked about")
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        Ok(self
            .report()
            .await
            .unwrap_or_else(|e| format!("Error checking medications: {:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tests::fixture;
    use chrono::{Duration, Utc};
    use healix_store::UserProfile;

    #[tokio::test]
    async fn test_risk_analysis_from_records() {
        let (ctx, db, _temp) = fixture("u1", UserProfile::default());
        let now = Utc::now();
        db.insert(
            Collection::Vitals,
            "u1",
            now,
            json!({"heart_rate": 110, "spo2": 99, "stress_level": 20, "sleep_hours": 8,
                   "blood_pressure_sys": 118}),
        )
        .await
        .unwrap();
        for day in 1..=5 {
            db.insert(
                Collection::ExerciseLogs,
                "u1",
                now - Duration::days(day),
                json!({"completed": true}),
            )
            .await
            .unwrap();
        }
        // incomplete and stale sessions do not count
        db.insert(Collection::ExerciseLogs, "u1", now, json!({"completed": false}))
            .await
            .unwrap();
        db.insert(
            Collection::ExerciseLogs,
            "u1",
            now - Duration::days(30),
            json!({"completed": true}),
        )
        .await
        .unwrap();

        let out = RiskFactorsTool::new(ctx).execute(json!({})).await.unwrap();
        assert!(out.starts_with(
            "=== Health Risk Analysis (SHAP Factors) ===\nOverall Risk Score: 5% — LOW\n\nFactor Analysis:\n"
        ));
        assert!(out.contains("  Elevated Heart Rate (110 bpm): +10% risk"));
        assert!(out.contains("  Active Exercise (5 sessions/week): -15% risk"));
        assert!(out.contains("  High Medication Adherence (100%): -8% risk"));
    }

    #[tokio::test]
    async fn test_risk_analysis_without_data() {
        let (ctx, _db, _temp) = fixture("u1", UserProfile::default());
        let out = RiskFactorsTool::new(ctx).execute(json!({})).await.unwrap();
        // 25 + 10 (no exercise) - 8 (no medications)
        assert!(out.contains("Overall Risk Score: 27% — LOW"));
        assert!(out.contains("No vitals data available"));
    }

    #[test]
    fn test_scenarios_defaults_and_clamps() {
        let text = prediction_scenarios(None);
        assert!(text.starts_with("=== Predictive Health Scenarios ===\n\nScenario 1:"));
        assert!(text.contains("   Heart Rate: 72 -> 64 bpm"));
        assert!(text.contains("   Blood Pressure: 120 -> 110 mmHg"));
        assert!(text.contains("   Stress: 30 -> 15/100"));
        assert!(text.contains("   Stress: 30 -> 50/100"));
        assert!(text.contains("   Blood Pressure: 120 -> 132 mmHg"));
        assert_eq!(text.matches("Scenario ").count(), 4);

        let vitals = VitalSnapshot {
            heart_rate: Some(60.0),
            stress_level: Some(80.0),
            blood_pressure_sys: Some(160.0),
            ..Default::default()
        };
        let text = prediction_scenarios(Some(&vitals));
        assert!(text.contains("Heart Rate: 60 -> 58 bpm"));
        assert!(text.contains("Stress: 80 -> 90/100"));
        assert!(text.contains("Blood Pressure: 160 -> 165 mmHg"));
    }

    #[tokio::test]
    async fn test_medication_compliance() {
        let (ctx, db, _temp) = fixture("u1", UserProfile::default());
        let now = Utc::now();
        for (i, status) in ["taken", "taken", "missed"].into_iter().enumerate() {
            db.insert(
                Collection::Medications,
                "u1",
                now - Duration::hours(3 - i as i64),
                json!({"name": format!("Med{}", i), "dosage": "10mg", "frequency": "daily",
                       "time": "08:00", "status": status}),
            )
            .await
            .unwrap();
        }

        let out = MedicationComplianceTool::new(ctx).execute(json!({})).await.unwrap();
        assert!(out.starts_with(
            "=== Medication Compliance Report ===\n\
             Overall Compliance: 66.7%\n\
             Total Medications: 3\n\
             Taken on Time: 2\n\
             \nMedication List:\n"
        ));
        assert!(out.contains("  - Med0 (10mg) — daily at 08:00 — Status: taken"));
        assert!(out.ends_with("Status: missed"));
    }

    #[tokio::test]
    async fn test_medication_list_shows_most_recent_ten() {
        let (ctx, db, _temp) = fixture("u1", UserProfile::default());
        let now = Utc::now();
        for i in 0..12 {
            db.insert(
                Collection::Medications,
                "u1",
                now - Duration::minutes(12 - i),
                json!({"name": format!("Med{}", i), "status": "taken"}),
            )
            .await
            .unwrap();
        }

        let out = MedicationComplianceTool::new(ctx).execute(json!({})).await.unwrap();
        assert!(out.contains("Total Medications: 12"));
        assert_eq!(out.matches("  - Med").count(), 10);
        assert!(!out.contains("Med1 ("));
        assert!(out.contains("  - Med2 ("));
        assert!(out.ends_with("Status: taken"));
        let last = out.lines().last().unwrap();
        assert!(last.starts_with("  - Med11 ("));
    }

    #[tokio::test]
    async fn test_no_medications() {
        let (ctx, _db, _temp) = fixture("u1", UserProfile::default());
        let out = MedicationComplianceTool::new(ctx).execute(json!({})).await.unwrap();
        assert_eq!(out, "No medications registered for this user.");
    }
}
