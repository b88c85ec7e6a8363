//! Deterministic scoring: Safe Load Index and risk factor analysis
//!
//! Both are pure functions over record data with fixed arithmetic, so every
//! number the assistant quotes can be traced back to a rule here.

use healix_store::VitalSnapshot;

use crate::text::num;

// ── Safe Load Index ──

/// Score every training plan starts from
pub const SLI_BASE: i32 = 100;
/// Lowest score the index can report
pub const SLI_FLOOR: i32 = 10;

struct LoadRule {
    keywords: &'static [&'static str],
    penalty: i32,
    restriction: &'static str,
}

const LOAD_RULES: &[LoadRule] = &[
    LoadRule {
        keywords: &["hypertension", "ضغط", "pressure"],
        penalty: 20,
        restriction: "Avoid heavy isometric exercises; max HR = 70% of max",
    },
    LoadRule {
        keywords: &["diabetes", "سكر", "sugar"],
        penalty: 10,
        restriction: "Monitor glucose pre/post workout; carry fast-acting carbs",
    },
    LoadRule {
        keywords: &["knee", "ركبة"],
        penalty: 25,
        restriction: "Avoid deep squats; prefer leg press with limited ROM",
    },
    LoadRule {
        keywords: &["back", "ظهر", "spine"],
        penalty: 15,
        restriction: "Avoid deadlifts and heavy squats; focus on core stability",
    },
    LoadRule {
        keywords: &["heart", "قلب", "cardiac"],
        penalty: 30,
        restriction: "Medical clearance required; moderate intensity ONLY",
    },
    LoadRule {
        keywords: &["asthma", "ربو", "respiratory"],
        penalty: 10,
        restriction: "Keep inhaler nearby; avoid cold-air exercise",
    },
    LoadRule {
        keywords: &["obesity", "سمنة"],
        penalty: 15,
        restriction: "Low-impact cardio preferred; gradual progression",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBand {
    Green,
    Yellow,
    Red,
}

impl LoadBand {
    fn for_score(score: i32) -> Self {
        if score >= 70 {
            Self::Green
        } else if score >= 40 {
            Self::Yellow
        } else {
            Self::Red
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeLoadIndex {
    pub score: i32,
    pub band: LoadBand,
    /// One entry per matched rule, in match order
    pub restrictions: Vec<&'static str>,
}

impl SafeLoadIndex {
    pub fn render(&self) -> String {
        let mut out = format!("Safe Load Index: {}% — {}\n", self.score, self.band.as_str());
        if self.restrictions.is_empty() {
            out.push_str("No restrictions. All exercises are safe.");
        } else {
            out.push_str("Restrictions:\n");
            let lines: Vec<String> = self
                .restrictions
                .iter()
                .map(|r| format!("  - {}", r))
                .collect();
            out.push_str(&lines.join("\n"));
        }
        out
    }
}

/// Safe Load Index for comma-separated condition labels.
///
/// Every rule is checked against every label, so penalties stack both across
/// labels and when one label matches several rules.
pub fn safe_load_index(conditions: &str) -> SafeLoadIndex {
    let mut score = SLI_BASE;
    let mut restrictions = Vec::new();

    for label in conditions.split(',').map(|c| c.trim().to_lowercase()) {
        for rule in LOAD_RULES {
            if rule.keywords.iter().any(|k| label.contains(k)) {
                score -= rule.penalty;
                restrictions.push(rule.restriction);
            }
        }
    }

    let score = score.max(SLI_FLOOR);
    SafeLoadIndex {
        score,
        band: LoadBand::for_score(score),
        restrictions,
    }
}

// ── Risk factor analysis ──

pub const RISK_BASE: i32 = 25;
pub const RISK_MIN: i32 = 5;
pub const RISK_MAX: i32 = 95;

const DEFAULT_HEART_RATE: f64 = 72.0;
const DEFAULT_SPO2: f64 = 98.0;
const DEFAULT_STRESS: f64 = 30.0;
const DEFAULT_SLEEP_HOURS: f64 = 7.0;
const DEFAULT_SYSTOLIC: f64 = 120.0;

/// Medication adherence counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Adherence {
    pub total: u64,
    pub taken: u64,
}

impl Adherence {
    /// Percentage taken, one decimal; 100 when nothing is prescribed
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.taken as f64 / self.total as f64 * 1000.0).round() / 10.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiskInputs {
    /// Latest vital snapshot, if the user has uploaded any
    pub vitals: Option<VitalSnapshot>,
    pub adherence: Adherence,
    /// Completed exercise sessions in the last 7 days
    pub weekly_sessions: u64,
    pub is_athlete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    fn for_score(score: i32) -> Self {
        if score < 30 {
            Self::Low
        } else if score < 60 {
            Self::Moderate
        } else {
            Self::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
        }
    }
}

/// One contribution to the risk score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskFactor {
    pub label: String,
    /// Signed percentage points; zero for informational entries
    pub contribution: i32,
}

impl RiskFactor {
    fn new(label: String, contribution: i32) -> Self {
        Self {
            label,
            contribution,
        }
    }
}

impl std::fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.contribution == 0 {
            write!(f, "{}", self.label)
        } else {
            write!(f, "{}: {:+}% risk", self.label, self.contribution)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessment {
    pub score: i32,
    pub level: RiskLevel,
    pub factors: Vec<RiskFactor>,
}

impl RiskAssessment {
    pub fn render(&self) -> String {
        let factors: Vec<String> = self.factors.iter().map(|f| format!("  {}", f)).collect();
        format!(
            "=== Health Risk Analysis (SHAP Factors) ===\n\
             Overall Risk Score: {}% — {}\n\n\
             Factor Analysis:\n{}",
            self.score,
            self.level.as_str(),
            factors.join("\n")
        )
    }
}

/// Multi-factor risk score, clamped to [`RISK_MIN`, `RISK_MAX`]
pub fn assess_risk(inputs: &RiskInputs) -> RiskAssessment {
    let mut factors = Vec::new();

    match &inputs.vitals {
        Some(v) => vital_factors(v, inputs.is_athlete, &mut factors),
        None => factors.push(RiskFactor::new(
            "No vitals data available — upload data for accurate assessment".to_string(),
            0,
        )),
    }

    let sessions = inputs.weekly_sessions;
    factors.push(if sessions >= 4 {
        RiskFactor::new(format!("Active Exercise ({} sessions/week)", sessions), -15)
    } else if sessions >= 2 {
        RiskFactor::new(format!("Moderate Exercise ({} sessions/week)", sessions), -5)
    } else {
        RiskFactor::new(format!("Low Exercise ({} sessions/week)", sessions), 10)
    });

    let rate = inputs.adherence.rate();
    if rate >= 90.0 {
        factors.push(RiskFactor::new(
            format!("High Medication Adherence ({}%)", num(rate)),
            -8,
        ));
    } else if rate >= 70.0 {
        factors.push(RiskFactor::new(
            format!("Moderate Medication Adherence ({}%)", num(rate)),
            5,
        ));
    } else if inputs.adherence.total > 0 {
        factors.push(RiskFactor::new(
            format!("Low Medication Adherence ({}%)", num(rate)),
            12,
        ));
    }

    let raw: i32 = RISK_BASE + factors.iter().map(|f| f.contribution).sum::<i32>();
    let score = raw.clamp(RISK_MIN, RISK_MAX);
    RiskAssessment {
        score,
        level: RiskLevel::for_score(score),
        factors,
    }
}

fn vital_factors(v: &VitalSnapshot, is_athlete: bool, factors: &mut Vec<RiskFactor>) {
    let hr = v.heart_rate.unwrap_or(DEFAULT_HEART_RATE);
    factors.push(if hr > 100.0 {
        RiskFactor::new(format!("Elevated Heart Rate ({} bpm)", num(hr)), 10)
    } else if hr < 60.0 && !is_athlete {
        RiskFactor::new(format!("Low Heart Rate ({} bpm)", num(hr)), 5)
    } else {
        RiskFactor::new(format!("Normal Heart Rate ({} bpm)", num(hr)), -5)
    });

    let spo2 = v.spo2.unwrap_or(DEFAULT_SPO2);
    factors.push(if spo2 < 95.0 {
        RiskFactor::new(format!("Low SpO2 ({}%)", num(spo2)), 15)
    } else if spo2 < 97.0 {
        RiskFactor::new(format!("Borderline SpO2 ({}%)", num(spo2)), 3)
    } else {
        RiskFactor::new(format!("Normal SpO2 ({}%)", num(spo2)), -3)
    });

    let stress = v.stress_level.unwrap_or(DEFAULT_STRESS);
    factors.push(if stress > 70.0 {
        RiskFactor::new(format!("High Stress ({}/100)", num(stress)), 12)
    } else if stress > 40.0 {
        RiskFactor::new(format!("Moderate Stress ({}/100)", num(stress)), 5)
    } else {
        RiskFactor::new(format!("Low Stress ({}/100)", num(stress)), -8)
    });

    let sleep = v.sleep_hours.unwrap_or(DEFAULT_SLEEP_HOURS);
    if sleep < 5.0 {
        factors.push(RiskFactor::new(format!("Very Poor Sleep ({}h)", num(sleep)), 15));
    } else if sleep < 6.0 {
        factors.push(RiskFactor::new(format!("Insufficient Sleep ({}h)", num(sleep)), 10));
    } else if sleep >= 7.0 {
        factors.push(RiskFactor::new(format!("Good Sleep ({}h)", num(sleep)), -10));
    }

    let bp = v.blood_pressure_sys.unwrap_or(DEFAULT_SYSTOLIC);
    factors.push(if bp >= 140.0 {
        RiskFactor::new(format!("High Blood Pressure ({} mmHg)", num(bp)), 12)
    } else if bp >= 130.0 {
        RiskFactor::new(format!("Elevated Blood Pressure ({} mmHg)", num(bp)), 5)
    } else {
        RiskFactor::new(format!("Normal Blood Pressure ({} mmHg)", num(bp)), -5)
    });
}
