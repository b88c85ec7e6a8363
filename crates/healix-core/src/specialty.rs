//! The closed set of assistant specialties and their routing lexicons

use anyhow::anyhow;
use healix_store::Domain;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specialty {
    Clinical,
    Nutrition,
    Exercise,
    Risk,
}

/// A routing term and the score it contributes when present
#[derive(Debug, Clone, Copy)]
pub struct LexiconTerm {
    pub term: &'static str,
    pub weight: u32,
}

const fn t(term: &'static str) -> LexiconTerm {
    LexiconTerm { term, weight: 1 }
}

const CLINICAL_TERMS: &[LexiconTerm] = &[
    t("heart"), t("blood"), t("pressure"), t("vital"), t("health"), t("symptom"),
    t("disease"), t("doctor"), t("oxygen"), t("spo2"), t("hrv"), t("temperature"),
    t("alert"), t("condition"), t("diagnosis"), t("pulse"),
    t("قلب"), t("ضغط"), t("دم"), t("صحة"), t("عرض"), t("مرض"), t("طبيب"), t("نبض"),
    t("اكسجين"), t("حرارة"), t("تشخيص"),
];

const NUTRITION_TERMS: &[LexiconTerm] = &[
    t("food"), t("eat"), t("diet"), t("meal"), t("calorie"), t("protein"), t("carb"),
    t("fat"), t("nutrition"), t("water"), t("supplement"), t("macro"), t("breakfast"),
    t("lunch"), t("dinner"), t("snack"), t("weight loss"), t("gain"),
    t("أكل"), t("طعام"), t("وجبة"), t("سعرة"), t("بروتين"), t("كربوهيدرات"), t("دهون"),
    t("تغذية"), t("ماء"), t("نظام غذائي"), t("فطور"), t("غداء"), t("عشاء"), t("مكمل"),
    t("وزن"),
];

const EXERCISE_TERMS: &[LexiconTerm] = &[
    t("exercise"), t("workout"), t("gym"), t("muscle"), t("training"), t("weight"),
    t("cardio"), t("stretch"), t("squat"), t("press"), t("curl"), t("pull"), t("push"),
    t("leg"), t("chest"), t("shoulder"), t("back"), t("arm"),
    t("تمرين"), t("تدريب"), t("عضلة"), t("رياضة"), t("جيم"), t("كارديو"), t("وزن"),
    t("سكوات"), t("بنش"), t("كتف"),
];

const RISK_TERMS: &[LexiconTerm] = &[
    t("risk"), t("predict"), t("future"), t("warning"), t("danger"), t("prevent"),
    t("scenario"), t("trend"), t("shap"), t("deterioration"), t("simulation"),
    t("digital twin"), t("compliance"), t("forecast"),
    t("خطر"), t("توقع"), t("مستقبل"), t("تحذير"), t("وقاية"), t("سيناريو"), t("تدهور"),
    t("محاكاة"),
];

impl Specialty {
    /// Every specialty, in tie-break priority order
    pub const ALL: [Specialty; 4] = [Self::Clinical, Self::Nutrition, Self::Exercise, Self::Risk];

    /// Used when no lexicon term matches
    pub const FALLBACK: Specialty = Self::Clinical;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clinical => "clinical",
            Self::Nutrition => "nutrition",
            Self::Exercise => "exercise",
            Self::Risk => "risk",
        }
    }

    /// Bilingual routing lexicon, matched as substrings of the lower-cased message
    pub fn lexicon(&self) -> &'static [LexiconTerm] {
        match self {
            Self::Clinical => CLINICAL_TERMS,
            Self::Nutrition => NUTRITION_TERMS,
            Self::Exercise => EXERCISE_TERMS,
            Self::Risk => RISK_TERMS,
        }
    }

    /// Evidence domain backing this specialty's knowledge search
    pub fn domain(&self) -> Domain {
        match self {
            Self::Clinical => Domain::Clinical,
            Self::Nutrition => Domain::Nutrition,
            Self::Exercise => Domain::Exercise,
            Self::Risk => Domain::Risk,
        }
    }
}

impl From<Specialty> for Domain {
    fn from(specialty: Specialty) -> Self {
        specialty.domain()
    }
}

impl std::fmt::Display for Specialty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Specialty {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|sp| sp.as_str() == wanted)
            .ok_or_else(|| anyhow!("Unknown specialty: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Risk".parse::<Specialty>().unwrap(), Specialty::Risk);
        assert_eq!(" NUTRITION ".parse::<Specialty>().unwrap(), Specialty::Nutrition);
        assert!("cardiology".parse::<Specialty>().is_err());
    }

    #[test]
    fn test_lexicon_terms_are_lowercase() {
        for sp in Specialty::ALL {
            assert!(!sp.lexicon().is_empty());
            for term in sp.lexicon() {
                assert_eq!(term.term, term.term.to_lowercase());
                assert!(term.weight > 0);
            }
        }
    }

    #[test]
    fn test_domain_mapping() {
        assert_eq!(Domain::from(Specialty::Exercise), Domain::Exercise);
        assert_eq!(Specialty::Clinical.domain().as_str(), "clinical");
    }
}
