//! Keyword routing of incoming messages to a specialty
//!
//! Each specialty scores the sum of weights of its lexicon terms found in the
//! lower-cased message. The highest score wins; ties go to the earlier
//! specialty in [`Specialty::ALL`], and a message matching nothing goes to
//! [`Specialty::FALLBACK`]. A caller-supplied specialty that parses always
//! takes precedence.

use tracing::debug;

use crate::specialty::Specialty;

/// Per-specialty scores in [`Specialty::ALL`] order
pub type ScoreTable = [(Specialty, u32); 4];

/// Pick the specialty for `message`, honoring a valid explicit request
pub fn route(message: &str, requested: Option<&str>) -> Specialty {
    if let Some(specialty) = requested.and_then(|r| r.parse::<Specialty>().ok()) {
        debug!("Routing to requested specialty {}", specialty);
        return specialty;
    }
    let (specialty, scores) = route_scored(message);
    debug!("Routed to {} (scores: {:?})", specialty, scores);
    specialty
}

/// Score every specialty and return the winner alongside the table
pub fn route_scored(message: &str) -> (Specialty, ScoreTable) {
    let lower = message.to_lowercase();
    let scores = Specialty::ALL.map(|sp| (sp, score(sp, &lower)));

    let mut best = (Specialty::FALLBACK, 0);
    for &(sp, s) in &scores {
        if s > best.1 {
            best = (sp, s);
        }
    }
    (best.0, scores)
}

fn score(specialty: Specialty, lower: &str) -> u32 {
    specialty
        .lexicon()
        .iter()
        .filter(|term| lower.contains(term.term))
        .map(|term| term.weight)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_specialty_overrides_scoring() {
        assert_eq!(
            route("what should I eat for breakfast", Some("exercise")),
            Specialty::Exercise
        );
        assert_eq!(route("my heart rate", Some("RISK")), Specialty::Risk);
    }

    #[test]
    fn test_invalid_request_falls_back_to_scoring() {
        assert_eq!(
            route("high protein breakfast ideas", Some("cardiology")),
            Specialty::Nutrition
        );
    }

    #[test]
    fn test_keyword_routing() {
        assert_eq!(route("my blood pressure reading is 150", None), Specialty::Clinical);
        assert_eq!(route("best squat workout for legs", None), Specialty::Exercise);
        assert_eq!(route("predict my future risk", None), Specialty::Risk);
        assert_eq!(route("كم سعرة في وجبة الفطور", None), Specialty::Nutrition);
    }

    #[test]
    fn test_no_match_goes_to_fallback() {
        assert_eq!(route("hello there", None), Specialty::Clinical);
        assert_eq!(route("", None), Specialty::Clinical);
    }

    #[test]
    fn test_tie_prefers_priority_order() {
        // "heart" (clinical) and "risk" (risk) score 1 each
        let (winner, scores) = route_scored("heart risk");
        assert_eq!(scores[0], (Specialty::Clinical, 1));
        assert_eq!(scores[3], (Specialty::Risk, 1));
        assert_eq!(winner, Specialty::Clinical);

        // "وزن" is in both the nutrition and exercise lexicons
        let (winner, scores) = route_scored("وزن");
        assert_eq!(scores[1].1, scores[2].1);
        assert_eq!(winner, Specialty::Nutrition);
    }

    #[test]
    fn test_routing_is_total() {
        for msg in ["", "?", "ضغط", "SHAP values please", "🙂"] {
            let sp = route(msg, None);
            assert!(Specialty::ALL.contains(&sp));
        }
    }
}
