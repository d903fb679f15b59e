//! Heuristic tag extraction over raw manual text.
//!
//! Every function here is pure and total: arbitrary input never fails, it
//! degrades to `"Unknown"` codes, [`ContentType::General`] and empty tags.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{AircraftSystem, Annotation, ContentType, MetadataFragment, SafetyLevel};

pub const UNKNOWN: &str = "Unknown";

static CHAPTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2})\.([0-9]+)\.([0-9]+)").expect("valid chapter regex"));

static FLAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[Ff]laps?\s+([0-9]+)").expect("valid flap regex"));

/// One step of the content-type decision list. `matches` receives the
/// lowercased text.
pub struct ContentRule {
    pub category: ContentType,
    pub matches: fn(&str) -> bool,
}

/// Ordered classification rules; the first matching rule wins and
/// [`ContentType::General`] is the fallback.
pub static CONTENT_RULES: [ContentRule; 9] = [
    ContentRule { category: ContentType::NormalProcedure, matches: |t| is_procedure(t) && mentions_normal(t) },
    ContentRule {
        category: ContentType::EmergencyProcedure,
        matches: |t| is_procedure(t) && (t.contains("emergency") || t.contains("non-normal")),
    },
    ContentRule {
        category: ContentType::SupplementaryProcedure,
        matches: |t| is_procedure(t) && t.contains("supplementary"),
    },
    ContentRule { category: ContentType::Procedure, matches: is_procedure },
    ContentRule { category: ContentType::Checklist, matches: |t| t.contains("checklist") },
    ContentRule {
        category: ContentType::PerformanceData,
        matches: |t| contains_any(t, &["takeoff", "landing", "climb", "cruise"]) && contains_any(t, &["weight", "limit", "altitude", "fuel"]),
    },
    ContentRule {
        category: ContentType::SystemDescription,
        matches: |t| t.contains("system") || t.contains("description"),
    },
    ContentRule {
        category: ContentType::ControlsIndicators,
        matches: |t| contains_any(t, &["control", "indicator", "switch"]),
    },
    // "limitation" contains "limit"; both are listed to mirror the manual's wording.
    ContentRule { category: ContentType::Limitations, matches: |t| contains_any(t, &["limit", "limitation"]) },
];

/// Keyword registry in tag order. A system is detected when any keyword is a
/// substring of the lowercased text.
pub static SYSTEM_KEYWORDS: [(AircraftSystem, &[&str]); 12] = [
    (AircraftSystem::Hydraulic, &["hydraulic", "hyd system", "pressure"]),
    (AircraftSystem::Electrical, &["electrical", "generator", "battery", "bus"]),
    (AircraftSystem::Fuel, &["fuel system", "fuel tank", "fuel pump"]),
    (AircraftSystem::FlightControls, &["flight control", "elevator", "rudder", "aileron", "stabilizer"]),
    (AircraftSystem::Engines, &["engine", "thrust", "n1", "n2", "egt"]),
    (AircraftSystem::LandingGear, &["landing gear", "gear system", "brake"]),
    (AircraftSystem::Pneumatic, &["pneumatic", "bleed air", "pack"]),
    (AircraftSystem::IceRainProtection, &["anti-ice", "de-ice", "ice protection"]),
    (AircraftSystem::Navigation, &["navigation", "fmc", "autopilot", "ils"]),
    (AircraftSystem::FireProtection, &["fire", "overheat", "smoke"]),
    (AircraftSystem::Oxygen, &["oxygen", "crew oxygen", "passenger oxygen"]),
    (AircraftSystem::Doors, &["door", "entry", "overwing", "cargo"]),
];

/// Literal markers per annotation, in scan order.
const ANNOTATION_MARKERS: [(Annotation, &[&str]); 3] = [
    (Annotation::Warning, &["WARNING:", "Warning:"]),
    (Annotation::Caution, &["CAUTION:", "Caution:"]),
    (Annotation::Note, &["Note:", "NOTE:"]),
];

const PERFORMANCE_TERMS: [&str; 4] = ["table", "weight", "altitude", "pressure"];

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}

fn is_procedure(text: &str) -> bool {
    text.contains("procedure")
}

/// "normal" on its own, not as part of "non-normal".
fn mentions_normal(text: &str) -> bool {
    text.match_indices("normal").any(|(at, _)| !text[..at].ends_with("non-"))
}

/// First `XX.n.n` code in the text, split into (`XX.n`, `n`).
pub fn chapter_section(text: &str) -> (String, String) {
    match CHAPTER_RE.captures(text) {
        Some(caps) => (format!("{}.{}", &caps[1], &caps[2]), caps[3].to_string()),
        None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
    }
}

pub fn classify(text: &str) -> ContentType {
    let lower = text.to_lowercase();
    CONTENT_RULES
        .iter()
        .find(|rule| (rule.matches)(&lower))
        .map_or(ContentType::General, |rule| rule.category)
}

pub fn safety_annotations(text: &str) -> Vec<Annotation> {
    ANNOTATION_MARKERS
        .iter()
        .filter(|(_, markers)| contains_any(text, markers))
        .map(|(annotation, _)| *annotation)
        .collect()
}

pub fn safety_level(annotations: &[Annotation]) -> Option<SafetyLevel> {
    if annotations.is_empty() {
        None
    } else if annotations.contains(&Annotation::Warning) {
        Some(SafetyLevel::Critical)
    } else {
        Some(SafetyLevel::Important)
    }
}

pub fn aircraft_systems(text: &str) -> Vec<AircraftSystem> {
    let lower = text.to_lowercase();
    SYSTEM_KEYWORDS
        .iter()
        .filter(|(_, keywords)| contains_any(&lower, keywords))
        .map(|(system, _)| *system)
        .collect()
}

/// Distinct flap settings in order of first mention.
pub fn flap_settings(text: &str) -> Vec<String> {
    let mut settings: Vec<String> = Vec::new();
    for caps in FLAP_RE.captures_iter(text) {
        let value = &caps[1];
        if !settings.iter().any(|s| s == value) {
            settings.push(value.to_string());
        }
    }
    settings
}

pub fn extract(text: &str) -> MetadataFragment {
    let lower = text.to_lowercase();
    let (chapter, section) = chapter_section(text);
    let annotations = safety_annotations(text);
    MetadataFragment {
        chapter,
        section,
        content_type: classify(text),
        safety_level: safety_level(&annotations),
        annotations,
        systems: aircraft_systems(text),
        has_checklist: lower.contains("checklist"),
        has_performance_data: contains_any(&lower, &PERFORMANCE_TERMS),
        flap_settings: flap_settings(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_fixtures() {
        let cases = [
            ("Normal Procedure for engine start", ContentType::NormalProcedure),
            ("Non-Normal Procedure: engine fire", ContentType::EmergencyProcedure),
            ("Emergency procedure for cabin depressurization", ContentType::EmergencyProcedure),
            ("Supplementary Procedure: cold weather", ContentType::SupplementaryProcedure),
            ("Procedure: Go-Around", ContentType::Procedure),
            ("Before Takeoff Checklist", ContentType::Checklist),
            ("Maximum landing weight 66,360 kg", ContentType::PerformanceData),
            ("Takeoff performance at high altitude", ContentType::PerformanceData),
            ("Landing gear description", ContentType::SystemDescription),
            ("Hydraulic system overview", ContentType::SystemDescription),
            ("Panel switch positions", ContentType::ControlsIndicators),
            ("Operating limitations", ContentType::Limitations),
            ("Speed limit 250 knots below 10,000 ft", ContentType::Limitations),
            ("Introduction to this manual", ContentType::General),
            ("", ContentType::General),
        ];
        for (text, expected) in cases {
            assert_eq!(classify(text), expected, "text={text:?}");
        }
    }

    #[test]
    fn procedure_outranks_checklist_and_performance() {
        assert_eq!(classify("Takeoff weight procedure checklist"), ContentType::Procedure);
        assert_eq!(classify("Cruise fuel checklist"), ContentType::Checklist);
    }

    #[test]
    fn chapter_code_first_match_wins() {
        assert_eq!(
            chapter_section("See NP.21.10 and SP.12.4"),
            ("NP.21".to_string(), "10".to_string())
        );
        assert_eq!(chapter_section("np.21.10"), (UNKNOWN.to_string(), UNKNOWN.to_string()));
        assert_eq!(chapter_section("PD.1.2"), ("PD.1".to_string(), "2".to_string()));
    }

    #[test]
    fn annotations_follow_scan_order() {
        let text = "Note: check. CAUTION: hot. WARNING: stop.";
        assert_eq!(
            safety_annotations(text),
            vec![Annotation::Warning, Annotation::Caution, Annotation::Note]
        );
        assert_eq!(safety_level(&safety_annotations(text)), Some(SafetyLevel::Critical));
        assert_eq!(safety_level(&safety_annotations("NOTE: only a note")), Some(SafetyLevel::Important));
        assert_eq!(safety_level(&safety_annotations("warning: lowercase is ignored")), None);
    }

    #[test]
    fn systems_in_registry_order() {
        let text = "Engine fire: close the fuel pump switch and arm the cargo door";
        assert_eq!(
            aircraft_systems(text),
            vec![
                AircraftSystem::Fuel,
                AircraftSystem::Engines,
                AircraftSystem::FireProtection,
                AircraftSystem::Doors
            ]
        );
        assert!(aircraft_systems("nothing relevant here").is_empty());
    }

    #[test]
    fn flap_settings_deduplicated() {
        assert_eq!(flap_settings("Flaps 15, then flaps 40, then Flap 15"), vec!["15", "40"]);
        assert!(flap_settings("FLAPS 5").is_empty());
    }

    #[test]
    fn go_around_warning_example() {
        let fragment = extract("WARNING: Do not exceed Flaps 40 during Procedure: Go-Around. Monitor thrust.");
        assert_eq!(fragment.content_type, ContentType::Procedure);
        assert_eq!(fragment.annotations, vec![Annotation::Warning]);
        assert_eq!(fragment.safety_level, Some(SafetyLevel::Critical));
        assert_eq!(fragment.flap_settings, vec!["40"]);
        assert_eq!(fragment.chapter, UNKNOWN);
        assert_eq!(fragment.section, UNKNOWN);
    }

    #[test]
    fn performance_flag_is_independent_of_classification() {
        let fragment = extract("Hydraulic system pressure table");
        assert_eq!(fragment.content_type, ContentType::SystemDescription);
        assert!(fragment.has_performance_data);
        assert!(!fragment.has_checklist);
    }
}
