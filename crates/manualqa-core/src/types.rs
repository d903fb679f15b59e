//! Domain types shared by ingestion, indexing and retrieval.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type ChunkId = String;

/// Classification of what a block of manual text is for.
///
/// Exactly one category is assigned per page; see
/// [`crate::metadata::CONTENT_RULES`] for the priority order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    NormalProcedure,
    EmergencyProcedure,
    SupplementaryProcedure,
    Procedure,
    Checklist,
    PerformanceData,
    SystemDescription,
    ControlsIndicators,
    Limitations,
    General,
}

impl ContentType {
    pub const ALL: [ContentType; 10] = [
        ContentType::NormalProcedure,
        ContentType::EmergencyProcedure,
        ContentType::SupplementaryProcedure,
        ContentType::Procedure,
        ContentType::Checklist,
        ContentType::PerformanceData,
        ContentType::SystemDescription,
        ContentType::ControlsIndicators,
        ContentType::Limitations,
        ContentType::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::NormalProcedure => "normal_procedure",
            ContentType::EmergencyProcedure => "emergency_procedure",
            ContentType::SupplementaryProcedure => "supplementary_procedure",
            ContentType::Procedure => "procedure",
            ContentType::Checklist => "checklist",
            ContentType::PerformanceData => "performance_data",
            ContentType::SystemDescription => "system_description",
            ContentType::ControlsIndicators => "controls_indicators",
            ContentType::Limitations => "limitations",
            ContentType::General => "general",
        }
    }

    /// Step-by-step content that must not be split mid-step when it fits.
    pub fn is_sequential(self) -> bool {
        matches!(
            self,
            ContentType::Procedure
                | ContentType::Checklist
                | ContentType::NormalProcedure
                | ContentType::EmergencyProcedure
        )
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    Critical,
    Important,
}

/// Safety marker found in the text. Declaration order is the scan order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Annotation {
    Warning,
    Caution,
    Note,
}

impl Annotation {
    pub fn as_str(self) -> &'static str {
        match self {
            Annotation::Warning => "WARNING",
            Annotation::Caution => "CAUTION",
            Annotation::Note => "NOTE",
        }
    }
}

/// Aircraft subsystem tags. Declaration order is the registry order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AircraftSystem {
    Hydraulic,
    Electrical,
    Fuel,
    FlightControls,
    Engines,
    LandingGear,
    Pneumatic,
    IceRainProtection,
    Navigation,
    FireProtection,
    Oxygen,
    Doors,
}

impl AircraftSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            AircraftSystem::Hydraulic => "hydraulic",
            AircraftSystem::Electrical => "electrical",
            AircraftSystem::Fuel => "fuel",
            AircraftSystem::FlightControls => "flight_controls",
            AircraftSystem::Engines => "engines",
            AircraftSystem::LandingGear => "landing_gear",
            AircraftSystem::Pneumatic => "pneumatic",
            AircraftSystem::IceRainProtection => "ice_rain_protection",
            AircraftSystem::Navigation => "navigation",
            AircraftSystem::FireProtection => "fire_protection",
            AircraftSystem::Oxygen => "oxygen",
            AircraftSystem::Doors => "doors",
        }
    }
}

/// Structured tags derived from a block of raw text.
///
/// Produced by [`crate::metadata::extract`]; never fails, unknown text
/// degrades to `"Unknown"` codes, `General` and empty tag sets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataFragment {
    pub chapter: String,
    pub section: String,
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_level: Option<SafetyLevel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub systems: Vec<AircraftSystem>,
    #[serde(default)]
    pub has_checklist: bool,
    #[serde(default)]
    pub has_performance_data: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flap_settings: Vec<String>,
}

impl MetadataFragment {
    /// One-line tag summary, e.g.
    /// `NP.21.10 procedure [WARNING] systems=fuel,engines flaps=15,40`.
    pub fn tag_line(&self) -> String {
        let mut line = format!("{}.{} {}", self.chapter, self.section, self.content_type);
        if !self.annotations.is_empty() {
            let annotations: Vec<&str> = self.annotations.iter().map(|a| a.as_str()).collect();
            line.push_str(&format!(" [{}]", annotations.join(",")));
        }
        if !self.systems.is_empty() {
            let systems: Vec<&str> = self.systems.iter().map(|s| s.as_str()).collect();
            line.push_str(&format!(" systems={}", systems.join(",")));
        }
        if !self.flap_settings.is_empty() {
            line.push_str(&format!(" flaps={}", self.flap_settings.join(",")));
        }
        line
    }
}

/// Page-level metadata inherited by every passage cut from the page.
///
/// - `source`: document path or URI as given to the loader
/// - `doc_id`: run-unique document identity used to scope chunk ids
/// - `page_number`: 1-based position of the page inside its document
/// - `char_count`: character count of the whole page text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageMetadata {
    pub source: String,
    pub doc_id: String,
    pub page_number: u32,
    pub char_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aircraft_type: Option<String>,
    #[serde(flatten)]
    pub tags: MetadataFragment,
}

/// Full metadata of a single passage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PassageMetadata {
    #[serde(flatten)]
    pub page: PageMetadata,
    pub chunk_index: usize,
    pub total_chunks: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunk_systems: Vec<AircraftSystem>,
    pub chunk_id: ChunkId,
}

/// Immutable unit of retrievable text.
///
/// Invariants: `text` is non-empty, `chunk_index < total_chunks`, and
/// `chunk_id` is unique across an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Passage {
    pub text: String,
    pub metadata: PassageMetadata,
}

impl Passage {
    pub fn chunk_id(&self) -> &str {
        &self.metadata.chunk_id
    }

    pub fn page_number(&self) -> u32 {
        self.metadata.page.page_number
    }

    pub fn content_type(&self) -> ContentType {
        self.metadata.page.tags.content_type
    }
}

/// Chunk id of the `index`-th passage of a page: `<doc_id>:p<page>_c<index>`.
pub fn chunk_id(doc_id: &str, page_number: u32, index: usize) -> ChunkId {
    format!("{doc_id}:p{page_number}_c{index}")
}

/// A passage paired with its cross-encoder relevance. Higher is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
}

/// Answer returned to the caller together with page provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub answer: String,
    pub pages: Vec<u32>,
}
