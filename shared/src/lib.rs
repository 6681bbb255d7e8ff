use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn noun(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::Video => "Video",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub media_kind: MediaKind,
    pub media_reference: String,
    pub question: String,
}

/// Record of the research the model performed, when the upstream exposes one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolTrace {
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub sources: Vec<WebSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSource {
    pub title: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    pub text: String,
    #[serde(default)]
    pub tool_activity_signal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<ToolTrace>,
}

impl RawResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_activity_signal: false,
            trace: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSet {
    pub visual_findings: Vec<String>,
    pub research_findings: String,
    pub final_answer: String,
}

/// Visual/research split. Always sums to 100; only constructible from the search share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScoreParts")]
pub struct AttributionScore {
    visual_score: u8,
    search_score: u8,
}

#[derive(Deserialize)]
struct ScoreParts {
    visual_score: u8,
    search_score: u8,
}

impl TryFrom<ScoreParts> for AttributionScore {
    type Error = String;

    fn try_from(parts: ScoreParts) -> Result<Self, Self::Error> {
        if parts.visual_score as u16 + parts.search_score as u16 != 100 {
            return Err(format!(
                "scores must sum to 100 (visual {}, search {})",
                parts.visual_score, parts.search_score
            ));
        }
        Ok(Self::from_search_score(parts.search_score))
    }
}

impl AttributionScore {
    pub fn from_search_score(search_score: u8) -> Self {
        let search_score = search_score.min(100);
        Self {
            visual_score: 100 - search_score,
            search_score,
        }
    }

    pub fn visual_score(&self) -> u8 {
        self.visual_score
    }

    pub fn search_score(&self) -> u8 {
        self.search_score
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceProvenance {
    /// Fixed stand-in values; no tool-call record was available.
    Placeholder,
    ToolTrace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub search_queries: Vec<String>,
    pub search_snippets: Vec<String>,
    pub provenance: EvidenceProvenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionRecord {
    pub score: AttributionScore,
    pub tool_activity_signal: bool,
    pub sections: SectionSet,
    pub evidence: Evidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorecardEntry {
    pub label: String,
    pub value: u8,
    pub caption: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub visual: ScorecardEntry,
    pub research: ScorecardEntry,
}

impl Scorecard {
    pub fn new(media_kind: MediaKind, score: &AttributionScore) -> Self {
        Self {
            visual: ScorecardEntry {
                label: format!("{} Insight Score", media_kind.title()),
                value: score.visual_score(),
                caption: "Direct Perception".into(),
                summary: format!(
                    "The answer relied on direct visual evidence (e.g. recognizing objects, reading text in the {}) for {}% of its data.",
                    media_kind.noun(),
                    score.visual_score()
                ),
            },
            research: ScorecardEntry {
                label: "Research Power Score".into(),
                value: score.search_score(),
                caption: "External Knowledge".into(),
                summary: format!(
                    "The answer relied on external web search data (e.g. facts, prices, dates) for {}% of its data.",
                    score.search_score()
                ),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub id: Uuid,
    pub media_kind: MediaKind,
    pub question: String,
    pub created_at: DateTime<Utc>,
    pub record: AttributionRecord,
    pub scorecard: Scorecard,
}

impl AnalysisResponse {
    pub fn new(id: Uuid, media_kind: MediaKind, question: String, record: AttributionRecord) -> Self {
        let scorecard = Scorecard::new(media_kind, &record.score);
        Self {
            id,
            media_kind,
            question,
            created_at: Utc::now(),
            record,
            scorecard,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
