use shared::RawResponse;

pub const MARKER_PHRASES: [&str; 2] = ["web search", "external sources"];

/// Decides whether the model appears to have used its research capability.
pub trait ToolActivityDetector: Send + Sync {
    fn detect(&self, raw: &RawResponse) -> bool;
}

/// Text heuristic: the response mentions one of [`MARKER_PHRASES`], in any case.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerPhraseDetector;

impl ToolActivityDetector for MarkerPhraseDetector {
    fn detect(&self, raw: &RawResponse) -> bool {
        let lowered = raw.text.to_lowercase();
        MARKER_PHRASES.iter().any(|phrase| lowered.contains(phrase))
    }
}

/// Uses the upstream signal when a tool trace came back with the response,
/// the marker-phrase heuristic otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceDetector {
    fallback: MarkerPhraseDetector,
}

impl ToolActivityDetector for TraceDetector {
    fn detect(&self, raw: &RawResponse) -> bool {
        match &raw.trace {
            Some(_) => raw.tool_activity_signal,
            None => self.fallback.detect(raw),
        }
    }
}
