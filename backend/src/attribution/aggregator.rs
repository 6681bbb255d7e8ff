use log::debug;
use rand::Rng;
use serde_json::Value;
use shared::{AttributionRecord, RawResponse, ToolTrace};

use super::detector::{MarkerPhraseDetector, ToolActivityDetector, TraceDetector};
use super::evidence::{EvidenceSource, PlaceholderEvidence, TraceEvidence};
use super::scoring;
use super::sections::extract_sections;

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Turns one model response into an [`AttributionRecord`].
///
/// Holds no reference to the response or to any media after `aggregate` returns.
pub struct Aggregator {
    detector: Box<dyn ToolActivityDetector>,
    evidence: Box<dyn EvidenceSource>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(MarkerPhraseDetector, PlaceholderEvidence)
    }
}

impl Aggregator {
    pub fn new(
        detector: impl ToolActivityDetector + 'static,
        evidence: impl EvidenceSource + 'static,
    ) -> Self {
        Self {
            detector: Box::new(detector),
            evidence: Box::new(evidence),
        }
    }

    pub fn trace_backed() -> Self {
        Self::new(TraceDetector::default(), TraceEvidence)
    }

    pub fn aggregate<R: Rng + ?Sized>(&self, raw: &RawResponse, rng: &mut R) -> AttributionRecord {
        let sections = extract_sections(&raw.text);
        let tool_activity_signal = self.detector.detect(raw);
        let score = scoring::score(tool_activity_signal, rng);
        let evidence = self.evidence.gather(raw);

        debug!(
            "Aggregated response of {} bytes: tool activity {}, visual {}%, search {}%",
            raw.text.len(),
            tool_activity_signal,
            score.visual_score(),
            score.search_score()
        );

        AttributionRecord {
            score,
            tool_activity_signal,
            sections,
            evidence,
        }
    }

    /// Same as [`Aggregator::aggregate`] for a response that has not been type-checked yet.
    pub fn aggregate_value<R: Rng + ?Sized>(
        &self,
        value: &Value,
        rng: &mut R,
    ) -> Result<AttributionRecord, AggregationError> {
        let raw = raw_response_from_value(value)?;
        Ok(self.aggregate(&raw, rng))
    }
}

fn raw_response_from_value(value: &Value) -> Result<RawResponse, AggregationError> {
    let object = match value {
        Value::Object(object) => object,
        Value::Null => {
            return Err(AggregationError::InvalidInput("missing response".into()));
        }
        other => {
            return Err(AggregationError::InvalidInput(format!(
                "response must be an object, got {}",
                json_type(other)
            )));
        }
    };

    let text = match object.get("text") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => {
            return Err(AggregationError::InvalidInput(format!(
                "`text` must be a string, got {}",
                json_type(other)
            )));
        }
        None => return Err(AggregationError::InvalidInput("missing `text` field".into())),
    };

    let tool_activity_signal = object
        .get("tool_activity_signal")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let trace = match object.get("trace") {
        None | Some(Value::Null) => None,
        Some(trace) => Some(
            serde_json::from_value::<ToolTrace>(trace.clone())
                .map_err(|e| AggregationError::InvalidInput(format!("malformed `trace`: {}", e)))?,
        ),
    };

    Ok(RawResponse {
        text,
        tool_activity_signal,
        trace,
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
