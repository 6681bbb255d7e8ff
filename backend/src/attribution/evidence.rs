use shared::{Evidence, EvidenceProvenance, RawResponse, WebSource};

pub const PLACEHOLDER_QUERIES: [&str; 2] = [
    "Query 1 (unavailable, no tool trace)",
    "Query 2 (unavailable, no tool trace)",
];
pub const PLACEHOLDER_SNIPPETS: [&str; 2] = [
    "Snippet 1 (unavailable, no tool trace)",
    "Snippet 2 (unavailable, no tool trace)",
];

/// Supplies the search queries and snippets shown in the evidence log.
pub trait EvidenceSource: Send + Sync {
    fn gather(&self, raw: &RawResponse) -> Evidence;
}

/// Fixed stand-ins, marked [`EvidenceProvenance::Placeholder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderEvidence;

impl EvidenceSource for PlaceholderEvidence {
    fn gather(&self, _raw: &RawResponse) -> Evidence {
        Evidence {
            search_queries: PLACEHOLDER_QUERIES.iter().map(|q| q.to_string()).collect(),
            search_snippets: PLACEHOLDER_SNIPPETS.iter().map(|s| s.to_string()).collect(),
            provenance: EvidenceProvenance::Placeholder,
        }
    }
}

/// Reads queries and cited sources from the response's tool trace.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceEvidence;

impl EvidenceSource for TraceEvidence {
    fn gather(&self, raw: &RawResponse) -> Evidence {
        match &raw.trace {
            Some(trace) if !trace.search_queries.is_empty() || !trace.sources.is_empty() => {
                Evidence {
                    search_queries: trace.search_queries.clone(),
                    search_snippets: trace.sources.iter().map(describe_source).collect(),
                    provenance: EvidenceProvenance::ToolTrace,
                }
            }
            _ => PlaceholderEvidence.gather(raw),
        }
    }
}

fn describe_source(source: &WebSource) -> String {
    match (&source.title, &source.uri) {
        (Some(title), Some(uri)) => format!("{} ({})", title, uri),
        (Some(title), None) => title.clone(),
        (None, Some(uri)) => uri.clone(),
        (None, None) => "Untitled source".to_string(),
    }
}
