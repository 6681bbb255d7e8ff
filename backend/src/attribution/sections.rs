use shared::SectionSet;

pub const NO_VISUAL_FINDINGS: &str = "No specific visual findings detailed.";
pub const EMPTY_RESPONSE_ANSWER: &str = "The model returned an empty response.";

const BOLD: &str = "**";
// Checked in order; `**NAME**` must come last since it prefixes `**NAME**:`.
const HEADER_CLOSERS: [&str; 3] = [":**", "**:", BARE_CLOSER];
// Without a colon the marker only counts as a header when it opens its line.
const BARE_CLOSER: &str = "**";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Visual,
    Research,
    FinalAnswer,
}

impl SectionKind {
    pub const ALL: [SectionKind; 3] = [
        SectionKind::Visual,
        SectionKind::Research,
        SectionKind::FinalAnswer,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            SectionKind::Visual => "VISUAL FINDINGS",
            SectionKind::Research => "RESEARCH FINDINGS",
            SectionKind::FinalAnswer => "FINAL ANSWER",
        }
    }
}

/// A recognized header; `start..end` covers the whole bold marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderHit {
    pub kind: SectionKind,
    pub start: usize,
    pub end: usize,
}

fn opens_line(text: &str, start: usize) -> bool {
    let line_start = text[..start].rfind('\n').map_or(0, |newline| newline + 1);
    text[line_start..start]
        .chars()
        .all(|c| c.is_whitespace() || c == '#')
}

fn match_header_at(text: &str, start: usize) -> Option<HeaderHit> {
    let rest = &text[start + BOLD.len()..];
    SectionKind::ALL.iter().find_map(|kind| {
        let after_name = rest.strip_prefix(kind.header())?;
        let closer = HEADER_CLOSERS
            .iter()
            .find(|closer| after_name.starts_with(**closer))?;
        if *closer == BARE_CLOSER && !opens_line(text, start) {
            return None;
        }
        Some(HeaderHit {
            kind: *kind,
            start,
            end: start + BOLD.len() + kind.header().len() + closer.len(),
        })
    })
}

/// Single left-to-right pass over `text` collecting every header in order of appearance.
pub fn scan_headers(text: &str) -> Vec<HeaderHit> {
    let mut hits = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find(BOLD) {
        let at = pos + offset;
        match match_header_at(text, at) {
            Some(hit) => {
                pos = hit.end;
                hits.push(hit);
            }
            // `*` is one byte, so stepping by one keeps `pos` on a char boundary
            None => pos = at + 1,
        }
    }

    hits
}

/// Body of the first `kind` header, up to the next header of any kind. `None` when absent or blank.
pub fn section_body<'a>(text: &'a str, hits: &[HeaderHit], kind: SectionKind) -> Option<&'a str> {
    let index = hits.iter().position(|hit| hit.kind == kind)?;
    let body_start = hits[index].end;
    let body_end = hits.get(index + 1).map_or(text.len(), |next| next.start);
    let body = text[body_start..body_end].trim();
    (!body.is_empty()).then_some(body)
}

pub fn extract_sections(text: &str) -> SectionSet {
    let hits = scan_headers(text);

    let visual_findings = match section_body(text, &hits, SectionKind::Visual) {
        Some(body) => body.lines().map(String::from).collect(),
        None => vec![NO_VISUAL_FINDINGS.to_string()],
    };

    let research_findings = section_body(text, &hits, SectionKind::Research)
        .unwrap_or_default()
        .to_string();

    let final_answer = match section_body(text, &hits, SectionKind::FinalAnswer) {
        Some(body) => body.to_string(),
        None if text.is_empty() => EMPTY_RESPONSE_ANSWER.to_string(),
        None => text.to_string(),
    };

    SectionSet {
        visual_findings,
        research_findings,
        final_answer,
    }
}
