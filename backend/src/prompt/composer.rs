use shared::MediaKind;

/// Builds the instruction asking the model for three bold-labeled sections:
/// VISUAL FINDINGS, RESEARCH FINDINGS and FINAL ANSWER, in that order.
///
/// The question is embedded verbatim and not validated here.
pub fn compose(media_kind: MediaKind, question: &str) -> String {
    let noun = media_kind.noun();
    let perception = match media_kind {
        MediaKind::Image => "Use object recognition, scene context and any visible text",
        MediaKind::Video => {
            "Use object recognition, scene context, the temporal flow between frames and any visible text"
        }
    };

    format!(
        "You are a highly capable Multimodal Analyst. Your final output MUST contain three separate, clearly marked sections, in this order: **VISUAL FINDINGS:**, **RESEARCH FINDINGS:** and **FINAL ANSWER:**. Do not nest one section inside another and do not use any other bold headers.

TASK:
1. Analyze the provided {noun} meticulously. {perception} to build a complete understanding. Output this summary under **VISUAL FINDINGS:**, one observation per line.
2. Perform web research to gather the external context you need. Output the synthesis of the search results under **RESEARCH FINDINGS:**.
3. Answer the user's question: {question}
The answer must fuse the visual findings with the research findings. Output this final conclusion under **FINAL ANSWER:**.

OUTPUT INSTRUCTIONS: Be comprehensive and professional, and include all three sections with their headers written exactly as shown."
    )
}
