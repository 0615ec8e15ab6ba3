//! Prompts sent to the language model.
//!
//! Kept in one place so the wording can be inspected by tests and changed
//! without touching the request plumbing in [`crate::pipeline::analyze`] and
//! [`crate::pipeline::ocr`].

/// System message for plan analysis.
///
/// Used when `EstimatorConfig::system_prompt` is `None`.
pub const ANALYSIS_SYSTEM_PROMPT: &str = "You are an expert in construction plan analysis.";

/// System message for the vision OCR engine.
pub const OCR_SYSTEM_PROMPT: &str = r#"You are an OCR engine for architectural and construction drawings.

Transcribe ALL legible text on the page image exactly as written:
- title block fields, sheet numbers, revision notes
- room names and dimensions (keep units and symbols such as ' and ")
- schedules, legends and general notes, one line per row
- callouts and annotations, in top-to-bottom, left-to-right order

Output ONLY the transcribed text. No commentary, no Markdown, no code fences.
If the page has no legible text, output nothing."#;

/// Build the analysis instruction with the plan text embedded.
pub fn analysis_prompt(plan_text: &str) -> String {
    format!(
        "Extract room sizes, materials needed, and labor categories from the following construction plan:\n{plan_text}\n"
    )
}
