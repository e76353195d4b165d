//! Result Interpreter: raw model text → records.
//!
//! Never fails. A malformed but non-empty extraction response degrades to
//! a record that carries the raw text as its description, so the pipeline
//! keeps going and the user still sees what the model said.

use super::types::{DebugRecord, ProblemInfo, SolutionRecord};
use regex::Regex;
use std::sync::OnceLock;

/// Outcome of parsing an extraction response.
#[derive(Debug, Clone, PartialEq)]
pub enum ProblemParse {
    Structured(ProblemInfo),
    Degraded(String),
}

impl ProblemParse {
    pub fn into_problem(self) -> ProblemInfo {
        match self {
            ProblemParse::Structured(info) => info,
            ProblemParse::Degraded(raw) => ProblemInfo::from_raw(&raw),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ProblemParse::Structured(_))
    }
}

/// Parse an extraction response.
///
/// Tries, in order: the whole text as JSON, a fenced ```json block, and the
/// outermost `{...}` slice. Anything else is `Degraded` with the input verbatim.
pub fn parse_problem(raw: &str) -> ProblemParse {
    if let Some(info) = parse_object(raw.trim()) {
        return ProblemParse::Structured(info);
    }

    if let Some(block) = fenced_json_block(raw) {
        if let Some(info) = parse_object(block.trim()) {
            return ProblemParse::Structured(info);
        }
    }

    if let Some(slice) = outer_object_slice(raw) {
        if let Some(info) = parse_object(slice) {
            return ProblemParse::Structured(info);
        }
    }

    log::warn!(
        "[LLM] Extraction response is not JSON — degrading ({} chars)",
        raw.len()
    );
    ProblemParse::Degraded(raw.to_string())
}

/// Solution text is stored verbatim; the language travels alongside.
pub fn parse_solution_response(raw: &str, language: &str) -> SolutionRecord {
    SolutionRecord {
        solution: raw.to_string(),
        language: language.to_string(),
    }
}

/// Debug text is stored verbatim, same contract as solutions.
pub fn parse_debug_response(raw: &str, language: &str) -> DebugRecord {
    DebugRecord {
        debug_solution: raw.to_string(),
        language: language.to_string(),
    }
}

/// Only JSON objects count; `42` or `"text"` are valid JSON but not a record.
fn parse_object(text: &str) -> Option<ProblemInfo> {
    if !text.starts_with('{') {
        return None;
    }
    match serde_json::from_str::<ProblemInfo>(text) {
        Ok(info) => Some(info),
        Err(e) => {
            log::debug!("[LLM] Problem JSON parse failed: {}", e);
            None
        }
    }
}

/// Contents of the first fenced code block labeled `json`.
fn fenced_json_block(raw: &str) -> Option<&str> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let re = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[ \t]*(?i:json)[ \t]*\r?\n(.*?)```").expect("fence pattern is valid")
    });
    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn outer_object_slice(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}
