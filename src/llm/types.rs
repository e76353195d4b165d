//! LLM request and response types.
//!
//! `ProblemInfo` is the structured record the extraction call returns.
//! Field names follow the JSON the extraction prompt asks for, with a few
//! aliases for shapes models tend to drift into.

use serde::{Deserialize, Deserializer, Serialize};

// ── Prompt parts ───────────────────────────────────────────────────

/// One ordered block of a prompt sent to the Gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Text(String),
    Image(ImageBlock),
}

impl PromptPart {
    pub fn text(text: impl Into<String>) -> Self {
        PromptPart::Text(text.into())
    }
}

/// A base64 image payload with its declared media type.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    pub media_type: String,
    pub data: String,
}

/// Token budget and temperature for one kind of call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Options for a single Gateway call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: String,
}

impl RequestOptions {
    pub fn new(sampling: SamplingParams, system_prompt: impl Into<String>) -> Self {
        Self {
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
            system_prompt: system_prompt.into(),
        }
    }
}

// ── Problem record ─────────────────────────────────────────────────

/// One worked example from the problem statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Example {
    #[serde(default, deserialize_with = "lenient_text")]
    pub input: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub output: String,
}

/// The structured problem statement plus any generated solutions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemInfo {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, alias = "problem_statement", deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub input_format: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub output_format: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub constraints: String,
    #[serde(default, alias = "test_cases")]
    pub examples: Vec<Example>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_solution: Option<String>,
}

impl ProblemInfo {
    /// Degraded record for a response that could not be parsed.
    pub fn from_raw(raw: &str) -> Self {
        Self {
            description: raw.to_string(),
            ..Default::default()
        }
    }

    pub fn has_solution(&self) -> bool {
        self.solution.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// The statement alone, without solutions, as pretty JSON for prompts.
    pub fn statement_json(&self) -> String {
        let statement = ProblemInfo {
            solution: None,
            solution_language: None,
            debug_solution: None,
            ..self.clone()
        };
        serde_json::to_string_pretty(&statement).unwrap_or_else(|_| self.description.clone())
    }
}

/// Solution text stored verbatim, with the language it was requested in.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionRecord {
    pub solution: String,
    pub language: String,
}

/// Debugged solution text stored verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugRecord {
    pub debug_solution: String,
    pub language: String,
}

/// Accept a string, a list of strings, a number, or null for text fields.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraints_list_is_joined() {
        let info: ProblemInfo = serde_json::from_str(
            r#"{"title":"T","constraints":["1 <= n <= 10^5","-10^9 <= a[i] <= 10^9"]}"#,
        )
        .unwrap();
        assert_eq!(info.constraints, "1 <= n <= 10^5\n-10^9 <= a[i] <= 10^9");
    }

    #[test]
    fn aliases_are_accepted() {
        let info: ProblemInfo = serde_json::from_str(
            r#"{"problem_statement":"Find two numbers","test_cases":[{"input":"[2,7], 9","output":"[0,1]"}]}"#,
        )
        .unwrap();
        assert_eq!(info.description, "Find two numbers");
        assert_eq!(info.examples.len(), 1);
        assert_eq!(info.examples[0].output, "[0,1]");
    }

    #[test]
    fn numeric_example_values_become_text() {
        let info: ProblemInfo =
            serde_json::from_str(r#"{"examples":[{"input":5,"output":null}]}"#).unwrap();
        assert_eq!(info.examples[0].input, "5");
        assert_eq!(info.examples[0].output, "");
    }

    #[test]
    fn statement_json_omits_solutions() {
        let info = ProblemInfo {
            title: "Two Sum".to_string(),
            solution: Some("def f(): pass".to_string()),
            debug_solution: Some("fixed".to_string()),
            ..Default::default()
        };
        let json = info.statement_json();
        assert!(json.contains("Two Sum"));
        assert!(!json.contains("def f()"));
        assert!(!json.contains("fixed"));
    }

    #[test]
    fn blank_solution_does_not_count() {
        let mut info = ProblemInfo::default();
        assert!(!info.has_solution());
        info.solution = Some("  ".to_string());
        assert!(!info.has_solution());
        info.solution = Some("print(1)".to_string());
        assert!(info.has_solution());
    }
}
