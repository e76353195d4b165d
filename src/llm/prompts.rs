//! LLM prompt constants and message builders.
//!
//! These prompts are the contract between the pipeline and the model.
//! The extraction prompt's JSON schema must stay in sync with
//! `types::ProblemInfo`.

use super::types::ProblemInfo;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// System prompt shared by all four calls.
pub const SYSTEM_PROMPT: &str = r#"You are an expert competitive programmer and coding interview coach. You read problems from screenshots, write correct and efficient solutions, and fix broken code. Follow the output format of each request exactly."#;

/// EXTRACT instruction: screenshots of a problem → ProblemInfo JSON.
pub const EXTRACT_PROBLEM_INSTRUCTION: &str = r#"The screenshots above show a coding problem. Extract the complete problem statement.

<rules>
1. Respond with ONLY a JSON object. No prose, no explanation.
2. Copy text faithfully. Do not solve the problem.
3. If a field is not present in the screenshots, use an empty string or empty list.
4. If the problem spans several screenshots, merge them in order.
</rules>

<response_format>
{
  "title": "<problem title>",
  "description": "<full problem statement>",
  "input_format": "<input format>",
  "output_format": "<output format>",
  "constraints": "<constraints, one per line>",
  "examples": [{"input": "<input>", "output": "<expected output>"}],
  "notes": "<additional notes>"
}
</response_format>"#;

/// EXTRACT-ERROR instruction: screenshots of a failing run → plain text.
pub const EXTRACT_ERROR_INSTRUCTION: &str = r#"The screenshots above show a coding problem and the result of running a solution against it: compiler output, failing test cases, runtime errors or wrong answers.

Describe precisely what went wrong. Quote error messages, failing inputs, expected outputs and actual outputs verbatim. Do not propose a fix. Respond with plain text only."#;

/// Builds the SOLVE message from the extracted problem statement.
pub fn build_solve_message(problem: &ProblemInfo, language: &str) -> String {
    format!(
        r#"Solve the following coding problem in {language}.

<problem>
{statement}
</problem>

<rules>
1. Start with a single fenced {language} code block containing the complete solution.
2. After the code, explain the approach in a few sentences.
3. State the time and space complexity.
4. Handle every edge case implied by the constraints.
</rules>"#,
        language = language,
        statement = problem.statement_json(),
    )
}

/// Builds the DEBUG message from the problem, the current solution and
/// the error description extracted from the latest screenshots.
pub fn build_debug_message(
    problem: &ProblemInfo,
    solution: &str,
    error_description: &str,
    language: &str,
) -> String {
    format!(
        r#"The {language} solution below fails for the problem described. Fix it.

<problem>
{statement}
</problem>

<current_solution>
{solution}
</current_solution>

<observed_error>
{error}
</observed_error>

<rules>
1. Start with a single fenced {language} code block containing the complete corrected solution.
2. Then list each change you made and why it fixes the observed error.
3. State the time and space complexity of the corrected solution.
</rules>"#,
        language = language,
        statement = problem.statement_json(),
        solution = solution.trim(),
        error = error_description.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_sum() -> ProblemInfo {
        ProblemInfo {
            title: "Two Sum".to_string(),
            description: "Return indices of the two numbers adding up to target.".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn solve_message_names_language_and_problem() {
        let msg = build_solve_message(&two_sum(), "rust");
        assert!(msg.contains("in rust"));
        assert!(msg.contains("fenced rust code block"));
        assert!(msg.contains("Two Sum"));
    }

    #[test]
    fn debug_message_carries_all_context() {
        let msg = build_debug_message(
            &two_sum(),
            "  fn two_sum() {}  ",
            "wrong answer on [3,3], 6",
            "rust",
        );
        assert!(msg.contains("<current_solution>\nfn two_sum() {}\n</current_solution>"));
        assert!(msg.contains("wrong answer on [3,3], 6"));
        assert!(msg.contains("Two Sum"));
    }

    #[test]
    fn extraction_schema_matches_record_fields() {
        for field in [
            "title",
            "description",
            "input_format",
            "output_format",
            "constraints",
            "examples",
            "notes",
        ] {
            assert!(
                EXTRACT_PROBLEM_INSTRUCTION.contains(&format!("\"{}\"", field)),
                "missing field {}",
                field
            );
        }
    }
}
