//! LLM domain: gateway, prompts and result interpretation.
//!
//! External code should only use what is re-exported here:
//!   - gateway.rs     `LlmGateway` trait + Anthropic Messages API client
//!   - prompts.rs     instructions and message builders for the four calls
//!   - interpret.rs   raw text → `ProblemInfo` / solution / debug records
//!   - types.rs       prompt parts, request options, problem record

pub mod gateway;
pub mod interpret;
pub mod prompts;
pub mod types;

pub use gateway::{AnthropicGateway, LlmGateway};
pub use interpret::{parse_debug_response, parse_problem, parse_solution_response, ProblemParse};
pub use types::{
    DebugRecord, Example, ImageBlock, ProblemInfo, PromptPart, RequestOptions, SamplingParams,
    SolutionRecord,
};
