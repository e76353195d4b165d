//! Error types for each domain.
//!
//! The pipeline boundary is the only place these turn into user-visible
//! text (see `user_message`). Nothing here ever reaches the host as a panic.

use thiserror::Error;

/// Failures of a single LLM Gateway call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// No credential available. Checked before any network attempt.
    #[error("No API key configured. Set ANTHROPIC_API_KEY (or CLAUDE_API_KEY) and restart.")]
    Configuration,

    /// The request's cancellation token fired before or during the call.
    #[error("Request cancelled")]
    Cancelled,

    /// Credential rejected upstream (401/403).
    #[error("Authentication failed ({status}): {body}")]
    Auth { status: u16, body: String },

    #[error("Rate limited ({status}): {body}")]
    RateLimit { status: u16, body: String },

    /// Every other HTTP or network failure. `status` is absent when the
    /// request never produced a response.
    #[error("Transport error ({status:?}): {body}")]
    Transport { status: Option<u16>, body: String },
}

impl GatewayError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled)
    }

    /// Text shown to the user in SolutionError / DebugError events.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Configuration => self.to_string(),
            GatewayError::Cancelled => "Processing was interrupted".to_string(),
            GatewayError::Auth { .. } => {
                "The API key was rejected. Check your API key and try again.".to_string()
            }
            GatewayError::RateLimit { .. } => {
                "Rate limit reached. Wait a moment, then try again.".to_string()
            }
            GatewayError::Transport { status: Some(status), .. } => {
                format!("The model request failed with status {}. Try again.", status)
            }
            GatewayError::Transport { status: None, body } => {
                format!("Could not reach the model: {}", truncate(body, 200))
            }
        }
    }
}

/// Screenshot Store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Screenshot not found: {0}")]
    NotFound(String),

    #[error("Screenshot I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Screen source failures (the platform grabber is an external collaborator).
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No capture source configured. Set CAPTURE_SOURCE or use `import <path>`.")]
    NoSource,

    #[error("Failed to read capture from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a pipeline did not complete. Converted to exactly one terminal event.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Out of credits")]
    OutOfCredits,

    #[error("No screenshots to process")]
    NoScreenshots,

    #[error("No solution to debug yet. Solve the problem first.")]
    MissingSolution,

    #[error("No problem statement available. Solve the problem again.")]
    MissingProblemInfo,

    #[error("The model returned an empty response")]
    EmptyResponse,

    /// A newer Solve replaced the problem while a Debug was running.
    #[error("The problem changed while debugging. Capture the error again and retry.")]
    ProblemChanged,

    #[error("Failed to load screenshots: {0}")]
    Screenshot(#[from] StoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl PipelineError {
    pub(crate) fn cancelled() -> Self {
        PipelineError::Gateway(GatewayError::Cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Gateway(GatewayError::Cancelled))
    }

    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Gateway(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// A command line the driver could not understand.
#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
}

/// Startup failures of the headless driver.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
