//! Driver commands: one text line in, one JSON reply out.
//!
//! These are thin wrappers over the orchestrator. Each command does one
//! thing. `solve` and `debug` are long-running, so they are spawned and
//! their results arrive later as events.

use crate::capture::{QueueKind, ScreenshotRef};
use crate::error::CommandError;
use crate::pipeline::{Orchestrator, RequestKind, ViewState};
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Capture,
    Import(PathBuf),
    Delete(PathBuf),
    Solve,
    Debug,
    Cancel,
    Reset,
    Language(String),
    Credits,
    List,
    Quit,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let required = |name: &'static str| {
            if arg.is_empty() {
                Err(CommandError::MissingArgument(name))
            } else {
                Ok(arg.to_string())
            }
        };

        match name.to_ascii_lowercase().as_str() {
            "capture" => Ok(Command::Capture),
            "import" => required("import").map(|p| Command::Import(PathBuf::from(p))),
            "delete" => required("delete").map(|p| Command::Delete(PathBuf::from(p))),
            "solve" => Ok(Command::Solve),
            "debug" => Ok(Command::Debug),
            "cancel" => Ok(Command::Cancel),
            "reset" => Ok(Command::Reset),
            "language" => required("language").map(Command::Language),
            "credits" => Ok(Command::Credits),
            "list" => Ok(Command::List),
            "quit" | "exit" => Ok(Command::Quit),
            _ => Err(CommandError::Unknown(line.to_string())),
        }
    }
}

/// What the driver prints back for a command.
#[derive(Debug, Serialize)]
#[serde(tag = "reply", content = "payload", rename_all = "kebab-case")]
pub enum Reply {
    Ok,
    Screenshot(ScreenshotRef),
    Started(RequestKind),
    Cancelled(bool),
    Language(String),
    Credits(u32),
    Queues {
        view: ViewState,
        primary: Vec<ScreenshotRef>,
        auxiliary: Vec<ScreenshotRef>,
    },
    Error(String),
    Quit,
}

impl Reply {
    fn from_result<T, E: std::fmt::Display>(
        result: Result<T, E>,
        ok: impl FnOnce(T) -> Reply,
    ) -> Reply {
        match result {
            Ok(value) => ok(value),
            Err(e) => Reply::Error(e.to_string()),
        }
    }
}

/// Run one command. Must be called inside a tokio runtime: `solve` and
/// `debug` are spawned onto it.
pub fn dispatch(orchestrator: &Arc<Orchestrator>, command: Command) -> Reply {
    match command {
        Command::Capture => Reply::from_result(orchestrator.capture(), Reply::Screenshot),
        Command::Import(path) => {
            let image = image::open(&path).map_err(|source| {
                crate::error::CaptureError::Read {
                    path: path.display().to_string(),
                    source,
                }
            });
            Reply::from_result(
                image.and_then(|image| orchestrator.capture_image(&image)),
                Reply::Screenshot,
            )
        }
        Command::Delete(path) => {
            Reply::from_result(orchestrator.delete_screenshot(&path), |_| Reply::Ok)
        }
        Command::Solve => {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                let outcome = orchestrator.run_solve().await;
                log::debug!("[PIPELINE] Solve outcome: {:?}", outcome);
            });
            Reply::Started(RequestKind::Solve)
        }
        Command::Debug => {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                let outcome = orchestrator.run_debug().await;
                log::debug!("[PIPELINE] Debug outcome: {:?}", outcome);
            });
            Reply::Started(RequestKind::Debug)
        }
        Command::Cancel => Reply::Cancelled(orchestrator.cancel_all()),
        Command::Reset => {
            orchestrator.reset();
            Reply::Ok
        }
        Command::Language(code) => {
            orchestrator.set_language(&code);
            Reply::Language(orchestrator.language())
        }
        Command::Credits => Reply::Credits(orchestrator.get_credits()),
        Command::List => Reply::Queues {
            view: orchestrator.view(),
            primary: orchestrator.screenshots(QueueKind::Primary),
            auxiliary: orchestrator.screenshots(QueueKind::Auxiliary),
        },
        Command::Quit => Reply::Quit,
    }
}
