//! Screen capture domain: public API.
//!
//! This module owns the screenshot queues and the files behind them.
//! Grabbing pixels off the screen is the platform's job; it reaches us
//! through `ScreenSource`.

mod source;
mod store;
mod thumbnail;

pub use source::{FileSource, NoSource, ScreenSource};
pub use store::ScreenshotStore;
pub use thumbnail::{encode_png, media_type_for, thumbnail_data_url};

use serde::Serialize;
use std::path::PathBuf;

/// Which of the two independent queues an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QueueKind {
    /// Screenshots of the problem, read by the Solve pipeline.
    Primary,
    /// Screenshots of a failing run, read by the Debug pipeline.
    Auxiliary,
}

/// A captured screenshot as seen by callers. `position` is its index in the
/// queue at the time the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotRef {
    pub path: PathBuf,
    pub position: usize,
}
