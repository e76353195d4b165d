//! User preferences the pipeline reads: solution language and UI readiness.
//!
//! Readiness is a single-fire signal fired by the UI side once it can
//! answer for its settings. The orchestrator awaits it once before reading
//! the language, racing it against the request's cancellation token.

use std::sync::Mutex;
use tokio::sync::watch;

pub struct Preferences {
    default_language: String,
    language: Mutex<Option<String>>,
    ready_tx: watch::Sender<bool>,
    ready_rx: watch::Receiver<bool>,
}

impl Preferences {
    pub fn new(default_language: impl Into<String>) -> Self {
        let (ready_tx, ready_rx) = watch::channel(false);
        Self {
            default_language: default_language.into(),
            language: Mutex::new(None),
            ready_tx,
            ready_rx,
        }
    }

    /// Preferences that are ready from the start (headless use, tests).
    pub fn ready(default_language: impl Into<String>) -> Self {
        let prefs = Self::new(default_language);
        prefs.mark_ready();
        prefs
    }

    /// Fire the readiness signal. Later calls are no-ops.
    pub fn mark_ready(&self) {
        self.ready_tx.send_if_modified(|ready| !std::mem::replace(ready, true));
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Resolves once readiness has fired.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready_rx.clone();
        // The sender lives in `self`, so this only errors if it was never fired
        // and is being torn down; defaults apply either way.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Blank codes clear the override and fall back to the default.
    pub fn set_language(&self, code: &str) {
        let code = code.trim().to_lowercase();
        let mut guard = self.language.lock().unwrap_or_else(|e| e.into_inner());
        if code.is_empty() {
            *guard = None;
        } else {
            log::info!("[CONFIG] Language set to: {}", code);
            *guard = Some(code);
        }
    }

    pub fn language(&self) -> String {
        self.language
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_else(|| self.default_language.clone())
    }
}
