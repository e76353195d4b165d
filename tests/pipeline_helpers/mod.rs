//! Shared test helpers for orchestrator tests: a scripted gateway, a
//! recording event sink, and a harness that wires them together.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use snapsolve_lib::config::PipelineSampling;
use snapsolve_lib::error::GatewayError;
use snapsolve_lib::events::{EventSink, ProcessingEvent};
use snapsolve_lib::llm::{LlmGateway, PromptPart, RequestOptions};
use snapsolve_lib::pipeline::{Orchestrator, PipelineSettings};
use snapsolve_lib::capture::ScreenshotStore;
use snapsolve_lib::preferences::Preferences;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub const PROBLEM_JSON: &str = r#"{
  "title": "Two Sum",
  "description": "Return indices of the two numbers that add up to target.",
  "input_format": "nums: int[], target: int",
  "output_format": "int[2]",
  "constraints": ["2 <= nums.length <= 10^4", "exactly one answer"],
  "examples": [{"input": "nums = [2,7,11,15], target = 9", "output": "[0,1]"}]
}"#;

pub const SOLUTION_TEXT: &str = "```python\ndef two_sum(nums, target):\n    seen = {}\n    for i, n in enumerate(nums):\n        if target - n in seen:\n            return [seen[target - n], i]\n        seen[n] = i\n```\nO(n) time.";

// ── Scripted gateway ───────────────────────────────────────────────

/// One scripted answer, consumed in order.
pub enum Script {
    Text(String),
    Error(GatewayError),
    /// Block until the notify fires, then answer. Ignores the token.
    Gate(Arc<Notify>, String),
}

impl Script {
    pub fn text(text: &str) -> Self {
        Script::Text(text.to_string())
    }
}

/// What the orchestrator sent on one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub texts: Vec<String>,
    pub images: usize,
    pub options: RequestOptions,
}

impl RecordedCall {
    pub fn text(&self) -> String {
        self.texts.join("\n")
    }
}

#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<RecordedCall>>,
    outstanding: AtomicUsize,
    max_outstanding: AtomicUsize,
}

struct Outstanding<'a>(&'a AtomicUsize);

impl Drop for Outstanding<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedGateway {
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub fn max_outstanding(&self) -> usize {
        self.max_outstanding.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` calls have started.
    pub async fn wait_for_calls(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.call_count() < n {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("gateway was not called in time");
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn send(
        &self,
        parts: Vec<PromptPart>,
        options: RequestOptions,
        _cancel: &CancellationToken,
    ) -> Result<String, GatewayError> {
        let now = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_outstanding.fetch_max(now, Ordering::SeqCst);
        let _guard = Outstanding(&self.outstanding);

        let mut texts = Vec::new();
        let mut images = 0;
        for part in &parts {
            match part {
                PromptPart::Text(text) => texts.push(text.clone()),
                PromptPart::Image(_) => images += 1,
            }
        }
        self.calls.lock().unwrap().push(RecordedCall { texts, images, options });

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Script::Text(text)) => Ok(text),
            Some(Script::Error(e)) => Err(e),
            Some(Script::Gate(notify, text)) => {
                notify.notified().await;
                Ok(text)
            }
            None => Err(GatewayError::Transport {
                status: None,
                body: "script exhausted".to_string(),
            }),
        }
    }
}

// ── Recording sink ─────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProcessingEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProcessingEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.name()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().into_iter().filter(|n| *n == name).count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ProcessingEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ── Harness ────────────────────────────────────────────────────────

pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub gateway: Arc<ScriptedGateway>,
    pub sink: Arc<RecordingSink>,
    pub preferences: Arc<Preferences>,
    pub dir: TempDir,
}

pub fn harness(credits: u32, script: Vec<Script>) -> Harness {
    harness_with(credits, script, Preferences::ready("python"), 5)
}

pub fn harness_with(
    credits: u32,
    script: Vec<Script>,
    preferences: Preferences,
    capacity: usize,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let gateway = Arc::new(ScriptedGateway::new(script));
    let sink = Arc::new(RecordingSink::default());
    let preferences = Arc::new(preferences);
    let dyn_gateway: Arc<dyn LlmGateway> = gateway.clone();
    let dyn_sink: Arc<dyn EventSink> = sink.clone();

    let orchestrator = Orchestrator::new(
        ScreenshotStore::new(dir.path(), capacity),
        dyn_gateway,
        dyn_sink,
        preferences.clone(),
        PipelineSettings {
            initial_credits: credits,
            sampling: PipelineSampling::default(),
        },
    );

    Harness {
        orchestrator: Arc::new(orchestrator),
        gateway,
        sink,
        preferences,
        dir,
    }
}

/// A small solid-colour image standing in for a screen grab.
pub fn screen(shade: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 9, Rgb([shade, shade, shade])))
}
