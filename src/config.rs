//! Application configuration and credential resolution.
//!
//! Everything is read once at startup, after `.env.local` / `.env` have
//! been loaded into the process environment.

use crate::llm::gateway::ANTHROPIC_MESSAGES_URL;
use crate::llm::prompts::DEFAULT_MODEL;
use crate::llm::SamplingParams;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Credential variables, in priority order. First non-empty wins.
pub const API_KEY_VARS: [&str; 2] = ["ANTHROPIC_API_KEY", "CLAUDE_API_KEY"];
const KEYRING_SERVICE: &str = "snapsolve";
const KEYRING_USER: &str = "anthropic";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
    pub request_timeout: Duration,
    pub max_screenshots: usize,
    pub initial_credits: u32,
    pub default_language: String,
    pub screenshot_dir: PathBuf,
    pub capture_source: Option<PathBuf>,
    pub sampling: PipelineSampling,
}

/// Sampling profiles for the four calls. Error extraction is an
/// extraction, not a generation, so it defaults to half the budget and a
/// lower temperature; both stay tunable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSampling {
    pub extract_problem: SamplingParams,
    pub solve: SamplingParams,
    pub extract_error: SamplingParams,
    pub debug: SamplingParams,
}

impl Default for PipelineSampling {
    fn default() -> Self {
        let generation = SamplingParams {
            max_tokens: 4000,
            temperature: 0.2,
        };
        Self {
            extract_problem: generation,
            solve: generation,
            extract_error: SamplingParams {
                max_tokens: 2000,
                temperature: 0.0,
            },
            debug: generation,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_url: ANTHROPIC_MESSAGES_URL.to_string(),
            request_timeout: Duration::from_secs(120),
            max_screenshots: 5,
            initial_credits: 50,
            default_language: "python".to_string(),
            screenshot_dir: default_screenshot_dir(),
            capture_source: None,
            sampling: PipelineSampling::default(),
        }
    }
}

impl AppConfig {
    /// Build from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Unset or unparsable values
    /// fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let text = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let params = |tokens: &str, temperature: &str, base: SamplingParams| SamplingParams {
            max_tokens: parse_or(&lookup, tokens, base.max_tokens),
            temperature: parse_or(&lookup, temperature, base.temperature),
        };

        let base = default.sampling;
        let sampling = PipelineSampling {
            extract_problem: params("SOLVE_MAX_TOKENS", "SOLVE_TEMPERATURE", base.extract_problem),
            solve: params("SOLVE_MAX_TOKENS", "SOLVE_TEMPERATURE", base.solve),
            extract_error: params("ERROR_MAX_TOKENS", "ERROR_TEMPERATURE", base.extract_error),
            debug: params("SOLVE_MAX_TOKENS", "SOLVE_TEMPERATURE", base.debug),
        };

        Self {
            api_key: resolve_api_key(&lookup),
            model: text("LLM_MODEL").unwrap_or(default.model),
            api_url: text("LLM_BASE_URL").unwrap_or(default.api_url),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "LLM_TIMEOUT_SECS",
                default.request_timeout.as_secs(),
            )),
            max_screenshots: parse_or(&lookup, "MAX_SCREENSHOTS", default.max_screenshots).max(1),
            initial_credits: parse_or(&lookup, "INITIAL_CREDITS", default.initial_credits),
            default_language: text("DEFAULT_LANGUAGE")
                .map(|l| l.to_lowercase())
                .unwrap_or(default.default_language),
            screenshot_dir: text("SCREENSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.screenshot_dir),
            capture_source: text("CAPTURE_SOURCE").map(PathBuf::from),
            sampling,
        }
    }
}

/// Resolve the API key: primary variable, legacy variable, then the OS
/// keychain.
fn resolve_api_key<F>(lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for name in API_KEY_VARS {
        if let Some(key) = lookup(name).filter(|k| !k.trim().is_empty()) {
            log::info!("[CONFIG] API key found in {} ({} chars)", name, key.trim().len());
            return Some(key.trim().to_string());
        }
    }

    match keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).and_then(|e| e.get_password()) {
        Ok(key) if !key.trim().is_empty() => {
            log::info!("[CONFIG] Loaded API key from OS keychain");
            Some(key.trim().to_string())
        }
        _ => {
            log::warn!("[CONFIG] No API key in {:?} or keychain", API_KEY_VARS);
            None
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Debug,
{
    match lookup(name) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("[CONFIG] Invalid {}={:?} — using {:?}", name, raw, default);
                default
            }
        },
    }
}

fn default_screenshot_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snapsolve")
}

/// Load `.env.local`, falling back to `.env`, from the working directory.
///
/// Runs before the logger exists (so `RUST_LOG` can come from the file),
/// hence stderr.
pub fn load_env_files() {
    for env_file in [".env.local", ".env"] {
        let path = std::path::Path::new(env_file);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            return;
        }
    }
}
