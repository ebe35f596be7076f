//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `CONSILIUM_WORK_DIR` and `CONSILIUM_LOG_LEVEL` env overrides.
//! The inference API key comes from the `LLM_API_KEY` env var only — it is
//! never read from TOML.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

/// HTTP intake boundary configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Socket address the axum listener binds to.
    pub bind: String,
}

/// OpenAI / OpenAI-compatible provider configuration.
/// Populated from `[llm.openai]` in the TOML.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Sampling temperature — fixed per deployment, never per call.
    pub temperature: f32,
    /// Output token budget passed as `max_tokens` in the request body.
    pub max_tokens: u32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// Inference client configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (e.g. `"dummy"`, `"openai"`).
    /// Maps to `default` in `[llm]` TOML — named `default` there to signal
    /// that other provider sections can coexist without being loaded.
    pub provider: String,
    /// Config for the OpenAI / OpenAI-compatible provider (`[llm.openai]`).
    pub openai: OpenAiConfig,
}

/// Orchestrator tuning knobs (`[analysis]`).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Upper bound on any single specialist call. A stalled call is
    /// converted into an empty outcome for that specialist only; it never
    /// blocks the fan-out barrier indefinitely.
    pub specialist_timeout_seconds: u64,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub service_name: String,
    /// Working directory for persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub http: HttpConfig,
    pub llm: LlmConfig,
    pub analysis: AnalysisConfig,
    /// API key from `LLM_API_KEY` env var — `None` for keyless local models.
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Path of the SQLite report database inside `work_dir`.
    pub fn report_db_path(&self) -> PathBuf {
        self.work_dir.join("reports.db")
    }
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    service: RawService,
    #[serde(default)]
    http: RawHttp,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    analysis: RawAnalysis,
}

#[derive(Deserialize)]
struct RawService {
    name: String,
    work_dir: String,
    log_level: String,
}

#[derive(Deserialize)]
struct RawHttp {
    #[serde(default = "default_http_bind")]
    bind: String,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self { bind: default_http_bind() }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), openai: RawOpenAiConfig::default() }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_openai_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_openai_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            max_tokens: default_openai_max_tokens(),
            timeout_seconds: default_openai_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawAnalysis {
    #[serde(default = "default_specialist_timeout_seconds")]
    specialist_timeout_seconds: u64,
}

impl Default for RawAnalysis {
    fn default() -> Self {
        Self { specialist_timeout_seconds: default_specialist_timeout_seconds() }
    }
}

fn default_http_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_llm_provider() -> String { "dummy".to_string() }
fn default_openai_api_base_url() -> String { "https://api.groq.com/openai/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "llama-3.3-70b-versatile".to_string() }
fn default_openai_temperature() -> f32 { 0.2 }
fn default_openai_max_tokens() -> u32 { 2000 }
fn default_openai_timeout_seconds() -> u64 { 60 }
fn default_specialist_timeout_seconds() -> u64 { 60 }

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load config from `config/default.toml`, then apply env-var overrides.
pub fn load(path_override: Option<&Path>) -> Result<Config, AppError> {
    let work_dir_override = env::var("CONSILIUM_WORK_DIR").ok();
    let log_level_override = env::var("CONSILIUM_LOG_LEVEL").ok();
    load_from(
        path_override.unwrap_or_else(|| Path::new("config/default.toml")),
        work_dir_override.as_deref(),
        log_level_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let s = parsed.service;

    let work_dir_str = work_dir_override.unwrap_or(&s.work_dir).to_string();
    let work_dir = expand_home(&work_dir_str);
    let log_level = log_level_override.unwrap_or(&s.log_level).to_string();

    if parsed.analysis.specialist_timeout_seconds == 0 {
        return Err(AppError::Config(
            "analysis.specialist_timeout_seconds must be greater than zero".into(),
        ));
    }

    Ok(Config {
        service_name: s.name,
        work_dir,
        log_level,
        http: HttpConfig { bind: parsed.http.bind },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                max_tokens: parsed.llm.openai.max_tokens,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        analysis: AnalysisConfig {
            specialist_timeout_seconds: parsed.analysis.specialist_timeout_seconds,
        },
        llm_api_key: env::var("LLM_API_KEY").ok(),
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests — dummy LLM, no API keys, no external calls.
#[cfg(test)]
impl Config {
    pub fn test_default(work_dir: &Path) -> Self {
        Self {
            service_name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            http: HttpConfig { bind: default_http_bind() },
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: default_openai_api_base_url(),
                    model: default_openai_model(),
                    temperature: default_openai_temperature(),
                    max_tokens: default_openai_max_tokens(),
                    timeout_seconds: default_openai_timeout_seconds(),
                },
            },
            analysis: AnalysisConfig {
                specialist_timeout_seconds: default_specialist_timeout_seconds(),
            },
            llm_api_key: None,
        }
    }
}
