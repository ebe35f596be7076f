//! Scripted LLM provider — canned outcomes matched against the system prompt.
//!
//! The orchestrator tests need distinct per-specialist behavior (one replies,
//! one errors, one stalls) from a single shared provider. Each rule pairs a
//! substring key with an outcome and an optional artificial latency; the
//! first rule whose key occurs in the incoming system prompt wins. Calls
//! matching no rule fail, so a test can't silently exercise an unscripted
//! path.

use std::sync::Arc;
use std::time::Duration;

use crate::llm::ProviderError;

#[derive(Debug, Clone)]
struct Rule {
    key: String,
    outcome: Result<String, String>,
    delay: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    rules: Arc<Vec<Rule>>,
}

impl ScriptedProvider {
    pub fn new() -> Builder {
        Builder { rules: Vec::new() }
    }

    pub async fn complete(&self, system: &str, _user: &str) -> Result<String, ProviderError> {
        let rule = self
            .rules
            .iter()
            .find(|r| system.contains(&r.key))
            .ok_or_else(|| ProviderError::Request(format!(
                "no scripted outcome matches system prompt ({} chars)",
                system.len()
            )))?;

        if let Some(delay) = rule.delay {
            tokio::time::sleep(delay).await;
        }

        match &rule.outcome {
            Ok(text) => Ok(text.clone()),
            Err(msg) => Err(ProviderError::Request(msg.clone())),
        }
    }
}

/// Fluent rule builder; `build()` freezes the rule list.
pub struct Builder {
    rules: Vec<Rule>,
}

impl Builder {
    /// Succeed with `text` when `key` occurs in the system prompt.
    pub fn reply(mut self, key: &str, text: &str) -> Self {
        self.rules.push(Rule { key: key.into(), outcome: Ok(text.into()), delay: None });
        self
    }

    /// Like [`reply`](Self::reply), after sleeping for `delay`.
    pub fn reply_after(mut self, key: &str, text: &str, delay: Duration) -> Self {
        self.rules.push(Rule { key: key.into(), outcome: Ok(text.into()), delay: Some(delay) });
        self
    }

    /// Fail with a request error when `key` occurs in the system prompt.
    pub fn fail(mut self, key: &str, message: &str) -> Self {
        self.rules.push(Rule { key: key.into(), outcome: Err(message.into()), delay: None });
        self
    }

    /// Like [`fail`](Self::fail), after sleeping for `delay`.
    pub fn fail_after(mut self, key: &str, message: &str, delay: Duration) -> Self {
        self.rules.push(Rule { key: key.into(), outcome: Err(message.into()), delay: Some(delay) });
        self
    }

    pub fn build(self) -> ScriptedProvider {
        ScriptedProvider { rules: Arc::new(self.rules) }
    }
}
