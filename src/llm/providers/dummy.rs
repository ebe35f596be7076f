//! Dummy LLM provider — echoes the user payload back prefixed with `[echo]`.
//! Used for wiring checks without a real API key.

use crate::llm::ProviderError;

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, _system: &str, user: &str) -> Result<String, ProviderError> {
        Ok(format!("[echo] {user}"))
    }
}
