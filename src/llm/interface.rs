use async_trait::async_trait;

use crate::error::LlmError;

/// Produces a single reply for a user utterance.
///
/// Implementations do not validate the prompt; the request handler only
/// passes non-empty text.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}
