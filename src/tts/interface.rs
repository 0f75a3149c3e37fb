use async_trait::async_trait;

use crate::error::TtsError;

/// Speech synthesizer trait
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` to an audio file and return the relative URL it is
    /// served at.
    ///
    /// The text is not inspected; error messages from earlier stages are
    /// spoken like any other reply.
    async fn synthesize(&self, text: &str) -> Result<String, TtsError>;
}
