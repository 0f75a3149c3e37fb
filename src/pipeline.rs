use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::llm::ResponseGenerator;
use crate::tts::SpeechSynthesizer;

/// Non-empty user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance(String);

impl Utterance {
    /// Returns `None` for empty or whitespace-only text.
    pub fn parse(text: &str) -> Option<Self> {
        if text.trim().is_empty() {
            None
        } else {
            Some(Self(text.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reply text paired with the URL of its rendered audio.
///
/// Either field may carry an `Error: ...` message in place of a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisResult {
    pub response_text: String,
    pub audio_url: String,
}

/// Generate a reply, then speak it.
#[derive(Clone)]
pub struct Pipeline {
    generator: Arc<dyn ResponseGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl Pipeline {
    pub fn new(
        generator: Arc<dyn ResponseGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            generator,
            synthesizer,
        }
    }

    /// A failed generation still produces speech: the error message becomes
    /// the reply so the listener hears what went wrong.
    pub async fn run(&self, utterance: &Utterance) -> SynthesisResult {
        let response_text = match self.generator.generate(utterance.as_str()).await {
            Ok(reply) => {
                info!("AI response: {}", reply);
                reply
            }
            Err(e) => {
                warn!("Response generation failed: {}", e);
                e.to_string()
            }
        };

        let audio_url = match self.synthesizer.synthesize(&response_text).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Speech synthesis failed: {}", e);
                e.to_string()
            }
        };

        SynthesisResult {
            response_text,
            audio_url,
        }
    }
}
