use std::sync::Arc;

use anyhow::Context;

use crate::config::Config;
use crate::llm::{HuggingFaceLLM, ResponseGenerator};
use crate::pipeline::Pipeline;
use crate::tts::{AudioStore, ElevenLabsTTS, SpeechSynthesizer};
use crate::utils::build_http_client;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub audio_store: Arc<AudioStore>,
    pub pipeline: Pipeline,
}

impl AppState {
    /// Wire up the provider clients from configuration. Creates the audio
    /// directory if needed.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let audio_store = Arc::new(
            AudioStore::new(&config.system_config.audio_dir).with_context(|| {
                format!(
                    "Failed to create audio directory: {}",
                    config.system_config.audio_dir
                )
            })?,
        );

        let client = build_http_client(config.system_config.request_timeout())
            .context("Failed to build HTTP client")?;

        let generator: Arc<dyn ResponseGenerator> =
            Arc::new(HuggingFaceLLM::new(&config.llm_config, client.clone()));
        let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(ElevenLabsTTS::new(
            &config.tts_config,
            client,
            audio_store.clone(),
        ));

        Ok(Self::with_components(config, audio_store, generator, synthesizer))
    }

    /// Build state around already constructed components
    pub fn with_components(
        config: Config,
        audio_store: Arc<AudioStore>,
        generator: Arc<dyn ResponseGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            audio_store,
            pipeline: Pipeline::new(generator, synthesizer),
        }
    }
}
