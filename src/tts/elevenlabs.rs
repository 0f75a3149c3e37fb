use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::interface::SpeechSynthesizer;
use super::storage::AudioStore;
use crate::config::{TTSConfig, VoiceSettings};
use crate::error::TtsError;

/// ElevenLabs text-to-speech client.
///
/// Streams the MP3 response straight into the [`AudioStore`].
pub struct ElevenLabsTTS {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
    voice_id: String,
    model_id: String,
    output_format: String,
    voice_settings: Option<VoiceSettings>,
    store: Arc<AudioStore>,
}

#[derive(Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_settings: Option<&'a VoiceSettings>,
}

impl ElevenLabsTTS {
    pub fn new(config: &TTSConfig, client: Client, store: Arc<AudioStore>) -> Self {
        info!(
            "Initialized ElevenLabsTTS: voice={}, model={}, credential={}",
            config.voice_id,
            config.model_id,
            if config.api_key.is_some() { "set" } else { "missing" }
        );
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            voice_id: config.voice_id.clone(),
            model_id: config.model_id.clone(),
            output_format: config.output_format.clone(),
            voice_settings: config.voice_settings.clone(),
            store,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsTTS {
    async fn synthesize(&self, text: &str) -> Result<String, TtsError> {
        let Some(api_key) = &self.api_key else {
            warn!("ElevenLabs API key is not configured, skipping synthesis");
            return Err(TtsError::MissingApiKey);
        };

        let url = format!("{}/text-to-speech/{}", self.base_url, self.voice_id);
        let body = ElevenLabsRequest {
            text,
            model_id: &self.model_id,
            voice_settings: self.voice_settings.as_ref(),
        };

        debug!(
            "ElevenLabs TTS request: model={}, voice={}, input_len={}",
            self.model_id,
            self.voice_id,
            text.len()
        );

        let response = self
            .client
            .post(&url)
            .query(&[("output_format", self.output_format.as_str())])
            .header("xi-api-key", api_key.expose_secret())
            .header(header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("ElevenLabs request failed: {}", e);
                TtsError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("ElevenLabs API error ({}): {}", status, error_text);
            return Err(TtsError::Request(format!("HTTP {}: {}", status, error_text)));
        }

        let mut writer = self.store.reserve().await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    error!("ElevenLabs audio stream interrupted: {}", e);
                    writer.abort().await;
                    return Err(TtsError::Request(format!("audio stream interrupted: {}", e)));
                }
            };
            if let Err(e) = writer.write_chunk(&chunk).await {
                error!("Failed writing audio chunk: {}", e);
                writer.abort().await;
                return Err(e.into());
            }
        }

        if writer.bytes_written() == 0 {
            writer.abort().await;
            return Err(TtsError::Request("provider returned no audio".to_string()));
        }

        let file_name = writer.finish().await?;
        info!("Synthesized speech to {}", file_name);
        Ok(AudioStore::url_for(&file_name))
    }
}
