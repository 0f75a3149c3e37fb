use serde::{Deserialize, Serialize};
use secrecy::{ExposeSecret, SecretString};
use std::fs;
use std::path::Path;
use std::time::Duration;
use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

/// Config files tried in the working directory when `CONFIG_PATH` is unset
const DEFAULT_CONFIG_FILES: [&str; 3] = ["conf.yaml", "conf.yml", "conf.json"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system_config: SystemConfig,
    #[serde(default)]
    pub llm_config: LLMConfig,
    #[serde(default)]
    pub tts_config: TTSConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Hosted conversational model settings
#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Speech synthesis provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct TTSConfig {
    #[serde(default = "default_tts_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_tts_model_id")]
    pub model_id: String,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default)]
    pub voice_settings: Option<VoiceSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_audio_dir() -> String {
    "audio".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_llm_base_url() -> String {
    "https://router.huggingface.co/v1".to_string()
}

fn default_llm_model() -> String {
    "meta-llama/Llama-3.1-8B-Instruct".to_string()
}

fn default_tts_base_url() -> String {
    "https://api.elevenlabs.io/v1".to_string()
}

fn default_voice_id() -> String {
    "EXAVITQu4vr4xnSDxMaL".to_string()
}

fn default_tts_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_output_format() -> String {
    "mp3_44100_128".to_string()
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            audio_dir: default_audio_dir(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: None,
            max_tokens: None,
            temperature: None,
        }
    }
}

impl Default for TTSConfig {
    fn default() -> Self {
        Self {
            base_url: default_tts_base_url(),
            api_key: None,
            voice_id: default_voice_id(),
            model_id: default_tts_model_id(),
            output_format: default_output_format(),
            voice_settings: None,
        }
    }
}

impl SystemConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a YAML or JSON file.
    ///
    /// `${VAR_NAME}` placeholders are replaced with the value of the
    /// environment variable, or with an empty string when it is unset.
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::parse(path, &content)
    }

    fn parse(path: &str, content: &str) -> Result<Self> {
        let content = substitute_env_vars(content, |name| std::env::var(name).ok());

        let path_lower = path.to_lowercase();
        let config: Config = if path_lower.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON config: {}", path))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML config: {}", path))?
        };
        Ok(config.normalized())
    }

    /// Resolve the runtime configuration: optional `.env`, optional config
    /// file, then environment variables on top.
    pub fn discover() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let config_path = std::env::var("CONFIG_PATH").ok().or_else(|| {
            DEFAULT_CONFIG_FILES
                .iter()
                .find(|p| Path::new(p).exists())
                .map(|p| p.to_string())
        });

        let config = match config_path {
            Some(path) => {
                let config = Self::load(&path)?;
                tracing::info!("Loaded configuration from: {}", path);
                config
            }
            None => {
                debug!("No config file found, using defaults and environment");
                Self::default()
            }
        };

        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    /// Apply environment overrides. Takes a lookup function so tests can
    /// supply their own variables.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("HOST") {
            self.system_config.host = host;
        }
        if let Some(port) = get("PORT").and_then(|v| v.parse().ok()) {
            self.system_config.port = port;
        }
        if let Some(dir) = get("AUDIO_DIR") {
            self.system_config.audio_dir = dir;
        }
        if let Some(secs) = get("REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
        {
            self.system_config.request_timeout_secs = secs;
        }

        if let Some(key) = get("HUGGINGFACE_API_KEY") {
            self.llm_config.api_key = Some(SecretString::from(key));
        }
        if let Some(model) = get("HUGGINGFACE_MODEL") {
            self.llm_config.model = model;
        }
        if let Some(url) = get("HUGGINGFACE_BASE_URL") {
            self.llm_config.base_url = url;
        }

        if let Some(key) = get("ELEVENLABS_API_KEY") {
            self.tts_config.api_key = Some(SecretString::from(key));
        }
        if let Some(voice) = get("ELEVENLABS_VOICE_ID") {
            self.tts_config.voice_id = voice;
        }
        if let Some(model) = get("ELEVENLABS_MODEL_ID") {
            self.tts_config.model_id = model;
        }
        if let Some(url) = get("ELEVENLABS_BASE_URL") {
            self.tts_config.base_url = url;
        }

        self.normalized()
    }

    /// Blank keys count as missing. A zero timeout falls back to the default.
    fn normalized(mut self) -> Self {
        if self.system_config.request_timeout_secs == 0 {
            self.system_config.request_timeout_secs = default_request_timeout_secs();
        }
        if is_blank(&self.llm_config.api_key) {
            self.llm_config.api_key = None;
        }
        if is_blank(&self.tts_config.api_key) {
            self.tts_config.api_key = None;
        }
        self.llm_config.base_url = self.llm_config.base_url.trim_end_matches('/').to_string();
        self.tts_config.base_url = self.tts_config.base_url.trim_end_matches('/').to_string();

        fn is_blank(key: &Option<SecretString>) -> bool {
            key.as_ref().is_some_and(|k| k.expose_secret().trim().is_empty())
        }

        self
    }
}

/// Replace `${VAR_NAME}` with values from `lookup`.
fn substitute_env_vars<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let pattern = Regex::new(r"\$\{(\w+)\}").expect("valid placeholder pattern");
    pattern
        .replace_all(content, |caps: &regex::Captures| {
            lookup(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
