//! Process configuration read once from the environment
//!
//! Credentials (`GEMINI_API_KEY`, `HF_TOKEN`) are only ever read from here.

use crate::llm::GeminiConfig;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TTS_SPACE: &str = "Ghana-NLP/Southern-Ghana-TTS-Public";
pub const DEFAULT_SPEECH_API: &str = "/predict";
pub const DEFAULT_LANGUAGE: &str = "Ewe";
pub const DEFAULT_SPEAKER: &str = "Female";
pub const DEFAULT_IDLE_SECS: u64 = 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub gemini: GeminiConfig,
    pub tts_space: String,
    pub tts_api: String,
    /// Voice input is disabled when unset
    pub asr_space: Option<String>,
    pub asr_api: String,
    pub language: String,
    pub speaker: String,
    pub hf_token: Option<String>,
    pub audio_dir: PathBuf,
    pub session_idle: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let or = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let defaults = GeminiConfig::default();
        let gemini = GeminiConfig {
            api_key: var("GEMINI_API_KEY").unwrap_or_default(),
            model: or("WOEZOR_MODEL", &defaults.model),
            base_url: or("WOEZOR_GEMINI_BASE_URL", &defaults.base_url),
        };

        let idle_secs: u64 = parse_number(
            "WOEZOR_SESSION_IDLE_SECS",
            var("WOEZOR_SESSION_IDLE_SECS"),
            DEFAULT_IDLE_SECS,
        )?;
        if idle_secs == 0 {
            return Err(ConfigError::Zero {
                name: "WOEZOR_SESSION_IDLE_SECS",
            });
        }

        Ok(Self {
            port: parse_number("WOEZOR_PORT", var("WOEZOR_PORT"), DEFAULT_PORT)?,
            gemini,
            tts_space: or("WOEZOR_TTS_SPACE", DEFAULT_TTS_SPACE),
            tts_api: or("WOEZOR_TTS_API", DEFAULT_SPEECH_API),
            asr_space: var("WOEZOR_ASR_SPACE"),
            asr_api: or("WOEZOR_ASR_API", DEFAULT_SPEECH_API),
            language: or("WOEZOR_LANGUAGE", DEFAULT_LANGUAGE),
            speaker: or("WOEZOR_SPEAKER", DEFAULT_SPEAKER),
            hf_token: var("HF_TOKEN"),
            audio_dir: var("WOEZOR_AUDIO_DIR")
                .map_or_else(|| std::env::temp_dir().join("woezor-audio"), PathBuf::from),
            session_idle: Duration::from_secs(idle_secs),
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert!(config.gemini.api_key.is_empty());
        assert_eq!(config.tts_space, "Ghana-NLP/Southern-Ghana-TTS-Public");
        assert_eq!(config.tts_api, "/predict");
        assert!(config.asr_space.is_none());
        assert_eq!(config.language, "Ewe");
        assert_eq!(config.speaker, "Female");
        assert_eq!(config.session_idle, Duration::from_secs(3600));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("WOEZOR_PORT", "9001"),
            ("GEMINI_API_KEY", "test-key"),
            ("WOEZOR_ASR_SPACE", "someone/ewe-asr"),
            ("WOEZOR_AUDIO_DIR", "/var/lib/woezor"),
            ("WOEZOR_SESSION_IDLE_SECS", "120"),
        ])
        .unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.gemini.api_key, "test-key");
        assert_eq!(config.asr_space.as_deref(), Some("someone/ewe-asr"));
        assert_eq!(config.audio_dir, PathBuf::from("/var/lib/woezor"));
        assert_eq!(config.session_idle, Duration::from_secs(120));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = config(&[("GEMINI_API_KEY", "  "), ("WOEZOR_ASR_SPACE", "")]).unwrap();
        assert!(config.gemini.api_key.is_empty());
        assert!(config.asr_space.is_none());
    }

    #[test]
    fn test_invalid_numbers() {
        assert_eq!(
            config(&[("WOEZOR_PORT", "eighty")]).unwrap_err(),
            ConfigError::InvalidNumber {
                name: "WOEZOR_PORT",
                value: "eighty".to_string()
            }
        );
        assert!(config(&[("WOEZOR_PORT", "70000")]).is_err());
        assert_eq!(
            config(&[("WOEZOR_SESSION_IDLE_SECS", "0")]).unwrap_err(),
            ConfigError::Zero {
                name: "WOEZOR_SESSION_IDLE_SECS"
            }
        );
    }
}
