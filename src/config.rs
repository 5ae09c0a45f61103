use std::env;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::constants::{
    API_KEY_VAR, DEFAULT_CHAT_MODEL, DEFAULT_INFERENCE_URL, DEFAULT_MAX_TOKENS,
    SYSTEM_PROMPT_GENERAL,
};
use crate::error::{ChatError, ChatResult};

/// Runtime settings, resolved once at startup.
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub inference_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub system_prompt: String,
}

// Keep the token out of logs.
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("inference_url", &self.inference_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt_len", &self.system_prompt.len())
            .finish()
    }
}

impl Settings {
    /// Reads settings from the process environment (after dotenvy has loaded `.env`).
    pub fn from_env() -> ChatResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> ChatResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ChatError::Configuration(format!("{} is not set", API_KEY_VAR))
            })?;

        let inference_url = lookup("ASHLEY_INFERENCE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_INFERENCE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = lookup("ASHLEY_CHAT_MODEL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());

        let max_tokens = match lookup("ASHLEY_MAX_TOKENS") {
            Some(raw) => raw.trim().parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                ChatError::Configuration(format!(
                    "ASHLEY_MAX_TOKENS must be a positive integer, got {:?}",
                    raw
                ))
            })?,
            None => DEFAULT_MAX_TOKENS,
        };

        let system_prompt = match lookup("ASHLEY_PERSONA_FILE") {
            Some(path) => {
                let path = PathBuf::from(path);
                debug!(?path, "Loading persona from file");
                std::fs::read_to_string(&path).map_err(|e| {
                    ChatError::Configuration(format!(
                        "failed to read persona file {}: {}",
                        path.display(),
                        e
                    ))
                })?
            }
            None => SYSTEM_PROMPT_GENERAL.to_string(),
        };

        let settings = Self {
            api_key,
            inference_url,
            model,
            max_tokens,
            system_prompt,
        };
        info!(?settings, "Configuration loaded");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let err = Settings::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
        assert!(err.to_string().contains("HF_API_KEY"));
    }

    #[test]
    fn test_blank_api_key_is_rejected() {
        let err = Settings::from_lookup(lookup_from(&[("HF_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[("HF_API_KEY", "hf_abc")])).unwrap();
        assert_eq!(settings.api_key, "hf_abc");
        assert_eq!(settings.inference_url, DEFAULT_INFERENCE_URL);
        assert_eq!(settings.model, DEFAULT_CHAT_MODEL);
        assert_eq!(settings.max_tokens, 500);
        assert_eq!(settings.system_prompt, SYSTEM_PROMPT_GENERAL);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("HF_API_KEY", "hf_abc"),
            ("ASHLEY_INFERENCE_URL", "http://localhost:8080/models/"),
            ("ASHLEY_CHAT_MODEL", "local/tiny"),
            ("ASHLEY_MAX_TOKENS", "64"),
        ]))
        .unwrap();
        assert_eq!(settings.inference_url, "http://localhost:8080/models");
        assert_eq!(settings.model, "local/tiny");
        assert_eq!(settings.max_tokens, 64);
    }

    #[test]
    fn test_invalid_max_tokens() {
        let err = Settings::from_lookup(lookup_from(&[
            ("HF_API_KEY", "hf_abc"),
            ("ASHLEY_MAX_TOKENS", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
    }

    #[test]
    fn test_persona_file_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "You are a calm test persona.").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let settings = Settings::from_lookup(lookup_from(&[
            ("HF_API_KEY", "hf_abc"),
            ("ASHLEY_PERSONA_FILE", path.as_str()),
        ]))
        .unwrap();
        assert_eq!(settings.system_prompt, "You are a calm test persona.");
    }

    #[test]
    fn test_missing_persona_file() {
        let err = Settings::from_lookup(lookup_from(&[
            ("HF_API_KEY", "hf_abc"),
            ("ASHLEY_PERSONA_FILE", "/definitely/not/here.txt"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let settings = Settings::from_lookup(lookup_from(&[("HF_API_KEY", "hf_secret")])).unwrap();
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("hf_secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
