//! Process configuration, read once from the environment at startup.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

const DEFAULT_LOCAL_ENDPOINT: &str = "http://127.0.0.1:11434";
const DEFAULT_LOCAL_MODEL: &str = "qwen2.5:1.5b-instruct";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "http://localhost:4173",
    "http://localhost:3000",
    "http://127.0.0.1:3000",
];

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteModel {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub use_local_model: bool,
    pub local_endpoint: String,
    pub local_model: String,
    pub use_official_openai_model: bool,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_api_key_official: Option<String>,
    pub openai_base_url_official: String,
    pub openai_model_official: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            use_local_model: false,
            local_endpoint: DEFAULT_LOCAL_ENDPOINT.to_string(),
            local_model: DEFAULT_LOCAL_MODEL.to_string(),
            use_official_openai_model: false,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_api_key_official: None,
            openai_base_url_official: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model_official: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

impl ModelConfig {
    /// The official or proxy credentials, whichever is selected, if a key is set.
    pub fn remote(&self) -> Option<RemoteModel> {
        let (api_key, base_url, model) = if self.use_official_openai_model {
            (&self.openai_api_key_official, &self.openai_base_url_official, &self.openai_model_official)
        } else {
            (&self.openai_api_key, &self.openai_base_url, &self.openai_model)
        };
        api_key.as_ref().map(|api_key| RemoteModel {
            api_key: api_key.clone(),
            base_url: base_url.clone(),
            model: model.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub model_timeout: Duration,
    pub system_prompt_path: Option<PathBuf>,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            model_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            system_prompt_path: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|origin| origin.to_string()).collect(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let text = |key: &str| lookup(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty());
        let text_or = |key: &str, default: &str| text(key).unwrap_or_else(|| default.to_string());

        let model = ModelConfig {
            use_local_model: text("USE_LOCAL_MODEL").map_or(false, |value| is_enabled(&value)),
            local_endpoint: text_or("LOCAL_MODEL_ENDPOINT", DEFAULT_LOCAL_ENDPOINT),
            local_model: text_or("LOCAL_MODEL", DEFAULT_LOCAL_MODEL),
            use_official_openai_model: text("USE_OFFICIAL_OPENAI_MODEL").map_or(false, |value| is_enabled(&value)),
            openai_api_key: text("OPENAI_API_KEY"),
            openai_base_url: text_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            openai_model: text_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            openai_api_key_official: text("OPENAI_API_KEY_OFFICIAL"),
            openai_base_url_official: text_or("OPENAI_BASE_URL_OFFICIAL", DEFAULT_OPENAI_BASE_URL),
            openai_model_official: text_or("OPENAI_MODEL_OFFICIAL", DEFAULT_OPENAI_MODEL),
        };

        let model_timeout = match text("MODEL_TIMEOUT_SECS").map(|value| value.parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => Duration::from_secs(secs),
            Some(_) => {
                warn!("MODEL_TIMEOUT_SECS must be a positive integer, using {DEFAULT_TIMEOUT_SECS}");
                defaults.model_timeout
            }
            None => defaults.model_timeout,
        };

        let cors_origins = text("CORS_ALLOWED_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(defaults.cors_origins);

        Self {
            model,
            model_timeout,
            system_prompt_path: text("SYSTEM_PROMPT_PATH").map(PathBuf::from),
            bind_addr: text_or("BIND_ADDR", DEFAULT_BIND_ADDR),
            cors_origins,
        }
    }
}

fn is_enabled(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = config(&[]);
        assert_eq!(config, AppConfig::default());
        assert!(config.model.remote().is_none());
        assert_eq!(config.cors_origins.len(), 5);
    }

    #[test]
    fn flags_accept_common_spellings() {
        for value in ["true", "TRUE", "1", "yes", "Yes"] {
            assert!(config(&[("USE_LOCAL_MODEL", value)]).model.use_local_model, "{value}");
        }
        for value in ["false", "0", "no", "on"] {
            assert!(!config(&[("USE_LOCAL_MODEL", value)]).model.use_local_model, "{value}");
        }
    }

    #[test]
    fn remote_credentials_follow_the_official_switch() {
        let vars = [
            ("OPENAI_API_KEY", "proxy-key"),
            ("OPENAI_BASE_URL", "https://proxy.example/v1"),
            ("OPENAI_API_KEY_OFFICIAL", "official-key"),
        ];
        let proxy = config(&vars).model.remote().unwrap();
        assert_eq!(proxy.api_key, "proxy-key");
        assert_eq!(proxy.base_url, "https://proxy.example/v1");

        let mut with_switch = vars.to_vec();
        with_switch.push(("USE_OFFICIAL_OPENAI_MODEL", "1"));
        let official = config(&with_switch).model.remote().unwrap();
        assert_eq!(official.api_key, "official-key");
        assert_eq!(official.base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(official.model, DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn timeout_and_origins_are_parsed() {
        let config = config(&[
            ("MODEL_TIMEOUT_SECS", "15"),
            ("CORS_ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
            ("SYSTEM_PROMPT_PATH", "prompts/system.txt"),
        ]);
        assert_eq!(config.model_timeout, Duration::from_secs(15));
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.system_prompt_path, Some(PathBuf::from("prompts/system.txt")));
    }

    #[test]
    fn invalid_timeout_keeps_default() {
        for value in ["0", "soon", "-3"] {
            assert_eq!(config(&[("MODEL_TIMEOUT_SECS", value)]).model_timeout, Duration::from_secs(60));
        }
    }
}
