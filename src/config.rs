//! Runtime settings read from the environment (and a `.env` file, if any).

use std::time::Duration;

use url::Url;

use crate::quiz::provider::DEFAULT_TIMEOUT;

pub const API_KEY_VAR: &str = "CHATGPT_API_KEY";
pub const MODEL_VAR: &str = "CHATGPT_MODEL";
pub const API_URL_VAR: &str = "CHATGPT_API_URL";
pub const TIMEOUT_VAR: &str = "CHATGPT_TIMEOUT_SECS";
pub const QUESTION_COUNT_VAR: &str = "QUIZ_QUESTION_COUNT";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_QUESTION_COUNT: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive whole number of seconds, got {value:?}")]
    Timeout { var: &'static str, value: String },
    #[error("{var} must be a positive whole number, got {value:?}")]
    QuestionCount { var: &'static str, value: String },
    #[error("{var} is not a valid URL: {source}")]
    ApiUrl {
        var: &'static str,
        source: url::ParseError,
    },
}

#[derive(Clone)]
pub struct Config {
    /// Without a key the generator is disabled and every quiz comes from the bank.
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: Option<Url>,
    pub timeout: Duration,
    pub question_count: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "••••••••"))
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .field("question_count", &self.question_count)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_url: None,
            timeout: DEFAULT_TIMEOUT,
            question_count: DEFAULT_QUESTION_COUNT,
        }
    }
}

impl Config {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenv::dotenv() {
            log::debug!("No .env file loaded: {err}");
        }
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds a config from any variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Config {
            api_key: get(API_KEY_VAR),
            ..Config::default()
        };

        if let Some(model) = get(MODEL_VAR) {
            config.model = model;
        }

        if let Some(url) = get(API_URL_VAR) {
            let url = Url::parse(&url).map_err(|source| ConfigError::ApiUrl {
                var: API_URL_VAR,
                source,
            })?;
            config.api_url = Some(url);
        }

        if let Some(value) = get(TIMEOUT_VAR) {
            let secs = value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Timeout {
                    var: TIMEOUT_VAR,
                    value: value.clone(),
                })?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(value) = get(QUESTION_COUNT_VAR) {
            config.question_count = value
                .parse::<usize>()
                .ok()
                .filter(|count| *count > 0)
                .ok_or(ConfigError::QuestionCount {
                    var: QUESTION_COUNT_VAR,
                    value: value.clone(),
                })?;
        }

        Ok(config)
    }
}
