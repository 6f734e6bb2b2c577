//! Layered configuration: defaults, then a TOML file, then environment.
//!
//! ```rust
//! use duochat::config::ChatConfig;
//! use dprovider::ProviderId;
//!
//! let mut config: ChatConfig = toml::from_str(
//!     r#"
//!     primary = "zhipu"
//!     fallback = "none"
//!
//!     [zhipu]
//!     api_keys = ["zhipu-key-0001"]
//!     "#,
//! )
//! .expect("config should parse");
//!
//! config.validate().expect("config should validate");
//! assert_eq!(config.primary, ProviderId::Zhipu);
//! assert_eq!(config.fallback, None);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dcommon::GenerationOptions;
use directories::ProjectDirs;
use dprovider::{ProviderId, RateLimits, parse_key_list};
use serde::{Deserialize, Deserializer};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a concise, technically precise assistant running in a terminal. \
Answer directly, keep paragraphs short, and give copyable commands when asked for one.";

const ALL_PROVIDERS: [ProviderId; 4] = [
    ProviderId::Gemini,
    ProviderId::Zhipu,
    ProviderId::DeepSeek,
    ProviderId::OpenAi,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    Read,
    Parse,
    Invalid,
    MissingCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub message: String,
}

impl ConfigError {
    pub fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn read(path: &Path, source: std::io::Error) -> Self {
        Self::new(
            ConfigErrorKind::Read,
            format!("failed to read config at {}: {source}", path.display()),
        )
    }

    pub fn parse(path: &Path, source: toml::de::Error) -> Self {
        Self::new(
            ConfigErrorKind::Parse,
            format!("failed to parse config at {}: {source}", path.display()),
        )
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Invalid, message)
    }

    pub fn missing_credentials(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::MissingCredentials, message)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ConfigError {}

/// Per-backend settings, one TOML table per provider (`[gemini]`, `[zhipu]`, ...).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub api_keys: Vec<String>,
    pub default_model: Option<String>,
    pub models: Vec<String>,
    pub base_url: Option<String>,
    pub requests_per_minute: Option<u32>,
    pub tokens_per_minute: Option<u64>,
}

impl ProviderSettings {
    pub fn has_credentials(&self) -> bool {
        self.api_keys.iter().any(|key| !key.trim().is_empty())
    }

    pub fn rate_limits(&self) -> RateLimits {
        let defaults = RateLimits::default();
        RateLimits::new(
            self.requests_per_minute
                .unwrap_or(defaults.requests_per_minute),
            self.tokens_per_minute.unwrap_or(defaults.tokens_per_minute),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    #[serde(deserialize_with = "deserialize_provider")]
    pub primary: ProviderId,
    #[serde(deserialize_with = "deserialize_fallback")]
    pub fallback: Option<ProviderId>,
    pub system_instruction: String,
    pub web_search: bool,
    pub temperature: f32,
    pub max_history_turns: usize,
    pub context_warning_tokens: u64,
    pub request_timeout_secs: u64,
    pub gemini: ProviderSettings,
    pub zhipu: ProviderSettings,
    pub deepseek: ProviderSettings,
    pub openai: ProviderSettings,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            primary: ProviderId::Gemini,
            fallback: Some(ProviderId::Zhipu),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            web_search: false,
            temperature: DEFAULT_TEMPERATURE,
            max_history_turns: dchat::DEFAULT_MAX_HISTORY_TURNS,
            context_warning_tokens: dchat::DEFAULT_CONTEXT_WARNING_TOKENS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            gemini: ProviderSettings::default(),
            zhipu: ProviderSettings::default(),
            deepseek: ProviderSettings::default(),
            openai: ProviderSettings::default(),
        }
    }
}

impl ChatConfig {
    /// `<config_dir>/duochat/config.toml` on the current platform.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "duochat").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Full startup load: [`ChatConfig::read`] followed by validation.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::read(explicit_path)?;
        config.validate()?;
        Ok(config)
    }

    /// File (explicit or default location) plus environment overlay, without
    /// validation so callers can apply command-line overrides first.
    pub fn read(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit_path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::new(
                    ConfigErrorKind::Read,
                    format!("config file {} does not exist", path.display()),
                ));
            }
            Some(path) => Self::load_from_path(path)?,
            None => match Self::default_path() {
                Some(path) => Self::load_from_path(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env()?;
        Ok(config)
    }

    /// Makes `primary` the active backend. If it was the fallback, the old
    /// primary takes its place.
    pub fn set_primary(&mut self, primary: ProviderId) {
        if self.fallback == Some(primary) {
            self.fallback = Some(self.primary);
        }
        self.primary = primary;
    }

    /// Reads `path`, falling back to defaults when the file is absent.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::read(path, source))?;
        toml::from_str(&contents).map_err(|source| ConfigError::parse(path, source))
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlays environment values read through `lookup`. Blank values are
    /// ignored so an empty export does not wipe file settings.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        for provider in ALL_PROVIDERS {
            if let Some(raw) = lookup(api_key_variable(provider)) {
                self.provider_mut(provider).api_keys = parse_key_list(&raw);
            }
        }

        if let Some(base_url) = lookup("DEEPSEEK_BASE_URL") {
            self.deepseek.base_url = Some(base_url.trim().to_string());
        }

        if let Some(raw) = lookup("PRIMARY_SERVICE") {
            self.primary = parse_provider(&raw)?;
        }

        if let Some(raw) = lookup("FALLBACK_SERVICE") {
            self.fallback = parse_fallback(&raw)?;
        }

        if let Some(raw) = lookup("ENABLE_WEB_SEARCH") {
            self.web_search = parse_flag(&raw)?;
        }

        if let Some(instruction) = lookup("SYSTEM_INSTRUCTION") {
            self.system_instruction = instruction;
        }

        Ok(())
    }

    /// Checks invariants and drops a fallback that has no credentials.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if !self.provider(self.primary).has_credentials() {
            return Err(ConfigError::missing_credentials(format!(
                "no API credentials configured for {}; set {} or [{}].api_keys",
                self.primary.display_name(),
                api_key_variable(self.primary),
                self.primary
            )));
        }

        if self.fallback == Some(self.primary) {
            return Err(ConfigError::invalid(format!(
                "fallback must differ from primary ({})",
                self.primary
            )));
        }

        if let Some(fallback) = self.fallback
            && !self.provider(fallback).has_credentials()
        {
            tracing::warn!(
                provider = %fallback,
                "fallback has no API credentials configured; continuing without failover"
            );
            self.fallback = None;
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::invalid(
                "temperature must be in the inclusive range 0.0..=2.0",
            ));
        }

        if self.max_history_turns == 0 {
            return Err(ConfigError::invalid("max_history_turns must be greater than zero"));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "request_timeout_secs must be greater than zero",
            ));
        }

        Ok(())
    }

    pub fn provider(&self, id: ProviderId) -> &ProviderSettings {
        match id {
            ProviderId::Gemini => &self.gemini,
            ProviderId::Zhipu => &self.zhipu,
            ProviderId::DeepSeek => &self.deepseek,
            ProviderId::OpenAi => &self.openai,
        }
    }

    pub fn provider_mut(&mut self, id: ProviderId) -> &mut ProviderSettings {
        match id {
            ProviderId::Gemini => &mut self.gemini,
            ProviderId::Zhipu => &mut self.zhipu,
            ProviderId::DeepSeek => &mut self.deepseek,
            ProviderId::OpenAi => &mut self.openai,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions::default()
            .with_temperature(self.temperature)
            .with_web_search(self.web_search)
    }
}

pub fn api_key_variable(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::Gemini => "GEMINI_API_KEY",
        ProviderId::Zhipu => "ZHIPU_API_KEY",
        ProviderId::DeepSeek => "DEEPSEEK_API_KEY",
        ProviderId::OpenAi => "OPENAI_API_KEY",
    }
}

fn parse_provider(raw: &str) -> Result<ProviderId, ConfigError> {
    ProviderId::parse(raw)
        .ok_or_else(|| ConfigError::invalid(format!("unknown provider `{}`", raw.trim())))
}

fn parse_fallback(raw: &str) -> Result<Option<ProviderId>, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "none" | "off" => Ok(None),
        _ => parse_provider(raw).map(Some),
    }
}

fn parse_flag(raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(format!(
            "expected a boolean flag, got `{other}`"
        ))),
    }
}

fn deserialize_provider<'de, D>(deserializer: D) -> Result<ProviderId, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_provider(&raw).map_err(|err| serde::de::Error::custom(err.message))
}

fn deserialize_fallback<'de, D>(deserializer: D) -> Result<Option<ProviderId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_fallback(&raw).map_err(|err| serde::de::Error::custom(err.message))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = ChatConfig::default();

        assert_eq!(config.primary, ProviderId::Gemini);
        assert_eq!(config.fallback, Some(ProviderId::Zhipu));
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_history_turns, 40);
        assert_eq!(config.context_warning_tokens, 900_000);
        assert_eq!(config.request_timeout(), Duration::from_secs(90));
        assert_eq!(config.gemini.rate_limits(), RateLimits::new(15, 1_000_000));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config: ChatConfig = toml::from_str(
            r#"
            primary = "gemini"
            web_search = false

            [gemini]
            api_keys = ["file-key-0001"]
            "#,
        )
        .expect("parse");

        config
            .apply_env_with(env(&[
                ("GEMINI_API_KEY", "env-key-0001, env-key-0002;env-key-0003"),
                ("ZHIPU_API_KEY", "   "),
                ("DEEPSEEK_BASE_URL", "https://proxy.example/v1 "),
                ("PRIMARY_SERVICE", "deepseek"),
                ("FALLBACK_SERVICE", "glm"),
                ("ENABLE_WEB_SEARCH", "true"),
                ("SYSTEM_INSTRUCTION", "Be brief."),
            ]))
            .expect("env overlay");

        assert_eq!(config.gemini.api_keys.len(), 3);
        assert!(config.zhipu.api_keys.is_empty());
        assert_eq!(
            config.deepseek.base_url.as_deref(),
            Some("https://proxy.example/v1")
        );
        assert_eq!(config.primary, ProviderId::DeepSeek);
        assert_eq!(config.fallback, Some(ProviderId::Zhipu));
        assert!(config.web_search);
        assert_eq!(config.system_instruction, "Be brief.");
        assert!(config.generation_options().web_search);
    }

    #[test]
    fn bad_environment_values_are_rejected() {
        let mut config = ChatConfig::default();

        let error = config
            .apply_env_with(env(&[("PRIMARY_SERVICE", "claude")]))
            .expect_err("unknown provider");
        assert_eq!(error.kind, ConfigErrorKind::Invalid);

        let error = config
            .apply_env_with(env(&[("ENABLE_WEB_SEARCH", "maybe")]))
            .expect_err("bad flag");
        assert!(error.message.contains("maybe"));
    }

    #[test]
    fn promoting_the_fallback_swaps_roles() {
        let mut config = ChatConfig::default();

        config.set_primary(ProviderId::Zhipu);
        assert_eq!(config.primary, ProviderId::Zhipu);
        assert_eq!(config.fallback, Some(ProviderId::Gemini));

        config.set_primary(ProviderId::DeepSeek);
        assert_eq!(config.primary, ProviderId::DeepSeek);
        assert_eq!(config.fallback, Some(ProviderId::Gemini));
    }

    #[test]
    fn primary_without_keys_is_fatal() {
        let mut config = ChatConfig::default();

        let error = config.validate().expect_err("no keys");
        assert_eq!(error.kind, ConfigErrorKind::MissingCredentials);
        assert!(error.message.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn fallback_without_keys_is_dropped() {
        let mut config = ChatConfig::default();
        config.gemini.api_keys = vec!["gemini-key-0001".to_string()];

        config.validate().expect("valid");
        assert_eq!(config.fallback, None);
    }

    #[test]
    fn fallback_equal_to_primary_is_rejected() {
        let mut config = ChatConfig::default();
        config.gemini.api_keys = vec!["gemini-key-0001".to_string()];
        config.fallback = Some(ProviderId::Gemini);

        let error = config.validate().expect_err("same provider");
        assert_eq!(error.kind, ConfigErrorKind::Invalid);
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let mut config = ChatConfig::default();
        config.gemini.api_keys = vec!["gemini-key-0001".to_string()];
        config.temperature = 2.5;

        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ChatConfig::load_from_path(&dir.path().join("absent.toml")).expect("defaults");

        assert_eq!(config, ChatConfig::default());
    }

    #[test]
    fn file_values_are_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
            primary = "zhipu"
            fallback = "deepseek"
            temperature = 0.2
            max_history_turns = 10

            [zhipu]
            api_keys = ["zhipu-key-0001"]
            default_model = "glm-4.6"
            requests_per_minute = 30

            [deepseek]
            api_keys = ["deepseek-key-01"]
            models = ["deepseek-chat"]
            "#
        )
        .expect("write config");

        let config = ChatConfig::load_from_path(file.path()).expect("load");

        assert_eq!(config.primary, ProviderId::Zhipu);
        assert_eq!(config.fallback, Some(ProviderId::DeepSeek));
        assert_eq!(config.max_history_turns, 10);
        assert_eq!(config.zhipu.default_model.as_deref(), Some("glm-4.6"));
        assert_eq!(config.zhipu.rate_limits().requests_per_minute, 30);
        assert_eq!(config.deepseek.models, vec!["deepseek-chat".to_string()]);
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "primary = [").expect("write config");

        let error = ChatConfig::load_from_path(file.path()).expect_err("bad toml");
        assert_eq!(error.kind, ConfigErrorKind::Parse);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = ChatConfig::load(Some(&dir.path().join("nope.toml"))).expect_err("missing");

        assert_eq!(error.kind, ConfigErrorKind::Read);
    }
}
