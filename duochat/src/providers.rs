//! Builds provider slots from a validated [`ChatConfig`].
//!
//! The primary client is constructed up front. The fallback is wrapped in a
//! [`LazyProviderClient`] so an unused fallback never builds its transport,
//! while its credential pool is still checked at startup.

use std::sync::Arc;
use std::time::Duration;

use dchat::ProviderSlot;
use dprovider::{
    CredentialPool, LazyProviderClient, ProviderClient, ProviderError, ProviderId, RateMonitor,
};
use reqwest::Client;

use crate::config::{ChatConfig, ProviderSettings};

#[derive(Debug, Clone)]
pub struct ProviderSet {
    pub primary: ProviderSlot,
    pub fallback: Option<ProviderSlot>,
}

pub fn http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| ProviderError::transport(err.to_string()))
}

pub fn build_provider_set(config: &ChatConfig) -> Result<ProviderSet, ProviderError> {
    let http = http_client(config.request_timeout())?;

    let primary = build_provider(config.primary, config.provider(config.primary), &http)?;
    let fallback = config
        .fallback
        .map(|id| build_lazy_provider(id, config.provider(id), &http))
        .transpose()?;

    Ok(ProviderSet { primary, fallback })
}

/// Eagerly constructs the client for `id`.
pub fn build_provider(
    id: ProviderId,
    settings: &ProviderSettings,
    http: &Client,
) -> Result<ProviderSlot, ProviderError> {
    let credentials = credential_pool(id, settings)?;
    let client = build_client(id, Arc::clone(&credentials), settings, http.clone())?;
    Ok(configure_slot(
        ProviderSlot::new(client, credentials),
        settings,
    ))
}

/// Like [`build_provider`], but defers client construction to the first turn.
pub fn build_lazy_provider(
    id: ProviderId,
    settings: &ProviderSettings,
    http: &Client,
) -> Result<ProviderSlot, ProviderError> {
    let credentials = credential_pool(id, settings)?;
    let init_credentials = Arc::clone(&credentials);
    let init_settings = settings.clone();
    let init_http = http.clone();

    let client = LazyProviderClient::new(id, move || {
        build_client(
            id,
            Arc::clone(&init_credentials),
            &init_settings,
            init_http.clone(),
        )
    });

    Ok(configure_slot(
        ProviderSlot::new(Arc::new(client), credentials),
        settings,
    ))
}

fn credential_pool(
    id: ProviderId,
    settings: &ProviderSettings,
) -> Result<Arc<CredentialPool>, ProviderError> {
    CredentialPool::new(id, settings.api_keys.iter().map(String::as_str)).map(Arc::new)
}

fn configure_slot(mut slot: ProviderSlot, settings: &ProviderSettings) -> ProviderSlot {
    slot = slot.with_rate_monitor(Arc::new(RateMonitor::new(settings.rate_limits())));
    if !settings.models.is_empty() {
        slot = slot.with_models(settings.models.iter().cloned());
    }
    if let Some(model) = &settings.default_model {
        slot = slot.with_default_model(model.clone());
    }
    slot
}

fn build_client(
    id: ProviderId,
    credentials: Arc<CredentialPool>,
    settings: &ProviderSettings,
    http: Client,
) -> Result<Arc<dyn ProviderClient>, ProviderError> {
    match id {
        ProviderId::Gemini => build_gemini_client(credentials, settings, http),
        ProviderId::Zhipu | ProviderId::DeepSeek | ProviderId::OpenAi => {
            build_openai_client(id, credentials, settings, http)
        }
    }
}

#[cfg(feature = "provider-gemini")]
fn build_gemini_client(
    credentials: Arc<CredentialPool>,
    settings: &ProviderSettings,
    http: Client,
) -> Result<Arc<dyn ProviderClient>, ProviderError> {
    use dprovider::adapters::gemini::{GeminiHttpTransport, GeminiProvider};

    let mut transport = GeminiHttpTransport::new(http);
    if let Some(base_url) = &settings.base_url {
        transport = transport.with_base_url(base_url.clone());
    }

    let mut provider = GeminiProvider::new(credentials, Arc::new(transport))?;
    if let Some(model) = &settings.default_model {
        provider = provider.with_default_model(model.clone());
    }
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "provider-gemini"))]
fn build_gemini_client(
    _credentials: Arc<CredentialPool>,
    _settings: &ProviderSettings,
    _http: Client,
) -> Result<Arc<dyn ProviderClient>, ProviderError> {
    Err(ProviderError::invalid_request(
        "provider-gemini feature is not enabled on duochat",
    ))
}

#[cfg(feature = "provider-openai")]
fn build_openai_client(
    id: ProviderId,
    credentials: Arc<CredentialPool>,
    settings: &ProviderSettings,
    http: Client,
) -> Result<Arc<dyn ProviderClient>, ProviderError> {
    use dprovider::adapters::openai::{OpenAiHttpTransport, OpenAiProvider};

    let mut transport = OpenAiHttpTransport::for_provider(http, id);
    if let Some(base_url) = &settings.base_url {
        transport = transport.with_base_url(base_url.clone());
    }

    let mut provider = OpenAiProvider::new(credentials, Arc::new(transport));
    if let Some(model) = &settings.default_model {
        provider = provider.with_default_model(model.clone());
    }
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "provider-openai"))]
fn build_openai_client(
    _id: ProviderId,
    _credentials: Arc<CredentialPool>,
    _settings: &ProviderSettings,
    _http: Client,
) -> Result<Arc<dyn ProviderClient>, ProviderError> {
    Err(ProviderError::invalid_request(
        "provider-openai feature is not enabled on duochat",
    ))
}

#[cfg(all(test, feature = "provider-gemini", feature = "provider-openai"))]
mod tests {
    use dprovider::ProviderErrorKind;

    use super::*;

    fn keys(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn configured() -> ChatConfig {
        let mut config = ChatConfig::default();
        config.gemini.api_keys = keys(&["gemini-key-0001", "gemini-key-0002"]);
        config.zhipu.api_keys = keys(&["zhipu-key-0001"]);
        config.zhipu.default_model = Some("glm-4.6".to_string());
        config.zhipu.requests_per_minute = Some(30);
        config
    }

    #[test]
    fn builds_primary_and_lazy_fallback() {
        let set = build_provider_set(&configured()).expect("providers should build");

        assert_eq!(set.primary.id(), ProviderId::Gemini);
        assert_eq!(set.primary.credentials().len(), 2);
        assert_eq!(set.primary.default_model(), "gemini-2.5-flash");

        let fallback = set.fallback.expect("fallback configured");
        assert_eq!(fallback.id(), ProviderId::Zhipu);
        assert_eq!(fallback.default_model(), "glm-4.6");
        assert_eq!(fallback.rate_monitor().limits().requests_per_minute, 30);
    }

    #[test]
    fn custom_model_list_replaces_catalog() {
        let mut config = configured();
        config.gemini.models = keys(&["gemini-exp", "  "]);
        config.fallback = None;

        let set = build_provider_set(&config).expect("providers should build");

        assert_eq!(set.primary.models(), &["gemini-exp".to_string()]);
        assert!(set.fallback.is_none());
    }

    #[test]
    fn empty_credentials_fail_with_pool_empty() {
        let http = http_client(Duration::from_secs(5)).expect("client");
        let error = build_provider(ProviderId::DeepSeek, &ProviderSettings::default(), &http)
            .expect_err("no keys");

        assert_eq!(error.kind, ProviderErrorKind::PoolEmpty);
    }
}
