//! Provider registry: the ordered, immutable set of LLM backends.
//!
//! Built once at startup from [`ProviderSettings`] and shared read-only
//! (behind an `Arc`) by every orchestration.

use crate::config::ProviderSettings;
use crate::llm::types::WireFormat;
use std::time::Duration;

/// Connection parameters for one backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub name: String,
    pub endpoint_base_url: String,
    pub auth_token: Option<String>,
    pub default_model: String,
    pub wire_format: WireFormat,
    /// Per-attempt timeout for generation requests
    pub timeout: Duration,
    pub probe_timeout: Duration,
    pub requires_auth: bool,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ProviderConfig {
    /// A provider is usable when it needs no secret, or its secret is present.
    pub fn enabled(&self) -> bool {
        !self.requires_auth || self.auth_token.is_some()
    }

    pub fn generation_url(&self) -> String {
        format!("{}{}", self.endpoint_base_url, self.wire_format.generation_path())
    }

    pub fn probe_url(&self) -> String {
        format!("{}{}", self.endpoint_base_url, self.wire_format.probe_path())
    }

    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            name: settings.name.trim().to_string(),
            endpoint_base_url: settings.base_url.trim().trim_end_matches('/').to_string(),
            auth_token: settings.resolve_api_key(),
            default_model: settings.model.clone(),
            wire_format: settings.wire_format,
            timeout: Duration::from_millis(settings.timeout_ms),
            probe_timeout: Duration::from_millis(settings.probe_timeout_ms),
            requires_auth: settings.requires_auth,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Provider #{0} has an empty name")]
    EmptyName(usize),

    #[error("Provider '{0}' has an empty base URL")]
    EmptyBaseUrl(String),

    #[error("Provider '{0}' is configured more than once")]
    DuplicateName(String),

    #[error("Provider '{0}' has a temperature that is not a finite number")]
    InvalidTemperature(String),
}

/// Ordered, read-only list of providers.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<ProviderConfig>,
}

impl ProviderRegistry {
    /// Validate and freeze a provider list.
    ///
    /// Providers missing a required secret are kept, marked disabled.
    pub fn new(providers: Vec<ProviderConfig>) -> Result<Self, RegistryError> {
        for (idx, provider) in providers.iter().enumerate() {
            if provider.name.is_empty() {
                return Err(RegistryError::EmptyName(idx));
            }
            if provider.endpoint_base_url.is_empty() {
                return Err(RegistryError::EmptyBaseUrl(provider.name.clone()));
            }
            if providers[..idx].iter().any(|p| p.name == provider.name) {
                return Err(RegistryError::DuplicateName(provider.name.clone()));
            }
            if !provider.temperature.is_finite() {
                return Err(RegistryError::InvalidTemperature(provider.name.clone()));
            }
        }

        for provider in providers.iter().filter(|p| !p.enabled()) {
            tracing::info!(provider = %provider.name, "provider configured but disabled (missing API key)");
        }

        Ok(Self { providers })
    }

    pub fn from_settings(settings: &[ProviderSettings]) -> Result<Self, RegistryError> {
        Self::new(settings.iter().map(ProviderConfig::from_settings).collect())
    }

    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    pub fn get(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Candidate order for a query: the preferred provider first (when
    /// enabled), then every other enabled provider in registry order.
    pub fn candidates(&self, preferred: &str) -> Vec<&ProviderConfig> {
        let mut ordered = Vec::with_capacity(self.providers.len());

        match self.get(preferred) {
            Some(p) if p.enabled() => ordered.push(p),
            Some(_) => {
                tracing::warn!(provider = %preferred, "preferred provider is disabled, using registry order")
            }
            None => {
                tracing::warn!(provider = %preferred, "preferred provider is not configured, using registry order")
            }
        }

        ordered.extend(
            self.providers
                .iter()
                .filter(|p| p.enabled() && p.name != preferred),
        );
        ordered
    }
}
