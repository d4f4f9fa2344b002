use crate::llm::registry::ProviderConfig;
use crate::llm::transport::{HttpRequest, Transport};
use crate::llm::types::WireFormat;
use serde_json::Value;
use std::fmt;

/// Result of a single availability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Endpoint answered with a model list
    Reachable { models: Vec<String> },
    /// Timeout, refused connection, or a non-auth error status
    Unreachable { reason: String },
    /// Endpoint answered but can't serve us (bad key, bad body, model missing)
    Misconfigured { reason: String },
}

impl Availability {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Availability::Reachable { .. })
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Reachable { models } => write!(f, "reachable ({} models)", models.len()),
            Availability::Unreachable { reason } => write!(f, "unreachable: {reason}"),
            Availability::Misconfigured { reason } => write!(f, "misconfigured: {reason}"),
        }
    }
}

/// Probe `provider` once with its list-models endpoint, bounded by its probe timeout.
pub async fn probe(transport: &dyn Transport, provider: &ProviderConfig) -> Availability {
    let request = HttpRequest::get(provider.probe_url(), provider.probe_timeout)
        .with_bearer(provider.auth_token.as_deref());

    let availability = match transport.send(request).await {
        Err(err) => Availability::Unreachable {
            reason: err.to_string(),
        },
        Ok(response) if matches!(response.status, 401 | 403) => Availability::Misconfigured {
            reason: format!("HTTP {}: authentication rejected", response.status),
        },
        Ok(response) if !response.is_success() => Availability::Unreachable {
            reason: format!("HTTP {}", response.status),
        },
        Ok(response) => match parse_models(&response.body, provider.wire_format) {
            None => Availability::Misconfigured {
                reason: "unrecognized model list".to_string(),
            },
            Some(models)
                if provider.wire_format == WireFormat::Generate
                    && !has_model(&models, &provider.default_model) =>
            {
                Availability::Misconfigured {
                    reason: format!("model '{}' is not installed", provider.default_model),
                }
            }
            Some(models) => Availability::Reachable { models },
        },
    };

    tracing::debug!(provider = %provider.name, availability = %availability, "probe finished");
    availability
}

/// Model names from `/api/tags` (`models[].name`) or `/models` (`data[].id`).
fn parse_models(body: &str, format: WireFormat) -> Option<Vec<String>> {
    let value: Value = serde_json::from_str(body).ok()?;
    let (list_key, name_key) = match format {
        WireFormat::Generate => ("models", "name"),
        WireFormat::ChatCompletions => ("data", "id"),
    };

    let list = value.get(list_key)?.as_array()?;
    Some(
        list.iter()
            .filter_map(|m| m.get(name_key).and_then(Value::as_str))
            .map(str::to_string)
            .collect(),
    )
}

/// Untagged names match their `:latest` tag.
fn has_model(models: &[String], wanted: &str) -> bool {
    let wanted_tagged = if wanted.contains(':') {
        wanted.to_string()
    } else {
        format!("{wanted}:latest")
    };
    models.iter().any(|m| m == wanted || *m == wanted_tagged)
}
