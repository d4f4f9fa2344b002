use crate::llm::error::{FailureKind, ProviderFailure};
use crate::llm::normalize::normalize;
use crate::llm::registry::ProviderConfig;
use crate::llm::transport::{HttpRequest, HttpResponse, TransportError};
use crate::llm::types::{ChatCompletionRequest, ChatMessage, GenerateRequest, WireFormat};
use crate::logging::redact_secrets;
use crate::prompt::Prompt;

/// What happened on one network attempt, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Timeout,
    Connection,
    HttpError(u16),
    ParseError,
    /// The availability probe ruled the provider out before any request
    ProbeFailed,
}

/// Build the generation request for `provider` in its wire format.
///
/// A body that can't be encoded is a configuration problem, never a retry.
pub fn generation_request(
    provider: &ProviderConfig,
    prompt: &Prompt,
) -> Result<HttpRequest, ProviderFailure> {
    let body = match provider.wire_format {
        WireFormat::Generate => serde_json::to_value(GenerateRequest {
            model: provider.default_model.clone(),
            prompt: prompt.combined(),
            stream: false,
        }),
        WireFormat::ChatCompletions => serde_json::to_value(ChatCompletionRequest {
            model: provider.default_model.clone(),
            messages: vec![
                ChatMessage::system(&prompt.system_instruction),
                ChatMessage::user(&prompt.user_content),
            ],
            temperature: provider.temperature,
            max_tokens: provider.max_tokens,
        }),
    }
    .map_err(|e| {
        ProviderFailure::terminal(
            FailureKind::Misconfigured,
            format!("request body could not be encoded: {e}"),
        )
    })?;

    Ok(HttpRequest::post(provider.generation_url(), body, provider.timeout)
        .with_bearer(provider.auth_token.as_deref()))
}

/// Turn a network result into summary text or a classified failure.
pub fn interpret(
    provider: &ProviderConfig,
    result: Result<HttpResponse, TransportError>,
) -> (Result<String, ProviderFailure>, AttemptOutcome) {
    let response = match result {
        Ok(response) => response,
        Err(err) => {
            let outcome = match err {
                TransportError::Timeout(_) => AttemptOutcome::Timeout,
                TransportError::Connect(_) | TransportError::Io(_) => AttemptOutcome::Connection,
            };
            return (
                Err(ProviderFailure::transient(FailureKind::Unreachable, err.to_string())),
                outcome,
            );
        }
    };

    if !response.is_success() {
        tracing::warn!(
            provider = %provider.name,
            status = response.status,
            error = %redact_secrets(&response.body),
            "provider returned error status"
        );
        return (
            Err(classify_status(response.status, &response.body)),
            AttemptOutcome::HttpError(response.status),
        );
    }

    match normalize(&response.body, provider.wire_format) {
        Ok(text) if text.trim().is_empty() => (
            Err(ProviderFailure::terminal(
                FailureKind::ParseError,
                "empty response",
            )),
            AttemptOutcome::ParseError,
        ),
        Ok(text) => (Ok(text), AttemptOutcome::Success),
        Err(e) => (
            Err(ProviderFailure::terminal(FailureKind::ParseError, e.to_string())),
            AttemptOutcome::ParseError,
        ),
    }
}

/// Classify a non-2xx status. Only 429 and 503 are worth retrying.
pub fn classify_status(status: u16, body: &str) -> ProviderFailure {
    let detail = match first_line(body) {
        Some(line) => format!("HTTP {status}: {}", redact_secrets(line)),
        None => format!("HTTP {status}"),
    };

    match status {
        429 | 503 => ProviderFailure::transient(FailureKind::Unreachable, detail),
        400..=499 => ProviderFailure::terminal(FailureKind::Misconfigured, detail),
        _ => ProviderFailure::terminal(FailureKind::Unreachable, detail),
    }
}

fn first_line(body: &str) -> Option<&str> {
    let line = body.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(match line.char_indices().nth(200) {
        Some((idx, _)) => &line[..idx],
        None => line,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::registry::tests::provider;

    fn ok(body: &str) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse {
            status: 200,
            content_type: Some("application/json".to_string()),
            body: body.to_string(),
        })
    }

    fn prompt() -> Prompt {
        Prompt {
            system_instruction: "sys".to_string(),
            user_content: "user".to_string(),
        }
    }

    #[test]
    fn chat_request_shape() {
        let p = provider("cloud", true, Some("k"));
        let request = generation_request(&p, &prompt()).unwrap();
        assert_eq!(request.url, "http://cloud.test/chat/completions");
        assert_eq!(request.bearer.as_deref(), Some("k"));
        let body = request.body.unwrap();
        assert_eq!(body["model"], "model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn generate_request_shape() {
        let mut p = provider("local", false, None);
        p.wire_format = WireFormat::Generate;
        let request = generation_request(&p, &prompt()).unwrap();
        assert_eq!(request.url, "http://local.test/api/generate");
        assert!(request.bearer.is_none());
        let body = request.body.unwrap();
        assert_eq!(body["prompt"], "sys\n\nuser");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn status_classification() {
        assert!(classify_status(429, "").transient);
        assert!(classify_status(503, "").transient);

        let auth = classify_status(401, "{\"error\":\"bad key\"}");
        assert!(!auth.transient);
        assert_eq!(auth.kind, FailureKind::Misconfigured);
        assert!(auth.detail.starts_with("HTTP 401"));

        assert_eq!(classify_status(404, "").kind, FailureKind::Misconfigured);

        let server = classify_status(500, "boom");
        assert!(!server.transient);
        assert_eq!(server.kind, FailureKind::Unreachable);
    }

    #[test]
    fn transport_errors_are_transient() {
        let p = provider("cloud", true, Some("k"));
        let (result, outcome) = interpret(
            &p,
            Err(TransportError::Timeout(std::time::Duration::from_secs(3))),
        );
        let failure = result.unwrap_err();
        assert!(failure.transient);
        assert_eq!(failure.kind, FailureKind::Unreachable);
        assert_eq!(outcome, AttemptOutcome::Timeout);
    }

    #[test]
    fn empty_text_is_a_parse_error() {
        let p = provider("cloud", true, Some("k"));
        let (result, outcome) = interpret(
            &p,
            ok(r#"{"choices":[{"message":{"role":"assistant","content":"  "}}]}"#),
        );
        assert_eq!(result.unwrap_err().kind, FailureKind::ParseError);
        assert_eq!(outcome, AttemptOutcome::ParseError);
    }

    #[test]
    fn success_yields_text() {
        let p = provider("cloud", true, Some("k"));
        let (result, outcome) = interpret(
            &p,
            ok(r#"{"choices":[{"message":{"role":"assistant","content":"done"}}]}"#),
        );
        assert_eq!(result.unwrap(), "done");
        assert_eq!(outcome, AttemptOutcome::Success);
    }
}
