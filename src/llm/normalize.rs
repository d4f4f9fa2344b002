//! Response normalization: turn a provider's raw reply body into one text value.
//!
//! Chat-completion backends answer with a single JSON object. Generate-style
//! backends answer with newline-delimited JSON; there the last line that
//! carries text wins, since each chunk supersedes the ones before it.

use crate::llm::types::WireFormat;
use serde_json::Value;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("no parseable lines in response stream")]
    NoValidLines,
}

/// Normalize a raw body according to the provider's wire format.
pub fn normalize(raw_body: &str, format: WireFormat) -> Result<String, NormalizeError> {
    match format {
        WireFormat::ChatCompletions => normalize_chat(raw_body),
        WireFormat::Generate => normalize_generate(raw_body),
    }
}

/// `choices[0].message.content` of a single JSON object.
fn normalize_chat(raw_body: &str) -> Result<String, NormalizeError> {
    let value: Value =
        serde_json::from_str(raw_body).map_err(|e| NormalizeError::InvalidJson(e.to_string()))?;

    value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(NormalizeError::MissingField("choices[0].message.content"))
}

fn normalize_generate(raw_body: &str) -> Result<String, NormalizeError> {
    // A non-streamed reply may be a single (possibly pretty-printed) object.
    if let Ok(value) = serde_json::from_str::<Value>(raw_body) {
        return generate_text(&value).ok_or(NormalizeError::MissingField("response"));
    }

    let mut last = None;
    for (line_no, line) in raw_body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(value) => match generate_text(&value) {
                Some(text) => last = Some(text),
                None => tracing::debug!(line = line_no + 1, "stream line carries no text, skipping"),
            },
            Err(e) => {
                tracing::warn!(line = line_no + 1, error = %e, "skipping malformed stream line");
            }
        }
    }

    last.ok_or(NormalizeError::NoValidLines)
}

/// Text of one generate-shaped object: `response`, else `message` or `message.content`.
fn generate_text(value: &Value) -> Option<String> {
    if let Some(text) = value.get("response").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    match value.get("message") {
        Some(Value::String(text)) => Some(text.clone()),
        Some(message) => message
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_stream_line_wins() {
        let body = "{\"response\":\"a\"}\n{\"response\":\"ab\"}\n{\"response\":\"abc\"}";
        assert_eq!(normalize(body, WireFormat::Generate).unwrap(), "abc");
    }

    #[test]
    fn malformed_line_is_skipped() {
        let body = "{\"response\":\"a\"}\n{not json\n{\"response\":\"abc\"}\n{\"respo";
        assert_eq!(normalize(body, WireFormat::Generate).unwrap(), "abc");
    }

    #[test]
    fn blank_lines_are_ignored() {
        let body = "\n{\"response\":\"x\",\"done\":false}\n\n\r\n";
        assert_eq!(normalize(body, WireFormat::Generate).unwrap(), "x");
    }

    #[test]
    fn message_field_variants() {
        assert_eq!(
            normalize("{\"message\":\"hi\",\"done\":true}", WireFormat::Generate).unwrap(),
            "hi"
        );
        assert_eq!(
            normalize(
                "{\"message\":{\"role\":\"assistant\",\"content\":\"hello\"},\"done\":true}",
                WireFormat::Generate
            )
            .unwrap(),
            "hello"
        );
    }

    #[test]
    fn trailing_done_marker_does_not_erase_text() {
        let body = "{\"response\":\"full\"}\n{\"done\":true}";
        assert_eq!(normalize(body, WireFormat::Generate).unwrap(), "full");
    }

    #[test]
    fn zero_valid_lines_is_an_error() {
        assert_eq!(
            normalize("garbage\nmore garbage", WireFormat::Generate).unwrap_err(),
            NormalizeError::NoValidLines
        );
        assert_eq!(
            normalize("", WireFormat::Generate).unwrap_err(),
            NormalizeError::NoValidLines
        );
    }

    #[test]
    fn single_generate_object_without_text_is_missing_field() {
        assert_eq!(
            normalize("{\"done\":true}", WireFormat::Generate).unwrap_err(),
            NormalizeError::MissingField("response")
        );
    }

    #[test]
    fn chat_completion_content() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"**Summary**"}}]}"#;
        assert_eq!(normalize(body, WireFormat::ChatCompletions).unwrap(), "**Summary**");
    }

    #[test]
    fn chat_completion_without_choices() {
        assert_eq!(
            normalize(r#"{"choices":[]}"#, WireFormat::ChatCompletions).unwrap_err(),
            NormalizeError::MissingField("choices[0].message.content")
        );
        assert!(matches!(
            normalize("<html>", WireFormat::ChatCompletions).unwrap_err(),
            NormalizeError::InvalidJson(_)
        ));
    }
}
