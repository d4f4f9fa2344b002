use crate::search::SearchError;
use std::fmt;

/// How a provider failed, as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection-level failure, timeout, or an overloaded backend
    Unreachable,
    /// Credential or endpoint problem that a retry won't fix
    Misconfigured,
    /// Body matched no recognized wire shape
    ParseError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Unreachable => "unreachable",
            FailureKind::Misconfigured => "misconfigured",
            FailureKind::ParseError => "parse error",
        })
    }
}

/// One failed attempt against a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub kind: FailureKind,
    /// Worth retrying against the same provider
    pub transient: bool,
    pub detail: String,
}

impl ProviderFailure {
    pub fn transient(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            transient: true,
            detail: detail.into(),
        }
    }

    pub fn terminal(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            transient: false,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.detail)
    }
}

/// Final reason a provider was given up on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailureRecord {
    pub provider: String,
    pub failure: ProviderFailure,
}

/// Terminal errors of a summarize request
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("Search returned no results")]
    NoResults,

    #[error("No enabled AI providers are configured")]
    NoEnabledProviders,

    #[error("All AI providers failed: {}", describe_attempts(.attempts))]
    Exhausted { attempts: Vec<ProviderFailureRecord> },

    #[error("Request cancelled")]
    Cancelled,
}

fn describe_attempts(attempts: &[ProviderFailureRecord]) -> String {
    attempts
        .iter()
        .map(|r| format!("{}: {}", r.provider, r.failure))
        .collect::<Vec<_>>()
        .join("; ")
}
