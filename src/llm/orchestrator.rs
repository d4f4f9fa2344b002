//! Failover orchestration across the provider registry.
//!
//! [`FailoverMachine`] is the pure transition table:
//!
//! | state                  | event       | next state                                   |
//! |------------------------|-------------|----------------------------------------------|
//! | `Idle`                 | `Start`     | `Attempting(0, 1)` or `ExhaustedFailure`     |
//! | `Attempting(c, a)`     | `Succeeded` | `Success(c)`                                 |
//! | `Attempting(c, a)`     | `Failed`    | `Attempting(c, a + 1)` after backoff when the failure is transient and `a < max_attempts`, else `NextProvider(c)` |
//! | `NextProvider(c)`      | `Advance`   | `Attempting(c + 1, 1)` or `ExhaustedFailure` |
//!
//! [`Orchestrator`] drives the machine over the network. Attempts are strictly
//! sequential; the only suspension points are the probe, the generation
//! request and the backoff sleep, and each of them races the caller's
//! cancellation token.

use crate::config::RetrySettings;
use crate::llm::backend::{self, AttemptOutcome};
use crate::llm::error::{FailureKind, ProviderFailure, ProviderFailureRecord, SummarizeError};
use crate::llm::probe::{probe, Availability};
use crate::llm::registry::{ProviderConfig, ProviderRegistry};
use crate::llm::transport::Transport;
use crate::llm::types::AiResponse;
use crate::prompt::Prompt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-provider retry policy: bounded attempts with doubling delays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per provider, including the first (default: 3)
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after that (default: 1s)
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (1-based): base * 2^(attempt-1).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Idle,
    Attempting { candidate: usize, attempt: u32 },
    NextProvider { candidate: usize },
    Success { candidate: usize },
    ExhaustedFailure,
}

#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Start,
    Succeeded,
    Failed(&'a ProviderFailure),
    Advance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: State,
    /// Wait this long before entering `state`
    pub backoff: Option<Duration>,
}

impl Transition {
    fn to(state: State) -> Self {
        Self {
            state,
            backoff: None,
        }
    }
}

/// Transition table over an ordered candidate list.
#[derive(Debug, Clone)]
pub struct FailoverMachine {
    candidate_count: usize,
    retry: RetryPolicy,
}

impl FailoverMachine {
    pub fn new(candidate_count: usize, retry: RetryPolicy) -> Self {
        Self {
            candidate_count,
            retry,
        }
    }

    fn attempting_or_exhausted(&self, candidate: usize) -> State {
        if candidate < self.candidate_count {
            State::Attempting {
                candidate,
                attempt: 1,
            }
        } else {
            State::ExhaustedFailure
        }
    }

    pub fn next(&self, state: &State, event: Event<'_>) -> Transition {
        match (state, event) {
            (State::Idle, Event::Start) => Transition::to(self.attempting_or_exhausted(0)),
            (State::Attempting { candidate, .. }, Event::Succeeded) => {
                Transition::to(State::Success {
                    candidate: *candidate,
                })
            }
            (State::Attempting { candidate, attempt }, Event::Failed(failure)) => {
                if failure.transient && *attempt < self.retry.max_attempts {
                    Transition {
                        state: State::Attempting {
                            candidate: *candidate,
                            attempt: attempt + 1,
                        },
                        backoff: Some(self.retry.backoff_after(*attempt)),
                    }
                } else {
                    Transition::to(State::NextProvider {
                        candidate: *candidate,
                    })
                }
            }
            (State::NextProvider { candidate }, Event::Advance) => {
                Transition::to(self.attempting_or_exhausted(candidate + 1))
            }
            (state, event) => {
                tracing::debug!(?state, ?event, "event ignored in current state");
                Transition::to(state.clone())
            }
        }
    }
}

/// Diagnostic record of one step against one provider.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: String,
    /// 1-based attempt number within the provider. A failed probe takes the
    /// number of the attempt it ruled out.
    pub attempt: u32,
    pub started_at: Instant,
    pub outcome: AttemptOutcome,
    pub latency: Duration,
}

/// Result plus every attempt made to get it.
#[derive(Debug)]
pub struct Traced {
    pub result: Result<AiResponse, SummarizeError>,
    pub attempts: Vec<ProviderAttempt>,
}

/// Runs one summary request across the registry with retry and failover.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    probe_first: bool,
}

impl Orchestrator {
    pub fn new(registry: Arc<ProviderRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            retry: RetryPolicy::default(),
            probe_first: false,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Probe each candidate before its first generation request
    pub fn with_probe_first(mut self, probe_first: bool) -> Self {
        self.probe_first = probe_first;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub async fn run(
        &self,
        prompt: &Prompt,
        preferred: &str,
        cancel: &CancellationToken,
    ) -> Result<AiResponse, SummarizeError> {
        self.run_traced(prompt, preferred, cancel).await.result
    }

    pub async fn run_traced(
        &self,
        prompt: &Prompt,
        preferred: &str,
        cancel: &CancellationToken,
    ) -> Traced {
        let mut attempts = Vec::new();
        let result = self.drive(prompt, preferred, cancel, &mut attempts).await;

        match &result {
            Ok(response) => tracing::info!(
                provider = %response.provider,
                attempts = attempts.len(),
                "summary generated"
            ),
            Err(e) => tracing::warn!(error = %e, attempts = attempts.len(), "summary failed"),
        }

        Traced { result, attempts }
    }

    async fn drive(
        &self,
        prompt: &Prompt,
        preferred: &str,
        cancel: &CancellationToken,
        attempts: &mut Vec<ProviderAttempt>,
    ) -> Result<AiResponse, SummarizeError> {
        let candidates = self.registry.candidates(preferred);
        if candidates.is_empty() {
            return Err(SummarizeError::NoEnabledProviders);
        }

        tracing::debug!(
            preferred = %preferred,
            order = ?candidates.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            "starting failover"
        );

        let machine = FailoverMachine::new(candidates.len(), self.retry.clone());
        let mut failures: Vec<ProviderFailureRecord> = Vec::new();
        let mut last_failure: Option<ProviderFailure> = None;
        let mut state = machine.next(&State::Idle, Event::Start).state;

        loop {
            if cancel.is_cancelled() {
                return Err(SummarizeError::Cancelled);
            }

            match state {
                State::Attempting { candidate, attempt } => {
                    let provider = candidates[candidate];

                    let ruled_out = if attempt == 1 && self.probe_first {
                        self.probe_candidate(provider, attempt, cancel, attempts).await?
                    } else {
                        None
                    };
                    let result = match ruled_out {
                        Some(failure) => Err(failure),
                        None => self.send_attempt(provider, attempt, prompt, cancel, attempts).await?,
                    };

                    match result {
                        Ok(text) => {
                            state = machine.next(&state, Event::Succeeded).state;
                            tracing::debug!(?state, "failover finished");
                            return Ok(AiResponse {
                                text,
                                provider: provider.name.clone(),
                            });
                        }
                        Err(failure) => {
                            let transition = machine.next(&state, Event::Failed(&failure));
                            if let Some(delay) = transition.backoff {
                                tracing::warn!(
                                    provider = %provider.name,
                                    attempt,
                                    delay_ms = delay.as_millis() as u64,
                                    error = %failure,
                                    "retrying after transient error"
                                );
                                tokio::select! {
                                    biased;
                                    _ = cancel.cancelled() => {
                                        tracing::info!(provider = %provider.name, "cancelled during backoff");
                                        return Err(SummarizeError::Cancelled);
                                    }
                                    _ = tokio::time::sleep(delay) => {}
                                }
                            }
                            last_failure = Some(failure);
                            state = transition.state;
                        }
                    }
                }
                State::NextProvider { candidate } => {
                    let provider = candidates[candidate];
                    let failure = last_failure.take().unwrap_or_else(|| {
                        ProviderFailure::terminal(FailureKind::Unreachable, "no attempt recorded")
                    });

                    tracing::warn!(
                        provider = %provider.name,
                        provider_index = candidate,
                        total_providers = candidates.len(),
                        error = %failure,
                        "provider failed, trying next in failover order"
                    );

                    failures.push(ProviderFailureRecord {
                        provider: provider.name.clone(),
                        failure,
                    });
                    state = machine.next(&state, Event::Advance).state;
                }
                State::ExhaustedFailure => {
                    return Err(SummarizeError::Exhausted { attempts: failures });
                }
                State::Idle | State::Success { .. } => {
                    // The driver returns on success and never re-enters Idle.
                    return Err(SummarizeError::Exhausted { attempts: failures });
                }
            }
        }
    }

    /// One generation request. The outer `Err` is cancellation only.
    async fn send_attempt(
        &self,
        provider: &ProviderConfig,
        attempt: u32,
        prompt: &Prompt,
        cancel: &CancellationToken,
        attempts: &mut Vec<ProviderAttempt>,
    ) -> Result<Result<String, ProviderFailure>, SummarizeError> {
        let request = match backend::generation_request(provider, prompt) {
            Ok(request) => request,
            Err(failure) => return Ok(Err(failure)),
        };

        let started_at = Instant::now();
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(provider = %provider.name, attempt, "request cancelled in flight");
                return Err(SummarizeError::Cancelled);
            }
            sent = self.transport.send(request) => sent,
        };
        let (result, outcome) = backend::interpret(provider, sent);
        let latency = started_at.elapsed();

        tracing::info!(
            provider = %provider.name,
            attempt,
            outcome = ?outcome,
            latency_ms = latency.as_millis() as u64,
            "provider attempt finished"
        );
        attempts.push(ProviderAttempt {
            provider: provider.name.clone(),
            attempt,
            started_at,
            outcome,
            latency,
        });

        Ok(result)
    }

    /// Probe a candidate; `Some(failure)` rules out this attempt.
    ///
    /// An unreachable endpoint fails the attempt transiently, so it is retried
    /// with backoff like any other outage. A misconfigured one is terminal.
    async fn probe_candidate(
        &self,
        provider: &ProviderConfig,
        attempt: u32,
        cancel: &CancellationToken,
        attempts: &mut Vec<ProviderAttempt>,
    ) -> Result<Option<ProviderFailure>, SummarizeError> {
        let started_at = Instant::now();
        let availability = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SummarizeError::Cancelled),
            availability = probe(self.transport.as_ref(), provider) => availability,
        };

        let failure = match availability {
            Availability::Reachable { .. } => return Ok(None),
            Availability::Unreachable { reason } => {
                ProviderFailure::transient(FailureKind::Unreachable, format!("probe: {reason}"))
            }
            Availability::Misconfigured { reason } => {
                ProviderFailure::terminal(FailureKind::Misconfigured, format!("probe: {reason}"))
            }
        };

        attempts.push(ProviderAttempt {
            provider: provider.name.clone(),
            attempt,
            started_at,
            outcome: AttemptOutcome::ProbeFailed,
            latency: started_at.elapsed(),
        });
        Ok(Some(failure))
    }
}
