//! Retry and circuit breaking around any [`LlmProvider`].

use super::{LlmError, LlmProvider, LlmTask};
use crate::config::LlmConfig;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Retry and breaker settings for language-model calls.
#[derive(Debug, Clone)]
pub struct LlmResilienceConfig {
    /// Extra attempts after a timeout or connection failure.
    pub max_retries: u32,
    /// Pause between attempts in milliseconds; zero retries immediately.
    pub retry_backoff_ms: u64,
    /// Consecutive failed attempts that open the circuit.
    pub breaker_failure_threshold: u32,
    /// Time an open circuit refuses calls before admitting a probe.
    pub breaker_reset_timeout_ms: u64,
    /// Probe calls admitted while the circuit is recovering.
    pub breaker_half_open_max_calls: u32,
}

impl Default for LlmResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_backoff_ms: 1_000,
            breaker_failure_threshold: 3,
            breaker_reset_timeout_ms: 30_000,
            breaker_half_open_max_calls: 1,
        }
    }
}

impl LlmResilienceConfig {
    /// Settings from the `[llm]` section, defaults for anything unset.
    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        let defaults = Self::default();
        Self {
            max_retries: config.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_ms: config.retry_backoff_ms.unwrap_or(defaults.retry_backoff_ms),
            breaker_failure_threshold: config
                .breaker_failure_threshold
                .map_or(defaults.breaker_failure_threshold, |t| t.max(1)),
            breaker_reset_timeout_ms: config
                .breaker_reset_ms
                .unwrap_or(defaults.breaker_reset_timeout_ms),
            ..defaults
        }
    }

    fn backoff(&self) -> Option<Duration> {
        (self.retry_backoff_ms > 0).then(|| Duration::from_millis(self.retry_backoff_ms))
    }
}

#[derive(Debug, Clone, Copy)]
enum Circuit {
    /// Calls flow; holds the consecutive failure count.
    Closed(u32),
    /// Calls are refused until the reset timeout has passed.
    Open(Instant),
    /// Recovering; holds the number of probes admitted so far.
    Probing(u32),
}

impl Circuit {
    const fn gauge(self) -> f64 {
        match self {
            Self::Closed(_) => 0.0,
            Self::Open(_) => 1.0,
            Self::Probing(_) => 2.0,
        }
    }
}

#[derive(Debug)]
struct Breaker {
    circuit: Circuit,
    threshold: u32,
    reset: Duration,
    max_probes: u32,
}

impl Breaker {
    fn new(config: &LlmResilienceConfig) -> Self {
        Self {
            circuit: Circuit::Closed(0),
            threshold: config.breaker_failure_threshold.max(1),
            reset: Duration::from_millis(config.breaker_reset_timeout_ms),
            max_probes: config.breaker_half_open_max_calls.max(1),
        }
    }

    fn admit(&mut self) -> bool {
        match self.circuit {
            Circuit::Closed(_) => true,
            Circuit::Open(since) if since.elapsed() >= self.reset => {
                self.circuit = Circuit::Probing(1);
                true
            },
            Circuit::Probing(probes) if probes < self.max_probes => {
                self.circuit = Circuit::Probing(probes + 1);
                true
            },
            Circuit::Open(_) | Circuit::Probing(_) => false,
        }
    }

    fn succeed(&mut self) {
        self.circuit = Circuit::Closed(0);
    }

    /// Records a failed attempt; true when it opened the circuit.
    fn fail(&mut self) -> bool {
        let opens = match self.circuit {
            Circuit::Closed(failures) => {
                let failures = failures + 1;
                self.circuit = Circuit::Closed(failures);
                failures >= self.threshold
            },
            Circuit::Probing(_) => true,
            Circuit::Open(_) => false,
        };
        if opens {
            self.circuit = Circuit::Open(Instant::now());
        }
        opens
    }
}

/// Wraps a provider with retries and a circuit breaker.
///
/// Timeouts and connection failures are retried up to
/// [`LlmResilienceConfig::max_retries`] times; other errors return at once.
/// Every failed attempt counts toward the breaker. While it is open, calls
/// fail fast with [`LlmError::CircuitOpen`] without reaching the provider.
pub struct ResilientLlmProvider<P: LlmProvider> {
    inner: P,
    config: LlmResilienceConfig,
    breaker: Mutex<Breaker>,
}

impl<P: LlmProvider> ResilientLlmProvider<P> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: P, config: LlmResilienceConfig) -> Self {
        let breaker = Mutex::new(Breaker::new(&config));
        Self {
            inner,
            config,
            breaker,
        }
    }

    fn with_breaker<T>(&self, update: impl FnOnce(&mut Breaker) -> T) -> T {
        let mut breaker = self.breaker.lock().unwrap_or_else(PoisonError::into_inner);
        let outcome = update(&mut breaker);
        metrics::gauge!("errfix_llm_circuit_breaker_state", "provider" => self.inner.name())
            .set(breaker.circuit.gauge());
        outcome
    }

    fn call<F>(&self, task: Option<LlmTask>, attempt: F) -> Result<String, LlmError>
    where
        F: Fn() -> Result<String, LlmError>,
    {
        let provider = self.inner.name();
        let operation = task.map_or("complete", |t| t.as_str());
        let span = tracing::info_span!(
            "llm.request",
            provider = provider,
            operation = operation,
            status = tracing::field::Empty,
            error = tracing::field::Empty
        );
        let _entered = span.enter();

        if !self.with_breaker(Breaker::admit) {
            span.record("status", "circuit_open");
            metrics::counter!(
                "errfix_llm_requests_total",
                "provider" => provider,
                "operation" => operation,
                "status" => "circuit_open"
            )
            .increment(1);
            return Err(LlmError::CircuitOpen(provider));
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            let started = Instant::now();
            let outcome = attempt();
            let status = match &outcome {
                Ok(_) => "success",
                Err(LlmError::Timeout(_)) => "timeout",
                Err(_) => "error",
            };
            span.record("status", status);
            metrics::counter!(
                "errfix_llm_requests_total",
                "provider" => provider,
                "operation" => operation,
                "status" => status
            )
            .increment(1);
            metrics::histogram!(
                "errfix_llm_request_duration_ms",
                "provider" => provider,
                "operation" => operation
            )
            .record(started.elapsed().as_secs_f64() * 1000.0);

            let err = match outcome {
                Ok(text) => {
                    self.with_breaker(Breaker::succeed);
                    return Ok(text);
                },
                Err(err) => err,
            };
            span.record("error", tracing::field::display(&err));

            if self.with_breaker(Breaker::fail) {
                tracing::warn!(provider, operation, "LLM circuit breaker opened");
                metrics::counter!("errfix_llm_circuit_breaker_trips_total", "provider" => provider)
                    .increment(1);
                return Err(err);
            }
            if !err.is_retryable() || attempts > self.config.max_retries {
                return Err(err);
            }

            tracing::warn!(provider, operation, attempt = attempts, error = %err, "Retrying LLM call");
            metrics::counter!(
                "errfix_llm_retries_total",
                "provider" => provider,
                "operation" => operation
            )
            .increment(1);
            if let Some(pause) = self.config.backoff() {
                std::thread::sleep(pause);
            }
        }
    }
}

impl<P: LlmProvider> LlmProvider for ResilientLlmProvider<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.call(None, || self.inner.complete(prompt))
    }

    fn complete_for_task(&self, prompt: &str, task: LlmTask) -> Result<String, LlmError> {
        self.call(Some(task), || self.inner.complete_for_task(prompt, task))
    }
}
