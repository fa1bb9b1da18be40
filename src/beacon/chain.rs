//! Fallback chain of beacon endpoints.
//!
//! # Shape
//! ```text
//! head (most preferred) ──fallback──▶ node ──fallback──▶ terminal (least preferred)
//!   breaker + 2 attempts               breaker + 2 attempts   no breaker, 1 attempt
//! ```
//!
//! # Per-node flow
//! ```text
//! attempt loop (retry budget)
//!     → breaker rejects?  → fallback.get(path)   (result is final)
//!     → transport GET
//!         ok / non-transient error → breaker success, return
//!         transient error          → breaker failure, retry or fallback.get(path)
//! ```
//!
//! The chain is built once, back to front, so every node only ever points at a
//! less preferred peer and the structure cannot contain cycles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use serde::Serialize;
use url::Url;

use crate::beacon::transport::{join_path, Transport};
use crate::beacon::types::{BeaconError, BeaconResult};
use crate::config::ResilienceConfig;
use crate::observability::metrics::{self, AttemptOutcome};
use crate::resilience::{Admission, CircuitBreaker, CircuitState, RetryPolicy, TrialGuard};

/// An outbound call travelling down the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Absolute API path, e.g. `/eth/v2/beacon/blocks/head`.
    pub path: String,
    /// Label of the endpoint this call most recently fell back from.
    pub fallen_back_from: Option<String>,
}

impl Request {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            fallen_back_from: None,
        }
    }
}

/// Next hop of a non-terminal node and the breaker deciding when to take it.
#[derive(Debug)]
struct Fallback {
    breaker: CircuitBreaker,
    node: Arc<ChainNode>,
}

#[derive(Debug, Default)]
struct NodeCounters {
    attempts: AtomicU64,
    failures: AtomicU64,
    fallbacks: AtomicU64,
}

/// Point-in-time view of one endpoint in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointStatus {
    pub endpoint: String,
    pub terminal: bool,
    /// `None` for the terminal node, which has no breaker.
    pub circuit: Option<CircuitState>,
    pub consecutive_failures: u32,
    pub attempts: u64,
    pub failures: u64,
    pub fallbacks: u64,
}

/// One endpoint wrapped with retry and (unless terminal) a circuit breaker.
#[derive(Debug)]
pub struct ChainNode {
    endpoint: Url,
    label: String,
    retry: RetryPolicy,
    fallback: Option<Fallback>,
    transport: Arc<dyn Transport>,
    counters: NodeCounters,
}

impl ChainNode {
    /// Wrap `endpoint`. Passing no fallback makes this the terminal node.
    pub fn new(
        endpoint: Url,
        fallback: Option<Arc<ChainNode>>,
        config: &ResilienceConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let label = redact(&endpoint);
        let retry = RetryPolicy::for_node(config, fallback.is_none());
        let fallback = fallback.map(|node| Fallback {
            breaker: CircuitBreaker::new(
                label.clone(),
                config.failure_threshold,
                Duration::from_secs(config.recovery_timeout_secs),
            ),
            node,
        });

        Self {
            endpoint,
            label,
            retry,
            fallback,
            transport,
            counters: NodeCounters::default(),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Endpoint label safe for logs (no path, query or credentials).
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_terminal(&self) -> bool {
        self.fallback.is_none()
    }

    pub fn next(&self) -> Option<&ChainNode> {
        self.fallback.as_ref().map(|f| f.node.as_ref())
    }

    pub fn circuit_state(&self) -> Option<CircuitState> {
        self.fallback.as_ref().map(|f| f.breaker.state())
    }

    /// This node followed by every node behind it.
    pub fn iter(&self) -> impl Iterator<Item = &ChainNode> {
        std::iter::successors(Some(self), |node| node.next())
    }

    pub fn status(&self) -> EndpointStatus {
        EndpointStatus {
            endpoint: self.label.clone(),
            terminal: self.is_terminal(),
            circuit: self.circuit_state(),
            consecutive_failures: self
                .fallback
                .as_ref()
                .map_or(0, |f| f.breaker.consecutive_failures()),
            attempts: self.counters.attempts.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            fallbacks: self.counters.fallbacks.load(Ordering::Relaxed),
        }
    }

    /// Fetch `request.path`, falling back down the chain on transient failures.
    pub fn get(&self, request: Request) -> BoxFuture<'_, BeaconResult<Bytes>> {
        Box::pin(self.get_inner(request))
    }

    async fn get_inner(&self, request: Request) -> BeaconResult<Bytes> {
        let url = join_path(&self.endpoint, &request.path)?;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut trial = None;
            if let Some(fallback) = &self.fallback {
                match fallback.breaker.try_acquire() {
                    Admission::Rejected => {
                        metrics::record_attempt(&self.label, AttemptOutcome::Rejected);
                        return self.fall_back(fallback, request, "circuit open").await;
                    }
                    Admission::Trial(guard) => trial = Some(guard),
                    Admission::Allowed => {}
                }
            }

            self.counters.attempts.fetch_add(1, Ordering::Relaxed);
            let err = match self.transport.get(&url).await {
                Ok(body) => {
                    self.record_reachable(trial);
                    metrics::record_attempt(&self.label, AttemptOutcome::Success);
                    return Ok(body);
                }
                Err(err) if !err.is_transient() => {
                    // The endpoint answered; the request itself is at fault.
                    self.record_reachable(trial);
                    return Err(err);
                }
                Err(err) => err,
            };

            self.counters.failures.fetch_add(1, Ordering::Relaxed);
            metrics::record_attempt(&self.label, AttemptOutcome::Transient);
            let opened = match trial {
                Some(guard) => guard.fail(),
                None => self
                    .fallback
                    .as_ref()
                    .is_some_and(|f| f.breaker.record_failure()),
            };

            tracing::warn!(
                endpoint = %self.label,
                path = %request.path,
                attempt,
                max_attempts = self.retry.max_attempts,
                error = %err,
                "Beacon request failed"
            );

            if self.retry.should_retry(attempt, &err) {
                if !opened {
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                }
                continue;
            }

            return match &self.fallback {
                Some(fallback) => self.fall_back(fallback, request, "retries exhausted").await,
                None => Err(err),
            };
        }
    }

    async fn fall_back(
        &self,
        fallback: &Fallback,
        request: Request,
        reason: &'static str,
    ) -> BeaconResult<Bytes> {
        let next = fallback.node.as_ref();
        self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
        metrics::record_fallback(&self.label, &next.label);

        tracing::warn!(
            from = %self.label,
            to = %next.label,
            path = %request.path,
            previous = request.fallen_back_from.as_deref().unwrap_or("-"),
            reason,
            "Falling back to next beacon endpoint"
        );

        next.get(Request {
            fallen_back_from: Some(self.label.clone()),
            ..request
        })
        .await
    }

    fn record_reachable(&self, trial: Option<TrialGuard<'_>>) {
        match (trial, &self.fallback) {
            (Some(guard), _) => guard.succeed(),
            (None, Some(fallback)) => fallback.breaker.record_success(),
            (None, None) => {}
        }
    }
}

/// Build the chain for `endpoints` (most preferred first) and return its head.
///
/// The last endpoint becomes the terminal node; every earlier endpoint is wrapped
/// around the node built before it.
pub fn build_chain(
    endpoints: &[Url],
    config: &ResilienceConfig,
    transport: Arc<dyn Transport>,
) -> BeaconResult<Arc<ChainNode>> {
    let (last, rest) = endpoints.split_last().ok_or(BeaconError::NoEndpoints)?;
    let terminal = Arc::new(ChainNode::new(last.clone(), None, config, transport.clone()));

    let head = rest.iter().rev().fold(terminal, |fallback, endpoint| {
        Arc::new(ChainNode::new(
            endpoint.clone(),
            Some(fallback),
            config,
            transport.clone(),
        ))
    });
    Ok(head)
}

/// `scheme://host[:port]`, with a marker when a path or query was dropped.
/// Provider URLs often carry API keys in the path.
fn redact(url: &Url) -> String {
    let mut label = format!("{}://{}", url.scheme(), url.host_str().unwrap_or("?"));
    if let Some(port) = url.port() {
        label.push_str(&format!(":{port}"));
    }
    if url.path() != "/" || url.query().is_some() {
        label.push_str("/…");
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::testing::{Behaviour, ScriptedTransport};
    use tokio::sync::Notify;
    use tracing_test::traced_test;

    fn urls(hosts: &[&str]) -> Vec<Url> {
        hosts
            .iter()
            .map(|h| Url::parse(&format!("http://{h}:5052")).unwrap())
            .collect()
    }

    fn fast_config() -> ResilienceConfig {
        ResilienceConfig {
            base_delay_ms: 0,
            ..ResilienceConfig::default()
        }
    }

    fn chain(hosts: &[&str], config: &ResilienceConfig) -> (Arc<ChainNode>, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::default());
        let head = build_chain(&urls(hosts), config, transport.clone()).unwrap();
        (head, transport)
    }

    const PATH: &str = "/eth/v2/beacon/blocks/head";

    #[test]
    fn test_build_chain_structure() {
        let (head, _) = chain(&["a", "b", "c"], &fast_config());
        let labels: Vec<_> = head.iter().map(|n| n.label().to_string()).collect();
        assert_eq!(labels, ["http://a:5052", "http://b:5052", "http://c:5052"]);

        let terminal = head.iter().last().unwrap();
        assert!(terminal.is_terminal());
        assert_eq!(terminal.circuit_state(), None);
        assert_eq!(head.circuit_state(), Some(CircuitState::Closed));
        assert!(head.iter().take(2).all(|n| !n.is_terminal()));
    }

    #[test]
    fn test_build_chain_requires_endpoints() {
        let transport = Arc::new(ScriptedTransport::default());
        let err = build_chain(&[], &fast_config(), transport).unwrap_err();
        assert!(matches!(err, BeaconError::NoEndpoints));
    }

    fn spawn_get(head: &Arc<ChainNode>) -> tokio::task::JoinHandle<BeaconResult<Bytes>> {
        let head = head.clone();
        tokio::spawn(async move { head.get(Request::new(PATH)).await })
    }

    async fn wait_for_calls(transport: &ScriptedTransport, host: &str, n: usize) {
        while transport.calls(host) < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_falls_back_to_last_healthy_endpoint() {
        let (head, transport) = chain(&["a", "b", "c"], &fast_config());
        transport.set("a", Behaviour::Status(503));
        transport.set("b", Behaviour::Refuse);
        transport.set("c", Behaviour::Body(r#"{"served_by":"c"}"#));

        let body = head.get(Request::new(PATH)).await.unwrap();
        assert_eq!(&body[..], br#"{"served_by":"c"}"#);

        assert!(transport.calls("a") <= 2);
        assert!(transport.calls("b") <= 2);
        assert_eq!(transport.calls("c"), 1);
        assert!(transport.total_calls() <= 5);

        let fallbacks: u64 = head.iter().map(|n| n.status().fallbacks).sum();
        assert_eq!(fallbacks, 2);

        logs_assert(|lines: &[&str]| {
            let hops: Vec<_> = lines
                .iter()
                .filter(|line| line.contains("Falling back to next beacon endpoint"))
                .collect();
            match hops.as_slice() {
                [first, second]
                    if first.contains("from=http://a:5052") && second.contains("from=http://b:5052") =>
                {
                    Ok(())
                }
                _ => Err(format!("expected a→b and b→c fallback events, got {hops:?}")),
            }
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_endpoint_fails_after_one_attempt() {
        let (head, transport) = chain(&["solo"], &fast_config());
        transport.set("solo", Behaviour::Refuse);

        let err = head.get(Request::new(PATH)).await.unwrap_err();
        assert!(matches!(err, BeaconError::Connect(_)));
        assert_eq!(transport.calls("solo"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_chain_returns_terminal_error() {
        let (head, transport) = chain(&["a", "b", "c"], &fast_config());
        transport.set("a", Behaviour::Status(503));
        transport.set("b", Behaviour::Status(500));
        transport.set("c", Behaviour::Status(502));

        let err = head.get(Request::new(PATH)).await.unwrap_err();
        assert!(matches!(err, BeaconError::Status { status: 502, .. }), "{err}");
        assert_eq!(transport.calls("c"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_error_skips_retry_and_fallback() {
        let (head, transport) = chain(&["a", "b"], &fast_config());
        transport.set("a", Behaviour::Status(404));
        transport.set("b", Behaviour::Body("{}"));

        let err = head.get(Request::new(PATH)).await.unwrap_err();
        assert!(matches!(err, BeaconError::Status { status: 404, .. }));
        assert_eq!(transport.calls("a"), 1);
        assert_eq!(transport.calls("b"), 0);
        assert_eq!(head.circuit_state(), Some(CircuitState::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_relative_path_rejected_before_any_call() {
        let (head, transport) = chain(&["a", "b"], &fast_config());
        let err = head.get(Request::new("eth/v1/node/version")).await.unwrap_err();
        assert!(matches!(err, BeaconError::InvalidRequest(_)));
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_skips_endpoint_until_recovery() {
        let (head, transport) = chain(&["a", "b"], &fast_config());
        transport.set("a", Behaviour::Status(503));
        transport.set("b", Behaviour::Body("{}"));

        head.get(Request::new(PATH)).await.unwrap();
        assert_eq!(transport.calls("a"), 1);
        assert_eq!(head.circuit_state(), Some(CircuitState::Open));

        // Within the recovery window the failed endpoint is never touched.
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(4)).await;
            head.get(Request::new(PATH)).await.unwrap();
        }
        assert_eq!(transport.calls("a"), 1);
        assert_eq!(transport.calls("b"), 4);

        // Recovery window elapsed: one trial call, success closes the circuit.
        transport.set("a", Behaviour::Body(r#"{"served_by":"a"}"#));
        tokio::time::advance(Duration::from_secs(3)).await;
        let body = head.get(Request::new(PATH)).await.unwrap();
        assert_eq!(&body[..], br#"{"served_by":"a"}"#);
        assert_eq!(transport.calls("a"), 2);
        assert_eq!(head.circuit_state(), Some(CircuitState::Closed));

        head.get(Request::new(PATH)).await.unwrap();
        assert_eq!(transport.calls("a"), 3);
        assert_eq!(transport.calls("b"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trial_reopens_circuit() {
        let (head, transport) = chain(&["a", "b"], &fast_config());
        transport.set("a", Behaviour::Refuse);
        transport.set("b", Behaviour::Body("{}"));

        head.get(Request::new(PATH)).await.unwrap();
        tokio::time::advance(Duration::from_secs(15)).await;
        assert_eq!(head.circuit_state(), Some(CircuitState::HalfOpen));

        head.get(Request::new(PATH)).await.unwrap();
        assert_eq!(transport.calls("a"), 2);
        assert_eq!(head.circuit_state(), Some(CircuitState::Open));
        assert_eq!(transport.calls("b"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_trial_keeps_slot_past_recovery_timeout() {
        let (head, transport) = chain(&["a", "b"], &fast_config());
        transport.set("a", Behaviour::Refuse);
        transport.set("b", Behaviour::Body("{}"));
        head.get(Request::new(PATH)).await.unwrap();

        tokio::time::advance(Duration::from_secs(15)).await;
        let release = Arc::new(Notify::new());
        transport.set("a", Behaviour::Hold(release.clone(), r#"{"served_by":"a"}"#));
        let trial = spawn_get(&head);
        wait_for_calls(&transport, "a", 2).await;

        // The trial is still hanging well after another recovery timeout.
        tokio::time::advance(Duration::from_secs(16)).await;
        head.get(Request::new(PATH)).await.unwrap();
        assert_eq!(transport.calls("a"), 2);
        assert_eq!(transport.calls("b"), 2);
        assert_eq!(head.circuit_state(), Some(CircuitState::HalfOpen));

        release.notify_one();
        let body = trial.await.unwrap().unwrap();
        assert_eq!(&body[..], br#"{"served_by":"a"}"#);
        assert_eq!(head.circuit_state(), Some(CircuitState::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_success_leaves_circuit_open() {
        let (head, transport) = chain(&["a", "b"], &fast_config());
        let release = Arc::new(Notify::new());
        transport.set("a", Behaviour::Hold(release.clone(), "{}"));
        transport.set("b", Behaviour::Body(r#"{"served_by":"b"}"#));

        // Admitted while closed, answers after the circuit has opened.
        let slow = spawn_get(&head);
        wait_for_calls(&transport, "a", 1).await;

        transport.set("a", Behaviour::Status(503));
        let body = head.get(Request::new(PATH)).await.unwrap();
        assert_eq!(&body[..], br#"{"served_by":"b"}"#);
        assert_eq!(head.circuit_state(), Some(CircuitState::Open));

        release.notify_one();
        slow.await.unwrap().unwrap();
        assert_eq!(head.circuit_state(), Some(CircuitState::Open));

        head.get(Request::new(PATH)).await.unwrap();
        assert_eq!(transport.calls("a"), 2);
        assert_eq!(transport.calls("b"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_higher_threshold_retries_before_fallback() {
        let config = ResilienceConfig {
            failure_threshold: 3,
            ..fast_config()
        };
        let (head, transport) = chain(&["a", "b"], &config);
        transport.set("a", Behaviour::Status(503));
        transport.set("b", Behaviour::Body("{}"));

        head.get(Request::new(PATH)).await.unwrap();
        assert_eq!(transport.calls("a"), 2);
        assert_eq!(head.circuit_state(), Some(CircuitState::Closed));
        assert_eq!(head.status().consecutive_failures, 2);

        head.get(Request::new(PATH)).await.unwrap();
        assert_eq!(transport.calls("a"), 3);
        assert_eq!(head.circuit_state(), Some(CircuitState::Open));
    }

    #[test]
    fn test_redact_hides_credentials() {
        let url = Url::parse("https://user:pw@eth-mainnet.example.io/v2/SECRET?key=1").unwrap();
        assert_eq!(redact(&url), "https://eth-mainnet.example.io/…");
        let url = Url::parse("http://10.0.0.2:5052/").unwrap();
        assert_eq!(redact(&url), "http://10.0.0.2:5052");
    }
}
