//! Resolver integration tests
//!
//! Providers are replaced by in-process mocks so timing, call counts and
//! failures can be controlled precisely.

use async_trait::async_trait;
use pvr_common::Error;
use pvr_vr::valuation::providers::{attom, build_http_client, rentcast};
use pvr_vr::valuation::{
    AttomClient, ProviderKind, ProviderMode, ProviderResult, RentcastClient, ResolveError, Trace,
    ValuationAttempt, ValuationProvider, ValuationResolver, ValueSource,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADDRESS: &str = "1 Main St, Springfield";

/// Provider answering with a fixed value after an optional delay
struct FixedProvider {
    kind: ProviderKind,
    value: Option<f64>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FixedProvider {
    fn new(kind: ProviderKind, value: Option<f64>) -> Arc<Self> {
        Self::delayed(kind, value, Duration::ZERO)
    }

    fn delayed(kind: ProviderKind, value: Option<f64>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            kind,
            value,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ValuationProvider for FixedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn lookup(&self, address: &str, trace: &mut Trace) -> ProviderResult {
        assert_eq!(address, ADDRESS, "address must be forwarded verbatim");
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        trace.push(ValuationAttempt::response(
            format!("{}:mock", self.kind),
            200,
            true,
            self.value,
        ));

        ProviderResult {
            value: self.value,
            source: self.value.map(|_| ValueSource::Avm),
            identifier: None,
            upstream_status: Some(json!({ "code": 200 })),
        }
    }
}

/// Provider whose task dies mid-lookup
struct PanickingProvider(ProviderKind);

#[async_trait]
impl ValuationProvider for PanickingProvider {
    fn kind(&self) -> ProviderKind {
        self.0
    }

    async fn lookup(&self, _address: &str, _trace: &mut Trace) -> ProviderResult {
        panic!("simulated adapter crash");
    }
}

fn resolver(
    attom: Arc<dyn ValuationProvider>,
    rentcast: Arc<dyn ValuationProvider>,
) -> ValuationResolver {
    ValuationResolver::new(attom, rentcast).expect("Should build resolver")
}

fn steps(trace: &Trace) -> Vec<&str> {
    trace.attempts().iter().map(|a| a.step.as_str()).collect()
}

fn has_step_prefix(trace: &Trace, prefix: &str) -> bool {
    trace.attempts().iter().any(|a| a.step.starts_with(prefix))
}

#[tokio::test]
async fn test_auto_prefers_attom_even_when_slower() {
    let attom = FixedProvider::delayed(
        ProviderKind::Attom,
        Some(300000.0),
        Duration::from_millis(100),
    );
    let rentcast = FixedProvider::new(ProviderKind::Rentcast, Some(275000.0));
    let resolver = resolver(attom.clone(), rentcast.clone());

    let result = resolver
        .resolve(ADDRESS, ProviderMode::Auto)
        .await
        .expect("Should resolve");

    assert_eq!(result.resolved_provider, Some(ProviderKind::Attom));
    assert_eq!(result.value, Some(300000.0));
    assert_eq!(result.market_value, Some(300000.0));
    assert_eq!(result.values.attom, Some(300000.0));
    assert_eq!(result.values.rentcast, Some(275000.0));

    // ATTOM entries come first regardless of completion order
    assert_eq!(steps(&result.tried), vec!["attom:mock", "rentcast:mock"]);
    assert_eq!(attom.calls(), 1);
    assert_eq!(rentcast.calls(), 1);
}

#[tokio::test]
async fn test_auto_runs_providers_concurrently() {
    let delay = Duration::from_millis(300);
    let attom = FixedProvider::delayed(ProviderKind::Attom, Some(1.0), delay);
    let rentcast = FixedProvider::delayed(ProviderKind::Rentcast, Some(2.0), delay);
    let resolver = resolver(attom, rentcast);

    let started = std::time::Instant::now();
    resolver
        .resolve(ADDRESS, ProviderMode::Auto)
        .await
        .expect("Should resolve");

    // Sequential execution would take at least twice the delay
    assert!(started.elapsed() < delay * 2, "took {:?}", started.elapsed());
}

#[tokio::test]
async fn test_auto_falls_back_to_rentcast_without_attom_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/avm/value"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "price": 275000 })))
        .expect(1)
        .mount(&server)
        .await;

    let http = build_http_client(Duration::from_secs(5)).expect("Should build HTTP client");
    let resolver = resolver(
        Arc::new(AttomClient::new(http.clone(), "http://127.0.0.1:1", None)),
        Arc::new(RentcastClient::new(
            http,
            server.uri(),
            Some("test-key".to_string()),
        )),
    );

    let result = resolver
        .resolve(ADDRESS, ProviderMode::Auto)
        .await
        .expect("Should resolve");

    assert_eq!(result.resolved_provider, Some(ProviderKind::Rentcast));
    assert_eq!(result.value, Some(275000.0));
    assert_eq!(result.values.attom, None);
    assert_eq!(result.attom_id, None);
    assert_eq!(result.attom_source, None);
    assert_eq!(
        steps(&result.tried),
        vec![attom::STEP_MISSING_KEY, rentcast::STEP_AVM_VALUE]
    );
}

#[tokio::test]
async fn test_auto_both_empty() {
    let attom = FixedProvider::new(ProviderKind::Attom, None);
    let rentcast = FixedProvider::new(ProviderKind::Rentcast, None);
    let resolver = resolver(attom, rentcast);

    let result = resolver
        .resolve(ADDRESS, ProviderMode::Auto)
        .await
        .expect("Should resolve");

    assert_eq!(result.resolved_provider, None);
    assert_eq!(result.value, None);
    assert_eq!(result.market_value, None);
    assert!(has_step_prefix(&result.tried, "attom:"));
    assert!(has_step_prefix(&result.tried, "rentcast:"));
}

#[tokio::test]
async fn test_explicit_mode_invokes_only_requested_provider() {
    let attom = FixedProvider::new(ProviderKind::Attom, Some(300000.0));
    let rentcast = FixedProvider::new(ProviderKind::Rentcast, None);
    let resolver = resolver(attom.clone(), rentcast.clone());

    let result = resolver
        .resolve(ADDRESS, ProviderMode::Rentcast)
        .await
        .expect("Should resolve");

    // Requested provider is reported even without a value
    assert_eq!(result.requested_mode, ProviderMode::Rentcast);
    assert_eq!(result.resolved_provider, Some(ProviderKind::Rentcast));
    assert_eq!(result.value, None);
    assert_eq!(result.values.attom, None);
    assert_eq!(result.status.attom, None);
    assert!(!has_step_prefix(&result.tried, "attom:"));

    assert_eq!(attom.calls(), 0);
    assert_eq!(rentcast.calls(), 1);
}

#[tokio::test]
async fn test_explicit_attom_mode() {
    let attom = FixedProvider::new(ProviderKind::Attom, Some(300000.0));
    let rentcast = FixedProvider::new(ProviderKind::Rentcast, Some(275000.0));
    let resolver = resolver(attom.clone(), rentcast.clone());

    let result = resolver
        .resolve(ADDRESS, ProviderMode::Attom)
        .await
        .expect("Should resolve");

    assert_eq!(result.resolved_provider, Some(ProviderKind::Attom));
    assert_eq!(result.value, Some(300000.0));
    assert_eq!(result.values.rentcast, None);
    assert_eq!(rentcast.calls(), 0);
}

#[tokio::test]
async fn test_blank_address_makes_no_calls() {
    let attom = FixedProvider::new(ProviderKind::Attom, Some(1.0));
    let rentcast = FixedProvider::new(ProviderKind::Rentcast, Some(1.0));
    let resolver = resolver(attom.clone(), rentcast.clone());

    for address in ["", "   "] {
        let err = resolver
            .resolve(address, ProviderMode::Auto)
            .await
            .expect_err("Blank address should be rejected");
        assert!(matches!(err, ResolveError::EmptyAddress));
    }

    assert_eq!(attom.calls(), 0);
    assert_eq!(rentcast.calls(), 0);
}

#[tokio::test]
async fn test_crashed_attom_task_does_not_block_rentcast() {
    let rentcast = FixedProvider::new(ProviderKind::Rentcast, Some(275000.0));
    let resolver = resolver(Arc::new(PanickingProvider(ProviderKind::Attom)), rentcast);

    let result = resolver
        .resolve(ADDRESS, ProviderMode::Auto)
        .await
        .expect("One surviving provider is enough");

    assert_eq!(result.resolved_provider, Some(ProviderKind::Rentcast));
    assert_eq!(result.value, Some(275000.0));
    assert_eq!(steps(&result.tried), vec!["attom:error", "rentcast:mock"]);

    let crash = &result.tried.attempts()[0];
    assert!(!crash.ok);
    assert!(crash
        .message
        .as_deref()
        .is_some_and(|m| m.starts_with("provider task failed")));
}

#[tokio::test]
async fn test_all_tasks_crashed_is_internal_error() {
    let resolver = resolver(
        Arc::new(PanickingProvider(ProviderKind::Attom)),
        Arc::new(PanickingProvider(ProviderKind::Rentcast)),
    );

    let err = resolver
        .resolve(ADDRESS, ProviderMode::Auto)
        .await
        .expect_err("Should fail");
    assert!(matches!(err, ResolveError::Internal(_)));

    let err = resolver
        .resolve(ADDRESS, ProviderMode::Attom)
        .await
        .expect_err("Should fail");
    assert!(matches!(err, ResolveError::Internal(_)));
}

#[tokio::test]
async fn test_envelope_serialization() {
    let attom = FixedProvider::new(ProviderKind::Attom, Some(300000.0));
    let rentcast = FixedProvider::new(ProviderKind::Rentcast, None);
    let resolver = resolver(attom, rentcast);

    let result = resolver
        .resolve(ADDRESS, ProviderMode::Auto)
        .await
        .expect("Should resolve");
    let json = serde_json::to_value(&result).expect("Should serialize");

    assert_eq!(json["address"], ADDRESS);
    assert_eq!(json["provider"], "auto");
    assert_eq!(json["resolvedProvider"], "attom");
    assert_eq!(json["value"], 300000.0);
    assert_eq!(json["marketValue"], 300000.0);
    assert_eq!(json["values"], json!({ "attom": 300000.0, "rentcast": null }));
    assert_eq!(json["attomId"], serde_json::Value::Null);
    assert_eq!(json["attomSource"], "avm");
    assert_eq!(json["status"]["attom"], json!({ "code": 200 }));

    let tried = json["tried"].as_array().expect("tried should be an array");
    assert_eq!(tried.len(), 2);
    assert_eq!(tried[0]["step"], "attom:mock");
    assert_eq!(tried[0]["httpStatus"], 200);
    assert_eq!(tried[0]["extractedValue"], 300000.0);
    // Every entry has the same set of keys
    assert_eq!(tried[0]["identifier"], serde_json::Value::Null);
    for entry in tried {
        let mut keys: Vec<&str> = entry
            .as_object()
            .expect("entry should be an object")
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["extractedValue", "httpStatus", "identifier", "message", "ok", "step"]
        );
    }
}

#[test]
fn test_providers_in_wrong_slots_are_rejected() {
    let attom = FixedProvider::new(ProviderKind::Attom, Some(1.0));
    let rentcast = FixedProvider::new(ProviderKind::Rentcast, Some(2.0));

    let result = ValuationResolver::new(rentcast.clone(), attom.clone());
    assert!(matches!(result, Err(Error::Config(_))));

    let result = ValuationResolver::new(attom.clone(), attom);
    assert!(matches!(result, Err(Error::Config(_))));

    assert_eq!(rentcast.calls(), 0);
}

#[tokio::test]
async fn test_crashed_task_labelled_by_provider_kind() {
    let attom = FixedProvider::new(ProviderKind::Attom, Some(300000.0));
    let resolver = resolver(attom, Arc::new(PanickingProvider(ProviderKind::Rentcast)));

    let result = resolver
        .resolve(ADDRESS, ProviderMode::Auto)
        .await
        .expect("One surviving provider is enough");

    assert_eq!(result.resolved_provider, Some(ProviderKind::Attom));
    assert_eq!(steps(&result.tried), vec!["attom:mock", "rentcast:error"]);
}
