//! Benchmarks for the retry hot path
//!
//! This benchmark measures:
//! - Backoff calculation with and without jitter
//! - Error classification of transport failures and statuses
//! - One successful logical call through the client (in-memory transport)

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use outbound_resilience::{
    BackoffCalculator, ErrorClassifier, PolicyOverrides, RawFailure, RequestDescriptor, ResilientClientBuilder,
    Response, RetryPolicy, SeededRandom, Transport, TransportError, TransportErrorCode,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn bench_backoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("backoff_delay");

    let plain = RetryPolicy::default().with_jitter(false);
    let jittered = RetryPolicy::default().with_random(SeededRandom::new(7));

    for attempt in [1u32, 4, 16, 64] {
        group.bench_with_input(BenchmarkId::new("no_jitter", attempt), &attempt, |b, &n| {
            b.iter(|| BackoffCalculator::new(&plain).delay(black_box(n)))
        });
        group.bench_with_input(BenchmarkId::new("equal_jitter", attempt), &attempt, |b, &n| {
            b.iter(|| BackoffCalculator::new(&jittered).delay(black_box(n)))
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let classifier = ErrorClassifier::default();
    let timeout = Duration::from_millis(30_000);
    let reset = RawFailure::Transport(TransportError::new(
        TransportErrorCode::ConnectionReset,
        "connection reset by peer",
    ));
    let unavailable = RawFailure::Status(Response::new(503, HashMap::new(), "maintenance"));

    c.bench_function("classify_transport_error", |b| {
        b.iter(|| classifier.classify(black_box(&reset), Duration::from_millis(12), timeout))
    });
    c.bench_function("classify_status", |b| {
        b.iter(|| classifier.classify(black_box(&unavailable), Duration::from_millis(12), timeout))
    });
}

struct AlwaysOk;

#[async_trait]
impl Transport for AlwaysOk {
    async fn send(
        &self,
        _request: &RequestDescriptor,
        _deadline: Duration,
    ) -> Result<Response, TransportError> {
        Ok(Response::new(200, HashMap::new(), "ok"))
    }
}

fn bench_client_success(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let client = ResilientClientBuilder::new()
        .transport(Arc::new(AlwaysOk))
        .build()
        .expect("client");

    c.bench_function("client_request_success", |b| {
        b.to_async(&rt).iter(|| async {
            let request = RequestDescriptor::get("https://inventory.partner.test/v1/stock")
                .expect("request");
            client
                .request(request, PolicyOverrides::new())
                .await
                .expect("response")
        })
    });
}

criterion_group!(benches, bench_backoff, bench_classify, bench_client_success);
criterion_main!(benches);
