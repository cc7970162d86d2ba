//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use outbound_resilience::{
    RequestDescriptor, ResilientClient, ResilientClientBuilder, Response, RetryPolicy, Transport,
    TransportError, TransportErrorCode,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted transport outcome.
#[derive(Debug, Clone)]
pub enum Step {
    Status(u16),
    Fail(TransportErrorCode),
    /// Never completes; only the client's deadline or cancellation ends it.
    Hang,
    /// Completes after the given delay with the given status.
    Slow(Duration, u16),
}

/// Replays `steps` in order; the last step repeats once the script runs out.
pub struct ScriptedTransport {
    steps: Mutex<Vec<Step>>,
    calls: Mutex<Vec<RequestDescriptor>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn statuses(codes: &[u16]) -> Arc<Self> {
        Self::new(codes.iter().map(|c| Step::Status(*c)))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.calls.lock().unwrap().clone()
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.remove(0)
        } else {
            steps.first().cloned().unwrap_or(Step::Status(200))
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: &RequestDescriptor,
        _deadline: Duration,
    ) -> Result<Response, TransportError> {
        self.calls.lock().unwrap().push(request.clone());
        match self.next_step() {
            Step::Status(code) => Ok(Response::new(code, HashMap::new(), format!("status {code}"))),
            Step::Fail(code) => Err(TransportError::new(code, "scripted transport failure")),
            Step::Hang => std::future::pending().await,
            Step::Slow(delay, code) => {
                tokio::time::sleep(delay).await;
                Ok(Response::new(code, HashMap::new(), "slow"))
            }
        }
    }
}

/// Policy with deterministic, short delays: 100ms, 200ms, 400ms, ... capped at 1s.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::default()
        .with_jitter(false)
        .with_base_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_millis(1_000))
        .with_timeout(Duration::from_millis(500))
}

pub fn client(transport: Arc<ScriptedTransport>, policy: RetryPolicy) -> ResilientClient {
    ResilientClientBuilder::new()
        .transport(transport)
        .policy(policy)
        .build()
        .expect("valid policy")
}

pub fn request() -> RequestDescriptor {
    RequestDescriptor::post("https://webhooks.partner.test/orders")
        .expect("valid url")
        .with_body(r#"{"order":1042}"#)
}
