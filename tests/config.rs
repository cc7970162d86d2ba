//! Loading client configuration from YAML files and building clients from it.

mod common;

use common::{request, ScriptedTransport};
use outbound_resilience::{
    ClientConfig, CircuitState, ErrorKind, PolicyOverrides, ResilientClientBuilder,
};
use std::time::Duration;

const CONFIG: &str = r#"
retry:
  timeoutMs: 2000
  maxRetries: 1
  retryDelay: 250
  maxRetryDelay: 1000
  enableJitter: false
  retryStatusCodes: [503]
breaker:
  failureThreshold: 2
  resetTimeout: 15000
"#;

#[test]
fn loads_yaml_from_disk() {
    let path = std::env::temp_dir().join(format!("outbound-config-{}.yaml", std::process::id()));
    std::fs::write(&path, CONFIG).unwrap();
    let cfg = ClientConfig::from_path(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let policy = cfg.retry_policy();
    assert_eq!(policy.timeout, Duration::from_millis(2_000));
    assert_eq!(policy.max_retries, 1);
    assert_eq!(policy.base_delay, Duration::from_millis(250));
    assert!(!policy.jitter);
    assert!(policy.retryable_status_codes.contains(&503));
    assert!(!policy.retryable_status_codes.contains(&500));

    let breaker = cfg.breaker_config();
    assert_eq!(breaker.failure_threshold, 2);
    assert_eq!(breaker.reset_timeout, Duration::from_secs(15));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = ClientConfig::from_path("/nonexistent/outbound.yaml").unwrap_err();
    assert!(matches!(err, outbound_resilience::Error::Io(_)));
}

#[test]
fn invalid_policy_is_rejected_at_build() {
    let cfg = ClientConfig::from_yaml_str("retry:\n  retryDelay: 5000\n  maxRetryDelay: 100\n").unwrap();
    let err = ResilientClientBuilder::new()
        .transport(ScriptedTransport::statuses(&[200]))
        .config(&cfg)
        .build()
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(
        err.context().and_then(|c| c.field_path.as_deref()),
        Some("policy.base_delay")
    );
}

#[tokio::test(start_paused = true)]
async fn configured_client_applies_policy_and_breakers() {
    let cfg = ClientConfig::from_yaml_str(CONFIG).unwrap();
    let transport = ScriptedTransport::statuses(&[500]);
    let client = ResilientClientBuilder::new()
        .transport(transport.clone())
        .config(&cfg)
        .build()
        .unwrap();

    // 500 is not in the configured status set: one attempt per call.
    for _ in 0..2 {
        let err = client
            .request(request(), PolicyOverrides::new())
            .await
            .unwrap_err();
        assert_eq!(err.attempts(), 1);
    }

    let registry = client.breakers().unwrap();
    let snapshot = &registry.snapshots()[0];
    assert_eq!(snapshot.state, CircuitState::Open);
    assert_eq!(snapshot.failure_threshold, 2);
    assert_eq!(snapshot.open_remaining_ms, Some(15_000));
    assert_eq!(transport.call_count(), 2);
}

#[test]
fn disabled_breaker_section_installs_no_registry() {
    let cfg = ClientConfig::from_yaml_str("breaker:\n  enabled: false\n").unwrap();
    let client = ResilientClientBuilder::new()
        .transport(ScriptedTransport::statuses(&[200]))
        .config(&cfg)
        .build()
        .unwrap();
    assert!(client.breakers().is_none());
}
