//! `HttpTransport` driven end to end against a local mock HTTP server.

use mockito::Server;
use outbound_resilience::{
    ErrorKind, HttpTransport, Method, PolicyOverrides, RequestDescriptor, ResilientClient,
    ResilientClientBuilder, RetryPolicy,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn client() -> ResilientClient {
    ResilientClientBuilder::new()
        .transport(Arc::new(HttpTransport::new().unwrap()))
        .policy(
            RetryPolicy::default()
                .with_jitter(false)
                .with_base_delay(Duration::from_millis(10))
                .with_max_delay(Duration::from_millis(50))
                .with_timeout(Duration::from_secs(5)),
        )
        .build()
        .unwrap()
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct StockLevel {
    sku: String,
    on_hand: u32,
}

#[tokio::test]
async fn server_errors_are_retried_until_exhausted() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/charges")
        .with_status(500)
        .with_body("gateway unavailable")
        .expect(3)
        .create_async()
        .await;

    let request = RequestDescriptor::post(&format!("{}/v1/charges", server.url())).unwrap();
    let err = client()
        .request(request, PolicyOverrides::new().with_max_retries(2))
        .await
        .unwrap_err();

    assert_eq!(err.attempts(), 3);
    assert_eq!(err.status_code(), Some(500));
    assert!(!err.is_timeout());
    mock.assert_async().await;
}

#[tokio::test]
async fn json_round_trip_with_correlation_header() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/v1/stock/SKU-1")
        .match_header("content-type", "application/json")
        .match_header("x-outbound-request-id", mockito::Matcher::Regex("^[0-9a-f-]{36}$".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sku":"SKU-1","on_hand":12}"#)
        .create_async()
        .await;

    let request = RequestDescriptor::json(
        Method::Put,
        &format!("{}/v1/stock/SKU-1", server.url()),
        &StockLevel {
            sku: "SKU-1".into(),
            on_hand: 12,
        },
    )
    .unwrap();
    let resp = client().request(request, PolicyOverrides::new()).await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.header("Content-Type"), Some("application/json"));
    assert_eq!(
        resp.json::<StockLevel>().unwrap(),
        StockLevel {
            sku: "SKU-1".into(),
            on_hand: 12
        }
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/mail/send")
        .with_status(422)
        .with_body(r#"{"error":"invalid recipient"}"#)
        .expect(1)
        .create_async()
        .await;

    let request = RequestDescriptor::post(&format!("{}/v3/mail/send", server.url())).unwrap();
    let err = client()
        .request(request, PolicyOverrides::new())
        .await
        .unwrap_err();

    assert_eq!(err.attempts(), 1);
    assert_eq!(err.kind(), ErrorKind::Client);
    mock.assert_async().await;
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
    let request = RequestDescriptor::get("http://127.0.0.1:1/health").unwrap();
    let err = client()
        .request(request, PolicyOverrides::new().with_max_retries(1))
        .await
        .unwrap_err();

    assert!(err.is_network_error());
    assert_eq!(err.attempts(), 2);
    assert_eq!(err.status_code(), None);
}

#[tokio::test]
async fn slow_response_times_out() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/slow")
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_millis(400));
            w.write_all(b"late")
        })
        .create_async()
        .await;

    let request = RequestDescriptor::get(&format!("{}/slow", server.url())).unwrap();
    let err = client()
        .request(
            request,
            PolicyOverrides::new()
                .with_timeout(Duration::from_millis(100))
                .with_max_retries(0),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(err.attempts(), 1);
}
