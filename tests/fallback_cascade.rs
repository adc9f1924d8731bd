use std::{sync::Arc, time::Duration};

use kisan::{
    advisor::{Advisor, AdvisorSettings, PriceQuery},
    external::DataApiClient,
    fallback::{payload_len, EndpointQuery, FallbackRequest, FallbackResolver, OriginSource, StoreQuery},
    store::{Filter, JsonStore},
};
use serde_json::{json, Value};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

/// Serves `body` for any request whose request line contains `needle`, and an
/// empty `data` array otherwise. Returns the base URL.
async fn canned_api(needle: &'static str, body: Value) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { return };
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let mut read = 0;
                while read < buf.len() {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => read += n,
                    }
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let head = String::from_utf8_lossy(&buf[..read]);
                let request_line = head.lines().next().unwrap_or_default();
                let payload = if request_line.contains(needle) { body } else { json!({"data": []}).to_string() };
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    payload.len(),
                    payload
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

fn client(base: &str) -> DataApiClient {
    DataApiClient::new(base, None, Duration::from_secs(5)).unwrap()
}

fn empty_store() -> (tempfile::TempDir, Arc<JsonStore>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, r#"{"market_prices": [], "schemes": []}"#).unwrap();
    (dir, Arc::new(JsonStore::new(path)))
}

#[tokio::test]
async fn external_api_answers_when_store_is_empty() {
    let base = canned_api(
        "crop=Onion",
        json!({"data": [
            {"market": "Lasalgaon", "crop": "Onion", "modal_price": 2300},
            {"market": "Pimpalgaon", "crop": "Onion", "modal_price": 2250}
        ]}),
    )
    .await;
    let (_dir, store) = empty_store();

    let advisor = Advisor::new(store, AdvisorSettings::default()).with_api(client(&base));
    let result = advisor.market_prices(&PriceQuery::new("Onion").in_state("Maharashtra")).await;

    assert!(result.succeeded());
    assert_eq!(result.origin(), OriginSource::ExternalApi);
    assert_eq!(result.payload().map(payload_len), Some(2));
}

#[tokio::test]
async fn empty_envelope_means_no_data() {
    let base = canned_api("never-matches", json!({})).await;
    let (_dir, store) = empty_store();

    let advisor = Advisor::new(store, AdvisorSettings::default()).with_api(client(&base));
    let result = advisor.market_prices(&PriceQuery::new("Onion")).await;

    assert!(!result.succeeded());
    assert_eq!(result.origin(), OriginSource::None);
    assert!(result.payload().is_none());
}

#[tokio::test]
async fn custom_result_path_is_followed() {
    let base = canned_api("/v2/records", json!({"result": {"records": [{"scheme": "PMKSY"}]}})).await;

    let req = FallbackRequest::new()
        .endpoint(EndpointQuery::new(client(&base), "v2/records").result_path("result.records"));
    let result = FallbackResolver::resolve(&req).await;
    assert_eq!(result.origin(), OriginSource::ExternalApi);
    assert_eq!(result.into_payload(), Some(json!([{"scheme": "PMKSY"}])));
}

#[tokio::test]
async fn unreachable_api_is_declined_not_raised() {
    // Bind then drop to get a port nobody listens on.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (_dir, store) = empty_store();

    let req = FallbackRequest::new()
        .primary(|| async { Err::<Value, _>(kisan::Error::Model("model offline".into())) })
        .store(StoreQuery::new(store, "market_prices", Filter::new()))
        .endpoint(EndpointQuery::new(client(&format!("http://{addr}")), "prices"));
    let result = FallbackResolver::resolve(&req).await;
    assert!(!result.succeeded());
    assert_eq!(result.origin(), OriginSource::None);
}

#[tokio::test]
async fn store_is_tried_before_external_api_regardless_of_insertion_order() {
    let base = canned_api("prices", json!({"data": [{"market": "remote"}]})).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, json!({"market_prices": [{"market": "local"}]}).to_string()).unwrap();

    let req = FallbackRequest::new()
        .endpoint(EndpointQuery::new(client(&base), "prices"))
        .store(StoreQuery::new(Arc::new(JsonStore::new(path)), "market_prices", Filter::new()));
    let result = FallbackResolver::resolve(&req).await;
    assert_eq!(result.origin(), OriginSource::Store);
    assert_eq!(result.into_payload(), Some(json!([{"market": "local"}])));
}
