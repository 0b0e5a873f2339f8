//! Serving over a real listener and shutting down.

use std::time::Duration;

use serde_json::json;
use tokio::net::TcpListener;

use http_flows::config::ServerConfig;
use http_flows::observability::MemorySink;
use http_flows::Shutdown;

mod common;

#[tokio::test]
async fn test_serves_over_tcp_until_shutdown() {
    let sink = MemorySink::new();
    let mut server = common::server_with_sink(&sink, ServerConfig::default());
    common::register_echo_routes(&mut server);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    let res = client
        .post(format!("http://{addr}/api/test"))
        .json(&json!({ "value": 5 }))
        .send()
        .await
        .expect("server unreachable");

    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.json::<serde_json::Value>().await.unwrap(), json!({ "value": 5 }));

    let records = sink.take();
    assert!(records.iter().any(|r| r.message == "POST body"));

    assert_eq!(shutdown.trigger(), 1);
    let stopped = tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server did not stop");
    assert!(stopped.unwrap().is_ok());
}
