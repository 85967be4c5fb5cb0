//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use quote_race::config::{ServerConfig, SourceConfig};
use quote_race::http::HttpServer;
use quote_race::lifecycle::Shutdown;

/// Start a programmable mock upstream on an ephemeral port.
///
/// The request is read before `f` runs, so a slow handler looks like a slow
/// server rather than a refused connection.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            504 => "504 Gateway Timeout",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Mock AwesomeAPI upstream answering `bid` after `delay`.
pub async fn start_quote_upstream(delay: Duration, bid: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move {
        tokio::time::sleep(delay).await;
        (200, awesomeapi_body(bid))
    })
    .await
}

/// Mock upstream that always fails with `status`.
pub async fn start_failing_upstream(status: u16) -> SocketAddr {
    start_programmable_backend(move || async move { (status, "{}".to_string()) }).await
}

pub fn awesomeapi_body(bid: &str) -> String {
    format!(
        r#"{{"USDBRL":{{"code":"USD","codein":"BRL","name":"Dólar Americano/Real Brasileiro","high":"5.30","low":"5.20","bid":"{}","ask":"5.24"}}}}"#,
        bid
    )
}

/// Server config racing `upstreams` in order, persistence off.
pub fn config_for(upstreams: &[SocketAddr]) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.system_proxy = false;
    config.persistence.enabled = false;
    config.sources = upstreams
        .iter()
        .enumerate()
        .map(|(i, addr)| SourceConfig {
            name: format!("source-{}", i),
            endpoint: format!("http://{}/json/last/USD-BRL", addr),
            pair: "USDBRL".to_string(),
        })
        .collect();
    config
}

/// Start the quote server; it stops when the returned coordinator triggers.
pub async fn start_quote_server(config: ServerConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(&config).unwrap();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (_, config_updates) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    (addr, shutdown)
}

/// reqwest client that never goes through a proxy.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
