//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use gatekeeper::config::{DenialPolicy, Environment, GatekeeperConfig, Secrets};
use gatekeeper::security::password::hash_password;
use gatekeeper::{HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const SECRET: &str = "integration-secret-at-least-32-bytes";
pub const PASSWORD: &str = "correct horse battery staple";

pub fn secrets() -> Secrets {
    Secrets {
        jwt_secret: SECRET.to_string(),
        admin_password_hash: hash_password(PASSWORD),
    }
}

/// Start a mock upstream on an ephemeral port that answers every request
/// with `200 OK` and `body`.
pub async fn start_mock_upstream(body: &'static str) -> SocketAddr {
    start_delayed_upstream(body, Duration::ZERO).await
}

/// Like [`start_mock_upstream`], but waits `delay` before answering.
pub async fn start_delayed_upstream(body: &'static str, delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        read_request_head(&mut socket).await;
                        tokio::time::sleep(delay).await;
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn dead_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
}

pub fn test_config(upstream: SocketAddr, policy: DenialPolicy) -> GatekeeperConfig {
    let mut config = GatekeeperConfig::default();
    config.environment = Environment::Development;
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.address = upstream.to_string();
    config.access.denial_policy = policy;
    config
}

/// A running gatekeeper and the handles to stop it.
pub struct Running {
    pub base: String,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), std::io::Error>>,
}

impl Running {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

pub async fn start_gatekeeper(config: GatekeeperConfig) -> Running {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, &secrets()).unwrap();

    let shutdown = Shutdown::new();
    let handle = shutdown.clone();
    let task = tokio::spawn(async move { server.run(listener, &handle).await });

    Running {
        base: format!("http://{}", addr),
        shutdown,
        task,
    }
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
