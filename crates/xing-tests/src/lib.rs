//! End-to-end tests for the crossing API
//!
//! [`TestServer`] serves the real router on an ephemeral port so tests drive
//! the full stack over HTTP:
//! - HTTP API layer (routing, JSON, error mapping)
//! - Command processing and status views
//! - Optionally the background scheduler
//!
//! ```bash
//! cargo test -p xing-tests
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::net::TcpListener;
use xing_api::{create_router, AppState};
use xing_core::{RailwaySystem, Scheduler, SystemConfig};

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub system: Arc<RailwaySystem>,
    scheduler: Option<Scheduler>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve a system without the background scheduler
    pub async fn start(config: SystemConfig) -> Result<Self> {
        Self::start_inner(config, false).await
    }

    /// Serve a system with the scheduler ticking at `config.tick_interval_ms`
    pub async fn start_with_scheduler(config: SystemConfig) -> Result<Self> {
        Self::start_inner(config, true).await
    }

    async fn start_inner(config: SystemConfig, scheduled: bool) -> Result<Self> {
        let system = Arc::new(RailwaySystem::new(config));
        let scheduler = scheduled.then(|| Scheduler::start(system.clone()));
        let router = create_router(AppState::new(system.clone()));

        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .build()?;

        Ok(Self {
            addr,
            client,
            system,
            scheduler,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// GET `path` and decode the JSON body
    pub async fn get_json(&self, path: &str) -> Result<(StatusCode, Value)> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status();
        Ok((status, response.json().await?))
    }

    /// POST `body` to `path` and decode the JSON body
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<(StatusCode, Value)> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let status = response.status();
        Ok((status, response.json().await?))
    }

    /// Shutdown the server and scheduler gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop().await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal if not already done
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // Abort the task if still running
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Wait for a condition with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    false
}
