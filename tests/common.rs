#![allow(dead_code, clippy::unwrap_used, clippy::missing_panics_doc, unreachable_pub, missing_debug_implementations)]
use serde_json::{Value, json};
use sms_service::AppBuilder;
use sms_service::adapters::storage::MemoryMessageStore;
use sms_service::api::{self, MgmtState};
use sms_service::config::Config;
use sms_service::services::delivery_service::DeliverySimulator;
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("sms_service=debug".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().init();
    });
}

/// Test defaults: background simulations are far enough out that they never fire mid-test.
pub fn get_test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.mgmt_port = 0;
    config.simulation.delay_ms = 60_000;
    config
}

pub struct TestApp {
    pub server_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub config: Config,
    pub store: MemoryMessageStore,
    pub simulator: DeliverySimulator,
    pub shutdown_tx: watch::Sender<bool>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_config(get_test_config()).await
    }

    pub async fn spawn_with_config(config: Config) -> Self {
        setup_tracing();

        let store = MemoryMessageStore::new();
        let app = AppBuilder::new(config.clone()).with_store(Arc::new(store.clone())).build();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_url = format!("http://{}", listener.local_addr().unwrap());
        let mgmt_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_url = format!("http://{}", mgmt_listener.local_addr().unwrap());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let app_router = api::app_router(app.services);
        let mut api_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            axum::serve(listener, app_router)
                .with_graceful_shutdown(async move {
                    let _ = api_rx.wait_for(|&s| s).await;
                })
                .await
                .unwrap();
        });

        let mgmt_app = api::mgmt_router(MgmtState { health_service: app.health_service });
        let mut mgmt_rx = shutdown_rx;
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt_app)
                .with_graceful_shutdown(async move {
                    let _ = mgmt_rx.wait_for(|&s| s).await;
                })
                .await
                .unwrap();
        });

        Self {
            server_url,
            mgmt_url,
            client: reqwest::Client::new(),
            config,
            store,
            simulator: app.simulator,
            shutdown_tx,
        }
    }

    /// Posts a message and asserts it was accepted.
    pub async fn send_message(&self, source: &str, destination: &str, content: &str) -> Value {
        let resp = self
            .client
            .post(format!("{}/messages", self.server_url))
            .json(&json!({
                "sourceNumber": source,
                "destinationNumber": destination,
                "content": content,
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 202);
        resp.json().await.unwrap()
    }

    pub async fn get_message(&self, id: &str) -> reqwest::Response {
        self.client.get(format!("{}/messages/{}", self.server_url, id)).send().await.unwrap()
    }

    pub async fn list_messages(&self, query: &[(&str, &str)]) -> Vec<Value> {
        let resp = self.client.get(format!("{}/messages", self.server_url)).query(query).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }

    pub async fn simulate(&self, id: &str) -> reqwest::Response {
        self.client.put(format!("{}/messages/{}/simulate", self.server_url, id)).send().await.unwrap()
    }

    /// Polls until the message leaves `PENDING`, or panics after `timeout`.
    pub async fn wait_for_resolution(&self, id: &str, timeout: Duration) -> Value {
        let start = std::time::Instant::now();
        loop {
            let body: Value = self.get_message(id).await.json().await.unwrap();
            if body["status"] != "PENDING" {
                return body;
            }
            assert!(start.elapsed() < timeout, "Message {id} still PENDING after {timeout:?}");
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }
}
