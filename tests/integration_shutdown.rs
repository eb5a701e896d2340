#![allow(clippy::unwrap_used, clippy::missing_panics_doc, missing_debug_implementations, unreachable_pub)]
use sms_service::adapters::storage::MessageStore;
use sms_service::domain::message::MessageStatus;
use std::time::Duration;
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_shutdown_drains_scheduled_simulations() {
    let mut config = common::get_test_config();
    config.simulation.delay_ms = 100;
    let app = common::TestApp::spawn_with_config(config).await;

    // 1. Accept a few messages, each with a deferred simulation
    let mut ids = Vec::new();
    for i in 0..3 {
        let body = app.send_message("+12025550140", "+447700900140", &format!("drain {i}")).await;
        ids.push(Uuid::parse_str(body["id"].as_str().unwrap()).unwrap());
    }
    assert_eq!(app.simulator.in_flight(), 3);

    // 2. Trigger shutdown and wait for the tracker
    let _ = app.shutdown_tx.send(true);
    tokio::time::timeout(Duration::from_secs(5), app.simulator.drain()).await.unwrap();

    // 3. Every message reached a terminal state
    assert_eq!(app.simulator.in_flight(), 0);
    for id in ids {
        let msg = app.store.get_by_id(id).await.unwrap().unwrap();
        assert_ne!(msg.status, MessageStatus::Pending);
    }
}

#[tokio::test]
async fn test_server_stops_accepting_after_shutdown() {
    let app = common::TestApp::spawn().await;

    let _ = app.shutdown_tx.send(true);

    let start = std::time::Instant::now();
    let mut refused = false;
    while start.elapsed() < Duration::from_secs(5) {
        if app.client.get(format!("{}/messages", app.server_url)).send().await.is_err() {
            refused = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    assert!(refused, "Server still accepting connections after shutdown");
}
