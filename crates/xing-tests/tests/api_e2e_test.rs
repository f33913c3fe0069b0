//! End-to-end tests for every crossing API endpoint
//!
//! Run with: cargo test -p xing-tests --test api_e2e_test

use std::time::Duration;

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};
use xing_core::{SystemConfig, TimingConfig, WearConfig};
use xing_tests::{wait_for, TestServer};

fn seeded() -> SystemConfig {
    SystemConfig::default().with_seed(17)
}

/// No component wear, so event sequences are exact
fn no_wear() -> SystemConfig {
    SystemConfig {
        wear: WearConfig {
            probability: 0.0,
            ..WearConfig::default()
        },
        ..seeded()
    }
}

async fn command(server: &TestServer, crossing_id: usize, command: &str) -> (StatusCode, Value) {
    server
        .post_json(
            "/api/system/command",
            &json!({"crossing_id": crossing_id, "command": command}),
        )
        .await
        .unwrap()
}

// =============================================================================
// Health and status
// =============================================================================

#[tokio::test]
async fn health_returns_ok() {
    let server = TestServer::start(seeded()).await.unwrap();
    let response = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn status_lists_all_crossings_idle() {
    let server = TestServer::start(seeded()).await.unwrap();
    let (status, body) = server.get_json("/api/system/status").await.unwrap();
    assert_eq!(status, StatusCode::OK);

    let crossings = body["crossings"].as_array().unwrap();
    assert_eq!(crossings.len(), 4);
    for (i, c) in crossings.iter().enumerate() {
        assert_eq!(c["id"], i);
        assert_eq!(c["state"], "IDLE");
        assert_eq!(c["barrier"], "UP");
        assert_eq!(c["traffic_lights"], json!({"red": false, "yellow": false, "green": true}));
        assert_eq!(c["train_position"], -100.0);
        assert_eq!(c["arrival_time"], Value::Null);
        assert_eq!(c["state_timeline"].as_array().unwrap().len(), 6);
    }

    let global = &body["global_state"];
    assert_eq!(global["emergency"], false);
    assert_eq!(global["maintenance"], false);
    assert_eq!(global["weather"], "CLEAR");
    assert_eq!(global["system_health"], 100.0);
    assert_eq!(global["statistics"]["success_rate"], 100.0);
}

#[tokio::test]
async fn single_crossing_lookup() {
    let server = TestServer::start(seeded()).await.unwrap();
    let (status, body) = server.get_json("/api/system/crossings/3").await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 3);

    let (status, body) = server.get_json("/api/system/crossings/4").await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "invalid_crossing");
}

// =============================================================================
// Commands
// =============================================================================

#[tokio::test]
async fn approach_with_storm_weather() {
    let server = TestServer::start(seeded()).await.unwrap();
    let (status, body) = server
        .post_json(
            "/api/system/command",
            &json!({
                "crossing_id": 1,
                "command": "approach",
                "parameters": {"train_speed": 100.0, "train_distance": 500.0, "weather": "storm"}
            }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["new_state"], "WARNING");

    let crossing = &body["system_status"]["crossings"][1];
    assert_eq!(crossing["weather"], "STORM");
    assert_eq!(crossing["countdown"], 18);
    assert_eq!(crossing["alarm"], "SLOW_BEEP");
    assert!((crossing["arrival_time"].as_f64().unwrap() - 18.0).abs() < 1e-6);
    assert_eq!(body["system_status"]["global_state"]["weather"], "STORM");
}

#[tokio::test]
async fn manual_cycle_over_http() {
    let server = TestServer::start(seeded()).await.unwrap();
    for (cmd, state) in [
        ("approach", "WARNING"),
        ("countdown", "COUNTDOWN"),
        ("barrier_down", "BARRIER_DOWN"),
        ("train_pass", "TRAIN_PASSING"),
        ("reset", "IDLE"),
    ] {
        let (status, body) = command(&server, 0, cmd).await;
        assert_eq!(status, StatusCode::OK, "{cmd}");
        assert_eq!(body["result"]["new_state"], state);
    }

    let (_, body) = server.get_json("/api/system/crossings/0").await.unwrap();
    let history = body["state_history"].as_array().unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history[4]["from"], "TRAIN_PASSING");
    assert_eq!(history[4]["to"], "IDLE");

    let (_, status) = server.get_json("/api/system/status").await.unwrap();
    assert_eq!(status["global_state"]["total_trains"], 1);
    assert_eq!(status["global_state"]["statistics"]["successful_transitions"], 5);
}

#[tokio::test]
async fn command_errors_map_to_status_codes() {
    let server = TestServer::start(seeded()).await.unwrap();

    let (status, body) = command(&server, 0, "barrier_down").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    let (status, body) = command(&server, 0, "levitate").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown_command");

    let (status, body) = command(&server, 42, "approach").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "invalid_crossing");

    let (status, body) = server
        .post_json(
            "/api/system/command",
            &json!({"command": "inject_fault", "parameters": {"fault_type": "meteor"}}),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_parameter");

    let (_, status) = server.get_json("/api/system/status").await.unwrap();
    let stats = &status["global_state"]["statistics"];
    assert_eq!(stats["failed_transitions"], 1);
    assert_eq!(stats["total_operations"], 1);
}

#[tokio::test]
async fn emergency_toggle_over_http() {
    let server = TestServer::start(seeded()).await.unwrap();
    command(&server, 2, "approach").await;

    let (status, body) = command(&server, 0, "emergency").await;
    assert_eq!(status, StatusCode::OK);
    let snapshot = &body["system_status"];
    assert_eq!(snapshot["global_state"]["emergency"], true);
    for c in snapshot["crossings"].as_array().unwrap() {
        assert_eq!(c["state"], "EMERGENCY");
        assert_eq!(c["barrier"], "UP");
        assert_eq!(c["alarm"], "CONTINUOUS");
    }

    let (_, body) = command(&server, 0, "emergency").await;
    let snapshot = &body["system_status"];
    assert_eq!(snapshot["global_state"]["emergency"], false);
    for c in snapshot["crossings"].as_array().unwrap() {
        assert_eq!(c["state"], "IDLE");
    }
    assert_eq!(snapshot["global_state"]["statistics"]["emergency_events"], 4);
}

#[tokio::test]
async fn faults_and_diagnostics() {
    let server = TestServer::start(seeded()).await.unwrap();
    server
        .post_json(
            "/api/system/command",
            &json!({"crossing_id": 3, "command": "inject_fault", "parameters": {"fault_type": "barrier_stuck"}}),
        )
        .await
        .unwrap();
    command(&server, 3, "inject_fault").await;

    let (status, report) = server.get_json("/api/system/diagnostics").await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["active_faults"], 2);
    assert_eq!(report["sensor_faults"], 1);
    assert_eq!(report["system_health"], 87.0);
    assert_eq!(
        report["crossing_status"][3]["faults"],
        json!(["BARRIER_STUCK", "IR_SENSOR_FAULT"])
    );
    assert_eq!(report["recommendations"].as_array().unwrap().len(), 3);

    let (_, body) = command(&server, 3, "clear_faults").await;
    let crossing = &body["system_status"]["crossings"][3];
    assert_eq!(crossing["faults"], json!([]));
    assert_eq!(crossing["sensor_health"]["ir"], true);
}

#[tokio::test]
async fn maintenance_sets_global_flag() {
    let server = TestServer::start(seeded()).await.unwrap();
    let (status, body) = command(&server, 1, "maintenance").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["system_status"]["global_state"]["maintenance"], true);
    assert_eq!(body["system_status"]["crossings"][1]["barrier"], "UP");

    let (status, _) = command(&server, 1, "approach").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = command(&server, 1, "reset").await;
    assert_eq!(body["system_status"]["global_state"]["maintenance"], false);
}

// =============================================================================
// Next actions, reset and logs
// =============================================================================

#[tokio::test]
async fn next_actions_per_crossing() {
    let server = TestServer::start(seeded()).await.unwrap();
    command(&server, 0, "approach").await;
    command(&server, 0, "countdown").await;

    let (status, body) = server.get_json("/api/system/next-actions").await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["0"]["current_state"], "COUNTDOWN");
    assert_eq!(body["0"]["countdown"], 10);
    assert_eq!(body["0"]["can_advance"], false);
    assert_eq!(body["1"]["current_state"], "IDLE");
    assert_eq!(body["1"]["countdown"], Value::Null);
    assert_eq!(body["1"]["estimated_time"], Value::Null);
}

#[tokio::test]
async fn reset_rebuilds_system() {
    let server = TestServer::start(seeded()).await.unwrap();
    command(&server, 0, "approach").await;
    command(&server, 1, "maintenance").await;

    let (status, body) = server
        .post_json("/api/system/reset", &json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    for c in body["system_status"]["crossings"].as_array().unwrap() {
        assert_eq!(c["state"], "IDLE");
        assert_eq!(c["operation_count"], 0);
    }
    assert_eq!(
        body["system_status"]["global_state"]["statistics"]["total_operations"],
        0
    );
}

#[tokio::test]
async fn logs_record_and_clear() {
    let server = TestServer::start(no_wear()).await.unwrap();
    command(&server, 0, "approach").await;

    let (status, body) = server.get_json("/api/system/logs?count=3").await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(body["total_count"], 4);
    assert_eq!(items[2]["event"], "TRAIN_APPROACH");
    assert_eq!(items[2]["crossing"], 0);

    let (_, all) = server.get_json("/api/system/logs").await.unwrap();
    assert_eq!(all["items"][0]["event"], "SYSTEM_START");

    let (status, body) = server
        .post_json("/api/system/logs/clear", &json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = server.get_json("/api/system/logs").await.unwrap();
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["items"][0]["details"], "log cleared");
}

// =============================================================================
// Scheduler
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scheduler_completes_cycle_over_http() {
    let config = SystemConfig {
        tick_interval_ms: 20,
        timing: TimingConfig {
            countdown_base_secs: 0,
            warning_dwell_secs: 0.05,
            barrier_dwell_secs: 0.05,
            passing_dwell_secs: 0.05,
            ..TimingConfig::default()
        },
        ..seeded()
    };
    let server = TestServer::start_with_scheduler(config).await.unwrap();

    let (status, _) = server
        .post_json(
            "/api/system/command",
            &json!({
                "crossing_id": 2,
                "command": "approach",
                "parameters": {"train_speed": 200.0, "train_distance": 50.0}
            }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let finished = wait_for(
        || async {
            let (_, body) = server.get_json("/api/system/crossings/2").await.unwrap();
            body["state"] == "IDLE" && body["state_history"].as_array().unwrap().len() == 5
        },
        Duration::from_secs(5),
    )
    .await;
    assert!(finished, "crossing did not complete its cycle");

    let (_, body) = server.get_json("/api/system/crossings/2").await.unwrap();
    let path: Vec<&str> = body["state_history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["to"].as_str().unwrap())
        .collect();
    assert_eq!(
        path,
        vec!["WARNING", "COUNTDOWN", "BARRIER_DOWN", "TRAIN_PASSING", "IDLE"]
    );
    assert_eq!(body["train_position"], -100.0);

    let (_, status) = server.get_json("/api/system/status").await.unwrap();
    assert!(status["global_state"]["uptime"].as_u64().unwrap() > 0);

    server.shutdown().await;
}
