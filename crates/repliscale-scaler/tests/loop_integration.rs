//! End-to-end loop tests against a mock application.
//!
//! Stands up a real HTTP server for `/app/status` and `/app/replicas`,
//! points a scaler at it in run-once mode, and asserts on the writes
//! the application observed.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};

use repliscale_client::ClientConfig;
use repliscale_scaler::{Scaler, ScalerConfig};

struct MockApp {
    cpu: f64,
    replicas: u32,
    /// Answer every status read with 500 instead of a body.
    status_unavailable: bool,
    status_hits: AtomicU32,
    put_bodies: Mutex<Vec<serde_json::Value>>,
}

impl MockApp {
    fn healthy(cpu: f64, replicas: u32) -> Self {
        Self {
            cpu,
            replicas,
            status_unavailable: false,
            status_hits: AtomicU32::new(0),
            put_bodies: Mutex::new(Vec::new()),
        }
    }

    fn unavailable() -> Self {
        Self {
            status_unavailable: true,
            ..Self::healthy(0.0, 0)
        }
    }

    fn observed_puts(&self) -> Vec<serde_json::Value> {
        self.put_bodies.lock().unwrap().clone()
    }
}

async fn status_handler(State(app): State<Arc<MockApp>>) -> Response {
    app.status_hits.fetch_add(1, Ordering::SeqCst);
    if app.status_unavailable {
        return (StatusCode::INTERNAL_SERVER_ERROR, "status unavailable").into_response();
    }
    Json(serde_json::json!({
        "cpu": { "highPriority": app.cpu },
        "replicas": app.replicas,
    }))
    .into_response()
}

async fn replicas_handler(
    State(app): State<Arc<MockApp>>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    app.put_bodies.lock().unwrap().push(body);
    StatusCode::NO_CONTENT
}

async fn spawn_app(app: MockApp) -> (Arc<MockApp>, SocketAddr) {
    let app = Arc::new(app);
    let router = Router::new()
        .route("/app/status", get(status_handler))
        .route("/app/replicas", put(replicas_handler))
        .with_state(app.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (app, addr)
}

fn config_for(addr: SocketAddr, target: f64) -> ScalerConfig {
    ScalerConfig {
        target_cpu_usage: target,
        polling_interval: Duration::from_secs(1),
        client: ClientConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            use_https: false,
            retry_count: 2,
            retry_delay: 0,
        },
    }
}

#[tokio::test]
async fn overloaded_app_gets_one_more_replica() {
    let (app, addr) = spawn_app(MockApp::healthy(0.95, 3)).await;

    let scaler = Scaler::new(config_for(addr, 0.80))
        .unwrap()
        .with_run_once(true);
    scaler.run().await;

    assert_eq!(
        app.observed_puts(),
        vec![serde_json::json!({ "replicas": 4 })]
    );
}

#[tokio::test]
async fn idle_app_gets_one_fewer_replica() {
    let (app, addr) = spawn_app(MockApp::healthy(0.20, 5)).await;

    let scaler = Scaler::new(config_for(addr, 0.80))
        .unwrap()
        .with_run_once(true);
    scaler.run().await;

    assert_eq!(
        app.observed_puts(),
        vec![serde_json::json!({ "replicas": 4 })]
    );
}

#[tokio::test]
async fn idle_app_at_one_replica_is_left_alone() {
    let (app, addr) = spawn_app(MockApp::healthy(0.50, 1)).await;

    let scaler = Scaler::new(config_for(addr, 0.80))
        .unwrap()
        .with_run_once(true);
    scaler.run().await;

    assert!(app.observed_puts().is_empty());
}

#[tokio::test]
async fn app_on_target_is_left_alone() {
    let (app, addr) = spawn_app(MockApp::healthy(0.80, 2)).await;

    let scaler = Scaler::new(config_for(addr, 0.80))
        .unwrap()
        .with_run_once(true);
    scaler.run().await;

    assert!(app.observed_puts().is_empty());
}

#[tokio::test]
async fn unavailable_status_skips_the_cycle_without_crashing() {
    let (app, addr) = spawn_app(MockApp::unavailable()).await;

    let scaler = Scaler::new(config_for(addr, 0.80))
        .unwrap()
        .with_run_once(true);
    scaler.run().await;

    // Both attempts were made, nothing was written, and run() returned.
    assert_eq!(app.status_hits.load(Ordering::SeqCst), 2);
    assert!(app.observed_puts().is_empty());
}

#[tokio::test]
async fn stop_request_ends_a_long_polling_sleep() {
    let (app, addr) = spawn_app(MockApp::healthy(0.80, 2)).await;

    let mut config = config_for(addr, 0.80);
    config.polling_interval = Duration::from_secs(3600);

    let scaler = Scaler::new(config).unwrap();
    let stop = scaler.stop_handle();
    let loop_task = tokio::spawn(scaler.run());

    // Wait for the first iteration to poll the app.
    while app.status_hits.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    stop.request_stop();
    tokio::time::timeout(Duration::from_secs(5), loop_task)
        .await
        .expect("stop must end the loop without waiting out the interval")
        .unwrap();

    // Exactly the one completed iteration.
    assert_eq!(app.status_hits.load(Ordering::SeqCst), 1);
}
