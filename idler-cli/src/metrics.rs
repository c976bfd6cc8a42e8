//! Prometheus metrics for the idler and the HTTP endpoint serving them.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use tower_http::trace::TraceLayer;

use idler_core::{Outcome, RoundReport};

lazy_static! {
    pub static ref ROUNDS: IntCounter = register_int_counter!(
        "idler_rounds_total",
        "Total number of completed reconciliation rounds"
    )
    .unwrap();
    pub static ref ROUND_DURATION: Histogram = register_histogram!(
        "idler_round_duration_seconds",
        "Wall-clock length of a reconciliation round",
        vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0] // Rounds last at least one inactivity window
    )
    .unwrap();
    pub static ref EVALUATIONS: IntCounterVec = register_int_counter_vec!(
        "idler_evaluations_total",
        "Per-function round outcomes",
        &["function_name", "outcome"]
    )
    .unwrap();
    pub static ref KEEP_REASONS: IntCounterVec = register_int_counter_vec!(
        "idler_keep_reasons_total",
        "Reasons functions were kept running",
        &["reason"]
    )
    .unwrap();
    pub static ref TOUCH_CACHE_ENTRIES: IntGauge = register_int_gauge!(
        "idler_touch_cache_entries",
        "Number of functions tracked in the touch cache"
    )
    .unwrap();
}

/// Record one completed round.
pub fn record_round(report: &RoundReport, cache_entries: usize) {
    ROUNDS.inc();
    ROUND_DURATION.observe(report.elapsed.as_secs_f64());
    TOUCH_CACHE_ENTRIES.set(cache_entries as i64);

    for entry in &report.outcomes {
        if entry.outcome == Outcome::Ineligible {
            continue;
        }
        EVALUATIONS
            .with_label_values(&[entry.name.as_str(), entry.outcome.as_str()])
            .inc();
        if let Outcome::Kept(reason) = &entry.outcome {
            KEEP_REASONS.with_label_values(&[reason.as_str()]).inc();
        }
    }
}

/// Start the metrics server in a background task.
pub fn start_metrics_server(port: u16) {
    // Force initialization of metrics
    lazy_static::initialize(&ROUNDS);
    lazy_static::initialize(&ROUND_DURATION);
    lazy_static::initialize(&EVALUATIONS);
    lazy_static::initialize(&KEEP_REASONS);
    lazy_static::initialize(&TOUCH_CACHE_ENTRIES);

    tokio::spawn(async move {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let app = router();

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!("Metrics server listening on http://{}", addr);
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!("Metrics server stopped: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("Failed to bind metrics server: {}", e);
            }
        }
    });
}

fn router() -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { StatusCode::OK }))
        .layer(TraceLayer::new_for_http())
}

async fn metrics_handler() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }

    String::from_utf8(buffer).unwrap_or_else(|_| String::from("Encoding error"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use idler_core::{FunctionName, FunctionOutcome, Reason};

    #[tokio::test]
    async fn test_record_round_exposes_series() {
        let report = RoundReport {
            outcomes: vec![
                FunctionOutcome {
                    name: FunctionName::new("metrics-test-a").unwrap(),
                    outcome: Outcome::ScaledToZero,
                },
                FunctionOutcome {
                    name: FunctionName::new("metrics-test-b").unwrap(),
                    outcome: Outcome::Kept(Reason::FirstSighting),
                },
                FunctionOutcome {
                    name: FunctionName::new("metrics-test-c").unwrap(),
                    outcome: Outcome::Ineligible,
                },
            ],
            elapsed: Duration::from_secs(61),
        };

        record_round(&report, 2);
        let body = metrics_handler().await;

        assert!(body.contains("idler_rounds_total"));
        assert!(body.contains(
            r#"idler_evaluations_total{function_name="metrics-test-a",outcome="scaled_to_zero"} 1"#
        ));
        assert!(body.contains(r#"idler_keep_reasons_total{reason="first_sighting"}"#));
        assert!(!body.contains("metrics-test-c"));
        assert!(body.contains("idler_touch_cache_entries 2"));
    }

    #[tokio::test]
    async fn test_metrics_routes_over_http() {
        lazy_static::initialize(&ROUNDS);
        ROUNDS.inc();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router()).await.unwrap();
        });

        let client = reqwest::Client::new();

        let health = client
            .get(format!("http://{}/healthz", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(health.status(), reqwest::StatusCode::OK);

        let metrics = client
            .get(format!("http://{}/metrics", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(metrics.status(), reqwest::StatusCode::OK);
        let body = metrics.text().await.unwrap();
        assert!(body.contains("# TYPE idler_rounds_total counter"));

        let missing = client
            .get(format!("http://{}/nope", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
