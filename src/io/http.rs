//! HTTP API for position reports and tracking queries
//!
//! Thin boundary over the tracking core. Uses hyper for the HTTP server.
//! Responsibilities kept here and out of the core:
//! - Request parsing and validation (UUID courier IDs, coordinate ranges)
//! - Mapping `TrackerError` to status codes
//! - The `{success, message, data, timestamp}` response envelope
//!
//! Also serves Prometheus metrics at /metrics and a liveness probe at /health.

use crate::domain::error::TrackerError;
use crate::domain::types::{deserialize_observed_at, Coordinate, CourierId, PositionReport, StoreId};
use crate::infra::metrics::{Metrics, MetricsSummary, METRICS_BUCKET_BOUNDS, METRICS_NUM_BUCKETS};
use crate::services::entries::EntryQueryService;
use crate::services::tracker::TrackingService;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared state handed to every request
pub struct ApiState {
    pub tracking: Arc<TrackingService>,
    pub entries: Arc<EntryQueryService>,
    pub metrics: Arc<Metrics>,
    pub site_id: String,
}

/// Position report body for `POST /api/v1/courier/location`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationRequest {
    courier_id: String,
    lat: f64,
    lng: f64,
    #[serde(deserialize_with = "deserialize_observed_at")]
    time: DateTime<Utc>,
}

impl LocationRequest {
    fn into_report(self) -> Result<PositionReport, TrackerError> {
        let courier_id = parse_courier_id(&self.courier_id)?;
        let coordinate = Coordinate::checked(self.lat, self.lng)?;
        Ok(PositionReport::new(courier_id, coordinate, self.time))
    }
}

/// Response envelope
#[derive(Debug, Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    timestamp: DateTime<Utc>,
}

fn envelope<T: Serialize>(
    status: StatusCode,
    message: String,
    data: Option<T>,
) -> Response<Full<Bytes>> {
    let body = Envelope { success: status.is_success(), message, data, timestamp: Utc::now() };
    let json = serde_json::to_vec(&body).unwrap_or_else(|e| {
        error!(error = %e, "response_serialization_failed");
        br#"{"success":false,"message":"Internal server error"}"#.to_vec()
    });
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .expect("static response should not fail")
}

fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Response<Full<Bytes>> {
    envelope(StatusCode::OK, message.into(), Some(data))
}

fn error_response(err: &TrackerError) -> Response<Full<Bytes>> {
    let status = match err {
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        TrackerError::StoreNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!(error = %err, "request_failed");
        envelope::<()>(status, "Internal server error".to_string(), None)
    } else {
        debug!(error = %err, status = %status.as_u16(), "request_rejected");
        envelope::<()>(status, err.to_string(), None)
    }
}

fn parse_courier_id(raw: &str) -> Result<CourierId, TrackerError> {
    if raw.trim().is_empty() {
        return Err(TrackerError::InvalidCourierId("Courier ID is required".to_string()));
    }
    uuid::Uuid::parse_str(raw)
        .map(|_| CourierId::new(raw))
        .map_err(|_| TrackerError::InvalidCourierId("Courier ID must be a valid UUID".to_string()))
}

fn parse_store_id(raw: &str) -> Result<StoreId, TrackerError> {
    raw.parse::<i64>()
        .map(StoreId)
        .map_err(|_| TrackerError::InvalidRequest(format!("Store ID must be an integer: {raw}")))
}

/// Handle HTTP requests
///
/// Generic over the body type so tests can drive it without a socket.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<ApiState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let result = match (&method, segments.as_slice()) {
        (&Method::POST, ["api", "v1", "courier", "location"]) => {
            record_location(req.into_body(), &state).await
        }
        (&Method::GET, ["api", "v1", "courier", "location", "courier", id]) => {
            location_history(&state, id)
        }
        (&Method::GET, ["api", "v1", "courier", "location", "courier", id, "latest"]) => {
            latest_location(&state, id)
        }
        (&Method::GET, ["api", "v1", "courier", "location", "courier", id, "total-distance"]) => {
            total_distance(&state, id)
        }
        (&Method::GET, ["api", "v1", "store-entries"]) => all_entries(&state),
        (&Method::GET, ["api", "v1", "store-entries", "courier", id]) => {
            entries_by_courier(&state, id)
        }
        (&Method::GET, ["api", "v1", "store-entries", "store", id]) => entries_by_store(&state, id),
        (&Method::GET, ["metrics"]) => {
            let body = format_prometheus_metrics(&state.metrics, &state.site_id);
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
                .body(Full::new(Bytes::from(body)))
                .expect("static response should not fail"))
        }
        (&Method::GET, ["health"]) => Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("ok")))
            .expect("static response should not fail")),
        _ => {
            let message = format!("No route for {method} {path}");
            Ok(envelope::<()>(StatusCode::NOT_FOUND, message, None))
        }
    };

    Ok(result.unwrap_or_else(|e| error_response(&e)))
}

async fn record_location<B>(
    body: B,
    state: &ApiState,
) -> Result<Response<Full<Bytes>>, TrackerError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let bytes = Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                TrackerError::InvalidRequest(format!("Body exceeds {MAX_BODY_BYTES} bytes"))
            } else {
                TrackerError::InvalidRequest(format!("Failed to read body: {e}"))
            }
        })?
        .to_bytes();
    let request: LocationRequest = serde_json::from_slice(&bytes)
        .map_err(|e| TrackerError::InvalidRequest(e.to_string()))?;
    let report = request.into_report()?;

    let response = state.tracking.record_position(report)?;
    Ok(envelope(StatusCode::CREATED, "Location processed successfully".to_string(), Some(response)))
}

fn location_history(state: &ApiState, id: &str) -> Result<Response<Full<Bytes>>, TrackerError> {
    let courier_id = parse_courier_id(id)?;
    let locations = state.tracking.history(&courier_id)?;
    Ok(ok(format!("Retrieved {} locations", locations.len()), locations))
}

fn latest_location(state: &ApiState, id: &str) -> Result<Response<Full<Bytes>>, TrackerError> {
    let courier_id = parse_courier_id(id)?;
    Ok(match state.tracking.latest(&courier_id)? {
        Some(location) => ok("Latest location retrieved", location),
        None => envelope::<()>(
            StatusCode::OK,
            "No locations recorded for this courier".to_string(),
            None,
        ),
    })
}

fn total_distance(state: &ApiState, id: &str) -> Result<Response<Full<Bytes>>, TrackerError> {
    let courier_id = parse_courier_id(id)?;
    let distance = state.tracking.total_distance(&courier_id)?;
    Ok(ok("Total travel distance retrieved", distance))
}

fn all_entries(state: &ApiState) -> Result<Response<Full<Bytes>>, TrackerError> {
    let entries = state.entries.all_entries()?;
    Ok(ok(format!("Retrieved {} store entries", entries.len()), entries))
}

fn entries_by_courier(state: &ApiState, id: &str) -> Result<Response<Full<Bytes>>, TrackerError> {
    let courier_id = parse_courier_id(id)?;
    let entries = state.entries.entries_by_courier(&courier_id)?;
    Ok(ok(format!("Retrieved {} entries for courier {}", entries.len(), courier_id), entries))
}

fn entries_by_store(state: &ApiState, id: &str) -> Result<Response<Full<Bytes>>, TrackerError> {
    let store_id = parse_store_id(id)?;
    let entries = state.entries.entries_by_store(store_id)?;
    Ok(ok(format!("Retrieved {} entries for store {}", entries.len(), store_id), entries))
}

/// Write a counter or gauge with site label
fn write_metric(output: &mut String, name: &str, help: &str, typ: &str, site: &str, val: u64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {typ}");
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val}");
}

/// Write a histogram metric with buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    site: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    avg: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in METRICS_BUCKET_BOUNDS.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"+Inf\"}} {cumulative}");

    let count: u64 = buckets.iter().sum();
    let _ = writeln!(output, "{name}_sum{{site=\"{site}\"}} {}", avg * count);
    let _ = writeln!(output, "{name}_count{{site=\"{site}\"}} {count}");
}

/// Format metrics in Prometheus text exposition format
fn format_prometheus_metrics(metrics: &Metrics, site: &str) -> String {
    let summary: MetricsSummary = metrics.report();
    let mut output = String::with_capacity(2048);

    write_metric(
        &mut output,
        "tracker_positions_total",
        "Total position reports recorded",
        "counter",
        site,
        summary.positions_total,
    );
    write_metric(
        &mut output,
        "tracker_store_entries_total",
        "Confirmed store entries",
        "counter",
        site,
        summary.entries_confirmed_total,
    );
    write_metric(
        &mut output,
        "tracker_store_entries_suppressed_total",
        "Store entries suppressed by the re-entry cooldown",
        "counter",
        site,
        summary.entries_suppressed_total,
    );
    write_metric(
        &mut output,
        "tracker_reaction_failures_total",
        "Entry reactions that failed during dispatch",
        "counter",
        site,
        summary.reaction_failures_total,
    );
    write_histogram(
        &mut output,
        "tracker_position_latency_us",
        "Position processing latency in microseconds",
        site,
        &summary.lat_buckets,
        summary.avg_latency_us,
    );
    write_metric(
        &mut output,
        "tracker_position_latency_p99_us",
        "99th percentile position processing latency",
        "gauge",
        site,
        summary.lat_p99_us,
    );

    output
}

/// Start the API HTTP server
pub async fn start_api_server(
    addr: SocketAddr,
    state: Arc<ApiState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    info!(addr = %addr, site = %state.site_id, "api_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                warn!(peer = %peer, error = %e, "api_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "api_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("api_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Coordinate;
    use crate::infra::storage::{
        MemoryEntryStore, MemoryLocationStore, MemoryStoreCatalog, StoreCatalog,
    };
    use crate::services::distance::MetricSelector;
    use crate::services::notifier::EntryNotifier;
    use crate::services::reactions::PersistenceReaction;

    const COURIER: &str = "0b7e8a3c-2f4d-4e6a-9c1b-5d8f7a6e4c21";

    fn test_state() -> Arc<ApiState> {
        let locations = Arc::new(MemoryLocationStore::new());
        let catalog = Arc::new(MemoryStoreCatalog::new());
        let entries = Arc::new(MemoryEntryStore::new());
        let metrics = Arc::new(Metrics::new());
        let notifier = Arc::new(EntryNotifier::with_metrics(metrics.clone()));
        notifier.register(Arc::new(PersistenceReaction::new(catalog.clone(), entries.clone())));
        catalog.insert("Ataşehir MMM Migros", Coordinate::new(40.9923307, 29.1244229)).unwrap();

        let tracking = Arc::new(TrackingService::new(
            locations,
            catalog.clone(),
            entries.clone(),
            Arc::new(MetricSelector::default()),
            notifier,
            metrics.clone(),
        ));
        Arc::new(ApiState {
            tracking,
            entries: Arc::new(EntryQueryService::new(entries, catalog)),
            metrics,
            site_id: "test".to_string(),
        })
    }

    fn request(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn send(
        state: &Arc<ApiState>,
        req: Request<Full<Bytes>>,
    ) -> (StatusCode, serde_json::Value) {
        let resp = handle_request(req, state.clone()).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn location_body(lat: f64, lng: f64, time: &str) -> String {
        format!(r#"{{"courierId":"{COURIER}","lat":{lat},"lng":{lng},"time":"{time}"}}"#)
    }

    #[tokio::test]
    async fn test_post_location_enters_store() {
        let state = test_state();
        let body = location_body(40.9927, 29.1244, "2024-01-15T10:00:00");

        let (status, json) =
            send(&state, request(Method::POST, "/api/v1/courier/location", &body)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Location processed successfully");
        assert_eq!(json["data"]["courierId"], COURIER);
        assert_eq!(json["data"]["lat"], 40.9927);
        assert_eq!(
            json["data"]["message"],
            "Location recorded. Entered store radius: Ataşehir MMM Migros"
        );
    }

    #[tokio::test]
    async fn test_post_location_validation() {
        let state = test_state();

        let bad_lat = location_body(95.0, 29.1244, "2024-01-15T10:00:00Z");
        let (status, json) =
            send(&state, request(Method::POST, "/api/v1/courier/location", &bad_lat)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let bad_id =
            r#"{"courierId":"not-a-uuid","lat":40.0,"lng":29.0,"time":"2024-01-15T10:00:00Z"}"#;
        let (status, json) =
            send(&state, request(Method::POST, "/api/v1/courier/location", bad_id)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Invalid courier ID: Courier ID must be a valid UUID");

        let missing = r#"{"lat":40.0,"lng":29.0,"time":"2024-01-15T10:00:00Z"}"#;
        let (status, _) =
            send(&state, request(Method::POST, "/api/v1/courier/location", missing)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            send(&state, request(Method::POST, "/api/v1/courier/location", "not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(state.tracking.location_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_post_location_body_too_large() {
        let state = test_state();
        let padding = " ".repeat(MAX_BODY_BYTES);
        let body = format!("{}{padding}", location_body(40.9927, 29.1244, "2024-01-15T10:00:00Z"));

        let (status, json) =
            send(&state, request(Method::POST, "/api/v1/courier/location", &body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let expected = format!("Invalid request: Body exceeds {MAX_BODY_BYTES} bytes");
        assert_eq!(json["message"], expected);
        assert_eq!(state.tracking.location_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_history_latest_and_distance() {
        let state = test_state();
        for (lat, time) in [(40.99, "2024-01-15T10:00:00Z"), (40.98, "2024-01-15T10:05:00Z")] {
            let body = location_body(lat, 29.12, time);
            send(&state, request(Method::POST, "/api/v1/courier/location", &body)).await;
        }

        let base = format!("/api/v1/courier/location/courier/{COURIER}");
        let (status, json) = send(&state, request(Method::GET, &base, "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Retrieved 2 locations");
        assert_eq!(json["data"][0]["lat"], 40.99);

        let (_, json) = send(&state, request(Method::GET, &format!("{base}/latest"), "")).await;
        assert_eq!(json["message"], "Latest location retrieved");
        assert_eq!(json["data"]["lat"], 40.98);

        let (_, json) =
            send(&state, request(Method::GET, &format!("{base}/total-distance"), "")).await;
        assert_eq!(json["data"]["courierId"], COURIER);
        assert_eq!(json["data"]["formattedDistance"], "1.11 km");
    }

    #[tokio::test]
    async fn test_latest_without_history() {
        let state = test_state();
        let uri = format!("/api/v1/courier/location/courier/{COURIER}/latest");
        let (status, json) = send(&state, request(Method::GET, &uri, "")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "No locations recorded for this courier");
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn test_store_entries_routes() {
        let state = test_state();
        let body = location_body(40.9927, 29.1244, "2024-01-15T10:00:00Z");
        send(&state, request(Method::POST, "/api/v1/courier/location", &body)).await;

        let (_, json) = send(&state, request(Method::GET, "/api/v1/store-entries", "")).await;
        assert_eq!(json["message"], "Retrieved 1 store entries");
        assert_eq!(json["data"][0]["storeName"], "Ataşehir MMM Migros");

        let uri = format!("/api/v1/store-entries/courier/{COURIER}");
        let (_, json) = send(&state, request(Method::GET, &uri, "")).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 1);

        let (status, _) =
            send(&state, request(Method::GET, "/api/v1/store-entries/store/1", "")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) =
            send(&state, request(Method::GET, "/api/v1/store-entries/store/99", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Store not found with ID: 99");

        let (status, _) =
            send(&state, request(Method::GET, "/api/v1/store-entries/store/abc", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let state = test_state();
        let (status, json) =
            send(&state, request(Method::DELETE, "/api/v1/store-entries", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let state = test_state();
        let body = location_body(40.9927, 29.1244, "2024-01-15T10:00:00Z");
        send(&state, request(Method::POST, "/api/v1/courier/location", &body)).await;

        let resp =
            handle_request(request(Method::GET, "/metrics", ""), state.clone()).await.unwrap();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(text.contains("tracker_positions_total{site=\"test\"} 1"));
        assert!(text.contains("tracker_store_entries_total{site=\"test\"} 1"));
        assert!(text.contains("tracker_position_latency_us_bucket{site=\"test\",le=\"+Inf\"} 1"));
    }

    #[test]
    fn test_parse_courier_id() {
        assert!(parse_courier_id(COURIER).is_ok());
        assert!(parse_courier_id("").is_err());
        assert!(parse_courier_id("courier-1").is_err());
    }
}
