//! HTTP surface of the ingestion boundary.
//!
//! Routes:
//!
//! | Method | Path | Response |
//! |---|---|---|
//! | `POST` | `/api/stream/ingest` | receipt, or 400 `{error}` |
//! | `GET` | `/api/stream` | buffer statistics |
//! | `GET` | `/api/stream/:equipment_id/latest` | interpreted frame, or 204 |
//! | `GET` | `/api/stream/:equipment_id/recent?count=&decode=` | frames, oldest first |
//! | `GET` | `/api/faults` | every known fault code |
//! | `GET` | `/api/faults/search?q=` | matching fault codes |
//! | `GET` | `/api/faults/:code` | resolved fault code |
//! | `GET` | `/health` | liveness |

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::alerts::Alert;
use crate::buffer::BufferStats;
use crate::error::{Error, Result};
use crate::faults::{FaultCode, FaultCodeResolver};
use crate::frame::DecodedReading;
use crate::ingest::{IngestRequest, TelemetryService};

/// Shared state injected into the handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    service: TelemetryService,
    resolver: Arc<FaultCodeResolver>,
    default_recent_count: i64,
}

impl AppState {
    /// Create state over a telemetry service and the built-in fault library.
    #[must_use]
    pub fn new(service: TelemetryService, default_recent_count: i64) -> Self {
        Self {
            service,
            resolver: Arc::new(FaultCodeResolver::new()),
            default_recent_count,
        }
    }

    /// Replace the fault code resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<FaultCodeResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// The telemetry service behind the routes.
    #[must_use]
    pub fn service(&self) -> &TelemetryService {
        &self.service
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stream", get(stream_overview))
        .route("/api/stream/ingest", post(ingest))
        .route("/api/stream/:equipment_id/latest", get(latest))
        .route("/api/stream/:equipment_id/recent", get(recent))
        .route("/api/faults", get(all_faults))
        .route("/api/faults/search", get(search_faults))
        .route("/api/faults/:code", get(resolve_fault))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `listen` and serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`Error::ServerBind`] if the address cannot be bound, or
/// [`Error::Io`] if the server fails while running.
pub async fn serve<F>(listen: SocketAddr, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = bind(listen).await?;
    info!(address = %listener.local_addr()?, "telemetry api listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("telemetry api stopped");
    Ok(())
}

/// Bind `listen` and serve on a background task.
///
/// # Errors
///
/// Returns [`Error::ServerBind`] if the address cannot be bound.
pub async fn spawn(listen: SocketAddr, state: AppState) -> Result<ServerHandle> {
    let listener = bind(listen).await?;
    let address = listener.local_addr()?;
    info!(%address, "telemetry api listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, router(state)).with_graceful_shutdown(async move {
        let _ = shutdown_rx.changed().await;
    });
    let task = tokio::spawn(async move {
        if let Err(err) = server.await {
            warn!(error = %err, "telemetry api exited with error");
        }
    });

    Ok(ServerHandle {
        address,
        task,
        shutdown: shutdown_tx,
    })
}

async fn bind(listen: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(listen)
        .await
        .map_err(|source| Error::ServerBind {
            addr: listen,
            source,
        })
}

/// Handle to a server started with [`spawn`].
#[derive(Debug)]
pub struct ServerHandle {
    address: SocketAddr,
    task: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl ServerHandle {
    /// Address the server is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Request graceful shutdown and wait for in-flight requests to finish.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the server task panicked.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        self.task
            .await
            .map_err(|e| Error::internal(format!("server task failed: {e}")))?;
        info!("telemetry api stopped");
        Ok(())
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps crate errors onto HTTP responses.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        error_response(status, self.0.to_string())
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestResponse {
    message: &'static str,
    frame_id: Uuid,
    reading: DecodedReading,
    alerts: Vec<Alert>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamOverview {
    equipment_ids: Vec<String>,
    #[serde(flatten)]
    stats: BufferStats,
}

#[derive(Debug, Default, Deserialize)]
struct RecentParams {
    count: Option<i64>,
    #[serde(default)]
    decode: bool,
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn ingest(
    State(state): State<AppState>,
    payload: std::result::Result<Json<IngestRequest>, JsonRejection>,
) -> std::result::Result<Json<IngestResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "unreadable ingest body");
        Error::validation("body", rejection.body_text())
    })?;

    let receipt = state.service.ingest(request)?;
    Ok(Json(IngestResponse {
        message: "Frame ingested",
        frame_id: receipt.frame_id,
        reading: receipt.reading,
        alerts: receipt.alerts,
    }))
}

async fn stream_overview(State(state): State<AppState>) -> Json<StreamOverview> {
    Json(StreamOverview {
        equipment_ids: state.service.equipment_ids(),
        stats: state.service.stats(),
    })
}

async fn latest(State(state): State<AppState>, Path(equipment_id): Path<String>) -> Response {
    match state.service.latest_interpreted(&equipment_id) {
        Some(frame) => Json(frame).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn recent(
    State(state): State<AppState>,
    Path(equipment_id): Path<String>,
    params: std::result::Result<Query<RecentParams>, axum::extract::rejection::QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let count = params.count.unwrap_or(state.default_recent_count);

    if params.decode {
        Json(state.service.recent_interpreted(&equipment_id, count)).into_response()
    } else {
        Json(state.service.recent(&equipment_id, count)).into_response()
    }
}

async fn all_faults(State(state): State<AppState>) -> Json<Vec<FaultCode>> {
    Json(state.resolver.all())
}

async fn search_faults(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<FaultCode>> {
    Json(state.resolver.search(&params.q))
}

async fn resolve_fault(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Json<FaultCode> {
    Json(state.resolver.resolve(&code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::new(TelemetryService::new(60), 60)
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn frame_body(equipment: &str, data: &str) -> Value {
        json!({
            "equipmentId": equipment,
            "canId": "0x0CF00400",
            "data": data,
            "timestamp": "2024-05-01T12:00:00Z",
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&state(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_ingest_then_latest() {
        let state = state();
        let data = codec::encode(1600.0, 90.0, 60.0, 80.0);

        let (status, body) = send(
            &state,
            post_json("/api/stream/ingest", &frame_body("CAT320", &data)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Frame ingested");
        assert_eq!(body["reading"]["rpm"], 1600.0);
        assert_eq!(body["alerts"], json!([]));
        let frame_id = body["frameId"].clone();

        let (status, body) = send(&state, get("/api/stream/CAT320/latest")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["frame"]["id"], frame_id);
        assert_eq!(body["frame"]["payload"], "3200820F50000000");
        assert_eq!(body["reading"]["coolantTempC"], 90.0);
    }

    #[tokio::test]
    async fn test_ingest_reports_critical_alert() {
        let state = state();
        let data = codec::encode(1600.0, 110.0, 60.0, 80.0);
        let (status, body) = send(
            &state,
            post_json("/api/stream/ingest", &frame_body("CAT320", &data)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alerts"][0]["severity"], "critical");
    }

    #[tokio::test]
    async fn test_ingest_accepts_legacy_field_names() {
        let state = state();
        let body = json!({
            "equipmentId": "VOLVO240",
            "protocolId": "0x0CF00400",
            "payload": "3200820f50000000",
        });
        let (status, _) = send(&state, post_json("/api/stream/ingest", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            state.service().latest("VOLVO240").unwrap().payload(),
            "3200820F50000000"
        );
    }

    #[tokio::test]
    async fn test_ingest_rejects_missing_equipment() {
        let state = state();
        let body = json!({ "canId": "0x0CF00400", "data": "3200820F50000000" });
        let (status, body) = send(&state, post_json("/api/stream/ingest", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("equipmentId"));
        assert!(state.service().equipment_ids().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_rejects_malformed_payload() {
        let state = state();
        let (status, body) = send(
            &state,
            post_json("/api/stream/ingest", &frame_body("CAT320", "NOTHEX")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(state.service().latest("CAT320").is_none());
    }

    #[tokio::test]
    async fn test_ingest_rejects_unparseable_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/stream/ingest")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&state(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_latest_unknown_is_no_content() {
        let (status, body) = send(&state(), get("/api/stream/no-such-id/latest")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn test_recent() {
        let state = state();
        for rpm in [800.0, 1200.0, 1600.0] {
            let data = codec::encode(rpm, 90.0, 60.0, 80.0);
            send(
                &state,
                post_json("/api/stream/ingest", &frame_body("CAT320", &data)),
            )
            .await;
        }

        let (status, body) = send(&state, get("/api/stream/CAT320/recent?count=2")).await;
        assert_eq!(status, StatusCode::OK);
        let frames = body.as_array().unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames[0]["payload"].is_string());

        let (_, body) = send(&state, get("/api/stream/CAT320/recent?decode=true")).await;
        let frames = body.as_array().unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0]["reading"]["rpm"], 800.0);
        assert_eq!(frames[2]["reading"]["rpm"], 1600.0);
    }

    #[tokio::test]
    async fn test_recent_non_positive_and_unknown() {
        let state = state();
        let data = codec::encode(800.0, 90.0, 60.0, 80.0);
        send(
            &state,
            post_json("/api/stream/ingest", &frame_body("CAT320", &data)),
        )
        .await;

        let (_, body) = send(&state, get("/api/stream/CAT320/recent?count=0")).await;
        assert_eq!(body, json!([]));
        let (_, body) = send(&state, get("/api/stream/CAT320/recent?count=-3")).await;
        assert_eq!(body, json!([]));
        let (status, body) = send(&state, get("/api/stream/no-such-id/recent")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_recent_rejects_bad_count() {
        let (status, body) = send(&state(), get("/api/stream/CAT320/recent?count=lots")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_stream_overview() {
        let state = state();
        let data = codec::encode(800.0, 90.0, 60.0, 80.0);
        for id in ["VOLVO240", "CAT320"] {
            send(
                &state,
                post_json("/api/stream/ingest", &frame_body(id, &data)),
            )
            .await;
        }

        let (status, body) = send(&state, get("/api/stream")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["equipmentIds"], json!(["CAT320", "VOLVO240"]));
        assert_eq!(body["equipmentCount"], 2);
        assert_eq!(body["totalFrames"], 2);
        assert_eq!(body["capacity"], 60);
    }

    #[tokio::test]
    async fn test_faults_routes() {
        let state = state();

        let (status, body) = send(&state, get("/api/faults")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body.as_array().unwrap().len(),
            crate::faults::builtin_fault_codes().len()
        );

        let (_, body) = send(&state, get("/api/faults/p0520")).await;
        assert_eq!(body["code"], "P0520");
        assert_eq!(body["severity"], "critical");

        let (_, body) = send(&state, get("/api/faults/X9999")).await;
        assert_eq!(body["description"], "Unknown fault code: X9999");

        let (_, body) = send(&state, get("/api/faults/search?q=coolant")).await;
        let codes: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["J1939-F002", "P0115", "P0118"]);

        let (_, body) = send(&state, get("/api/faults/search")).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_spawn_and_shutdown() {
        let handle = spawn("127.0.0.1:0".parse().unwrap(), state()).await.unwrap();
        assert_ne!(handle.local_addr().port(), 0);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let first = spawn("127.0.0.1:0".parse().unwrap(), state()).await.unwrap();
        let err = spawn(first.local_addr(), state()).await.unwrap_err();
        assert!(matches!(err, Error::ServerBind { .. }));
        first.shutdown().await.unwrap();
    }
}
