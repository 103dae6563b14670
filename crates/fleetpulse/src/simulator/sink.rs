//! Destinations for simulated frames.
//!
//! The simulator submits every frame through the same ingestion contract a
//! real sensor gateway would use, either in-process or over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::frame::DiagnosticFrame;
use crate::ingest::{IngestRequest, TelemetryService};

/// Path of the ingest route relative to a server's base URL.
pub const INGEST_PATH: &str = "/api/stream/ingest";

/// Something that accepts frames from the simulator.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Submit one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame was rejected or could not be delivered.
    async fn submit(&self, frame: &DiagnosticFrame) -> Result<()>;

    /// Human-readable destination, for logging.
    fn describe(&self) -> String;
}

/// Submits frames to an in-process [`TelemetryService`].
#[derive(Debug, Clone)]
pub struct BufferSink {
    service: TelemetryService,
}

impl BufferSink {
    /// Create a sink over a service.
    #[must_use]
    pub fn new(service: TelemetryService) -> Self {
        Self { service }
    }

    /// The service frames are submitted to.
    #[must_use]
    pub fn service(&self) -> &TelemetryService {
        &self.service
    }
}

#[async_trait]
impl FrameSink for BufferSink {
    async fn submit(&self, frame: &DiagnosticFrame) -> Result<()> {
        self.service.ingest(IngestRequest::from_frame(frame))?;
        Ok(())
    }

    fn describe(&self) -> String {
        "in-process buffer".to_string()
    }
}

/// Posts frames to a remote ingestion boundary.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSink {
    /// Create a sink posting to `<base_url>/api/stream/ingest`.
    ///
    /// A submission that gets no complete response within `timeout` fails
    /// with [`Error::Http`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `base_url` is not an http(s) URL, or
    /// [`Error::Http`] if the client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = base_url.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::validation(
                "target_url",
                format!("'{base_url}' is not an http(s) URL"),
            ));
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("fleetpulse/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{base}{INGEST_PATH}"),
        })
    }

    /// Full URL frames are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl FrameSink for HttpSink {
    async fn submit(&self, frame: &DiagnosticFrame) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&IngestRequest::from_frame(frame))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(frame = %frame.id(), %status, "frame accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use chrono::Utc;
    use tokio::net::TcpListener;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Accept connections and hold them open without ever answering.
    async fn silent_listener() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_buffer_sink_ingests() {
        let sink = BufferSink::new(TelemetryService::new(10));
        let frame = DiagnosticFrame::new(
            "CAT320",
            "0x0CF00400",
            &codec::encode(1600.0, 90.0, 60.0, 80.0),
            Utc::now(),
        )
        .unwrap();

        sink.submit(&frame).await.unwrap();
        let latest = sink.service().latest("CAT320").unwrap();
        assert_eq!(latest.payload(), frame.payload());
    }

    #[tokio::test]
    async fn test_buffer_sink_rejects_bad_protocol_id() {
        let sink = BufferSink::new(TelemetryService::new(10));
        let frame = DiagnosticFrame::from_bytes("CAT320", "not-hex", [0; 8], Utc::now());

        let err = sink.submit(&frame).await.unwrap_err();
        assert!(err.is_client_error());
        assert!(sink.service().latest("CAT320").is_none());
    }

    #[test]
    fn test_http_sink_endpoint() {
        let sink = HttpSink::new("http://localhost:5038/", TIMEOUT).unwrap();
        assert_eq!(sink.endpoint(), "http://localhost:5038/api/stream/ingest");
        assert_eq!(sink.describe(), sink.endpoint());
    }

    #[test]
    fn test_http_sink_rejects_non_http_url() {
        assert!(HttpSink::new("localhost:5038", TIMEOUT).is_err());
        assert!(HttpSink::new("", TIMEOUT).is_err());
    }

    #[tokio::test]
    async fn test_http_sink_posts_to_server() {
        let service = TelemetryService::new(10);
        let state = crate::server::AppState::new(service.clone(), 60);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, crate::server::router(state))
                .await
                .unwrap();
        });

        let sink = HttpSink::new(&format!("http://{addr}"), TIMEOUT).unwrap();
        let frame = DiagnosticFrame::new(
            "KOMATSU350",
            "0x0CF00400",
            &codec::encode(1200.0, 85.0, 64.0, 90.0),
            Utc::now(),
        )
        .unwrap();
        sink.submit(&frame).await.unwrap();
        assert_eq!(service.latest("KOMATSU350").unwrap().payload(), frame.payload());

        let bad = DiagnosticFrame::from_bytes("KOMATSU350", "zz", [0; 8], Utc::now());
        let err = sink.submit(&bad).await.unwrap_err();
        assert!(matches!(err, Error::Rejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_http_sink_times_out_on_silent_server() {
        let addr = silent_listener().await;
        let sink = HttpSink::new(&format!("http://{addr}"), Duration::from_millis(100)).unwrap();
        let frame = DiagnosticFrame::new(
            "VOLVO240",
            "0x0CF00400",
            &codec::encode(900.0, 88.0, 60.0, 70.0),
            Utc::now(),
        )
        .unwrap();

        let result = tokio::time::timeout(TIMEOUT, sink.submit(&frame))
            .await
            .expect("submit should give up before the outer timeout");
        assert!(matches!(result, Err(Error::Http(_))));
    }
}
