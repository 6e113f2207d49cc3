// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
pub mod builder;
pub mod collector_response;
pub mod error;
mod transport;

// Re-export the builder
pub use builder::SpanExporterBuilder;

use self::collector_response::CollectorResponse;
use self::error::{CollectorErrorKind, ExporterError, RequestError};
use self::transport::TransportClient;
use crate::health_metrics::{self, HealthMetric};
use crate::send_with_retry::{
    send_with_retry, RetryStrategy, SendWithRetryError, SendWithRetryResult,
};
use crate::trace::SpanData;
use crate::wire::{self, WireSpan};
use either::Either;
use http_body_util::BodyExt;
use hyper::header::CONTENT_TYPE;
use hyper::http::uri::PathAndQuery;
use hyper::Uri;
use std::collections::HashMap;
use std::io;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracesink_common::http_client::{self, HttpResponse};
use tracesink_common::tag::Tag;
use tracesink_common::{error_handler, header, tag, Endpoint, MutexExt};
use tracing::{debug, error, info, warn};

const TRACES_ENDPOINT: &str = "/v0.1/traces";

/// Add a path to the URL.
///
/// # Arguments
///
/// * `url` - The URL to which the path is to be added.
/// * `path` - The path to be added to the URL.
fn add_path(url: &Uri, path: &str) -> Uri {
    let p_and_q = url.path_and_query();

    #[allow(clippy::unwrap_used)]
    let new_p_and_q = match p_and_q {
        Some(pq) => {
            let p = pq.path();
            let mut p = p.strip_suffix('/').unwrap_or(p).to_owned();
            p.push_str(path);

            PathAndQuery::from_str(p.as_str())
        }
        None => PathAndQuery::from_str(path),
    }
    .unwrap();
    let mut parts = url.clone().into_parts();
    parts.path_and_query = Some(new_p_and_q);
    #[allow(clippy::unwrap_used)]
    Uri::from_parts(parts).unwrap()
}

/// Identity of the tracer reporting through this exporter, forwarded to the
/// collector as `collector-meta-*` headers.
#[derive(Clone, Default, Debug)]
pub struct TracerMetadata {
    pub hostname: String,
    pub env: String,
    pub app_version: String,
    pub runtime_id: String,
    pub service: String,
    pub tracer_version: String,
    pub language: String,
    pub language_version: String,
}

impl<'a> From<&'a TracerMetadata> for HashMap<&'static str, String> {
    fn from(metadata: &'a TracerMetadata) -> HashMap<&'static str, String> {
        let fields = [
            ("collector-meta-lang", &metadata.language),
            ("collector-meta-lang-version", &metadata.language_version),
            ("collector-meta-tracer-version", &metadata.tracer_version),
            ("collector-meta-service", &metadata.service),
            ("collector-meta-hostname", &metadata.hostname),
            ("collector-meta-env", &metadata.env),
            ("collector-meta-app-version", &metadata.app_version),
            ("collector-meta-runtime-id", &metadata.runtime_id),
        ];
        fields
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key, value.clone()))
            .collect()
    }
}

/// The SpanExporter ingests finished spans from the tracing library, maps them onto the
/// collector's wire format and forwards the msgpack payload over HTTP.
///
/// The public API is synchronous; network interaction runs on a tokio runtime owned by the
/// exporter with a single worker thread. Transport failures are returned to the caller and
/// additionally forwarded to the global error handler, with no recovery beyond the configured
/// retry policy.
pub struct SpanExporter {
    endpoint: Endpoint,
    metadata: TracerMetadata,
    runtime: Arc<Mutex<Option<Arc<Runtime>>>>,
    /// None if statsd is disabled
    statsd: Option<tracesink_statsd::Flusher>,
    common_stats_tags: Vec<Tag>,
    retry_strategy: RetryStrategy,
    health_metrics_enabled: bool,
}

impl SpanExporter {
    #[allow(missing_docs)]
    pub fn builder() -> SpanExporterBuilder {
        SpanExporterBuilder::default()
    }

    /// Get existing runtime or create a new one
    fn runtime(&self) -> Result<Arc<Runtime>, ExporterError> {
        let mut runtime_guard = self.runtime.lock_or_panic();
        match runtime_guard.as_ref() {
            Some(runtime) => Ok(runtime.clone()),
            None => {
                let runtime = Arc::new(
                    tokio::runtime::Builder::new_multi_thread()
                        .worker_threads(1)
                        .enable_all()
                        .build()?,
                );
                *runtime_guard = Some(runtime.clone());
                Ok(runtime)
            }
        }
    }

    /// Map finished spans onto the wire format and send them to the collector.
    ///
    /// # Arguments
    /// * `traces`: A list of trace chunks. Each trace chunk is a list of spans.
    ///
    /// # Returns
    /// * Ok(CollectorResponse): The response from the collector
    /// * Err(ExporterError): An error detailing what went wrong in the process
    pub fn send(&self, traces: Vec<Vec<SpanData>>) -> Result<CollectorResponse, ExporterError> {
        let chunks = wire::to_wire_chunks(&traces, &self.metadata.service);
        self.send_wire(chunks)
    }

    /// Send trace chunks that are already in the collector's wire representation.
    pub fn send_wire(
        &self,
        chunks: Vec<Vec<WireSpan>>,
    ) -> Result<CollectorResponse, ExporterError> {
        let chunk_count = chunks.len();
        let payload = wire::encode_traces(&chunks).map_err(|e| {
            error!(error = %e, "Failed to serialize trace payload");
            self.emit_metric(
                HealthMetric::Count(health_metrics::SERIALIZE_TRACES_ERRORS, 1),
                None,
            );
            ExporterError::Serialization(e)
        })?;

        let headers = self.build_traces_headers(chunk_count);
        let endpoint = Endpoint {
            url: self.traces_url(),
            ..self.endpoint.clone()
        };

        let response = self.runtime()?.block_on(async {
            self.send_payload(&endpoint, payload, headers, chunk_count)
                .await
        })?;

        if response.body.is_empty() {
            return Err(ExporterError::Collector(CollectorErrorKind::EmptyResponse));
        }
        Ok(response)
    }

    /// Forward an already msgpack-encoded trace payload to the collector without touching it.
    ///
    /// Unlike [`Self::send`], this path performs a single attempt with no retries.
    pub fn send_raw(
        &self,
        data: &[u8],
        trace_count: usize,
    ) -> Result<CollectorResponse, ExporterError> {
        let response = self.runtime()?.block_on(async {
            let req = TransportClient::new(&self.metadata).build_trace_request(
                data,
                trace_count,
                self.traces_url(),
            )?;
            match http_client::new_default_client().request(req).await {
                Ok(response) => {
                    let response = http_client::into_response(response);
                    if response.status().is_success() {
                        self.handle_collector_response(trace_count, response).await
                    } else {
                        let status = response.status();
                        warn!(
                            status = status.as_u16(),
                            "HTTP error response received from collector"
                        );
                        self.emit_metric(
                            HealthMetric::Count(health_metrics::TRANSPORT_TRACES_FAILED, 1),
                            Some(vec![&status_type_tag(status)]),
                        );
                        let body = read_body_lossy(response).await?;
                        Err(ExporterError::Request(RequestError::new(status, &body)))
                    }
                }
                Err(err) => {
                    error!(error = %err, "Request to collector failed");
                    error_handler::handle_error(&err);
                    self.emit_metric(
                        HealthMetric::Count(health_metrics::TRANSPORT_TRACES_FAILED, 1),
                        Some(vec![&tag!("type", "network")]),
                    );
                    Err(ExporterError::from(err))
                }
            }
        })?;

        if response.body.is_empty() {
            return Err(ExporterError::Collector(CollectorErrorKind::EmptyResponse));
        }
        Ok(response)
    }

    /// Safely shutdown the SpanExporter, releasing its runtime.
    ///
    /// With a timeout, the call errors if the runtime has not finished shutting down in time;
    /// the shutdown itself keeps going in the background.
    pub fn shutdown(self, timeout: Option<Duration>) -> Result<(), ExporterError> {
        let runtime = self.runtime.lock_or_panic().take();
        let Some(runtime) = runtime else {
            return Ok(());
        };

        match timeout {
            None => {
                drop(runtime);
                Ok(())
            }
            Some(timeout) => {
                let (tx, rx) = std::sync::mpsc::channel();
                std::thread::spawn(move || {
                    drop(runtime);
                    let _ = tx.send(());
                });
                rx.recv_timeout(timeout)
                    .map_err(|_| ExporterError::Io(io::Error::from(io::ErrorKind::TimedOut)))
            }
        }
    }

    /// Build HTTP headers for the traces request
    fn build_traces_headers(&self, chunk_count: usize) -> HashMap<&'static str, String> {
        let mut headers: HashMap<&'static str, String> = (&self.metadata).into();
        headers.insert(header::COLLECTOR_TRACE_COUNT_STR, chunk_count.to_string());
        headers.insert(
            CONTENT_TYPE.as_str(),
            header::APPLICATION_MSGPACK_STR.to_string(),
        );
        headers
    }

    /// Send the serialized payload with retries and emit transport health metrics.
    async fn send_payload(
        &self,
        endpoint: &Endpoint,
        payload: Vec<u8>,
        headers: HashMap<&'static str, String>,
        chunks: usize,
    ) -> Result<CollectorResponse, ExporterError> {
        let payload_len = payload.len();

        let result = send_with_retry(endpoint, payload, &headers, &self.retry_strategy).await;
        self.emit_attempt_metrics(&result, payload_len, chunks);

        match result {
            Ok((response, _)) => self.handle_collector_response(chunks, response).await,
            Err(err) => self.handle_send_error(err, payload_len, chunks).await,
        }
    }

    /// Emit the per-attempt metrics shared by every send outcome
    fn emit_attempt_metrics(
        &self,
        result: &SendWithRetryResult,
        payload_len: usize,
        chunks: usize,
    ) {
        let attempts = match result {
            Ok((_, attempts)) => *attempts,
            Err(
                SendWithRetryError::Http(_, attempts)
                | SendWithRetryError::Timeout(attempts)
                | SendWithRetryError::Network(_, attempts)
                | SendWithRetryError::Build(attempts),
            ) => *attempts,
        };
        self.emit_metric(
            HealthMetric::Distribution(health_metrics::TRANSPORT_REQUESTS, attempts as i64),
            None,
        );
        self.emit_metric(
            HealthMetric::Distribution(health_metrics::TRANSPORT_SENT_BYTES, payload_len as i64),
            None,
        );
        self.emit_metric(
            HealthMetric::Distribution(health_metrics::TRANSPORT_TRACES_SENT, chunks as i64),
            None,
        );
    }

    /// Handle a response the collector accepted at the transport level
    async fn handle_collector_response(
        &self,
        chunks: usize,
        response: HttpResponse,
    ) -> Result<CollectorResponse, ExporterError> {
        let status = response.status();
        let body = match response.into_body().collect().await {
            Ok(body) => String::from_utf8_lossy(&body.to_bytes()).to_string(),
            Err(err) => {
                error!(?err, "Error reading collector response body");
                self.emit_metric(
                    HealthMetric::Count(health_metrics::TRANSPORT_TRACES_FAILED, 1),
                    Some(vec![&tag!("type", "response_body")]),
                );
                return Err(ExporterError::from(err));
            }
        };

        info!(
            chunks = chunks,
            status = %status,
            "Trace chunks sent successfully to collector"
        );
        self.emit_metric(
            HealthMetric::Count(health_metrics::TRANSPORT_TRACES_SUCCESSFUL, chunks as i64),
            None,
        );
        Ok(CollectorResponse::from(body))
    }

    /// Handle errors from the send with retry operation
    async fn handle_send_error(
        &self,
        err: SendWithRetryError,
        payload_len: usize,
        chunks: usize,
    ) -> Result<CollectorResponse, ExporterError> {
        error!(?err, "Error sending traces");
        error_handler::handle_error(&err);

        let type_tag = error_type_tag(&err);
        self.emit_metric(
            HealthMetric::Count(health_metrics::TRANSPORT_TRACES_FAILED, 1),
            Some(vec![&type_tag]),
        );

        match err {
            SendWithRetryError::Http(response, _) => {
                let status = response.status();
                if counts_as_dropped(status) {
                    self.emit_dropped_metrics(payload_len, chunks);
                }
                let body = read_body_lossy(response).await?;
                Err(ExporterError::Request(RequestError::new(status, &body)))
            }
            SendWithRetryError::Timeout(_) => {
                self.emit_dropped_metrics(payload_len, chunks);
                Err(ExporterError::from(io::Error::from(io::ErrorKind::TimedOut)))
            }
            SendWithRetryError::Network(err, _) => {
                self.emit_dropped_metrics(payload_len, chunks);
                Err(ExporterError::from(err))
            }
            SendWithRetryError::Build(_) => {
                self.emit_dropped_metrics(payload_len, chunks);
                Err(ExporterError::from(io::Error::from(io::ErrorKind::Other)))
            }
        }
    }

    fn emit_dropped_metrics(&self, payload_len: usize, chunks: usize) {
        self.emit_metric(
            HealthMetric::Distribution(health_metrics::TRANSPORT_DROPPED_BYTES, payload_len as i64),
            None,
        );
        self.emit_metric(
            HealthMetric::Distribution(health_metrics::TRANSPORT_TRACES_DROPPED, chunks as i64),
            None,
        );
    }

    /// Emit a health metric to statsd
    fn emit_metric(&self, metric: HealthMetric, custom_tags: Option<Vec<&Tag>>) {
        if !self.health_metrics_enabled {
            return;
        }
        if let Some(flusher) = &self.statsd {
            let tags = match &custom_tags {
                None => Either::Left(self.common_stats_tags.iter()),
                Some(custom) => {
                    Either::Right(self.common_stats_tags.iter().chain(custom.iter().copied()))
                }
            };
            let tags: Vec<Tag> = tags.into_iter().cloned().collect();
            match metric {
                HealthMetric::Count(name, c) => {
                    flusher.send(vec![tracesink_statsd::StatsAction::Count(name, c, tags)])
                }
                HealthMetric::Distribution(name, value) => flusher.send(vec![
                    tracesink_statsd::StatsAction::Distribution(name, value as f64, tags),
                ]),
            }
        } else {
            debug!(
                metric = ?metric,
                "Skipping metric emission - statsd client not configured"
            );
        }
    }

    fn traces_url(&self) -> Uri {
        add_path(&self.endpoint.url, TRACES_ENDPOINT)
    }
}

/// Payloads rejected with 404 or 415 are endpoint or format negotiation issues, not drops.
fn counts_as_dropped(status: hyper::StatusCode) -> bool {
    !matches!(status.as_u16(), 404 | 415)
}

fn status_type_tag(status: hyper::StatusCode) -> Tag {
    Tag::new("type", status.as_str()).unwrap_or_else(|_| tag!("type", "unknown"))
}

fn error_type_tag(err: &SendWithRetryError) -> Tag {
    match err {
        SendWithRetryError::Http(response, _) => status_type_tag(response.status()),
        SendWithRetryError::Timeout(_) => tag!("type", "timeout"),
        SendWithRetryError::Network(_, _) => tag!("type", "network"),
        SendWithRetryError::Build(_) => tag!("type", "build"),
    }
}

async fn read_body_lossy(response: HttpResponse) -> Result<String, ExporterError> {
    match response.into_body().collect().await {
        Ok(body) => Ok(String::from_utf8_lossy(&body.to_bytes()).to_string()),
        Err(err) => {
            error!(?err, "Error reading collector response body");
            Err(ExporterError::from(err))
        }
    }
}
