// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::exporter::error::ExporterError;
use crate::exporter::TracerMetadata;
use hyper::Uri;
use std::collections::HashMap;
use tracesink_common::header;
use tracesink_common::http_client::{Body, HttpRequest};

/// Transport client for span exporter operations.
///
/// This struct is responsible for building HTTP requests for trace data.
/// Response handling and metric emission are handled by SpanExporter.
pub(super) struct TransportClient<'a> {
    metadata: &'a TracerMetadata,
}

impl<'a> TransportClient<'a> {
    /// Create a new transport client
    pub(super) fn new(metadata: &'a TracerMetadata) -> Self {
        Self { metadata }
    }

    /// Build HTTP request for sending trace data to the collector
    pub(super) fn build_trace_request(
        &self,
        data: &[u8],
        trace_count: usize,
        uri: Uri,
    ) -> Result<HttpRequest, ExporterError> {
        let mut builder = hyper::Request::builder()
            .uri(uri)
            .method(hyper::Method::POST)
            .header(
                hyper::header::USER_AGENT,
                concat!("tracesink-export/", env!("CARGO_PKG_VERSION")),
            );

        // Add metadata headers
        let headers: HashMap<&'static str, String> = self.metadata.into();
        for (key, value) in &headers {
            builder = builder.header(*key, value);
        }

        // Add trace-specific headers
        builder = builder
            .header(hyper::header::CONTENT_TYPE, header::APPLICATION_MSGPACK_STR)
            .header(header::COLLECTOR_TRACE_COUNT_STR, trace_count.to_string());

        Ok(builder.body(Body::from_bytes(bytes::Bytes::copy_from_slice(data)))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::TracerMetadata;

    fn create_test_metadata() -> TracerMetadata {
        TracerMetadata {
            hostname: "test-host".to_string(),
            env: "test".to_string(),
            app_version: "1.0.0".to_string(),
            runtime_id: "test-runtime".to_string(),
            service: "test-service".to_string(),
            tracer_version: "1.0.0".to_string(),
            language: "rust".to_string(),
            language_version: "1.70.0".to_string(),
        }
    }

    #[test]
    fn test_build_trace_request() {
        let metadata = create_test_metadata();
        let client = TransportClient::new(&metadata);
        let uri = "http://localhost:9130/v0.1/traces".parse().unwrap();
        let data = b"test payload";
        let trace_count = 5;

        let request = client.build_trace_request(data, trace_count, uri).unwrap();

        assert_eq!(request.method(), hyper::Method::POST);
        assert_eq!(request.uri().path(), "/v0.1/traces");

        let headers = request.headers();
        assert_eq!(
            headers.get("content-type").unwrap(),
            "application/msgpack"
        );
        assert_eq!(headers.get("x-collector-trace-count").unwrap(), "5");
        assert!(headers
            .get("user-agent")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("tracesink-export/"));

        assert_eq!(headers.get("collector-meta-lang").unwrap(), "rust");
        assert_eq!(headers.get("collector-meta-tracer-version").unwrap(), "1.0.0");
        assert_eq!(headers.get("collector-meta-service").unwrap(), "test-service");
    }

    #[test]
    fn test_empty_metadata_fields_omitted() {
        let metadata = TracerMetadata {
            language: "rust".to_string(),
            ..Default::default()
        };

        let client = TransportClient::new(&metadata);
        let uri = "http://localhost:9130/v0.1/traces".parse().unwrap();
        let request = client.build_trace_request(b"test", 1, uri).unwrap();

        let headers = request.headers();
        assert_eq!(headers.get("collector-meta-lang").unwrap(), "rust");
        assert!(!headers.contains_key("collector-meta-service"));
        assert!(!headers.contains_key("collector-meta-tracer-version"));
    }
}
