// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use httpmock::prelude::*;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use tracesink_export::exporter::collector_response::CollectorResponse;
use tracesink_export::exporter::error::{CollectorErrorKind, ExporterError};
use tracesink_export::exporter::SpanExporter;
use tracesink_export::send_with_retry::{RetryBackoffType, RetryStrategy};
use tracesink_export::trace::{AttributeValue, SpanData, SpanKind, SpanStatus};
use tracesink_export::wire::{encode_traces, WireSpan};

const RATES_BODY: &str = r#"{
    "rate_by_service": {
        "service:test,env:staging": 1.0,
        "service:,env:": 0.8
    }
}"#;

fn build_test_exporter(url: &str) -> SpanExporter {
    let mut builder = SpanExporter::builder();
    builder
        .set_url(url)
        .set_service("test")
        .set_env("staging")
        .set_tracer_version("v0.1")
        .set_language("rust")
        .set_language_version("1.84.0")
        .set_retry_strategy(RetryStrategy::new(1, 10, RetryBackoffType::Constant, None));
    builder.build().unwrap()
}

fn finished_span(name: &str) -> SpanData {
    let start = SystemTime::now();
    SpanData {
        trace_id: 7,
        span_id: 1,
        name: name.to_string(),
        resource: "GET /status".to_string(),
        kind: SpanKind::Server,
        start,
        end: Some(start + Duration::from_millis(5)),
        attributes: HashMap::from([("component".to_string(), AttributeValue::from("http"))]),
        status: SpanStatus::Ok,
        ..Default::default()
    }
}

#[cfg_attr(miri, ignore)]
#[test]
fn test_send_traces() {
    let server = MockServer::start();

    let mock_traces = server.mock(|when, then| {
        when.method(POST)
            .path("/v0.1/traces")
            .header("content-type", "application/msgpack")
            .header("x-collector-trace-count", "1")
            .header("collector-meta-lang", "rust")
            .header("collector-meta-service", "test");
        then.status(200)
            .header("content-type", "application/json")
            .body(RATES_BODY);
    });

    let exporter = build_test_exporter(&server.url("/"));

    let response = exporter.send(vec![vec![finished_span("request")]]).unwrap();
    assert_eq!(response, CollectorResponse::from(RATES_BODY.to_string()));

    mock_traces.assert();
    exporter.shutdown(None).unwrap();
}

#[cfg_attr(miri, ignore)]
#[test]
fn test_send_empty_body_is_error() {
    let server = MockServer::start();

    let mock_traces = server.mock(|when, then| {
        when.method(POST).path("/v0.1/traces");
        then.status(200).body("");
    });

    let exporter = build_test_exporter(&server.url("/"));

    let result = exporter.send(vec![vec![finished_span("request")]]);
    assert!(matches!(
        result,
        Err(ExporterError::Collector(CollectorErrorKind::EmptyResponse))
    ));

    mock_traces.assert();
}

#[cfg_attr(miri, ignore)]
#[test]
fn test_send_error_status() {
    let server = MockServer::start();

    let mock_traces = server.mock(|when, then| {
        when.method(POST).path("/v0.1/traces");
        then.status(404).body("page not found");
    });

    let exporter = build_test_exporter(&server.url("/"));

    let result = exporter.send(vec![vec![finished_span("request")]]);
    match result {
        Err(ExporterError::Request(e)) => {
            assert_eq!(e.status(), 404);
            assert_eq!(e.msg(), "page not found");
        }
        _ => panic!("expected a request error"),
    }

    mock_traces.assert();
}

#[cfg_attr(miri, ignore)]
#[test]
fn test_send_retries_server_errors() {
    let server = MockServer::start();

    let mock_traces = server.mock(|when, then| {
        when.method(POST).path("/v0.1/traces");
        then.status(503).body("unavailable");
    });

    let mut builder = SpanExporter::builder();
    builder
        .set_url(&server.url("/"))
        .set_service("test")
        .set_retry_strategy(RetryStrategy::new(3, 10, RetryBackoffType::Constant, None));
    let exporter = builder.build().unwrap();

    let result = exporter.send(vec![vec![finished_span("request")]]);
    assert!(matches!(result, Err(ExporterError::Request(_))));

    assert_eq!(mock_traces.hits(), 3);
}

#[cfg_attr(miri, ignore)]
#[test]
fn test_send_raw() {
    let server = MockServer::start();

    let mock_traces = server.mock(|when, then| {
        when.method(POST)
            .path("/v0.1/traces")
            .header("content-type", "application/msgpack")
            .header("x-collector-trace-count", "2");
        then.status(200)
            .header("content-type", "application/json")
            .body("{}");
    });

    let exporter = build_test_exporter(&server.url("/"));

    let chunks = vec![
        vec![WireSpan {
            service: "test".to_string(),
            name: "op".to_string(),
            resource: "res".to_string(),
            duration: 10,
            ..Default::default()
        }],
        vec![WireSpan::default()],
    ];
    let payload = encode_traces(&chunks).unwrap();

    let response = exporter.send_raw(&payload, 2).unwrap();
    assert_eq!(response.body, "{}");

    mock_traces.assert();
}

#[cfg_attr(miri, ignore)]
#[test]
fn test_network_error() {
    // Bind a listener to grab a free port, then drop it so connections are refused.
    let refused_url = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };

    let exporter = build_test_exporter(&refused_url);

    let result = exporter.send(vec![vec![finished_span("request")]]);
    assert!(matches!(result, Err(ExporterError::Network(_))));
}

#[cfg_attr(miri, ignore)]
#[test]
fn test_shutdown_with_timeout() {
    let server = MockServer::start();

    let _mock_traces = server.mock(|when, then| {
        when.method(POST).path("/v0.1/traces");
        then.status(200).body(RATES_BODY);
    });

    let exporter = build_test_exporter(&server.url("/"));
    exporter.send(vec![vec![finished_span("request")]]).unwrap();

    // Nothing is in flight, so the grace period is not exhausted.
    exporter.shutdown(Some(Duration::from_secs(5))).unwrap();
}
