// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use tracesink_export::exporter::SpanExporter;
use tracesink_export::trace::{AttributeValue, SpanData, SpanKind, SpanStatus};

fn get_span(trace_id: u128, span_id: u64) -> SpanData {
    let start = SystemTime::now();
    SpanData {
        trace_id,
        span_id,
        parent_id: span_id.saturating_sub(1),
        name: format!("test-name-{}", span_id % 2),
        resource: format!("test-resource-{}", (span_id as u128 + trace_id) % 3),
        kind: SpanKind::Server,
        start,
        end: Some(start + Duration::from_millis(trace_id as u64 % 3 * 10 + span_id)),
        attributes: HashMap::from([
            ("component".to_string(), AttributeValue::from("demo")),
            ("retries".to_string(), AttributeValue::from(1i64)),
        ]),
        status: if trace_id % 10 == 0 {
            SpanStatus::Error {
                message: "simulated failure".to_string(),
            }
        } else {
            SpanStatus::Ok
        },
    }
}

fn main() {
    let mut builder = SpanExporter::builder();
    builder
        .set_url("http://localhost:9130")
        .set_hostname("test")
        .set_env("testing")
        .set_app_version(env!("CARGO_PKG_VERSION"))
        .set_service("tracesink-demo")
        .set_tracer_version(env!("CARGO_PKG_VERSION"))
        .set_language("rust")
        .set_language_version(env!("CARGO_PKG_RUST_VERSION"));
    let exporter = builder.build().unwrap();

    let mut traces = Vec::new();
    for trace_id in 1..=10 {
        let mut trace = Vec::new();
        for span_id in 1..=100 {
            trace.push(get_span(trace_id, span_id));
        }
        traces.push(trace);
    }

    let response = exporter.send(traces).unwrap();
    println!("collector response: {}", response.body);
    exporter.shutdown(None).unwrap();
}
