// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Collector wire representation of spans and the mapping onto it.
//!
//! The collector ingests msgpack-encoded lists of trace chunks on
//! `/v0.1/traces`; each chunk is a list of [`WireSpan`]. Fields that hold
//! their default value are omitted from the payload.

use crate::trace::{AttributeValue, SpanData, SpanKind, SpanStatus};
use serde::Serialize;
use std::collections::HashMap;
use std::time::UNIX_EPOCH;

fn is_default<T: Default + PartialEq>(t: &T) -> bool {
    t == &T::default()
}

fn serialize_lower_64_bits<S>(v: &u128, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(*v as u64)
}

/// A span in the collector's wire format.
///
/// The collector keys traces on the lower 64 bits of the trace id; the full
/// 128-bit id is preserved in `meta` by the mapping when the upper half is
/// non-zero.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct WireSpan {
    pub service: String,
    pub name: String,
    pub resource: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub r#type: String,
    #[serde(serialize_with = "serialize_lower_64_bits")]
    pub trace_id: u128,
    pub span_id: u64,
    #[serde(skip_serializing_if = "is_default")]
    pub parent_id: u64,
    /// Start of the span, in unix nanoseconds.
    pub start: i64,
    /// Duration of the span, in nanoseconds.
    pub duration: i64,
    #[serde(skip_serializing_if = "is_default")]
    pub error: i32,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub meta: HashMap<String, String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metrics: HashMap<String, f64>,
}

/// Meta key carrying the upper 64 bits of a 128-bit trace id.
const TRACE_ID_HIGH_KEY: &str = "_trace.id_high";
/// Meta key carrying the span kind.
const SPAN_KIND_KEY: &str = "span.kind";
/// Meta key carrying the status error message.
const ERROR_MESSAGE_KEY: &str = "error.message";

impl WireSpan {
    /// Map a finished span onto the wire format.
    ///
    /// `service` comes from exporter configuration rather than the span: the
    /// collector attributes every span in a payload to the reporting service.
    ///
    /// Mapping rules:
    /// - string and boolean attributes land in `meta`, numeric attributes in
    ///   `metrics` (integers are widened to f64)
    /// - the span kind lands in `meta` except for internal spans
    /// - an error status sets `error` and `meta["error.message"]`, overriding
    ///   a same-named attribute
    /// - spans without an end timestamp, or whose end precedes their start,
    ///   get a zero duration; timestamps before the unix epoch clamp to zero
    pub fn from_span(span: &SpanData, service: &str) -> WireSpan {
        let start = span
            .start
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos().min(i64::MAX as u128) as i64);
        let duration = span
            .end
            .and_then(|end| end.duration_since(span.start).ok())
            .map_or(0, |d| d.as_nanos().min(i64::MAX as u128) as i64);

        let mut meta = HashMap::new();
        let mut metrics = HashMap::new();
        for (key, value) in &span.attributes {
            match value {
                AttributeValue::Str(s) => {
                    meta.insert(key.clone(), s.clone());
                }
                AttributeValue::Bool(b) => {
                    meta.insert(key.clone(), b.to_string());
                }
                AttributeValue::Int(i) => {
                    metrics.insert(key.clone(), *i as f64);
                }
                AttributeValue::Double(d) => {
                    metrics.insert(key.clone(), *d);
                }
            }
        }

        if span.kind != SpanKind::Internal {
            meta.insert(SPAN_KIND_KEY.to_owned(), span.kind.as_str().to_owned());
        }

        let trace_id_high = (span.trace_id >> 64) as u64;
        if trace_id_high != 0 {
            meta.insert(TRACE_ID_HIGH_KEY.to_owned(), format!("{trace_id_high:x}"));
        }

        let mut error = 0;
        if let SpanStatus::Error { message } = &span.status {
            error = 1;
            meta.insert(ERROR_MESSAGE_KEY.to_owned(), message.clone());
        }

        WireSpan {
            service: service.to_owned(),
            name: span.name.clone(),
            resource: span.resource.clone(),
            r#type: String::new(),
            trace_id: span.trace_id,
            span_id: span.span_id,
            parent_id: span.parent_id,
            start,
            duration,
            error,
            meta,
            metrics,
        }
    }
}

/// Map whole trace chunks onto the wire format.
pub fn to_wire_chunks(traces: &[Vec<SpanData>], service: &str) -> Vec<Vec<WireSpan>> {
    traces
        .iter()
        .map(|chunk| {
            chunk
                .iter()
                .map(|span| WireSpan::from_span(span, service))
                .collect()
        })
        .collect()
}

/// Serialize trace chunks into the msgpack payload body sent to the collector.
pub fn encode_traces(traces: &[Vec<WireSpan>]) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec_named(traces)
}
