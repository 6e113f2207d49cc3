// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The in-memory representation of a finished span, as handed to the exporter
//! by the tracing library. This is the SDK-facing side of the binding; the
//! collector-facing side lives in [`crate::wire`].

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Role of a span in a trace.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SpanKind {
    #[default]
    Internal,
    Client,
    Server,
    Producer,
    Consumer,
}

impl SpanKind {
    /// Lowercase name used in span metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Internal => "internal",
            SpanKind::Client => "client",
            SpanKind::Server => "server",
            SpanKind::Producer => "producer",
            SpanKind::Consumer => "consumer",
        }
    }
}

/// Completion status of a span.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error {
        message: String,
    },
}

/// Value of a span attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Double(f64),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

/// A finished span as recorded by the tracing library.
///
/// `end` is optional because a tracer may export a span it force-finished
/// during shutdown; such spans are given a zero duration on the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanData {
    pub trace_id: u128,
    pub span_id: u64,
    /// Zero for root spans.
    pub parent_id: u64,
    pub name: String,
    /// Logical operation handled by the span, e.g. an endpoint or a query.
    pub resource: String,
    pub kind: SpanKind,
    pub start: SystemTime,
    pub end: Option<SystemTime>,
    pub attributes: HashMap<String, AttributeValue>,
    pub status: SpanStatus,
}

impl Default for SpanData {
    fn default() -> Self {
        SpanData {
            trace_id: 0,
            span_id: 0,
            parent_id: 0,
            name: String::new(),
            resource: String::new(),
            kind: SpanKind::default(),
            start: UNIX_EPOCH,
            end: None,
            attributes: HashMap::new(),
            status: SpanStatus::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_kind_names() {
        assert_eq!(SpanKind::Internal.as_str(), "internal");
        assert_eq!(SpanKind::Client.as_str(), "client");
        assert_eq!(SpanKind::Server.as_str(), "server");
        assert_eq!(SpanKind::Producer.as_str(), "producer");
        assert_eq!(SpanKind::Consumer.as_str(), "consumer");
    }

    #[test]
    fn test_attribute_value_from() {
        assert_eq!(AttributeValue::from("x"), AttributeValue::Str("x".into()));
        assert_eq!(AttributeValue::from(true), AttributeValue::Bool(true));
        assert_eq!(AttributeValue::from(3i64), AttributeValue::Int(3));
        assert_eq!(AttributeValue::from(0.5), AttributeValue::Double(0.5));
    }
}
