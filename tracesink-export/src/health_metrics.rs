// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Health metrics emitted by the span exporter.
//!
//! These are sent to statsd to give visibility into the exporter's behavior.
//! They are disabled by default and must be enabled through
//! `SpanExporterBuilder::enable_health_metrics()` together with a statsd URL.
//!
//! All metrics carry the `tracesink_version` tag. Error metrics add a
//! `type:<status_code>` or `type:<error_type>` tag.

/// Number of trace serialization errors.
///
/// Count, emitted when msgpack serialization of the mapped payload fails.
pub(crate) const SERIALIZE_TRACES_ERRORS: &str = "tracesink.exporter.serialize.errors";

/// Number of trace chunks included in HTTP requests to the collector,
/// emitted for every send attempt regardless of outcome. Distribution.
pub(crate) const TRANSPORT_TRACES_SENT: &str = "tracesink.exporter.transport.traces.sent";

/// Number of trace chunks successfully accepted by the collector (2xx). Count.
pub(crate) const TRANSPORT_TRACES_SUCCESSFUL: &str =
    "tracesink.exporter.transport.traces.successful";

/// Number of errors encountered while sending traces to the collector. Count.
///
/// Emitted for HTTP error responses, network errors and timeouts, with a
/// `type` tag classifying the failure.
pub(crate) const TRANSPORT_TRACES_FAILED: &str = "tracesink.exporter.transport.traces.failed";

/// Number of trace chunks dropped due to errors. Distribution.
///
/// 404 and 415 responses are excluded: they indicate an endpoint or format
/// negotiation problem rather than a dropped payload.
pub(crate) const TRANSPORT_TRACES_DROPPED: &str = "tracesink.exporter.transport.traces.dropped";

/// Size in bytes of HTTP payloads sent to the collector, emitted for every
/// send attempt regardless of outcome. Distribution.
pub(crate) const TRANSPORT_SENT_BYTES: &str = "tracesink.exporter.transport.sent.bytes";

/// Size in bytes of HTTP payloads dropped due to errors. Distribution.
/// Subject to the same 404/415 exclusion as `transport.traces.dropped`.
pub(crate) const TRANSPORT_DROPPED_BYTES: &str = "tracesink.exporter.transport.dropped.bytes";

/// Number of HTTP requests made to the collector, counting every attempt
/// including retries. Distribution.
pub(crate) const TRANSPORT_REQUESTS: &str = "tracesink.exporter.transport.requests";

#[derive(Debug)]
pub(crate) enum HealthMetric {
    Count(&'static str, i64),
    Distribution(&'static str, i64),
}
