// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
#![deny(missing_docs)]

//! SpanExporter binds a tracing library's in-memory spans to the collector's
//! wire protocol: finished spans are mapped to their wire representation,
//! serialized as msgpack and handed to the HTTP transport client.

#[allow(missing_docs)]
pub mod exporter;
mod health_metrics;
#[allow(missing_docs)]
pub mod send_with_retry;
#[allow(missing_docs)]
pub mod trace;
#[allow(missing_docs)]
pub mod wire;
