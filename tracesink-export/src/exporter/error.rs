// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use hyper::http::StatusCode;
use hyper::Error as HyperError;
use rmp_serde::encode::Error as EncodeError;
use std::error::Error;
use std::fmt::{Debug, Display};
use tracesink_common::http_client;

/// Represents different kinds of errors that can occur when interacting with the collector.
#[derive(Debug, PartialEq)]
pub enum CollectorErrorKind {
    /// Indicates that the collector returned an empty response.
    EmptyResponse,
}

impl Display for CollectorErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorErrorKind::EmptyResponse => write!(f, "Collector empty response"),
        }
    }
}

/// Represents different kinds of errors that can occur during the builder process.
#[derive(Debug, PartialEq)]
pub enum BuilderErrorKind {
    /// Represents an error when an invalid URI is provided.
    /// The associated `String` contains the underlying error message.
    InvalidUri(String),
    /// Indicates any incompatible configuration.
    InvalidConfiguration(String),
}

impl Display for BuilderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuilderErrorKind::InvalidUri(msg) => write!(f, "Invalid URI: {msg}"),
            BuilderErrorKind::InvalidConfiguration(msg) => {
                write!(f, "Invalid configuration: {msg}")
            }
        }
    }
}

/// Represents different kinds of network errors.
#[derive(Copy, Clone, Debug)]
pub enum NetworkErrorKind {
    /// Indicates an error with the body of the request/response.
    Body,
    /// Indicates that the request was canceled.
    Canceled,
    /// Indicates that the connection was closed.
    ConnectionClosed,
    /// Indicates a parsing error.
    Parse,
    /// Indicates that the request timed out.
    TimedOut,
    /// Indicates an unknown error.
    Unknown,
    /// Indicates that the status code is incorrect.
    WrongStatus,
}

/// Represents a network error, containing the kind of error and the source error.
#[derive(Debug)]
pub struct NetworkError {
    kind: NetworkErrorKind,
    source: anyhow::Error,
}

impl NetworkError {
    fn new_hyper(kind: NetworkErrorKind, source: HyperError) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    fn new_hyper_util(kind: NetworkErrorKind, source: hyper_util::client::legacy::Error) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> NetworkErrorKind {
        self.kind
    }
}

impl Error for NetworkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.chain().next()
    }
}

impl Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.source() {
            Some(source) => Display::fmt(source, f),
            None => write!(f, "network error"),
        }
    }
}

/// The collector responded with an error status code.
#[derive(Debug, PartialEq)]
pub struct RequestError {
    code: StatusCode,
    msg: String,
}

impl Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error code: {}, Response: {}", self.code, self.msg)
    }
}

impl RequestError {
    pub fn new(code: StatusCode, msg: &str) -> Self {
        Self {
            code,
            msg: msg.to_owned(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.code
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }
}

/// ExporterError holds the different types of errors that occur when handling spans.
#[derive(Debug)]
pub enum ExporterError {
    /// Error in collector response processing.
    Collector(CollectorErrorKind),
    /// Invalid builder input.
    Builder(BuilderErrorKind),
    /// Generic IO error.
    Io(std::io::Error),
    /// Network related error (i.e. hyper error).
    Network(NetworkError),
    /// Collector responded with an error code.
    Request(RequestError),
    /// Error in serialization of the mapped trace payload.
    Serialization(EncodeError),
}

impl Display for ExporterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExporterError::Collector(e) => Display::fmt(e, f),
            ExporterError::Builder(e) => Display::fmt(e, f),
            ExporterError::Io(e) => Display::fmt(e, f),
            ExporterError::Network(e) => Display::fmt(e, f),
            ExporterError::Request(e) => Display::fmt(e, f),
            ExporterError::Serialization(e) => write!(f, "Failed to serialize traces: {e}"),
        }
    }
}

impl Error for ExporterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExporterError::Io(e) => Some(e),
            ExporterError::Network(e) => Some(e),
            ExporterError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EncodeError> for ExporterError {
    fn from(value: EncodeError) -> Self {
        ExporterError::Serialization(value)
    }
}

impl From<hyper::http::uri::InvalidUri> for ExporterError {
    fn from(value: hyper::http::uri::InvalidUri) -> Self {
        ExporterError::Builder(BuilderErrorKind::InvalidUri(value.to_string()))
    }
}

impl From<http::Error> for ExporterError {
    fn from(value: http::Error) -> Self {
        ExporterError::Builder(BuilderErrorKind::InvalidConfiguration(value.to_string()))
    }
}

impl From<http_client::Error> for ExporterError {
    fn from(err: http_client::Error) -> Self {
        match err {
            http_client::Error::Hyper(e) => e.into(),
            http_client::Error::Legacy(e) => e.into(),
            http_client::Error::Other(e) => ExporterError::Network(NetworkError {
                kind: NetworkErrorKind::Unknown,
                source: e,
            }),
            http_client::Error::Infallible(e) => match e {},
        }
    }
}

impl From<hyper_util::client::legacy::Error> for ExporterError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        if err.is_connect() {
            return ExporterError::Network(NetworkError::new_hyper_util(
                NetworkErrorKind::ConnectionClosed,
                err,
            ));
        }
        if let Some(e) = err.source().and_then(|e| e.downcast_ref::<HyperError>()) {
            if e.is_parse() {
                return ExporterError::Network(NetworkError::new_hyper_util(
                    NetworkErrorKind::Parse,
                    err,
                ));
            } else if e.is_canceled() {
                return ExporterError::Network(NetworkError::new_hyper_util(
                    NetworkErrorKind::Canceled,
                    err,
                ));
            } else if e.is_incomplete_message() || e.is_body_write_aborted() {
                return ExporterError::Network(NetworkError::new_hyper_util(
                    NetworkErrorKind::Body,
                    err,
                ));
            } else if e.is_parse_status() {
                return ExporterError::Network(NetworkError::new_hyper_util(
                    NetworkErrorKind::WrongStatus,
                    err,
                ));
            } else if e.is_timeout() {
                return ExporterError::Network(NetworkError::new_hyper_util(
                    NetworkErrorKind::TimedOut,
                    err,
                ));
            }
        }
        ExporterError::Network(NetworkError::new_hyper_util(NetworkErrorKind::Unknown, err))
    }
}

impl From<HyperError> for ExporterError {
    fn from(err: HyperError) -> Self {
        if err.is_parse() {
            ExporterError::Network(NetworkError::new_hyper(NetworkErrorKind::Parse, err))
        } else if err.is_canceled() {
            ExporterError::Network(NetworkError::new_hyper(NetworkErrorKind::Canceled, err))
        } else if err.is_incomplete_message() || err.is_body_write_aborted() {
            ExporterError::Network(NetworkError::new_hyper(NetworkErrorKind::Body, err))
        } else if err.is_parse_status() {
            ExporterError::Network(NetworkError::new_hyper(NetworkErrorKind::WrongStatus, err))
        } else if err.is_timeout() {
            ExporterError::Network(NetworkError::new_hyper(NetworkErrorKind::TimedOut, err))
        } else {
            ExporterError::Network(NetworkError::new_hyper(NetworkErrorKind::Unknown, err))
        }
    }
}

impl From<std::io::Error> for ExporterError {
    fn from(err: std::io::Error) -> Self {
        ExporterError::Io(err)
    }
}
