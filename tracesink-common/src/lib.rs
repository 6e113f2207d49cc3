// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use hyper::http::HeaderValue;
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::{Mutex, MutexGuard};
use std::{borrow::Cow, ops::Deref, str::FromStr};

pub mod error_handler;
pub mod http_client;
#[macro_use]
pub mod tag;

/// Extension trait for `Mutex` to provide a method that acquires a lock, panicking if the lock is
/// poisoned.
///
/// This helper function is intended to be used to avoid having to add many
/// `#[allow(clippy::unwrap_used)]` annotations if there are a lot of usages of `Mutex`.
///
/// # Panics
///
/// This function will panic if the `Mutex` is poisoned.
pub trait MutexExt<T> {
    fn lock_or_panic(&self) -> MutexGuard<'_, T>;
}

impl<T> MutexExt<T> for Mutex<T> {
    #[inline(always)]
    #[track_caller]
    fn lock_or_panic(&self) -> MutexGuard<'_, T> {
        #[allow(clippy::unwrap_used)]
        self.lock().unwrap()
    }
}

pub mod header {
    #![allow(clippy::declare_interior_mutable_const)]
    use hyper::{header::HeaderName, http::HeaderValue};

    // These strings are defined separately to be used in contexts where &str are used to
    // represent headers while keeping a single source of truth.
    pub const COLLECTOR_TRACE_COUNT_STR: &str = "x-collector-trace-count";
    pub const APPLICATION_MSGPACK_STR: &str = "application/msgpack";

    pub const COLLECTOR_API_KEY: HeaderName = HeaderName::from_static("collector-api-key");
    pub const COLLECTOR_TRACE_COUNT: HeaderName =
        HeaderName::from_static(COLLECTOR_TRACE_COUNT_STR);
    pub const APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");
    pub const APPLICATION_MSGPACK: HeaderValue = HeaderValue::from_static(APPLICATION_MSGPACK_STR);
    pub const X_COLLECTOR_TEST_SESSION_TOKEN: HeaderName =
        HeaderName::from_static("x-collector-test-session-token");
}

pub type HttpRequestBuilder = hyper::http::request::Builder;

// Used by tag! macro
pub use const_format;

/// Network location of a collector service plus the transport options used when talking to it.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(serialize_with = "serialize_uri", deserialize_with = "deserialize_uri")]
    pub url: hyper::Uri,
    pub api_key: Option<Cow<'static, str>>,
    pub timeout_ms: u64,
    /// Sets X-Collector-Test-Session-Token header on any request
    pub test_token: Option<Cow<'static, str>>,
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint {
            url: hyper::Uri::default(),
            api_key: None,
            timeout_ms: Self::DEFAULT_TIMEOUT,
            test_token: None,
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize)]
struct SerializedUri<'a> {
    scheme: Option<Cow<'a, str>>,
    authority: Option<Cow<'a, str>>,
    path_and_query: Option<Cow<'a, str>>,
}

fn serialize_uri<S>(uri: &hyper::Uri, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let parts = uri.clone().into_parts();
    let uri = SerializedUri {
        scheme: parts.scheme.as_ref().map(|s| Cow::Borrowed(s.as_str())),
        authority: parts.authority.as_ref().map(|s| Cow::Borrowed(s.as_str())),
        path_and_query: parts
            .path_and_query
            .as_ref()
            .map(|s| Cow::Borrowed(s.as_str())),
    };
    uri.serialize(serializer)
}

fn deserialize_uri<'de, D>(deserializer: D) -> Result<hyper::Uri, D::Error>
where
    D: Deserializer<'de>,
{
    let uri = SerializedUri::deserialize(deserializer)?;
    let mut builder = hyper::Uri::builder();
    if let Some(v) = uri.authority {
        builder = builder.authority(v.deref());
    }
    if let Some(v) = uri.scheme {
        builder = builder.scheme(v.deref());
    }
    if let Some(v) = uri.path_and_query {
        builder = builder.path_and_query(v.deref());
    }

    builder.build().map_err(Error::custom)
}

/// Parse a user-supplied collector URL.
///
/// Only `http` and `https` schemes are supported; anything else is rejected so a
/// misconfiguration surfaces at build time rather than on the first send.
pub fn parse_uri(uri: &str) -> anyhow::Result<hyper::Uri> {
    let parsed = hyper::Uri::from_str(uri)?;
    match parsed.scheme_str() {
        None | Some("http") | Some("https") => Ok(parsed),
        Some(scheme) => anyhow::bail!("unsupported collector url scheme: {scheme}"),
    }
}

impl Endpoint {
    /// Default value for the timeout field in milliseconds.
    pub const DEFAULT_TIMEOUT: u64 = 3_000;

    /// Returns an iterator of optional endpoint-specific headers (api-key, test-token)
    /// as (header_name, header_value) string tuples for any that are available.
    pub fn get_optional_headers(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            self.api_key
                .as_ref()
                .map(|v| ("collector-api-key", v.as_ref())),
            self.test_token
                .as_ref()
                .map(|v| ("x-collector-test-session-token", v.as_ref())),
        ]
        .into_iter()
        .flatten()
    }

    /// Apply standard headers (user-agent, api-key, test-token) to an
    /// [`http::request::Builder`].
    pub fn set_standard_headers(
        &self,
        mut builder: http::request::Builder,
        user_agent: &str,
    ) -> http::request::Builder {
        builder = builder.header("user-agent", user_agent);
        for (name, value) in self.get_optional_headers() {
            builder = builder.header(name, value);
        }
        builder
    }

    /// Return a request builder targeting this endpoint with the standard headers applied.
    pub fn to_request_builder(&self, user_agent: &str) -> anyhow::Result<HttpRequestBuilder> {
        let mut builder = hyper::Request::builder()
            .uri(self.url.clone())
            .header(hyper::header::USER_AGENT, HeaderValue::from_str(user_agent)?);

        for (name, value) in self.get_optional_headers() {
            builder = builder.header(name, value);
        }

        Ok(builder)
    }

    #[inline]
    pub fn from_slice(url: &str) -> Endpoint {
        Endpoint {
            #[allow(clippy::unwrap_used)]
            url: parse_uri(url).unwrap(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn from_url(url: hyper::Uri) -> Endpoint {
        Endpoint {
            url,
            ..Default::default()
        }
    }

    /// Set a custom timeout for this endpoint.
    /// If not called, uses the default timeout of 3000ms.
    ///
    /// # Arguments
    /// * `timeout_ms` - Timeout in milliseconds. Pass 0 to use the default timeout (3000ms).
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = if timeout_ms == 0 {
            Self::DEFAULT_TIMEOUT
        } else {
            timeout_ms
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uri_http() {
        let uri = parse_uri("http://127.0.0.1:9130").unwrap();
        assert_eq!(uri.scheme_str(), Some("http"));
        assert_eq!(uri.authority().unwrap().as_str(), "127.0.0.1:9130");
    }

    #[test]
    fn test_parse_uri_rejects_unix() {
        let err = parse_uri("unix://var/run/collector.socket").unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn test_endpoint_optional_headers() {
        let endpoint = Endpoint {
            api_key: Some("abc".into()),
            test_token: Some("session".into()),
            ..Endpoint::from_slice("http://localhost:9130")
        };

        let headers: Vec<_> = endpoint.get_optional_headers().collect();
        assert_eq!(
            headers,
            vec![
                ("collector-api-key", "abc"),
                ("x-collector-test-session-token", "session"),
            ]
        );
    }

    #[test]
    fn test_endpoint_timeout_zero_uses_default() {
        let endpoint = Endpoint::from_slice("http://localhost:9130").with_timeout(0);
        assert_eq!(endpoint.timeout_ms, Endpoint::DEFAULT_TIMEOUT);

        let endpoint = Endpoint::from_slice("http://localhost:9130").with_timeout(250);
        assert_eq!(endpoint.timeout_ms, 250);
    }

    #[test]
    fn test_endpoint_serde_roundtrip() {
        let endpoint = Endpoint {
            api_key: Some("abc".into()),
            ..Endpoint::from_slice("https://collector.example.com:9130/base")
        };
        let json = serde_json::to_string(&endpoint).unwrap();
        let back: Endpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(endpoint, back);
    }
}
