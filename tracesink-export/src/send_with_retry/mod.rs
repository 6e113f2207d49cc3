// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Provide [`send_with_retry`] utility to send a payload to an [`Endpoint`] with retries if the
//! request fails.

mod retry_strategy;
pub use retry_strategy::{RetryBackoffType, RetryStrategy};

use bytes::Bytes;
use std::{collections::HashMap, time::Duration};
use tracesink_common::http_client::{self, Body, ClientError, HttpResponse};
use tracesink_common::Endpoint;
use tracing::{debug, error};

pub type Attempts = u32;

pub type SendWithRetryResult = Result<(HttpResponse, Attempts), SendWithRetryError>;

/// All errors contain the number of attempts after which the final error was returned
#[derive(Debug)]
pub enum SendWithRetryError {
    /// The request received an error HTTP code.
    Http(HttpResponse, Attempts),
    /// The request timed out in the transport layer.
    Timeout(Attempts),
    /// Errors coming from networking.
    Network(ClientError, Attempts),
    /// Errors coming from building the request.
    Build(Attempts),
}

impl std::fmt::Display for SendWithRetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendWithRetryError::Http(_, _) => write!(f, "Http error code received"),
            SendWithRetryError::Timeout(_) => write!(f, "Request timed out"),
            SendWithRetryError::Network(error, _) => write!(f, "Network error: {error}"),
            SendWithRetryError::Build(_) => {
                write!(f, "Failed to build request due to invalid property")
            }
        }
    }
}

impl std::error::Error for SendWithRetryError {}

/// Send the `payload` with a POST request to `target` using the provided `retry_strategy` if the
/// request fails.
///
/// Standard endpoint headers (user-agent, api-key, test-token) are set automatically via
/// [`Endpoint::set_standard_headers`]. Additional `headers` are appended to the request. Each
/// attempt is executed with a timeout of [`Endpoint::timeout_ms`].
///
/// # Returns
///
/// Return a [`SendWithRetryResult`] containing the response and the number of attempts or an error
/// describing the last attempt failure.
///
/// # Errors
/// Fail if the request didn't succeed after applying the retry strategy.
pub async fn send_with_retry(
    target: &Endpoint,
    payload: Vec<u8>,
    headers: &HashMap<&'static str, String>,
    retry_strategy: &RetryStrategy,
) -> SendWithRetryResult {
    let mut request_attempt = 0;
    let timeout = Duration::from_millis(target.timeout_ms);
    let client = http_client::new_default_client();

    debug!(
        url = %target.url,
        payload_size = payload.len(),
        max_retries = retry_strategy.max_retries(),
        "Sending with retry"
    );

    loop {
        request_attempt += 1;

        let mut builder = http::Request::builder()
            .method(http::Method::POST)
            .uri(target.url.clone());
        builder = target.set_standard_headers(
            builder,
            concat!("tracesink-export/", env!("CARGO_PKG_VERSION")),
        );
        for (key, value) in headers {
            builder = builder.header(*key, value.as_str());
        }
        let req = match builder.body(Body::from_bytes(Bytes::from(payload.clone()))) {
            Ok(r) => r,
            Err(_) => {
                return Err(SendWithRetryError::Build(request_attempt));
            }
        };

        let result = tokio::time::timeout(timeout, client.request(req)).await;

        match result {
            Ok(Ok(response)) => {
                let response = http_client::into_response(response);
                let status = response.status();

                if status.is_client_error() || status.is_server_error() {
                    if request_attempt < retry_strategy.max_retries() {
                        debug!(
                            status = status.as_u16(),
                            attempt = request_attempt,
                            remaining_retries = retry_strategy.max_retries() - request_attempt,
                            "Retrying after error status code"
                        );
                        retry_strategy.delay(request_attempt).await;
                        continue;
                    } else {
                        error!(
                            status = status.as_u16(),
                            attempts = request_attempt,
                            "Max retries exceeded, returning HTTP error"
                        );
                        return Err(SendWithRetryError::Http(response, request_attempt));
                    }
                } else {
                    debug!(
                        status = status.as_u16(),
                        attempts = request_attempt,
                        "Request succeeded"
                    );
                    return Ok((response, request_attempt));
                }
            }
            Ok(Err(e)) => {
                if request_attempt < retry_strategy.max_retries() {
                    debug!(
                        error = ?e,
                        attempt = request_attempt,
                        remaining_retries = retry_strategy.max_retries() - request_attempt,
                        "Retrying after request error"
                    );
                    retry_strategy.delay(request_attempt).await;
                    continue;
                } else {
                    error!(
                        error = ?e,
                        attempts = request_attempt,
                        "Max retries exceeded, returning request error"
                    );
                    return Err(SendWithRetryError::Network(e, request_attempt));
                }
            }
            Err(_) => {
                if request_attempt < retry_strategy.max_retries() {
                    debug!(
                        attempt = request_attempt,
                        remaining_retries = retry_strategy.max_retries() - request_attempt,
                        "Retrying after timeout"
                    );
                    retry_strategy.delay(request_attempt).await;
                    continue;
                } else {
                    error!(
                        attempts = request_attempt,
                        "Max retries exceeded, returning timeout error"
                    );
                    return Err(SendWithRetryError::Timeout(request_attempt));
                }
            }
        }
    }
}
