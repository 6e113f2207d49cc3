// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;
use std::collections::HashMap;

/// `CollectorResponse` structure holds collector response information upon successful request.
#[derive(Debug, PartialEq)]
pub struct CollectorResponse {
    /// Response body, a JSON document carrying per-service sampling rates.
    pub body: String,
}

#[derive(Deserialize)]
struct RatesPayload {
    #[serde(default)]
    rate_by_service: HashMap<String, f64>,
}

impl CollectorResponse {
    /// Deserialize the per-service sampling rates carried in the response body.
    ///
    /// Keys are `service:<name>,env:<env>` pairs as emitted by the collector.
    pub fn rate_by_service(&self) -> Result<HashMap<String, f64>, serde_json::Error> {
        serde_json::from_str::<RatesPayload>(&self.body).map(|r| r.rate_by_service)
    }
}

impl From<String> for CollectorResponse {
    fn from(value: String) -> Self {
        CollectorResponse { body: value }
    }
}
