// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::exporter::error::BuilderErrorKind;
use crate::exporter::{ExporterError, SpanExporter, TracerMetadata};
use crate::send_with_retry::RetryStrategy;
use std::sync::{Arc, Mutex};
use tracesink_common::{parse_uri, tag, Endpoint};

const DEFAULT_COLLECTOR_URL: &str = "http://127.0.0.1:9130";

#[allow(missing_docs)]
#[derive(Default, Debug)]
pub struct SpanExporterBuilder {
    url: Option<String>,
    statsd_url: Option<String>,
    hostname: String,
    env: String,
    app_version: String,
    service: String,
    tracer_version: String,
    language: String,
    language_version: String,
    test_session_token: Option<String>,
    connection_timeout: Option<u64>,
    retry_strategy: Option<RetryStrategy>,
    health_metrics_enabled: bool,
}

impl SpanExporterBuilder {
    /// Sets the URL of the collector.
    ///
    /// Only `http://<host>:<port>` and `https://<host>:<port>` URLs are supported.
    pub fn set_url(&mut self, url: &str) -> &mut Self {
        self.url = Some(url.to_owned());
        self
    }

    /// Set the URL of the statsd server receiving health metrics
    pub fn set_statsd_url(&mut self, url: &str) -> &mut Self {
        self.statsd_url = Some(url.to_owned());
        self
    }

    /// Set the hostname reported to the collector
    pub fn set_hostname(&mut self, hostname: &str) -> &mut Self {
        hostname.clone_into(&mut self.hostname);
        self
    }

    /// Set the env reported to the collector
    pub fn set_env(&mut self, env: &str) -> &mut Self {
        env.clone_into(&mut self.env);
        self
    }

    /// Set the app version which corresponds to the `collector-meta-app-version` header
    pub fn set_app_version(&mut self, app_version: &str) -> &mut Self {
        app_version.clone_into(&mut self.app_version);
        self
    }

    /// Set the service name spans are attributed to
    pub fn set_service(&mut self, service: &str) -> &mut Self {
        service.clone_into(&mut self.service);
        self
    }

    /// Set the `collector-meta-tracer-version` header
    pub fn set_tracer_version(&mut self, tracer_version: &str) -> &mut Self {
        tracer_version.clone_into(&mut self.tracer_version);
        self
    }

    /// Set the `collector-meta-lang` header
    pub fn set_language(&mut self, lang: &str) -> &mut Self {
        lang.clone_into(&mut self.language);
        self
    }

    /// Set the `collector-meta-lang-version` header
    pub fn set_language_version(&mut self, lang_version: &str) -> &mut Self {
        lang_version.clone_into(&mut self.language_version);
        self
    }

    /// Set the `X-Collector-Test-Session-Token` header. Only used for testing with a test
    /// collector.
    pub fn set_test_session_token(&mut self, test_session_token: &str) -> &mut Self {
        self.test_session_token = Some(test_session_token.to_string());
        self
    }

    /// Sets the collector's connection timeout, in milliseconds.
    pub fn set_connection_timeout(&mut self, timeout_ms: Option<u64>) -> &mut Self {
        self.connection_timeout = timeout_ms;
        self
    }

    /// Override the retry strategy applied to trace sends.
    pub fn set_retry_strategy(&mut self, strategy: RetryStrategy) -> &mut Self {
        self.retry_strategy = Some(strategy);
        self
    }

    /// Enables health metrics emission. Requires a statsd URL to take effect.
    pub fn enable_health_metrics(&mut self) -> &mut Self {
        self.health_metrics_enabled = true;
        self
    }

    #[allow(missing_docs)]
    pub fn build(self) -> Result<SpanExporter, ExporterError> {
        let base_url = self.url.as_deref().unwrap_or(DEFAULT_COLLECTOR_URL);

        let collector_url: hyper::Uri = parse_uri(base_url).map_err(|e: anyhow::Error| {
            ExporterError::Builder(BuilderErrorKind::InvalidUri(e.to_string()))
        })?;

        let runtime = Arc::new(
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()?,
        );

        let statsd = self.statsd_url.as_deref().and_then(|url| {
            // If the statsd endpoint can't be set up, health metrics are skipped
            parse_uri(url)
                .map(Endpoint::from_url)
                .and_then(tracesink_statsd::new_flusher)
                .ok()
        });

        let tracesink_version = tag!("tracesink_version", env!("CARGO_PKG_VERSION"));

        Ok(SpanExporter {
            endpoint: Endpoint {
                url: collector_url,
                test_token: self.test_session_token.map(|token| token.into()),
                timeout_ms: self
                    .connection_timeout
                    .unwrap_or(Endpoint::default().timeout_ms),
                ..Default::default()
            },
            metadata: TracerMetadata {
                hostname: self.hostname,
                env: self.env,
                app_version: self.app_version,
                runtime_id: uuid::Uuid::new_v4().to_string(),
                service: self.service,
                tracer_version: self.tracer_version,
                language: self.language,
                language_version: self.language_version,
            },
            runtime: Arc::new(Mutex::new(Some(runtime))),
            statsd,
            common_stats_tags: vec![tracesink_version],
            retry_strategy: self.retry_strategy.unwrap_or_default(),
            health_metrics_enabled: self.health_metrics_enabled,
        })
    }
}
