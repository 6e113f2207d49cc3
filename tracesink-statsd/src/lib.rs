// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Statsd client used to emit exporter health metrics over UDP, together with
//! the [`observer`] utility for gauge collection.

pub mod observer;

use anyhow::anyhow;
use cadence::prelude::*;
use cadence::{Metric, MetricBuilder, QueuingMetricSink, StatsdClient, UdpMetricSink};
use std::net::{ToSocketAddrs, UdpSocket};
use tracesink_common::tag::Tag;
use tracesink_common::Endpoint;
use tracing::{debug, error, info};

// Queue with a maximum capacity of 32K elements
const QUEUE_SIZE: usize = 32 * 1024;

/// The metric types that can be sent to the statsd server.
#[derive(Debug)]
pub enum StatsAction {
    Count(&'static str, i64, Vec<Tag>),
    Gauge(&'static str, f64, Vec<Tag>),
    Distribution(&'static str, f64, Vec<Tag>),
    Histogram(&'static str, f64, Vec<Tag>),
}

/// A statsd client that flushes stats to a given endpoint.
/// The default value has no address and is thus disabled, use `new_flusher` or `set_endpoint` to
/// configure an endpoint.
#[derive(Default)]
pub struct Flusher {
    client: Option<StatsdClient>,
}

pub fn new_flusher(endpoint: Endpoint) -> anyhow::Result<Flusher> {
    let mut f = Flusher::default();
    f.set_endpoint(endpoint)?;
    Ok(f)
}

impl Flusher {
    /// Set the destination for statsd metrics. If an API key is provided the client is disabled
    /// as statsd has no agentless mode. Returns an error if the provided endpoint is invalid.
    pub fn set_endpoint(&mut self, endpoint: Endpoint) -> anyhow::Result<()> {
        self.client = match endpoint.api_key {
            Some(_) => {
                info!("Statsd is not available in agentless mode");
                None
            }
            None => {
                debug!("Updating statsd endpoint to {}", endpoint.url);
                Some(create_client(&endpoint)?)
            }
        };
        Ok(())
    }

    /// True when no endpoint is configured; sends are no-ops in that state.
    pub fn is_disabled(&self) -> bool {
        self.client.is_none()
    }

    /// Emit the given actions. Errors are logged, never returned: metric
    /// emission must not fail the operation being measured.
    pub fn send(&self, actions: Vec<StatsAction>) {
        let client = match &self.client {
            Some(client) => client,
            None => return,
        };

        for action in actions {
            if let Err(err) = match action {
                StatsAction::Count(metric, value, ref tags) => {
                    do_send(client.count_with_tags(metric, value), tags)
                }
                StatsAction::Gauge(metric, value, ref tags) => {
                    do_send(client.gauge_with_tags(metric, value), tags)
                }
                StatsAction::Distribution(metric, value, ref tags) => {
                    do_send(client.distribution_with_tags(metric, value), tags)
                }
                StatsAction::Histogram(metric, value, ref tags) => {
                    do_send(client.histogram_with_tags(metric, value), tags)
                }
            } {
                error!("Error while sending metric: {}", err);
            }
        }
    }

    /// Collect every pending observation from `result` and emit them as gauges
    /// under `metric`.
    pub fn flush_gauges(&self, metric: &'static str, result: &mut observer::ObserverResult) {
        let actions = result
            .collect()
            .into_iter()
            .map(|obs| StatsAction::Gauge(metric, obs.value, obs.tags))
            .collect();
        self.send(actions);
    }
}

fn do_send<'m, 't, T>(mut builder: MetricBuilder<'m, '_, T>, tags: &'t [Tag]) -> anyhow::Result<()>
where
    T: Metric + From<String>,
    't: 'm,
{
    for tag in tags {
        builder = builder.with_tag_value(tag.as_ref());
    }
    builder.try_send()?;
    Ok(())
}

fn create_client(endpoint: &Endpoint) -> anyhow::Result<StatsdClient> {
    let host = endpoint.url.host().ok_or(anyhow!("invalid host"))?;
    let port = endpoint.url.port().ok_or(anyhow!("invalid port"))?.as_u16();

    let server_address = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or(anyhow!("invalid address"))?;

    let socket = if server_address.is_ipv4() {
        UdpSocket::bind("0.0.0.0:0")?
    } else {
        UdpSocket::bind("[::]:0")?
    };
    socket.set_nonblocking(true)?;

    let sink =
        QueuingMetricSink::with_capacity(UdpMetricSink::from((host, port), socket)?, QUEUE_SIZE);

    Ok(StatsdClient::from_sink("", sink))
}

#[cfg(test)]
mod test {
    use crate::StatsAction::{Count, Distribution, Gauge, Histogram};
    use crate::{create_client, Flusher};
    use std::net;
    use std::time::Duration;
    use tracesink_common::{tag, Endpoint};

    fn read(socket: &net::UdpSocket) -> String {
        let mut buf = [0; 100];
        socket.recv(&mut buf).expect("No data");
        let datagram = String::from_utf8_lossy(buf.as_ref());
        datagram.trim_matches(char::from(0)).to_string()
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_flusher() {
        let socket = net::UdpSocket::bind("127.0.0.1:0").expect("failed to bind host socket");
        let _ = socket.set_read_timeout(Some(Duration::from_millis(500)));

        let mut flusher = Flusher::default();
        _ = flusher.set_endpoint(Endpoint::from_slice(
            socket.local_addr().unwrap().to_string().as_str(),
        ));
        flusher.send(vec![
            Count("test_count", 3, vec![tag!("foo", "bar")]),
            Count("test_neg_count", -2, vec![]),
            Distribution("test_distribution", 4.2, vec![]),
            Gauge("test_gauge", 7.6, vec![]),
            Histogram("test_histogram", 8.0, vec![]),
        ]);

        assert_eq!("test_count:3|c|#foo:bar", read(&socket));
        assert_eq!("test_neg_count:-2|c", read(&socket));
        assert_eq!("test_distribution:4.2|d", read(&socket));
        assert_eq!("test_gauge:7.6|g", read(&socket));
        assert_eq!("test_histogram:8|h", read(&socket));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_flush_gauges() {
        let socket = net::UdpSocket::bind("127.0.0.1:0").expect("failed to bind host socket");
        let _ = socket.set_read_timeout(Some(Duration::from_millis(500)));

        let mut flusher = Flusher::default();
        _ = flusher.set_endpoint(Endpoint::from_slice(
            socket.local_addr().unwrap().to_string().as_str(),
        ));

        let mut result = crate::observer::ObserverResult::new();
        result.observe(42.0, vec![tag!("queue", "spans")]);
        flusher.flush_gauges("exporter_queue_depth", &mut result);

        assert_eq!("exporter_queue_depth:42|g|#queue:spans", read(&socket));
        // Direct observations are drained by the flush.
        assert!(result.is_empty());
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_flusher_disabled_with_api_key() {
        let mut flusher = Flusher::default();
        assert!(flusher.is_disabled());

        let endpoint = Endpoint {
            api_key: Some("key".into()),
            ..Endpoint::from_slice("127.0.0.1:8125")
        };
        flusher.set_endpoint(endpoint).unwrap();
        assert!(flusher.is_disabled());
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_create_client_udp() {
        let res = create_client(&Endpoint::default());
        assert!(res.is_err());
        assert_eq!("invalid host", res.unwrap_err().to_string().as_str());

        let res = create_client(&Endpoint::from_slice("localhost:80"));
        assert!(res.is_ok());

        let res = create_client(&Endpoint::from_slice("http://localhost:80"));
        assert!(res.is_ok());
    }
}
