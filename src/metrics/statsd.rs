//! DogStatsD Client
//!
//! Gauges go through a cadence client. Service checks have no cadence type
//! and are written as raw DogStatsD `_sc` lines on the same buffered sink, so
//! one flush delivers both.

use super::error::MetricsError;
use super::{MetricsSettings, MetricsSink, ServiceStatus, DEFAULT_METRICS_ADDRESS};
use cadence::{BufferedUdpMetricSink, Gauged, MetricSink, StatsdClient};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

/// One UDP sink shared by the client and the service checks
#[derive(Clone)]
struct SharedSink(Arc<BufferedUdpMetricSink>);

impl MetricSink for SharedSink {
    fn emit(&self, metric: &str) -> std::io::Result<usize> {
        self.0.emit(metric)
    }

    fn flush(&self) -> std::io::Result<()> {
        self.0.flush()
    }
}

/// Sends metrics to a StatsD agent over UDP
pub struct StatsdMetrics {
    client: StatsdClient,
    sink: SharedSink,
    namespace: String,
    tags: Vec<String>,
    address: SocketAddr,
}

impl StatsdMetrics {
    /// Resolve the agent address and prepare a non-blocking UDP socket
    pub fn connect(settings: &MetricsSettings) -> Result<Self, MetricsError> {
        let address = match settings.address.trim() {
            "" => {
                log::warn!(
                    "metrics address not provided, using default {}",
                    DEFAULT_METRICS_ADDRESS
                );
                DEFAULT_METRICS_ADDRESS
            }
            address => address,
        };
        let target = resolve(address)?;

        let local = if target.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let client_error = |e: std::io::Error| MetricsError::Client {
            message: e.to_string(),
        };
        let socket = UdpSocket::bind(local).map_err(client_error)?;
        socket.set_nonblocking(true).map_err(client_error)?;

        let sink = BufferedUdpMetricSink::from(target, socket).map_err(|e| MetricsError::Client {
            message: e.to_string(),
        })?;
        let sink = SharedSink(Arc::new(sink));
        let client = StatsdClient::from_sink(&settings.namespace, sink.clone());
        log::info!("metrics reporting to {} ({})", address, target);

        Ok(Self {
            client,
            sink,
            namespace: settings.namespace.clone(),
            tags: settings
                .tags
                .iter()
                .filter(|tag| !tag.is_empty())
                .cloned()
                .collect(),
            address: target,
        })
    }

    /// Resolved agent address
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    fn qualified(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.namespace, name)
        }
    }
}

impl MetricsSink for StatsdMetrics {
    fn gauge(&self, name: &str, value: i64, tags: &[String]) {
        let tags: Vec<&str> = tags
            .iter()
            .chain(self.tags.iter())
            .map(String::as_str)
            .filter(|tag| !tag.is_empty())
            .collect();

        let mut builder = self.client.gauge_with_tags(name, value as f64);
        for tag in &tags {
            builder = builder.with_tag_value(tag);
        }
        match builder.try_send() {
            Ok(_) => log::debug!(
                "gauge metric pushed {}={} tags=[{}]",
                self.qualified(name),
                value,
                tags.join(",")
            ),
            Err(e) => log::error!("gauge metric push error: {}", e),
        }
    }

    fn service_check(&self, status: ServiceStatus, message: &str) {
        let line = service_check_line(&self.qualified("service_check"), status, &self.tags, message);
        match self.sink.emit(&line) {
            Ok(_) => log::debug!(
                "service check pushed status={} ({}) message={:?}",
                status as u8,
                status,
                message
            ),
            Err(e) => log::error!("service check push error: {}", e),
        }
    }

    fn flush(&self) {
        match self.sink.flush() {
            Ok(()) => log::debug!("metrics client flushed"),
            Err(e) => log::error!("metrics client flush error: {}", e),
        }
    }
}

fn resolve(address: &str) -> Result<SocketAddr, MetricsError> {
    let invalid = |message: String| MetricsError::Address {
        address: address.to_string(),
        message,
    };
    address
        .to_socket_addrs()
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("no addresses found".to_string()))
}

/// DogStatsD service check datagram: `_sc|name|status|#tags|m:message`
fn service_check_line(name: &str, status: ServiceStatus, tags: &[String], message: &str) -> String {
    let mut line = format!("_sc|{}|{}", name, status as u8);
    if !tags.is_empty() {
        line.push_str("|#");
        line.push_str(&tags.join(","));
    }
    if !message.is_empty() {
        // The message field runs to the end of the datagram.
        line.push_str("|m:");
        line.push_str(&message.replace('\n', "\\n").replace("m:", "m\\:"));
    }
    line
}
