use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

use cadence::prelude::*;
use cadence::{BufferedUdpMetricSink, MetricSink, QueuingMetricSink, StatsdClient as CadenceClient};

use crate::error::MetricsError;
use crate::metrics::StatsdClient;

pub const DEFAULT_STATSD_HOST: &str = "localhost";
pub const DEFAULT_STATSD_PORT: u16 = 8125;

/// Bytes buffered before a datagram is sent; keeps packets under a typical
/// 1500 byte MTU.
pub const DEFAULT_BUFFER_MAX_POOL_SIZE: usize = 1432;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// Send datagrams on the calling thread instead of cadence's queuing worker.
    pub single_thread: bool,
    /// Size in bytes of the UDP buffer that triggers a send without `flush()`.
    pub buffer_max_pool_size: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            single_thread: false,
            buffer_max_pool_size: DEFAULT_BUFFER_MAX_POOL_SIZE,
        }
    }
}

#[derive(Clone)]
enum Sink {
    Buffered(Arc<BufferedUdpMetricSink>),
    Queuing(Arc<QueuingMetricSink>),
}

impl MetricSink for Sink {
    fn emit(&self, metric: &str) -> io::Result<usize> {
        match self {
            Sink::Buffered(sink) => sink.emit(metric),
            Sink::Queuing(sink) => sink.emit(metric),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self {
            Sink::Buffered(sink) => sink.flush(),
            Sink::Queuing(sink) => sink.flush(),
        }
    }
}

/// DogStatsD client over UDP backed by `cadence`.
///
/// One socket is bound at construction and shared by every call. `close()`
/// only flushes, so the per-call close policy costs a flush and nothing more.
pub struct UdpStatsd {
    addr: SocketAddr,
    options: TransportOptions,
    sink: Sink,
    client: CadenceClient,
}

impl UdpStatsd {
    pub fn new(host: &str, port: u16, options: TransportOptions) -> Result<Self, MetricsError> {
        if options.buffer_max_pool_size == 0 {
            return Err(MetricsError::InvalidConfig(
                "buffer_max_pool_size must be greater than zero".to_string(),
            ));
        }

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| MetricsError::AddressResolution(format!("{host}:{port}: {e}")))?
            .next()
            .ok_or_else(|| MetricsError::AddressResolution(format!("{host}:{port}")))?;

        let bind_addr = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;

        let buffered =
            BufferedUdpMetricSink::with_capacity(addr, socket, options.buffer_max_pool_size)?;
        let sink = if options.single_thread {
            Sink::Buffered(Arc::new(buffered))
        } else {
            Sink::Queuing(Arc::new(QueuingMetricSink::from(buffered)))
        };

        log::debug!(
            "Statsd client targeting {addr} (single_thread: {}, buffer_max_pool_size: {})",
            options.single_thread,
            options.buffer_max_pool_size
        );

        Ok(Self {
            addr,
            options,
            client: CadenceClient::from_sink("", sink.clone()),
            sink,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn options(&self) -> TransportOptions {
        self.options
    }
}

impl StatsdClient for UdpStatsd {
    fn increment(&self, metric: &str, tags: &[String]) -> Result<(), MetricsError> {
        let tags: Vec<String> = tags.iter().map(|tag| clean_tag(tag)).collect();

        let mut builder = self.client.count_with_tags(metric, 1i64);
        for tag in &tags {
            builder = match tag.split_once(':') {
                Some((key, value)) => builder.with_tag(key, value),
                None => builder.with_tag_value(tag),
            };
        }
        builder.try_send()?;
        Ok(())
    }

    fn flush(&self) -> Result<(), MetricsError> {
        Ok(self.sink.flush()?)
    }

    fn close(&self) -> Result<(), MetricsError> {
        self.flush()
    }
}

/// Removes characters that would break the DogStatsD line protocol.
pub fn clean_tag(tag: &str) -> String {
    tag.chars()
        .filter(|c| !matches!(c, '|' | ',' | '\n' | '\r'))
        .collect()
}
