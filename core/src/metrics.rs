use cadence::{BufferedUdpMetricSink, QueuingMetricSink, StatsdClient};
use cadence_macros::set_global_default;
use clap::Parser;
use std::net::UdpSocket;
use thiserror::Error;

#[derive(Clone, Parser, Debug)]
pub struct MetricsArgs {
    #[arg(long, env, default_value = "127.0.0.1")]
    pub metrics_host: String,
    #[arg(long, env, default_value = "8125")]
    pub metrics_port: u16,
    #[arg(long, env, default_value = "cnft.ops")]
    pub metrics_prefix: String,
}

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("socket: {0}")]
    Socket(#[from] std::io::Error),
    #[error("sink: {0}")]
    Sink(#[from] cadence::MetricError),
}

pub fn setup_metrics(config: MetricsArgs) -> Result<(), MetricsError> {
    let host = (config.metrics_host, config.metrics_port);

    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_nonblocking(true)?;

    let udp_sink = BufferedUdpMetricSink::from(host, socket)?;
    let queuing_sink = QueuingMetricSink::from(udp_sink);
    let client = StatsdClient::from_sink(&config.metrics_prefix, queuing_sink);

    set_global_default(client);

    Ok(())
}
