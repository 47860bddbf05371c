//! Counters for account, content and visibility outcomes.
//!
//! Recording is always on; nothing is exported unless [`init_metrics`]
//! installs the Prometheus listener.

use std::fmt;
use std::net::SocketAddr;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    RegisterTotal,
    LoginTotal,
    TweetsCreated,
    TweetsDeleted,
    VisibilityDenied,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricName::RegisterTotal => "twitter_auth_register_total",
            MetricName::LoginTotal => "twitter_auth_login_total",
            MetricName::TweetsCreated => "twitter_tweets_created_total",
            MetricName::TweetsDeleted => "twitter_tweets_deleted_total",
            MetricName::VisibilityDenied => "twitter_visibility_denied_total",
        };
        write!(f, "{name}")
    }
}

/// Install the Prometheus exporter when `METRICS_PORT` is set.
pub fn init_metrics() {
    let Some(port) = std::env::var("METRICS_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
    else {
        return;
    };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed: {}", e),
    }
}

/// Bump a counter, labelled with the outcome where one applies.
pub fn record(name: MetricName, outcome: Option<&'static str>) {
    let name = name.to_string();
    match outcome {
        Some(outcome) => ::metrics::counter!(name, "outcome" => outcome).increment(1),
        None => ::metrics::counter!(name).increment(1),
    }
}
