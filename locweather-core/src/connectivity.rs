use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};
use tokio::{net::lookup_host, time::timeout};
use tracing::debug;

use crate::config::Config;

/// Answers whether a network round-trip is worth attempting.
#[async_trait]
pub trait Connectivity: Send + Sync + Debug {
    async fn is_available(&self) -> bool;
}

/// Considers the network available when the endpoint host resolves in time.
#[derive(Debug, Clone)]
pub struct DnsConnectivity {
    host: String,
    port: u16,
    timeout: Duration,
}

impl DnsConnectivity {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self { host: host.into(), port, timeout }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let (host, port) = config.endpoint_host()?;
        Ok(Self::new(host, port, config.connectivity_timeout()))
    }
}

#[async_trait]
impl Connectivity for DnsConnectivity {
    async fn is_available(&self) -> bool {
        let target = (self.host.as_str(), self.port);
        match timeout(self.timeout, lookup_host(target)).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            Ok(Err(err)) => {
                debug!(host = %self.host, "connectivity check failed: {err}");
                false
            }
            Err(_) => {
                debug!(host = %self.host, "connectivity check timed out");
                false
            }
        }
    }
}

/// Fixed answer, for front-ends that know their state up front.
#[derive(Debug, Clone, Copy)]
pub struct StaticConnectivity(pub bool);

#[async_trait]
impl Connectivity for StaticConnectivity {
    async fn is_available(&self) -> bool {
        self.0
    }
}
