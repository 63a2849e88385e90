//! 局域网设备发现。
//!
//! 对本机出口地址（或调用方提示地址）所在 /24 的 .1–.254 逐一探测：
//! TCP 连接 → HTTP 首页特征匹配 → 设备信息页 → 反向解析主机名。
//! 并发按批次限制：一批全部结束后才启动下一批。探测失败全部吸收，扫描本身不会失败。

mod probe;

pub use probe::{HostProbe, HostnameResolver, HttpProbe, SystemResolver};

use domain::DiscoveredHost;
use futures::future::join_all;
use sites_telemetry::{record_discovery_match, record_discovery_probes};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// 单主机探测失败（扫描内部吸收）。
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("connect timed out")]
    Timeout,
    #[error("http probe failed: {0}")]
    Http(String),
}

/// 发现扫描参数。
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub port: u16,
    pub connect_timeout: Duration,
    pub http_timeout: Duration,
    pub concurrency: usize,
    /// 首页特征（大小写不敏感）。
    pub signature: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: 80,
            connect_timeout: Duration::from_millis(1000),
            http_timeout: Duration::from_millis(2000),
            concurrency: 50,
            signature: "ESPHome".to_string(),
        }
    }
}

/// 发现扫描器。
#[derive(Clone)]
pub struct Scanner {
    probe: Arc<dyn HostProbe>,
    resolver: Arc<dyn HostnameResolver>,
    concurrency: usize,
}

impl Scanner {
    pub fn new(
        probe: Arc<dyn HostProbe>,
        resolver: Arc<dyn HostnameResolver>,
        concurrency: usize,
    ) -> Self {
        Self {
            probe,
            resolver,
            concurrency: concurrency.max(1),
        }
    }

    /// 以 HTTP 探测与系统解析器构建。
    pub fn http(config: &DiscoveryConfig) -> Result<Self, DiscoveryError> {
        Ok(Self::new(
            Arc::new(HttpProbe::new(config)?),
            Arc::new(SystemResolver),
            config.concurrency,
        ))
    }

    pub async fn discover(&self, hint: Option<Ipv4Addr>) -> Vec<DiscoveredHost> {
        let base = match hint {
            Some(ip) => Some(ip),
            None => local_ipv4().await,
        };
        let Some(base) = base else {
            warn!(target: "sites.discovery", "discovery skipped: no local ipv4 address");
            return Vec::new();
        };
        let hosts = subnet_hosts(base);
        info!(
            target: "sites.discovery",
            subnet = %subnet_label(base),
            hosts = hosts.len(),
            concurrency = self.concurrency,
            "discovery_started"
        );

        let mut found = Vec::new();
        for batch in hosts.chunks(self.concurrency) {
            record_discovery_probes(batch.len() as u64);
            let results = join_all(batch.iter().map(|ip| self.probe_host(*ip))).await;
            found.extend(results.into_iter().flatten());
        }
        info!(
            target: "sites.discovery",
            subnet = %subnet_label(base),
            found = found.len(),
            "discovery_finished"
        );
        found
    }

    async fn probe_host(&self, ip: Ipv4Addr) -> Option<DiscoveredHost> {
        match self.probe.probe(ip).await {
            Ok(Some(evidence)) => {
                record_discovery_match();
                let hostname = self.resolver.resolve(ip).await;
                info!(
                    target: "sites.discovery",
                    ip = %ip,
                    hostname = ?hostname,
                    "device_discovered"
                );
                Some(DiscoveredHost {
                    ip,
                    hostname,
                    evidence,
                })
            }
            Ok(None) => None,
            Err(err) => {
                debug!(target: "sites.discovery", ip = %ip, "probe failed: {}", err);
                None
            }
        }
    }
}

/// `base` 所在 /24 的主机地址 .1–.254。
pub fn subnet_hosts(base: Ipv4Addr) -> Vec<Ipv4Addr> {
    let [a, b, c, _] = base.octets();
    (1..=254).map(|d| Ipv4Addr::new(a, b, c, d)).collect()
}

fn subnet_label(base: Ipv4Addr) -> String {
    let [a, b, c, _] = base.octets();
    format!("{a}.{b}.{c}.0/24")
}

/// 本机出口地址：UDP connect 只选路由，不发送数据。
pub async fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").await.ok()?;
    socket.connect("8.8.8.8:80").await.ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(addr) if !addr.ip().is_unspecified() => Some(*addr.ip()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subnet_covers_host_range() {
        let hosts = subnet_hosts(Ipv4Addr::new(192, 168, 4, 77));
        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts.first(), Some(&Ipv4Addr::new(192, 168, 4, 1)));
        assert_eq!(hosts.last(), Some(&Ipv4Addr::new(192, 168, 4, 254)));
        assert_eq!(subnet_label(Ipv4Addr::new(192, 168, 4, 77)), "192.168.4.0/24");
    }
}
