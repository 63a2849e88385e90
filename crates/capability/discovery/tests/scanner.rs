use async_trait::async_trait;
use sites_discovery::{
    DiscoveryConfig, DiscoveryError, HostProbe, HostnameResolver, HttpProbe, Scanner,
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 统计并发量的探测替身；.10 命中，.20 报错，其余未命中。
#[derive(Default)]
struct CountingProbe {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl HostProbe for CountingProbe {
    async fn probe(&self, ip: Ipv4Addr) -> Result<Option<String>, DiscoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match ip.octets()[3] {
            10 => Ok(Some("ESPHome 2024.6.1".to_string())),
            20 => Err(DiscoveryError::Timeout),
            _ => Ok(None),
        }
    }
}

struct FixedResolver;

#[async_trait]
impl HostnameResolver for FixedResolver {
    async fn resolve(&self, ip: Ipv4Addr) -> Option<String> {
        (ip.octets()[3] == 10).then(|| "gate-a-noise.local".to_string())
    }
}

#[tokio::test]
async fn scan_respects_concurrency_bound() {
    let probe = Arc::new(CountingProbe::default());
    let scanner = Scanner::new(probe.clone(), Arc::new(FixedResolver), 16);
    let found = scanner.discover(Some(Ipv4Addr::new(10, 1, 2, 3))).await;

    assert_eq!(probe.calls.load(Ordering::SeqCst), 254);
    assert!(probe.max_in_flight.load(Ordering::SeqCst) <= 16);
    assert_eq!(probe.in_flight.load(Ordering::SeqCst), 0);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].ip, Ipv4Addr::new(10, 1, 2, 10));
    assert_eq!(found[0].hostname.as_deref(), Some("gate-a-noise.local"));
    assert_eq!(found[0].evidence, "ESPHome 2024.6.1");
}

#[tokio::test]
async fn zero_concurrency_is_clamped() {
    let probe = Arc::new(CountingProbe::default());
    let scanner = Scanner::new(probe.clone(), Arc::new(FixedResolver), 0);
    let found = scanner.discover(Some(Ipv4Addr::new(10, 9, 9, 1))).await;
    assert_eq!(probe.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn unreachable_subnet_terminates_empty() {
    let config = DiscoveryConfig {
        connect_timeout: Duration::from_millis(100),
        http_timeout: Duration::from_millis(200),
        concurrency: 254,
        ..DiscoveryConfig::default()
    };
    let probe = HttpProbe::new(&config).expect("probe");
    let scanner = Scanner::new(Arc::new(probe), Arc::new(FixedResolver), config.concurrency);
    // 192.0.2.0/24 为文档保留网段
    let found = tokio::time::timeout(
        Duration::from_secs(20),
        scanner.discover(Some(Ipv4Addr::new(192, 0, 2, 1))),
    )
    .await
    .expect("scan finished");
    assert!(found.is_empty());
}
