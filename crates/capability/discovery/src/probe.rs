//! 单主机探测。

use crate::{DiscoveryConfig, DiscoveryError};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::TcpStream;

/// 设备信息页（ESPHome web_server 的 text_sensor 端点）。
const DEVICE_INFO_PATH: &str = "/text_sensor/device_info";
const UNKNOWN_EVIDENCE: &str = "Unknown";

/// 主机探测：命中返回证据文本，未命中返回 None。
#[async_trait]
pub trait HostProbe: Send + Sync {
    async fn probe(&self, ip: Ipv4Addr) -> Result<Option<String>, DiscoveryError>;
}

/// TCP 连接 + HTTP 首页特征匹配。
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    port: u16,
    connect_timeout: std::time::Duration,
    signature: String,
}

impl HttpProbe {
    pub fn new(config: &DiscoveryConfig) -> Result<Self, DiscoveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|err| DiscoveryError::Http(err.to_string()))?;
        Ok(Self {
            client,
            port: config.port,
            connect_timeout: config.connect_timeout,
            signature: config.signature.to_lowercase(),
        })
    }

    fn url(&self, ip: Ipv4Addr, path: &str) -> String {
        if self.port == 80 {
            format!("http://{ip}{path}")
        } else {
            format!("http://{ip}:{}{path}", self.port)
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, DiscoveryError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| DiscoveryError::Http(err.to_string()))?;
        if !response.status().is_success() {
            return Err(DiscoveryError::Http(format!("status {}", response.status())));
        }
        response
            .text()
            .await
            .map_err(|err| DiscoveryError::Http(err.to_string()))
    }
}

#[async_trait]
impl HostProbe for HttpProbe {
    async fn probe(&self, ip: Ipv4Addr) -> Result<Option<String>, DiscoveryError> {
        let addr = SocketAddr::new(IpAddr::V4(ip), self.port);
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => drop(stream),
            Ok(Err(err)) => return Err(DiscoveryError::Connect(err.to_string())),
            Err(_) => return Err(DiscoveryError::Timeout),
        }

        let body = self.get_text(&self.url(ip, "/")).await?;
        if !body.to_lowercase().contains(&self.signature) {
            return Ok(None);
        }
        let evidence = match self.get_text(&self.url(ip, DEVICE_INFO_PATH)).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => UNKNOWN_EVIDENCE.to_string(),
        };
        Ok(Some(evidence))
    }
}

/// 反向解析主机名（尽力而为）。
#[async_trait]
pub trait HostnameResolver: Send + Sync {
    async fn resolve(&self, ip: Ipv4Addr) -> Option<String>;
}

/// 系统解析器：`getnameinfo` 在阻塞线程池里执行。
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostnameResolver for SystemResolver {
    async fn resolve(&self, ip: Ipv4Addr) -> Option<String> {
        let addr = IpAddr::V4(ip);
        let name = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&addr))
            .await
            .ok()?
            .ok()?;
        (name != ip.to_string()).then_some(name)
    }
}
