use crate::handler::{IngestOutcome, TelemetryHandler, TelemetryMessage};
use crate::topic::subscriptions;
use domain::now_epoch_ms;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use sites_telemetry::{
    record_telemetry_dropped, record_telemetry_lookup_miss, record_telemetry_message,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// MQTT 遥测源配置。
#[derive(Debug, Clone)]
pub struct MqttSourceConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub namespace: String,
    pub queue_capacity: usize,
    pub max_backoff: Duration,
}

/// 重连退避：从 1 秒开始翻倍，封顶 `max`，连接成功后复位。
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(max: Duration) -> Self {
        let initial = Duration::from_secs(1).min(max);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// 返回本次等待时长并推进到下一档。
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// MQTT 遥测源。
#[derive(Debug, Clone)]
pub struct MqttSource {
    config: MqttSourceConfig,
}

impl MqttSource {
    pub fn new(config: MqttSourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MqttSourceConfig {
        &self.config
    }

    /// 启动事件循环与处理 worker，返回事件循环任务句柄。
    pub fn spawn(self, handler: Arc<dyn TelemetryHandler>) -> JoinHandle<()> {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        tokio::spawn(run_worker(rx, handler));
        tokio::spawn(async move { self.run_event_loop(tx).await })
    }

    async fn run_event_loop(self, tx: mpsc::Sender<TelemetryMessage>) {
        let config = self.config;
        let client_id = format!("sites-ingest-{}", now_epoch_ms());
        let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (config.username.as_ref(), config.password.as_ref())
        {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let filters = subscriptions(&config.namespace);
        let mut backoff = Backoff::new(config.max_backoff);
        info!(
            target: "sites.ingest",
            host = %config.host,
            port = config.port,
            namespace = %config.namespace,
            "telemetry_ingest_started"
        );

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    backoff.reset();
                    for filter in &filters {
                        if let Err(err) = client.subscribe(filter.as_str(), QoS::AtMostOnce).await {
                            warn!(target: "sites.ingest", filter = %filter, "mqtt subscribe error: {}", err);
                        }
                    }
                    info!(target: "sites.ingest", "telemetry_subscribed");
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = TelemetryMessage::new(
                        publish.topic,
                        String::from_utf8_lossy(&publish.payload).into_owned(),
                    );
                    if !forward(&tx, message) {
                        warn!(target: "sites.ingest", "telemetry worker stopped");
                        return;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    let delay = backoff.next_delay();
                    warn!(
                        target: "sites.ingest",
                        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "mqtt telemetry eventloop error: {}",
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// 非阻塞转发；通道满时丢弃并计数。通道关闭时返回 false。
fn forward(tx: &mpsc::Sender<TelemetryMessage>, message: TelemetryMessage) -> bool {
    match tx.try_send(message) {
        Ok(()) => true,
        Err(TrySendError::Full(message)) => {
            record_telemetry_dropped();
            warn!(target: "sites.ingest", topic = %message.topic, "telemetry_dropped");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

async fn run_worker(mut rx: mpsc::Receiver<TelemetryMessage>, handler: Arc<dyn TelemetryHandler>) {
    while let Some(message) = rx.recv().await {
        record_telemetry_message();
        let topic = message.topic.clone();
        match handler.handle(message).await {
            Ok(IngestOutcome::Updated {
                entity_id,
                old_value,
                new_value,
            }) => debug!(
                target: "sites.ingest",
                topic = %topic,
                entity_id = %entity_id,
                old_value = %old_value,
                new_value = %new_value,
                "entity_value_changed"
            ),
            Ok(_) => {}
            Err(err) if err.is_lookup_miss() => {
                record_telemetry_lookup_miss();
                debug!(target: "sites.ingest", topic = %topic, "telemetry lookup miss: {}", err);
            }
            Err(err) => warn!(target: "sites.ingest", topic = %topic, "telemetry skipped: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::IngestError;
    use std::sync::Mutex;

    #[test]
    fn backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_secs(5));
        let delays: Vec<u64> = (0..5).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 5, 5]);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        assert!(forward(&tx, TelemetryMessage::new("smartsites/a/b", "1")));
        assert!(forward(&tx, TelemetryMessage::new("smartsites/a/b", "2")));
        let kept = rx.try_recv().expect("first message");
        assert_eq!(kept.payload, "1");
        assert!(rx.try_recv().is_err());
        drop(rx);
        assert!(!forward(&tx, TelemetryMessage::new("smartsites/a/b", "3")));
    }

    struct RecordingHandler {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TelemetryHandler for RecordingHandler {
        async fn handle(&self, message: TelemetryMessage) -> Result<IngestOutcome, IngestError> {
            self.seen.lock().expect("lock").push(message.payload.clone());
            if message.payload == "bad" {
                return Err(IngestError::MalformedTopic(message.topic));
            }
            Ok(IngestOutcome::Unchanged {
                entity_id: "e1".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn worker_survives_failed_messages() {
        let handler = Arc::new(RecordingHandler {
            seen: Mutex::new(Vec::new()),
        });
        let (tx, rx) = mpsc::channel(8);
        for payload in ["1", "bad", "2"] {
            assert!(forward(&tx, TelemetryMessage::new("smartsites/a/b", payload)));
        }
        drop(tx);
        run_worker(rx, handler.clone()).await;
        assert_eq!(*handler.seen.lock().expect("lock"), vec!["1", "bad", "2"]);
    }
}
