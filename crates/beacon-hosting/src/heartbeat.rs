use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;

use crate::{
    error::HostError,
    operation::instrument_operation,
    service::{HostedService, ServiceContext},
    settings::HeartbeatSettings,
};

/// 周期性心跳服务：每个周期作为一次逻辑操作执行，并贡献心跳属性。
///
/// # 教案式说明
/// - **意图（Why）**：为宿主提供“仍在运行”的可见证据，同时让诊断收集链路在无外部流量时也持续被走通；
/// - **逻辑（How）**：按配置间隔触发 `tokio::time::interval`，每次触发调用 [`instrument_operation`]，
///   写入 `heartbeat.tick`、`heartbeat.uptime_ms`、`heartbeat.timestamp_ms` 三个属性；
/// - **契约（What）**：观察到关闭信号后退出循环并返回 `Ok(())`；克隆共享同一个周期计数器。
#[derive(Clone, Debug)]
pub struct HeartbeatService {
    interval: Duration,
    ticks: Arc<AtomicU64>,
}

impl HeartbeatService {
    pub fn new(settings: &HeartbeatSettings) -> Self {
        Self::with_interval(settings.interval())
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 已完成的心跳周期数。
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }
}

#[async_trait]
impl HostedService for HeartbeatService {
    fn name(&self) -> &str {
        "heartbeat"
    }

    async fn run(&self, context: ServiceContext) -> Result<(), HostError> {
        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shutdown = context.shutdown().clone();

        loop {
            tokio::select! {
                () = shutdown.wait() => break,
                _ = ticker.tick() => {
                    let tick = self.ticks.load(Ordering::Acquire) + 1;
                    instrument_operation(context.diagnostics(), "heartbeat", |diagnostics| async move {
                        diagnostics.set("heartbeat.tick", tick);
                        diagnostics.set("heartbeat.uptime_ms", started.elapsed().as_millis() as u64);
                        diagnostics.set("heartbeat.timestamp_ms", unix_millis());
                    })
                    .await;
                    self.ticks.store(tick, Ordering::Release);
                }
            }
        }

        tracing::info!(ticks = self.ticks(), "heartbeat stopped");
        Ok(())
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
