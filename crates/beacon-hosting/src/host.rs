use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::task::{Id, JoinError, JoinSet};

use crate::{
    error::HostError,
    service::{HostedService, ServiceContext, ShutdownTrigger},
    settings::HostSettings,
};

/// 宿主装配器：收集配置与托管服务，生成 [`Host`]。
pub struct HostBuilder {
    settings: HostSettings,
    services: Vec<Arc<dyn HostedService>>,
}

impl HostBuilder {
    pub fn new(settings: HostSettings) -> Self {
        Self {
            settings,
            services: Vec::new(),
        }
    }

    /// 注册托管服务，启动顺序与注册顺序一致。
    pub fn add_service(mut self, service: impl HostedService) -> Self {
        self.services.push(Arc::new(service));
        self
    }

    pub fn build(self) -> Host {
        Host {
            settings: self.settings,
            services: self.services,
        }
    }
}

/// `Host` 驱动全部托管服务直至关闭。
///
/// # 教案级注释
/// - **设计目的 (Why)**：把“启动服务 → 等待关闭条件 → 广播关闭 → 汇总结果”的流程集中在一处，
///   入口程序只需提供关闭条件；
/// - **关键要素 (How)**：
///   - 每个服务在独立的 tokio 任务中运行，并获得独立的 [`ServiceContext`]；
///   - 关闭条件满足或任一服务失败时，通过 `watch` 通道广播关闭信号；
///   - 广播后等待所有任务结束，首个错误作为宿主结果返回。
/// - **契约说明 (What)**：服务正常结束不会触发关闭，宿主继续等待关闭条件；
///   服务 panic 被转换为 [`HostError::Service`]。
pub struct Host {
    settings: HostSettings,
    services: Vec<Arc<dyn HostedService>>,
}

impl Host {
    pub fn settings(&self) -> &HostSettings {
        &self.settings
    }

    /// 运行直至收到 Ctrl-C。
    pub async fn run(self) -> Result<(), HostError> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "failed to listen for ctrl-c, shutting down");
            }
        })
        .await
    }

    /// 运行直至 `shutdown` 完成或某个服务失败。
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), HostError>
    where
        F: Future<Output = ()>,
    {
        let (trigger, signal) = ShutdownTrigger::new();
        let mut tasks = JoinSet::new();
        let mut names = HashMap::with_capacity(self.services.len());
        for service in &self.services {
            let context = ServiceContext::new(service.name(), signal.clone());
            let running = Arc::clone(service);
            let handle = tasks.spawn(async move { running.run(context).await });
            names.insert(handle.id(), service.name().to_owned());
        }
        tracing::info!(
            application = %self.settings.application.name,
            services = self.services.len(),
            "host started"
        );

        let mut first_error = None;
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                    if let Err(err) = record_outcome(joined, &mut names) {
                        first_error = Some(err);
                        break;
                    }
                }
            }
        }

        trigger.trigger();
        while let Some(joined) = tasks.join_next_with_id().await {
            if let Err(err) = record_outcome(joined, &mut names) {
                first_error.get_or_insert(err);
            }
        }
        tracing::info!(
            application = %self.settings.application.name,
            failed = first_error.is_some(),
            "host stopped"
        );

        first_error.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.services.iter().map(|service| service.name()).collect();
        f.debug_struct("Host")
            .field("application", &self.settings.application.name)
            .field("services", &names)
            .finish()
    }
}

/// 把任务结果还原为服务级结果；panic 或取消按任务 id 找回服务名。
fn record_outcome(
    joined: Result<(Id, Result<(), HostError>), JoinError>,
    names: &mut HashMap<Id, String>,
) -> Result<(), HostError> {
    match joined {
        Ok((id, Ok(()))) => {
            let name = service_name(names, id);
            tracing::debug!(service = %name, "hosted service finished");
            Ok(())
        }
        Ok((id, Err(err))) => {
            let name = service_name(names, id);
            tracing::error!(service = %name, error = %err, "hosted service failed");
            Err(err)
        }
        Err(err) => {
            let name = service_name(names, err.id());
            tracing::error!(service = %name, error = %err, "hosted service task aborted");
            Err(HostError::service(name, err.to_string()))
        }
    }
}

fn service_name(names: &mut HashMap<Id, String>, id: Id) -> String {
    names.remove(&id).unwrap_or_else(|| format!("task-{id}"))
}
