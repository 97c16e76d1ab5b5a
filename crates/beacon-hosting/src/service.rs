use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use beacon_diagnostics::DiagnosticContext;
use tokio::sync::watch;

use crate::error::HostError;

/// 由宿主托管的长期运行服务。
///
/// # 教案式说明
/// - **意图（Why）**：宿主只负责启动、广播关闭与汇总结果，具体业务循环由服务自行实现；
/// - **契约（What）**：
///   - `run` 应在观察到 [`ShutdownSignal`] 后尽快返回；
///   - 返回 `Err` 会让宿主提前进入关闭流程，并把首个错误作为宿主结果。
#[async_trait]
pub trait HostedService: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn run(&self, context: ServiceContext) -> Result<(), HostError>;
}

/// 宿主交给每个托管服务的运行期上下文。
///
/// 每个服务拥有独立的 [`DiagnosticContext`]，不同服务的收集互不可见。
#[derive(Clone)]
pub struct ServiceContext {
    service: Arc<str>,
    diagnostics: DiagnosticContext,
    shutdown: ShutdownSignal,
}

impl ServiceContext {
    pub(crate) fn new(service: &str, shutdown: ShutdownSignal) -> Self {
        Self {
            service: Arc::from(service),
            diagnostics: DiagnosticContext::new(),
            shutdown,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn diagnostics(&self) -> &DiagnosticContext {
        &self.diagnostics
    }

    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }
}

impl fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContext")
            .field("service", &self.service)
            .field("shutdown", &self.shutdown.is_triggered())
            .finish()
    }
}

/// 关闭信号的只读视图，可任意克隆。
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// 等待关闭信号；宿主已经退出（发送端被丢弃）时立即返回。
    pub async fn wait(&self) {
        let mut receiver = self.receiver.clone();
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }
}

/// 关闭信号的发送端，仅宿主持有。
#[derive(Debug)]
pub(crate) struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub(crate) fn new() -> (Self, ShutdownSignal) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, ShutdownSignal { receiver })
    }

    pub(crate) fn trigger(&self) {
        self.sender.send_replace(true);
    }
}
