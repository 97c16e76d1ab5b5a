#![deny(unsafe_code)]
#![doc = "beacon-hosting: 为诊断上下文收集提供宿主装配、分层配置与日志接线。"]
#![doc = ""]
#![doc = "宿主为每个托管服务分配独立的 [`beacon_diagnostics::DiagnosticContext`]，"]
#![doc = "服务内部的每次逻辑操作通过 [`instrument_operation`] 开启并收割一次收集。"]

pub mod error;
pub mod heartbeat;
pub mod host;
pub mod logging;
pub mod operation;
pub mod service;
pub mod settings;

pub use error::{HostError, SettingsError};
pub use heartbeat::HeartbeatService;
pub use host::{Host, HostBuilder};
pub use logging::install_logging;
pub use operation::{OperationReport, instrument_operation};
pub use service::{HostedService, ServiceContext, ShutdownSignal};
pub use settings::{
    ApplicationSettings, HeartbeatSettings, HostSettings, LogFormat, LoggingSettings,
    SettingsLoader,
};
