//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 宿主启动链路上的失败（配置缺失、日志接线冲突、托管服务异常）统一归档到 [`HostError`]；
//! - 配置读取的细粒度原因单独建模为 [`SettingsError`]，保留文件路径便于排障。

use std::path::PathBuf;

use thiserror::Error;

/// 分层配置加载错误。
#[derive(Debug, Error)]
pub enum SettingsError {
    /// 必需的基础配置文件不存在。
    #[error("required settings file {} does not exist", .path.display())]
    Missing { path: PathBuf },

    #[error("failed to read settings file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {} is not valid TOML", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// 合并后的配置与 [`crate::HostSettings`] 结构不匹配。
    #[error("merged settings do not match the expected schema")]
    Invalid(#[source] toml::de::Error),
}

/// 宿主错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：`beacon-host` 的入口只关心“能否继续运行”，因此所有失败路径在此汇合，
///   由入口统一输出致命日志并以非零状态退出；
/// - **契约 (What)**：变体均为 `Send + Sync + 'static`，可跨任务传播。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HostError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("invalid logging configuration: {0}")]
    Logging(String),

    /// 进程内已存在全局 `tracing` Subscriber。
    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet,

    #[error("hosted service `{name}` failed: {message}")]
    Service { name: String, message: String },
}

impl HostError {
    pub fn service(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            name: name.into(),
            message: message.into(),
        }
    }
}
