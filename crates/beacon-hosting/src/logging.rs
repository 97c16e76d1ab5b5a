//! 日志接线：把 [`LoggingSettings`] 翻译为全局 `tracing` Subscriber。
//!
//! # 教案式说明
//! - **意图（Why）**：宿主启动时只安装一次 Subscriber，之后所有组件（包括诊断收集器的 trace 事件）
//!   都经由同一条 `fmt` 管线输出；
//! - **逻辑（How）**：`RUST_LOG` 优先，其次使用配置中的 `level` 指令串；按 `format` 选择完整或紧凑格式；
//! - **契约（What）**：重复安装或外部已设置全局 Subscriber 时返回 [`HostError::SubscriberAlreadySet`]。

use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

use crate::{
    error::HostError,
    settings::{LogFormat, LoggingSettings},
};

pub fn install_logging(settings: &LoggingSettings) -> Result<(), HostError> {
    if dispatcher::has_been_set() {
        return Err(HostError::SubscriberAlreadySet);
    }

    let filter = build_env_filter(&settings.level)?;
    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer().with_ansi(settings.ansi).with_target(true);
    let installed = match settings.format {
        LogFormat::Full => tracing::subscriber::set_global_default(registry.with(layer)),
        LogFormat::Compact => {
            tracing::subscriber::set_global_default(registry.with(layer.compact()))
        }
    };
    installed.map_err(|_| HostError::SubscriberAlreadySet)
}

fn build_env_filter(level: &str) -> Result<EnvFilter, HostError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => filter_from_level(level),
    }
}

fn filter_from_level(level: &str) -> Result<EnvFilter, HostError> {
    EnvFilter::try_new(level)
        .map_err(|err| HostError::Logging(format!("invalid level directive `{level}`: {err}")))
}
