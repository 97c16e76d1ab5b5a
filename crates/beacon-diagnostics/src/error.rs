//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 诊断收集原语的错误面极小：只有“必填参数缺失”属于调用方的编程错误；
//! - 完成后写入、重复完成、重复释放等竞态均被定义为无害的空操作，不在此建模。
//!
//! ## 设计要求（What）
//! - 错误类型派生 `thiserror::Error`，可直接交给 `anyhow` 等上层框架处理；
//! - `argument` 使用 `&'static str` 标识缺失的参数，避免在错误路径上分配。

use thiserror::Error;

/// 诊断收集原语的错误域。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum DiagnosticsError {
    /// 必填参数缺失。
    ///
    /// - **契约 (What)**：同步返回给直接调用方，组件内部不做恢复；
    /// - **触发点**：构造收集器时缺少链式资源，或追加属性时缺少属性本身。
    #[error("required argument `{argument}` is missing")]
    InvalidArgument { argument: &'static str },
}

impl DiagnosticsError {
    pub(crate) const fn missing(argument: &'static str) -> Self {
        Self::InvalidArgument { argument }
    }
}

/// crate 统一的结果别名，默认错误类型为 [`DiagnosticsError`]。
pub type Result<T, E = DiagnosticsError> = core::result::Result<T, E>;
