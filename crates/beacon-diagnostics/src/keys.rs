//! 可观测性键名契约：描述一次诊断收集的日志字段统一在此定义。
//!
//! 教案式说明（Why）：宿主层在操作结束时输出汇总事件，键名集中管理可避免各处字符串漂移。
//! 契约定义（What）：各子模块提供只读常量，供日志与追踪统一引用。

/// 操作级日志字段
pub mod operation {
    #[doc = "类型：日志字段。"]
    #[doc = "适用范围：日志、追踪。"]
    #[doc = ""]
    #[doc = "逻辑操作名称，通常为低基数的路由或任务标识。"]
    pub const FIELD_NAME: &str = "diagnostics.operation.name";

    #[doc = "类型：日志字段。"]
    #[doc = "适用范围：日志。"]
    #[doc = ""]
    #[doc = "逻辑操作从开始收集到完成的耗时（毫秒）。"]
    pub const FIELD_ELAPSED_MS: &str = "diagnostics.operation.elapsed_ms";
}

/// 属性集合日志字段
pub mod property {
    #[doc = "类型：日志字段。"]
    #[doc = "适用范围：日志。"]
    #[doc = ""]
    #[doc = "完成时收集到的属性数量。"]
    pub const FIELD_COUNT: &str = "diagnostics.property.count";

    #[doc = "类型：日志字段。"]
    #[doc = "适用范围：日志。"]
    #[doc = ""]
    #[doc = "完成时收集到的属性集合（JSON 对象）。"]
    pub const FIELD_PROPERTIES: &str = "diagnostics.properties";
}

/// `tracing` 事件使用的 target。
pub const TRACING_TARGET: &str = "beacon::diagnostics";
