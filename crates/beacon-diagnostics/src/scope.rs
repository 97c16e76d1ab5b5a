use std::sync::Arc;

use crate::{
    collector::DiagnosticContextCollector, context::DiagnosticContext, property::LogProperty,
};

/// 一次逻辑操作的 RAII 收集作用域。
///
/// # 教案式说明
/// - **意图（Why）**：操作结束的路径有很多（正常返回、`?` 提前返回、panic 展开、任务被取消），
///   逐一手写 `dispose` 容易遗漏；作用域对象把“开启收集”与“撤销登记”绑定到所有权上。
/// - **逻辑（How）**：`begin` 时在上下文中开启收集；[`Self::complete`] 消费作用域并收割属性；
///   若作用域在未完成时被丢弃，`Drop` 调用收集器的 `dispose`，丢弃属性并释放登记。
/// - **契约（What）**：无论走哪条退出路径，链式登记都恰好释放一次；`complete` 若发现收集已被他方结束，
///   返回空集合。
#[must_use = "作用域被立即丢弃会直接终止收集"]
#[derive(Debug)]
pub struct OperationScope {
    context: DiagnosticContext,
    collector: Arc<DiagnosticContextCollector>,
}

impl OperationScope {
    pub fn begin(context: &DiagnosticContext) -> Self {
        let collector = context.begin_collection();
        Self {
            context: context.clone(),
            collector,
        }
    }

    /// 供贡献者使用的上下文句柄。
    pub fn context(&self) -> &DiagnosticContext {
        &self.context
    }

    pub fn collector(&self) -> &Arc<DiagnosticContextCollector> {
        &self.collector
    }

    /// 结束作用域并返回收集到的属性。
    pub fn complete(self) -> Vec<LogProperty> {
        // Drop 随后执行的 dispose 在完成态下不会产生任何效果。
        self.collector.try_complete().unwrap_or_default()
    }
}

impl Drop for OperationScope {
    fn drop(&mut self) {
        self.collector.dispose();
    }
}
