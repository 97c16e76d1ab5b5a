use std::future::Future;
use std::time::{Duration, Instant};

use beacon_diagnostics::{
    DiagnosticContext, LogProperty, OperationScope,
    keys::{operation as operation_keys, property as property_keys},
    property::PropertyMap,
};
use serde_json::{Map, Value, json};

const TRACING_TARGET: &str = "beacon::hosting::operation";

/// 一次被托管的逻辑操作的结果与收割到的诊断属性。
#[derive(Debug)]
pub struct OperationReport<T> {
    pub output: T,
    pub properties: Vec<LogProperty>,
    pub elapsed: Duration,
}

impl<T> OperationReport<T> {
    /// 以稳定键名汇总操作：名称、耗时、属性数量与属性对象。
    pub fn summary(&self, name: &str) -> Value {
        let properties = serde_json::to_value(PropertyMap(&self.properties))
            .unwrap_or_else(|err| json!({ "$error": err.to_string() }));
        let mut summary = Map::new();
        summary.insert(operation_keys::FIELD_NAME.to_owned(), json!(name));
        summary.insert(
            operation_keys::FIELD_ELAPSED_MS.to_owned(),
            json!(self.elapsed.as_millis() as u64),
        );
        summary.insert(
            property_keys::FIELD_COUNT.to_owned(),
            json!(self.properties.len()),
        );
        summary.insert(property_keys::FIELD_PROPERTIES.to_owned(), properties);
        Value::Object(summary)
    }
}

/// 在一次收集作用域内执行 `operation`，结束后收割属性并输出一条汇总日志。
///
/// # 教案式说明
/// - **意图（Why）**：把“每个操作恰好一个收集器、结束时恰好收割一次”的责任集中在这里，
///   业务代码只需通过传入的 [`DiagnosticContext`] 写属性；
/// - **逻辑（How）**：
///   1. 通过 [`OperationScope::begin`] 在 `context` 上开启收集；
///   2. 把上下文克隆交给 `operation` 并等待其完成；
///   3. 完成作用域、计算耗时并以 INFO 级别输出汇总；
/// - **契约（What）**：若返回的 Future 在完成前被丢弃（任务取消）或 `operation` panic，
///   作用域的 `Drop` 会释放收集，`context` 不会残留失效的收集器。
pub async fn instrument_operation<F, Fut, T>(
    context: &DiagnosticContext,
    name: &str,
    operation: F,
) -> OperationReport<T>
where
    F: FnOnce(DiagnosticContext) -> Fut,
    Fut: Future<Output = T>,
{
    let started = Instant::now();
    let scope = OperationScope::begin(context);
    let output = operation(scope.context().clone()).await;
    let properties = scope.complete();

    let report = OperationReport {
        output,
        properties,
        elapsed: started.elapsed(),
    };
    tracing::info!(
        target: TRACING_TARGET,
        operation = name,
        summary = %report.summary(name),
        "operation completed"
    );
    report
}
