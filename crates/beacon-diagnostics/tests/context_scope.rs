//! 上下文插槽与 RAII 作用域的协作契约。
//!
//! - **Why**：贡献者只持有 `DiagnosticContext`，必须在收集结束后自动失效，而不是继续写入旧收集器；
//! - **How**：通过上下文的多个克隆模拟分布在不同调用层的贡献者；
//! - **What**：完成、提前丢弃、重复开启三条路径下插槽状态与收割结果都符合预期。

use std::thread;

use beacon_diagnostics::{
    DiagnosticContext, DiagnosticsError, LogProperty, OperationScope, PropertyValue,
};

#[test]
fn set_without_collection_is_a_noop() {
    let context = DiagnosticContext::new();
    context.set("user", "alice");
    assert!(!context.is_collecting());
    assert!(context.current_collector().is_none());
}

#[test]
fn try_set_rejects_missing_property_without_collection() {
    let context = DiagnosticContext::new();
    assert_eq!(
        context.try_set(None),
        Err(DiagnosticsError::InvalidArgument { argument: "property" })
    );
    assert_eq!(context.try_set(Some(LogProperty::new("ok", true))), Ok(()));
}

#[test]
fn completion_clears_the_slot_for_every_clone() {
    let context = DiagnosticContext::new();
    let contributor = context.clone();

    let collector = context.begin_collection();
    assert!(contributor.is_collecting());
    contributor.set("user", "alice");

    let harvested = collector.try_complete().expect("首次完成必须返回属性");
    assert_eq!(harvested, vec![LogProperty::new("user", "alice")]);
    assert!(!context.is_collecting(), "完成后插槽必须清空");

    contributor.set("late", 1);
    assert!(collector.is_empty());
}

#[test]
fn contributions_from_worker_threads_reach_the_scope() {
    let context = DiagnosticContext::new();
    let scope = OperationScope::begin(&context);

    let workers: Vec<_> = (0..4)
        .map(|index| {
            let contributor = scope.context().clone();
            thread::spawn(move || contributor.set(format!("worker.{index}"), index))
        })
        .collect();
    for worker in workers {
        worker.join().expect("贡献线程不应 panic");
    }

    let mut harvested = scope.complete();
    harvested.sort_by(|a, b| a.name().cmp(b.name()));
    let names: Vec<_> = harvested.iter().map(LogProperty::name).collect();
    assert_eq!(names, ["worker.0", "worker.1", "worker.2", "worker.3"]);
    assert!(!context.is_collecting());
}

#[test]
fn dropping_scope_early_disposes_collection() {
    let context = DiagnosticContext::new();
    let collector = {
        let scope = OperationScope::begin(&context);
        scope.context().set("user", "alice");
        std::sync::Arc::clone(scope.collector())
    };

    assert!(!context.is_collecting(), "提前丢弃作用域必须撤销登记");
    assert!(!collector.is_active());
    assert!(collector.try_complete().is_none());
}

#[test]
fn early_return_path_still_releases_registration() {
    fn handle(context: &DiagnosticContext, fail: bool) -> Result<Vec<LogProperty>, &'static str> {
        let scope = OperationScope::begin(context);
        scope.context().set("stage", "validated");
        if fail {
            return Err("rejected");
        }
        Ok(scope.complete())
    }

    let context = DiagnosticContext::new();
    assert_eq!(handle(&context, true), Err("rejected"));
    assert!(!context.is_collecting());

    let harvested = handle(&context, false).expect("正常路径应返回属性");
    assert_eq!(harvested, vec![LogProperty::new("stage", "validated")]);
    assert!(!context.is_collecting());
}

#[test]
fn superseded_collector_does_not_clear_newer_registration() {
    let context = DiagnosticContext::new();
    let first = context.begin_collection();
    let second = context.begin_collection();

    context.set("owner", "second");
    assert!(first.is_empty(), "写入只进入当前收集器");

    assert_eq!(first.try_complete(), Some(Vec::new()));
    assert!(context.is_collecting(), "旧收集器完成不得摘除新收集器");

    let harvested = second.try_complete().expect("新收集器应返回属性");
    assert_eq!(
        harvested[0].value(),
        &PropertyValue::from("second"),
        "属性应写入新收集器"
    );
    assert!(!context.is_collecting());
}

#[test]
fn dropping_context_while_collecting_does_not_leak_or_panic() {
    let context = DiagnosticContext::new();
    let collector = context.begin_collection();
    drop(context);

    collector.set("user", "alice");
    assert_eq!(collector.try_complete().map(|p| p.len()), Some(1));
}
