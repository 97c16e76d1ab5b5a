//! 诊断收集器生命周期契约测试。
//!
//! # 教案级导览
//! - **Why**：收集器的价值在于“并发写入 + 恰好一次收割 + 登记必然释放”三条保证，任何一条失效都会导致
//!   日志缺字段或上下文泄漏；
//! - **How**：以计数闭包作为链式登记，观测释放次数；以多线程写入模拟真实请求内的并发贡献者；
//! - **What**：覆盖构造/写入的参数校验、完成幂等、完成后写入无效、释放幂等与 Drop 兜底。

use std::sync::{
    Arc, Barrier,
    atomic::{AtomicUsize, Ordering},
};
use std::thread;

use beacon_diagnostics::{
    DiagnosticContextCollector, DiagnosticsError, LogProperty, PropertyValue, ScopeRegistration,
};
use tracing_test::traced_test;

fn counting_registration() -> (ScopeRegistration, Arc<AtomicUsize>) {
    let released = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&released);
    let registration = ScopeRegistration::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (registration, released)
}

fn sorted(mut properties: Vec<LogProperty>) -> Vec<(String, PropertyValue)> {
    properties.sort_by(|left, right| left.name().cmp(right.name()));
    properties
        .into_iter()
        .map(|property| {
            let (name, value) = property.into_parts();
            (name.into_owned(), value)
        })
        .collect()
}

/// ## 场景一：两个线程分别写入，完成方收到全部属性
///
/// - **意图 (Why)**：对应请求内“身份中间件写 user、响应阶段写 status”的典型用法；
/// - **逻辑 (How)**：两个线程在屏障后并发写入，全部 join 之后再完成；
/// - **契约 (What)**：完成结果恰为两条属性，登记释放一次，再次完成返回 `None`。
#[test]
fn concurrent_contributors_are_all_harvested() {
    let (registration, released) = counting_registration();
    let collector = Arc::new(DiagnosticContextCollector::new(registration));
    let barrier = Arc::new(Barrier::new(2));

    let user = {
        let collector = Arc::clone(&collector);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            collector.add_or_update(LogProperty::new("user", "alice"));
        })
    };
    let status = {
        let collector = Arc::clone(&collector);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            collector.add_or_update(LogProperty::new("status", 200));
        })
    };
    user.join().expect("写入线程不应 panic");
    status.join().expect("写入线程不应 panic");

    let properties = collector.try_complete().expect("首次完成必须返回属性");
    assert_eq!(
        sorted(properties),
        vec![
            ("status".to_owned(), PropertyValue::Int(200)),
            ("user".to_owned(), PropertyValue::from("alice")),
        ]
    );
    assert_eq!(released.load(Ordering::SeqCst), 1, "完成时必须释放登记");
    assert!(collector.try_complete().is_none(), "第二次完成必须返回 None");
    assert_eq!(released.load(Ordering::SeqCst), 1, "重复完成不得再次释放");
}

/// ## 场景二：未写入、未完成即释放
#[test]
fn dispose_before_completion_releases_and_discards() {
    let (registration, released) = counting_registration();
    let collector = DiagnosticContextCollector::new(registration);

    collector.dispose();

    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(!collector.is_active());
    assert!(collector.try_complete().is_none(), "释放后的收集器不得再交出属性");
}

#[test]
fn dispose_discards_pending_properties() {
    let collector = DiagnosticContextCollector::new(ScopeRegistration::detached());
    collector.set("user", "alice");
    assert_eq!(collector.len(), 1);

    collector.dispose();

    assert!(collector.is_empty());
    assert!(collector.try_complete().is_none());
}

#[test]
fn same_name_is_last_write_wins() {
    let collector = DiagnosticContextCollector::new(ScopeRegistration::detached());
    collector.set("status", 500);
    collector.set("status", 200);
    collector.set("route", "/orders");

    let properties = sorted(collector.try_complete().expect("应返回属性"));
    assert_eq!(
        properties,
        vec![
            ("route".to_owned(), PropertyValue::from("/orders")),
            ("status".to_owned(), PropertyValue::Int(200)),
        ]
    );
}

#[test]
fn empty_collection_still_completes_once() {
    let collector = DiagnosticContextCollector::new(ScopeRegistration::detached());
    assert_eq!(collector.try_complete(), Some(Vec::new()));
    assert_eq!(collector.try_complete(), None);
}

#[test]
#[traced_test]
fn writes_after_completion_are_silently_dropped() {
    let collector = DiagnosticContextCollector::new(ScopeRegistration::detached());
    collector.set("before", true);
    let harvested = collector.try_complete().expect("应返回属性");
    assert_eq!(harvested.len(), 1);

    collector.set("after", true);
    collector
        .try_add_or_update(Some(LogProperty::new("after", 1)))
        .expect("完成后的写入不应报错");

    assert!(collector.is_empty());
    assert!(collector.try_complete().is_none());
    assert!(logs_contain("diagnostic property dropped after collection ended"));
}

#[test]
#[traced_test]
fn writes_after_dispose_are_silently_dropped() {
    let (registration, released) = counting_registration();
    let collector = DiagnosticContextCollector::new(registration);
    collector.dispose();

    collector.set("after", true);
    collector
        .try_add_or_update(Some(LogProperty::new("after", 1)))
        .expect("释放后的写入不应报错");

    assert!(collector.is_empty());
    assert!(collector.try_complete().is_none(), "释放后的写入不得复活收集");
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(logs_contain("diagnostic property dropped after collection ended"));
}

#[test]
fn dispose_is_idempotent_and_releases_once() {
    let (registration, released) = counting_registration();
    let collector = DiagnosticContextCollector::new(registration);

    collector.dispose();
    collector.dispose();
    collector.dispose();

    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn dispose_after_completion_does_not_release_again() {
    let (registration, released) = counting_registration();
    let collector = DiagnosticContextCollector::new(registration);
    collector.set("user", "alice");

    assert!(collector.try_complete().is_some());
    collector.dispose();
    drop(collector);

    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn dropping_an_active_collector_releases_registration() {
    let (registration, released) = counting_registration();
    {
        let collector = DiagnosticContextCollector::new(registration);
        collector.set("user", "alice");
    }
    assert_eq!(released.load(Ordering::SeqCst), 1, "Drop 必须兜底释放登记");
}

#[test]
fn missing_chained_resource_is_rejected() {
    let err = DiagnosticContextCollector::try_new(None).expect_err("缺少登记必须失败");
    assert_eq!(
        err,
        DiagnosticsError::InvalidArgument {
            argument: "chained_resource"
        }
    );
    assert_eq!(
        err.to_string(),
        "required argument `chained_resource` is missing"
    );
}

#[test]
fn missing_property_is_rejected_even_after_completion() {
    let collector = DiagnosticContextCollector::try_new(Some(ScopeRegistration::detached()))
        .expect("提供登记时构造必须成功");

    let err = collector.try_add_or_update(None).expect_err("缺少属性必须失败");
    assert_eq!(err, DiagnosticsError::InvalidArgument { argument: "property" });

    collector.try_complete();
    assert!(collector.try_add_or_update(None).is_err());
}

/// ## 竞态：多个写者与一个完成方
///
/// - **意图 (Why)**：完成时刻之后的写入必须全部丢失，之前的写入必须全部可见；
/// - **逻辑 (How)**：写入与完成的先后无法从外部精确观测，因此断言不变量：
///   完成结果中的每条属性都是某个写者真实写入过的值，且完成后收集器始终为空；
/// - **契约 (What)**：登记恰好释放一次，完成结果不含重复名称。
#[test]
fn racing_writers_and_finalizer_observe_consistent_snapshot() {
    const WRITERS: usize = 8;
    const WRITES_PER_THREAD: usize = 200;

    let (registration, released) = counting_registration();
    let collector = Arc::new(DiagnosticContextCollector::new(registration));
    let barrier = Arc::new(Barrier::new(WRITERS + 1));

    let writers: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let collector = Arc::clone(&collector);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..WRITES_PER_THREAD {
                    collector.set(format!("writer.{writer}"), round);
                }
            })
        })
        .collect();

    barrier.wait();
    let harvested = collector.try_complete().expect("唯一的完成方必须成功");
    for writer in writers {
        writer.join().expect("写入线程不应 panic");
    }

    let mut names: Vec<_> = harvested.iter().map(|p| p.name().to_owned()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), harvested.len(), "同名属性只能出现一次");
    for property in &harvested {
        match property.value() {
            PropertyValue::UInt(round) => assert!((*round as usize) < WRITES_PER_THREAD),
            other => panic!("出现非预期的属性值: {other:?}"),
        }
    }
    assert!(collector.is_empty(), "完成之后的写入必须被丢弃");
    assert!(collector.try_complete().is_none());
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn release_callback_may_reenter_the_collector() {
    let slot: Arc<std::sync::OnceLock<Arc<DiagnosticContextCollector>>> =
        Arc::new(std::sync::OnceLock::new());
    let observed = Arc::new(AtomicUsize::new(0));

    let registration = {
        let slot = Arc::clone(&slot);
        let observed = Arc::clone(&observed);
        ScopeRegistration::new(move || {
            if let Some(collector) = slot.get() {
                // 释放发生在实例锁之外，回访不会死锁。
                collector.set("late", 1);
                observed.store(usize::from(!collector.is_active()) + 1, Ordering::SeqCst);
            }
        })
    };
    let collector = Arc::new(DiagnosticContextCollector::new(registration));
    slot.set(Arc::clone(&collector)).expect("插槽只设置一次");

    assert!(collector.try_complete().is_some());
    assert_eq!(observed.load(Ordering::SeqCst), 2, "回调应观察到收集器已进入终态");
}
