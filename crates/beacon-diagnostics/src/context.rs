use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::{
    collector::DiagnosticContextCollector,
    error::{DiagnosticsError, Result},
    property::{LogProperty, PropertyValue},
    registration::ScopeRegistration,
    sync::Mutex,
};

/// `DiagnosticContext` 是单个逻辑操作的诊断上下文插槽，贡献者通过它找到“当前”收集器。
///
/// # 设计初衷（Why）
/// - 贡献者分布在操作内部的各个调用层级，不应感知收集器何时创建、何时完成；
/// - 不使用全局或线程局部状态：上下文作为显式参数沿调用链传递，克隆开销为一次 `Arc` 计数。
///
/// # 关键逻辑（How）
/// - 插槽内保存当前收集器与一个单调递增的代次号；
/// - [`Self::begin_collection`] 为新收集器生成一个链式登记：释放时仅当插槽仍指向同一代次才清空插槽，
///   登记只持有插槽的 `Weak` 引用，上下文被整体丢弃时不会形成循环引用；
/// - [`Self::set`] 在插槽锁内克隆收集器引用，解锁后再写入，避免两把锁嵌套。
///
/// # 契约说明（What）
/// - 所有克隆共享同一插槽，收集完成或释放后，任一克隆上的 `set` 均为空操作；
/// - 重复调用 `begin_collection` 会以新收集器替换旧收集器，但不会释放旧收集器，
///   旧收集器的生命周期仍由其创建方负责。
///
/// # 生命周期与线程安全
/// - 类型为 `Send + Sync`，可随任务跨线程移动；
/// - 插槽内持有的收集器引用始终在插槽锁之外丢弃，收集器 `Drop` 触发的登记释放不会与插槽锁重入。
#[derive(Clone)]
pub struct DiagnosticContext {
    slot: Arc<Mutex<Slot>>,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    current: Option<Arc<DiagnosticContextCollector>>,
}

impl Default for DiagnosticContext {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }
}

impl DiagnosticContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开启一次新的收集，并将其登记为本上下文的当前收集器。
    ///
    /// - **后置条件**：返回的收集器处于 `Active`；其完成或释放时会把自己从插槽中摘除；
    /// - **注意事项**：调用方负责在操作结束时调用 `try_complete` 或 `dispose`，
    ///   更推荐通过 [`crate::scope::OperationScope`] 获得 RAII 保证。
    pub fn begin_collection(&self) -> Arc<DiagnosticContextCollector> {
        let weak_slot = Arc::downgrade(&self.slot);
        let (collector, previous) = {
            let mut slot = self.slot.lock();
            slot.generation = slot.generation.wrapping_add(1);
            let generation = slot.generation;
            let registration = ScopeRegistration::new(move || {
                let Some(slot) = weak_slot.upgrade() else {
                    return;
                };
                let released = {
                    let mut slot = slot.lock();
                    if slot.generation == generation {
                        slot.current.take()
                    } else {
                        None
                    }
                };
                drop(released);
            });
            let collector = Arc::new(DiagnosticContextCollector::new(registration));
            let previous = slot.current.replace(Arc::clone(&collector));
            (collector, previous)
        };
        drop(previous);
        collector
    }

    /// 向当前收集器写入属性；没有活跃收集时静默忽略。
    pub fn set(&self, name: impl Into<Cow<'static, str>>, value: impl Into<PropertyValue>) {
        self.add_or_update(LogProperty::new(name, value));
    }

    /// 向当前收集器写入已构造的属性；没有活跃收集时静默忽略。
    pub fn add_or_update(&self, property: LogProperty) {
        if let Some(collector) = self.current_collector() {
            collector.add_or_update(property);
        }
    }

    /// 可缺省版本：属性缺失时无论是否存在活跃收集都返回 [`DiagnosticsError::InvalidArgument`]。
    pub fn try_set(&self, property: Option<LogProperty>) -> Result<()> {
        let property = property.ok_or(DiagnosticsError::missing("property"))?;
        self.add_or_update(property);
        Ok(())
    }

    /// 返回当前登记的收集器（若有）。
    pub fn current_collector(&self) -> Option<Arc<DiagnosticContextCollector>> {
        self.slot.lock().current.clone()
    }

    pub fn is_collecting(&self) -> bool {
        self.slot.lock().current.is_some()
    }
}

impl fmt::Debug for DiagnosticContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("DiagnosticContext")
            .field("generation", &slot.generation)
            .field("collecting", &slot.current.is_some())
            .finish()
    }
}
