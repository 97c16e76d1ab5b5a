use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use crate::{
    error::{DiagnosticsError, Result},
    keys::TRACING_TARGET,
    property::{LogProperty, PropertyValue},
    registration::ScopeRegistration,
    sync::Mutex,
};

/// `DiagnosticContextCollector` 在一次逻辑操作的生命周期内累积诊断属性，并在操作结束时恰好交出一次。
///
/// # 教案式说明
/// - **意图（Why）**：属性来自操作内部的任意代码路径，且可能跨线程并发写入；汇总方只在操作结束时读取一次。
///   收集器把“并发写入”与“一次性收割”两件事收敛到同一把实例锁上，贡献者无需知道操作是否已经结束。
/// - **逻辑（How）**：
///   1. 内部以三态 [`CollectionState`] 表达生命周期：`Active` 持有属性表，`Completed`/`Disposed` 均为惰性终态；
///   2. [`Self::add_or_update`] 与 [`Self::try_complete`] 在同一把互斥锁下读写属性表，临界区为 O(1)；
///   3. 链式登记 [`ScopeRegistration`] 与属性表位于同一把锁内，首个终止路径将其取出，解锁后再释放。
/// - **契约（What）**：
///   - `try_complete` 至多返回一次 `Some`；
///   - 任何在终态之后发生的写入都被静默丢弃；
///   - 登记句柄在“成功完成 / 显式释放 / Drop”三者中最先发生的那一刻被释放，且只释放一次。
/// - **权衡（Trade-offs）**：选择单锁 + `HashMap` 而非无锁结构，换取快照一致性：完成方永远不会看到某次写入的“半截”。
pub struct DiagnosticContextCollector {
    inner: Mutex<CollectorInner>,
}

struct CollectorInner {
    state: CollectionState,
    registration: Option<ScopeRegistration>,
}

enum CollectionState {
    Active(HashMap<Cow<'static, str>, LogProperty>),
    Completed,
    Disposed,
}

impl CollectionState {
    fn label(&self) -> &'static str {
        match self {
            Self::Active(_) => "active",
            Self::Completed => "completed",
            Self::Disposed => "disposed",
        }
    }
}

impl DiagnosticContextCollector {
    /// 以链式登记句柄构造收集器，初始状态为 `Active` 且属性表为空。
    pub fn new(registration: ScopeRegistration) -> Self {
        Self {
            inner: Mutex::new(CollectorInner {
                state: CollectionState::Active(HashMap::new()),
                registration: Some(registration),
            }),
        }
    }

    /// 接受可能缺失的登记句柄，缺失时返回 [`DiagnosticsError::InvalidArgument`]。
    ///
    /// 适用于登记句柄来自动态装配路径（如插件或桥接层）、无法在类型层面保证存在的场景。
    pub fn try_new(registration: Option<ScopeRegistration>) -> Result<Self> {
        registration
            .map(Self::new)
            .ok_or(DiagnosticsError::missing("chained_resource"))
    }

    /// 写入或覆盖同名属性。
    ///
    /// - **前置条件**：无；调用方不需要知道操作是否已经结束；
    /// - **后置条件**：收集器处于 `Active` 时属性表以名称为键插入或覆盖，否则调用不产生任何效果。
    pub fn add_or_update(&self, property: LogProperty) {
        let mut inner = self.inner.lock();
        match &mut inner.state {
            CollectionState::Active(properties) => {
                properties.insert(property.key(), property);
            }
            state => {
                tracing::trace!(
                    target: TRACING_TARGET,
                    property = property.name(),
                    state = state.label(),
                    "diagnostic property dropped after collection ended"
                );
            }
        }
    }

    /// [`Self::add_or_update`] 的可缺省版本，属性缺失时返回 [`DiagnosticsError::InvalidArgument`]。
    pub fn try_add_or_update(&self, property: Option<LogProperty>) -> Result<()> {
        let property = property.ok_or(DiagnosticsError::missing("property"))?;
        self.add_or_update(property);
        Ok(())
    }

    /// `add_or_update(LogProperty::new(name, value))` 的简写。
    pub fn set(&self, name: impl Into<Cow<'static, str>>, value: impl Into<PropertyValue>) {
        self.add_or_update(LogProperty::new(name, value));
    }

    /// 结束收集并取回全部属性。
    ///
    /// # 契约说明
    /// - 收集器处于 `Active`：原子地取走属性表、转入 `Completed`、释放链式登记，返回 `Some(properties)`，顺序无意义；
    /// - 已完成或已释放：返回 `None`，不再执行任何动作，重复调用保持幂等。
    pub fn try_complete(&self) -> Option<Vec<LogProperty>> {
        let (properties, registration) = {
            let mut inner = self.inner.lock();
            let properties =
                match std::mem::replace(&mut inner.state, CollectionState::Completed) {
                    CollectionState::Active(properties) => properties,
                    // 终态之间不互相覆盖：已释放的收集器不会被改写为已完成。
                    terminal => {
                        inner.state = terminal;
                        return None;
                    }
                };
            (properties, inner.registration.take())
        };

        tracing::trace!(
            target: TRACING_TARGET,
            count = properties.len(),
            "diagnostic collection completed"
        );
        if let Some(registration) = registration {
            registration.release();
        }
        Some(properties.into_values().collect())
    }

    /// 丢弃尚未收割的属性并释放链式登记，可重复调用。
    ///
    /// 用于作用域提前拆除（未调用 [`Self::try_complete`]）的路径；完成之后再调用不会产生任何效果。
    pub fn dispose(&self) {
        let registration = {
            let mut inner = self.inner.lock();
            if let CollectionState::Active(properties) = &inner.state {
                tracing::trace!(
                    target: TRACING_TARGET,
                    discarded = properties.len(),
                    "diagnostic collection disposed before completion"
                );
                inner.state = CollectionState::Disposed;
            }
            inner.registration.take()
        };
        if let Some(registration) = registration {
            registration.release();
        }
    }

    /// 收集器是否仍接受写入。
    pub fn is_active(&self) -> bool {
        matches!(self.inner.lock().state, CollectionState::Active(_))
    }

    /// 当前已收集的属性数量，终态下恒为 0。
    pub fn len(&self) -> usize {
        match &self.inner.lock().state {
            CollectionState::Active(properties) => properties.len(),
            CollectionState::Completed | CollectionState::Disposed => 0,
        }
    }

    /// 是否尚无属性；终态下恒为 `true`。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for DiagnosticContextCollector {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for DiagnosticContextCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        let count = match &inner.state {
            CollectionState::Active(properties) => properties.len(),
            _ => 0,
        };
        f.debug_struct("DiagnosticContextCollector")
            .field("state", &inner.state.label())
            .field("property_count", &count)
            .field("registered", &inner.registration.is_some())
            .finish()
    }
}
