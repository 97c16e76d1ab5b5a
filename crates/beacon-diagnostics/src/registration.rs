use std::fmt;

/// 收集器在其外层作用域中的登记句柄需要实现的释放契约。
///
/// # 教案式说明
/// - **意图（Why）**：收集器通常被登记到某个上下文插槽中，收集结束（完成或提前拆除）时必须撤销登记，
///   否则后续贡献者仍会写入一个已经失效的收集器。
/// - **逻辑（How）**：以 `self: Box<Self>` 消费句柄，类型系统层面保证同一句柄只能释放一次；
///   闭包 `FnOnce() + Send` 自动实现该 Trait。
/// - **契约（What）**：`release` 可能在任意线程被调用，且调用时收集器的内部锁已经释放，
///   实现可以安全地回访收集器或其所属上下文。
pub trait ChainedResource: Send + 'static {
    fn release(self: Box<Self>);
}

impl<F> ChainedResource for F
where
    F: FnOnce() + Send + 'static,
{
    fn release(self: Box<Self>) {
        (*self)()
    }
}

/// 收集器持有的链式登记句柄。
///
/// 句柄本身不是 `Clone`，所有权随收集器转移；释放后即被消费。
pub struct ScopeRegistration {
    resource: Box<dyn ChainedResource>,
}

impl ScopeRegistration {
    pub fn new(resource: impl ChainedResource) -> Self {
        Self {
            resource: Box::new(resource),
        }
    }

    /// 不关联任何外部插槽的登记，适用于独立使用收集器的场景。
    pub fn detached() -> Self {
        Self::new(|| {})
    }

    pub(crate) fn release(self) {
        self.resource.release();
    }
}

impl fmt::Debug for ScopeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeRegistration").finish_non_exhaustive()
    }
}
