#![deny(unsafe_code)]
#![doc = "beacon-diagnostics: 以逻辑操作（如一次入站请求）为单位收集诊断属性的并发原语。"]
#![doc = ""]
#![doc = "== 模块导览 =="]
#![doc = "1. [`collector`]：线程安全的属性收集器，支持多写者并发追加与“恰好一次”的完成语义。"]
#![doc = "2. [`context`]：单个逻辑操作的上下文插槽，供贡献者在不知晓收集器生命周期的前提下写入属性。"]
#![doc = "3. [`scope`]：RAII 形式的操作作用域，保证任何退出路径都会释放链式登记。"]
#![doc = "4. [`property`]：属性名与结构化属性值模型。"]

pub mod collector;
pub mod context;
pub mod error;
pub mod keys;
pub mod property;
pub mod registration;
pub mod scope;

mod sync;

pub use collector::DiagnosticContextCollector;
pub use context::DiagnosticContext;
pub use error::{DiagnosticsError, Result};
pub use property::{LogProperty, PropertyValue};
pub use registration::{ChainedResource, ScopeRegistration};
pub use scope::OperationScope;
