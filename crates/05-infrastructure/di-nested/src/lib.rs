//! # 嵌套容器
//!
//! [`native`] 是以插件族和嵌套容器为核心的原生引擎，[`NestedAdapter`]
//! 把抽象注册表转换到该引擎之上，统一默认实例策略并模拟任意深度的作用域。

pub mod native;

mod adapter;

pub use adapter::{NestedAdapter, NestedContainer, NestedScope, ENGINE_NAME};
