//! # 生命周期作用域容器
//!
//! [`native`] 是以层级生命周期作用域为核心的原生引擎，[`LifetimeScopeAdapter`]
//! 把抽象注册表转换到该引擎之上，并补齐原生引擎不具备的作用域级联释放。

pub mod native;

mod adapter;

pub use adapter::{LifetimeScopeAdapter, LifetimeScopeContainer, LifetimeScopeScope, ENGINE_NAME};
