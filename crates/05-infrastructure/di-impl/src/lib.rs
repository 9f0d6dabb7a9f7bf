//! # 依赖注入内置实现
//!
//! 不依赖第三方引擎、直接按注册描述执行生命周期算法的参考容器。
//!
//! - 单例缓存在根容器中，以根容器为解析上下文创建，并发首次访问时只创建一次
//! - 作用域实例缓存在当前作用域中，作用域释放时按创建的逆序释放
//! - 瞬时实例从不缓存，需要释放的瞬时实例由解析上下文所在的作用域跟踪
//! - 解析上下文显式传递，不使用全局状态

mod container;
mod engine;

pub use container::{BuiltinAdapter, BuiltinContainer, BuiltinScope, ENGINE_NAME};
