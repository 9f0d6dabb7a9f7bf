//! # Infrastructure Common
//!
//! 依赖注入基础设施的公共类型。
//!
//! ## 核心类型
//!
//! - [`TypeInfo`] - 契约与实现类型的标识
//! - [`Lifetime`] - 组件生命周期
//! - [`Disposable`] - 可释放组件
//! - [`DiError`] - 注册、构建、解析、适配各阶段的错误
//!
//! ## 设计原则
//!
//! - 基于 Rust 类型系统的编译时安全
//! - 与具体容器引擎无关
//! - 错误同步返回，不在核心层记录或重试

pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
