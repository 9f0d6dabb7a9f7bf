//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义与具体容器引擎无关的注册和解析接口。
//!
//! ## 核心接口
//!
//! - [`ComponentRegistry`] - 组件注册表
//! - [`Component`] - 类型化的注册构建器
//! - [`Resolver`] / [`ResolverExt`] - 依赖解析接口
//! - [`Container`] / [`ContainerScope`] - 容器与作用域
//! - [`ContainerAdapter`] - 引擎适配器
//! - [`Facility`] - 扩展模块

pub mod container;
pub mod facility;
pub mod factory;
pub mod registration;
pub mod registry;
pub mod resolver;

pub use container::*;
pub use facility::*;
pub use factory::*;
pub use registration::*;
pub use registry::*;
pub use resolver::*;
