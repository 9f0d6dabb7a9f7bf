//! # 容器组合层
//!
//! 把配置、日志、扩展模块和后端引擎组合成一个可用的容器。
//! 应用只面向 [`di_abstractions`] 中的抽象编程，具体引擎由配置决定。
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use di_abstractions::{Component, ResolverExt};
//! use infrastructure_composition::{CompositionBuilder, EngineKind};
//! use std::sync::Arc;
//!
//! struct Greeting(&'static str);
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let container = CompositionBuilder::new()
//!         .load_options(Some("di.toml"), "DI")?
//!         .engine(EngineKind::Nested)
//!         .configure(|registry| {
//!             registry.register(
//!                 Component::<Greeting>::from_factory(|_| Ok(Arc::new(Greeting("hello"))))
//!                     .singleton(),
//!             )?;
//!             Ok(())
//!         })?
//!         .build()?;
//!
//!     println!("{}", container.resolve::<Greeting>()?.0);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod error;
pub mod options;


pub use builder::{CompositionBuilder, LoggingConfig};
pub use error::{CompositionError, CompositionResult};
pub use options::{CompositionOptions, EngineKind, DEFAULT_ENV_PREFIX};
