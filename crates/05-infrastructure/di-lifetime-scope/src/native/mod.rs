//! # 生命周期作用域引擎
//!
//! 以层级生命周期作用域为核心的原生容器：
//!
//! - 实例共享由 [`InstanceSharing`] 和 [`InstanceLifetime`] 两个维度共同决定
//! - 激活事件可以替换刚创建的实例
//! - 每个作用域按激活的逆序释放自己拥有的实例，不级联子作用域
//! - 同一服务多次注册时最后一次为默认

mod error;
mod registration;
mod scope;

pub use error::{LifetimeScopeError, LifetimeScopeResult};
pub use registration::{
    ActivatingHandler, DelegateActivator, InstanceLifetime, InstanceOwnership, InstanceSharing,
    NativeInstance, RegistrationBuilder, ReleaseHandler, Service,
};
pub use scope::{
    ComponentContext, ContainerBuilder, LifetimeScope, LifetimeScopeOptions, ResolveAll, ROOT_TAG,
};
