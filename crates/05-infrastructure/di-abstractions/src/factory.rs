//! 组件工厂抽象接口
//!
//! 类型擦除后的实例表示，以及工厂、装饰器、释放函数的统一签名

use crate::resolver::Resolver;
use infrastructure_common::{ResolutionError, TypeInfo};
use std::any::Any;
use std::sync::Arc;

/// 类型擦除后的组件实例
///
/// 内部保存的是契约类型的 `Arc<C>`，因此解析端可以还原出同一个 `Arc`。
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 组件工厂函数类型
pub type FactoryFn = Arc<dyn Fn(&dyn Resolver) -> Result<Instance, ResolutionError> + Send + Sync>;

/// 装饰器函数类型，接收被装饰的实例并返回新的实例
pub type DecoratorFn =
    Arc<dyn Fn(&dyn Resolver, Instance) -> Result<Instance, ResolutionError> + Send + Sync>;

/// 释放函数类型
pub type DisposeFn = Arc<dyn Fn(&Instance) + Send + Sync>;

/// 可注入组件 trait
///
/// 作为"具体类型"注册来源的实现类型必须实现此 trait。
pub trait Injectable: Send + Sync + Sized + 'static {
    /// 构造所需的契约列表，供构建期验证使用
    fn dependencies() -> Vec<TypeInfo> {
        Vec::new()
    }

    /// 通过解析器获取依赖并构建实例
    fn inject(resolver: &dyn Resolver) -> Result<Self, ResolutionError>;
}

/// 把契约实例擦除为 [`Instance`]
pub fn erase<C>(instance: Arc<C>) -> Instance
where
    C: ?Sized + Send + Sync + 'static,
{
    Arc::new(instance)
}

/// 从 [`Instance`] 还原契约实例
pub fn downcast<C>(instance: &Instance) -> Result<Arc<C>, ResolutionError>
where
    C: ?Sized + Send + Sync + 'static,
{
    instance
        .downcast_ref::<Arc<C>>()
        .cloned()
        .ok_or_else(|| ResolutionError::TypeMismatch {
            expected: std::any::type_name::<C>().to_string(),
        })
}
