//! # 嵌套容器引擎
//!
//! 以插件族和嵌套容器为核心的原生容器：
//!
//! - 每个插件类型对应一个插件族，族内实例按名称区分，默认实例为第一个添加的实例
//! - 实例由 Lambda 构建或直接提供对象；只有 Lambda 实例可以被拦截
//! - 生命周期为 `Transient`（同一构建会话共享）、`AlwaysUnique`、`ContainerScoped`、`Singleton`
//! - 嵌套容器只能从根容器创建，释放时只处理自己跟踪的对象

mod container;
mod error;
mod registry;

pub use container::{AllInstances, BuildSession, NativeContainer, NestedOptions, ROOT_NAME};
pub use error::{NestedContainerError, NestedResult};
pub use registry::{
    InstanceExpression, Interceptor, LambdaFn, Lifecycle, Object, PluginFamilyExpression,
    PluginType, Registry, ReleaseFn,
};
