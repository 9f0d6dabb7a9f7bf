//! 原生注册 DSL：插件族、实例和生命周期

use super::container::BuildSession;
use super::error::NestedResult;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// 原生对象
pub type Object = Arc<dyn Any + Send + Sync>;

/// Lambda 构建函数
pub type LambdaFn = Arc<dyn Fn(&BuildSession) -> NestedResult<Object> + Send + Sync>;

/// 拦截器，可包装刚构建的对象
pub type Interceptor = Arc<dyn Fn(&BuildSession, Object) -> NestedResult<Object> + Send + Sync>;

/// 释放函数
pub type ReleaseFn = Arc<dyn Fn(&Object) + Send + Sync>;

/// 插件类型
#[derive(Clone, Copy)]
pub struct PluginType {
    id: TypeId,
    name: &'static str,
}

impl PluginType {
    /// 由类型标识和名称创建
    pub fn new(id: TypeId, name: &'static str) -> Self {
        Self { id, name }
    }

    /// 类型化插件类型
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// 类型名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn short_name(&self) -> &'static str {
        let head = self.name.split('<').next().unwrap_or(self.name);
        head.rsplit("::").next().unwrap_or(head)
    }
}

impl PartialEq for PluginType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PluginType {}

impl std::hash::Hash for PluginType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PluginType({})", self.name)
    }
}

/// 实例生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// 同一次构建会话内共享
    #[default]
    Transient,
    /// 每次都创建
    AlwaysUnique,
    /// 每个容器一个，嵌套容器各自独立
    ContainerScoped,
    /// 根容器内唯一
    Singleton,
}

#[derive(Clone)]
pub(crate) enum InstanceKind {
    Lambda(LambdaFn),
    Object(Object),
}

/// 实例配置
pub struct InstanceExpression {
    pub(crate) name: String,
    pub(crate) kind: InstanceKind,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) interceptors: Vec<Interceptor>,
    pub(crate) release: Option<ReleaseFn>,
}

impl InstanceExpression {
    fn new(name: String, kind: InstanceKind) -> Self {
        Self {
            name,
            kind,
            lifecycle: Lifecycle::default(),
            interceptors: Vec::new(),
            release: None,
        }
    }

    /// 实例名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 设置生命周期
    pub fn lifecycle(&mut self, lifecycle: Lifecycle) -> &mut Self {
        self.lifecycle = lifecycle;
        self
    }

    /// 每次都创建
    pub fn always_unique(&mut self) -> &mut Self {
        self.lifecycle(Lifecycle::AlwaysUnique)
    }

    /// 每个容器一个
    pub fn container_scoped(&mut self) -> &mut Self {
        self.lifecycle(Lifecycle::ContainerScoped)
    }

    /// 根容器内唯一
    pub fn singleton(&mut self) -> &mut Self {
        self.lifecycle(Lifecycle::Singleton)
    }

    /// 添加拦截器
    pub fn intercept<F>(&mut self, interceptor: F) -> &mut Self
    where
        F: Fn(&BuildSession, Object) -> NestedResult<Object> + Send + Sync + 'static,
    {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// 容器释放时调用
    pub fn on_release<F>(&mut self, release: F) -> &mut Self
    where
        F: Fn(&Object) + Send + Sync + 'static,
    {
        self.release = Some(Arc::new(release));
        self
    }
}

impl fmt::Debug for InstanceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            InstanceKind::Lambda(_) => "lambda",
            InstanceKind::Object(_) => "object",
        };
        f.debug_struct("InstanceExpression")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("lifecycle", &self.lifecycle)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

/// 插件族配置
///
/// 未显式设置默认实例时，第一个添加的实例为默认。
#[derive(Debug)]
pub struct PluginFamilyExpression {
    pub(crate) plugin_type: PluginType,
    pub(crate) instances: Vec<InstanceExpression>,
    pub(crate) default: Option<String>,
}

impl PluginFamilyExpression {
    /// 添加 Lambda 实例
    pub fn add_lambda<F>(&mut self, name: impl Into<String>, lambda: F) -> &mut InstanceExpression
    where
        F: Fn(&BuildSession) -> NestedResult<Object> + Send + Sync + 'static,
    {
        self.push(InstanceExpression::new(
            name.into(),
            InstanceKind::Lambda(Arc::new(lambda)),
        ))
    }

    /// 添加现成对象
    pub fn add_object(&mut self, name: impl Into<String>, object: Object) -> &mut InstanceExpression {
        self.push(InstanceExpression::new(name.into(), InstanceKind::Object(object)))
    }

    /// 指定默认实例
    pub fn set_default(&mut self, name: impl Into<String>) -> &mut Self {
        self.default = Some(name.into());
        self
    }

    fn push(&mut self, instance: InstanceExpression) -> &mut InstanceExpression {
        let index = self.instances.len();
        self.instances.push(instance);
        &mut self.instances[index]
    }
}

/// 注册表
#[derive(Debug, Default)]
pub struct Registry {
    pub(crate) families: Vec<PluginFamilyExpression>,
}

impl Registry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取或创建插件族
    pub fn for_plugin(&mut self, plugin_type: PluginType) -> &mut PluginFamilyExpression {
        let index = match self
            .families
            .iter()
            .position(|family| family.plugin_type == plugin_type)
        {
            Some(index) => index,
            None => {
                self.families.push(PluginFamilyExpression {
                    plugin_type,
                    instances: Vec::new(),
                    default: None,
                });
                self.families.len() - 1
            }
        };
        &mut self.families[index]
    }
}
