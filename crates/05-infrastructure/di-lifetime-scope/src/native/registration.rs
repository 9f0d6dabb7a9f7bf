//! 原生组件注册

use super::error::{LifetimeScopeError, LifetimeScopeResult};
use super::scope::ComponentContext;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// 原生实例
pub type NativeInstance = Arc<dyn Any + Send + Sync>;

/// 委托激活器
pub type DelegateActivator =
    Arc<dyn Fn(&ComponentContext) -> LifetimeScopeResult<NativeInstance> + Send + Sync>;

/// 激活事件处理器，可替换实例
pub type ActivatingHandler = Arc<
    dyn Fn(&ComponentContext, NativeInstance) -> LifetimeScopeResult<NativeInstance> + Send + Sync,
>;

/// 释放处理器
pub type ReleaseHandler = Arc<dyn Fn(&NativeInstance) + Send + Sync>;

/// 服务标识
#[derive(Clone, Copy)]
pub struct Service {
    id: TypeId,
    description: &'static str,
}

impl Service {
    /// 由类型标识和描述创建
    pub fn new(id: TypeId, description: &'static str) -> Self {
        Self { id, description }
    }

    /// 类型化服务
    pub fn typed<T: ?Sized + 'static>() -> Self {
        Self::new(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// 服务描述
    pub fn description(&self) -> &'static str {
        self.description
    }

    pub(crate) fn short_description(&self) -> &'static str {
        let head = self.description.split('<').next().unwrap_or(self.description);
        head.rsplit("::").next().unwrap_or(head)
    }
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Service {}

impl std::hash::Hash for Service {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service({})", self.description)
    }
}

/// 实例共享方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstanceSharing {
    /// 每次依赖创建新实例
    #[default]
    None,
    /// 在生命周期内共享
    Shared,
}

/// 实例所属的生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstanceLifetime {
    /// 当前生命周期作用域
    #[default]
    CurrentScope,
    /// 根生命周期作用域
    RootScope,
}

/// 实例所有权
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstanceOwnership {
    /// 由生命周期作用域释放
    #[default]
    OwnedByLifetimeScope,
    /// 由外部释放
    ExternallyOwned,
}

/// 激活方式
#[derive(Clone)]
pub(crate) enum Activator {
    Delegate(DelegateActivator),
    Provided(NativeInstance),
}

/// 完成构建的组件注册
pub(crate) struct ComponentRegistration {
    pub(crate) id: usize,
    pub(crate) service: Service,
    pub(crate) activator: Activator,
    pub(crate) sharing: InstanceSharing,
    pub(crate) lifetime: InstanceLifetime,
    pub(crate) ownership: InstanceOwnership,
    pub(crate) activating: Vec<ActivatingHandler>,
    pub(crate) release: Option<ReleaseHandler>,
}

impl ComponentRegistration {
    pub(crate) fn activate(&self, context: &ComponentContext) -> LifetimeScopeResult<NativeInstance> {
        let instance = match &self.activator {
            Activator::Delegate(activator) => activator(context)?,
            Activator::Provided(instance) => instance.clone(),
        };
        self.activating
            .iter()
            .try_fold(instance, |instance, handler| handler(context, instance))
    }
}

/// 注册构建器
pub struct RegistrationBuilder {
    service: Option<Service>,
    activator: Activator,
    sharing: InstanceSharing,
    lifetime: InstanceLifetime,
    ownership: InstanceOwnership,
    activating: Vec<ActivatingHandler>,
    release: Option<ReleaseHandler>,
}

impl RegistrationBuilder {
    pub(crate) fn delegate(activator: DelegateActivator) -> Self {
        Self::with_activator(Activator::Delegate(activator))
    }

    pub(crate) fn provided(instance: NativeInstance) -> Self {
        let mut builder = Self::with_activator(Activator::Provided(instance));
        builder.single_instance().externally_owned();
        builder
    }

    fn with_activator(activator: Activator) -> Self {
        Self {
            service: None,
            activator,
            sharing: InstanceSharing::None,
            lifetime: InstanceLifetime::CurrentScope,
            ownership: InstanceOwnership::OwnedByLifetimeScope,
            activating: Vec::new(),
            release: None,
        }
    }

    /// 暴露的服务
    pub fn as_service(&mut self, service: Service) -> &mut Self {
        self.service = Some(service);
        self
    }

    /// 每次依赖一个实例
    pub fn instance_per_dependency(&mut self) -> &mut Self {
        self.sharing = InstanceSharing::None;
        self.lifetime = InstanceLifetime::CurrentScope;
        self
    }

    /// 每个生命周期作用域一个实例
    pub fn instance_per_lifetime_scope(&mut self) -> &mut Self {
        self.sharing = InstanceSharing::Shared;
        self.lifetime = InstanceLifetime::CurrentScope;
        self
    }

    /// 单实例
    pub fn single_instance(&mut self) -> &mut Self {
        self.sharing = InstanceSharing::Shared;
        self.lifetime = InstanceLifetime::RootScope;
        self
    }

    /// 设置共享方式和生命周期
    pub fn sharing(&mut self, sharing: InstanceSharing, lifetime: InstanceLifetime) -> &mut Self {
        self.sharing = sharing;
        self.lifetime = lifetime;
        self
    }

    /// 外部持有
    pub fn externally_owned(&mut self) -> &mut Self {
        self.ownership = InstanceOwnership::ExternallyOwned;
        self
    }

    /// 激活事件
    pub fn on_activating<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&ComponentContext, NativeInstance) -> LifetimeScopeResult<NativeInstance>
            + Send
            + Sync
            + 'static,
    {
        self.activating.push(Arc::new(handler));
        self
    }

    /// 释放事件
    pub fn on_release<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&NativeInstance) + Send + Sync + 'static,
    {
        self.release = Some(Arc::new(handler));
        self
    }

    pub(crate) fn build(self, id: usize) -> LifetimeScopeResult<ComponentRegistration> {
        let service = self
            .service
            .ok_or_else(|| LifetimeScopeError::InvalidRegistration {
                reason: format!("注册 #{id} 没有暴露任何服务"),
            })?;

        if matches!(self.activator, Activator::Provided(_))
            && (self.sharing != InstanceSharing::Shared || self.lifetime != InstanceLifetime::RootScope)
        {
            return Err(LifetimeScopeError::InvalidRegistration {
                reason: format!("提供的实例 {} 只能是单实例", service.description()),
            });
        }

        Ok(ComponentRegistration {
            id,
            service,
            activator: self.activator,
            sharing: self.sharing,
            lifetime: self.lifetime,
            ownership: self.ownership,
            activating: self.activating,
            release: self.release,
        })
    }
}

impl fmt::Debug for RegistrationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationBuilder")
            .field("service", &self.service)
            .field("sharing", &self.sharing)
            .field("lifetime", &self.lifetime)
            .field("ownership", &self.ownership)
            .field("activating", &self.activating.len())
            .finish()
    }
}
