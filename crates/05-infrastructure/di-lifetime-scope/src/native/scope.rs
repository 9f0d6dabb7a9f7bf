//! 容器构建器、生命周期作用域和组件上下文

use super::error::{LifetimeScopeError, LifetimeScopeResult};
use super::registration::{
    ComponentRegistration, DelegateActivator, InstanceLifetime, InstanceOwnership,
    InstanceSharing, NativeInstance, RegistrationBuilder, ReleaseHandler, Service,
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// 根作用域标签
pub const ROOT_TAG: &str = "root";

/// 引擎选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifetimeScopeOptions {
    /// 最大解析深度
    pub max_resolve_depth: usize,
}

impl Default for LifetimeScopeOptions {
    fn default() -> Self {
        Self {
            max_resolve_depth: 50,
        }
    }
}

/// 容器构建器
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    pending: Vec<RegistrationBuilder>,
    options: LifetimeScopeOptions,
}

impl ContainerBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置引擎选项
    pub fn with_options(mut self, options: LifetimeScopeOptions) -> Self {
        self.options = options;
        self
    }

    /// 注册委托
    pub fn register_delegate<F>(&mut self, activator: F) -> &mut RegistrationBuilder
    where
        F: Fn(&ComponentContext) -> LifetimeScopeResult<NativeInstance> + Send + Sync + 'static,
    {
        let activator: DelegateActivator = Arc::new(activator);
        self.push(RegistrationBuilder::delegate(activator))
    }

    /// 注册现成实例
    pub fn register_instance(&mut self, instance: NativeInstance) -> &mut RegistrationBuilder {
        self.push(RegistrationBuilder::provided(instance))
    }

    fn push(&mut self, builder: RegistrationBuilder) -> &mut RegistrationBuilder {
        let index = self.pending.len();
        self.pending.push(builder);
        &mut self.pending[index]
    }

    /// 构建根生命周期作用域
    pub fn build(self) -> LifetimeScopeResult<Arc<LifetimeScope>> {
        let mut by_service: HashMap<Service, Vec<Arc<ComponentRegistration>>> = HashMap::new();
        let count = self.pending.len();
        for (id, builder) in self.pending.into_iter().enumerate() {
            let registration = builder.build(id)?;
            by_service
                .entry(registration.service)
                .or_default()
                .push(Arc::new(registration));
        }

        debug!(registrations = count, services = by_service.len(), "构建生命周期作用域容器");
        Ok(Arc::new(LifetimeScope::new(
            ROOT_TAG.to_string(),
            Arc::new(ComponentRegistry { by_service }),
            self.options,
            None,
        )))
    }
}

/// 按服务索引的注册
struct ComponentRegistry {
    by_service: HashMap<Service, Vec<Arc<ComponentRegistration>>>,
}

impl ComponentRegistry {
    /// 服务的默认注册为最后一次注册
    fn default_for(&self, service: &Service) -> Option<Arc<ComponentRegistration>> {
        self.by_service.get(service).and_then(|all| all.last()).cloned()
    }

    fn all_for(&self, service: &Service) -> Vec<Arc<ComponentRegistration>> {
        self.by_service.get(service).cloned().unwrap_or_default()
    }
}

/// 生命周期作用域
///
/// 子作用域持有父作用域。释放只处理本作用域的实例，不涉及子作用域。
pub struct LifetimeScope {
    tag: String,
    registry: Arc<ComponentRegistry>,
    options: LifetimeScopeOptions,
    parent: Option<Arc<LifetimeScope>>,
    shared_instances: Mutex<HashMap<usize, Arc<OnceCell<NativeInstance>>>>,
    disposer: Mutex<Vec<(NativeInstance, ReleaseHandler)>>,
    disposed: AtomicBool,
}

impl LifetimeScope {
    fn new(
        tag: String,
        registry: Arc<ComponentRegistry>,
        options: LifetimeScopeOptions,
        parent: Option<Arc<LifetimeScope>>,
    ) -> Self {
        Self {
            tag,
            registry,
            options,
            parent,
            shared_instances: Mutex::new(HashMap::new()),
            disposer: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// 作用域标签
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// 是否为根作用域
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// 是否已释放
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> LifetimeScopeResult<()> {
        if self.is_disposed() {
            return Err(LifetimeScopeError::ScopeDisposed {
                tag: self.tag.clone(),
            });
        }
        Ok(())
    }

    fn root(self: &Arc<Self>) -> Arc<Self> {
        match &self.parent {
            Some(parent) => parent.root(),
            None => self.clone(),
        }
    }

    /// 开始带标签的子生命周期作用域
    pub fn begin_lifetime_scope(self: &Arc<Self>, tag: impl Into<String>) -> LifetimeScopeResult<Arc<Self>> {
        self.ensure_active()?;
        let tag = tag.into();
        debug!(parent = %self.tag, tag = %tag, "开始生命周期作用域");
        Ok(Arc::new(Self::new(
            tag,
            self.registry.clone(),
            self.options,
            Some(self.clone()),
        )))
    }

    /// 解析服务的默认注册
    pub fn resolve(self: &Arc<Self>, service: &Service) -> LifetimeScopeResult<NativeInstance> {
        ComponentContext::new(self.clone()).resolve(service)
    }

    /// 按注册顺序惰性解析服务的全部注册
    pub fn resolve_all(self: &Arc<Self>, service: &Service) -> LifetimeScopeResult<ResolveAll> {
        ComponentContext::new(self.clone()).resolve_all(service)
    }

    /// 服务是否已注册
    pub fn is_registered(&self, service: &Service) -> bool {
        self.registry.by_service.contains_key(service)
    }

    /// 注册数量
    pub fn registration_count(&self) -> usize {
        self.registry.by_service.values().map(Vec::len).sum()
    }

    /// 释放本作用域拥有的实例，按激活的逆序
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let owned = std::mem::take(&mut *self.disposer.lock());
        debug!(tag = %self.tag, instances = owned.len(), "释放生命周期作用域");
        for (instance, release) in owned.into_iter().rev() {
            release(&instance);
        }
        self.shared_instances.lock().clear();
    }

    fn activate(
        self: &Arc<Self>,
        context: ComponentContext,
        registration: &ComponentRegistration,
    ) -> LifetimeScopeResult<NativeInstance> {
        let context = ComponentContext {
            scope: self.clone(),
            ..context
        };
        let instance = registration.activate(&context)?;

        if registration.ownership == InstanceOwnership::OwnedByLifetimeScope {
            if let Some(release) = &registration.release {
                self.disposer.lock().push((instance.clone(), release.clone()));
            }
        }
        Ok(instance)
    }
}

impl std::fmt::Debug for LifetimeScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifetimeScope")
            .field("tag", &self.tag)
            .field("root", &self.is_root())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// 组件上下文
///
/// 激活器和激活事件通过它解析依赖，同时记录激活栈以检测循环依赖。
#[derive(Clone)]
pub struct ComponentContext {
    scope: Arc<LifetimeScope>,
    activation_stack: Vec<Service>,
}

impl ComponentContext {
    fn new(scope: Arc<LifetimeScope>) -> Self {
        Self {
            scope,
            activation_stack: Vec::new(),
        }
    }

    /// 当前生命周期作用域
    pub fn lifetime_scope(&self) -> &Arc<LifetimeScope> {
        &self.scope
    }

    /// 解析服务的默认注册
    pub fn resolve(&self, service: &Service) -> LifetimeScopeResult<NativeInstance> {
        self.scope.ensure_active()?;
        let registration = self.scope.registry.default_for(service).ok_or_else(|| {
            LifetimeScopeError::ComponentNotRegistered {
                service: service.description().to_string(),
            }
        })?;
        self.resolve_registration(&registration)
    }

    /// 按注册顺序惰性解析服务的全部注册
    pub fn resolve_all(&self, service: &Service) -> LifetimeScopeResult<ResolveAll> {
        self.scope.ensure_active()?;
        Ok(ResolveAll {
            context: self.clone(),
            registrations: self.scope.registry.all_for(service).into_iter(),
        })
    }

    /// 服务是否已注册
    pub fn is_registered(&self, service: &Service) -> bool {
        self.scope.is_registered(service)
    }

    fn enter(&self, service: Service) -> LifetimeScopeResult<Self> {
        if self.activation_stack.contains(&service) {
            let chain = self
                .activation_stack
                .iter()
                .chain(std::iter::once(&service))
                .map(Service::short_description)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(LifetimeScopeError::CircularDependency { chain });
        }
        if self.activation_stack.len() >= self.scope.options.max_resolve_depth {
            return Err(LifetimeScopeError::MaxDepthExceeded {
                service: service.description().to_string(),
                max_depth: self.scope.options.max_resolve_depth,
            });
        }

        let mut context = self.clone();
        context.activation_stack.push(service);
        Ok(context)
    }

    fn resolve_registration(
        &self,
        registration: &ComponentRegistration,
    ) -> LifetimeScopeResult<NativeInstance> {
        self.scope.ensure_active()?;
        let context = self.enter(registration.service)?;
        let owner = match registration.lifetime {
            InstanceLifetime::CurrentScope => self.scope.clone(),
            InstanceLifetime::RootScope => self.scope.root(),
        };
        owner.ensure_active()?;
        trace!(
            service = registration.service.description(),
            scope = %owner.tag,
            sharing = ?registration.sharing,
            "解析服务"
        );

        match registration.sharing {
            InstanceSharing::None => owner.activate(context, registration),
            InstanceSharing::Shared => {
                let cell = owner
                    .shared_instances
                    .lock()
                    .entry(registration.id)
                    .or_default()
                    .clone();
                cell.get_or_try_init(|| owner.activate(context, registration))
                    .cloned()
            }
        }
    }
}

impl std::fmt::Debug for ComponentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentContext")
            .field("scope", &self.scope.tag)
            .field("depth", &self.activation_stack.len())
            .finish()
    }
}

/// 惰性的全部注册解析结果
pub struct ResolveAll {
    context: ComponentContext,
    registrations: std::vec::IntoIter<Arc<ComponentRegistration>>,
}

impl Iterator for ResolveAll {
    type Item = LifetimeScopeResult<NativeInstance>;

    fn next(&mut self) -> Option<Self::Item> {
        let registration = self.registrations.next()?;
        Some(self.context.resolve_registration(&registration))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.registrations.size_hint()
    }
}

impl ExactSizeIterator for ResolveAll {}
