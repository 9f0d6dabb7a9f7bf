//! 生命周期作用域引擎适配器
//!
//! 生命周期映射：
//!
//! | 抽象 | 原生 |
//! |---|---|
//! | `Transient` | `InstanceSharing::None` + `InstanceLifetime::CurrentScope` |
//! | `Scoped` | `InstanceSharing::Shared` + `InstanceLifetime::CurrentScope` |
//! | `Singleton` | `InstanceSharing::Shared` + `InstanceLifetime::RootScope` |
//!
//! 装饰器转换为激活事件，释放函数转换为释放事件。原生作用域释放时不级联子作用域，
//! 由适配器记录子作用域并负责级联。

use crate::native::{
    ComponentContext, ContainerBuilder, LifetimeScope, LifetimeScopeError, LifetimeScopeOptions,
    Service,
};
use di_abstractions::{
    ComponentRegistration, ComponentRegistry, ComponentSource, Container, ContainerAdapter,
    ContainerOptions, ContainerScope, ContainerStats, Instance, Instances, Resolver,
};
use infrastructure_common::{BuildError, DiError, Lifetime, ResolutionError, ScopeInfo, TypeInfo};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// 引擎名称
pub const ENGINE_NAME: &str = "lifetime-scope";

fn service_of(contract: &TypeInfo) -> Service {
    Service::new(contract.id, contract.name)
}

/// 把抽象错误放入原生激活错误
fn into_native(contract: TypeInfo, error: ResolutionError) -> LifetimeScopeError {
    LifetimeScopeError::activation(contract.name, error)
}

/// 把原生错误映射为抽象错误，抽象工厂抛出的错误原样取回
fn from_native(error: LifetimeScopeError) -> ResolutionError {
    match error {
        LifetimeScopeError::ComponentNotRegistered { service } => {
            ResolutionError::NotRegistered { contract: service }
        }
        LifetimeScopeError::CircularDependency { chain } => ResolutionError::CircularDependency {
            dependency_chain: chain,
        },
        LifetimeScopeError::MaxDepthExceeded { service, max_depth } => {
            ResolutionError::DepthExceeded {
                contract: service,
                max_depth,
            }
        }
        LifetimeScopeError::ScopeDisposed { tag } => ResolutionError::ScopeDisposed { scope_id: tag },
        LifetimeScopeError::Activation { service, source } => {
            match source.downcast::<ResolutionError>() {
                Ok(error) => *error,
                Err(source) => ResolutionError::ActivationFailed {
                    type_name: service,
                    source,
                },
            }
        }
        LifetimeScopeError::InvalidRegistration { reason } => {
            ResolutionError::activation_failed(ENGINE_NAME, reason)
        }
    }
}

/// 把原生组件上下文包装为抽象解析器
struct ContextResolver<'a> {
    context: &'a ComponentContext,
}

impl Resolver for ContextResolver<'_> {
    fn resolve_key(&self, contract: &TypeInfo) -> Result<Instance, ResolutionError> {
        self.context
            .resolve(&service_of(contract))
            .map_err(from_native)
    }

    fn resolve_all_keys(&self, contract: &TypeInfo) -> Result<Instances<'_>, ResolutionError> {
        let all = self
            .context
            .resolve_all(&service_of(contract))
            .map_err(from_native)?;
        Ok(Instances::new(all.map(|result| result.map_err(from_native))))
    }

    fn is_registered(&self, contract: &TypeInfo) -> bool {
        self.context.is_registered(&service_of(contract))
    }
}

/// 把一条抽象注册转换为原生注册
fn translate(
    builder: &mut ContainerBuilder,
    registration: ComponentRegistration,
    options: &ContainerOptions,
) {
    let registration = Arc::new(registration);
    let contract = registration.contract();

    let native = match registration.source() {
        ComponentSource::Instance(instance) => builder.register_instance(instance.clone()),
        ComponentSource::Type { .. } | ComponentSource::Factory(_) => {
            let source = registration.clone();
            let reject_root = options.validate_scopes && registration.lifetime() == Lifetime::Scoped;
            builder.register_delegate(move |context| {
                if reject_root && context.lifetime_scope().is_root() {
                    return Err(into_native(
                        contract,
                        ResolutionError::ScopedFromRoot {
                            contract: contract.name.to_string(),
                        },
                    ));
                }
                source
                    .activate(&ContextResolver { context })
                    .map_err(|e| into_native(contract, e))
            })
        }
    };

    native.as_service(service_of(&contract));
    match registration.lifetime() {
        Lifetime::Transient => native.instance_per_dependency(),
        Lifetime::Scoped => native.instance_per_lifetime_scope(),
        Lifetime::Singleton => native.single_instance(),
    };

    for decorator in registration.decorators() {
        let decorator = decorator.clone();
        native.on_activating(move |context, instance| {
            decorator(&ContextResolver { context }, instance).map_err(|e| into_native(contract, e))
        });
    }

    if registration.disposer().is_some() && !registration.is_externally_owned() {
        let owner = registration.clone();
        native.on_release(move |instance| owner.dispose(instance));
    }
}

/// 适配器一侧的作用域节点
struct ScopeNode {
    native: Arc<LifetimeScope>,
    info: ScopeInfo,
    parent: Weak<ScopeNode>,
    children: Mutex<Vec<Weak<ScopeNode>>>,
    open_scopes: Arc<AtomicUsize>,
    disposed: AtomicBool,
}

impl ScopeNode {
    fn create_child(self: &Arc<Self>) -> Result<Arc<Self>, ResolutionError> {
        self.ensure_active()?;
        let info = self.info.child();
        let native = self
            .native
            .begin_lifetime_scope(info.id.to_string())
            .map_err(from_native)?;

        let child = Arc::new(Self {
            native,
            info,
            parent: Arc::downgrade(self),
            children: Mutex::new(Vec::new()),
            open_scopes: self.open_scopes.clone(),
            disposed: AtomicBool::new(false),
        });
        self.children.lock().push(Arc::downgrade(&child));
        self.open_scopes.fetch_add(1, Ordering::SeqCst);
        Ok(child)
    }

    fn ensure_active(&self) -> Result<(), ResolutionError> {
        if self.is_disposed() {
            return Err(ResolutionError::ScopeDisposed {
                scope_id: self.info.id.to_string(),
            });
        }
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.native.dispose();
        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().rev().filter_map(Weak::upgrade) {
            child.dispose();
        }

        if !self.info.is_root() {
            self.open_scopes.fetch_sub(1, Ordering::SeqCst);
        }
        if let Some(parent) = self.parent.upgrade() {
            let this: *const Self = self;
            parent
                .children
                .lock()
                .retain(|child| !std::ptr::eq(child.as_ptr(), this));
        }
        debug!(scope = %self.info.id, "释放作用域");
    }

    fn resolve(&self, contract: &TypeInfo) -> Result<Instance, ResolutionError> {
        self.ensure_active()?;
        self.native.resolve(&service_of(contract)).map_err(from_native)
    }

    fn resolve_all(&self, contract: &TypeInfo) -> Result<Instances<'_>, ResolutionError> {
        self.ensure_active()?;
        let all = self
            .native
            .resolve_all(&service_of(contract))
            .map_err(from_native)?;
        Ok(Instances::new(all.map(|result| result.map_err(from_native))))
    }
}

impl Drop for ScopeNode {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// 生命周期作用域引擎上的容器
pub struct LifetimeScopeContainer {
    node: Arc<ScopeNode>,
    registrations: usize,
    contracts: usize,
}

impl LifetimeScopeContainer {
    /// 从注册表构建容器
    pub fn build(registry: ComponentRegistry, options: &ContainerOptions) -> Result<Self, DiError> {
        let registrations = registry.len();
        let contracts = registry.contracts().len();

        let mut builder = ContainerBuilder::new().with_options(LifetimeScopeOptions {
            max_resolve_depth: options.max_resolution_depth,
        });
        for registration in registry.freeze().iter() {
            translate(&mut builder, registration.clone(), options);
        }

        let native = builder.build().map_err(|e| BuildError::Rejected {
            engine: ENGINE_NAME.to_string(),
            message: e.to_string(),
        })?;
        info!(engine = ENGINE_NAME, registrations, contracts, "构建容器完成");

        Ok(Self {
            node: Arc::new(ScopeNode {
                native,
                info: ScopeInfo::root(),
                parent: Weak::new(),
                children: Mutex::new(Vec::new()),
                open_scopes: Arc::new(AtomicUsize::new(0)),
                disposed: AtomicBool::new(false),
            }),
            registrations,
            contracts,
        })
    }
}

/// 生命周期作用域引擎上的作用域
pub struct LifetimeScopeScope {
    node: Arc<ScopeNode>,
}

macro_rules! impl_scope_handle {
    ($handle:ty) => {
        impl Resolver for $handle {
            fn resolve_key(&self, contract: &TypeInfo) -> Result<Instance, ResolutionError> {
                self.node.resolve(contract)
            }

            fn resolve_all_keys(
                &self,
                contract: &TypeInfo,
            ) -> Result<Instances<'_>, ResolutionError> {
                self.node.resolve_all(contract)
            }

            fn is_registered(&self, contract: &TypeInfo) -> bool {
                self.node.native.is_registered(&service_of(contract))
            }
        }

        impl ContainerScope for $handle {
            fn create_scope(&self) -> Result<Arc<dyn ContainerScope>, ResolutionError> {
                let node = self.node.create_child()?;
                debug!(scope = %node.info.id, depth = node.info.depth, "创建作用域");
                Ok(Arc::new(LifetimeScopeScope { node }))
            }

            fn dispose(&self) {
                self.node.dispose();
            }

            fn is_disposed(&self) -> bool {
                self.node.is_disposed()
            }

            fn info(&self) -> ScopeInfo {
                self.node.info
            }

            fn as_resolver(&self) -> &dyn Resolver {
                self
            }
        }

        impl std::fmt::Debug for $handle {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($handle))
                    .field("info", &self.node.info)
                    .field("native", &self.node.native)
                    .finish()
            }
        }
    };
}

impl_scope_handle!(LifetimeScopeContainer);
impl_scope_handle!(LifetimeScopeScope);

impl Container for LifetimeScopeContainer {
    fn engine(&self) -> &str {
        ENGINE_NAME
    }

    fn stats(&self) -> ContainerStats {
        ContainerStats {
            registrations: self.registrations,
            contracts: self.contracts,
            open_scopes: self.node.open_scopes.load(Ordering::SeqCst),
        }
    }
}

/// 生命周期作用域引擎适配器
#[derive(Debug, Clone, Copy, Default)]
pub struct LifetimeScopeAdapter;

impl ContainerAdapter for LifetimeScopeAdapter {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn build(
        &self,
        registry: ComponentRegistry,
        options: &ContainerOptions,
    ) -> Result<Arc<dyn Container>, DiError> {
        Ok(Arc::new(LifetimeScopeContainer::build(registry, options)?))
    }
}
