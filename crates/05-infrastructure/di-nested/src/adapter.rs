//! 嵌套容器引擎适配器
//!
//! 生命周期映射：`Transient` → `AlwaysUnique`，`Scoped` → `ContainerScoped`，
//! `Singleton` → `Singleton`。原生引擎的 `Transient` 在同一构建会话内共享，不与
//! 抽象的瞬时语义对应，因此不使用。
//!
//! 原生插件族以第一个实例为默认，适配器显式把最后注册的实例设为默认。
//! 原生嵌套容器只能从根容器创建，更深的作用域由适配器从根容器创建并自行维护父子关系。

use crate::native::{
    BuildSession, Lifecycle, NativeContainer, NestedContainerError, NestedOptions, PluginType,
    Registry,
};
use di_abstractions::{
    ComponentRegistration, ComponentRegistry, ComponentSource, Container, ContainerAdapter,
    ContainerOptions, ContainerScope, ContainerStats, Instance, Instances, Resolver,
};
use infrastructure_common::{
    AdapterError, BuildError, DiError, Lifetime, ResolutionError, ScopeInfo, TypeInfo,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// 引擎名称
pub const ENGINE_NAME: &str = "nested";

fn plugin_of(contract: &TypeInfo) -> PluginType {
    PluginType::new(contract.id, contract.name)
}

fn lifecycle_of(lifetime: Lifetime) -> Lifecycle {
    match lifetime {
        Lifetime::Transient => Lifecycle::AlwaysUnique,
        Lifetime::Scoped => Lifecycle::ContainerScoped,
        Lifetime::Singleton => Lifecycle::Singleton,
    }
}

fn into_native(contract: TypeInfo, error: ResolutionError) -> NestedContainerError {
    NestedContainerError::build(contract.name, error)
}

/// 把原生错误映射为抽象错误，抽象工厂抛出的错误原样取回
fn from_native(error: NestedContainerError) -> ResolutionError {
    match error {
        NestedContainerError::MissingDefault { plugin_type } => ResolutionError::NotRegistered {
            contract: plugin_type,
        },
        NestedContainerError::BidirectionalDependency { chain } => {
            ResolutionError::CircularDependency {
                dependency_chain: chain,
            }
        }
        NestedContainerError::BuildDepthExceeded {
            plugin_type,
            max_depth,
        } => ResolutionError::DepthExceeded {
            contract: plugin_type,
            max_depth,
        },
        NestedContainerError::ContainerDisposed { name } => {
            ResolutionError::ScopeDisposed { scope_id: name }
        }
        NestedContainerError::Build {
            plugin_type,
            source,
        } => match source.downcast::<ResolutionError>() {
            Ok(error) => *error,
            Err(source) => ResolutionError::ActivationFailed {
                type_name: plugin_type,
                source,
            },
        },
        other => ResolutionError::activation_failed(ENGINE_NAME, other),
    }
}

/// 构建期原生错误映射
fn build_error(error: NestedContainerError) -> DiError {
    match error {
        NestedContainerError::InterceptionNotSupported {
            plugin_type,
            instance,
        } => AdapterError::UnsupportedShape {
            engine: ENGINE_NAME.to_string(),
            contract: plugin_type,
            reason: format!("预构建实例 {instance} 不能被装饰"),
        }
        .into(),
        other => BuildError::Rejected {
            engine: ENGINE_NAME.to_string(),
            message: other.to_string(),
        }
        .into(),
    }
}

/// 把构建会话包装为抽象解析器
struct SessionResolver<'a> {
    session: &'a BuildSession,
}

impl Resolver for SessionResolver<'_> {
    fn resolve_key(&self, contract: &TypeInfo) -> Result<Instance, ResolutionError> {
        self.session
            .get_instance(plugin_of(contract))
            .map_err(from_native)
    }

    fn resolve_all_keys(&self, contract: &TypeInfo) -> Result<Instances<'_>, ResolutionError> {
        let all = self
            .session
            .get_all_instances(plugin_of(contract))
            .map_err(from_native)?;
        Ok(Instances::new(all.map(|result| result.map_err(from_native))))
    }

    fn is_registered(&self, contract: &TypeInfo) -> bool {
        self.session.has_plugin(plugin_of(contract))
    }
}

/// 把抽象注册转换到原生注册表，返回实例名称
fn translate(
    native: &mut Registry,
    position: usize,
    registration: &ComponentRegistration,
    options: &ContainerOptions,
) -> String {
    let registration = Arc::new(registration.clone());
    let contract = registration.contract();
    let name = format!("{}#{}", registration.implementation().short_name(), position);
    let family = native.for_plugin(plugin_of(&contract));

    let expression = match registration.source() {
        ComponentSource::Instance(object) => family.add_object(name.clone(), object.clone()),
        ComponentSource::Type { .. } | ComponentSource::Factory(_) => {
            let source = registration.clone();
            let reject_root = options.validate_scopes && registration.lifetime() == Lifetime::Scoped;
            let expression = family.add_lambda(name.clone(), move |session| {
                if reject_root && session.is_root_container() {
                    return Err(into_native(
                        contract,
                        ResolutionError::ScopedFromRoot {
                            contract: contract.name.to_string(),
                        },
                    ));
                }
                source
                    .activate(&SessionResolver { session })
                    .map_err(|e| into_native(contract, e))
            });
            expression.lifecycle(lifecycle_of(registration.lifetime()));
            expression
        }
    };

    for decorator in registration.decorators() {
        let decorator = decorator.clone();
        expression.intercept(move |session, object| {
            decorator(&SessionResolver { session }, object).map_err(|e| into_native(contract, e))
        });
    }

    if registration.disposer().is_some() && !registration.is_externally_owned() {
        let owner = registration.clone();
        expression.on_release(move |object| owner.dispose(object));
    }

    name
}

/// 适配器一侧的作用域节点
struct ScopeNode {
    native: NativeContainer,
    root_native: NativeContainer,
    info: ScopeInfo,
    parent: Weak<ScopeNode>,
    children: Mutex<Vec<Weak<ScopeNode>>>,
    open_scopes: Arc<AtomicUsize>,
    disposed: AtomicBool,
}

impl ScopeNode {
    /// 任意深度的作用域都从根容器创建嵌套容器
    fn create_child(self: &Arc<Self>) -> Result<Arc<Self>, ResolutionError> {
        self.ensure_active()?;
        let info = self.info.child();
        let native = self
            .root_native
            .get_nested_container(info.id.to_string())
            .map_err(from_native)?;

        let child = Arc::new(Self {
            native,
            root_native: self.root_native.clone(),
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
        self.native
            .get_instance(plugin_of(contract))
            .map_err(from_native)
    }

    fn resolve_all(&self, contract: &TypeInfo) -> Result<Instances<'_>, ResolutionError> {
        self.ensure_active()?;
        let all = self
            .native
            .get_all_instances(plugin_of(contract))
            .map_err(from_native)?;
        Ok(Instances::new(all.map(|result| result.map_err(from_native))))
    }
}

impl Drop for ScopeNode {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// 嵌套容器引擎上的容器
pub struct NestedContainer {
    node: Arc<ScopeNode>,
    registrations: usize,
    contracts: usize,
}

impl NestedContainer {
    /// 从注册表构建容器
    pub fn build(registry: ComponentRegistry, options: &ContainerOptions) -> Result<Self, DiError> {
        let registrations = registry.len();
        let contracts = registry.contracts().len();

        let mut native = Registry::new();
        let mut defaults: HashMap<TypeInfo, String> = HashMap::new();
        for (position, registration) in registry.iter().enumerate() {
            let name = translate(&mut native, position, registration, options);
            defaults.insert(registration.contract(), name);
        }
        for (contract, name) in defaults {
            native.for_plugin(plugin_of(&contract)).set_default(name);
        }

        let root = NativeContainer::new(
            native,
            NestedOptions {
                max_build_depth: options.max_resolution_depth,
            },
        )
        .map_err(build_error)?;
        info!(engine = ENGINE_NAME, registrations, contracts, "构建容器完成");

        Ok(Self {
            node: Arc::new(ScopeNode {
                native: root.clone(),
                root_native: root,
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

/// 嵌套容器引擎上的作用域
pub struct NestedScope {
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
                self.node.native.has_plugin(plugin_of(contract))
            }
        }

        impl ContainerScope for $handle {
            fn create_scope(&self) -> Result<Arc<dyn ContainerScope>, ResolutionError> {
                let node = self.node.create_child()?;
                debug!(scope = %node.info.id, depth = node.info.depth, "创建作用域");
                Ok(Arc::new(NestedScope { node }))
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

impl_scope_handle!(NestedContainer);
impl_scope_handle!(NestedScope);

impl Container for NestedContainer {
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

/// 嵌套容器引擎适配器
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedAdapter;

impl ContainerAdapter for NestedAdapter {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn build(
        &self,
        registry: ComponentRegistry,
        options: &ContainerOptions,
    ) -> Result<Arc<dyn Container>, DiError> {
        Ok(Arc::new(NestedContainer::build(registry, options)?))
    }
}
