//! 内置容器和作用域句柄

use crate::engine::{ScopeNode, Shared};
use di_abstractions::{
    ComponentRegistry, Container, ContainerAdapter, ContainerOptions, ContainerScope,
    ContainerStats, Instance, Instances, Resolver,
};
use infrastructure_common::{DiError, ResolutionError, ScopeInfo, TypeInfo};
use std::sync::Arc;
use tracing::info;

/// 内置引擎名称
pub const ENGINE_NAME: &str = "builtin";

/// 内置依赖注入容器
///
/// 直接按注册描述执行生命周期算法，构建时可进行依赖和循环验证。
pub struct BuiltinContainer {
    node: Arc<ScopeNode>,
}

impl BuiltinContainer {
    /// 从注册表构建容器
    pub fn build(registry: ComponentRegistry, options: &ContainerOptions) -> Result<Self, DiError> {
        if options.validate_on_build {
            registry.validate()?;
        }

        let registrations = registry.freeze();
        let shared = Arc::new(Shared::new(registrations, options.clone()));
        info!(
            engine = ENGINE_NAME,
            registrations = shared.registrations.len(),
            contracts = shared.contracts(),
            "构建容器完成"
        );

        Ok(Self {
            node: ScopeNode::root(shared),
        })
    }
}

impl std::fmt::Debug for BuiltinContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinContainer")
            .field("info", &self.node.info())
            .field("disposed", &self.node.is_disposed())
            .finish()
    }
}

/// 内置引擎的作用域句柄
pub struct BuiltinScope {
    node: Arc<ScopeNode>,
}

impl std::fmt::Debug for BuiltinScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinScope")
            .field("info", &self.node.info())
            .field("disposed", &self.node.is_disposed())
            .finish()
    }
}

macro_rules! impl_scope_handle {
    ($handle:ty) => {
        impl Resolver for $handle {
            fn resolve_key(&self, contract: &TypeInfo) -> Result<Instance, ResolutionError> {
                self.node.resolve(&self.node.new_context(), contract)
            }

            fn resolve_all_keys(
                &self,
                contract: &TypeInfo,
            ) -> Result<Instances<'_>, ResolutionError> {
                self.node.resolve_all(&self.node.new_context(), contract)
            }

            fn is_registered(&self, contract: &TypeInfo) -> bool {
                self.node.is_registered(contract)
            }
        }

        impl ContainerScope for $handle {
            fn create_scope(&self) -> Result<Arc<dyn ContainerScope>, ResolutionError> {
                let node = self.node.create_child()?;
                Ok(Arc::new(BuiltinScope { node }))
            }

            fn dispose(&self) {
                self.node.dispose();
            }

            fn is_disposed(&self) -> bool {
                self.node.is_disposed()
            }

            fn info(&self) -> ScopeInfo {
                self.node.info()
            }

            fn as_resolver(&self) -> &dyn Resolver {
                self
            }
        }
    };
}

impl_scope_handle!(BuiltinContainer);
impl_scope_handle!(BuiltinScope);

impl Container for BuiltinContainer {
    fn engine(&self) -> &str {
        ENGINE_NAME
    }

    fn stats(&self) -> ContainerStats {
        let shared = self.node.shared();
        ContainerStats {
            registrations: shared.registrations.len(),
            contracts: shared.contracts(),
            open_scopes: shared.open_scopes(),
        }
    }
}

/// 内置引擎适配器
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinAdapter;

impl ContainerAdapter for BuiltinAdapter {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn build(
        &self,
        registry: ComponentRegistry,
        options: &ContainerOptions,
    ) -> Result<Arc<dyn Container>, DiError> {
        let container = BuiltinContainer::build(registry, options)?;
        Ok(Arc::new(container))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_abstractions::{Component, Injectable, ResolverExt};
    use infrastructure_common::{BuildError, Disposable};
    use parking_lot::Mutex;

    trait Logger: Send + Sync {
        fn log(&self, message: &str);
    }

    #[derive(Default)]
    struct ConsoleLogger {
        lines: Mutex<Vec<String>>,
    }

    impl Logger for ConsoleLogger {
        fn log(&self, message: &str) {
            self.lines.lock().push(message.to_string());
        }
    }

    struct Connection {
        name: &'static str,
        journal: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Disposable for Connection {
        fn dispose(&self) {
            self.journal.lock().push(self.name);
        }
    }

    fn build(registry: ComponentRegistry) -> BuiltinContainer {
        BuiltinContainer::build(registry, &ContainerOptions::default()).unwrap()
    }

    #[test]
    fn test_singleton_created_in_root_context() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(
                Component::<dyn Logger>::from_factory(|_| {
                    Ok(Arc::new(ConsoleLogger::default()) as Arc<dyn Logger>)
                })
                .singleton(),
            )
            .unwrap();
        let container = build(registry);

        let scope = container.create_scope().unwrap();
        let from_scope = scope.resolve::<dyn Logger>().unwrap();
        scope.dispose();

        let from_root = container.resolve::<dyn Logger>().unwrap();
        assert!(Arc::ptr_eq(&from_scope, &from_root));
        from_root.log("still alive");
    }

    #[test]
    fn test_scoped_from_root_is_rejected_when_validating() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(
                Component::<dyn Logger>::from_factory(|_| {
                    Ok(Arc::new(ConsoleLogger::default()) as Arc<dyn Logger>)
                })
                .scoped(),
            )
            .unwrap();
        let container =
            BuiltinContainer::build(registry, &ContainerOptions::development()).unwrap();

        let err = container.resolve::<dyn Logger>().err().unwrap();
        assert!(matches!(err, ResolutionError::ScopedFromRoot { .. }));

        let scope = container.create_scope().unwrap();
        assert!(scope.resolve::<dyn Logger>().is_ok());
    }

    #[test]
    fn test_dispose_on_drop_in_reverse_order() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ComponentRegistry::new();
        for name in ["first", "second"] {
            let journal = journal.clone();
            registry
                .register(
                    Component::<Connection>::from_factory(move |_| {
                        Ok(Arc::new(Connection {
                            name,
                            journal: journal.clone(),
                        }))
                    })
                    .scoped()
                    .disposable(),
                )
                .unwrap();
        }
        let container = build(registry);

        let scope = container.create_scope().unwrap();
        let all: Vec<_> = scope
            .resolve_all::<Connection>()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(container.stats().open_scopes, 1);

        drop(scope);
        assert_eq!(*journal.lock(), vec!["second", "first"]);
        assert_eq!(container.stats().open_scopes, 0);
    }

    #[test]
    fn test_build_validates_dependencies() {
        struct Service;
        impl Injectable for Service {
            fn dependencies() -> Vec<TypeInfo> {
                vec![TypeInfo::of::<dyn Logger>()]
            }
            fn inject(resolver: &dyn Resolver) -> Result<Self, ResolutionError> {
                resolver.resolve::<dyn Logger>()?;
                Ok(Service)
            }
        }

        let mut registry = ComponentRegistry::new();
        registry.register(Component::<Service>::concrete()).unwrap();

        let err = BuiltinContainer::build(registry.clone(), &ContainerOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            DiError::Build {
                source: BuildError::MissingDependency { .. }
            }
        ));

        let options = ContainerOptions {
            validate_on_build: false,
            ..Default::default()
        };
        let container = BuiltinContainer::build(registry, &options).unwrap();
        let err = container.resolve::<Service>().err().unwrap();
        assert!(matches!(err, ResolutionError::NotRegistered { .. }));
    }

    #[test]
    fn test_stats_and_engine() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(Component::<dyn Logger>::from_instance(Arc::new(ConsoleLogger::default())))
            .unwrap();
        let container = BuiltinAdapter.build(registry, &ContainerOptions::default()).unwrap();

        assert_eq!(container.engine(), "builtin");
        assert_eq!(
            container.stats(),
            ContainerStats {
                registrations: 1,
                contracts: 1,
                open_scopes: 0,
            }
        );
    }
}
