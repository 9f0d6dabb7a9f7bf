//! 适配器一致性场景
//!
//! 每个场景只依赖抽象接口，由 `conformance_suite!` 针对每个引擎展开一次。

use di_abstractions::{
    Component, ComponentRegistry, Container, ContainerAdapter, ContainerOptions,
    ContractSet, Injectable, Resolver, ResolverExt,
};
use infrastructure_common::{Lifetime, ResolutionError, TypeInfo};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Log = Arc<Mutex<Vec<&'static str>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<&'static str> {
    log.lock().unwrap().clone()
}

fn build(
    adapter: &dyn ContainerAdapter,
    registry: ComponentRegistry,
    options: &ContainerOptions,
) -> Arc<dyn Container> {
    adapter.build(registry, options).unwrap()
}

/// 计数组件
pub struct Counter {
    pub serial: usize,
}

fn counting(registry: &mut ComponentRegistry, lifetime: Lifetime) -> Arc<AtomicUsize> {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    registry
        .register(
            Component::<Counter>::from_factory(move |_| {
                let serial = counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Counter { serial }))
            })
            .lifetime(lifetime),
        )
        .unwrap();
    created
}

pub fn singleton_is_shared_across_scopes(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    let created = counting(&mut registry, Lifetime::Singleton);
    let container = build(adapter, registry, &ContainerOptions::default());

    let first = container.create_scope().unwrap();
    let second = container.create_scope().unwrap();
    let nested = first.create_scope().unwrap();

    let from_root = container.resolve::<Counter>().unwrap();
    for scope in [&first, &second, &nested] {
        let resolved = scope.resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&from_root, &resolved));
    }
    assert_eq!(created.load(Ordering::SeqCst), 1);
}

pub fn scoped_is_cached_per_scope(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    counting(&mut registry, Lifetime::Scoped);
    let container = build(adapter, registry, &ContainerOptions::default());

    let scope = container.create_scope().unwrap();
    let sibling = container.create_scope().unwrap();
    let child = scope.create_scope().unwrap();

    let a = scope.resolve::<Counter>().unwrap();
    let b = scope.resolve::<Counter>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let from_sibling = sibling.resolve::<Counter>().unwrap();
    let from_child = child.resolve::<Counter>().unwrap();
    assert!(!Arc::ptr_eq(&a, &from_sibling));
    assert!(!Arc::ptr_eq(&a, &from_child));
    assert!(!Arc::ptr_eq(&from_sibling, &from_child));
}

pub fn transient_is_always_distinct(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    let created = counting(&mut registry, Lifetime::Transient);
    let container = build(adapter, registry, &ContainerOptions::default());
    let scope = container.create_scope().unwrap();

    let a = container.resolve::<Counter>().unwrap();
    let b = container.resolve::<Counter>().unwrap();
    let c = scope.resolve::<Counter>().unwrap();
    let d = scope.resolve::<Counter>().unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&c, &d));
    assert_eq!(created.load(Ordering::SeqCst), 4);
    assert_eq!(d.serial, 3);
}

/// 可装饰的组件
pub trait Layer: Send + Sync {
    fn describe(&self) -> String;
}

struct BaseLayer;

impl Layer for BaseLayer {
    fn describe(&self) -> String {
        "base".to_string()
    }
}

struct WrappingLayer {
    label: &'static str,
    inner: Arc<dyn Layer>,
}

impl Layer for WrappingLayer {
    fn describe(&self) -> String {
        format!("{}({})", self.label, self.inner.describe())
    }
}

fn wrap(registry: &mut ComponentRegistry, label: &'static str, log: &Log) {
    let log = log.clone();
    registry
        .register(Component::<dyn Layer>::decorator(move |_, inner| {
            log.lock().unwrap().push(label);
            Ok(Arc::new(WrappingLayer { label, inner }) as Arc<dyn Layer>)
        }))
        .unwrap();
}

pub fn decorators_apply_in_registration_order(adapter: &dyn ContainerAdapter) {
    let log = new_log();
    let mut registry = ComponentRegistry::new();
    let base_log = log.clone();
    registry
        .register(Component::<dyn Layer>::from_factory(move |_| {
            base_log.lock().unwrap().push("base");
            Ok(Arc::new(BaseLayer) as Arc<dyn Layer>)
        }))
        .unwrap();
    wrap(&mut registry, "D1", &log);
    wrap(&mut registry, "D2", &log);
    let container = build(adapter, registry, &ContainerOptions::default());

    let layer = container.resolve::<dyn Layer>().unwrap();
    assert_eq!(layer.describe(), "D2(D1(base))");
    assert_eq!(entries(&log), vec!["base", "D1", "D2"]);
}

/// 释放时记录名称的组件
pub struct Resource {
    pub name: &'static str,
}

struct ResourceX(Resource);
struct ResourceY(Resource);
struct ResourceZ(Resource);
struct SharedResource(Resource);

fn tracked<C>(
    registry: &mut ComponentRegistry,
    lifetime: Lifetime,
    name: &'static str,
    make: fn(Resource) -> C,
    inner: fn(&C) -> &Resource,
    log: &Log,
) where
    C: Send + Sync + 'static,
{
    let log = log.clone();
    registry
        .register(
            Component::<C>::from_factory(move |_| Ok(Arc::new(make(Resource { name }))))
                .lifetime(lifetime)
                .on_dispose(move |component| log.lock().unwrap().push(inner(component).name)),
        )
        .unwrap();
}

pub fn scope_disposes_in_reverse_creation_order(adapter: &dyn ContainerAdapter) {
    let log = new_log();
    let mut registry = ComponentRegistry::new();
    tracked(&mut registry, Lifetime::Scoped, "X", ResourceX, |c| &c.0, &log);
    tracked(&mut registry, Lifetime::Scoped, "Y", ResourceY, |c| &c.0, &log);
    tracked(&mut registry, Lifetime::Scoped, "Z", ResourceZ, |c| &c.0, &log);
    tracked(&mut registry, Lifetime::Singleton, "S", SharedResource, |c| &c.0, &log);
    let container = build(adapter, registry, &ContainerOptions::default());

    let scope = container.create_scope().unwrap();
    let shared = scope.resolve::<SharedResource>().unwrap();
    scope.resolve::<ResourceX>().unwrap();
    scope.resolve::<ResourceY>().unwrap();
    scope.resolve::<ResourceZ>().unwrap();

    scope.dispose();
    assert!(scope.is_disposed());
    assert_eq!(entries(&log), vec!["Z", "Y", "X"]);

    let again = container.resolve::<SharedResource>().unwrap();
    assert!(Arc::ptr_eq(&shared, &again));

    container.dispose();
    assert_eq!(entries(&log), vec!["Z", "Y", "X", "S"]);
}

pub fn root_disposes_singletons_in_reverse(adapter: &dyn ContainerAdapter) {
    let log = new_log();
    let mut registry = ComponentRegistry::new();
    tracked(&mut registry, Lifetime::Singleton, "X", ResourceX, |c| &c.0, &log);
    tracked(&mut registry, Lifetime::Singleton, "Y", ResourceY, |c| &c.0, &log);
    let container = build(adapter, registry, &ContainerOptions::default());

    container.resolve::<ResourceY>().unwrap();
    container.resolve::<ResourceX>().unwrap();
    drop(container);

    assert_eq!(entries(&log), vec!["X", "Y"]);
}

pub fn transient_disposables_belong_to_resolving_scope(adapter: &dyn ContainerAdapter) {
    let log = new_log();
    let mut registry = ComponentRegistry::new();
    tracked(&mut registry, Lifetime::Transient, "T", ResourceX, |c| &c.0, &log);
    let container = build(adapter, registry, &ContainerOptions::default());

    let scope = container.create_scope().unwrap();
    scope.resolve::<ResourceX>().unwrap();
    scope.resolve::<ResourceX>().unwrap();
    assert!(entries(&log).is_empty());

    drop(scope);
    assert_eq!(entries(&log), vec!["T", "T"]);
}

pub fn root_transient_disposables_held_until_root_disposal(adapter: &dyn ContainerAdapter) {
    let log = new_log();
    let mut registry = ComponentRegistry::new();
    tracked(&mut registry, Lifetime::Transient, "T", ResourceX, |c| &c.0, &log);
    let container = build(adapter, registry, &ContainerOptions::default());

    for _ in 0..100 {
        drop(container.resolve::<ResourceX>().unwrap());
    }
    let scope = container.create_scope().unwrap();
    scope.resolve::<ResourceX>().unwrap();
    scope.dispose();
    assert_eq!(entries(&log), vec!["T"]);

    container.dispose();
    assert_eq!(entries(&log).len(), 101);
}

pub fn external_instances_are_never_disposed(adapter: &dyn ContainerAdapter) {
    let log = new_log();
    let disposed = log.clone();
    let mut registry = ComponentRegistry::new();
    registry
        .register(
            Component::<ResourceX>::from_instance(Arc::new(ResourceX(Resource { name: "E" })))
                .on_dispose(move |component| disposed.lock().unwrap().push(component.0.name)),
        )
        .unwrap();
    let container = build(adapter, registry, &ContainerOptions::default());

    let scope = container.create_scope().unwrap();
    assert_eq!(scope.resolve::<ResourceX>().unwrap().0.name, "E");
    scope.dispose();
    container.dispose();

    assert!(entries(&log).is_empty());
}

pub struct CycleA;
pub struct CycleB;

pub fn circular_dependency_fails_fast(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    registry
        .register(Component::<CycleA>::from_factory(|resolver| {
            resolver.resolve::<CycleB>()?;
            Ok(Arc::new(CycleA))
        }))
        .unwrap()
        .register(Component::<CycleB>::from_factory(|resolver| {
            resolver.resolve::<CycleA>()?;
            Ok(Arc::new(CycleB))
        }))
        .unwrap();
    let container = build(adapter, registry, &ContainerOptions::default());

    let error = container.resolve::<CycleA>().err().unwrap();
    assert!(error.is_circular_dependency(), "unexpected error: {error}");
    match error {
        ResolutionError::CircularDependency { dependency_chain } => {
            assert_eq!(dependency_chain, "CycleA -> CycleB -> CycleA");
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// 日志契约
pub trait Logger: Send + Sync {
    fn log(&self, message: &str) -> String;
}

pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, message: &str) -> String {
        format!("[console] {message}")
    }
}

impl Injectable for ConsoleLogger {
    fn inject(_: &dyn Resolver) -> Result<Self, ResolutionError> {
        Ok(ConsoleLogger)
    }
}

/// 服务契约
pub trait Service: Send + Sync {
    fn logger(&self) -> Arc<dyn Logger>;
}

pub struct DefaultService {
    logger: Arc<dyn Logger>,
}

impl Service for DefaultService {
    fn logger(&self) -> Arc<dyn Logger> {
        self.logger.clone()
    }
}

impl Injectable for DefaultService {
    fn dependencies() -> Vec<TypeInfo> {
        vec![TypeInfo::of::<dyn Logger>()]
    }

    fn inject(resolver: &dyn Resolver) -> Result<Self, ResolutionError> {
        Ok(Self {
            logger: resolver.resolve::<dyn Logger>()?,
        })
    }
}

pub fn transient_services_share_singleton_logger(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    registry
        .register(
            Component::<dyn Logger>::implemented_by::<ConsoleLogger, _>(|c| c as Arc<dyn Logger>)
                .singleton(),
        )
        .unwrap()
        .register(
            Component::<dyn Service>::implemented_by::<DefaultService, _>(|s| {
                s as Arc<dyn Service>
            })
            .transient(),
        )
        .unwrap();
    let container = build(adapter, registry, &ContainerOptions::default());

    let first = container.resolve::<dyn Service>().unwrap();
    let second = container.resolve::<dyn Service>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.logger(), &second.logger()));
    assert_eq!(first.logger().log("ready"), "[console] ready");
}

/// 插件契约
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;
}

macro_rules! plugin {
    ($($name:ident),*) => {
        $(
            pub struct $name;

            impl Plugin for $name {
                fn name(&self) -> &'static str {
                    stringify!($name)
                }
            }

            impl Injectable for $name {
                fn inject(_: &dyn Resolver) -> Result<Self, ResolutionError> {
                    Ok($name)
                }
            }
        )*
    };
}

plugin!(PluginA, PluginB, PluginC);

fn plugins(registry: &mut ComponentRegistry) {
    registry
        .register(Component::<dyn Plugin>::implemented_by::<PluginA, _>(|p| p as Arc<dyn Plugin>))
        .unwrap()
        .register(Component::<dyn Plugin>::implemented_by::<PluginB, _>(|p| p as Arc<dyn Plugin>))
        .unwrap()
        .register(Component::<dyn Plugin>::implemented_by::<PluginC, _>(|p| p as Arc<dyn Plugin>))
        .unwrap();
}

pub fn resolve_all_keeps_registration_order(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    plugins(&mut registry);
    let container = build(adapter, registry, &ContainerOptions::default());

    let resolved = container.resolve_all::<dyn Plugin>().unwrap();
    assert_eq!(resolved.len(), 3);
    let names = resolved
        .map(|plugin| plugin.map(|p| p.name()))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(names, vec!["PluginA", "PluginB", "PluginC"]);

    let scope = container.create_scope().unwrap();
    assert_eq!(scope.resolve_all::<dyn Plugin>().unwrap().count(), 3);
}

pub fn last_registration_wins(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    plugins(&mut registry);
    let container = build(adapter, registry, &ContainerOptions::default());

    assert!(container.can_resolve::<dyn Plugin>());
    assert_eq!(container.resolve::<dyn Plugin>().unwrap().name(), "PluginC");
    let scope = container.create_scope().unwrap();
    assert!(scope.can_resolve::<dyn Plugin>());
    assert_eq!(scope.resolve::<dyn Plugin>().unwrap().name(), "PluginC");
}

pub fn unregistered_contracts(adapter: &dyn ContainerAdapter) {
    let container = build(adapter, ComponentRegistry::new(), &ContainerOptions::default());

    assert!(!container.can_resolve::<Counter>());
    assert!(container.try_resolve::<Counter>().unwrap().is_none());
    assert!(matches!(
        container.resolve::<Counter>().err().unwrap(),
        ResolutionError::NotRegistered { .. }
    ));
    assert_eq!(container.resolve_all::<Counter>().unwrap().count(), 0);
}

pub fn disposed_scope_rejects_resolution(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    counting(&mut registry, Lifetime::Scoped);
    let container = build(adapter, registry, &ContainerOptions::default());

    let scope = container.create_scope().unwrap();
    scope.resolve::<Counter>().unwrap();
    scope.dispose();
    scope.dispose();

    assert!(scope.is_disposed());
    assert!(matches!(
        scope.resolve::<Counter>().err().unwrap(),
        ResolutionError::ScopeDisposed { .. }
    ));
    assert!(matches!(
        scope.create_scope().err().unwrap(),
        ResolutionError::ScopeDisposed { .. }
    ));
    assert!(container.resolve::<Counter>().is_ok());
}

pub fn dispose_cascades_to_child_scopes(adapter: &dyn ContainerAdapter) {
    let log = new_log();
    let mut registry = ComponentRegistry::new();
    tracked(&mut registry, Lifetime::Scoped, "X", ResourceX, |c| &c.0, &log);
    let container = build(adapter, registry, &ContainerOptions::default());

    let parent = container.create_scope().unwrap();
    let child = parent.create_scope().unwrap();
    let grandchild = child.create_scope().unwrap();
    parent.resolve::<ResourceX>().unwrap();
    grandchild.resolve::<ResourceX>().unwrap();
    assert_eq!(container.stats().open_scopes, 3);

    parent.dispose();
    assert!(child.is_disposed());
    assert!(grandchild.is_disposed());
    assert_eq!(entries(&log), vec!["X", "X"]);
    assert_eq!(container.stats().open_scopes, 0);
    assert!(matches!(
        grandchild.resolve::<ResourceX>().err().unwrap(),
        ResolutionError::ScopeDisposed { .. }
    ));
}

pub fn scope_info_tracks_hierarchy(adapter: &dyn ContainerAdapter) {
    let container = build(adapter, ComponentRegistry::new(), &ContainerOptions::default());
    let root = container.info();
    let scope = container.create_scope().unwrap();
    let child = scope.create_scope().unwrap();

    assert!(root.is_root());
    assert_eq!(scope.info().depth, 1);
    assert_eq!(scope.info().parent, Some(root.id));
    assert_eq!(child.info().depth, 2);
    assert_eq!(child.info().parent, Some(scope.info().id));
    assert_eq!(container.engine(), adapter.name());
}

pub fn scoped_from_root_rejected_when_validating(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    counting(&mut registry, Lifetime::Scoped);
    let container = build(adapter, registry, &ContainerOptions::development());

    assert!(matches!(
        container.resolve::<Counter>().err().unwrap(),
        ResolutionError::ScopedFromRoot { .. }
    ));
    let scope = container.create_scope().unwrap();
    assert!(scope.resolve::<Counter>().is_ok());
}

pub fn scoped_from_root_cached_in_root(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    counting(&mut registry, Lifetime::Scoped);
    let container = build(adapter, registry, &ContainerOptions::default());

    let a = container.resolve::<Counter>().unwrap();
    let b = container.resolve::<Counter>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

/// 依赖作用域组件的消费者
pub struct Consumer {
    pub counter: Arc<Counter>,
}

pub fn factories_receive_current_scope(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    counting(&mut registry, Lifetime::Scoped);
    registry
        .register(Component::<Consumer>::from_factory(|resolver| {
            Ok(Arc::new(Consumer {
                counter: resolver.resolve::<Counter>()?,
            }))
        }))
        .unwrap();
    let container = build(adapter, registry, &ContainerOptions::default());

    let scope = container.create_scope().unwrap();
    let other = container.create_scope().unwrap();
    let consumer = scope.resolve::<Consumer>().unwrap();
    assert!(Arc::ptr_eq(&consumer.counter, &scope.resolve::<Counter>().unwrap()));
    assert!(!Arc::ptr_eq(
        &consumer.counter,
        &other.resolve::<Consumer>().unwrap().counter
    ));
}

pub fn singletons_resolve_against_root(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    counting(&mut registry, Lifetime::Scoped);
    registry
        .register(
            Component::<Consumer>::from_factory(|resolver| {
                Ok(Arc::new(Consumer {
                    counter: resolver.resolve::<Counter>()?,
                }))
            })
            .singleton(),
        )
        .unwrap();
    let container = build(adapter, registry, &ContainerOptions::default());

    let scope = container.create_scope().unwrap();
    let consumer = scope.resolve::<Consumer>().unwrap();
    let scoped = scope.resolve::<Counter>().unwrap();
    assert!(!Arc::ptr_eq(&consumer.counter, &scoped));
    assert!(Arc::ptr_eq(
        &consumer.counter,
        &container.resolve::<Counter>().unwrap()
    ));
}

pub fn factory_errors_pass_through(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    registry
        .register(Component::<Counter>::from_factory(|_| {
            Err(ResolutionError::activation_failed("Counter", "connection refused"))
        }))
        .unwrap();
    let container = build(adapter, registry, &ContainerOptions::default());

    match container.resolve::<Counter>() {
        Err(ResolutionError::ActivationFailed { type_name, source }) => {
            assert_eq!(type_name, "Counter");
            assert_eq!(source.to_string(), "connection refused");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("factory error was swallowed"),
    }
}

pub fn registration_modes_shape_resolution(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    registry
        .register(Component::<dyn Plugin>::implemented_by::<PluginA, _>(|p| p as Arc<dyn Plugin>))
        .unwrap()
        .register(
            Component::<dyn Plugin>::implemented_by::<PluginB, _>(|p| p as Arc<dyn Plugin>)
                .try_add(),
        )
        .unwrap()
        .register(
            Component::<dyn Plugin>::implemented_by::<PluginA, _>(|p| p as Arc<dyn Plugin>)
                .try_add_implementation(),
        )
        .unwrap()
        .register(
            Component::<dyn Logger>::implemented_by::<ConsoleLogger, _>(|c| c as Arc<dyn Logger>),
        )
        .unwrap()
        .register(
            Component::<dyn Logger>::implemented_by::<ConsoleLogger, _>(|c| c as Arc<dyn Logger>)
                .singleton()
                .replace(),
        )
        .unwrap();
    let container = build(adapter, registry, &ContainerOptions::default());

    let names = container
        .resolve_all::<dyn Plugin>()
        .unwrap()
        .map(|plugin| plugin.map(|p| p.name()))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(names, vec!["PluginA"]);
    assert_eq!(container.resolve_all::<dyn Logger>().unwrap().len(), 1);
    assert!(Arc::ptr_eq(
        &container.resolve::<dyn Logger>().unwrap(),
        &container.resolve::<dyn Logger>().unwrap()
    ));
    assert_eq!(container.stats().registrations, 2);
}

/// 同时实现两个契约的组件
pub struct AuditLogger;

impl Logger for AuditLogger {
    fn log(&self, message: &str) -> String {
        format!("[audit] {message}")
    }
}

impl Plugin for AuditLogger {
    fn name(&self) -> &'static str {
        "AuditLogger"
    }
}

impl Injectable for AuditLogger {
    fn inject(_: &dyn Resolver) -> Result<Self, ResolutionError> {
        Ok(AuditLogger)
    }
}

pub fn register_many_binds_each_contract(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    registry
        .register_many(
            ContractSet::<AuditLogger>::new()
                .with(|a| a as Arc<dyn Logger>)
                .with(|a| a as Arc<dyn Plugin>),
            Lifetime::Singleton,
        )
        .unwrap();
    let container = build(adapter, registry, &ContainerOptions::default());

    let logger = container.resolve::<dyn Logger>().unwrap();
    assert_eq!(logger.log("x"), "[audit] x");
    assert!(Arc::ptr_eq(&logger, &container.resolve::<dyn Logger>().unwrap()));
    assert_eq!(container.resolve::<dyn Plugin>().unwrap().name(), "AuditLogger");
    assert_eq!(container.stats().contracts, 2);
}

pub async fn concurrent_singleton_created_once(adapter: &dyn ContainerAdapter) {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    let mut registry = ComponentRegistry::new();
    registry
        .register(
            Component::<Counter>::from_factory(move |_| {
                std::thread::sleep(Duration::from_millis(20));
                let serial = counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Counter { serial }))
            })
            .singleton(),
        )
        .unwrap();
    let container = build(adapter, registry, &ContainerOptions::default());

    let handles = (0..16)
        .map(|i| {
            let container = container.clone();
            tokio::task::spawn_blocking(move || {
                if i % 2 == 0 {
                    container.resolve::<Counter>()
                } else {
                    container.create_scope()?.resolve::<Counter>()
                }
            })
        })
        .collect::<Vec<_>>();

    let mut resolved = Vec::new();
    for handle in handles {
        resolved.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(resolved.iter().all(|c| Arc::ptr_eq(c, &resolved[0])));
}

pub async fn concurrent_scopes_do_not_interfere(adapter: &dyn ContainerAdapter) {
    let mut registry = ComponentRegistry::new();
    let created = counting(&mut registry, Lifetime::Scoped);
    let container = build(adapter, registry, &ContainerOptions::default());

    let handles = (0..8)
        .map(|_| {
            let container = container.clone();
            tokio::task::spawn_blocking(move || {
                let scope = container.create_scope()?;
                let a = scope.resolve::<Counter>()?;
                let b = scope.resolve::<Counter>()?;
                Ok::<_, ResolutionError>(Arc::ptr_eq(&a, &b))
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }
    assert_eq!(created.load(Ordering::SeqCst), 8);
    assert_eq!(container.stats().open_scopes, 0);
}
