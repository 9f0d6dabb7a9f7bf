//! 组件注册描述
//!
//! 一条注册描述一个契约如何被满足：实现类型、生命周期、实例来源、注册方式，
//! 以及可选的装饰器链、释放函数和元数据。

use crate::factory::{
    downcast, erase, DecoratorFn, DisposeFn, FactoryFn, Injectable, Instance,
};
use crate::resolver::Resolver;
use infrastructure_common::{Disposable, Lifetime, ResolutionError, TypeInfo};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// 实例来源
#[derive(Clone)]
pub enum ComponentSource {
    /// 具体类型，由解析器注入依赖后构建
    Type {
        activator: FactoryFn,
        dependencies: Vec<TypeInfo>,
    },
    /// 预构建实例，由外部持有，容器不负责释放
    Instance(Instance),
    /// 工厂函数
    Factory(FactoryFn),
}

impl ComponentSource {
    /// 来源类型名称，用于日志和错误信息
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Type { .. } => "type",
            Self::Instance(_) => "instance",
            Self::Factory(_) => "factory",
        }
    }
}

impl std::fmt::Debug for ComponentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Type { dependencies, .. } => f
                .debug_struct("Type")
                .field("dependencies", dependencies)
                .field("activator", &"<function>")
                .finish(),
            Self::Instance(_) => f.write_str("Instance(<instance>)"),
            Self::Factory(_) => f.write_str("Factory(<function>)"),
        }
    }
}

/// 注册方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationMode {
    /// 追加
    #[default]
    Add,
    /// 契约已注册时跳过
    TryAdd,
    /// 相同 (契约, 实现) 已注册时跳过
    TryAddImplementation,
    /// 移除契约的全部既有注册后追加
    Replace,
}

/// 组件注册信息
#[derive(Clone)]
pub struct ComponentRegistration {
    contract: TypeInfo,
    implementation: TypeInfo,
    lifetime: Lifetime,
    source: ComponentSource,
    mode: RegistrationMode,
    decorators: Vec<DecoratorFn>,
    disposer: Option<DisposeFn>,
    metadata: BTreeMap<String, String>,
}

impl ComponentRegistration {
    /// 创建新的注册信息
    pub fn new(
        contract: TypeInfo,
        implementation: TypeInfo,
        lifetime: Lifetime,
        source: ComponentSource,
    ) -> Self {
        Self {
            contract,
            implementation,
            lifetime,
            source,
            mode: RegistrationMode::Add,
            decorators: Vec::new(),
            disposer: None,
            metadata: BTreeMap::new(),
        }
    }

    /// 契约类型
    pub fn contract(&self) -> TypeInfo {
        self.contract
    }

    /// 实现类型
    pub fn implementation(&self) -> TypeInfo {
        self.implementation
    }

    /// 生命周期
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// 实例来源
    pub fn source(&self) -> &ComponentSource {
        &self.source
    }

    /// 注册方式
    pub fn mode(&self) -> RegistrationMode {
        self.mode
    }

    /// 装饰器链，按添加顺序
    pub fn decorators(&self) -> &[DecoratorFn] {
        &self.decorators
    }

    /// 释放函数
    pub fn disposer(&self) -> Option<&DisposeFn> {
        self.disposer.as_ref()
    }

    /// 元数据
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// 声明的依赖，只有具体类型来源才有
    pub fn dependencies(&self) -> &[TypeInfo] {
        match &self.source {
            ComponentSource::Type { dependencies, .. } => dependencies,
            _ => &[],
        }
    }

    /// 是否为外部持有的实例
    pub fn is_externally_owned(&self) -> bool {
        matches!(self.source, ComponentSource::Instance(_))
    }

    /// 设置注册方式
    pub fn with_mode(mut self, mode: RegistrationMode) -> Self {
        self.mode = mode;
        self
    }

    /// 设置生命周期
    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// 设置释放函数
    pub fn with_disposer(mut self, disposer: DisposeFn) -> Self {
        self.disposer = Some(disposer);
        self
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub(crate) fn push_decorator(&mut self, decorator: DecoratorFn) {
        self.decorators.push(decorator);
    }

    /// 只通过来源创建基础实例，不应用装饰器
    pub fn activate(&self, resolver: &dyn Resolver) -> Result<Instance, ResolutionError> {
        match &self.source {
            ComponentSource::Type { activator, .. } => activator(resolver),
            ComponentSource::Instance(instance) => Ok(instance.clone()),
            ComponentSource::Factory(factory) => factory(resolver),
        }
    }

    /// 依次应用装饰器：基础实例 → D1 → D2 …
    pub fn decorate(
        &self,
        resolver: &dyn Resolver,
        instance: Instance,
    ) -> Result<Instance, ResolutionError> {
        self.decorators
            .iter()
            .try_fold(instance, |inner, decorator| decorator(resolver, inner))
    }

    /// 创建完整实例
    pub fn produce(&self, resolver: &dyn Resolver) -> Result<Instance, ResolutionError> {
        let instance = self.activate(resolver)?;
        self.decorate(resolver, instance)
    }

    /// 释放由容器创建的实例
    pub fn dispose(&self, instance: &Instance) {
        if let Some(disposer) = &self.disposer {
            disposer(instance);
        }
    }
}

impl std::fmt::Debug for ComponentRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistration")
            .field("contract", &self.contract.name)
            .field("implementation", &self.implementation.name)
            .field("lifetime", &self.lifetime)
            .field("source", &self.source)
            .field("mode", &self.mode)
            .field("decorators", &self.decorators.len())
            .field("disposable", &self.disposer.is_some())
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// 装饰请求
///
/// 包装契约已有的全部注册，把原来的产出交给新的装饰器。
#[derive(Clone)]
pub struct Decoration {
    contract: TypeInfo,
    decorator: DecoratorFn,
}

impl Decoration {
    /// 被装饰的契约
    pub fn contract(&self) -> TypeInfo {
        self.contract
    }

    /// 装饰器
    pub fn decorator(&self) -> &DecoratorFn {
        &self.decorator
    }
}

impl std::fmt::Debug for Decoration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoration")
            .field("contract", &self.contract.name)
            .field("decorator", &"<function>")
            .finish()
    }
}

/// 交给注册表的请求
#[derive(Debug, Clone)]
pub enum RegistrationRequest {
    /// 组件注册
    Component(ComponentRegistration),
    /// 装饰既有注册
    Decorate(Decoration),
}

impl From<ComponentRegistration> for RegistrationRequest {
    fn from(registration: ComponentRegistration) -> Self {
        Self::Component(registration)
    }
}

impl From<Decoration> for RegistrationRequest {
    fn from(decoration: Decoration) -> Self {
        Self::Decorate(decoration)
    }
}

/// 类型化的组件注册构建器
///
/// ```rust
/// use di_abstractions::{Component, Injectable, Resolver};
/// use infrastructure_common::ResolutionError;
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {}
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {}
///
/// impl Injectable for ConsoleLogger {
///     fn inject(_: &dyn Resolver) -> Result<Self, ResolutionError> {
///         Ok(ConsoleLogger)
///     }
/// }
///
/// let registration = Component::<dyn Logger>::implemented_by::<ConsoleLogger, _>(|c| c as Arc<dyn Logger>)
///     .singleton()
///     .into_registration();
/// assert_eq!(registration.implementation().short_name(), "ConsoleLogger");
/// ```
pub struct Component<C: ?Sized> {
    registration: ComponentRegistration,
    _contract: PhantomData<fn() -> Arc<C>>,
}

impl<C> Component<C>
where
    C: ?Sized + Send + Sync + 'static,
{
    fn from_source(implementation: TypeInfo, lifetime: Lifetime, source: ComponentSource) -> Self {
        Self {
            registration: ComponentRegistration::new(
                TypeInfo::of::<C>(),
                implementation,
                lifetime,
                source,
            ),
            _contract: PhantomData,
        }
    }

    /// 由具体类型实现契约
    pub fn implemented_by<I, F>(as_contract: F) -> Self
    where
        I: Injectable,
        F: Fn(Arc<I>) -> Arc<C> + Send + Sync + 'static,
    {
        let activator: FactoryFn = Arc::new(move |resolver: &dyn Resolver| {
            let implementation = I::inject(resolver)?;
            Ok(erase(as_contract(Arc::new(implementation))))
        });
        Self::from_source(
            TypeInfo::of::<I>(),
            Lifetime::Transient,
            ComponentSource::Type {
                activator,
                dependencies: I::dependencies(),
            },
        )
    }

    /// 由工厂函数创建
    pub fn from_factory<F>(factory: F) -> Self
    where
        F: Fn(&dyn Resolver) -> Result<Arc<C>, ResolutionError> + Send + Sync + 'static,
    {
        let factory: FactoryFn =
            Arc::new(move |resolver: &dyn Resolver| factory(resolver).map(erase));
        Self::from_source(
            TypeInfo::of::<C>(),
            Lifetime::Transient,
            ComponentSource::Factory(factory),
        )
    }

    /// 使用预构建实例，生命周期为单例
    pub fn from_instance(instance: Arc<C>) -> Self {
        Self::from_source(
            TypeInfo::of::<C>(),
            Lifetime::Singleton,
            ComponentSource::Instance(erase(instance)),
        )
    }

    /// 创建装饰请求
    pub fn decorator<F>(decorator: F) -> Decoration
    where
        F: Fn(&dyn Resolver, Arc<C>) -> Result<Arc<C>, ResolutionError> + Send + Sync + 'static,
    {
        Decoration {
            contract: TypeInfo::of::<C>(),
            decorator: Arc::new(move |resolver: &dyn Resolver, instance: Instance| {
                let inner = downcast::<C>(&instance)?;
                decorator(resolver, inner).map(erase)
            }),
        }
    }

    /// 声明实现类型，工厂注册时用于诊断和按实现去重
    pub fn with_implementation<I: ?Sized + 'static>(mut self) -> Self {
        self.registration.implementation = TypeInfo::of::<I>();
        self
    }

    /// 设置生命周期
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.registration.lifetime = lifetime;
        self
    }

    /// 瞬时生命周期
    pub fn transient(self) -> Self {
        self.lifetime(Lifetime::Transient)
    }

    /// 作用域生命周期
    pub fn scoped(self) -> Self {
        self.lifetime(Lifetime::Scoped)
    }

    /// 单例生命周期
    pub fn singleton(self) -> Self {
        self.lifetime(Lifetime::Singleton)
    }

    /// 契约已注册时跳过
    pub fn try_add(mut self) -> Self {
        self.registration.mode = RegistrationMode::TryAdd;
        self
    }

    /// 相同实现已注册时跳过
    pub fn try_add_implementation(mut self) -> Self {
        self.registration.mode = RegistrationMode::TryAddImplementation;
        self
    }

    /// 替换契约的既有注册
    pub fn replace(mut self) -> Self {
        self.registration.mode = RegistrationMode::Replace;
        self
    }

    /// 作用域结束时调用的释放回调
    pub fn on_dispose<F>(mut self, on_dispose: F) -> Self
    where
        F: Fn(&C) + Send + Sync + 'static,
    {
        self.registration.disposer = Some(Arc::new(move |instance: &Instance| {
            if let Ok(component) = downcast::<C>(instance) {
                on_dispose(component.as_ref());
            }
        }));
        self
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.registration = self.registration.with_metadata(key, value);
        self
    }

    /// 取出注册信息
    pub fn into_registration(self) -> ComponentRegistration {
        self.registration
    }
}

impl<C> Component<C>
where
    C: ?Sized + Disposable + Send + Sync + 'static,
{
    /// 作用域结束时调用 [`Disposable::dispose`]
    pub fn disposable(self) -> Self {
        self.on_dispose(|component: &C| component.dispose())
    }
}

impl<I: Injectable> Component<I> {
    /// 契约即实现类型
    pub fn concrete() -> Self {
        Self::implemented_by::<I, _>(|implementation| implementation)
    }
}

impl<C: ?Sized> From<Component<C>> for ComponentRegistration {
    fn from(component: Component<C>) -> Self {
        component.registration
    }
}

impl<C: ?Sized> From<Component<C>> for RegistrationRequest {
    fn from(component: Component<C>) -> Self {
        Self::Component(component.registration)
    }
}

impl<C: ?Sized> std::fmt::Debug for Component<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Component").field(&self.registration).finish()
    }
}

/// 同一实现类型绑定到多个契约
///
/// 交给 [`ComponentRegistry::register_many`](crate::ComponentRegistry::register_many)，
/// 每个契约生成一条独立注册，创建语义与单独注册相同。
pub struct ContractSet<I> {
    contracts: Vec<(TypeInfo, Arc<dyn Fn(Arc<I>) -> Instance + Send + Sync>)>,
}

impl<I: Injectable> ContractSet<I> {
    /// 创建空的契约集合
    pub fn new() -> Self {
        Self {
            contracts: Vec::new(),
        }
    }

    /// 添加一个契约
    pub fn with<C, F>(mut self, as_contract: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<I>) -> Arc<C> + Send + Sync + 'static,
    {
        self.contracts.push((
            TypeInfo::of::<C>(),
            Arc::new(move |implementation: Arc<I>| erase(as_contract(implementation))),
        ));
        self
    }

    /// 契约数量
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// 生成每个契约的注册信息
    pub fn into_registrations(self, lifetime: Lifetime) -> Vec<ComponentRegistration> {
        self.contracts
            .into_iter()
            .map(|(contract, upcast)| {
                let activator: FactoryFn = Arc::new(move |resolver: &dyn Resolver| {
                    let implementation = I::inject(resolver)?;
                    Ok(upcast(Arc::new(implementation)))
                });
                ComponentRegistration::new(
                    contract,
                    TypeInfo::of::<I>(),
                    lifetime,
                    ComponentSource::Type {
                        activator,
                        dependencies: I::dependencies(),
                    },
                )
            })
            .collect()
    }
}

impl<I: Injectable> Default for ContractSet<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Instances;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 不提供任何组件的解析器
    struct EmptyResolver;

    impl Resolver for EmptyResolver {
        fn resolve_key(&self, contract: &TypeInfo) -> Result<Instance, ResolutionError> {
            Err(ResolutionError::not_registered(contract.name))
        }

        fn resolve_all_keys(&self, _: &TypeInfo) -> Result<Instances<'_>, ResolutionError> {
            Ok(Instances::empty())
        }

        fn is_registered(&self, _: &TypeInfo) -> bool {
            false
        }
    }

    trait Message: Send + Sync {
        fn text(&self) -> String;
    }

    struct Plain;

    impl Message for Plain {
        fn text(&self) -> String {
            "base".to_string()
        }
    }

    struct Wrapped {
        inner: Arc<dyn Message>,
        tag: &'static str,
    }

    impl Message for Wrapped {
        fn text(&self) -> String {
            format!("{}>{}", self.inner.text(), self.tag)
        }
    }

    #[test]
    fn test_decorators_apply_in_order() {
        let mut registration =
            Component::<dyn Message>::from_factory(|_| Ok(Arc::new(Plain) as Arc<dyn Message>))
                .into_registration();
        for tag in ["d1", "d2"] {
            let decoration = Component::<dyn Message>::decorator(move |_, inner| {
                Ok(Arc::new(Wrapped { inner, tag }) as Arc<dyn Message>)
            });
            registration.push_decorator(decoration.decorator().clone());
        }

        let instance = registration.produce(&EmptyResolver).unwrap();
        let message = downcast::<dyn Message>(&instance).unwrap();
        assert_eq!(message.text(), "base>d1>d2");
    }

    #[test]
    fn test_instance_source_defaults_to_singleton() {
        let registration = Component::<dyn Message>::from_instance(Arc::new(Plain)).into_registration();
        assert_eq!(registration.lifetime(), Lifetime::Singleton);
        assert!(registration.is_externally_owned());
        assert_eq!(registration.source().kind(), "instance");
    }

    #[test]
    fn test_on_dispose_receives_contract() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let counter = disposed.clone();
        let registration = Component::<dyn Message>::from_factory(|_| Ok(Arc::new(Plain) as Arc<dyn Message>))
            .scoped()
            .on_dispose(move |message| {
                assert_eq!(message.text(), "base");
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .into_registration();

        let instance = registration.produce(&EmptyResolver).unwrap();
        registration.dispose(&instance);
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }
}
