//! 内置引擎的作用域节点
//!
//! 根容器和每个作用域各对应一个 [`ScopeNode`]。节点之间只通过 `Weak` 相互引用，
//! 所有权只存在于公开句柄中，句柄释放即作用域结束。

use di_abstractions::{
    ComponentRegistration, ContainerOptions, Instance, Instances, ResolveContext, Resolver,
};
use infrastructure_common::{Lifetime, ResolutionError, ScopeInfo, TypeInfo};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// 所有作用域共享的只读状态
pub(crate) struct Shared {
    pub(crate) registrations: Arc<[ComponentRegistration]>,
    index: HashMap<TypeInfo, Vec<usize>>,
    pub(crate) options: ContainerOptions,
    open_scopes: AtomicUsize,
}

impl Shared {
    pub(crate) fn new(registrations: Arc<[ComponentRegistration]>, options: ContainerOptions) -> Self {
        let mut index: HashMap<TypeInfo, Vec<usize>> = HashMap::new();
        for (position, registration) in registrations.iter().enumerate() {
            index.entry(registration.contract()).or_default().push(position);
        }

        Self {
            registrations,
            index,
            options,
            open_scopes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn contracts(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn open_scopes(&self) -> usize {
        self.open_scopes.load(Ordering::SeqCst)
    }

    fn positions(&self, contract: &TypeInfo) -> &[usize] {
        self.index.get(contract).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// 作用域节点
pub(crate) struct ScopeNode {
    info: ScopeInfo,
    shared: Arc<Shared>,
    root: Weak<ScopeNode>,
    parent: Weak<ScopeNode>,
    children: Mutex<Vec<Weak<ScopeNode>>>,
    /// 以注册位置为键的实例缓存，根节点同时保存单例
    cache: DashMap<usize, Arc<OnceCell<Instance>>>,
    /// 需要释放的实例，按创建顺序
    tracked: Mutex<Vec<(usize, Instance)>>,
    disposed: AtomicBool,
}

impl ScopeNode {
    /// 创建根节点
    pub(crate) fn root(shared: Arc<Shared>) -> Arc<Self> {
        Arc::new_cyclic(|root| Self {
            info: ScopeInfo::root(),
            shared,
            root: root.clone(),
            parent: Weak::new(),
            children: Mutex::new(Vec::new()),
            cache: DashMap::new(),
            tracked: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        })
    }

    /// 创建子节点
    pub(crate) fn create_child(self: &Arc<Self>) -> Result<Arc<Self>, ResolutionError> {
        self.ensure_active()?;
        let child = Arc::new(Self {
            info: self.info.child(),
            shared: self.shared.clone(),
            root: self.root.clone(),
            parent: Arc::downgrade(self),
            children: Mutex::new(Vec::new()),
            cache: DashMap::new(),
            tracked: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        });

        self.children.lock().push(Arc::downgrade(&child));
        self.shared.open_scopes.fetch_add(1, Ordering::SeqCst);
        debug!(scope = %child.info.id, depth = child.info.depth, "创建作用域");
        Ok(child)
    }

    pub(crate) fn info(&self) -> ScopeInfo {
        self.info
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> Result<(), ResolutionError> {
        if self.is_disposed() {
            return Err(ResolutionError::ScopeDisposed {
                scope_id: self.info.id.to_string(),
            });
        }
        Ok(())
    }

    fn root_node(&self) -> Result<Arc<Self>, ResolutionError> {
        self.root.upgrade().ok_or_else(|| ResolutionError::ScopeDisposed {
            scope_id: self.info.id.to_string(),
        })
    }

    pub(crate) fn new_context(&self) -> ResolveContext {
        ResolveContext::new(self.shared.options.max_resolution_depth)
    }

    pub(crate) fn is_registered(&self, contract: &TypeInfo) -> bool {
        !self.shared.positions(contract).is_empty()
    }

    /// 解析单个实例，最后注册者优先
    pub(crate) fn resolve(
        &self,
        context: &ResolveContext,
        contract: &TypeInfo,
    ) -> Result<Instance, ResolutionError> {
        self.ensure_active()?;
        let position = self
            .shared
            .positions(contract)
            .last()
            .copied()
            .ok_or_else(|| ResolutionError::not_registered(contract.name))?;
        self.resolve_registration(context, position)
    }

    /// 按注册顺序惰性解析全部实例
    pub(crate) fn resolve_all<'a>(
        &'a self,
        context: &ResolveContext,
        contract: &TypeInfo,
    ) -> Result<Instances<'a>, ResolutionError> {
        self.ensure_active()?;
        let positions = self.shared.positions(contract).to_vec();
        let context = context.clone();
        Ok(Instances::new(
            positions
                .into_iter()
                .map(move |position| self.resolve_registration(&context, position)),
        ))
    }

    fn resolve_registration(
        &self,
        context: &ResolveContext,
        position: usize,
    ) -> Result<Instance, ResolutionError> {
        self.ensure_active()?;
        let registration = &self.shared.registrations[position];
        let context = context.enter(registration.contract())?;
        trace!(
            contract = registration.contract().name,
            lifetime = %registration.lifetime(),
            depth = context.depth(),
            requested_by = context
                .chain()
                .iter()
                .rev()
                .nth(1)
                .map_or("-", TypeInfo::short_name),
            scope = %self.info.id,
            "解析组件"
        );

        match registration.lifetime() {
            Lifetime::Transient => self.create(&context, position),
            Lifetime::Scoped => {
                if self.info.is_root() && self.shared.options.validate_scopes {
                    return Err(ResolutionError::ScopedFromRoot {
                        contract: registration.contract().name.to_string(),
                    });
                }
                self.cached(&context, position)
            }
            Lifetime::Singleton => self.root_node()?.cached(&context, position),
        }
    }

    fn cached(&self, context: &ResolveContext, position: usize) -> Result<Instance, ResolutionError> {
        let cell = self.cache.entry(position).or_default().clone();
        let instance = cell.get_or_try_init(|| self.create(context, position))?;
        Ok(instance.clone())
    }

    fn create(&self, context: &ResolveContext, position: usize) -> Result<Instance, ResolutionError> {
        let registration = &self.shared.registrations[position];
        let frame = Frame {
            node: self,
            context: context.clone(),
        };
        let instance = registration.produce(&frame)?;

        if registration.disposer().is_some() && !registration.is_externally_owned() {
            self.tracked.lock().push((position, instance.clone()));
        }
        Ok(instance)
    }

    /// 释放本节点
    pub(crate) fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let tracked = std::mem::take(&mut *self.tracked.lock());
        debug!(scope = %self.info.id, instances = tracked.len(), "释放作用域");
        for (position, instance) in tracked.into_iter().rev() {
            self.shared.registrations[position].dispose(&instance);
        }

        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().rev().filter_map(Weak::upgrade) {
            child.dispose();
        }
        self.cache.clear();

        if !self.info.is_root() {
            self.shared.open_scopes.fetch_sub(1, Ordering::SeqCst);
        }
        if let Some(parent) = self.parent.upgrade() {
            let this: *const Self = self;
            parent
                .children
                .lock()
                .retain(|child| !std::ptr::eq(child.as_ptr(), this));
        }
    }
}

impl Drop for ScopeNode {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// 一次解析中传给工厂的解析器，携带解析上下文
struct Frame<'a> {
    node: &'a ScopeNode,
    context: ResolveContext,
}

impl Resolver for Frame<'_> {
    fn resolve_key(&self, contract: &TypeInfo) -> Result<Instance, ResolutionError> {
        self.node.resolve(&self.context, contract)
    }

    fn resolve_all_keys(&self, contract: &TypeInfo) -> Result<Instances<'_>, ResolutionError> {
        self.node.resolve_all(&self.context, contract)
    }

    fn is_registered(&self, contract: &TypeInfo) -> bool {
        self.node.is_registered(contract)
    }
}
