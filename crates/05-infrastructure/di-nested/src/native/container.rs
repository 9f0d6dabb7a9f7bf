//! 原生容器、嵌套容器和构建会话

use super::error::{NestedContainerError, NestedResult};
use super::registry::{
    InstanceKind, Interceptor, Lifecycle, Object, PluginType, Registry, ReleaseFn,
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// 根容器名称
pub const ROOT_NAME: &str = "root";

/// 引擎选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedOptions {
    /// 最大构建深度
    pub max_build_depth: usize,
}

impl Default for NestedOptions {
    fn default() -> Self {
        Self { max_build_depth: 40 }
    }
}

/// 完成配置的实例
struct ConfiguredInstance {
    id: usize,
    plugin_type: PluginType,
    kind: InstanceKind,
    lifecycle: Lifecycle,
    interceptors: Vec<Interceptor>,
    release: Option<ReleaseFn>,
}

struct PluginFamily {
    instances: Vec<Arc<ConfiguredInstance>>,
    default: usize,
}

/// 编译后的插件图
struct PluginGraph {
    families: HashMap<PluginType, PluginFamily>,
    options: NestedOptions,
    instance_count: usize,
}

impl PluginGraph {
    fn compile(registry: Registry, options: NestedOptions) -> NestedResult<Self> {
        let mut families = HashMap::new();
        let mut next_id = 0usize;

        for family in registry.families {
            let plugin_type = family.plugin_type;
            let mut names = HashSet::new();
            let mut instances = Vec::with_capacity(family.instances.len());

            for expression in family.instances {
                if !names.insert(expression.name.clone()) {
                    return Err(NestedContainerError::DuplicateInstanceName {
                        plugin_type: plugin_type.name().to_string(),
                        instance: expression.name,
                    });
                }
                if matches!(expression.kind, InstanceKind::Object(_))
                    && !expression.interceptors.is_empty()
                {
                    return Err(NestedContainerError::InterceptionNotSupported {
                        plugin_type: plugin_type.name().to_string(),
                        instance: expression.name,
                    });
                }

                instances.push((
                    expression.name,
                    Arc::new(ConfiguredInstance {
                        id: next_id,
                        plugin_type,
                        kind: expression.kind,
                        lifecycle: expression.lifecycle,
                        interceptors: expression.interceptors,
                        release: expression.release,
                    }),
                ));
                next_id += 1;
            }

            let default = match &family.default {
                Some(name) => instances
                    .iter()
                    .position(|(candidate, _)| candidate == name)
                    .ok_or_else(|| NestedContainerError::UnknownDefault {
                        plugin_type: plugin_type.name().to_string(),
                        instance: name.clone(),
                    })?,
                None => 0,
            };

            if !instances.is_empty() {
                families.insert(
                    plugin_type,
                    PluginFamily {
                        instances: instances.into_iter().map(|(_, instance)| instance).collect(),
                        default,
                    },
                );
            }
        }

        Ok(Self {
            families,
            options,
            instance_count: next_id,
        })
    }
}

struct ContainerState {
    name: String,
    graph: Arc<PluginGraph>,
    /// 嵌套容器持有根容器
    root: Option<Arc<ContainerState>>,
    cache: Mutex<HashMap<usize, Arc<OnceCell<Object>>>>,
    tracked: Mutex<Vec<(Object, ReleaseFn)>>,
    disposed: AtomicBool,
}

impl ContainerState {
    fn ensure_active(&self) -> NestedResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(NestedContainerError::ContainerDisposed {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    fn root(self: &Arc<Self>) -> Arc<Self> {
        self.root.clone().unwrap_or_else(|| self.clone())
    }

    fn cell(&self, id: usize) -> Arc<OnceCell<Object>> {
        self.cache.lock().entry(id).or_default().clone()
    }
}

/// 原生容器
///
/// 根容器可以创建嵌套容器；嵌套容器不能再嵌套。
#[derive(Clone)]
pub struct NativeContainer {
    state: Arc<ContainerState>,
}

impl NativeContainer {
    /// 由注册表创建根容器
    pub fn new(registry: Registry, options: NestedOptions) -> NestedResult<Self> {
        let graph = PluginGraph::compile(registry, options)?;
        debug!(
            families = graph.families.len(),
            instances = graph.instance_count,
            "创建嵌套容器引擎根容器"
        );

        Ok(Self {
            state: Arc::new(ContainerState {
                name: ROOT_NAME.to_string(),
                graph: Arc::new(graph),
                root: None,
                cache: Mutex::new(HashMap::new()),
                tracked: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// 容器名称
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// 是否为嵌套容器
    pub fn is_nested(&self) -> bool {
        self.state.root.is_some()
    }

    /// 是否已释放
    pub fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::SeqCst)
    }

    /// 实例总数
    pub fn instance_count(&self) -> usize {
        self.state.graph.instance_count
    }

    /// 创建嵌套容器
    pub fn get_nested_container(&self, name: impl Into<String>) -> NestedResult<Self> {
        let name = name.into();
        self.state.ensure_active()?;
        if self.is_nested() {
            return Err(NestedContainerError::NestingNotSupported { name });
        }

        debug!(name = %name, "创建嵌套容器");
        Ok(Self {
            state: Arc::new(ContainerState {
                name,
                graph: self.state.graph.clone(),
                root: Some(self.state.clone()),
                cache: Mutex::new(HashMap::new()),
                tracked: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// 获取默认实例
    pub fn get_instance(&self, plugin_type: PluginType) -> NestedResult<Object> {
        BuildSession::new(self.state.clone()).get_instance(plugin_type)
    }

    /// 按添加顺序惰性获取全部实例
    pub fn get_all_instances(&self, plugin_type: PluginType) -> NestedResult<AllInstances> {
        BuildSession::new(self.state.clone()).get_all_instances(plugin_type)
    }

    /// 插件类型是否有实例
    pub fn has_plugin(&self, plugin_type: PluginType) -> bool {
        self.state.graph.families.contains_key(&plugin_type)
    }

    /// 释放容器跟踪的对象，按创建的逆序
    pub fn dispose(&self) {
        if self.state.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let tracked = std::mem::take(&mut *self.state.tracked.lock());
        debug!(name = %self.state.name, objects = tracked.len(), "释放容器");
        for (object, release) in tracked.into_iter().rev() {
            release(&object);
        }
        self.state.cache.lock().clear();
    }
}

impl std::fmt::Debug for NativeContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeContainer")
            .field("name", &self.state.name)
            .field("nested", &self.is_nested())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// 构建会话
///
/// 一次顶层获取对应一个会话；会话记录构建栈，并缓存 `Transient` 生命周期的对象。
#[derive(Clone)]
pub struct BuildSession {
    container: Arc<ContainerState>,
    stack: Vec<PluginType>,
    session_cache: Arc<Mutex<HashMap<usize, Object>>>,
}

impl BuildSession {
    fn new(container: Arc<ContainerState>) -> Self {
        Self {
            container,
            stack: Vec::new(),
            session_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 当前容器名称
    pub fn container_name(&self) -> &str {
        &self.container.name
    }

    /// 当前容器是否为根容器
    pub fn is_root_container(&self) -> bool {
        self.container.root.is_none()
    }

    /// 获取默认实例
    pub fn get_instance(&self, plugin_type: PluginType) -> NestedResult<Object> {
        self.container.ensure_active()?;
        let instance = self
            .container
            .graph
            .families
            .get(&plugin_type)
            .and_then(|family| family.instances.get(family.default))
            .cloned()
            .ok_or_else(|| NestedContainerError::MissingDefault {
                plugin_type: plugin_type.name().to_string(),
            })?;
        self.build(&instance)
    }

    /// 按添加顺序惰性获取全部实例
    pub fn get_all_instances(&self, plugin_type: PluginType) -> NestedResult<AllInstances> {
        self.container.ensure_active()?;
        let instances = self
            .container
            .graph
            .families
            .get(&plugin_type)
            .map(|family| family.instances.clone())
            .unwrap_or_default();
        Ok(AllInstances {
            session: self.clone(),
            instances: instances.into_iter(),
        })
    }

    /// 插件类型是否有实例
    pub fn has_plugin(&self, plugin_type: PluginType) -> bool {
        self.container.graph.families.contains_key(&plugin_type)
    }

    fn push(&self, plugin_type: PluginType) -> NestedResult<Self> {
        if self.stack.contains(&plugin_type) {
            let chain = self
                .stack
                .iter()
                .chain(std::iter::once(&plugin_type))
                .map(PluginType::short_name)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(NestedContainerError::BidirectionalDependency { chain });
        }
        let max_depth = self.container.graph.options.max_build_depth;
        if self.stack.len() >= max_depth {
            return Err(NestedContainerError::BuildDepthExceeded {
                plugin_type: plugin_type.name().to_string(),
                max_depth,
            });
        }

        let mut session = self.clone();
        session.stack.push(plugin_type);
        Ok(session)
    }

    fn build(&self, instance: &ConfiguredInstance) -> NestedResult<Object> {
        self.container.ensure_active()?;
        if let InstanceKind::Object(object) = &instance.kind {
            return Ok(object.clone());
        }

        let session = self.push(instance.plugin_type)?;
        trace!(
            plugin_type = instance.plugin_type.name(),
            lifecycle = ?instance.lifecycle,
            container = %self.container.name,
            "构建实例"
        );

        match instance.lifecycle {
            Lifecycle::AlwaysUnique => session.create(instance),
            Lifecycle::Transient => {
                if let Some(object) = self.session_cache.lock().get(&instance.id).cloned() {
                    return Ok(object);
                }
                let object = session.create(instance)?;
                self.session_cache.lock().insert(instance.id, object.clone());
                Ok(object)
            }
            Lifecycle::ContainerScoped => {
                let cell = self.container.cell(instance.id);
                cell.get_or_try_init(|| session.create(instance)).cloned()
            }
            Lifecycle::Singleton => {
                let root = self.container.root();
                root.ensure_active()?;
                let session = Self {
                    container: root.clone(),
                    ..session
                };
                let cell = root.cell(instance.id);
                cell.get_or_try_init(|| session.create(instance)).cloned()
            }
        }
    }

    fn create(&self, instance: &ConfiguredInstance) -> NestedResult<Object> {
        let object = match &instance.kind {
            InstanceKind::Lambda(lambda) => lambda(self)?,
            InstanceKind::Object(object) => object.clone(),
        };
        let object = instance
            .interceptors
            .iter()
            .try_fold(object, |object, interceptor| interceptor(self, object))?;

        if let Some(release) = &instance.release {
            self.container
                .tracked
                .lock()
                .push((object.clone(), release.clone()));
        }
        Ok(object)
    }
}

impl std::fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSession")
            .field("container", &self.container.name)
            .field("stack", &self.stack)
            .finish()
    }
}

/// 惰性的全部实例
pub struct AllInstances {
    session: BuildSession,
    instances: std::vec::IntoIter<Arc<ConfiguredInstance>>,
}

impl Iterator for AllInstances {
    type Item = NestedResult<Object>;

    fn next(&mut self) -> Option<Self::Item> {
        let instance = self.instances.next()?;
        Some(self.session.build(&instance))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.instances.size_hint()
    }
}

impl ExactSizeIterator for AllInstances {}
