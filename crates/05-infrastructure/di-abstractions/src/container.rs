//! 依赖注入容器抽象接口
//!
//! 提供依赖注入容器、容器作用域以及引擎适配器的核心抽象

use crate::registry::ComponentRegistry;
use crate::resolver::Resolver;
use infrastructure_common::{DiError, ResolutionError, ScopeInfo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 容器作用域 trait
///
/// 作用域拥有自己的作用域实例缓存和释放边界，单例始终委托给根容器。
/// 最后一个句柄被丢弃时作用域自动释放。
///
/// 可释放的瞬时实例由解析它的作用域跟踪，根容器也不例外：从根容器解析的
/// 瞬时实例会一直保留到根容器释放，即使调用方早已丢弃了句柄。需要频繁
/// 创建可释放瞬时组件时，应在短生命周期的子作用域中解析。
pub trait ContainerScope: Resolver {
    /// 创建子作用域
    fn create_scope(&self) -> Result<Arc<dyn ContainerScope>, ResolutionError>;

    /// 释放作用域
    ///
    /// 先按创建的逆序释放本作用域创建的实例，再级联释放仍打开的子作用域。
    /// 重复调用无效果。
    fn dispose(&self);

    /// 是否已释放
    fn is_disposed(&self) -> bool;

    /// 作用域信息
    fn info(&self) -> ScopeInfo;

    /// 作为解析器使用
    fn as_resolver(&self) -> &dyn Resolver;
}

/// 依赖注入容器 trait
///
/// 由冻结的注册表构建一次，本身即深度为 0 的根作用域。
pub trait Container: ContainerScope {
    /// 后端引擎名称
    fn engine(&self) -> &str;

    /// 容器统计信息
    fn stats(&self) -> ContainerStats;
}

/// 容器适配器 trait
///
/// 把与引擎无关的注册表转换为具体引擎的原生注册，并把原生容器包装为 [`Container`]。
pub trait ContainerAdapter: Send + Sync {
    /// 引擎名称
    fn name(&self) -> &str;

    /// 构建容器
    fn build(
        &self,
        registry: ComponentRegistry,
        options: &ContainerOptions,
    ) -> Result<Arc<dyn Container>, DiError>;
}

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// 构建时验证声明的依赖和静态循环
    pub validate_on_build: bool,
    /// 禁止以根容器为上下文解析作用域组件
    pub validate_scopes: bool,
    /// 最大解析深度
    pub max_resolution_depth: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            validate_on_build: true,
            validate_scopes: false,
            max_resolution_depth: 100,
        }
    }
}

impl ContainerOptions {
    /// 开发环境配置，启用全部验证
    pub fn development() -> Self {
        Self {
            validate_scopes: true,
            ..Self::default()
        }
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// 注册数量
    pub registrations: usize,
    /// 契约数量
    pub contracts: usize,
    /// 仍打开的作用域数量，不含根容器
    pub open_scopes: usize,
}
