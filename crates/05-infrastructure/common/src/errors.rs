//! 错误类型定义
//!
//! 依赖注入各阶段的错误分类：注册、构建、解析以及引擎适配。
//! 所有错误都同步返回给调用方，核心层不吞掉也不重试任何错误。

use crate::lifecycle::Lifetime;
use thiserror::Error;

/// 注册阶段错误
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("装饰失败: 契约 {contract} 没有可装饰的既有注册")]
    NoExistingRegistration { contract: String },

    #[error("生命周期组合无效: {contract} 使用预构建实例时只能为 Singleton, 实际为 {lifetime}")]
    InvalidLifetime { contract: String, lifetime: Lifetime },

    #[error("扩展模块 {facility} 注册失败: {source}")]
    FacilityFailed {
        facility: String,
        #[source]
        source: Box<RegistrationError>,
    },
}

/// 容器构建错误
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("依赖缺失: 组件 {component} 依赖的 {dependency} 未注册")]
    MissingDependency {
        component: String,
        dependency: String,
    },

    #[error("构建时检测到循环依赖: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("引擎 {engine} 拒绝了注册转换: {message}")]
    Rejected { engine: String, message: String },
}

/// 组件解析错误
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("组件未注册: {contract}")]
    NotRegistered { contract: String },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("作用域已释放: {scope_id}")]
    ScopeDisposed { scope_id: String },

    #[error("解析深度超过上限 {max_depth}: {contract}")]
    DepthExceeded { contract: String, max_depth: usize },

    #[error("不能从根容器解析作用域组件: {contract}")]
    ScopedFromRoot { contract: String },

    #[error("类型转换失败: 期望 {expected}")]
    TypeMismatch { expected: String },

    #[error("组件创建失败: {type_name}, 原因: {source}")]
    ActivationFailed {
        type_name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ResolutionError {
    /// 创建未注册错误
    pub fn not_registered(contract: impl Into<String>) -> Self {
        Self::NotRegistered {
            contract: contract.into(),
        }
    }

    /// 创建组件创建失败错误
    pub fn activation_failed(
        type_name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ActivationFailed {
            type_name: type_name.into(),
            source: source.into(),
        }
    }

    /// 是否为循环依赖错误
    pub fn is_circular_dependency(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }
}

/// 引擎适配错误
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("引擎 {engine} 不支持的注册形态: {contract}, 原因: {reason}")]
    UnsupportedShape {
        engine: String,
        contract: String,
        reason: String,
    },
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DiError {
    #[error("注册错误: {source}")]
    Registration {
        #[from]
        source: RegistrationError,
    },

    #[error("构建错误: {source}")]
    Build {
        #[from]
        source: BuildError,
    },

    #[error("解析错误: {source}")]
    Resolution {
        #[from]
        source: ResolutionError,
    },

    #[error("适配错误: {source}")]
    Adapter {
        #[from]
        source: AdapterError,
    },
}

/// 结果类型别名
pub type RegistrationResult<T> = Result<T, RegistrationError>;
pub type ResolutionResult<T> = Result<T, ResolutionError>;
pub type DiResult<T> = Result<T, DiError>;
