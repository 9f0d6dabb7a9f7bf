//! 生命周期作用域引擎的原生错误

use thiserror::Error;

/// 原生错误类型
#[derive(Error, Debug)]
pub enum LifetimeScopeError {
    #[error("服务未注册: {service}")]
    ComponentNotRegistered { service: String },

    #[error("检测到循环依赖: {chain}")]
    CircularDependency { chain: String },

    #[error("解析深度超过上限 {max_depth}: {service}")]
    MaxDepthExceeded { service: String, max_depth: usize },

    #[error("生命周期作用域已释放: {tag}")]
    ScopeDisposed { tag: String },

    #[error("组件激活失败: {service}, 原因: {source}")]
    Activation {
        service: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("注册无效: {reason}")]
    InvalidRegistration { reason: String },
}

impl LifetimeScopeError {
    /// 创建激活失败错误
    pub fn activation(
        service: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Activation {
            service: service.into(),
            source: source.into(),
        }
    }
}

/// 原生结果类型
pub type LifetimeScopeResult<T> = Result<T, LifetimeScopeError>;
