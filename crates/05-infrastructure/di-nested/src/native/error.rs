//! 嵌套容器引擎的原生错误

use thiserror::Error;

/// 原生错误类型
#[derive(Error, Debug)]
pub enum NestedContainerError {
    #[error("插件类型没有默认实例: {plugin_type}")]
    MissingDefault { plugin_type: String },

    #[error("检测到双向依赖: {chain}")]
    BidirectionalDependency { chain: String },

    #[error("构建深度超过上限 {max_depth}: {plugin_type}")]
    BuildDepthExceeded { plugin_type: String, max_depth: usize },

    #[error("容器已释放: {name}")]
    ContainerDisposed { name: String },

    #[error("嵌套容器只能从根容器创建: {name}")]
    NestingNotSupported { name: String },

    #[error("对象实例不支持拦截: {plugin_type} / {instance}")]
    InterceptionNotSupported {
        plugin_type: String,
        instance: String,
    },

    #[error("实例名称重复: {plugin_type} / {instance}")]
    DuplicateInstanceName {
        plugin_type: String,
        instance: String,
    },

    #[error("默认实例不存在: {plugin_type} / {instance}")]
    UnknownDefault {
        plugin_type: String,
        instance: String,
    },

    #[error("实例构建失败: {plugin_type}, 原因: {source}")]
    Build {
        plugin_type: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl NestedContainerError {
    /// 创建实例构建失败错误
    pub fn build(
        plugin_type: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Build {
            plugin_type: plugin_type.into(),
            source: source.into(),
        }
    }
}

/// 原生结果类型
pub type NestedResult<T> = Result<T, NestedContainerError>;
