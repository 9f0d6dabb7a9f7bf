//! 组合层错误类型

use infrastructure_common::DiError;
use thiserror::Error;

/// 组合层错误
#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("配置加载失败: {source}")]
    Config {
        #[from]
        source: config::ConfigError,
    },

    #[error("依赖注入失败: {source}")]
    Di {
        #[from]
        source: DiError,
    },

    #[error("未知的引擎: {name}")]
    UnknownEngine { name: String },

    #[error("日志初始化失败: {message}")]
    Logging { message: String },
}

/// 结果类型别名
pub type CompositionResult<T> = Result<T, CompositionError>;
