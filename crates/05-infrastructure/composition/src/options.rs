//! 组合配置
//!
//! 默认值之上依次叠加可选的 TOML 配置文件和带前缀的环境变量。

use crate::error::CompositionError;
use config::{Config, Environment, File, FileFormat};
use di_abstractions::{ContainerAdapter, ContainerOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// 默认环境变量前缀
pub const DEFAULT_ENV_PREFIX: &str = "DI";

/// 后端引擎类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// 内置引擎
    #[default]
    Builtin,
    /// 生命周期作用域引擎
    LifetimeScope,
    /// 嵌套容器引擎
    Nested,
}

impl EngineKind {
    /// 全部引擎
    pub const ALL: [EngineKind; 3] = [Self::Builtin, Self::LifetimeScope, Self::Nested];

    /// 引擎名称
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Builtin => di_impl::ENGINE_NAME,
            Self::LifetimeScope => di_lifetime_scope::ENGINE_NAME,
            Self::Nested => di_nested::ENGINE_NAME,
        }
    }

    /// 对应的适配器
    pub fn adapter(self) -> Arc<dyn ContainerAdapter> {
        match self {
            Self::Builtin => Arc::new(di_impl::BuiltinAdapter),
            Self::LifetimeScope => Arc::new(di_lifetime_scope::LifetimeScopeAdapter),
            Self::Nested => Arc::new(di_nested::NestedAdapter),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = CompositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CompositionError::UnknownEngine {
                name: s.to_string(),
            })
    }
}

/// 组合配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionOptions {
    /// 后端引擎
    pub engine: EngineKind,
    /// 容器配置
    pub container: ContainerOptions,
}

impl CompositionOptions {
    /// 加载配置
    ///
    /// 文件给出时必须存在；环境变量以 `{prefix}__` 开头，层级之间用 `__` 分隔，
    /// 例如 `DI__CONTAINER__VALIDATE_SCOPES=true`。
    pub fn load(path: Option<&Path>, env_prefix: &str) -> Result<Self, CompositionError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "加载配置文件");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let options: Self = settings.try_deserialize()?;
        debug!(engine = %options.engine, container = ?options.container, "配置加载完成");
        Ok(options)
    }
}
