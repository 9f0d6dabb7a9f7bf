//! 组件生命周期管理

use serde::{Deserialize, Serialize};
use std::fmt;

/// 组件生命周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// 单例模式 - 整个容器生命周期内只创建一个实例
    Singleton,
    /// 作用域模式 - 在同一作用域内共享实例
    Scoped,
    /// 瞬时模式 - 每次请求都创建新实例
    Transient,
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::Transient
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => write!(f, "Singleton"),
            Self::Scoped => write!(f, "Scoped"),
            Self::Transient => write!(f, "Transient"),
        }
    }
}

/// 可释放组件 trait
///
/// 由容器创建并跟踪的实例在所属作用域结束时按创建的逆序释放。
pub trait Disposable: Send + Sync {
    /// 释放资源
    fn dispose(&self);
}

/// 作用域信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeInfo {
    /// 作用域ID
    pub id: uuid::Uuid,
    /// 嵌套深度，根容器为 0
    pub depth: usize,
    /// 父作用域ID
    pub parent: Option<uuid::Uuid>,
}

impl ScopeInfo {
    /// 创建根作用域信息
    pub fn root() -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            depth: 0,
            parent: None,
        }
    }

    /// 创建子作用域信息
    pub fn child(&self) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            depth: self.depth + 1,
            parent: Some(self.id),
        }
    }

    /// 是否为根作用域
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }
}
