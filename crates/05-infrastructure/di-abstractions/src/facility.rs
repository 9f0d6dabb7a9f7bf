//! 扩展模块接口
//!
//! 独立编译的模块通过 [`Facility`] 在容器构建前向共享注册表追加自己的注册

use crate::registry::ComponentRegistry;
use infrastructure_common::RegistrationError;

/// 扩展模块 trait
pub trait Facility: Send + Sync {
    /// 模块名称
    fn name(&self) -> &str;

    /// 向注册表追加注册
    fn configure_services(&self, registry: &mut ComponentRegistry) -> Result<(), RegistrationError>;
}

/// 由闭包构成的扩展模块
pub struct FnFacility<F> {
    name: String,
    configure: F,
}

impl<F> FnFacility<F>
where
    F: Fn(&mut ComponentRegistry) -> Result<(), RegistrationError> + Send + Sync,
{
    /// 创建新的闭包扩展模块
    pub fn new(name: impl Into<String>, configure: F) -> Self {
        Self {
            name: name.into(),
            configure,
        }
    }
}

impl<F> Facility for FnFacility<F>
where
    F: Fn(&mut ComponentRegistry) -> Result<(), RegistrationError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn configure_services(&self, registry: &mut ComponentRegistry) -> Result<(), RegistrationError> {
        (self.configure)(registry)
    }
}

impl<F> std::fmt::Debug for FnFacility<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFacility").field("name", &self.name).finish()
    }
}
