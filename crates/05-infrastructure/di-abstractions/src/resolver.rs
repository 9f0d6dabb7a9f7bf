//! 组件解析器抽象接口
//!
//! 提供依赖解析和组件实例化的能力

use crate::factory::{downcast, Instance};
use infrastructure_common::{ResolutionError, TypeInfo};
use std::marker::PhantomData;
use std::sync::Arc;

/// 组件解析器 trait
///
/// 对象安全的解析入口。工厂函数收到的就是当前解析上下文（根容器或某个作用域）
/// 对应的解析器，因此工厂内部的解析与外层遵循同一套生命周期规则。
pub trait Resolver: Send + Sync {
    /// 解析契约的单个实例，多个注册时最后注册者优先
    fn resolve_key(&self, contract: &TypeInfo) -> Result<Instance, ResolutionError>;

    /// 按注册顺序惰性解析契约的全部实例
    fn resolve_all_keys(&self, contract: &TypeInfo) -> Result<Instances<'_>, ResolutionError>;

    /// 检查契约是否已注册
    fn is_registered(&self, contract: &TypeInfo) -> bool;

    /// 解析契约的单个实例，未注册时返回 `None`
    fn try_resolve_key(&self, contract: &TypeInfo) -> Result<Option<Instance>, ResolutionError> {
        if !self.is_registered(contract) {
            return Ok(None);
        }
        self.resolve_key(contract).map(Some)
    }
}

/// 类型化的解析扩展
pub trait ResolverExt: Resolver {
    /// 解析指定契约
    fn resolve<C>(&self) -> Result<Arc<C>, ResolutionError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let instance = self.resolve_key(&TypeInfo::of::<C>())?;
        downcast::<C>(&instance)
    }

    /// 尝试解析指定契约
    fn try_resolve<C>(&self) -> Result<Option<Arc<C>>, ResolutionError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        match self.try_resolve_key(&TypeInfo::of::<C>())? {
            Some(instance) => downcast::<C>(&instance).map(Some),
            None => Ok(None),
        }
    }

    /// 解析指定契约的全部实现
    fn resolve_all<C>(&self) -> Result<Resolved<'_, C>, ResolutionError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let instances = self.resolve_all_keys(&TypeInfo::of::<C>())?;
        Ok(Resolved::new(instances))
    }

    /// 检查是否可以解析指定契约
    fn can_resolve<C>(&self) -> bool
    where
        C: ?Sized + 'static,
    {
        self.is_registered(&TypeInfo::of::<C>())
    }
}

impl<R: Resolver + ?Sized> ResolverExt for R {}

/// 惰性实例序列
///
/// 每次迭代才创建下一个实例；序列有限且不可重新开始。
pub struct Instances<'a> {
    inner: Box<dyn Iterator<Item = Result<Instance, ResolutionError>> + 'a>,
    remaining: usize,
}

impl<'a> Instances<'a> {
    /// 从精确长度的迭代器创建
    pub fn new<I>(iter: I) -> Self
    where
        I: ExactSizeIterator<Item = Result<Instance, ResolutionError>> + 'a,
    {
        let remaining = iter.len();
        Self {
            inner: Box::new(iter),
            remaining,
        }
    }

    /// 空序列
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }
}

impl Iterator for Instances<'_> {
    type Item = Result<Instance, ResolutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.inner.next();
        if next.is_some() {
            self.remaining -= 1;
        }
        next
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Instances<'_> {}

impl std::fmt::Debug for Instances<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instances")
            .field("remaining", &self.remaining)
            .finish()
    }
}

/// 类型化的惰性实例序列
pub struct Resolved<'a, C: ?Sized> {
    instances: Instances<'a>,
    _contract: PhantomData<fn() -> Arc<C>>,
}

impl<'a, C: ?Sized> Resolved<'a, C> {
    fn new(instances: Instances<'a>) -> Self {
        Self {
            instances,
            _contract: PhantomData,
        }
    }
}

impl<C> Iterator for Resolved<'_, C>
where
    C: ?Sized + Send + Sync + 'static,
{
    type Item = Result<Arc<C>, ResolutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.instances
            .next()
            .map(|result| result.and_then(|instance| downcast::<C>(&instance)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.instances.size_hint()
    }
}

impl<C> ExactSizeIterator for Resolved<'_, C> where C: ?Sized + Send + Sync + 'static {}

/// 解析上下文
///
/// 随每一次内部解析显式传递，记录当前解析链以检测循环依赖。
/// 不使用任何全局或线程局部状态，并发的作用域互不干扰。
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// 当前解析链，用于检测循环依赖
    resolution_chain: Vec<TypeInfo>,
    /// 最大递归深度
    max_depth: usize,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new(max_depth: usize) -> Self {
        Self {
            resolution_chain: Vec::new(),
            max_depth,
        }
    }

    /// 进入下一层解析，返回扩展后的上下文
    pub fn enter(&self, contract: TypeInfo) -> Result<Self, ResolutionError> {
        if self.resolution_chain.contains(&contract) {
            return Err(ResolutionError::CircularDependency {
                dependency_chain: describe_chain(&self.resolution_chain, contract),
            });
        }
        if self.resolution_chain.len() >= self.max_depth {
            return Err(ResolutionError::DepthExceeded {
                contract: contract.name.to_string(),
                max_depth: self.max_depth,
            });
        }

        let mut resolution_chain = Vec::with_capacity(self.resolution_chain.len() + 1);
        resolution_chain.extend_from_slice(&self.resolution_chain);
        resolution_chain.push(contract);
        Ok(Self {
            resolution_chain,
            max_depth: self.max_depth,
        })
    }

    /// 当前解析深度
    pub fn depth(&self) -> usize {
        self.resolution_chain.len()
    }

    /// 当前解析链
    pub fn chain(&self) -> &[TypeInfo] {
        &self.resolution_chain
    }
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self::new(100)
    }
}

/// 把解析链格式化为 `A -> B -> A`
pub fn describe_chain(chain: &[TypeInfo], repeated: TypeInfo) -> String {
    chain
        .iter()
        .chain(std::iter::once(&repeated))
        .map(TypeInfo::short_name)
        .collect::<Vec<_>>()
        .join(" -> ")
}
