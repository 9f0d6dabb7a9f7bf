//! 组件注册表
//!
//! 有序、可变的注册集合，是构建容器时唯一的数据来源。注册表与具体引擎无关，
//! 交给适配器构建时按值移交，此后不可再修改。

use crate::facility::Facility;
use crate::registration::{
    ComponentRegistration, ContractSet, RegistrationMode, RegistrationRequest,
};
use crate::factory::Injectable;
use infrastructure_common::{BuildError, Lifetime, RegistrationError, TypeInfo};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// 组件注册表
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    registrations: Vec<ComponentRegistration>,
}

impl ComponentRegistry {
    /// 创建新的组件注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册组件或装饰既有注册
    ///
    /// 按注册方式追加、跳过、替换或装饰。装饰要求契约已有注册。
    pub fn register<R>(&mut self, request: R) -> Result<&mut Self, RegistrationError>
    where
        R: Into<RegistrationRequest>,
    {
        match request.into() {
            RegistrationRequest::Component(registration) => self.add(registration)?,
            RegistrationRequest::Decorate(decoration) => {
                let contract = decoration.contract();
                let mut decorated = 0usize;
                for registration in self
                    .registrations
                    .iter_mut()
                    .filter(|r| r.contract() == contract)
                {
                    registration.push_decorator(decoration.decorator().clone());
                    decorated += 1;
                }

                if decorated == 0 {
                    return Err(RegistrationError::NoExistingRegistration {
                        contract: contract.name.to_string(),
                    });
                }
                debug!(contract = contract.name, decorated, "装饰既有注册");
            }
        }
        Ok(self)
    }

    /// 同一实现类型注册到多个契约
    pub fn register_many<I: Injectable>(
        &mut self,
        contracts: ContractSet<I>,
        lifetime: Lifetime,
    ) -> Result<&mut Self, RegistrationError> {
        for registration in contracts.into_registrations(lifetime) {
            self.add(registration)?;
        }
        Ok(self)
    }

    /// 应用扩展模块
    pub fn add_facility(&mut self, facility: &dyn Facility) -> Result<&mut Self, RegistrationError> {
        let before = self.registrations.len();
        facility
            .configure_services(self)
            .map_err(|e| RegistrationError::FacilityFailed {
                facility: facility.name().to_string(),
                source: Box::new(e),
            })?;
        debug!(
            facility = facility.name(),
            added = self.registrations.len().saturating_sub(before),
            "应用扩展模块"
        );
        Ok(self)
    }

    fn add(&mut self, registration: ComponentRegistration) -> Result<(), RegistrationError> {
        let contract = registration.contract();
        if registration.is_externally_owned() && registration.lifetime() != Lifetime::Singleton {
            return Err(RegistrationError::InvalidLifetime {
                contract: contract.name.to_string(),
                lifetime: registration.lifetime(),
            });
        }

        match registration.mode() {
            RegistrationMode::Add => {}
            RegistrationMode::TryAdd => {
                if self.contains(&contract) {
                    debug!(contract = contract.name, "契约已注册，跳过");
                    return Ok(());
                }
            }
            RegistrationMode::TryAddImplementation => {
                let implementation = registration.implementation();
                if self.registrations.iter().any(|r| {
                    r.contract() == contract && r.implementation() == implementation
                }) {
                    debug!(
                        contract = contract.name,
                        implementation = implementation.name,
                        "实现已注册，跳过"
                    );
                    return Ok(());
                }
            }
            RegistrationMode::Replace => {
                let before = self.registrations.len();
                self.registrations.retain(|r| r.contract() != contract);
                debug!(
                    contract = contract.name,
                    removed = before - self.registrations.len(),
                    "替换既有注册"
                );
            }
        }

        debug!(
            contract = contract.name,
            implementation = registration.implementation().name,
            lifetime = %registration.lifetime(),
            source = registration.source().kind(),
            "注册组件"
        );
        self.registrations.push(registration);
        Ok(())
    }

    /// 按注册顺序获取契约的全部注册
    pub fn get_registrations(&self, contract: &TypeInfo) -> Vec<&ComponentRegistration> {
        self.registrations
            .iter()
            .filter(|r| r.contract() == *contract)
            .collect()
    }

    /// 检查契约是否已注册
    pub fn contains(&self, contract: &TypeInfo) -> bool {
        self.registrations.iter().any(|r| r.contract() == *contract)
    }

    /// 注册数量
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// 遍历全部注册
    pub fn iter(&self) -> impl Iterator<Item = &ComponentRegistration> {
        self.registrations.iter()
    }

    /// 已注册的契约，按首次出现顺序去重
    pub fn contracts(&self) -> Vec<TypeInfo> {
        let mut seen = HashSet::new();
        self.registrations
            .iter()
            .map(ComponentRegistration::contract)
            .filter(|contract| seen.insert(*contract))
            .collect()
    }

    /// 冻结为不可变快照
    pub fn freeze(self) -> Arc<[ComponentRegistration]> {
        self.registrations.into()
    }

    /// 构建期验证：声明的依赖必须已注册且不存在循环
    ///
    /// 只有具体类型来源声明了依赖；工厂来源的依赖推迟到解析时检查。
    pub fn validate(&self) -> Result<(), BuildError> {
        for registration in &self.registrations {
            for dependency in registration.dependencies() {
                if !self.contains(dependency) {
                    return Err(BuildError::MissingDependency {
                        component: registration.implementation().name.to_string(),
                        dependency: dependency.name.to_string(),
                    });
                }
            }
        }

        let graph = DependencyGraph::from_registrations(&self.registrations);
        graph.detect_circular_dependencies()
    }
}

/// 依赖图，节点为契约
#[derive(Debug, Default)]
struct DependencyGraph {
    edges: HashMap<TypeInfo, Vec<TypeInfo>>,
    order: Vec<TypeInfo>,
}

impl DependencyGraph {
    fn from_registrations(registrations: &[ComponentRegistration]) -> Self {
        let mut graph = Self::default();
        for registration in registrations {
            let contract = registration.contract();
            if !graph.edges.contains_key(&contract) {
                graph.order.push(contract);
            }
            graph
                .edges
                .entry(contract)
                .or_default()
                .extend_from_slice(registration.dependencies());
        }
        graph
    }

    fn detect_circular_dependencies(&self) -> Result<(), BuildError> {
        // 使用深度优先搜索检测循环依赖
        let mut visited = HashSet::new();
        let mut visiting = Vec::new();

        for node in &self.order {
            if !visited.contains(node) {
                self.dfs_check(*node, &mut visited, &mut visiting)?;
            }
        }
        Ok(())
    }

    fn dfs_check(
        &self,
        current: TypeInfo,
        visited: &mut HashSet<TypeInfo>,
        visiting: &mut Vec<TypeInfo>,
    ) -> Result<(), BuildError> {
        if visiting.contains(&current) {
            return Err(BuildError::CircularDependency {
                dependency_chain: crate::resolver::describe_chain(visiting, current),
            });
        }
        if visited.contains(&current) {
            return Ok(());
        }

        visiting.push(current);
        if let Some(dependencies) = self.edges.get(&current) {
            for dependency in dependencies {
                self.dfs_check(*dependency, visited, visiting)?;
            }
        }
        visiting.pop();
        visited.insert(current);

        Ok(())
    }
}
