//! 容器组合构建器

use crate::error::CompositionError;
use crate::options::{CompositionOptions, EngineKind};
use di_abstractions::{
    ComponentRegistry, Container, ContainerAdapter, ContainerOptions, Facility,
};
use infrastructure_common::{DiError, RegistrationError};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// 容器组合构建器
///
/// 使用建造者模式组合配置、日志、扩展模块和后端引擎，最终构建容器
pub struct CompositionBuilder {
    /// 组合配置
    options: CompositionOptions,
    /// 日志配置，设置后才初始化日志
    logging_config: Option<LoggingConfig>,
    /// 扩展模块，按添加顺序应用
    facilities: Vec<Box<dyn Facility>>,
    /// 组件注册表
    registry: ComponentRegistry,
    /// 自定义适配器，优先于配置中的引擎
    adapter: Option<Arc<dyn ContainerAdapter>>,
}

impl CompositionBuilder {
    /// 创建新的组合构建器
    pub fn new() -> Self {
        Self {
            options: CompositionOptions::default(),
            logging_config: None,
            facilities: Vec::new(),
            registry: ComponentRegistry::new(),
            adapter: None,
        }
    }

    /// 使用给定配置
    pub fn with_options(mut self, options: CompositionOptions) -> Self {
        self.options = options;
        self
    }

    /// 从配置文件和环境变量加载配置
    pub fn load_options<P: AsRef<Path>>(
        mut self,
        path: Option<P>,
        env_prefix: &str,
    ) -> Result<Self, CompositionError> {
        self.options = CompositionOptions::load(path.as_ref().map(AsRef::as_ref), env_prefix)?;
        Ok(self)
    }

    /// 选择后端引擎
    pub fn engine(mut self, engine: EngineKind) -> Self {
        self.options.engine = engine;
        self
    }

    /// 设置容器配置
    pub fn container_options(mut self, options: ContainerOptions) -> Self {
        self.options.container = options;
        self
    }

    /// 使用自定义适配器
    pub fn with_adapter(mut self, adapter: Arc<dyn ContainerAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    /// 添加扩展模块
    pub fn add_facility<F: Facility + 'static>(mut self, facility: F) -> Self {
        debug!(facility = facility.name(), "添加扩展模块");
        self.facilities.push(Box::new(facility));
        self
    }

    /// 直接向注册表添加注册
    pub fn configure<F>(mut self, configure: F) -> Result<Self, CompositionError>
    where
        F: FnOnce(&mut ComponentRegistry) -> Result<(), RegistrationError>,
    {
        configure(&mut self.registry).map_err(DiError::from)?;
        Ok(self)
    }

    /// 当前配置
    pub fn options(&self) -> &CompositionOptions {
        &self.options
    }

    /// 构建容器
    pub fn build(self) -> Result<Arc<dyn Container>, CompositionError> {
        // 只有在明确配置了日志时才初始化日志
        if let Some(config) = &self.logging_config {
            config.initialize()?;
        }

        let Self {
            options,
            facilities,
            mut registry,
            adapter,
            ..
        } = self;

        for facility in &facilities {
            registry
                .add_facility(facility.as_ref())
                .map_err(DiError::from)?;
        }

        let adapter = adapter.unwrap_or_else(|| options.engine.adapter());
        info!(
            engine = adapter.name(),
            registrations = registry.len(),
            facilities = facilities.len(),
            "开始构建容器"
        );
        let container = adapter.build(registry, &options.container)?;
        Ok(container)
    }
}

impl Default for CompositionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompositionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionBuilder")
            .field("options", &self.options)
            .field("logging_config", &self.logging_config)
            .field(
                "facilities",
                &self.facilities.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .field("registrations", &self.registry.len())
            .field("adapter", &self.adapter.as_ref().map(|a| a.name()))
            .finish()
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 过滤指令，设置后优先于日志级别
    pub filter: Option<String>,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            filter: None,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            filter: None,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            filter: None,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 设置过滤指令
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// 初始化日志系统
    ///
    /// 全局订阅者已存在时保留原有订阅者；只有过滤指令无效才返回错误。
    pub fn initialize(&self) -> Result<(), CompositionError> {
        let filter = match &self.filter {
            Some(directives) => EnvFilter::try_new(directives).map_err(|e| {
                CompositionError::Logging {
                    message: e.to_string(),
                }
            })?,
            None => EnvFilter::new(self.level.to_string()),
        };

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_file(self.show_file)
            .with_line_number(self.show_line_number);

        let result = if self.json_format {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        };

        match result {
            Ok(()) => info!("日志系统初始化完成"),
            Err(e) => debug!(error = %e, "日志系统已初始化，沿用现有订阅者"),
        }
        Ok(())
    }
}
