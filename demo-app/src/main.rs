//! # 演示应用程序
//!
//! 在选定的引擎上依次演示生命周期、装饰、多实现解析、作用域释放和循环依赖检测

use anyhow::{bail, Context};
use clap::Parser;
use di_abstractions::{
    Component, ComponentRegistry, Container, ContainerScope, FnFacility, Injectable, Resolver,
    ResolverExt,
};
use infrastructure_common::{Disposable, RegistrationError, ResolutionError, TypeInfo};
use infrastructure_composition::{
    CompositionBuilder, EngineKind, LoggingConfig, DEFAULT_ENV_PREFIX,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "demo-app")]
#[command(about = "依赖注入容器演示")]
struct Args {
    /// 配置文件路径 (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 后端引擎，覆盖配置文件: builtin, lifetime-scope, nested
    #[arg(short, long)]
    engine: Option<EngineKind>,

    /// 在所有引擎上依次运行
    #[arg(long)]
    all_engines: bool,

    /// 日志过滤指令
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 使用 JSON 日志
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let logging = LoggingConfig {
        json_format: args.json,
        ..LoggingConfig::default()
    }
    .with_filter(args.log_level.clone());
    logging.initialize()?;

    if args.all_engines {
        if let Some(engine) = args.engine {
            warn!(%engine, "--all-engines 时忽略 --engine");
        }
        for engine in EngineKind::ALL {
            run(&args, Some(engine))?;
        }
    } else {
        run(&args, args.engine)?;
    }

    info!("演示结束");
    Ok(())
}

/// 在一个引擎上运行全部演示
fn run(args: &Args, engine: Option<EngineKind>) -> anyhow::Result<()> {
    let mut builder = CompositionBuilder::new()
        .load_options(args.config.as_ref(), DEFAULT_ENV_PREFIX)
        .context("加载配置失败")?;
    if let Some(engine) = engine {
        builder = builder.engine(engine);
    }
    info!(engine = %builder.options().engine, "构建容器");

    let container = builder
        .add_facility(FnFacility::new("logging", register_logging))
        .add_facility(FnFacility::new("plugins", register_plugins))
        .add_facility(FnFacility::new("sessions", register_sessions))
        .configure(|registry| {
            registry.register(Component::<dyn Greeter>::from_factory(|_| {
                Ok(Arc::new(PlainGreeter) as Arc<dyn Greeter>)
            }))?;
            registry.register(Component::<dyn Greeter>::decorator(|_, inner| {
                Ok(Arc::new(Exclaiming { inner }) as Arc<dyn Greeter>)
            }))?;
            registry.register(Component::<dyn Greeter>::decorator(|_, inner| {
                Ok(Arc::new(Bracketing { inner }) as Arc<dyn Greeter>)
            }))?;
            Ok(())
        })?
        .build()?;

    let stats = container.stats();
    info!(
        engine = container.engine(),
        registrations = stats.registrations,
        contracts = stats.contracts,
        "容器构建完成"
    );

    demonstrate_lifetimes(container.as_ref())?;
    demonstrate_plugins(container.as_ref())?;
    demonstrate_decorators(container.as_ref())?;
    demonstrate_scope_disposal(container.as_ref())?;
    demonstrate_cycle_detection(container.as_ref())?;

    container.dispose();
    Ok(())
}

/// 单例日志被两个瞬时服务共享
fn demonstrate_lifetimes(container: &dyn Container) -> anyhow::Result<()> {
    let first = container.resolve::<dyn Service>()?;
    let second = container.resolve::<dyn Service>()?;

    let distinct = !Arc::ptr_eq(&first, &second);
    let shared_logger = Arc::ptr_eq(&first.logger(), &second.logger());
    info!(distinct, shared_logger, "瞬时服务共享单例日志");
    if !distinct || !shared_logger {
        bail!("生命周期语义不符合预期");
    }
    first.run("first");
    second.run("second");
    Ok(())
}

/// 多实现按注册顺序解析，单值解析取最后注册者
fn demonstrate_plugins(container: &dyn Container) -> anyhow::Result<()> {
    let names = container
        .resolve_all::<dyn Plugin>()?
        .map(|plugin| plugin.map(|p| p.name()))
        .collect::<Result<Vec<_>, _>>()?;
    let preferred = container.resolve::<dyn Plugin>()?.name();
    info!(?names, preferred, "插件解析");
    Ok(())
}

fn demonstrate_decorators(container: &dyn Container) -> anyhow::Result<()> {
    let greeter = container.resolve::<dyn Greeter>()?;
    info!(greeting = %greeter.greet("world"), "装饰器按注册顺序包装");
    Ok(())
}

/// 作用域结束时按创建的逆序释放
fn demonstrate_scope_disposal(container: &dyn Container) -> anyhow::Result<()> {
    let scope = container.create_scope()?;
    let info = scope.info();
    for _ in 0..3 {
        let session = scope.resolve::<Session>()?;
        info!(scope = %info.id, session = session.id, "打开会话");
    }
    let unit = scope.resolve::<UnitOfWork>()?;
    let again = scope.resolve::<UnitOfWork>()?;
    info!(same = Arc::ptr_eq(&unit, &again), "同一作用域内共享工作单元");

    scope.dispose();
    match scope.resolve::<UnitOfWork>() {
        Err(ResolutionError::ScopeDisposed { scope_id }) => {
            info!(%scope_id, "作用域释放后拒绝解析");
        }
        Err(other) => return Err(other.into()),
        Ok(_) => bail!("已释放的作用域仍可解析"),
    }
    Ok(())
}

fn demonstrate_cycle_detection(container: &dyn Container) -> anyhow::Result<()> {
    match container.resolve::<Chicken>() {
        Err(ResolutionError::CircularDependency { dependency_chain }) => {
            info!(%dependency_chain, "检测到循环依赖");
            Ok(())
        }
        Err(other) => Err(other.into()),
        Ok(_) => bail!("循环依赖未被检测到"),
    }
}

/// 日志契约
trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, message: &str) {
        info!(target: "demo_app::console", "{message}");
    }
}

impl Injectable for ConsoleLogger {
    fn inject(_: &dyn Resolver) -> Result<Self, ResolutionError> {
        Ok(ConsoleLogger)
    }
}

/// 服务契约
trait Service: Send + Sync {
    fn logger(&self) -> Arc<dyn Logger>;
    fn run(&self, label: &str);
}

struct DefaultService {
    logger: Arc<dyn Logger>,
}

impl Service for DefaultService {
    fn logger(&self) -> Arc<dyn Logger> {
        self.logger.clone()
    }

    fn run(&self, label: &str) {
        self.logger.log(&format!("服务 {label} 运行"));
    }
}

impl Injectable for DefaultService {
    fn dependencies() -> Vec<TypeInfo> {
        vec![TypeInfo::of::<dyn Logger>()]
    }

    fn inject(resolver: &dyn Resolver) -> Result<Self, ResolutionError> {
        Ok(Self {
            logger: resolver.resolve::<dyn Logger>()?,
        })
    }
}

fn register_logging(registry: &mut ComponentRegistry) -> Result<(), RegistrationError> {
    registry
        .register(
            Component::<dyn Logger>::implemented_by::<ConsoleLogger, _>(|c| c as Arc<dyn Logger>)
                .singleton(),
        )?
        .register(
            Component::<dyn Service>::implemented_by::<DefaultService, _>(|s| {
                s as Arc<dyn Service>
            })
            .transient(),
        )?;
    Ok(())
}

/// 插件契约
trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;
}

struct Compression;
struct Caching;
struct Metrics;

impl Plugin for Compression {
    fn name(&self) -> &'static str {
        "compression"
    }
}

impl Plugin for Caching {
    fn name(&self) -> &'static str {
        "caching"
    }
}

impl Plugin for Metrics {
    fn name(&self) -> &'static str {
        "metrics"
    }
}

fn register_plugins(registry: &mut ComponentRegistry) -> Result<(), RegistrationError> {
    registry
        .register(Component::<dyn Plugin>::from_factory(|_| Ok(Arc::new(Compression) as Arc<dyn Plugin>)))?
        .register(Component::<dyn Plugin>::from_factory(|_| Ok(Arc::new(Caching) as Arc<dyn Plugin>)))?
        .register(Component::<dyn Plugin>::from_factory(|_| Ok(Arc::new(Metrics) as Arc<dyn Plugin>)))?;
    Ok(())
}

/// 问候契约
trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct PlainGreeter;

impl Greeter for PlainGreeter {
    fn greet(&self, name: &str) -> String {
        format!("hello {name}")
    }
}

struct Exclaiming {
    inner: Arc<dyn Greeter>,
}

impl Greeter for Exclaiming {
    fn greet(&self, name: &str) -> String {
        format!("{}!", self.inner.greet(name))
    }
}

struct Bracketing {
    inner: Arc<dyn Greeter>,
}

impl Greeter for Bracketing {
    fn greet(&self, name: &str) -> String {
        format!("[{}]", self.inner.greet(name))
    }
}

/// 会话，作用域结束时关闭
struct Session {
    id: usize,
}

impl Disposable for Session {
    fn dispose(&self) {
        info!(session = self.id, "关闭会话");
    }
}

/// 工作单元，每个作用域一个
struct UnitOfWork;

impl Disposable for UnitOfWork {
    fn dispose(&self) {
        info!("提交工作单元");
    }
}

fn register_sessions(registry: &mut ComponentRegistry) -> Result<(), RegistrationError> {
    let opened = Arc::new(AtomicUsize::new(0));
    registry
        .register(
            Component::<Session>::from_factory(move |_| {
                Ok(Arc::new(Session {
                    id: opened.fetch_add(1, Ordering::SeqCst),
                }))
            })
            .transient()
            .disposable(),
        )?
        .register(
            Component::<UnitOfWork>::from_factory(|_| Ok(Arc::new(UnitOfWork)))
                .scoped()
                .disposable(),
        )?
        .register(Component::<Chicken>::from_factory(|resolver| {
            resolver.resolve::<Egg>()?;
            Ok(Arc::new(Chicken))
        }))?
        .register(Component::<Egg>::from_factory(|resolver| {
            resolver.resolve::<Chicken>()?;
            Ok(Arc::new(Egg))
        }))?;
    Ok(())
}

struct Chicken;
struct Egg;

