use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::Notify;

use super::{Robot, RobotInner, RobotState};
use crate::application::errors::BotError;
use crate::application::messaging::EventBus;
use crate::application::services::HelpCatalog;
use crate::domain::traits::{Adapter, Brain, Router};
use crate::infrastructure::config::Config;
use crate::infrastructure::logging::LogFeed;
use crate::infrastructure::router::NullRouter;
use crate::scripts::ScriptStore;

/// Builder for a configured [`Robot`].
///
/// ```rust,ignore
/// let robot = Robot::builder()
///     .config(config)
///     .adapter(Arc::new(ConsoleAdapter::new()))
///     .brain(Arc::new(MemoryBrain::new()))
///     .scripts(Arc::new(ScriptRegistry::with_builtins()))
///     .build()
///     .await?;
/// robot.run().await?;
/// ```
pub struct RobotBuilder {
    config: Config,
    name: Option<String>,
    alias: Option<String>,
    adapters: Vec<(String, Arc<dyn Adapter>)>,
    brain: Option<Arc<dyn Brain>>,
    router: Option<Arc<dyn Router>>,
    scripts: Option<Arc<dyn ScriptStore>>,
    log_feed: Option<LogFeed>,
}

impl RobotBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            name: None,
            alias: None,
            adapters: Vec::new(),
            brain: None,
            router: None,
            scripts: None,
            log_feed: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Overrides `bot.name` from the configuration
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Adds an adapter, keyed by its id
    pub fn adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.adapters.push((adapter.id().to_string(), adapter));
        self
    }

    pub fn brain(mut self, brain: Arc<dyn Brain>) -> Self {
        self.brain = Some(brain);
        self
    }

    pub fn router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn scripts(mut self, scripts: Arc<dyn ScriptStore>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    pub fn log_feed(mut self, feed: LogFeed) -> Self {
        self.log_feed = Some(feed);
        self
    }

    /// Wire the collaborators to a new robot.
    ///
    /// Fails when the brain cannot be initialized or the router port
    /// variable is not a valid port.
    pub async fn build(self) -> Result<Robot, BotError> {
        let name = self.name.unwrap_or_else(|| self.config.bot.name.clone());
        let alias = self.alias.or_else(|| self.config.bot.alias.clone());
        let auto_load = self.config.scripts.auto_load;
        let watch = self.config.scripts.watch;
        let router = self
            .router
            .unwrap_or_else(|| Arc::new(NullRouter::new()) as Arc<dyn Router>);

        let robot = Robot {
            inner: Arc::new(RobotInner {
                name,
                alias,
                config: Some(self.config),
                adapters: self.adapters,
                listeners: RwLock::new(Vec::new()),
                brain: self.brain,
                router,
                scripts: self.scripts,
                events: EventBus::new(),
                help: HelpCatalog::new(),
                current_script: RwLock::new(None),
                cleanups: Mutex::new(Vec::new()),
                watch: Mutex::new(None),
                log_feed: self.log_feed,
                log_forwarder: Mutex::new(None),
                auto_load_scripts: AtomicBool::new(auto_load),
                watch_scripts: AtomicBool::new(watch),
                ready: AtomicBool::new(false),
                state: RwLock::new(RobotState::Configured),
                reset: Arc::new(Notify::new()),
            }),
        };

        for (key, adapter) in &robot.inner.adapters {
            tracing::debug!(adapter = %key, "Initializing adapter");
            adapter.initialize(&robot);
        }

        robot.inner.router.initialize(&robot);
        robot.inner.router.configure(robot.router_port()?);

        if let Some(brain) = &robot.inner.brain {
            brain
                .initialize(&robot)
                .await
                .map_err(|e| BotError::BrainUnavailable(e.to_string()))?;
        }

        tracing::info!(
            name = %robot.name(),
            adapters = robot.inner.adapters.len(),
            brain = robot.inner.brain.is_some(),
            "Robot configured"
        );
        Ok(robot)
    }
}

impl Default for RobotBuilder {
    fn default() -> Self {
        Self::new()
    }
}
