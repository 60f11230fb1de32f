//! The robot - owns adapters, listeners, brain, router and the event bus,
//! and dispatches inbound messages through the listener chain.

mod builder;
mod lifecycle;

pub use builder::RobotBuilder;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::application::errors::{BotError, ConfigError};
use crate::application::messaging::pattern::{hear_pattern, respond_pattern};
use crate::application::messaging::{
    callback, CatchAllListener, EventBus, Listener, MatchResult, Response, RosterListener,
    TextListener, TopicListener, TypedMatchListener,
};
use crate::application::services::{HelpCatalog, ScriptMetadata, UserRoles};
use crate::domain::entities::{
    CatchAllMessage, EnterMessage, Envelope, LeaveMessage, Message, MessageVariant, TextMessage,
    TopicMessage, User,
};
use crate::domain::traits::{Adapter, Brain, Router};
use crate::infrastructure::config::Config;
use crate::infrastructure::logging::LogFeed;
use crate::scripts::{Script, ScriptStore, Subscription};

/// Identity always present in the admin list
pub const DEFAULT_ADMIN: &str = "ConsoleUser";
pub const ADMIN_VARIABLE: &str = "MMBOT_AUTH_ADMIN";
pub const ROUTER_PORT_VARIABLE: &str = "MMBOT_ROUTER_PORT";
pub const DEFAULT_ROUTER_PORT: u16 = 80;

/// Lifecycle of a robot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotState {
    Unconfigured,
    Configured,
    Running,
    Ready,
    ShuttingDown,
    Stopped,
}

type Cleanup = Box<dyn FnOnce() + Send>;

pub(crate) struct RobotInner {
    name: String,
    alias: Option<String>,
    config: Option<Config>,
    adapters: Vec<(String, Arc<dyn Adapter>)>,
    listeners: RwLock<Vec<Arc<dyn Listener>>>,
    brain: Option<Arc<dyn Brain>>,
    router: Arc<dyn Router>,
    scripts: Option<Arc<dyn ScriptStore>>,
    events: EventBus,
    help: HelpCatalog,
    current_script: RwLock<Option<String>>,
    cleanups: Mutex<Vec<Cleanup>>,
    watch: Mutex<Option<Subscription>>,
    log_feed: Option<LogFeed>,
    log_forwarder: Mutex<Option<JoinHandle<()>>>,
    auto_load_scripts: AtomicBool,
    watch_scripts: AtomicBool,
    ready: AtomicBool,
    state: RwLock<RobotState>,
    reset: Arc<Notify>,
}

/// Cheap, cloneable handle to a robot
#[derive(Clone)]
pub struct Robot {
    inner: Arc<RobotInner>,
}

/// Non-owning handle, for collaborators the robot itself owns
#[derive(Clone)]
pub struct WeakRobot {
    inner: Weak<RobotInner>,
}

impl WeakRobot {
    pub fn upgrade(&self) -> Option<Robot> {
        self.inner.upgrade().map(|inner| Robot { inner })
    }
}

impl Robot {
    /// An unconfigured robot: it accepts registrations but cannot run
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RobotInner {
                name: name.into(),
                alias: None,
                config: None,
                adapters: Vec::new(),
                listeners: RwLock::new(Vec::new()),
                brain: None,
                router: Arc::new(crate::infrastructure::router::NullRouter::new()),
                scripts: None,
                events: EventBus::new(),
                help: HelpCatalog::new(),
                current_script: RwLock::new(None),
                cleanups: Mutex::new(Vec::new()),
                watch: Mutex::new(None),
                log_feed: None,
                log_forwarder: Mutex::new(None),
                auto_load_scripts: AtomicBool::new(true),
                watch_scripts: AtomicBool::new(false),
                ready: AtomicBool::new(false),
                state: RwLock::new(RobotState::Unconfigured),
                reset: Arc::new(Notify::new()),
            }),
        }
    }

    pub fn builder() -> RobotBuilder {
        RobotBuilder::new()
    }

    pub fn downgrade(&self) -> WeakRobot {
        WeakRobot {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn name(&self) -> String {
        self.inner.name.clone()
    }

    pub fn alias(&self) -> Option<String> {
        self.inner.alias.clone()
    }

    pub fn state(&self) -> RobotState {
        *self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: RobotState) {
        *self.inner.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn is_configured(&self) -> bool {
        self.inner.config.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    pub fn set_auto_load_scripts(&self, enabled: bool) {
        self.inner.auto_load_scripts.store(enabled, Ordering::SeqCst);
    }

    pub fn set_watch(&self, enabled: bool) {
        self.inner.watch_scripts.store(enabled, Ordering::SeqCst);
    }

    pub fn brain(&self) -> Option<Arc<dyn Brain>> {
        self.inner.brain.clone()
    }

    pub fn router(&self) -> Arc<dyn Router> {
        Arc::clone(&self.inner.router)
    }

    pub fn adapters(&self) -> Vec<(String, Arc<dyn Adapter>)> {
        self.inner.adapters.clone()
    }

    /// Look an adapter up by key, ignoring case and an optional `Adapter` suffix
    pub fn get_adapter(&self, adapter_id: &str) -> Option<Arc<dyn Adapter>> {
        let suffixed = format!("{}Adapter", adapter_id);
        self.inner
            .adapters
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(adapter_id))
            .or_else(|| {
                self.inner
                    .adapters
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(&suffixed))
            })
            .map(|(_, adapter)| Arc::clone(adapter))
    }

    // --- configuration ---

    /// Configured variable, falling back to the process environment
    pub fn get_config_variable(&self, name: &str) -> Result<Option<String>, BotError> {
        let config = self.inner.config.as_ref().ok_or(BotError::NotConfigured)?;
        Ok(config
            .variables
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok()))
    }

    pub fn admins(&self) -> Result<Vec<String>, BotError> {
        let configured = self.get_config_variable(ADMIN_VARIABLE)?.unwrap_or_default();
        let mut admins: Vec<String> = configured
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !admins.iter().any(|a| a == DEFAULT_ADMIN) {
            admins.push(DEFAULT_ADMIN.to_string());
        }
        Ok(admins)
    }

    pub fn is_admin(&self, user_name: &str) -> bool {
        self.admins()
            .map(|admins| admins.iter().any(|a| a.eq_ignore_ascii_case(user_name)))
            .unwrap_or(false)
    }

    pub(crate) fn router_port(&self) -> Result<u16, BotError> {
        match self.get_config_variable(ROUTER_PORT_VARIABLE)? {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                BotError::from(ConfigError::InvalidValue(format!(
                    "{}={}",
                    ROUTER_PORT_VARIABLE, raw
                )))
            }),
            None => Ok(DEFAULT_ROUTER_PORT),
        }
    }

    // --- users and roles ---

    pub fn roles(&self) -> UserRoles {
        UserRoles::new(self.brain())
    }

    /// Build a user with roles loaded from the brain
    pub async fn get_user(
        &self,
        id: &str,
        name: &str,
        room: &str,
        adapter_id: &str,
    ) -> Result<User, BotError> {
        let roles = self.roles().roles_for(name).await?;
        Ok(User::new(id, name, room, adapter_id).with_roles(roles))
    }

    pub async fn get_user_roles(&self, user_name: &str) -> Result<Vec<String>, BotError> {
        Ok(self.roles().roles_for(user_name).await?)
    }

    pub async fn add_user_to_role(&self, user_name: &str, role: &str) -> Result<(), BotError> {
        self.add_user_to_roles(user_name, &[role]).await
    }

    pub async fn add_user_to_roles(&self, user_name: &str, roles: &[&str]) -> Result<(), BotError> {
        Ok(self.roles().add(user_name, roles).await?)
    }

    pub async fn remove_user_from_role(&self, user_name: &str, role: &str) -> Result<(), BotError> {
        Ok(self.roles().remove(user_name, role).await?)
    }

    pub async fn is_in_role(&self, user_name: &str, role: &str) -> Result<bool, BotError> {
        Ok(self.roles().is_in_role(user_name, role).await?)
    }

    // --- listener registration ---

    fn current_script(&self) -> Option<String> {
        self.inner
            .current_script
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Append a listener to the chain
    pub fn add_listener(&self, listener: Arc<dyn Listener>) {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Match text anywhere the robot can hear it
    pub fn hear<F, Fut>(&self, pattern: &str, f: F) -> Result<(), BotError>
    where
        F: Fn(Response<TextMessage>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let listener = TextListener::new(hear_pattern(pattern), callback(f), self.current_script())?;
        self.add_listener(Arc::new(listener));
        Ok(())
    }

    /// Match text addressed to the robot by name
    pub fn respond<F, Fut>(&self, pattern: &str, f: F) -> Result<(), BotError>
    where
        F: Fn(Response<TextMessage>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let anchored = respond_pattern(&self.name(), pattern);
        let listener = TextListener::new(anchored, callback(f), self.current_script())?;
        self.add_listener(Arc::new(listener));
        Ok(())
    }

    pub fn enter<F, Fut>(&self, f: F)
    where
        F: Fn(Response<EnterMessage>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let listener = RosterListener::<EnterMessage>::new(callback(f), self.current_script());
        self.add_listener(Arc::new(listener));
    }

    pub fn leave<F, Fut>(&self, f: F)
    where
        F: Fn(Response<LeaveMessage>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let listener = RosterListener::<LeaveMessage>::new(callback(f), self.current_script());
        self.add_listener(Arc::new(listener));
    }

    pub fn topic<F, Fut>(&self, f: F)
    where
        F: Fn(Response<TopicMessage>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let listener = TopicListener::new(callback(f), self.current_script());
        self.add_listener(Arc::new(listener));
    }

    pub fn catch_all<F, Fut>(&self, f: F)
    where
        F: Fn(Response<CatchAllMessage>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let listener = CatchAllListener::new(callback(f), self.current_script());
        self.add_listener(Arc::new(listener));
    }

    /// Match messages of type `T` with a custom predicate
    pub fn listen<T, M, F, Fut>(&self, matcher: M, f: F)
    where
        T: MessageVariant,
        M: Fn(&T) -> MatchResult + Send + Sync + 'static,
        F: Fn(Response<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let listener = TypedMatchListener::new(matcher, callback(f), self.current_script());
        self.add_listener(Arc::new(listener));
    }

    /// Remove every text listener whose anchored pattern equals the
    /// `respond` form of `pattern`.
    ///
    /// This compares pattern strings, not regex semantics, and leaves
    /// `hear` listeners with the same raw text in place.
    pub fn remove_listener(&self, pattern: &str) -> usize {
        let anchored = respond_pattern(&self.name(), pattern);
        let mut listeners = self.inner.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|l| l.pattern() != Some(anchored.as_str()));
        before - listeners.len()
    }

    /// Remove every listener registered by `script`
    pub fn remove_script_listeners(&self, script: &str) -> usize {
        let mut listeners = self.inner.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|l| l.source() != Some(script));
        before - listeners.len()
    }

    pub fn listeners_from(&self, script: &str) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| l.source() == Some(script))
            .count()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn snapshot_listeners(&self) -> Vec<Arc<dyn Listener>> {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // --- dispatch ---

    /// Run `message` through a snapshot of the listener chain.
    ///
    /// Ignored unless the robot is ready. Listeners run in registration
    /// order until one of them finishes the message; errors and panics in a
    /// listener are logged and the chain carries on. Returns whether the
    /// message was finished.
    pub async fn receive(&self, message: Message) -> bool {
        if !self.is_ready() {
            tracing::trace!(id = %message.id, "Robot not ready, message dropped");
            return false;
        }

        let message = Arc::new(message);
        let listeners = self.snapshot_listeners();
        tracing::debug!(
            id = %message.id,
            kind = message.kind.as_str(),
            user = %message.user,
            listeners = listeners.len(),
            "Receiving message"
        );

        for listener in listeners {
            let outcome = AssertUnwindSafe(listener.try_handle(self, &message))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    tracing::error!(error = %e, script = ?listener.source(), "Error receiving message");
                }
                Err(panic) => {
                    tracing::error!(
                        panic = panic_message(&*panic),
                        script = ?listener.source(),
                        "Listener panicked while receiving message"
                    );
                }
            }

            if message.is_done() {
                break;
            }
        }

        message.is_done()
    }

    // --- outbound ---

    fn self_envelope(&self, adapter_key: &str, room: &str, lines: &[String]) -> Envelope {
        let name = self.name();
        Envelope::new(User::new(name.clone(), name, room, adapter_key), room).with_text(lines.join("\n"))
    }

    /// Say something in `room` on every adapter that has joined it
    pub async fn speak<I, S>(&self, room: &str, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = messages.into_iter().map(Into::into).collect();
        let targets = self
            .inner
            .adapters
            .iter()
            .filter(|(_, adapter)| adapter.rooms().iter().any(|r| r.eq_ignore_ascii_case(room)));

        for (key, adapter) in targets {
            let envelope = self.self_envelope(key, room, &lines);
            if let Err(e) = adapter.send(&envelope, &lines).await {
                tracing::error!(adapter = %key, room, error = %e, "Could not speak to adapter");
            }
        }
    }

    /// Say something in `room` on one adapter
    pub async fn speak_to<I, S>(&self, adapter_id: &str, room: &str, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let Some(adapter) = self.get_adapter(adapter_id) else {
            tracing::warn!(adapter = adapter_id, "Could not find adapter matching key");
            return;
        };

        let lines: Vec<String> = messages.into_iter().map(Into::into).collect();
        let envelope = self.self_envelope(adapter_id, room, &lines);
        if let Err(e) = adapter.send(&envelope, &lines).await {
            tracing::error!(adapter = adapter_id, room, error = %e, "Could not speak to adapter");
        }
    }

    // --- events ---

    pub fn emit<T: Any>(&self, key: &str, data: T) {
        self.inner.events.emit(key, data);
    }

    pub fn on<T, F>(&self, key: &str, handler: F)
    where
        T: Any,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.events.on(key, handler);
    }

    pub fn emitters(&self) -> Vec<String> {
        self.inner.events.keys()
    }

    // --- help and scripts ---

    pub fn add_help<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.help.add_help(lines);
    }

    pub fn add_metadata(&self, metadata: ScriptMetadata) {
        self.inner.help.add_metadata(metadata);
    }

    pub fn help_commands(&self) -> Vec<String> {
        self.inner.help.commands()
    }

    pub fn script_data(&self) -> Vec<ScriptMetadata> {
        self.inner.help.entries()
    }

    /// Run `cleanup` once during shutdown
    pub fn register_cleanup<F>(&self, cleanup: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner
            .cleanups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(cleanup));
    }

    /// Call `action` every `period`, the first time one period from now.
    ///
    /// Disposing or dropping the subscription cancels the schedule; scripts
    /// usually hand it to [`Robot::register_cleanup`].
    pub fn schedule_repeat<F>(&self, period: Duration, action: F) -> Result<Subscription, BotError>
    where
        F: Fn() + Send + 'static,
    {
        if period.is_zero() {
            return Err(ConfigError::InvalidValue("repeat period must be non-zero".to_string()).into());
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| BotError::Internal(format!("Cannot schedule outside a runtime: {}", e)))?;

        let task = runtime.spawn(async move {
            let mut ticks = time::interval_at(time::Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                action();
            }
        });

        Ok(Subscription::new(move || task.abort()))
    }

    /// Register a script; its listeners are tagged with the script name
    pub fn load_script(&self, script: &dyn Script) {
        let name = script.name().to_string();
        tracing::info!(script = %name, "Loading script");

        *self.inner.current_script.write().unwrap_or_else(PoisonError::into_inner) = Some(name.clone());
        let result = script.register(self);
        *self.inner.current_script.write().unwrap_or_else(PoisonError::into_inner) = None;

        match result {
            Ok(()) => {
                let mut metadata = ScriptMetadata::new(name).with_commands(script.help());
                metadata.description = script.description().map(str::to_string);
                self.add_metadata(metadata);
            }
            Err(e) => tracing::error!(script = %name, error = %e, "Could not load script"),
        }
    }

    pub fn load_scripts<I>(&self, scripts: I)
    where
        I: IntoIterator<Item = Arc<dyn Script>>,
    {
        for script in scripts {
            self.load_script(script.as_ref());
        }
    }

    /// Notified once per `reset`; the host rebuilds the robot when it fires
    pub fn reset_requested(&self) -> Arc<Notify> {
        Arc::clone(&self.inner.reset)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl std::fmt::Debug for Robot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Robot")
            .field("name", &self.name())
            .field("state", &self.state())
            .field("adapters", &self.inner.adapters.len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
