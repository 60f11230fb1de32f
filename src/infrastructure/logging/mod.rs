//! Logging setup, plus a layer that mirrors log lines into chat rooms

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::field::{Field, Visit};
use tracing::Level;
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt as fmt_layer, EnvFilter, Layer};

use crate::application::errors::BotError;
use crate::infrastructure::config::LoggingConfig;

/// Target used by the room forwarder; its own events are never mirrored
pub const FORWARDER_TARGET: &str = "mmbot::log_rooms";

tokio::task_local! {
    static FORWARDING: ();
}

/// Run `fut` with room mirroring suppressed for events it raises itself.
/// Adapters that log from `send` would otherwise feed their own output back.
pub async fn without_mirroring<F: Future>(fut: F) -> F::Output {
    FORWARDING.scope((), fut).await
}

fn is_forwarding() -> bool {
    FORWARDING.try_with(|_| ()).is_ok()
}

/// One mirrored log event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: Level,
    pub target: String,
    pub message: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Channel between [`RoomLogLayer`] and the robot's forwarder task.
///
/// Nothing is queued while the feed is disabled.
#[derive(Clone)]
pub struct LogFeed {
    sender: mpsc::UnboundedSender<LogLine>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<LogLine>>>,
    enabled: Arc<AtomicBool>,
    min_level: Level,
}

impl LogFeed {
    pub fn new(min_level: Level) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            enabled: Arc::new(AtomicBool::new(false)),
            min_level,
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn receiver(&self) -> &Arc<Mutex<mpsc::UnboundedReceiver<LogLine>>> {
        &self.receiver
    }

    pub fn layer(&self) -> RoomLogLayer {
        RoomLogLayer { feed: self.clone() }
    }

    fn accepts(&self, level: &Level, target: &str) -> bool {
        self.is_enabled()
            && *level <= self.min_level
            && !target.starts_with(FORWARDER_TARGET)
            && !is_forwarding()
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.into();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }
}

impl MessageVisitor {
    fn into_text(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

/// Forwards events at or above the feed's level to the [`LogFeed`]
pub struct RoomLogLayer {
    feed: LogFeed,
}

impl<S: tracing::Subscriber> Layer<S> for RoomLogLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if !self.feed.accepts(meta.level(), meta.target()) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        // Receiver gone means the robot is being torn down
        let _ = self.feed.sender.send(LogLine {
            level: *meta.level(),
            target: meta.target().to_string(),
            message: visitor.into_text(),
        });
    }
}

/// Parse a level name, falling back to `WARN`
pub fn parse_level(level: &str) -> Level {
    Level::from_str(level.trim()).unwrap_or(Level::WARN)
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init(config: &LoggingConfig) -> Result<LogFeed, BotError> {
    let feed = LogFeed::new(parse_level(&config.room_level));
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer::layer().with_target(false))
        .with(feed.layer())
        .try_init()
        .map_err(|e| BotError::Internal(format!("Failed to initialize logging: {}", e)))?;

    Ok(feed)
}
