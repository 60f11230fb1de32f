//! Script trait definitions

use std::sync::Arc;

use crate::application::errors::BotError;
use crate::application::robot::Robot;

/// Core script trait that all scripts must implement
pub trait Script: Send + Sync {
    /// Unique identifier; listeners registered by the script carry it
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    /// Help lines added to the robot when the script loads
    fn help(&self) -> Vec<String> {
        Vec::new()
    }

    /// Register listeners, event handlers and cleanups on `robot`
    fn register(&self, robot: &Robot) -> Result<(), BotError>;
}

/// Called with every updated script a store publishes
pub type ScriptUpdateHandler = Arc<dyn Fn(Arc<dyn Script>) + Send + Sync>;

/// Source of scripts for auto-load and hot reload
pub trait ScriptStore: Send + Sync {
    fn all_scripts(&self) -> Vec<Arc<dyn Script>>;

    /// Subscribe to script updates. `None` when updates can't be delivered.
    fn watch(&self, handler: ScriptUpdateHandler) -> Option<Subscription>;
}

/// Live watch on a [`ScriptStore`]; dropping it stops delivery
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(dispose: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    pub fn dispose(mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}
