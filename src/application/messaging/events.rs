//! In-process event bus for lifecycle notices and script-to-script signals

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Scripts were auto-loaded; payload `Vec<String>` of script names
pub const SCRIPTS_LOADED: &str = "ScriptsLoaded";
/// An adapter started; payload `String` adapter id
pub const ADAPTER_RUNNING: &str = "AdapterRunning";
pub const ROBOT_READY: &str = "RobotReady";
pub const SHUTTING_DOWN: &str = "ShuttingDown";
pub const SHUTDOWN_COMPLETE: &str = "ShutdownComplete";
pub const RESETTING: &str = "Resetting";

type Handler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Named channels with synchronous subscribers.
///
/// Handlers run on the emitting task in subscription order. Emitting to a key
/// nobody subscribed to does nothing. A handler may emit or subscribe again
/// from inside its body; there is no recursion guard.
#[derive(Default)]
pub struct EventBus {
    channels: RwLock<HashMap<String, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `key`. Payloads of any other type than `T` are skipped.
    pub fn on<T, F>(&self, key: &str, handler: F)
    where
        T: Any,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let key_name = key.to_string();
        let handler: Handler = Arc::new(move |data: &dyn Any| match data.downcast_ref::<T>() {
            Some(value) => handler(value),
            None => tracing::warn!(event = %key_name, "Event payload type mismatch, handler skipped"),
        });

        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_default()
            .push(handler);
    }

    pub fn emit<T: Any>(&self, key: &str, data: T) {
        // Release the lock before calling out so handlers can re-enter
        let handlers = {
            let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
            match channels.get(key) {
                Some(handlers) => handlers.clone(),
                None => return,
            }
        };

        tracing::trace!(event = key, subscribers = handlers.len(), "Emitting event");
        for handler in handlers {
            handler(&data);
        }
    }

    /// Keys that have at least been subscribed to once
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}
