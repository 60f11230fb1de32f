//! Script registry - the static manifest of scripts a robot can load

use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::trait_def::{Script, ScriptStore, ScriptUpdateHandler, Subscription};
use crate::application::errors::BotError;

const UPDATE_CAPACITY: usize = 16;

/// Registry for managing available scripts, in registration order
pub struct ScriptRegistry {
    scripts: RwLock<Vec<Arc<dyn Script>>>,
    updates: broadcast::Sender<Arc<dyn Script>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            scripts: RwLock::new(Vec::new()),
            updates,
        }
    }

    /// Register a script
    pub fn register(&self, script: Arc<dyn Script>) -> Result<(), BotError> {
        let mut scripts = self.scripts.write().unwrap_or_else(PoisonError::into_inner);

        if scripts.iter().any(|s| s.name() == script.name()) {
            return Err(BotError::Script(format!(
                "Script '{}' already registered",
                script.name()
            )));
        }

        tracing::debug!(script = script.name(), "Registered script");
        scripts.push(script);
        Ok(())
    }

    /// Get a script by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Script>> {
        self.scripts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|s| s.name() == name)
            .cloned()
    }

    /// Get all script names
    pub fn names(&self) -> Vec<String> {
        self.scripts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Replace (or add) a script and push it to every watcher.
    /// Returns the number of watchers notified.
    pub fn publish(&self, script: Arc<dyn Script>) -> usize {
        {
            let mut scripts = self.scripts.write().unwrap_or_else(PoisonError::into_inner);
            match scripts.iter_mut().find(|s| s.name() == script.name()) {
                Some(existing) => *existing = Arc::clone(&script),
                None => scripts.push(Arc::clone(&script)),
            }
        }

        tracing::info!(script = script.name(), "Publishing script update");
        self.updates.send(script).unwrap_or(0)
    }

    /// Get the number of registered scripts
    pub fn len(&self) -> usize {
        self.scripts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if no scripts are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ScriptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptStore for ScriptRegistry {
    fn all_scripts(&self) -> Vec<Arc<dyn Script>> {
        self.scripts.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn watch(&self, handler: ScriptUpdateHandler) -> Option<Subscription> {
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let mut updates = self.updates.subscribe();

        let task = runtime.spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(script) => handler(script),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Script watcher fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Some(Subscription::new(move || task.abort()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::robot::Robot;

    struct Named(&'static str);

    impl Script for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn register(&self, _robot: &Robot) -> Result<(), BotError> {
            Ok(())
        }
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let registry = ScriptRegistry::new();
        registry.register(Arc::new(Named("a"))).unwrap();
        registry.register(Arc::new(Named("b"))).unwrap();
        assert!(matches!(registry.register(Arc::new(Named("a"))), Err(BotError::Script(_))));
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
        assert!(registry.get("b").is_some());
        assert!(registry.get("c").is_none());
    }

    #[test]
    fn test_publish_without_watchers_replaces_entry() {
        let registry = ScriptRegistry::new();
        registry.register(Arc::new(Named("a"))).unwrap();
        assert_eq!(registry.publish(Arc::new(Named("a"))), 0);
        assert_eq!(registry.publish(Arc::new(Named("c"))), 0);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_watch_needs_runtime() {
        let registry = ScriptRegistry::new();
        assert!(registry.watch(Arc::new(|_: Arc<dyn Script>| {})).is_none());
    }

    #[tokio::test]
    async fn test_watch_delivers_updates_until_disposed() {
        let registry = ScriptRegistry::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let subscription = registry
            .watch(Arc::new(move |script: Arc<dyn Script>| {
                let _ = tx.send(script.name().to_string());
            }))
            .unwrap();

        assert_eq!(registry.publish(Arc::new(Named("a"))), 1);
        assert_eq!(rx.recv().await.as_deref(), Some("a"));

        subscription.dispose();
        for _ in 0..100 {
            if registry.updates.receiver_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.updates.receiver_count(), 0);
    }
}
