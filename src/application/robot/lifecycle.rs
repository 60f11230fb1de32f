//! Run / Shutdown / Reset

use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};

use super::{Robot, RobotState};
use crate::application::errors::BotError;
use crate::application::messaging::events;
use crate::domain::entities::{Envelope, User};
use crate::domain::traits::Adapter;
use crate::infrastructure::logging::{without_mirroring, LogFeed, FORWARDER_TARGET};
use crate::scripts::Script;

impl Robot {
    /// Start scripts, router and adapters, then accept messages.
    ///
    /// Only a missing configuration is fatal; every other step logs its
    /// failure and carries on.
    pub async fn run(&self) -> Result<(), BotError> {
        if !self.is_configured() {
            return Err(BotError::NotConfigured);
        }

        self.set_state(RobotState::Running);
        tracing::info!(name = %self.name(), "Starting robot");

        if self.inner.auto_load_scripts.load(Ordering::SeqCst) {
            let scripts = self
                .inner
                .scripts
                .as_ref()
                .map(|store| store.all_scripts())
                .unwrap_or_default();
            let names: Vec<String> = scripts.iter().map(|s| s.name().to_string()).collect();
            self.load_scripts(scripts);
            tracing::info!(count = names.len(), "Scripts loaded");
            self.emit(events::SCRIPTS_LOADED, names);
        }

        if self.inner.watch_scripts.load(Ordering::SeqCst) {
            self.start_watching();
        }

        if let Err(e) = self.inner.router.start() {
            tracing::error!(error = %e, "Could not start router");
        }

        for (key, adapter) in &self.inner.adapters {
            match adapter.run().await {
                Ok(()) => {
                    tracing::info!(adapter = %key, "Adapter running");
                    self.emit(events::ADAPTER_RUNNING, key.clone());
                }
                Err(BotError::AdapterNotConfigured(reason)) => {
                    tracing::warn!(adapter = %key, reason = %reason, "Adapter is not configured");
                }
                Err(e) => {
                    tracing::error!(adapter = %key, error = %e, "Could not start adapter");
                }
            }
        }

        self.start_log_rooms();

        self.inner.ready.store(true, Ordering::SeqCst);
        self.set_state(RobotState::Ready);
        tracing::info!(name = %self.name(), "Robot ready");
        self.emit(events::ROBOT_READY, true);
        Ok(())
    }

    /// Stop accepting messages and release every collaborator.
    ///
    /// Safe to call more than once. Adapter close failures are logged; a
    /// brain close failure is returned after every step has run.
    pub async fn shutdown(&self) -> Result<(), BotError> {
        self.emit(events::SHUTTING_DOWN, true);
        self.set_state(RobotState::ShuttingDown);
        self.inner.ready.store(false, Ordering::SeqCst);
        tracing::info!(name = %self.name(), "Shutting down robot");

        self.inner.router.stop();

        let watch = self
            .inner
            .watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = watch {
            subscription.dispose();
        }

        let cleanups: Vec<_> = self
            .inner
            .cleanups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for cleanup in cleanups {
            cleanup();
        }

        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let forwarder = self
            .inner
            .log_forwarder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = forwarder {
            handle.abort();
        }
        if let Some(feed) = &self.inner.log_feed {
            feed.disable();
        }

        for (key, adapter) in &self.inner.adapters {
            if let Err(e) = adapter.close().await {
                tracing::error!(adapter = %key, error = %e, "Could not close adapter");
            }
        }

        let brain_result = match &self.inner.brain {
            Some(brain) => brain.close().await.map_err(BotError::from),
            None => Ok(()),
        };
        if let Err(e) = &brain_result {
            tracing::error!(error = %e, "Could not close brain");
        }

        self.set_state(RobotState::Stopped);
        self.emit(events::SHUTDOWN_COMPLETE, true);
        brain_result
    }

    /// Shut down and ask the host to build a fresh robot
    pub async fn reset(&self) {
        self.emit(events::RESETTING, true);
        if let Err(e) = self.shutdown().await {
            tracing::warn!(error = %e, "Shutdown during reset failed");
        }
        self.inner.reset.notify_one();
    }

    fn start_watching(&self) {
        let Some(store) = self.inner.scripts.clone() else {
            tracing::debug!("No script store to watch");
            return;
        };

        let robot = self.downgrade();
        let subscription = store.watch(Arc::new(move |script: Arc<dyn Script>| {
            let Some(robot) = robot.upgrade() else {
                return;
            };
            let removed = robot.remove_script_listeners(script.name());
            tracing::info!(script = script.name(), removed, "Reloading script");
            robot.load_script(script.as_ref());
        }));

        if subscription.is_none() {
            tracing::warn!("Script watching is not available");
        }
        *self.inner.watch.lock().unwrap_or_else(PoisonError::into_inner) = subscription;
    }

    fn start_log_rooms(&self) {
        let targets: Vec<LogTarget> = self
            .inner
            .adapters
            .iter()
            .map(|(key, adapter)| (key.clone(), Arc::clone(adapter), adapter.log_rooms()))
            .filter(|(_, _, rooms)| !rooms.is_empty())
            .collect();

        if targets.is_empty() {
            tracing::info!("No logging rooms are enabled");
            return;
        }

        let Some(feed) = self.inner.log_feed.clone() else {
            tracing::debug!("Logging rooms configured without a log feed");
            return;
        };

        let name = self.name();
        let handle = tokio::spawn(without_mirroring(forward_logs(feed.clone(), name, targets)));
        feed.enable();

        let previous = self
            .inner
            .log_forwarder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

type LogTarget = (String, Arc<dyn Adapter>, Vec<String>);

async fn forward_logs(feed: LogFeed, name: String, targets: Vec<LogTarget>) {
    let mut receiver = feed.receiver().lock().await;
    while let Some(line) = receiver.recv().await {
        let text = line.to_string();
        for (key, adapter, rooms) in &targets {
            for room in rooms {
                let user = User::new(name.as_str(), name.as_str(), room.as_str(), key.as_str());
                let envelope = Envelope::new(user, room.as_str()).with_text(text.as_str());
                if let Err(e) = adapter.send(&envelope, std::slice::from_ref(&text)).await {
                    tracing::debug!(
                        target: FORWARDER_TARGET,
                        adapter = %key,
                        room = %room,
                        error = %e,
                        "Could not mirror log line"
                    );
                }
            }
        }
    }
}
