//! Router implementations

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use crate::application::errors::BotError;
use crate::domain::traits::Router;

/// Router that serves nothing; it only remembers its port and run state
#[derive(Debug, Default)]
pub struct NullRouter {
    port: AtomicU16,
    running: AtomicBool,
}

impl NullRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(&self) -> u16 {
        self.port.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Router for NullRouter {
    fn configure(&self, port: u16) {
        self.port.store(port, Ordering::SeqCst);
    }

    fn start(&self) -> Result<(), BotError> {
        if self.port() == 0 {
            return Err(BotError::Router("no port configured".to_string()));
        }
        tracing::debug!(port = self.port(), "Null router started");
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_port_and_state() {
        let router = NullRouter::new();
        router.configure(8080);
        router.start().unwrap();
        assert_eq!(router.port(), 8080);
        assert!(router.is_running());
        router.stop();
        assert!(!router.is_running());
    }

    #[test]
    fn test_start_requires_port() {
        let router = NullRouter::new();
        assert!(matches!(router.start(), Err(BotError::Router(_))));
        assert!(!router.is_running());
    }
}
