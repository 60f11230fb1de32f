//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Logging: Subscriber setup and log-room mirroring
//! - Storage: Brain backends
//! - Adapters: Chat transports
//! - Router: Webhook routers

pub mod adapters;
pub mod config;
pub mod logging;
pub mod router;
pub mod storage;
