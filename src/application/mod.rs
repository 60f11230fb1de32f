//! Application layer - Robot coordination and script-facing services
//! 
//! This layer contains:
//! - Robot: lifecycle, listener chain, outbound routing
//! - Messaging: listeners, patterns, responses, event bus
//! - Services: help catalog, user roles
//! - Errors: Domain-specific errors

pub mod errors;
pub mod messaging;
pub mod robot;
pub mod services;
