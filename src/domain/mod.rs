//! Domain layer - Core chat types with no transport dependencies
//! 
//! This layer contains:
//! - Entities: Users, messages and envelopes
//! - Traits: Abstractions for adapters, brains and routers

pub mod entities;
pub mod traits;
