//! Domain traits - Abstractions for infrastructure implementations

pub mod adapter;
pub mod brain;
pub mod router;

pub use adapter::Adapter;
pub use brain::{Brain, BrainExt, BrainValue, Json, StoredValue};
pub use router::Router;
