//! Script system - scripts register listeners on a robot
//!
//! Scripts are discovered through a static [`ScriptRegistry`] rather than at
//! runtime. Publishing an updated script to the registry re-registers it on
//! every robot that watches the registry.

pub mod builtin;
pub mod registry;
pub mod trait_def;

pub use builtin::{HelpScript, PingScript, RolesScript};
pub use registry::ScriptRegistry;
pub use trait_def::{Script, ScriptStore, ScriptUpdateHandler, Subscription};
