//! mmbot - a chat robot that routes messages from adapters through an
//! ordered chain of script listeners.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod scripts;

pub use application::errors::{BotError, ConfigError, StorageError};
pub use application::messaging::{events, MatchResult, Response};
pub use application::robot::{Robot, RobotBuilder, RobotState, WeakRobot};
pub use domain::entities::{Envelope, Message, MessageKind, User};
pub use domain::traits::{Adapter, Brain, BrainExt, Json, Router};
pub use infrastructure::config::Config;
pub use scripts::{Script, ScriptRegistry};
