//! Message handling - listener chain, command patterns, responses and events

pub mod events;
pub mod listener;
pub mod pattern;
pub mod response;

pub use events::EventBus;
pub use listener::{
    callback, Callback, CatchAllListener, Listener, ListenerFuture, MatchResult, RosterListener,
    TextListener, TopicListener, TypedMatchListener,
};
pub use response::Response;
