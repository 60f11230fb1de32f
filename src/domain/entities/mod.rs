//! Domain entities - Core chat objects with no infrastructure dependencies

pub mod user;
pub mod message;
pub mod envelope;

pub use user::User;
pub use message::{
    CatchAllMessage, EnterMessage, LeaveMessage, Message, MessageKind, MessageVariant,
    TextMessage, TopicMessage,
};
pub use envelope::Envelope;
