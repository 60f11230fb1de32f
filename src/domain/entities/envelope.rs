use super::{Message, User};

/// Outbound addressing for a single send. Never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub user: User,
    pub room: String,
    pub text: Option<String>,
}

impl Envelope {
    /// Address a reply to wherever `message` came from
    pub fn from_message(message: &Message) -> Self {
        Self {
            user: message.user.clone(),
            room: message.user.room.clone(),
            text: message.kind.text().map(str::to_string),
        }
    }

    pub fn new(user: User, room: impl Into<String>) -> Self {
        Self {
            user,
            room: room.into(),
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}
