use std::sync::atomic::{AtomicBool, Ordering};

use super::User;
use chrono::{DateTime, Utc};

/// What an inbound message carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Text(String),
    Enter,
    Leave,
    Topic(String),
    /// A message nothing else claimed, re-submitted by the host
    CatchAll(Box<MessageKind>),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Text(_) => "text",
            MessageKind::Enter => "enter",
            MessageKind::Leave => "leave",
            MessageKind::Topic(_) => "topic",
            MessageKind::CatchAll(_) => "catch-all",
        }
    }

    /// Text body for text, topic and wrapped catch-all messages
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageKind::Text(s) | MessageKind::Topic(s) => Some(s),
            MessageKind::CatchAll(inner) => inner.text(),
            _ => None,
        }
    }
}

/// Represents an inbound message handed to the robot by an adapter.
///
/// The `done` flag only ever moves from `false` to `true`; once set the
/// listener chain stops for this message.
#[derive(Debug)]
pub struct Message {
    pub id: String,
    pub user: User,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    done: AtomicBool,
}

impl Message {
    pub fn new(user: User, kind: MessageKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user,
            kind,
            timestamp: Utc::now(),
            done: AtomicBool::new(false),
        }
    }

    pub fn text(user: User, text: impl Into<String>) -> Self {
        Self::new(user, MessageKind::Text(text.into()))
    }

    pub fn enter(user: User) -> Self {
        Self::new(user, MessageKind::Enter)
    }

    pub fn leave(user: User) -> Self {
        Self::new(user, MessageKind::Leave)
    }

    pub fn topic(user: User, topic: impl Into<String>) -> Self {
        Self::new(user, MessageKind::Topic(topic.into()))
    }

    /// Wrap an unclaimed message so catch-all listeners can see it
    pub fn catch_all(original: &Message) -> Self {
        Self::new(
            original.user.clone(),
            MessageKind::CatchAll(Box::new(original.kind.clone())),
        )
    }

    /// Mark the message as handled
    pub fn finish(&self) {
        self.done.store(true, Ordering::SeqCst);
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}

impl Clone for Message {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            user: self.user.clone(),
            kind: self.kind.clone(),
            timestamp: self.timestamp,
            done: AtomicBool::new(self.is_done()),
        }
    }
}

/// Typed view over a [`Message`], used to select listeners by message type
pub trait MessageVariant: Clone + Send + Sync + 'static {
    fn from_message(message: &Message) -> Option<Self>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnterMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMessage {
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchAllMessage {
    pub original: MessageKind,
}

impl CatchAllMessage {
    pub fn text(&self) -> Option<&str> {
        self.original.text()
    }
}

impl MessageVariant for TextMessage {
    fn from_message(message: &Message) -> Option<Self> {
        match &message.kind {
            MessageKind::Text(text) => Some(Self { text: text.clone() }),
            _ => None,
        }
    }
}

impl MessageVariant for EnterMessage {
    fn from_message(message: &Message) -> Option<Self> {
        matches!(message.kind, MessageKind::Enter).then_some(EnterMessage)
    }
}

impl MessageVariant for LeaveMessage {
    fn from_message(message: &Message) -> Option<Self> {
        matches!(message.kind, MessageKind::Leave).then_some(LeaveMessage)
    }
}

impl MessageVariant for TopicMessage {
    fn from_message(message: &Message) -> Option<Self> {
        match &message.kind {
            MessageKind::Topic(topic) => Some(Self { topic: topic.clone() }),
            _ => None,
        }
    }
}

impl MessageVariant for CatchAllMessage {
    fn from_message(message: &Message) -> Option<Self> {
        match &message.kind {
            MessageKind::CatchAll(original) => Some(Self {
                original: original.as_ref().clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new("u1", "alice", "general", "console")
    }

    #[test]
    fn test_done_flag_only_moves_forward() {
        let msg = Message::text(user(), "hello");
        assert!(!msg.is_done());
        msg.finish();
        msg.finish();
        assert!(msg.is_done());
    }

    #[test]
    fn test_variant_extraction() {
        let msg = Message::topic(user(), "release day");
        assert!(TextMessage::from_message(&msg).is_none());
        assert_eq!(
            TopicMessage::from_message(&msg).map(|t| t.topic),
            Some("release day".to_string())
        );
        assert!(EnterMessage::from_message(&Message::enter(user())).is_some());
        assert!(LeaveMessage::from_message(&Message::enter(user())).is_none());
    }

    #[test]
    fn test_catch_all_wraps_original() {
        let msg = Message::text(user(), "unmatched words");
        let wrapped = Message::catch_all(&msg);
        let view = CatchAllMessage::from_message(&wrapped).unwrap();
        assert_eq!(view.text(), Some("unmatched words"));
        assert_eq!(wrapped.user, msg.user);
        assert!(TextMessage::from_message(&wrapped).is_none());
    }
}
