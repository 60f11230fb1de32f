//! Response wrapper handed to listener callbacks

use std::sync::Arc;

use crate::application::errors::BotError;
use crate::application::robot::Robot;
use crate::domain::entities::{Envelope, Message, User};

#[derive(Debug, Clone, Copy)]
enum Outbound {
    Send,
    Reply,
    Emote,
    Topic,
    Play,
}

/// A matched message plus the means to answer it.
///
/// Outbound calls go to the adapter that produced the message.
pub struct Response<T> {
    robot: Robot,
    message: Arc<Message>,
    view: T,
    matches: Vec<Option<String>>,
}

impl<T> Response<T> {
    pub(crate) fn new(
        robot: Robot,
        message: Arc<Message>,
        view: T,
        matches: Vec<Option<String>>,
    ) -> Self {
        Self {
            robot,
            message,
            view,
            matches,
        }
    }

    /// Typed view of the message
    pub fn message(&self) -> &T {
        &self.view
    }

    /// The underlying message, shared with the dispatch loop
    pub fn raw(&self) -> &Arc<Message> {
        &self.message
    }

    pub fn user(&self) -> &User {
        &self.message.user
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    /// Capture groups; index 0 is the whole match
    pub fn matches(&self) -> &[Option<String>] {
        &self.matches
    }

    pub fn capture(&self, index: usize) -> Option<&str> {
        self.matches.get(index).and_then(|m| m.as_deref())
    }

    /// Claim the message so no later listener sees it
    pub fn finish(&self) {
        self.message.finish();
    }

    pub async fn send<I, S>(&self, lines: I) -> Result<(), BotError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deliver(Outbound::Send, collect(lines)).await
    }

    pub async fn reply<I, S>(&self, lines: I) -> Result<(), BotError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deliver(Outbound::Reply, collect(lines)).await
    }

    pub async fn emote<I, S>(&self, lines: I) -> Result<(), BotError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deliver(Outbound::Emote, collect(lines)).await
    }

    pub async fn topic<I, S>(&self, lines: I) -> Result<(), BotError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deliver(Outbound::Topic, collect(lines)).await
    }

    pub async fn play<I, S>(&self, lines: I) -> Result<(), BotError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deliver(Outbound::Play, collect(lines)).await
    }

    async fn deliver(&self, kind: Outbound, lines: Vec<String>) -> Result<(), BotError> {
        let adapter_id = &self.message.user.adapter_id;
        let adapter = self
            .robot
            .get_adapter(adapter_id)
            .ok_or_else(|| BotError::AdapterNotFound(adapter_id.clone()))?;

        let envelope = Envelope::from_message(&self.message);
        tracing::debug!(adapter = %adapter_id, room = %envelope.room, ?kind, lines = lines.len(), "Responding");

        match kind {
            Outbound::Send => adapter.send(&envelope, &lines).await,
            Outbound::Reply => adapter.reply(&envelope, &lines).await,
            Outbound::Emote => adapter.emote(&envelope, &lines).await,
            Outbound::Topic => adapter.topic(&envelope, &lines).await,
            Outbound::Play => adapter.play(&envelope, &lines).await,
        }
    }
}

fn collect<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    lines.into_iter().map(Into::into).collect()
}
