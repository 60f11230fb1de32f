//! Listener variants - each one decides whether a message is for it and,
//! if so, runs its callback

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use regex_lite::Regex;

use super::response::Response;
use crate::application::errors::BotError;
use crate::application::robot::Robot;
use crate::domain::entities::{
    CatchAllMessage, EnterMessage, LeaveMessage, Message, MessageVariant, TextMessage,
    TopicMessage,
};

/// Future returned by a listener callback
pub type ListenerFuture = BoxFuture<'static, Result<(), BotError>>;

/// Listener callback
pub type Callback<T> = Arc<dyn Fn(Response<T>) -> ListenerFuture + Send + Sync>;

/// Box an async closure into a [`Callback`]
pub fn callback<T, F, Fut>(f: F) -> Callback<T>
where
    F: Fn(Response<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BotError>> + Send + 'static,
{
    Arc::new(move |response| f(response).boxed())
}

/// Outcome of a typed matcher; `values` become the response's captures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    pub is_match: bool,
    pub values: Vec<Option<String>>,
}

impl MatchResult {
    pub fn matched<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            is_match: true,
            values: values.into_iter().map(|v| Some(v.into())).collect(),
        }
    }

    pub fn no_match() -> Self {
        Self::default()
    }
}

/// Listener trait - one link of the robot's listener chain
#[async_trait]
pub trait Listener: Send + Sync {
    /// Returns `Ok(true)` when the listener matched and its callback ran
    async fn try_handle(&self, robot: &Robot, message: &Arc<Message>) -> Result<bool, BotError>;

    /// Name of the script that registered this listener
    fn source(&self) -> Option<&str>;

    /// Anchored regex source, for text listeners only
    fn pattern(&self) -> Option<&str> {
        None
    }
}

async fn invoke<T: MessageVariant>(
    robot: &Robot,
    message: &Arc<Message>,
    view: T,
    matches: Vec<Option<String>>,
    callback: &Callback<T>,
) -> Result<bool, BotError> {
    let response = Response::new(robot.clone(), Arc::clone(message), view, matches);
    callback(response).await?;
    Ok(true)
}

/// Matches messages of type `T` through an arbitrary predicate
pub struct TypedMatchListener<T> {
    matcher: Arc<dyn Fn(&T) -> MatchResult + Send + Sync>,
    callback: Callback<T>,
    source: Option<String>,
}

impl<T: MessageVariant> TypedMatchListener<T> {
    pub fn new<M>(matcher: M, callback: Callback<T>, source: Option<String>) -> Self
    where
        M: Fn(&T) -> MatchResult + Send + Sync + 'static,
    {
        Self {
            matcher: Arc::new(matcher),
            callback,
            source,
        }
    }
}

#[async_trait]
impl<T: MessageVariant> Listener for TypedMatchListener<T> {
    async fn try_handle(&self, robot: &Robot, message: &Arc<Message>) -> Result<bool, BotError> {
        let Some(view) = T::from_message(message) else {
            return Ok(false);
        };

        let result = (self.matcher)(&view);
        if !result.is_match {
            return Ok(false);
        }

        invoke(robot, message, view, result.values, &self.callback).await
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

/// Matches text messages against a precompiled, anchored, case-insensitive regex
pub struct TextListener {
    regex: Regex,
    pattern: String,
    callback: Callback<TextMessage>,
    source: Option<String>,
}

impl TextListener {
    pub fn new(
        anchored: String,
        callback: Callback<TextMessage>,
        source: Option<String>,
    ) -> Result<Self, BotError> {
        Ok(Self {
            regex: super::pattern::compile(&anchored)?,
            pattern: anchored,
            callback,
            source,
        })
    }
}

#[async_trait]
impl Listener for TextListener {
    async fn try_handle(&self, robot: &Robot, message: &Arc<Message>) -> Result<bool, BotError> {
        let Some(view) = TextMessage::from_message(message) else {
            return Ok(false);
        };

        let matches = match self.regex.captures(&view.text) {
            Some(caps) => (0..caps.len())
                .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                .collect(),
            None => return Ok(false),
        };

        invoke(robot, message, view, matches, &self.callback).await
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn pattern(&self) -> Option<&str> {
        Some(&self.pattern)
    }
}

/// Marker for roster message types
pub trait RosterVariant: MessageVariant {}

impl RosterVariant for EnterMessage {}
impl RosterVariant for LeaveMessage {}

/// Fires on every enter (or leave) message
pub struct RosterListener<T> {
    callback: Callback<T>,
    source: Option<String>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: RosterVariant> RosterListener<T> {
    pub fn new(callback: Callback<T>, source: Option<String>) -> Self {
        Self {
            callback,
            source,
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<T: RosterVariant> Listener for RosterListener<T> {
    async fn try_handle(&self, robot: &Robot, message: &Arc<Message>) -> Result<bool, BotError> {
        match T::from_message(message) {
            Some(view) => invoke(robot, message, view, Vec::new(), &self.callback).await,
            None => Ok(false),
        }
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

/// Fires on every topic change
pub struct TopicListener {
    callback: Callback<TopicMessage>,
    source: Option<String>,
}

impl TopicListener {
    pub fn new(callback: Callback<TopicMessage>, source: Option<String>) -> Self {
        Self { callback, source }
    }
}

#[async_trait]
impl Listener for TopicListener {
    async fn try_handle(&self, robot: &Robot, message: &Arc<Message>) -> Result<bool, BotError> {
        match TopicMessage::from_message(message) {
            Some(view) => invoke(robot, message, view, Vec::new(), &self.callback).await,
            None => Ok(false),
        }
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

/// Fires on catch-all messages, which the host submits for unclaimed input
pub struct CatchAllListener {
    callback: Callback<CatchAllMessage>,
    source: Option<String>,
}

impl CatchAllListener {
    pub fn new(callback: Callback<CatchAllMessage>, source: Option<String>) -> Self {
        Self { callback, source }
    }
}

#[async_trait]
impl Listener for CatchAllListener {
    async fn try_handle(&self, robot: &Robot, message: &Arc<Message>) -> Result<bool, BotError> {
        match CatchAllMessage::from_message(message) {
            Some(view) => invoke(robot, message, view, Vec::new(), &self.callback).await,
            None => Ok(false),
        }
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}
