//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mmbot::{Adapter, BotError, Config, Envelope, Message, Robot, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunBehavior {
    Ok,
    NotConfigured,
    Fail,
}

/// One outbound call seen by a [`RecordingAdapter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub kind: &'static str,
    pub room: String,
    pub lines: Vec<String>,
}

/// Adapter that records outbound traffic instead of talking to a network
pub struct RecordingAdapter {
    id: String,
    rooms: Vec<String>,
    log_rooms: Vec<String>,
    run_behavior: RunBehavior,
    fail_send: bool,
    warn_on_send: bool,
    sent: Mutex<Vec<Sent>>,
    runs: AtomicUsize,
    closes: AtomicUsize,
}

impl RecordingAdapter {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            rooms: Vec::new(),
            log_rooms: Vec::new(),
            run_behavior: RunBehavior::Ok,
            fail_send: false,
            warn_on_send: false,
            sent: Mutex::new(Vec::new()),
            runs: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn with_rooms(mut self, rooms: &[&str]) -> Self {
        self.rooms = rooms.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_log_rooms(mut self, rooms: &[&str]) -> Self {
        self.log_rooms = rooms.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_run_behavior(mut self, behavior: RunBehavior) -> Self {
        self.run_behavior = behavior;
        self
    }

    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    /// Log a warning from every outbound call
    pub fn warning_on_send(mut self) -> Self {
        self.warn_on_send = true;
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Every line sent, flattened
    pub fn lines(&self) -> Vec<String> {
        self.sent().into_iter().flat_map(|s| s.lines).collect()
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn user(&self, name: &str, room: &str) -> User {
        User::new(name, name, room, self.id.as_str())
    }

    fn record(&self, kind: &'static str, envelope: &Envelope, messages: &[String]) -> Result<(), BotError> {
        if self.warn_on_send {
            tracing::warn!(adapter = %self.id, "Outbound queue is backing up");
        }
        if self.fail_send {
            return Err(BotError::Send {
                adapter: self.id.clone(),
                room: envelope.room.clone(),
                reason: "transport down".to_string(),
            });
        }
        self.sent.lock().unwrap().push(Sent {
            kind,
            room: envelope.room.clone(),
            lines: messages.to_vec(),
        });
        Ok(())
    }
}

#[async_trait]
impl Adapter for RecordingAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self) -> Result<(), BotError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match self.run_behavior {
            RunBehavior::Ok => Ok(()),
            RunBehavior::NotConfigured => Err(BotError::AdapterNotConfigured("missing token".into())),
            RunBehavior::Fail => Err(BotError::Internal("connection refused".into())),
        }
    }

    async fn close(&self) -> Result<(), BotError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, envelope: &Envelope, messages: &[String]) -> Result<(), BotError> {
        self.record("send", envelope, messages)
    }

    async fn reply(&self, envelope: &Envelope, messages: &[String]) -> Result<(), BotError> {
        self.record("reply", envelope, messages)
    }

    async fn emote(&self, envelope: &Envelope, messages: &[String]) -> Result<(), BotError> {
        self.record("emote", envelope, messages)
    }

    fn rooms(&self) -> Vec<String> {
        self.rooms.clone()
    }

    fn log_rooms(&self) -> Vec<String> {
        self.log_rooms.clone()
    }
}

/// Configured, not yet running robot with the given adapters
pub async fn build_robot(config: Config, adapters: &[Arc<RecordingAdapter>]) -> Robot {
    let mut builder = Robot::builder().config(config);
    for adapter in adapters {
        builder = builder.adapter(adapter.clone());
    }
    builder.build().await.unwrap()
}

/// Running robot named "mmbot" with a single adapter "test"
pub async fn ready_robot() -> (Robot, Arc<RecordingAdapter>) {
    let adapter = Arc::new(RecordingAdapter::new("test").with_rooms(&["general"]));
    let robot = build_robot(Config::default(), &[adapter.clone()]).await;
    robot.run().await.unwrap();
    (robot, adapter)
}

pub fn text(adapter: &RecordingAdapter, name: &str, body: &str) -> Message {
    Message::text(adapter.user(name, "general"), body)
}

/// Poll `condition` for up to a second
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
