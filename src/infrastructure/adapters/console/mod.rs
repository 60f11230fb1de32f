//! Console adapter for local development

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use crate::application::errors::BotError;
use crate::application::robot::{Robot, WeakRobot};
use crate::domain::entities::{Envelope, Message, User};
use crate::domain::traits::Adapter;

pub const CONSOLE_ADAPTER_ID: &str = "console";
pub const CONSOLE_ROOM: &str = "console";
pub const CONSOLE_USER: &str = "ConsoleUser";

/// Console lines shared by every console adapter in the process.
///
/// Stdin is read on one dedicated thread that outlives the adapters, so a
/// robot rebuilt after a reset picks up the next line instead of losing it
/// to a reader that can no longer be cancelled.
#[derive(Clone)]
pub struct ConsoleInput {
    lines: Arc<AsyncMutex<mpsc::UnboundedReceiver<String>>>,
}

impl ConsoleInput {
    /// Start reading stdin. Call once per process.
    pub fn stdin() -> Result<Self, BotError> {
        let (sender, input) = Self::channel();
        std::thread::Builder::new()
            .name("console-input".to_string())
            .spawn(move || read_stdin(sender))
            .map_err(|e| BotError::Internal(format!("Failed to start console reader: {}", e)))?;
        Ok(input)
    }

    /// Input fed through the returned sender instead of stdin
    pub fn channel() -> (mpsc::UnboundedSender<String>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let input = Self {
            lines: Arc::new(AsyncMutex::new(receiver)),
        };
        (sender, input)
    }
}

fn read_stdin(sender: mpsc::UnboundedSender<String>) {
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) => {
                tracing::info!("Console input closed");
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if sender.send(line.to_string()).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read console input");
                break;
            }
        }
    }
}

/// Feeds [`ConsoleInput`] lines to the robot and prints replies
pub struct ConsoleAdapter {
    robot: RwLock<Option<WeakRobot>>,
    input: Option<ConsoleInput>,
    reader: Mutex<Option<JoinHandle<()>>>,
    log_rooms: Vec<String>,
}

impl ConsoleAdapter {
    /// Adapter without an input; lines arrive through [`ConsoleAdapter::submit`] only
    pub fn new() -> Self {
        Self {
            robot: RwLock::new(None),
            input: None,
            reader: Mutex::new(None),
            log_rooms: Vec::new(),
        }
    }

    pub fn with_input(mut self, input: ConsoleInput) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_log_rooms(mut self, rooms: Vec<String>) -> Self {
        self.log_rooms = rooms;
        self
    }

    fn robot(&self) -> Option<Robot> {
        self.robot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(WeakRobot::upgrade)
    }

    /// Feed one line of input to the robot. Returns whether it was claimed.
    pub async fn submit(&self, line: &str) -> Result<bool, BotError> {
        let robot = self
            .robot()
            .ok_or_else(|| BotError::AdapterNotConfigured(CONSOLE_ADAPTER_ID.to_string()))?;
        Ok(handle_line(&robot, line).await)
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

async fn handle_line(robot: &Robot, line: &str) -> bool {
    let user = match robot
        .get_user(CONSOLE_USER, CONSOLE_USER, CONSOLE_ROOM, CONSOLE_ADAPTER_ID)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Could not load console user roles");
            User::new(CONSOLE_USER, CONSOLE_USER, CONSOLE_ROOM, CONSOLE_ADAPTER_ID)
        }
    };

    let message = Message::text(user, line);
    if robot.receive(message.clone()).await {
        return true;
    }
    robot.receive(Message::catch_all(&message)).await
}

// Holds the input until aborted; unread lines stay queued for the next adapter
async fn pump(input: ConsoleInput, robot: WeakRobot) {
    let mut lines = input.lines.lock().await;
    while let Some(line) = lines.recv().await {
        let Some(robot) = robot.upgrade() else {
            break;
        };
        handle_line(&robot, &line).await;
    }
}

#[async_trait]
impl Adapter for ConsoleAdapter {
    fn id(&self) -> &str {
        CONSOLE_ADAPTER_ID
    }

    fn initialize(&self, robot: &Robot) {
        *self.robot.write().unwrap_or_else(PoisonError::into_inner) = Some(robot.downgrade());
    }

    async fn run(&self) -> Result<(), BotError> {
        let robot = self.robot.read().unwrap_or_else(PoisonError::into_inner).clone();
        let Some(robot) = robot else {
            return Err(BotError::AdapterNotConfigured(
                "console adapter was not initialized".to_string(),
            ));
        };

        tracing::info!("Starting console adapter (dev mode)");
        if let Some(input) = self.input.clone() {
            let handle = tokio::spawn(pump(input, robot));
            let previous = self
                .reader
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .replace(handle);
            if let Some(previous) = previous {
                previous.abort();
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), BotError> {
        let reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = reader {
            handle.abort();
        }
        Ok(())
    }

    async fn send(&self, _envelope: &Envelope, messages: &[String]) -> Result<(), BotError> {
        for line in messages {
            println!("[BOT] {}", line);
        }
        Ok(())
    }

    async fn emote(&self, _envelope: &Envelope, messages: &[String]) -> Result<(), BotError> {
        for line in messages {
            println!("[BOT] * {}", line);
        }
        Ok(())
    }

    async fn reply(&self, envelope: &Envelope, messages: &[String]) -> Result<(), BotError> {
        for line in messages {
            println!("[BOT] {}: {}", envelope.user.name, line);
        }
        Ok(())
    }

    async fn topic(&self, _envelope: &Envelope, messages: &[String]) -> Result<(), BotError> {
        println!("[TOPIC] {}", messages.join(" / "));
        Ok(())
    }

    fn rooms(&self) -> Vec<String> {
        vec![CONSOLE_ROOM.to_string()]
    }

    fn log_rooms(&self) -> Vec<String> {
        self.log_rooms.clone()
    }
}
