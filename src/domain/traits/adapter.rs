use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::application::robot::Robot;
use crate::domain::entities::Envelope;

/// Adapter trait - abstraction for chat transports.
///
/// An adapter pushes inbound messages into [`Robot::receive`] and carries
/// outbound lines back to its network. Outbound operations other than `send`
/// default to no-ops for transports that lack them.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Identifier stamped on users created by this adapter
    fn id(&self) -> &str;

    /// Hand the adapter its robot before `run` is called
    fn initialize(&self, _robot: &Robot) {}

    /// Start consuming the transport. Resolves once the adapter is ready.
    async fn run(&self) -> Result<(), BotError>;

    /// Disconnect and release the transport
    async fn close(&self) -> Result<(), BotError>;

    /// Send lines to the envelope's room
    async fn send(&self, envelope: &Envelope, messages: &[String]) -> Result<(), BotError>;

    async fn emote(&self, _envelope: &Envelope, _messages: &[String]) -> Result<(), BotError> {
        Ok(())
    }

    async fn reply(&self, _envelope: &Envelope, _messages: &[String]) -> Result<(), BotError> {
        Ok(())
    }

    async fn topic(&self, _envelope: &Envelope, _messages: &[String]) -> Result<(), BotError> {
        Ok(())
    }

    async fn play(&self, _envelope: &Envelope, _messages: &[String]) -> Result<(), BotError> {
        Ok(())
    }

    /// Rooms this adapter has joined; used to route `Robot::speak`
    fn rooms(&self) -> Vec<String> {
        Vec::new()
    }

    /// Rooms that receive mirrored log output
    fn log_rooms(&self) -> Vec<String> {
        Vec::new()
    }
}
