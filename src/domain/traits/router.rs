use crate::application::errors::BotError;
use crate::application::robot::Robot;

/// Router trait - inbound webhook listener owned by the robot
pub trait Router: Send + Sync {
    fn initialize(&self, _robot: &Robot) {}

    fn configure(&self, port: u16);

    fn start(&self) -> Result<(), BotError>;

    fn stop(&self);
}
