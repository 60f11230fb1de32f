//! Built-in scripts shipped with the robot

use std::sync::Arc;

use super::registry::ScriptRegistry;
use super::trait_def::Script;
use crate::application::errors::BotError;
use crate::application::messaging::Response;
use crate::application::robot::Robot;
use crate::domain::entities::TextMessage;

/// `ping` and `echo`
pub struct PingScript;

impl Script for PingScript {
    fn name(&self) -> &str {
        "ping"
    }

    fn description(&self) -> Option<&str> {
        Some("Liveness checks")
    }

    fn help(&self) -> Vec<String> {
        vec![
            "mmbot ping - Reply with PONG".to_string(),
            "mmbot echo <text> - Reply back with <text>".to_string(),
        ]
    }

    fn register(&self, robot: &Robot) -> Result<(), BotError> {
        robot.respond("ping$", |res| async move {
            res.send(["PONG"]).await?;
            res.finish();
            Ok(())
        })?;

        robot.respond("echo (.*)$", |res| async move {
            let text = res.capture(1).unwrap_or_default().to_string();
            res.send([text]).await?;
            res.finish();
            Ok(())
        })?;

        Ok(())
    }
}

/// Lists help commands, optionally filtered
pub struct HelpScript;

fn help_lines(robot: &Robot, filter: Option<&str>) -> Vec<String> {
    let name = robot.name();
    let filter = filter.map(str::to_lowercase);

    let mut lines: Vec<String> = robot
        .help_commands()
        .into_iter()
        .map(|command| command.replace("mmbot", &name))
        .filter(|command| match &filter {
            Some(f) => command.to_lowercase().contains(f.as_str()),
            None => true,
        })
        .collect();
    lines.sort();
    lines.dedup();

    if lines.is_empty() {
        lines.push(match filter {
            Some(f) => format!("No available commands match {}", f),
            None => "No help available".to_string(),
        });
    }
    lines
}

impl Script for HelpScript {
    fn name(&self) -> &str {
        "help"
    }

    fn description(&self) -> Option<&str> {
        Some("Displays help for loaded scripts")
    }

    fn help(&self) -> Vec<String> {
        vec![
            "mmbot help - Displays all of the help commands that mmbot knows about".to_string(),
            "mmbot help <query> - Displays all help commands that match <query>".to_string(),
        ]
    }

    fn register(&self, robot: &Robot) -> Result<(), BotError> {
        robot.respond(r"help(?:\s+(.*))?$", |res| async move {
            let lines = help_lines(res.robot(), res.capture(1));
            res.send(lines).await?;
            res.finish();
            Ok(())
        })
    }
}

/// Role management and reset, admins only
pub struct RolesScript;

async fn require_admin(res: &Response<TextMessage>) -> Result<bool, BotError> {
    if res.robot().is_admin(&res.user().name) {
        return Ok(true);
    }
    res.reply(["Sorry, only admins can do that"]).await?;
    res.finish();
    Ok(false)
}

impl Script for RolesScript {
    fn name(&self) -> &str {
        "roles"
    }

    fn description(&self) -> Option<&str> {
        Some("Assign roles to users and restart the robot")
    }

    fn help(&self) -> Vec<String> {
        vec![
            "mmbot <user> has <role> role - Assigns a role to a user".to_string(),
            "mmbot <user> doesn't have <role> role - Removes a role from a user".to_string(),
            "mmbot what roles does <user> have - Find out what roles a user has".to_string(),
            "mmbot reset - Restart the robot".to_string(),
        ]
    }

    fn register(&self, robot: &Robot) -> Result<(), BotError> {
        robot.respond(r"(\S+) has (\S+) role$", |res| async move {
            if !require_admin(&res).await? {
                return Ok(());
            }
            let user = res.capture(1).unwrap_or_default().to_string();
            let role = res.capture(2).unwrap_or_default().to_string();
            res.robot().roles().add(&user, &[role.as_str()]).await?;
            res.send([format!("{} has the {} role", user, role)]).await?;
            res.finish();
            Ok(())
        })?;

        robot.respond(r"(\S+) (?:doesn't|does not) have (\S+) role$", |res| async move {
            if !require_admin(&res).await? {
                return Ok(());
            }
            let user = res.capture(1).unwrap_or_default().to_string();
            let role = res.capture(2).unwrap_or_default().to_string();
            res.robot().roles().remove(&user, &role).await?;
            res.send([format!("{} no longer has the {} role", user, role)]).await?;
            res.finish();
            Ok(())
        })?;

        robot.respond(r"what roles? does (\S+) have\??$", |res| async move {
            let user = res.capture(1).unwrap_or_default().to_string();
            let roles = res.robot().roles().roles_for(&user).await?;
            let line = if roles.is_empty() {
                format!("{} has no roles", user)
            } else {
                format!("{} has the following roles: {}", user, roles.join(", "))
            };
            res.send([line]).await?;
            res.finish();
            Ok(())
        })?;

        robot.respond("reset$", |res| async move {
            if !require_admin(&res).await? {
                return Ok(());
            }
            res.send(["Resetting..."]).await?;
            res.finish();

            // Reset closes the adapter that delivered this message
            let robot = res.robot().clone();
            tokio::spawn(async move { robot.reset().await });
            Ok(())
        })?;

        Ok(())
    }
}

impl ScriptRegistry {
    /// Registry preloaded with the built-in scripts
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        let builtins: [Arc<dyn Script>; 3] =
            [Arc::new(PingScript), Arc::new(HelpScript), Arc::new(RolesScript)];
        for script in builtins {
            if let Err(e) = registry.register(script) {
                tracing::warn!(error = %e, "Skipping built-in script");
            }
        }
        registry
    }
}
