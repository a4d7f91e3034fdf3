//! Built-in chat commands
//!
//! The set is closed: each supported command is one `BuiltinCommand`
//! variant, and `register_builtins` wires the chosen variants into a
//! `CommandRegistry` at startup.

use rand::Rng;

use crate::application::errors::HandlerError;
use crate::domain::entities::CommandRegistry;
use crate::domain::traits::CommandHandler;

/// Largest die `!roll` accepts
pub const MAX_ROLL_SIDES: u32 = 1_000_000;
const DEFAULT_ROLL_SIDES: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinCommand {
    Ping,
    Roll,
    Echo,
    Commands,
}

impl BuiltinCommand {
    pub const ALL: [BuiltinCommand; 4] = [
        BuiltinCommand::Ping,
        BuiltinCommand::Roll,
        BuiltinCommand::Echo,
        BuiltinCommand::Commands,
    ];

    /// Bare name, as used in config
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinCommand::Ping => "ping",
            BuiltinCommand::Roll => "roll",
            BuiltinCommand::Echo => "echo",
            BuiltinCommand::Commands => "commands",
        }
    }

    /// Chat trigger, e.g. `!ping`
    pub fn trigger(&self) -> String {
        format!("!{}", self.name())
    }

    /// Accepts `ping` or `!ping`, any case
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().trim_start_matches('!').to_lowercase();
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    fn build(self, listed: &[String]) -> Box<dyn CommandHandler> {
        match self {
            BuiltinCommand::Ping => Box::new(PingCommand),
            BuiltinCommand::Roll => Box::new(RollCommand),
            BuiltinCommand::Echo => Box::new(EchoCommand),
            BuiltinCommand::Commands => Box::new(CommandsCommand {
                names: listed.to_vec(),
            }),
        }
    }
}

/// Register `commands` in `registry`. `!commands` lists exactly this set.
pub fn register_builtins(registry: &CommandRegistry, commands: &[BuiltinCommand]) {
    let listed: Vec<String> = commands.iter().map(BuiltinCommand::trigger).collect();
    for &command in commands {
        let listed = listed.clone();
        registry.register(command.trigger(), move || command.build(&listed));
    }
    if registry.is_empty() {
        tracing::warn!("No commands enabled; the bot will not answer anything");
    } else {
        tracing::info!("Registered {} commands: {}", registry.len(), registry.names().join(" "));
    }
}

pub struct PingCommand;

impl CommandHandler for PingCommand {
    fn handle(&self, _argument: Option<&str>) -> Result<Option<String>, HandlerError> {
        Ok(Some("pong".to_string()))
    }
}

/// `!roll [sides]` - roll a die with `sides` faces (default 6)
pub struct RollCommand;

impl RollCommand {
    fn sides(argument: Option<&str>) -> Result<u32, HandlerError> {
        let Some(arg) = argument else {
            return Ok(DEFAULT_ROLL_SIDES);
        };
        let sides: u32 = arg
            .parse()
            .map_err(|_| HandlerError::Execution(format!("!roll expects a number of sides, got {:?}", arg)))?;
        if sides == 0 || sides > MAX_ROLL_SIDES {
            return Err(HandlerError::Execution(format!(
                "!roll sides must be between 1 and {}, got {}",
                MAX_ROLL_SIDES, sides
            )));
        }
        Ok(sides)
    }
}

impl CommandHandler for RollCommand {
    fn handle(&self, argument: Option<&str>) -> Result<Option<String>, HandlerError> {
        let sides = Self::sides(argument)?;
        let value = rand::thread_rng().gen_range(1..=sides);
        Ok(Some(format!("rolled {} (d{})", value, sides)))
    }
}

pub struct EchoCommand;

impl CommandHandler for EchoCommand {
    fn handle(&self, argument: Option<&str>) -> Result<Option<String>, HandlerError> {
        match argument {
            Some(word) => Ok(Some(word.to_string())),
            None => Err(HandlerError::Execution("!echo needs a word to echo".to_string())),
        }
    }
}

pub struct CommandsCommand {
    names: Vec<String>,
}

impl CommandHandler for CommandsCommand {
    fn handle(&self, _argument: Option<&str>) -> Result<Option<String>, HandlerError> {
        Ok(Some(format!("Commands: {}", self.names.join(" "))))
    }
}
