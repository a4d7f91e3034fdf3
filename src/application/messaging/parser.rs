//! Command parser - Extracts command invocations from chat text

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::domain::entities::CommandInvocation;

/// `!name` optionally followed by whitespace and one argument token
static COMMAND_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(!\w+)(?:\s+(\w+))?").expect("command pattern is valid")
});

/// Parse a chat line into a command invocation.
///
/// Returns `None` for anything that is not a command. Only the first token
/// after the name is captured; the rest of the line is dropped.
pub fn parse_command(text: &str) -> Option<CommandInvocation> {
    let caps = COMMAND_PATTERN.captures(text)?;
    let name = caps.get(1)?.as_str().to_string();
    let argument = caps.get(2).map(|m| m.as_str().to_string());
    Some(CommandInvocation::new(name, argument))
}
