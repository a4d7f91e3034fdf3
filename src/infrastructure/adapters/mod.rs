//! Chat transport adapters

pub mod console;
pub mod twitch;

pub use console::ConsoleAdapter;
pub use twitch::TwitchIrcAdapter;
