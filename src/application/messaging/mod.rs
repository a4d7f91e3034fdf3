//! Message handling - Command parsing and dispatch

pub mod dispatcher;
pub mod parser;

pub use dispatcher::{DispatchOutcome, DispatchState, DispatchStats, Dispatcher};
pub use parser::parse_command;
