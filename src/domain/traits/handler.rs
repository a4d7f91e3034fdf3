use crate::application::errors::HandlerError;

/// A chat command implementation.
///
/// Handlers are built per invocation and hold no state between messages.
/// `Ok(Some(text))` asks the dispatcher to reply with `text`.
pub trait CommandHandler: Send {
    fn handle(&self, argument: Option<&str>) -> Result<Option<String>, HandlerError>;
}
