use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::traits::CommandHandler;

/// A command extracted from a chat line, e.g. `!roll 20`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Command name including the leading `!`
    pub name: String,
    pub argument: Option<String>,
}

impl CommandInvocation {
    pub fn new(name: impl Into<String>, argument: Option<String>) -> Self {
        Self {
            name: name.into(),
            argument,
        }
    }
}

/// Builds a fresh handler instance for one invocation
pub type HandlerFactory = Arc<dyn Fn() -> Box<dyn CommandHandler> + Send + Sync>;

/// Maps command names to handler factories.
///
/// Lookups are case-insensitive. `resolve` builds a new handler on every
/// hit; nothing resolved is cached, so commands registered while the bot is
/// running are visible to the next message.
#[derive(Default)]
pub struct CommandRegistry {
    factories: RwLock<HashMap<String, HandlerFactory>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for a command name
    pub fn register<F>(&self, name: impl AsRef<str>, factory: F)
    where
        F: Fn() -> Box<dyn CommandHandler> + Send + Sync + 'static,
    {
        let key = normalize(name.as_ref());
        tracing::debug!("Registering command {}", key);
        self.write().insert(key, Arc::new(factory));
    }

    /// Resolve a handler for `name`. `None` means "not a command we know".
    pub fn resolve(&self, name: &str) -> Option<Box<dyn CommandHandler>> {
        let factory = self.read().get(&normalize(name)).cloned()?;
        Some(factory())
    }

    /// Registered command names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, HandlerFactory>> {
        self.factories.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, HandlerFactory>> {
        self.factories.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn normalize(name: &str) -> String {
    let name = name.trim().to_lowercase();
    if name.starts_with('!') {
        name
    } else {
        format!("!{}", name)
    }
}
