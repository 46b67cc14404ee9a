//! Name-to-factory mapping for command construction.
//!
//! Built-ins are registered at startup; plugin entries come and go with
//! their plugin. Names are unique: a colliding registration is rejected
//! rather than silently overriding the existing entry. All methods take
//! `&mut self` or `&self`, so a lookup can never observe a factory
//! mid-registration.

use std::collections::HashMap;

use thiserror::Error;

use crate::command::Command;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a command named '{0}' is already registered")]
    DuplicateName(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("command '{0}' is not registered")]
    NotRegistered(String),
}

/// Produces a fresh command instance. `args` carries any tokens that
/// followed the command name on the input line; built-ins ignore them.
pub type CommandFactory = Box<dyn Fn(&[String]) -> Box<dyn Command>>;

pub struct CommandRegistry {
    factories: HashMap<String, CommandFactory>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Install a factory under `name`. Fails if the name is taken; the
    /// existing entry is left active.
    pub fn register(&mut self, name: &str, factory: CommandFactory) -> Result<(), RegistryError> {
        if self.factories.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    /// Remove the entry for `name`. Removing an absent name is an error,
    /// not a silent no-op.
    pub fn unregister(&mut self, name: &str) -> Result<(), RegistryError> {
        self.factories
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))
    }

    /// Instantiate a new command for `name`.
    pub fn create(&self, name: &str, args: &[String]) -> Result<Box<dyn Command>, RegistryError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::UnknownCommand(name.to_string()))?;
        Ok(factory(args))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// All registered names, sorted for stable display.
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.command_names())
            .finish()
    }
}
