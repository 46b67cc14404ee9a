//! The calculator façade driven by front ends.
//!
//! `Calculator` is the single context object owning the operand stack, the
//! command registry (built-ins pre-installed), the undo/redo engine, and
//! the plugin host. Front ends submit text through [`Calculator::command_entered`]
//! and observe results through registered [`EventSink`]s; they never touch
//! the stack or the histories directly.
//!
//! # Input grammar
//!
//! Input splits on whitespace and every token is one command, processed
//! strictly left to right: a numeric literal pushes itself (undoably), the
//! reserved words `undo` and `redo` drive the history engine, and any
//! other token is resolved through the registry. Processing stops at the
//! first failure; commands already executed on the line stay applied (and
//! undoable). `3 4 +` therefore pushes 3, pushes 4, then adds.

use std::cell::RefCell;
#[cfg(feature = "plugins")]
use std::path::Path;
use std::rc::Rc;

use thiserror::Error;

use crate::command::{register_builtins, CommandError, EnterNumber};
use crate::config::Config;
use crate::history::{HistoryError, UndoRedoEngine};
use crate::lexer::{lex, LexError, Token};
#[cfg(feature = "plugins")]
use crate::plugin::{PluginError, PluginHost};
use crate::registry::{CommandRegistry, RegistryError};
use crate::stack::{OperandStack, StackError};

/// Any failure a submitted command line can produce. The façade converts
/// these into user-facing messages; none of them corrupts calculator
/// state, because every failing operation below is transactional.
#[derive(Error, Debug)]
pub enum CalcError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[cfg(feature = "plugins")]
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

/// Outbound notifications to a front end. `stack_changed` fires
/// synchronously after every stack mutation with the top values (top
/// first, depth-limited); `message` carries every user-facing error or
/// report as a human-readable string.
pub trait EventSink {
    fn stack_changed(&mut self, top: &[f64]);
    fn message(&mut self, text: &str);
}

pub struct Calculator {
    stack: OperandStack,
    registry: CommandRegistry,
    history: UndoRedoEngine,
    #[cfg(feature = "plugins")]
    plugins: PluginHost,
    sinks: Vec<Rc<RefCell<dyn EventSink>>>,
}

impl Calculator {
    pub fn new() -> Self {
        let mut registry = CommandRegistry::new();
        register_builtins(&mut registry).expect("built-in command set is collision free");
        Self {
            stack: OperandStack::new(),
            registry,
            history: UndoRedoEngine::new(),
            #[cfg(feature = "plugins")]
            plugins: PluginHost::new(),
            sinks: Vec::new(),
        }
    }

    /// Build a calculator from user configuration: display depth applies
    /// to stack notifications, and plugins autoload from `plugin_dir`
    /// when enabled. A plugin that fails to load is skipped with a
    /// warning; it never prevents startup.
    pub fn with_config(config: &Config) -> Self {
        let mut calc = Self::new();
        calc.stack.set_display_depth(config.display_depth);
        #[cfg(feature = "plugins")]
        if config.autoload_plugins {
            if let Some(dir) = &config.plugin_dir {
                if dir.is_dir() {
                    if let Err(e) = calc.plugins.load_dir(dir, &mut calc.registry) {
                        eprintln!(
                            "Warning: scanning plugin directory {}: {}",
                            dir.display(),
                            e
                        );
                    }
                }
            }
        }
        calc
    }

    /// Register a front-end sink. Stack notifications start immediately.
    pub fn add_sink(&mut self, sink: Rc<RefCell<dyn EventSink>>) {
        let observer = Rc::clone(&sink);
        self.stack
            .add_observer(Box::new(move |top| observer.borrow_mut().stack_changed(top)));
        self.sinks.push(sink);
    }

    /// The front-end entry point: run one input line, reporting any
    /// failure through `message` sinks instead of returning it. A bad
    /// command never aborts the process or corrupts the stack.
    pub fn command_entered(&mut self, text: &str) {
        if let Err(e) = self.submit(text) {
            self.emit_message(&e.to_string());
        }
    }

    /// Run one input line, surfacing the first failure to the caller.
    pub fn submit(&mut self, text: &str) -> Result<(), CalcError> {
        for token in lex(text)? {
            match token {
                Token::Number(value) => {
                    self.history
                        .execute(Box::new(EnterNumber::new(value)), &mut self.stack)?;
                }
                Token::Word(word) if word == "undo" => {
                    self.history.undo(&mut self.stack)?;
                }
                Token::Word(word) if word == "redo" => {
                    self.history.redo(&mut self.stack)?;
                }
                Token::Word(word) => {
                    let command = self.registry.create(&word, &[])?;
                    self.history.execute(command, &mut self.stack)?;
                }
            }
        }
        Ok(())
    }

    /// Load a plugin module and merge its commands into the registry.
    #[cfg(feature = "plugins")]
    pub fn load_plugin(&mut self, path: &Path) -> Result<String, CalcError> {
        Ok(self.plugins.load_plugin(path, &mut self.registry)?)
    }

    /// Unload a plugin: its commands leave the registry and both
    /// histories before the module is released.
    #[cfg(feature = "plugins")]
    pub fn unload_plugin(&mut self, name: &str) -> Result<(), CalcError> {
        Ok(self
            .plugins
            .unload_plugin(name, &mut self.registry, &mut self.history)?)
    }

    #[cfg(feature = "plugins")]
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.plugin_names()
    }

    // Read-only accessors for front ends.

    pub fn top(&self) -> Result<f64, StackError> {
        self.stack.top()
    }

    pub fn stack_size(&self) -> usize {
        self.stack.size()
    }

    /// Top `n` values, top first; fails if fewer exist.
    pub fn stack_snapshot(&self, n: usize) -> Result<Vec<f64>, StackError> {
        self.stack.snapshot(n)
    }

    /// All stack values, bottom to top.
    pub fn stack_values(&self) -> Vec<f64> {
        self.stack.values().to_vec()
    }

    pub fn command_names(&self) -> Vec<&str> {
        self.registry.command_names()
    }

    pub fn undo_len(&self) -> usize {
        self.history.undo_len()
    }

    pub fn redo_len(&self) -> usize {
        self.history.redo_len()
    }

    fn emit_message(&mut self, text: &str) {
        for sink in &self.sinks {
            sink.borrow_mut().message(text);
        }
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}
