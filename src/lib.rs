//! rpcalc: the command core of an RPN calculator.
//!
//! This crate is the engine a front end (CLI, GUI, test harness) drives:
//! an observable operand stack, reversible commands with unbounded
//! undo/redo, a name-to-factory command registry, and runtime-loadable
//! WASM plugins behind a versioned binary ABI. It deliberately contains
//! no user interface; front ends attach through [`Calculator`] and the
//! [`EventSink`] trait.
//!
//! ```
//! use rpcalc::Calculator;
//!
//! let mut calc = Calculator::new();
//! calc.submit("3 4 + 2 *").unwrap();
//! assert_eq!(calc.top().unwrap(), 14.0);
//!
//! calc.submit("undo").unwrap();
//! assert_eq!(calc.top().unwrap(), 7.0);
//! ```

pub mod command;
pub mod config;
pub mod executor;
pub mod history;
pub mod lexer;
#[cfg(feature = "plugins")]
pub mod plugin;
pub mod registry;
pub mod stack;

pub use command::{register_builtins, Command, CommandError};
pub use config::{Config, ConfigError};
pub use executor::{CalcError, Calculator, EventSink};
pub use history::{HistoryError, UndoRedoEngine};
pub use lexer::{lex, LexError, Token};
#[cfg(feature = "plugins")]
pub use plugin::{PluginDescriptor, PluginError, PluginHost, API_VERSION};
pub use registry::{CommandFactory, CommandRegistry, RegistryError};
pub use stack::{OperandStack, StackError};

/// Evaluate one input line on a fresh calculator and return the stack,
/// bottom to top. Convenience for tests and one-shot embedding.
pub fn eval(input: &str) -> Result<Vec<f64>, CalcError> {
    let mut calc = Calculator::new();
    calc.submit(input)?;
    Ok(calc.stack_values())
}
