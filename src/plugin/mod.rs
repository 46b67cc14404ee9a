//! WASM command plugins.
//!
//! Plugins are WebAssembly modules (target `wasm32-unknown-unknown`, no
//! host imports) that extend the command set at runtime through a small,
//! versioned binary ABI. Every export uses flat integers and linear
//! memory, so any language that can emit unmangled wasm exports can
//! implement a plugin.
//!
//! # Required exports
//!
//! | export                      | signature                                                                  |
//! |-----------------------------|----------------------------------------------------------------------------|
//! | `rpcalc_plugin_alloc`       | `() -> i32` opaque instance handle                                         |
//! | `rpcalc_plugin_dealloc`     | `(handle: i32)` free all plugin-owned resources                            |
//! | `rpcalc_plugin_api_version` | `(handle: i32) -> i32`                                                     |
//! | `rpcalc_plugin_describe`    | `(handle, ptr, cap: i32) -> i32` bytes of JSON descriptor written at `ptr` |
//! | `rpcalc_plugin_invoke`      | `(handle, index, args_ptr, argc, out_ptr: i32) -> i32` return code         |
//! | `memory`                    | the module's linear memory                                                 |
//!
//! # Lifecycle
//!
//! The loader allocates the instance handle, gates on the declared API
//! version (a mismatch rejects the plugin in full, before any command is
//! registered), reads the JSON descriptor out of plugin memory, and
//! registers one command per descriptor entry. The deallocator runs
//! exactly once, on unload or on any failed load path. At unload the
//! plugin's commands are unregistered and evicted from the undo/redo
//! histories before the module is released, so nothing can call into a
//! freed instance.
//!
//! # Invocation
//!
//! The host writes a command's operands as little-endian `f64` values
//! into the exchange window of plugin memory (see [`abi`]), calls
//! `rpcalc_plugin_invoke`, and reads the `f64` result back on a zero
//! return code. A nonzero code maps into the command error taxonomy and
//! leaves the operand stack untouched.

pub mod abi;
mod host;
mod loader;

pub use abi::{ButtonSpec, CommandSpec, PluginDescriptor, API_VERSION};
pub use host::PluginHost;
pub use loader::{PluginLoader, PluginRuntime};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WASM compilation error: {0}")]
    Compilation(String),

    #[error("WASM instantiation error: {0}")]
    Instantiation(String),

    #[error("plugin is missing required export '{0}'")]
    MissingExport(&'static str),

    #[error("plugin declares API version {found}, core supports {supported}")]
    ApiVersion { found: i32, supported: i32 },

    #[error("plugin descriptor error: {0}")]
    Descriptor(String),

    #[error("plugin call failed: {0}")]
    Call(String),

    #[error("plugin not loaded: {0}")]
    NotFound(String),

    #[error("plugin '{0}' is already loaded")]
    AlreadyLoaded(String),

    #[error("plugin command '{0}' collides with an existing command")]
    DuplicateCommand(String),
}
