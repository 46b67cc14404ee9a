//! Plugin ABI constants, memory helpers, and the descriptor format.
//!
//! Offsets and export names here are the binary contract between the core
//! and every plugin generation; changing any of them requires bumping
//! [`API_VERSION`]. The exchange window (`ARGS_OFFSET` up to the end of
//! the descriptor region) is host-reserved scratch inside plugin linear
//! memory: plugins must not keep live data there.

use serde::Deserialize;
use wasmer::{Memory, MemoryView, Store, WasmPtr};

use super::PluginError;

/// The API generation this core supports. Plugins declaring any other
/// value are rejected in full.
pub const API_VERSION: i32 = 2;

pub const EXPORT_ALLOC: &str = "rpcalc_plugin_alloc";
pub const EXPORT_DEALLOC: &str = "rpcalc_plugin_dealloc";
pub const EXPORT_API_VERSION: &str = "rpcalc_plugin_api_version";
pub const EXPORT_DESCRIBE: &str = "rpcalc_plugin_describe";
pub const EXPORT_INVOKE: &str = "rpcalc_plugin_invoke";
pub const EXPORT_MEMORY: &str = "memory";

/// Where the host writes invocation operands (little-endian f64s).
pub const ARGS_OFFSET: u32 = 1024;
/// Where the plugin writes the invocation result (one little-endian f64).
pub const RESULT_OFFSET: u32 = 2048;
/// Where the plugin writes its JSON descriptor on `describe`.
pub const DESCRIPTOR_OFFSET: u32 = 4096;
/// Maximum descriptor size in bytes.
pub const DESCRIPTOR_CAPACITY: u32 = 65536;

/// Most operands a single plugin command may declare.
pub const MAX_ARITY: usize = 8;

/// Return codes for `rpcalc_plugin_invoke`.
pub mod return_codes {
    /// Result written, stack transformation may proceed.
    pub const SUCCESS: i32 = 0;
    /// Mathematically invalid operands.
    pub const DOMAIN_ERROR: i32 = 1;
    /// Command index out of range.
    pub const BAD_COMMAND: i32 = 2;
    /// Any other plugin-side failure.
    pub const ERROR: i32 = 3;
}

/// Read bytes out of plugin linear memory.
pub fn read_bytes(memory: &Memory, store: &Store, ptr: u32, len: u32) -> Option<Vec<u8>> {
    if len == 0 {
        return Some(Vec::new());
    }
    if len > DESCRIPTOR_CAPACITY {
        return None;
    }

    let view: MemoryView = memory.view(store);
    let mut buffer = vec![0u8; len as usize];

    let wasm_ptr: WasmPtr<u8> = WasmPtr::new(ptr);
    let slice = wasm_ptr.slice(&view, len).ok()?;
    slice.read_slice(&mut buffer).ok()?;

    Some(buffer)
}

/// Write bytes into plugin linear memory. Returns false when the target
/// range is not addressable.
pub fn write_bytes(memory: &Memory, store: &Store, ptr: u32, data: &[u8]) -> bool {
    if data.is_empty() {
        return true;
    }

    let view: MemoryView = memory.view(store);
    let wasm_ptr: WasmPtr<u8> = WasmPtr::new(ptr);

    match wasm_ptr.slice(&view, data.len() as u32) {
        Ok(slice) => slice.write_slice(data).is_ok(),
        Err(_) => false,
    }
}

/// Plugin self-description, read as JSON out of plugin memory.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginDescriptor {
    /// Display name; also the key for unload.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Commands this plugin exposes, invoked by positional index.
    #[serde(default)]
    pub commands: Vec<CommandSpec>,

    /// Button decoration metadata for graphical front ends. Carried
    /// through to the front end, never interpreted by the core.
    #[serde(default)]
    pub buttons: Vec<ButtonSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    /// Registry name for the command.
    pub name: String,

    /// How many operands the command pops.
    pub arity: u32,

    #[serde(default)]
    pub help: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ButtonSpec {
    pub label: String,
    pub command: String,

    /// Command bound to the shifted state of the button, if any.
    #[serde(default)]
    pub shifted: Option<String>,
}

/// Parse and validate a descriptor read from plugin memory.
pub fn parse_descriptor(bytes: &[u8]) -> Result<PluginDescriptor, PluginError> {
    let descriptor: PluginDescriptor = serde_json::from_slice(bytes)
        .map_err(|e| PluginError::Descriptor(format!("invalid JSON: {e}")))?;
    descriptor.validate()?;
    Ok(descriptor)
}

impl PluginDescriptor {
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.name.trim().is_empty() {
            return Err(PluginError::Descriptor("plugin name is empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for command in &self.commands {
            if command.name.trim().is_empty() {
                return Err(PluginError::Descriptor(format!(
                    "plugin '{}' declares a command with an empty name",
                    self.name
                )));
            }
            if !seen.insert(command.name.as_str()) {
                return Err(PluginError::Descriptor(format!(
                    "plugin '{}' declares command '{}' twice",
                    self.name, command.name
                )));
            }
            if command.arity == 0 || command.arity as usize > MAX_ARITY {
                return Err(PluginError::Descriptor(format!(
                    "command '{}' declares arity {} (must be 1..={MAX_ARITY})",
                    command.name, command.arity
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_descriptor() {
        let json = br#"{
            "name": "hyperbolic",
            "description": "hyperbolic trig functions",
            "commands": [
                {"name": "sinh", "arity": 1, "help": "hyperbolic sine"},
                {"name": "lnh", "arity": 1}
            ],
            "buttons": [
                {"label": "sinh", "command": "sinh", "shifted": "arcsinh"}
            ]
        }"#;
        let descriptor = parse_descriptor(json).unwrap();
        assert_eq!(descriptor.name, "hyperbolic");
        assert_eq!(descriptor.commands.len(), 2);
        assert_eq!(descriptor.commands[1].name, "lnh");
        assert_eq!(descriptor.commands[1].help, "");
        assert_eq!(descriptor.buttons[0].shifted.as_deref(), Some("arcsinh"));
    }

    #[test]
    fn bad_json_is_a_descriptor_error() {
        let err = parse_descriptor(b"not json").unwrap_err();
        assert!(matches!(err, PluginError::Descriptor(_)));
    }

    #[test]
    fn empty_plugin_name_rejected() {
        let err = parse_descriptor(br#"{"name": "  "}"#).unwrap_err();
        assert!(matches!(err, PluginError::Descriptor(_)));
    }

    #[test]
    fn duplicate_command_names_rejected() {
        let json = br#"{
            "name": "p",
            "commands": [
                {"name": "f", "arity": 1},
                {"name": "f", "arity": 2}
            ]
        }"#;
        assert!(matches!(
            parse_descriptor(json),
            Err(PluginError::Descriptor(_))
        ));
    }

    #[test]
    fn arity_bounds_enforced() {
        let zero = br#"{"name": "p", "commands": [{"name": "f", "arity": 0}]}"#;
        assert!(parse_descriptor(zero).is_err());

        let huge = br#"{"name": "p", "commands": [{"name": "f", "arity": 9}]}"#;
        assert!(parse_descriptor(huge).is_err());
    }
}
