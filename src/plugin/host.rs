//! Plugin host: lifecycle coordination and command registration.
//!
//! The host tracks every loaded plugin, merges plugin commands into the
//! registry with no partial registration, and enforces the unload order:
//! unregister commands, evict the plugin's commands from the undo/redo
//! histories, then release the module.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::command::{Command, CommandError};
use crate::history::UndoRedoEngine;
use crate::registry::{CommandFactory, CommandRegistry};
use crate::stack::OperandStack;

use super::abi::CommandSpec;
use super::loader::{InvokeError, PluginLoader, PluginRuntime};
use super::{PluginDescriptor, PluginError};

/// Bookkeeping for one loaded plugin.
pub struct LoadedPlugin {
    pub descriptor: PluginDescriptor,
    pub path: PathBuf,
    runtime: Rc<RefCell<PluginRuntime>>,
    /// Command names this plugin contributed to the registry.
    commands: Vec<String>,
}

pub struct PluginHost {
    loader: PluginLoader,
    plugins: HashMap<String, LoadedPlugin>,
}

impl PluginHost {
    pub fn new() -> Self {
        Self {
            loader: PluginLoader::new(),
            plugins: HashMap::new(),
        }
    }

    /// Load the module at `path` and register its commands. Any failure
    /// (unopenable module, missing export, API version mismatch, name
    /// collision) aborts the whole load: no command is left registered and
    /// the plugin instance is released. Returns the plugin's name.
    pub fn load_plugin(
        &mut self,
        path: &Path,
        registry: &mut CommandRegistry,
    ) -> Result<String, PluginError> {
        let mut runtime = self.loader.load(path)?;
        let descriptor = runtime.describe()?;

        if self.plugins.contains_key(&descriptor.name) {
            return Err(PluginError::AlreadyLoaded(descriptor.name));
        }
        check_registration(&descriptor, registry)?;

        let runtime = Rc::new(RefCell::new(runtime));
        let mut commands: Vec<String> = Vec::new();
        for (index, spec) in descriptor.commands.iter().enumerate() {
            let factory = plugin_command_factory(
                descriptor.name.clone(),
                spec.clone(),
                index as u32,
                Rc::clone(&runtime),
            );
            if registry.register(&spec.name, factory).is_err() {
                // pre-checked above; unwind whatever did land
                for registered in &commands {
                    let _ = registry.unregister(registered);
                }
                return Err(PluginError::DuplicateCommand(spec.name.clone()));
            }
            commands.push(spec.name.clone());
        }

        let name = descriptor.name.clone();
        self.plugins.insert(
            name.clone(),
            LoadedPlugin {
                descriptor,
                path: path.to_path_buf(),
                runtime,
                commands,
            },
        );
        Ok(name)
    }

    /// Unload a plugin by name. Its commands leave the registry and both
    /// undo/redo histories before the module is released, so no history
    /// entry can call into a freed instance.
    pub fn unload_plugin(
        &mut self,
        name: &str,
        registry: &mut CommandRegistry,
        history: &mut UndoRedoEngine,
    ) -> Result<(), PluginError> {
        let plugin = self
            .plugins
            .remove(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;

        for command in &plugin.commands {
            if let Err(e) = registry.unregister(command) {
                eprintln!("Warning: unloading '{name}': {e}");
            }
        }
        history.purge_plugin(name);

        if let Err(e) = plugin.runtime.borrow_mut().release() {
            eprintln!("Warning: deallocating '{name}': {e}");
        }
        Ok(())
    }

    /// Load every `*.wasm` module in a directory, skipping (with a
    /// warning) any that fails. Returns the names loaded, in path order.
    pub fn load_dir(
        &mut self,
        dir: &Path,
        registry: &mut CommandRegistry,
    ) -> Result<Vec<String>, PluginError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map_or(false, |ext| ext == "wasm"))
            .collect();
        paths.sort();

        let mut loaded = Vec::new();
        for path in paths {
            match self.load_plugin(&path, registry) {
                Ok(name) => loaded.push(name),
                Err(e) => {
                    eprintln!("Warning: failed to load plugin {}: {}", path.display(), e);
                }
            }
        }
        Ok(loaded)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Names of all loaded plugins, sorted.
    pub fn plugin_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn descriptor(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins.get(name).map(|p| &p.descriptor)
    }

    /// Command names a loaded plugin contributed.
    pub fn plugin_commands(&self, name: &str) -> Option<&[String]> {
        self.plugins.get(name).map(|p| p.commands.as_slice())
    }
}

impl Default for PluginHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHost")
            .field("plugins", &self.plugin_names())
            .finish()
    }
}

/// Reject the load before registering anything if any declared command
/// name collides with the registry or repeats within the descriptor.
fn check_registration(
    descriptor: &PluginDescriptor,
    registry: &CommandRegistry,
) -> Result<(), PluginError> {
    let mut seen = std::collections::HashSet::new();
    for spec in &descriptor.commands {
        if registry.contains(&spec.name) || !seen.insert(spec.name.as_str()) {
            return Err(PluginError::DuplicateCommand(spec.name.clone()));
        }
    }
    Ok(())
}

fn plugin_command_factory(
    plugin: String,
    spec: CommandSpec,
    index: u32,
    runtime: Rc<RefCell<PluginRuntime>>,
) -> CommandFactory {
    Box::new(move |_args| {
        Box::new(PluginCommand {
            name: spec.name.clone(),
            help: spec.help.clone(),
            plugin: plugin.clone(),
            index,
            arity: spec.arity as usize,
            runtime: Rc::clone(&runtime),
            captured: Vec::new(),
        })
    })
}

/// A registry command backed by a plugin invocation. Operands are peeked,
/// handed to the plugin, and only popped once the plugin reports success,
/// so execution stays all-or-nothing; the popped operands are the undo
/// capture.
struct PluginCommand {
    name: String,
    help: String,
    plugin: String,
    index: u32,
    arity: usize,
    runtime: Rc<RefCell<PluginRuntime>>,
    /// Operands consumed by the last execute, bottom to top.
    captured: Vec<f64>,
}

impl Command for PluginCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, stack: &mut OperandStack) -> Result<(), CommandError> {
        let mut args = stack
            .snapshot(self.arity)
            .map_err(|_| CommandError::Underflow(self.name.clone(), self.arity))?;
        args.reverse(); // snapshot is top first; the ABI takes bottom to top

        let result = self
            .runtime
            .borrow_mut()
            .invoke(self.index, &args)
            .map_err(|e| match e {
                InvokeError::Domain => {
                    CommandError::Domain(self.name.clone(), "rejected by plugin".into())
                }
                InvokeError::Failed(why) => CommandError::Plugin(self.name.clone(), why),
            })?;

        for _ in 0..self.arity {
            let _ = stack.pop();
        }
        stack.push(result);
        self.captured = args;
        Ok(())
    }

    fn undo(&mut self, stack: &mut OperandStack) {
        let _ = stack.pop();
        for value in self.captured.drain(..) {
            stack.push(value);
        }
    }

    fn help(&self) -> &str {
        &self.help
    }

    fn provenance(&self) -> Option<&str> {
        Some(&self.plugin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::register_builtins;

    fn descriptor(commands: &[(&str, u32)]) -> PluginDescriptor {
        let json = serde_json::json!({
            "name": "test-plugin",
            "commands": commands
                .iter()
                .map(|(name, arity)| serde_json::json!({"name": name, "arity": arity}))
                .collect::<Vec<_>>(),
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn registration_precheck_accepts_fresh_names() {
        let mut registry = CommandRegistry::new();
        register_builtins(&mut registry).unwrap();
        let descriptor = descriptor(&[("sinh", 1), ("cosh", 1)]);
        assert!(check_registration(&descriptor, &registry).is_ok());
    }

    #[test]
    fn registration_precheck_rejects_builtin_collision() {
        let mut registry = CommandRegistry::new();
        register_builtins(&mut registry).unwrap();
        let descriptor = descriptor(&[("sinh", 1), ("sin", 1)]);
        assert!(matches!(
            check_registration(&descriptor, &registry),
            Err(PluginError::DuplicateCommand(name)) if name == "sin"
        ));
    }

    #[test]
    fn registration_precheck_rejects_internal_duplicate() {
        let registry = CommandRegistry::new();
        let descriptor = descriptor(&[("f", 1), ("f", 2)]);
        assert!(matches!(
            check_registration(&descriptor, &registry),
            Err(PluginError::DuplicateCommand(_))
        ));
    }

    #[test]
    fn unload_of_unknown_plugin_fails() {
        let mut host = PluginHost::new();
        let mut registry = CommandRegistry::new();
        let mut history = UndoRedoEngine::new();
        assert!(matches!(
            host.unload_plugin("ghost", &mut registry, &mut history),
            Err(PluginError::NotFound(_))
        ));
    }

    #[test]
    fn empty_host_reports_nothing_loaded() {
        let host = PluginHost::new();
        assert!(!host.is_loaded("anything"));
        assert!(host.plugin_names().is_empty());
        assert!(host.descriptor("anything").is_none());
    }
}
