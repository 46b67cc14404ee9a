//! Loading and driving a single plugin module.
//!
//! `PluginLoader` compiles and instantiates wasm modules; `PluginRuntime`
//! owns one live plugin instance (store, wasm instance, opaque handle)
//! and guarantees the plugin's deallocator runs exactly once, whether the
//! plugin is unloaded normally or a load fails partway through.

use std::path::Path;

use thiserror::Error;
use wasmer::{imports, Engine, Instance, Memory, Module, Store, Value};

use super::abi::{
    self, return_codes, EXPORT_ALLOC, EXPORT_API_VERSION, EXPORT_DEALLOC, EXPORT_DESCRIBE,
    EXPORT_INVOKE, EXPORT_MEMORY,
};
use super::{PluginDescriptor, PluginError};

/// Outcome of a single command invocation inside the plugin.
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("operands rejected by the plugin")]
    Domain,
    #[error("{0}")]
    Failed(String),
}

/// Compiles and instantiates plugin modules. The wasmer engine is shared
/// across all plugins.
pub struct PluginLoader {
    engine: Engine,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self {
            engine: Engine::default(),
        }
    }

    /// Open the module at `path`, resolve the required entry points,
    /// allocate the plugin instance, and gate on its declared API version.
    /// Any failure releases whatever was acquired; in particular a version
    /// mismatch still runs the plugin's deallocator.
    pub fn load(&self, path: &Path) -> Result<PluginRuntime, PluginError> {
        let bytes = std::fs::read(path).map_err(|e| {
            PluginError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read {}: {}", path.display(), e),
            ))
        })?;

        let mut store = Store::new(self.engine.clone());

        let module = Module::new(&store, &bytes)
            .map_err(|e| PluginError::Compilation(e.to_string()))?;

        // Plugins are pure compute: no host imports.
        let imports = imports! {};
        let instance = Instance::new(&mut store, &module, &imports)
            .map_err(|e| PluginError::Instantiation(e.to_string()))?;

        let memory = instance
            .exports
            .get_memory(EXPORT_MEMORY)
            .map_err(|_| PluginError::MissingExport(EXPORT_MEMORY))?
            .clone();

        // Resolve every required entry point before touching the instance.
        for name in [
            EXPORT_ALLOC,
            EXPORT_DEALLOC,
            EXPORT_API_VERSION,
            EXPORT_DESCRIBE,
            EXPORT_INVOKE,
        ] {
            instance
                .exports
                .get_function(name)
                .map_err(|_| PluginError::MissingExport(name))?;
        }

        let mut runtime = PluginRuntime {
            store,
            instance,
            memory,
            handle: 0,
            released: true,
        };

        let ret = runtime.call(EXPORT_ALLOC, &[])?;
        runtime.handle = ret_i32(&ret)
            .ok_or_else(|| PluginError::Call(format!("{EXPORT_ALLOC} returned no handle")))?;
        runtime.released = false;

        let found = runtime.api_version()?;
        if found != abi::API_VERSION {
            // runtime drops here, which runs the deallocator
            return Err(PluginError::ApiVersion {
                found,
                supported: abi::API_VERSION,
            });
        }

        Ok(runtime)
    }
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// One live plugin instance. Owns the wasmer store and the opaque handle
/// obtained from the plugin's allocator.
pub struct PluginRuntime {
    store: Store,
    instance: Instance,
    memory: Memory,
    handle: i32,
    released: bool,
}

impl PluginRuntime {
    fn call(&mut self, name: &str, params: &[Value]) -> Result<Box<[Value]>, PluginError> {
        let func = self
            .instance
            .exports
            .get_function(name)
            .map_err(|e| PluginError::Call(format!("export '{name}' unavailable: {e}")))?;
        func.call(&mut self.store, params)
            .map_err(|e| PluginError::Call(format!("{name}: {e}")))
    }

    /// The API generation the plugin was built against.
    pub fn api_version(&mut self) -> Result<i32, PluginError> {
        let ret = self.call(EXPORT_API_VERSION, &[Value::I32(self.handle)])?;
        ret_i32(&ret)
            .ok_or_else(|| PluginError::Call(format!("{EXPORT_API_VERSION} returned no value")))
    }

    /// Read and validate the plugin's JSON descriptor.
    pub fn describe(&mut self) -> Result<PluginDescriptor, PluginError> {
        let ret = self.call(
            EXPORT_DESCRIBE,
            &[
                Value::I32(self.handle),
                Value::I32(abi::DESCRIPTOR_OFFSET as i32),
                Value::I32(abi::DESCRIPTOR_CAPACITY as i32),
            ],
        )?;
        let len = ret_i32(&ret)
            .ok_or_else(|| PluginError::Call(format!("{EXPORT_DESCRIBE} returned no length")))?;
        if len <= 0 || len as u32 > abi::DESCRIPTOR_CAPACITY {
            return Err(PluginError::Descriptor(format!(
                "descriptor length {len} out of range"
            )));
        }

        let bytes = abi::read_bytes(&self.memory, &self.store, abi::DESCRIPTOR_OFFSET, len as u32)
            .ok_or_else(|| PluginError::Descriptor("descriptor bytes unreadable".into()))?;
        abi::parse_descriptor(&bytes)
    }

    /// Run one plugin command. `args` are the operands bottom to top; the
    /// result value is returned on success. The operand stack is never
    /// touched here, so a failed invocation has no side effects.
    pub fn invoke(&mut self, index: u32, args: &[f64]) -> Result<f64, InvokeError> {
        if args.len() > abi::MAX_ARITY {
            return Err(InvokeError::Failed(format!(
                "{} operands exceeds the ABI maximum of {}",
                args.len(),
                abi::MAX_ARITY
            )));
        }

        let mut buffer = Vec::with_capacity(args.len() * 8);
        for arg in args {
            buffer.extend_from_slice(&arg.to_le_bytes());
        }
        if !abi::write_bytes(&self.memory, &self.store, abi::ARGS_OFFSET, &buffer) {
            return Err(InvokeError::Failed("cannot write operands".into()));
        }

        let ret = self
            .call(
                EXPORT_INVOKE,
                &[
                    Value::I32(self.handle),
                    Value::I32(index as i32),
                    Value::I32(abi::ARGS_OFFSET as i32),
                    Value::I32(args.len() as i32),
                    Value::I32(abi::RESULT_OFFSET as i32),
                ],
            )
            .map_err(|e| InvokeError::Failed(e.to_string()))?;

        match ret_i32(&ret).unwrap_or(return_codes::ERROR) {
            return_codes::SUCCESS => {
                let bytes = abi::read_bytes(&self.memory, &self.store, abi::RESULT_OFFSET, 8)
                    .ok_or_else(|| InvokeError::Failed("result bytes unreadable".into()))?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes);
                Ok(f64::from_le_bytes(raw))
            }
            return_codes::DOMAIN_ERROR => Err(InvokeError::Domain),
            return_codes::BAD_COMMAND => {
                Err(InvokeError::Failed(format!("command index {index} unknown")))
            }
            code => Err(InvokeError::Failed(format!("plugin error code {code}"))),
        }
    }

    /// Run the plugin's deallocator. Safe to call more than once; only the
    /// first call reaches the plugin.
    pub fn release(&mut self) -> Result<(), PluginError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.call(EXPORT_DEALLOC, &[Value::I32(self.handle)])?;
        Ok(())
    }
}

impl Drop for PluginRuntime {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

impl std::fmt::Debug for PluginRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRuntime")
            .field("handle", &self.handle)
            .field("released", &self.released)
            .finish()
    }
}

fn ret_i32(values: &[Value]) -> Option<i32> {
    match values.first() {
        Some(Value::I32(v)) => Some(*v),
        _ => None,
    }
}
