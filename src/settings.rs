use crate::compiler::compiler_errors::CompileError;
use serde::Deserialize;

/// Import module name for the Fern runtime intrinsics.
/// Every dynamic-value, alias-cell and global-table operation the backend
/// emits is a call into this module.
pub const RUNTIME_IMPORT_MODULE: &str = "fern_rt";

pub const DEFAULT_MODULE_NAME: &str = "fern_module";

// Rough guess for how many instructions a routine's variable initialization
// section needs. Just a heuristic to avoid early re-allocations of the body vec.
pub const INIT_SECTION_CAPACITY: usize = 16;

/// Backend configuration, usually deserialized from the driver's project TOML.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name baked into diagnostics for the emitted module
    pub module_name: String,

    /// Run wasmparser validation over the finished module bytes
    pub validate_output: bool,

    /// Export every compiled routine by name from the module
    pub export_routines: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            module_name: DEFAULT_MODULE_NAME.to_string(),
            validate_output: true,
            export_routines: true,
        }
    }
}

impl Config {
    pub fn from_toml_str(source: &str) -> Result<Config, CompileError> {
        toml::from_str(source).map_err(|e| {
            CompileError::config_error(format!("Malformed backend config: {e}"))
        })
    }
}
