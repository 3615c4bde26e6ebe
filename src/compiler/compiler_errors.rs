use colour::{e_dark_magenta, e_red_ln, e_yellow_ln};
use std::collections::HashMap;

/// Structured keys for extra diagnostic context attached to a CompileError.
/// Optimized for tooling that wants to understand exactly what went wrong
/// without parsing the message string.
#[derive(Debug, Eq, Hash, PartialEq)]
pub enum ErrorMetaDataKey {
    VariableName,
    RoutineName,
    CompilationStage,

    // Representation / conversion information
    ExpectedType,
    FoundType,
    Representation,
}

#[derive(Debug)]
pub struct CompileError {
    pub msg: String,
    pub error_type: ErrorType,

    // This is for creating more structured and detailed error messages.
    // Internal invariant violations always carry VariableName / RoutineName
    // entries so the offending binding can be identified from the diagnostic.
    pub metadata: HashMap<ErrorMetaDataKey, String>,
}

impl CompileError {
    pub fn new(msg: impl Into<String>, error_type: ErrorType) -> CompileError {
        CompileError {
            msg: msg.into(),
            error_type,
            metadata: HashMap::new(),
        }
    }

    /// An internal compiler bug (broken invariant), never a user code issue
    pub fn compiler_error(msg: impl Into<String>) -> Self {
        CompileError::new(msg, ErrorType::Compiler)
    }

    /// A failure while lowering or assembling the output module
    pub fn codegen_error(msg: impl Into<String>) -> Self {
        CompileError::new(msg, ErrorType::Codegen)
    }

    /// The emitted module failed wasmparser validation
    pub fn validation_error(msg: impl Into<String>) -> Self {
        CompileError::new(msg, ErrorType::Validation)
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        CompileError::new(msg, ErrorType::Config)
    }

    pub fn with_metadata(mut self, key: ErrorMetaDataKey, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value.into());
        self
    }
}

#[derive(Debug, PartialEq)]
pub enum ErrorType {
    Compiler,
    Codegen,
    Validation,
    Config,
}

pub fn error_type_to_str(e_type: &ErrorType) -> &'static str {
    match e_type {
        ErrorType::Compiler => "Compiler Bug",
        ErrorType::Codegen => "Codegen Error",
        ErrorType::Validation => "WASM Validation",
        ErrorType::Config => "Malformed Config",
    }
}

pub fn print_formatted_error(e: &CompileError) {
    e_dark_magenta!("[{}] ", error_type_to_str(&e.error_type));
    e_red_ln!("{}", e.msg);

    for (key, value) in &e.metadata {
        e_yellow_ln!("  {:?}: {}", key, value);
    }
}

pub fn print_errors(errors: &[CompileError]) {
    for e in errors {
        print_formatted_error(e);
    }
}

/// Returns a new CompileError for internal compiler bugs.
///
/// Compiler errors indicate bugs in the compiler itself, not user code issues.
/// Metadata entries should name the binding that broke the invariant.
///
/// Usage:
/// `return_compiler_error!("bind_reference before emit_init for '{}'", name; {
///     VariableName => name,
///     CompilationStage => "place binding",
/// })`;
#[macro_export]
macro_rules! return_compiler_error {
    // Variant with format string, arguments, and metadata (with semicolon separator)
    ($fmt:expr, $($arg:expr),+ ; { $( $key:ident => $value:expr ),* $(,)? }) => {{
        return Err($crate::compiler::compiler_errors::CompileError {
            msg: format!($fmt, $($arg),+),
            error_type: $crate::compiler::compiler_errors::ErrorType::Compiler,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler::compiler_errors::ErrorMetaDataKey::$key, String::from($value)); )*
                map
            },
        });
    }};
    // Variant with format string and arguments (no metadata)
    ($fmt:expr, $($arg:expr),+ $(,)?) => {{
        return Err($crate::compiler::compiler_errors::CompileError {
            msg: format!($fmt, $($arg),+),
            error_type: $crate::compiler::compiler_errors::ErrorType::Compiler,
            metadata: std::collections::HashMap::new(),
        });
    }};
    // Variant with message and metadata (with semicolon separator)
    ($msg:expr ; { $( $key:ident => $value:expr ),* $(,)? }) => {{
        return Err($crate::compiler::compiler_errors::CompileError {
            msg: String::from($msg),
            error_type: $crate::compiler::compiler_errors::ErrorType::Compiler,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler::compiler_errors::ErrorMetaDataKey::$key, String::from($value)); )*
                map
            },
        });
    }};
    // Simple variant with just message (no metadata)
    ($msg:expr) => {{
        return Err($crate::compiler::compiler_errors::CompileError {
            msg: String::from($msg),
            error_type: $crate::compiler::compiler_errors::ErrorType::Compiler,
            metadata: std::collections::HashMap::new(),
        });
    }};
}
