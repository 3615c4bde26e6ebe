// CODEGEN LOGGING MACROS
#[macro_export]
#[cfg(feature = "verbose_codegen_logging")]
macro_rules! codegen_log {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "verbose_codegen_logging"))]
macro_rules! codegen_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}

// REPRESENTATION SELECTION LOGGING MACROS
#[macro_export]
#[cfg(feature = "verbose_repr_logging")]
macro_rules! repr_log {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "verbose_repr_logging"))]
macro_rules! repr_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}
