//! Logging macros
//!
//! Forward to `defmt` on target, print under host tests and compile to
//! nothing otherwise. Format strings must stay valid for both `defmt` and
//! `core::fmt`, so only plain `{}` and `{:?}` placeholders are used.

macro_rules! log_impl {
    ($level:ident, $tag:literal, $($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::$level!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        std::println!(concat!("[", $tag, "] {}"), format_args!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log trace message
macro_rules! log_trace {
    ($($arg:tt)*) => { log_impl!(trace, "TRACE", $($arg)*) };
}

/// Log debug message
macro_rules! log_debug {
    ($($arg:tt)*) => { log_impl!(debug, "DEBUG", $($arg)*) };
}

/// Log info message
macro_rules! log_info {
    ($($arg:tt)*) => { log_impl!(info, "INFO", $($arg)*) };
}

/// Log warning message
macro_rules! log_warn {
    ($($arg:tt)*) => { log_impl!(warn, "WARN", $($arg)*) };
}

/// Log error message
macro_rules! log_error {
    ($($arg:tt)*) => { log_impl!(error, "ERROR", $($arg)*) };
}
