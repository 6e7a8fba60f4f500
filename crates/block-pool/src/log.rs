//! Crate-internal logging macros.
//!
//! With the `log` feature the macros forward to the [`log`] facade under the
//! `block_pool` target. Without it they only type-check their arguments.

cfg_if::cfg_if! {
    if #[cfg(feature = "log")] {
        macro_rules! log {
            ($level:ident, $($arg:tt)*) => {
                ::log::$level!(target: "block_pool", $($arg)*)
            };
        }
    } else {
        macro_rules! log {
            ($level:ident, $($arg:tt)*) => {{
                let _ = format_args!($($arg)*);
            }};
        }
    }
}

macro_rules! trace {
    ($($arg:tt)*) => {
        log!(trace, $($arg)*)
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        log!(debug, $($arg)*)
    };
}

macro_rules! info {
    ($($arg:tt)*) => {
        log!(info, $($arg)*)
    };
}

macro_rules! warn {
    ($($arg:tt)*) => {
        log!(warn, $($arg)*)
    };
}

macro_rules! error {
    ($($arg:tt)*) => {
        log!(error, $($arg)*)
    };
}
