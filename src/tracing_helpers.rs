//! Logging macros gated on the `tracing` feature.
//!
//! Every macro funnels into [`log_event!`], which becomes a
//! `tracing::event!` at the given level with the feature on and expands to
//! nothing with it off. Arguments are not evaluated in the latter case, so
//! callers must not rely on side effects inside a log invocation.
//!
//! ```bash
//! # Compaction and hold-list activity
//! RUST_LOG=enumstore::compact=debug,enumstore::alloc=trace cargo test --features tracing
//! ```
//!
//! Levels used in this crate:
//!
//! | Level | Events |
//! |-------|--------|
//! | `error` | address space exhausted (right before the panic) |
//! | `warn` | rejected load input, fallback resize, decrement of a zero count |
//! | `debug` | compaction, sweeps, buffer switches, reenumeration, reset |
//! | `trace` | per-entry moves, view publication, hold-list transfer and trim |

#![allow(unused_macros, unused_imports)]

#[cfg(feature = "tracing")]
macro_rules! log_event {
    ($level:ident, $($arg:tt)*) => {
        tracing::event!(tracing::Level::$level, $($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! log_event {
    ($level:ident, $($arg:tt)*) => {};
}

macro_rules! trace_log {
    ($($arg:tt)*) => {
        $crate::tracing_helpers::log_event!(TRACE, $($arg)*)
    };
}

macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::tracing_helpers::log_event!(DEBUG, $($arg)*)
    };
}

macro_rules! warn_log {
    ($($arg:tt)*) => {
        $crate::tracing_helpers::log_event!(WARN, $($arg)*)
    };
}

macro_rules! error_log {
    ($($arg:tt)*) => {
        $crate::tracing_helpers::log_event!(ERROR, $($arg)*)
    };
}

pub(crate) use {debug_log, error_log, log_event, trace_log, warn_log};
