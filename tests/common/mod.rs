//! Shared test setup: tracing subscriber and small store helpers.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn my_test() {
//!     common::init_tracing();
//!     let mut store = common::string_store();
//! }
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Filter directives (e.g., `enumstore=debug,enumstore::compact=trace`)
//! - `ENUMSTORE_LOG_DIR`: Log directory (default: `logs/`)
//! - `ENUMSTORE_LOG_CONSOLE`: Set to "0" to disable console output
//!
//! Library events are only emitted when the crate is built with
//! `--features tracing`.
//!
//! # Log Files
//!
//! Events are appended to `logs/enumstore.jsonl` as newline-delimited JSON:
//!
//! ```bash
//! # Compaction events only
//! jq 'select(.fields.message | startswith("compaction"))' logs/enumstore.jsonl
//!
//! # Warnings and above
//! jq 'select(.level == "WARN" or .level == "ERROR")' logs/enumstore.jsonl
//! ```

#![allow(dead_code)]

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Mutex, Once};

use enumstore::{EntryValue, EnumStore, NodeData, StoreConfig};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

static INIT: Once = Once::new();

/// Install the console and NDJSON file subscribers. Only the first call in a
/// test binary has any effect.
pub fn init_tracing() {
    INIT.call_once(install_subscriber);
}

/// Filter from `RUST_LOG`, falling back to `info`.
fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
}

fn log_path() -> PathBuf {
    let dir: PathBuf =
        env::var_os("ENUMSTORE_LOG_DIR").map_or_else(|| PathBuf::from("logs"), PathBuf::from);
    dir.join("enumstore.jsonl")
}

#[allow(clippy::expect_used)]
fn install_subscriber() {
    let path: PathBuf = log_path();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).expect("create log directory");
    }

    // Append: test binaries may run in parallel processes.
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .expect("open log file");

    let console = env::var("ENUMSTORE_LOG_CONSOLE")
        .map_or(true, |v| v != "0")
        .then(|| {
            tracing_subscriber::fmt::layer()
                .with_thread_names(true)
                .with_line_number(true)
                .compact()
                .with_filter(filter())
        });

    let json = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .json()
        .with_filter(filter());

    let _ = Registry::default().with(console).with(json).try_init();
}

/// Config with tiny buffers so growth and compaction happen quickly.
pub fn small_config() -> StoreConfig {
    StoreConfig::new()
        .with_initial_buffer_words(64)
        .with_min_buffer_words(32)
        .with_min_dead_words(8)
}

/// String store over [`small_config`].
pub fn string_store() -> EnumStore<String> {
    EnumStore::new(small_config())
}

/// Close the current generation the way a coordinator with no readers in
/// flight would: freeze, tag everything retired with `generation`, and
/// release it immediately.
pub fn advance<T: EntryValue, D: NodeData>(store: &mut EnumStore<T, D>, generation: &mut u64) {
    store.freeze_tree();
    store.transfer_hold_lists(*generation);
    *generation += 1;
    store.trim_hold_lists(*generation);
}

/// Owned string from a literal.
pub fn s(value: &str) -> String {
    value.to_string()
}
