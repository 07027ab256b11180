#![forbid(unsafe_code)]

//! Deterministic host doubles and fixtures for testing `ftui-hooks`.
//!
//! This crate provides:
//! - [`Dom`], [`Node`] and [`Window`]: an in-memory node tree whose handles are event sources
//! - [`ResizeHub`]: a scripted size observer
//! - [`TestHost`]: timers, frames, tree and resize hub in one place
//! - [`Recorder`]: call capture for assertions
//! - [`init_test_logging`]: `tracing` output routed to the test writer

pub mod dom;
pub mod host;
pub mod recorder;
pub mod resize;

pub use dom::{Dom, DomEvent, Node, NodeId, Window};
pub use host::TestHost;
pub use recorder::Recorder;
pub use resize::{ResizeEntry, ResizeHub};

use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber for tests, once per process.
///
/// Honors `RUST_LOG`; defaults to `ftui_hooks=debug`. Later calls are no-ops.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ftui_hooks=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
