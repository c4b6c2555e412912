//! Repeated prompt generation with per-iteration records.
//!
//! A run feeds one task to a text generator a fixed number of times. Each
//! attempt becomes a [`core::record::Record`]; the whole batch is written to a
//! single JSON file once the run finishes. The crate keeps a strict split:
//!
//! - **[`core`]**: Pure, deterministic logic (record model, request and batch
//!   invariants). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config files, child processes,
//!   HTTP, record files). Isolated behind traits so tests can script them.
//!
//! [`controller`] coordinates the two to implement `prompter run`.

pub mod controller;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
