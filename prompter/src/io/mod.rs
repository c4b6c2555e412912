//! I/O helpers: configuration, generation backends, and record storage.

pub mod atomic;
pub mod config;
pub mod generator;
pub mod openai;
pub mod process;
pub mod prompt;
pub mod store;
