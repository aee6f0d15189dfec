// Library root — exposes internal modules for integration tests in `tests/`.
// Production entry point remains `src/main.rs`.

pub mod api;
pub mod charts;
pub mod error;
pub mod models;
pub mod normalize;
pub mod report;
pub mod sources;

// Wiring used by the binary.
pub mod cli;
pub mod config;
pub mod logging;
