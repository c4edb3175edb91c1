// Library target shared by the `readex` binary, the integration tests and the
// criterion benchmarks. The binary entry point is main.rs.

pub mod app;
pub mod config;
pub mod convert;
pub mod document;
pub mod event;
pub mod exam;
pub mod store;
pub mod view;
