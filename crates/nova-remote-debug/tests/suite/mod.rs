// Consolidated integration test suite.
//
// Compiled by `tests/remote_debug.rs` so the crate builds one integration test
// binary.
mod client_lifecycle;
mod freeze_global;
mod optional_modules;
mod plugin_discovery;
mod script_cache;
mod session_ordering;
mod support;
