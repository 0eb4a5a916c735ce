//! Integration tests - end-to-end compilation through the public API
//!
//! These tests load mappings and schemas the way the binary does and check
//! the generated SQL and output bindings.

mod compile_tests;
mod fixtures;
mod scenario_tests;
