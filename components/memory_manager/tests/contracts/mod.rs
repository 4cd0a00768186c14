//! Contract tests for memory_manager
//!
//! These tests pin the behaviour the profiler relies on through
//! `TargetRuntime`.

mod runtime_contract;
