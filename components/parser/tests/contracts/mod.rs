//! Contract tests for parser component
//!
//! These tests pin the shape of the AST the interpreter walks.

mod program_contract;
