//! Probe Language Parser Component
//!
//! Provides the lexer, parser and AST for the small script language that
//! heap probes are written in.
//!
//! # Overview
//!
//! - [`Lexer`] - Tokenizes probe source code
//! - [`Token`] - Token types including identifiers, literals, keywords
//! - [`Parser`] - Recursive descent parser producing a [`Program`]
//! - [`SyntaxError`] - Parse failure with its source line
//!
//! # Example
//!
//! ```
//! use parser::{Parser, Statement};
//!
//! let program = Parser::new("let roots = getGCRoots();\nroots.length").parse().unwrap();
//! assert_eq!(program.body.len(), 2);
//! assert!(matches!(program.body[0], Statement::VariableDeclaration { line: 1, .. }));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{
    AssignmentOperator, AssignmentTarget, BinaryOperator, CatchClause, Expression, ForInOfLeft,
    ForInit, Function, Literal, LogicalOperator, MemberProperty, Program, Statement,
    UnaryOperator, UpdateOperator, VariableDeclarator, VariableKind,
};
pub use error::{ParseResult, SyntaxError};
pub use lexer::{Keyword, Lexer, Punctuator, Token};
pub use parser::{Parser, DEFAULT_MAX_NESTING};

/// Parses a complete probe script.
pub fn parse(source: &str) -> ParseResult<Program> {
    Parser::new(source).parse()
}
