//! # ez-base
//!
//! Pure structural atoms for the ez interpreter.
//!
//! This crate provides the foundational types every other `ez-*` crate
//! builds on:
//!
//! - [`Arena`] — bump allocation for stable AST references
//! - [`Interner`]/[`Symbol`] — string interning for O(1) identifier equality
//! - [`Span`] — source location tracking
//! - [`diagnostic`] — the structured error/warning model shared by the
//!   lexer, parser, type checker, and evaluator
//!
//! This crate has no knowledge of EZ syntax or semantics. It provides only
//! generic, reusable infrastructure that higher-level crates build upon.

pub mod arena;
pub mod diagnostic;
pub mod intern;
pub mod span;

pub use arena::Arena;
pub use diagnostic::{Diagnostic, DiagnosticList, ErrorCode, Severity};
pub use intern::{Interner, Symbol, SymbolEq};
pub use span::Span;
