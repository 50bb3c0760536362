//! # ez-check
//!
//! Type system, two-pass static checker, module loader, and tree-walking
//! evaluator for EZ.
//!
//! - [`types`] — [`Type`], integer/float widths, function/struct/enum shapes
//! - [`value`] — [`Value`], the evaluator's runtime representation
//! - [`environment`] — lexically scoped name → value bindings
//! - [`module`] — [`Registry`], the cross-module symbol table the loader
//!   populates before a file is checked or run
//! - [`stdlib_registry`] — the `(module, name) → implementation` plug-in
//!   seam `ez-stdlib` populates
//! - [`checker`] — [`Checker`], the registration + body-checking passes
//! - [`evaluator`] — [`Evaluator`], the tree-walking interpreter

pub mod checker;
pub mod environment;
pub mod evaluator;
pub mod module;
pub mod stdlib_registry;
pub mod types;
pub mod value;

pub use checker::Checker;
pub use environment::{Environment, Visibility};
pub use evaluator::Evaluator;
pub use module::{LoadedModule, ModuleLoader, Registry};
pub use stdlib_registry::{BuiltinFn, StdEntry, StdlibRegistry};
pub use types::{EnumDef, FloatWidth, FunctionSig, IntWidth, ParamType, StructDef, Type};
pub use value::{FileHandle, FileMode, FunctionValue, MapKey, ModuleValue, Value};
