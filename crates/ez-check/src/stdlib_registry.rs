//! The stdlib plug-in seam: a flat static table of `(module, name) →
//! (signature, implementation)`, built by `ez-stdlib` and handed to the
//! checker (for signatures) and the evaluator (for dispatch) at startup.
//!
//! This crate only defines the shape. `ez-stdlib` is the sole populator;
//! nothing here hardcodes a concrete function.

use crate::types::FunctionSig;
use crate::value::Value;
use ez_base::diagnostic::{Diagnostic, ErrorCode, Severity};
use ez_base::{Span, Symbol};
use std::collections::HashMap;

pub type BuiltinFn = for<'a> fn(&[Value<'a>]) -> Result<Vec<Value<'a>>, String>;

pub struct StdEntry {
    pub module: Symbol,
    pub name: Symbol,
    pub signature: FunctionSig,
    pub implementation: BuiltinFn,
}

/// The process-wide static table of built-in module signatures and
/// implementations (§6.3, GLOSSARY "Stdlib registry").
#[derive(Default)]
pub struct StdlibRegistry {
    entries: HashMap<(Symbol, Symbol), StdEntry>,
    /// All names registered for a module, for `@name` import validation.
    modules: HashMap<Symbol, Vec<Symbol>>,
}

impl StdlibRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: StdEntry) {
        self.modules.entry(entry.module).or_default().push(entry.name);
        self.entries.insert((entry.module, entry.name), entry);
    }

    pub fn signature(&self, module: Symbol, name: Symbol) -> Option<&FunctionSig> {
        self.entries.get(&(module, name)).map(|e| &e.signature)
    }

    pub fn has_module(&self, module: Symbol) -> bool {
        self.modules.contains_key(&module)
    }

    pub fn module_names(&self, module: Symbol) -> &[Symbol] {
        self.modules.get(&module).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Dispatches `module.name(args)`. A signature present with no
    /// registered implementation is a distinct programming error from a
    /// wholly unknown function; callers that only ever populate entries
    /// through `register` can't produce that split, but the evaluator
    /// still distinguishes the two failure diagnostics for clarity.
    pub fn call<'a>(&self, module: Symbol, name: Symbol, args: &[Value<'a>], span: Span, file: &str, source: &str) -> Result<Vec<Value<'a>>, Diagnostic> {
        match self.entries.get(&(module, name)) {
            Some(entry) => (entry.implementation)(args).map_err(|message| {
                Diagnostic::from_span(ErrorCode::StdlibArgumentError, message, file, source, span, Severity::Error)
            }),
            None => Err(Diagnostic::from_span(
                ErrorCode::StdlibUnknownFunction,
                "no stdlib function registered for this call".to_string(),
                file,
                source,
                span,
                Severity::Error,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParamType, Type};
    use ez_base::Interner;

    #[test]
    fn registers_and_looks_up_signature() {
        let mut interner = Interner::new();
        let module = interner.intern("math");
        let name = interner.intern("abs");
        let mut registry = StdlibRegistry::new();
        registry.register(StdEntry {
            module,
            name,
            signature: FunctionSig {
                params: vec![ParamType {
                    ty: Type::Int(crate::types::IntWidth::Int),
                    mutable: false,
                    has_default: false,
                }],
                returns: vec![Type::Int(crate::types::IntWidth::Int)],
            },
            implementation: |args| Ok(args.to_vec()),
        });
        assert!(registry.signature(module, name).is_some());
        assert!(registry.has_module(module));
    }

    #[test]
    fn unknown_function_reports_stdlib_unknown_function() {
        let interner_module = Symbol::EMPTY;
        let registry = StdlibRegistry::new();
        let err = registry
            .call(interner_module, Symbol::EMPTY, &[], Span::new(0, 1), "m.ez", "")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StdlibUnknownFunction);
    }
}
