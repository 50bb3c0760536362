//! Lexically scoped runtime environment: name → value, with mutability and
//! visibility tracking and an outer-scope chain.
//!
//! Deferred `ensure` thunks are not modeled on `Environment` itself. The
//! evaluator tracks the ensure stack as a plain local `Vec` inside
//! `eval_block`, which already nests one-to-one with lexical scope via
//! ordinary Rust recursion, rather than threading a thunk list through
//! every binding lookup.

use crate::value::Value;
use ez_base::Symbol;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    FilePrivate,
    ModulePrivate,
}

#[derive(Debug)]
pub struct Environment<'a> {
    bindings: HashMap<Symbol, Value<'a>>,
    mutable: HashMap<Symbol, bool>,
    visibility: HashMap<Symbol, Visibility>,
    pub outer: Option<Rc<RefCell<Environment<'a>>>>,
    pub loop_depth: usize,
}

impl<'a> Environment<'a> {
    pub fn new(outer: Option<Rc<RefCell<Environment<'a>>>>) -> Self {
        let loop_depth = outer.as_ref().map(|o| o.borrow().loop_depth).unwrap_or(0);
        Environment {
            bindings: HashMap::new(),
            mutable: HashMap::new(),
            visibility: HashMap::new(),
            outer,
            loop_depth,
        }
    }

    pub fn child(outer: &Rc<RefCell<Environment<'a>>>) -> Rc<RefCell<Environment<'a>>> {
        Rc::new(RefCell::new(Environment::new(Some(outer.clone()))))
    }

    pub fn declare(&mut self, name: Symbol, value: Value<'a>, mutable: bool, visibility: Visibility) {
        self.bindings.insert(name, value);
        self.mutable.insert(name, mutable);
        self.visibility.insert(name, visibility);
    }

    /// Looks up `name` in this scope only, without walking `outer`.
    pub fn lookup_local(&self, name: Symbol) -> Option<Value<'a>> {
        self.bindings.get(&name).cloned()
    }

    /// Looks up `name`, walking the outer-scope chain.
    pub fn lookup(&self, name: Symbol) -> Option<Value<'a>> {
        if let Some(v) = self.bindings.get(&name) {
            return Some(v.clone());
        }
        self.outer.as_ref().and_then(|o| o.borrow().lookup(name))
    }

    pub fn is_mutable(&self, name: Symbol) -> Option<bool> {
        if let Some(m) = self.mutable.get(&name) {
            return Some(*m);
        }
        self.outer.as_ref().and_then(|o| o.borrow().is_mutable(name))
    }

    /// Assigns to the scope that owns `name`, walking the chain until it is
    /// found. Returns `false` if `name` is not bound anywhere in the chain.
    pub fn assign(env: &Rc<RefCell<Environment<'a>>>, name: Symbol, value: Value<'a>) -> bool {
        if env.borrow().bindings.contains_key(&name) {
            env.borrow_mut().bindings.insert(name, value);
            return true;
        }
        let outer = env.borrow().outer.clone();
        match outer {
            Some(outer) => Environment::assign(&outer, name, value),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_sees_outer_bindings() {
        let root: Rc<RefCell<Environment>> = Rc::new(RefCell::new(Environment::new(None)));
        root.borrow_mut()
            .declare(Symbol::EMPTY, Value::Int(0.into()), false, Visibility::Public);
        let child = Environment::child(&root);
        assert!(child.borrow().lookup(Symbol::EMPTY).is_some());
    }

    #[test]
    fn assign_walks_chain_to_defining_scope() {
        let root: Rc<RefCell<Environment>> = Rc::new(RefCell::new(Environment::new(None)));
        root.borrow_mut()
            .declare(Symbol::EMPTY, Value::Int(1.into()), true, Visibility::Public);
        let child = Environment::child(&root);
        assert!(Environment::assign(&child, Symbol::EMPTY, Value::Int(2.into())));
        match root.borrow().lookup(Symbol::EMPTY) {
            Some(Value::Int(n)) => assert_eq!(n, num_bigint::BigInt::from(2)),
            _ => panic!("expected updated binding"),
        }
    }

    #[test]
    fn assign_to_undeclared_name_fails() {
        let root: Rc<RefCell<Environment>> = Rc::new(RefCell::new(Environment::new(None)));
        assert!(!Environment::assign(&root, Symbol::EMPTY, Value::Nil));
    }
}
