//! Tree-walking evaluator.
//!
//! Dispatches on AST node kind, producing a [`Value`]. Statement execution
//! reports one of four [`Flow`] signals so loops, blocks, and function
//! frames can tell a plain fallthrough from a `return`/`break`/`continue`
//! without threading a separate "did we return" flag through every call.
//!
//! Runtime errors propagate through the native `Result` channel (`?`), not
//! through a `Value::Error` sentinel; see the note on [`Value::Error`].

use crate::environment::{Environment, Visibility};
use crate::module::Registry;
use crate::stdlib_registry::StdlibRegistry;
use crate::types::Type;
use crate::value::{FunctionValue, MapKey, Value};
use ez_base::diagnostic::{Diagnostic, DiagnosticList, ErrorCode, Severity};
use ez_base::{Interner, Span, Symbol, SymbolEq};
use ez_syntax::ast::{BinaryOp, Block, CompoundOp, Expr, Literal, PostfixOp, Stmt, StringPart, UnaryOp, WhenPattern};
use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

type EvalResult<'a, T> = Result<T, Diagnostic>;

/// How a statement or block exited.
enum Flow<'a> {
    Normal,
    Return(Vec<Value<'a>>),
    Break,
    Continue,
}

/// Tree-walking evaluator for a single program run.
///
/// `registry` supplies import-alias → stdlib-module lookups and struct
/// field shape; it is the same [`Registry`] the checker populated, so a
/// `run` that skips checking still has the alias table it needs.
pub struct Evaluator<'a> {
    interner: &'a Interner,
    file: String,
    source: &'a str,
    stdlib: &'a StdlibRegistry,
    registry: &'a Registry,
    globals: Rc<RefCell<Environment<'a>>>,
    /// alias (or unaliased basename) → the imported file's own top-level
    /// environment, built by the driver's import pre-pass (see
    /// `resolve_path_imports` in `ez-cli`) via [`Evaluator::module_environment`]
    /// run over that file first. Empty unless `with_modules` was called.
    modules: HashMap<Symbol, Rc<RefCell<Environment<'a>>>>,
    call_depth: usize,
    /// Secondary diagnostics raised by `ensure` cleanup while an unrelated
    /// error was already in flight; these never replace the primary error,
    /// only get reported alongside it (§4.6 "Ensure/cleanup").
    pub cleanup_diagnostics: DiagnosticList,
}

const MAX_CALL_DEPTH: usize = 4096;

impl<'a> Evaluator<'a> {
    pub fn new(interner: &'a Interner, file: impl Into<String>, source: &'a str, registry: &'a Registry, stdlib: &'a StdlibRegistry) -> Self {
        Evaluator {
            interner,
            file: file.into(),
            source,
            stdlib,
            registry,
            globals: Rc::new(RefCell::new(Environment::new(None))),
            modules: HashMap::new(),
            call_depth: 0,
            cleanup_diagnostics: DiagnosticList::new(),
        }
    }

    /// Attaches already-resolved path-import modules (alias → that file's
    /// own top-level environment) so `alias.function(...)` calls can find a
    /// callable [`Value::Function`] at runtime.
    pub fn with_modules(mut self, modules: HashMap<Symbol, Rc<RefCell<Environment<'a>>>>) -> Self {
        self.modules = modules;
        self
    }

    /// Chains this evaluator's top-level scope onto `outer`, so a
    /// directory-style multi-file module's later files see the earlier
    /// files' top-level bindings. Used only by `ez-cli`'s import pre-pass.
    pub fn with_outer(mut self, outer: Rc<RefCell<Environment<'a>>>) -> Self {
        self.globals = Rc::new(RefCell::new(Environment::new(Some(outer))));
        self
    }

    /// Declares every top-level function/global of a module file without
    /// calling `main`, and hands back its environment so a driver's import
    /// pre-pass can register it with another evaluator via `with_modules`.
    pub fn module_environment(mut self, stmts: &[&'a Stmt<'a>]) -> EvalResult<'a, Rc<RefCell<Environment<'a>>>> {
        for stmt in stmts {
            self.declare_top_level(*stmt)?;
        }
        Ok(self.globals)
    }

    fn error(&self, code: ErrorCode, message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic::from_span(code, message, self.file.clone(), self.source, span, Severity::Error)
    }

    fn name(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    /// Declares every top-level function and global in the program, then
    /// calls `main()` with no arguments. Mirrors the checker's registration
    /// pass, but over values instead of types.
    pub fn run(&mut self, stmts: &[&'a Stmt<'a>]) -> EvalResult<'a, Vec<Value<'a>>> {
        for stmt in stmts {
            self.declare_top_level(*stmt)?;
        }
        let main = self
            .interner
            .lookup("main")
            .and_then(|sym| self.globals.borrow().lookup(sym));
        match main {
            Some(Value::Function(f)) => self.call_function(&f, &[], Span::new(0, 0)),
            _ => Ok(Vec::new()),
        }
    }

    fn declare_top_level(&mut self, stmt: &'a Stmt<'a>) -> EvalResult<'a, ()> {
        match stmt {
            Stmt::FnDecl { name, params, body, .. } => {
                let function = Value::Function(Rc::new(FunctionValue {
                    name: *name,
                    params: params.as_slice(),
                    body,
                    closure: self.globals.clone(),
                }));
                self.globals.borrow_mut().declare(*name, function, false, Visibility::Public);
                Ok(())
            }
            Stmt::VarDecl { mutable, names, init, .. } => {
                let globals = self.globals.clone();
                let values = self.eval_init_list(init, &globals)?;
                for (i, n) in names.iter().enumerate() {
                    let value = values.get(i).cloned().unwrap_or(Value::Nil);
                    self.globals.borrow_mut().declare(*n, value, *mutable, Visibility::Public);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn eval_init_list(&mut self, init: &'a [&'a Expr<'a>], env: &Rc<RefCell<Environment<'a>>>) -> EvalResult<'a, Vec<Value<'a>>> {
        let mut out = Vec::with_capacity(init.len());
        for e in init {
            out.push(self.eval_expr(e, env)?);
        }
        Ok(out)
    }

    // ---- statements ----

    fn eval_block(&mut self, block: &'a Block<'a>, parent: &Rc<RefCell<Environment<'a>>>) -> EvalResult<'a, Flow<'a>> {
        let env = Environment::child(parent);
        let mut cleanups: Vec<&'a Block<'a>> = Vec::new();
        let mut result: EvalResult<'a, Flow<'a>> = Ok(Flow::Normal);

        for stmt in block.stmts {
            if let Stmt::Ensure { body, .. } = stmt {
                cleanups.push(body);
                continue;
            }
            match self.eval_stmt(stmt, &env) {
                Ok(Flow::Normal) => continue,
                other => {
                    result = other;
                    break;
                }
            }
        }

        // LIFO cleanup regardless of how the block exited; cleanup errors
        // are appended, never replacing an already in-flight error.
        for cleanup in cleanups.into_iter().rev() {
            match self.eval_block(cleanup, &env) {
                Ok(_) => {}
                Err(diag) => self.cleanup_diagnostics.push(diag),
            }
        }

        result
    }

    fn eval_stmt(&mut self, stmt: &'a Stmt<'a>, env: &Rc<RefCell<Environment<'a>>>) -> EvalResult<'a, Flow<'a>> {
        match stmt {
            Stmt::VarDecl { mutable, names, init, .. } => {
                let values = self.eval_init_list(init, env)?;
                for (i, n) in names.iter().enumerate() {
                    let value = values.get(i).cloned().unwrap_or(Value::Nil);
                    env.borrow_mut().declare(*n, value, *mutable, Visibility::Public);
                }
                Ok(Flow::Normal)
            }
            Stmt::Assign { op, target, value, span } => {
                self.eval_assign(*op, target, value, env, *span)?;
                Ok(Flow::Normal)
            }
            Stmt::Return { values, .. } => {
                let out = self.eval_init_list(values, env)?;
                Ok(Flow::Return(out))
            }
            Stmt::ExprStmt { expr, .. } => {
                self.eval_expr(expr, env)?;
                Ok(Flow::Normal)
            }
            Stmt::Block(block) => self.eval_block(block, env),
            Stmt::If { arms, otherwise, .. } => {
                for arm in arms {
                    if self.eval_expr(arm.cond, env)?.is_truthy() {
                        return self.eval_block(&arm.body, env);
                    }
                }
                match otherwise {
                    Some(block) => self.eval_block(block, env),
                    None => Ok(Flow::Normal),
                }
            }
            Stmt::For {
                var, iterable, body, span, ..
            } => self.eval_for(*var, iterable, body, env, *span),
            Stmt::ForEach { var, collection, body, span } => self.eval_for_each(*var, collection, body, env, *span),
            Stmt::AsLongAs { cond, body, .. } => {
                loop {
                    if !self.eval_expr(cond, env)?.is_truthy() {
                        break;
                    }
                    match self.eval_block(body, env)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Loop { body, .. } => loop {
                match self.eval_block(body, env)? {
                    Flow::Break => return Ok(Flow::Normal),
                    Flow::Return(v) => return Ok(Flow::Return(v)),
                    Flow::Normal | Flow::Continue => {}
                }
            },
            Stmt::Break { .. } => Ok(Flow::Break),
            Stmt::Continue { .. } => Ok(Flow::Continue),
            Stmt::When {
                scrutinee,
                arms,
                default,
                ..
            } => self.eval_when(scrutinee, arms, default, env),
            Stmt::Ensure { .. } => {
                // Handled by eval_block's own scan; reaching here means an
                // `ensure` appeared somewhere eval_block doesn't special-case
                // (it shouldn't, since eval_block filters these out first).
                Ok(Flow::Normal)
            }
            Stmt::Import { .. } | Stmt::Using { .. } => Ok(Flow::Normal),
            Stmt::FnDecl { .. } | Stmt::StructDecl { .. } | Stmt::EnumDecl { .. } | Stmt::ModuleHeader { .. } => Ok(Flow::Normal),
        }
    }

    fn eval_for(
        &mut self,
        var: Symbol,
        iterable: &'a Expr<'a>,
        body: &'a Block<'a>,
        env: &Rc<RefCell<Environment<'a>>>,
        span: Span,
    ) -> EvalResult<'a, Flow<'a>> {
        let iter_val = self.eval_expr(iterable, env)?;
        match iter_val {
            Value::Range(start, end, step) => {
                if step.is_zero() {
                    return Err(self.error(ErrorCode::RuntimeDivisionByZero, "range step must not be zero", span));
                }
                let ascending = step.is_positive();
                let mut current = start;
                loop {
                    if ascending {
                        if current >= end {
                            break;
                        }
                    } else if current <= end {
                        break;
                    }
                    let loop_env = Environment::child(env);
                    loop_env.borrow_mut().declare(var, Value::Int(current.clone()), false, Visibility::Public);
                    match self.eval_block(body, &loop_env)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    current += &step;
                }
                Ok(Flow::Normal)
            }
            other => {
                let _ = other;
                Err(self.error(ErrorCode::TypeMismatch, "'for' requires a Range", span))
            }
        }
    }

    fn eval_for_each(
        &mut self,
        var: Symbol,
        collection: &'a Expr<'a>,
        body: &'a Block<'a>,
        env: &Rc<RefCell<Environment<'a>>>,
        span: Span,
    ) -> EvalResult<'a, Flow<'a>> {
        let value = self.eval_expr(collection, env)?;
        let items: Vec<Value<'a>> = match &value {
            Value::Array(items, _) => items.borrow().clone(),
            Value::String(s) => s.borrow().chars().map(Value::Char).collect(),
            _ => return Err(self.error(ErrorCode::TypeMismatch, "'for_each' requires an array or string", span)),
        };
        for item in items {
            let loop_env = Environment::child(env);
            loop_env.borrow_mut().declare(var, item, false, Visibility::Public);
            match self.eval_block(body, &loop_env)? {
                Flow::Break => break,
                Flow::Return(v) => return Ok(Flow::Return(v)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_when(
        &mut self,
        scrutinee: &'a Expr<'a>,
        arms: &'a [ez_syntax::ast::WhenArm<'a>],
        default: &'a Option<Block<'a>>,
        env: &Rc<RefCell<Environment<'a>>>,
    ) -> EvalResult<'a, Flow<'a>> {
        let value = self.eval_expr(scrutinee, env)?;
        for arm in arms {
            let matched = match &arm.pattern {
                WhenPattern::EnumMember(enum_name, member) => matches!(&value, Value::Enum(e, m, _) if e == enum_name && m == member),
                WhenPattern::Expr(e) => {
                    let candidate = self.eval_expr(e, env)?;
                    match &candidate {
                        Value::Range(start, end, _) => {
                            if let Value::Int(n) = &value {
                                n >= start && n < end
                            } else {
                                false
                            }
                        }
                        other => values_equal(&value, other),
                    }
                }
            };
            if matched {
                return self.eval_block(&arm.body, env);
            }
        }
        match default {
            Some(block) => self.eval_block(block, env),
            None => Ok(Flow::Normal),
        }
    }

    fn eval_assign(
        &mut self,
        op: CompoundOp,
        target: &'a Expr<'a>,
        value_expr: &'a Expr<'a>,
        env: &Rc<RefCell<Environment<'a>>>,
        span: Span,
    ) -> EvalResult<'a, ()> {
        let rhs = self.eval_expr(value_expr, env)?;
        let new_value = if matches!(op, CompoundOp::Assign) {
            rhs
        } else {
            let current = self.eval_expr(target, env)?;
            apply_compound(op, &current, &rhs).map_err(|message| self.error(ErrorCode::TypeMismatch, message, span))?
        };
        self.assign_to_target(target, env, new_value, span)
    }

    fn assign_to_target(&mut self, target: &'a Expr<'a>, env: &Rc<RefCell<Environment<'a>>>, value: Value<'a>, span: Span) -> EvalResult<'a, ()> {
        match target {
            Expr::Ident { name, span } => {
                if Environment::assign(env, *name, value) {
                    Ok(())
                } else {
                    Err(self.error(ErrorCode::RuntimeUndefinedVariable, format!("undefined variable '{}'", self.name(*name)), *span))
                }
            }
            Expr::Index { receiver, index, span } => {
                let receiver_val = self.eval_expr(receiver, env)?;
                let index_val = self.eval_expr(index, env)?;
                self.index_assign(&receiver_val, &index_val, value, *span)
            }
            Expr::Member { receiver, name, span } => {
                let receiver_val = self.eval_expr(receiver, env)?;
                match receiver_val {
                    Value::Struct(_, fields, mutable) => {
                        if !mutable {
                            return Err(self.error(ErrorCode::RefImmutableAssignment, "cannot write to an immutable struct parameter", *span));
                        }
                        fields.borrow_mut().insert(*name, value);
                        Ok(())
                    }
                    _ => Err(self.error(ErrorCode::TypeMismatch, "member assignment target is not a struct", *span)),
                }
            }
            _ => {
                let _ = span;
                Err(self.error(ErrorCode::TypeMismatch, "not an assignable expression", target.span()))
            }
        }
    }

    fn index_assign(&self, receiver: &Value<'a>, index: &Value<'a>, value: Value<'a>, span: Span) -> EvalResult<'a, ()> {
        match receiver {
            Value::Array(items, mutable) => {
                if !*mutable {
                    return Err(self.error(ErrorCode::RefImmutableAssignment, "cannot write to an immutable array parameter", span));
                }
                let i = as_index(index).ok_or_else(|| self.error(ErrorCode::TypeMismatch, "array index must be an int", span))?;
                let mut items = items.borrow_mut();
                if i >= items.len() {
                    return Err(self.error(ErrorCode::RuntimeIndexOutOfBounds, format!("index {} out of bounds for array of length {}", i, items.len()), span));
                }
                items[i] = value;
                Ok(())
            }
            Value::Map(entries, mutable) => {
                if !*mutable {
                    return Err(self.error(ErrorCode::RefImmutableAssignment, "cannot write to an immutable map parameter", span));
                }
                let key = MapKey::from_value(index).ok_or_else(|| self.error(ErrorCode::TypeMismatch, "unhashable map key", span))?;
                entries.borrow_mut().insert(key, value);
                Ok(())
            }
            _ => Err(self.error(ErrorCode::TypeMismatch, "index assignment requires an array or map", span)),
        }
    }

    // ---- expressions ----

    fn eval_expr(&mut self, expr: &'a Expr<'a>, env: &Rc<RefCell<Environment<'a>>>) -> EvalResult<'a, Value<'a>> {
        match expr {
            Expr::Ident { name, span } => env
                .borrow()
                .lookup(*name)
                .ok_or_else(|| self.error(ErrorCode::RuntimeUndefinedVariable, format!("undefined variable '{}'", self.name(*name)), *span)),
            Expr::Blank { .. } => Ok(Value::Nil),
            Expr::Literal { value, .. } => Ok(self.eval_literal(value)),
            Expr::StringLit { parts, .. } => self.eval_string_lit(parts, env),
            Expr::ArrayLit { elements, .. } => {
                let mut out = Vec::with_capacity(elements.len());
                for e in *elements {
                    out.push(self.eval_expr(e, env)?);
                }
                Ok(Value::Array(Rc::new(RefCell::new(out)), true))
            }
            Expr::MapLit { entries, .. } => {
                let mut out = IndexMap::new();
                for (k, v) in *entries {
                    let key = self.eval_expr(k, env)?;
                    let value = self.eval_expr(v, env)?;
                    let key = MapKey::from_value(&key).ok_or_else(|| self.error(ErrorCode::TypeMismatch, "unhashable map key", k.span()))?;
                    out.insert(key, value);
                }
                Ok(Value::Map(Rc::new(RefCell::new(out)), true))
            }
            Expr::StructLit { ty, fields, span } => self.eval_struct_lit(*ty, fields, env, *span),
            Expr::Unary { op, operand, span } => self.eval_unary(*op, operand, env, *span),
            Expr::Binary { op, left, right, span } => self.eval_binary(*op, left, right, env, *span),
            Expr::Postfix { op, operand, span } => self.eval_postfix(*op, operand, env, *span),
            Expr::Call { callee, args, span } => self.eval_call(callee, args, env, *span),
            Expr::Index { receiver, index, span } => self.eval_index(receiver, index, env, *span),
            Expr::Member { receiver, name, span } => self.eval_member(receiver, *name, env, *span),
            Expr::New { ty, span } => {
                let resolved = self.resolve_new_type(ty, *span)?;
                Ok(self.default_value_for_type(&resolved))
            }
            Expr::Range { start, end, step, .. } => {
                let start = as_bigint(&self.eval_expr(start, env)?);
                let end = as_bigint(&self.eval_expr(end, env)?);
                let step = match step {
                    Some(s) => as_bigint(&self.eval_expr(s, env)?),
                    None => BigInt::from(1),
                };
                Ok(Value::Range(start, end, step))
            }
        }
    }

    fn eval_literal(&self, lit: &Literal) -> Value<'a> {
        match lit {
            Literal::Int(text) => Value::Int(text.parse().unwrap_or_else(|_| BigInt::zero())),
            Literal::Float(f) => Value::Float(*f),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Char(c) => Value::Char(*c),
            Literal::Nil => Value::Nil,
        }
    }

    fn eval_string_lit(&mut self, parts: &'a [StringPart<'a>], env: &Rc<RefCell<Environment<'a>>>) -> EvalResult<'a, Value<'a>> {
        let mut out = String::new();
        for part in parts {
            match part {
                StringPart::Text(t) => out.push_str(t),
                StringPart::Expr(e) => {
                    let value = self.eval_expr(e, env)?;
                    out.push_str(&display_value(&value));
                }
            }
        }
        Ok(Value::String(Rc::new(RefCell::new(out))))
    }

    fn eval_struct_lit(&mut self, ty: Symbol, fields: &'a [ez_syntax::ast::FieldInit<'a>], env: &Rc<RefCell<Environment<'a>>>, span: Span) -> EvalResult<'a, Value<'a>> {
        let def = self
            .registry
            .structs
            .get(&ty)
            .cloned()
            .ok_or_else(|| self.error(ErrorCode::TypeUndefined, format!("undefined struct '{}'", self.name(ty)), span))?;
        let mut out = IndexMap::new();
        for f in fields {
            out.insert(f.name, self.eval_expr(f.value, env)?);
        }
        for (fname, fty, has_default) in &def.fields {
            if !out.contains_key(fname) && *has_default {
                out.insert(*fname, self.default_value_for_type(fty));
            }
        }
        Ok(Value::Struct(ty, Rc::new(RefCell::new(out)), true))
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &'a Expr<'a>, env: &Rc<RefCell<Environment<'a>>>, span: Span) -> EvalResult<'a, Value<'a>> {
        let value = self.eval_expr(operand, env)?;
        match (op, &value) {
            (UnaryOp::Neg, Value::Int(i)) => Ok(Value::Int(-i)),
            (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            _ => Err(self.error(ErrorCode::TypeMismatch, format!("cannot apply unary operator to a {}", value.type_name()), span)),
        }
    }

    fn eval_postfix(&mut self, op: PostfixOp, operand: &'a Expr<'a>, env: &Rc<RefCell<Environment<'a>>>, span: Span) -> EvalResult<'a, Value<'a>> {
        let current = self.eval_expr(operand, env)?;
        let delta = match op {
            PostfixOp::Inc => 1,
            PostfixOp::Dec => -1,
        };
        let updated = match &current {
            Value::Int(i) => Value::Int(i + delta),
            _ => return Err(self.error(ErrorCode::TypeMismatch, "'++'/'--' require an int operand", span)),
        };
        self.assign_to_target(operand, env, updated, span)?;
        Ok(current)
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &'a Expr<'a>, right: &'a Expr<'a>, env: &Rc<RefCell<Environment<'a>>>, span: Span) -> EvalResult<'a, Value<'a>> {
        // Short-circuit: the right operand is not evaluated at all.
        if matches!(op, BinaryOp::And) {
            let l = self.eval_expr(left, env)?;
            if !l.is_truthy() {
                return Ok(Value::Bool(false));
            }
            return Ok(Value::Bool(self.eval_expr(right, env)?.is_truthy()));
        }
        if matches!(op, BinaryOp::Or) {
            let l = self.eval_expr(left, env)?;
            if l.is_truthy() {
                return Ok(Value::Bool(true));
            }
            return Ok(Value::Bool(self.eval_expr(right, env)?.is_truthy()));
        }

        let lhs = self.eval_expr(left, env)?;
        let rhs = self.eval_expr(right, env)?;
        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => self.eval_arith(op, &lhs, &rhs, span),
            BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
            BinaryOp::NotEq => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => self.eval_compare(op, &lhs, &rhs, span),
            BinaryOp::In | BinaryOp::NotIn => {
                let found = membership(&lhs, &rhs);
                Ok(Value::Bool(if matches!(op, BinaryOp::In) { found } else { !found }))
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above with short-circuiting"),
        }
    }

    fn eval_arith(&self, op: BinaryOp, lhs: &Value<'a>, rhs: &Value<'a>, span: Span) -> EvalResult<'a, Value<'a>> {
        match (lhs, rhs) {
            (Value::String(a), Value::String(b)) if matches!(op, BinaryOp::Add) => {
                Ok(Value::String(Rc::new(RefCell::new(format!("{}{}", a.borrow(), b.borrow())))))
            }
            (Value::Int(a), Value::Int(b)) => match op {
                BinaryOp::Add => Ok(Value::Int(a + b)),
                BinaryOp::Sub => Ok(Value::Int(a - b)),
                BinaryOp::Mul => Ok(Value::Int(a * b)),
                BinaryOp::Div => {
                    if b.is_zero() {
                        Err(self.error(ErrorCode::RuntimeDivisionByZero, "division by zero", span))
                    } else {
                        Ok(Value::Int(a / b))
                    }
                }
                BinaryOp::Mod => {
                    if b.is_zero() {
                        Err(self.error(ErrorCode::RuntimeDivisionByZero, "modulo by zero", span))
                    } else {
                        Ok(Value::Int(a % b))
                    }
                }
                _ => unreachable!(),
            },
            (Value::Float(a), Value::Float(b)) => match op {
                BinaryOp::Add => Ok(Value::Float(a + b)),
                BinaryOp::Sub => Ok(Value::Float(a - b)),
                BinaryOp::Mul => Ok(Value::Float(a * b)),
                BinaryOp::Div => Ok(Value::Float(a / b)),
                BinaryOp::Mod => Ok(Value::Float(a % b)),
                _ => unreachable!(),
            },
            _ => Err(self.error(
                ErrorCode::TypeMismatch,
                format!("cannot apply operator to {} and {}", lhs.type_name(), rhs.type_name()),
                span,
            )),
        }
    }

    fn eval_compare(&self, op: BinaryOp, lhs: &Value<'a>, rhs: &Value<'a>, span: Span) -> EvalResult<'a, Value<'a>> {
        let ordering = match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).ok_or_else(|| self.error(ErrorCode::TypeMismatch, "NaN is not orderable", span))?,
            (Value::String(a), Value::String(b)) => a.borrow().cmp(&b.borrow()),
            (Value::Char(a), Value::Char(b)) => a.cmp(b),
            _ => return Err(self.error(ErrorCode::TypeMismatch, "operands are not comparable", span)),
        };
        Ok(Value::Bool(match op {
            BinaryOp::Lt => ordering.is_lt(),
            BinaryOp::LtEq => ordering.is_le(),
            BinaryOp::Gt => ordering.is_gt(),
            BinaryOp::GtEq => ordering.is_ge(),
            _ => unreachable!(),
        }))
    }

    fn eval_index(&mut self, receiver: &'a Expr<'a>, index: &'a Expr<'a>, env: &Rc<RefCell<Environment<'a>>>, span: Span) -> EvalResult<'a, Value<'a>> {
        let receiver_val = self.eval_expr(receiver, env)?;
        let index_val = self.eval_expr(index, env)?;
        match &receiver_val {
            Value::Array(items, _) => {
                let i = as_index(&index_val).ok_or_else(|| self.error(ErrorCode::TypeMismatch, "array index must be an int", span))?;
                let items = items.borrow();
                items
                    .get(i)
                    .cloned()
                    .ok_or_else(|| self.error(ErrorCode::RuntimeIndexOutOfBounds, format!("index {} out of bounds for array of length {}", i, items.len()), span))
            }
            Value::Map(entries, _) => {
                let key = MapKey::from_value(&index_val).ok_or_else(|| self.error(ErrorCode::TypeMismatch, "unhashable map key", span))?;
                entries
                    .borrow()
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| self.error(ErrorCode::RuntimeIndexOutOfBounds, "key not present in map", span))
            }
            Value::String(s) => {
                let i = as_index(&index_val).ok_or_else(|| self.error(ErrorCode::TypeMismatch, "string index must be an int", span))?;
                s.borrow()
                    .chars()
                    .nth(i)
                    .map(Value::Char)
                    .ok_or_else(|| self.error(ErrorCode::RuntimeIndexOutOfBounds, "index out of bounds for string", span))
            }
            Value::Nil => Err(self.error(ErrorCode::RuntimeNilDereference, "cannot index nil", span)),
            _ => Err(self.error(ErrorCode::TypeMismatch, "indexing requires an array, map, or string", span)),
        }
    }

    fn eval_member(&mut self, receiver: &'a Expr<'a>, name: Symbol, env: &Rc<RefCell<Environment<'a>>>, span: Span) -> EvalResult<'a, Value<'a>> {
        let receiver_val = self.eval_expr(receiver, env)?;
        match receiver_val {
            Value::Struct(_, fields, _) => fields
                .borrow()
                .get(&name)
                .cloned()
                .ok_or_else(|| self.error(ErrorCode::TypeUnknownField, format!("unknown field '{}'", self.name(name)), span)),
            Value::Enum(enum_name, member, _) => {
                let _ = (enum_name, member);
                Err(self.error(ErrorCode::TypeUnknownField, "enum values have no fields", span))
            }
            Value::Nil => Err(self.error(ErrorCode::RuntimeNilDereference, format!("cannot access field '{}' on nil", self.name(name)), span)),
            _ => Err(self.error(ErrorCode::TypeMismatch, "member access requires a struct", span)),
        }
    }

    /// `m.keys()`/`m.values()`: a map's only iteration mechanism (spec.md:118).
    fn eval_map_method(&mut self, entries: &Rc<RefCell<IndexMap<MapKey, Value<'a>>>>, name: Symbol, span: Span) -> EvalResult<'a, Value<'a>> {
        let items = match self.name(name) {
            "keys" => entries.borrow().keys().cloned().map(MapKey::into_value).collect(),
            "values" => entries.borrow().values().cloned().collect(),
            other => return Err(self.error(ErrorCode::TypeUnknownField, format!("maps have no method '{}'; use keys()/values()", other), span)),
        };
        Ok(Value::Array(Rc::new(RefCell::new(items)), true))
    }

    fn eval_call(&mut self, callee: &'a Expr<'a>, args: &'a [&'a Expr<'a>], env: &Rc<RefCell<Environment<'a>>>, span: Span) -> EvalResult<'a, Value<'a>> {
        // `alias.func(args)` stdlib dispatch, resolved by call shape rather
        // than evaluating `alias` as an expression (stdlib modules are not
        // values).
        if let Expr::Member { receiver, name, .. } = callee {
            if let Expr::Ident { name: alias, .. } = receiver {
                if let Some(module) = self.registry.imports.get(alias).copied() {
                    let mut arg_values = Vec::with_capacity(args.len());
                    for a in args {
                        arg_values.push(self.eval_expr(a, env)?);
                    }
                    let results = self.stdlib.call(module, *name, &arg_values, span, &self.file, self.source)?;
                    return Ok(results.into_iter().next().unwrap_or(Value::Unit));
                }
                if let Some(module_env) = self.modules.get(alias).cloned() {
                    let function = module_env.borrow().lookup(*name);
                    return match function {
                        Some(Value::Function(f)) => {
                            let mut arg_values = Vec::with_capacity(args.len());
                            for a in args {
                                arg_values.push(self.eval_call_arg(a, &f, arg_values.len(), env)?);
                            }
                            let results = self.call_function(&f, &arg_values, span)?;
                            Ok(results.into_iter().next().unwrap_or(Value::Unit))
                        }
                        _ => Err(self.error(ErrorCode::ImportNotFound, format!("unknown function '{}' in imported module", self.name(*name)), span)),
                    };
                }
            }

            // Every other `receiver.name(args)` shape: evaluate `receiver`
            // once and dispatch on its runtime value, rather than falling
            // through to the generic callee-expression path below (which
            // would re-evaluate `receiver` a second time).
            let receiver_val = self.eval_expr(receiver, env)?;
            return match &receiver_val {
                Value::Map(entries, _) => self.eval_map_method(entries, *name, span),
                Value::Struct(_, fields, _) => {
                    let field = fields.borrow().get(name).cloned();
                    match field {
                        Some(Value::Function(f)) => {
                            let mut arg_values = Vec::with_capacity(args.len());
                            for a in args {
                                arg_values.push(self.eval_call_arg(a, &f, arg_values.len(), env)?);
                            }
                            let results = self.call_function(&f, &arg_values, span)?;
                            Ok(results.into_iter().next().unwrap_or(Value::Unit))
                        }
                        Some(other) => Err(self.error(ErrorCode::TypeMismatch, format!("cannot call a {}", other.type_name()), span)),
                        None => Err(self.error(ErrorCode::TypeUnknownField, format!("unknown field '{}'", self.name(*name)), span)),
                    }
                }
                Value::Nil => Err(self.error(ErrorCode::RuntimeNilDereference, format!("cannot access field '{}' on nil", self.name(*name)), span)),
                _ => Err(self.error(ErrorCode::TypeMismatch, "member access requires a struct", span)),
            };
        }

        // Bare-call prelude: println/print/panic/assert/cast are not user
        // functions and are not stdlib-alias dispatched; they are the small
        // fixed set of built-ins every program can call unqualified.
        if let Expr::Ident { name, span: ident_span } = callee {
            if env.borrow().lookup(*name).is_none() {
                if let Some(result) = self.eval_prelude_call(*name, args, env, span, *ident_span)? {
                    return Ok(result);
                }
            }
        }

        let callee_val = self.eval_expr(callee, env)?;
        match callee_val {
            Value::Function(f) => {
                let mut arg_values = Vec::with_capacity(args.len());
                for a in args {
                    arg_values.push(self.eval_call_arg(a, &f, arg_values.len(), env)?);
                }
                let results = self.call_function(&f, &arg_values, span)?;
                Ok(results.into_iter().next().unwrap_or(Value::Unit))
            }
            other => Err(self.error(ErrorCode::TypeMismatch, format!("cannot call a {}", other.type_name()), span)),
        }
    }

    /// Evaluates one call argument, binding mutable (`&p`) parameters to a
    /// [`Value::Reference`] into the caller's own binding rather than a copy,
    /// per §4.6's function-call semantics.
    fn eval_call_arg(&mut self, arg: &'a Expr<'a>, callee: &FunctionValue<'a>, index: usize, env: &Rc<RefCell<Environment<'a>>>) -> EvalResult<'a, Value<'a>> {
        let param = callee.params.get(index);
        if let Some(param) = param {
            if param.mutable {
                if let Expr::Ident { name, .. } = arg {
                    return Ok(Value::Reference(env.clone(), *name));
                }
            }
        }
        let value = self.eval_expr(arg, env)?;
        Ok(match (&value, param.map(|p| p.mutable).unwrap_or(false)) {
            (Value::Array(items, _), false) => Value::Array(items.clone(), false),
            (Value::Map(entries, _), false) => Value::Map(entries.clone(), false),
            (Value::Struct(name, fields, _), false) => Value::Struct(*name, fields.clone(), false),
            _ => value,
        })
    }

    fn eval_prelude_call(
        &mut self,
        name: Symbol,
        args: &'a [&'a Expr<'a>],
        env: &Rc<RefCell<Environment<'a>>>,
        span: Span,
        _ident_span: Span,
    ) -> EvalResult<'a, Option<Value<'a>>> {
        if name.is(self.interner, "println") || name.is(self.interner, "print") {
            let mut parts = Vec::with_capacity(args.len());
            for a in args {
                parts.push(display_value(&self.eval_expr(a, env)?));
            }
            let text = parts.join(" ");
            if name.is(self.interner, "println") {
                println!("{}", text);
            } else {
                print!("{}", text);
            }
            return Ok(Some(Value::Unit));
        }
        if name.is(self.interner, "panic") {
            let message = match args.first() {
                Some(a) => display_value(&self.eval_expr(a, env)?),
                None => "explicit panic".to_string(),
            };
            return Err(self.error(ErrorCode::RuntimeTypeAssertionFailed, message, span));
        }
        if name.is(self.interner, "assert") {
            let cond = args.first().map(|a| self.eval_expr(a, env)).transpose()?.map(|v| v.is_truthy()).unwrap_or(false);
            if !cond {
                let message = match args.get(1) {
                    Some(a) => display_value(&self.eval_expr(a, env)?),
                    None => "assertion failed".to_string(),
                };
                return Err(self.error(ErrorCode::RuntimeTypeAssertionFailed, message, span));
            }
            return Ok(Some(Value::Unit));
        }
        if name.is(self.interner, "cast") {
            let value = match args.first() {
                Some(a) => self.eval_expr(a, env)?,
                None => return Err(self.error(ErrorCode::TypeArityMismatch, "'cast' takes a value and a target type", span)),
            };
            let type_name = match args.get(1) {
                Some(Expr::Ident { name, .. }) => *name,
                _ => return Err(self.error(ErrorCode::TypeUndefined, "'cast' target is not a known type", span)),
            };
            return Ok(Some(self.eval_cast(&value, type_name, span)?));
        }
        Ok(None)
    }

    fn eval_cast(&self, value: &Value<'a>, type_name: Symbol, span: Span) -> EvalResult<'a, Value<'a>> {
        let text = self.name(type_name).to_string();
        if let Some(_width) = crate::types::IntWidth::from_name(&text) {
            return match value {
                Value::Int(i) => Ok(Value::Int(i.clone())),
                Value::Float(f) => Ok(Value::Int(BigInt::from(*f as i64))),
                Value::Char(c) => Ok(Value::Int(BigInt::from(*c as u32))),
                Value::Byte(b) => Ok(Value::Int(BigInt::from(*b))),
                _ => Err(self.error(ErrorCode::RuntimeInvalidCast, format!("cannot cast {} to {}", value.type_name(), text), span)),
            };
        }
        if let Some(_width) = crate::types::FloatWidth::from_name(&text) {
            return match value {
                Value::Float(f) => Ok(Value::Float(*f)),
                Value::Int(i) => Ok(Value::Float(i.to_f64().unwrap_or(0.0))),
                _ => Err(self.error(ErrorCode::RuntimeInvalidCast, format!("cannot cast {} to {}", value.type_name(), text), span)),
            };
        }
        match text.as_str() {
            "string" => Ok(Value::String(Rc::new(RefCell::new(display_value(value))))),
            "byte" => match value {
                Value::Int(i) => i.to_u8().map(Value::Byte).ok_or_else(|| self.error(ErrorCode::RuntimeInvalidCast, "int out of byte range", span)),
                Value::Byte(b) => Ok(Value::Byte(*b)),
                _ => Err(self.error(ErrorCode::RuntimeInvalidCast, format!("cannot cast {} to byte", value.type_name()), span)),
            },
            "char" => match value {
                Value::Int(i) => i.to_u32().and_then(char::from_u32).map(Value::Char).ok_or_else(|| self.error(ErrorCode::RuntimeInvalidCast, "int is not a valid char", span)),
                Value::Char(c) => Ok(Value::Char(*c)),
                _ => Err(self.error(ErrorCode::RuntimeInvalidCast, format!("cannot cast {} to char", value.type_name()), span)),
            },
            _ => Err(self.error(ErrorCode::TypeUndefined, format!("'{}' is not a known cast target", text), span)),
        }
    }

    /// The ENTER → EVALUATING → (RETURN_SIGNAL | NORMAL_FALLTHROUGH | ERROR)
    /// → RUN_CLEANUP → DONE function-frame state machine (§4.6). Cleanup
    /// itself runs inside `eval_block` for the function body's own scope;
    /// this method only owns the call-depth guard and argument binding.
    fn call_function(&mut self, function: &Rc<FunctionValue<'a>>, args: &[Value<'a>], span: Span) -> EvalResult<'a, Vec<Value<'a>>> {
        self.call_depth += 1;
        if self.call_depth > MAX_CALL_DEPTH {
            self.call_depth -= 1;
            return Err(self.error(ErrorCode::RuntimeStackOverflow, "maximum call depth exceeded", span));
        }
        tracing::trace!(function = self.name(function.name), "calling function");

        let frame = Environment::child(&function.closure);
        for (i, param) in function.params.iter().enumerate() {
            let value = match args.get(i) {
                Some(v) => v.clone(),
                None => match param.default {
                    // Default initializers are evaluated once per call, in
                    // the callee scope, left-to-right (§4.6).
                    Some(expr) => self.eval_expr(expr, &frame)?,
                    None => Value::Nil,
                },
            };
            frame.borrow_mut().declare(param.name, value, param.mutable, Visibility::Public);
        }

        let result = self.eval_block(function.body, &frame);
        self.call_depth -= 1;
        match result? {
            Flow::Return(values) => Ok(values),
            // `break`/`continue` reaching a function-frame boundary is
            // rejected statically (no enclosing loop); treat as fallthrough
            // defensively rather than panic if it ever happens anyway.
            Flow::Normal | Flow::Break | Flow::Continue => Ok(Vec::new()),
        }
    }

    fn resolve_new_type(&self, ty: &ez_syntax::ast::TypeExpr, span: Span) -> EvalResult<'a, Type> {
        use ez_syntax::ast::TypeExpr;
        match ty {
            TypeExpr::Named(sym) => {
                let text = self.name(*sym);
                if let Some(w) = crate::types::IntWidth::from_name(text) {
                    return Ok(Type::Int(w));
                }
                if let Some(w) = crate::types::FloatWidth::from_name(text) {
                    return Ok(Type::Float(w));
                }
                match text {
                    "bool" => Ok(Type::Bool),
                    "char" => Ok(Type::Char),
                    "byte" => Ok(Type::Byte),
                    "string" => Ok(Type::String),
                    _ if self.registry.structs.contains_key(sym) => Ok(Type::Struct(*sym)),
                    _ if self.registry.enums.contains_key(sym) => Ok(Type::Enum(*sym)),
                    _ => Err(self.error(ErrorCode::TypeUndefined, "undefined type in 'new'", span)),
                }
            }
            TypeExpr::Array(_) => Ok(Type::Array(Box::new(Type::Any))),
            TypeExpr::FixedArray(_, n) => Ok(Type::FixedArray(Box::new(Type::Any), *n)),
            TypeExpr::Map(_, _) => Ok(Type::Map(Box::new(Type::Any), Box::new(Type::Any))),
        }
    }

    fn default_value_for_type(&self, ty: &Type) -> Value<'a> {
        match ty {
            Type::Int(_) => Value::Int(BigInt::zero()),
            Type::Float(_) => Value::Float(0.0),
            Type::Bool => Value::Bool(false),
            Type::Char => Value::Char('\0'),
            Type::Byte => Value::Byte(0),
            Type::String => Value::String(Rc::new(RefCell::new(String::new()))),
            Type::Array(_) | Type::FixedArray(..) => Value::Array(Rc::new(RefCell::new(Vec::new())), true),
            Type::Map(..) => Value::Map(Rc::new(RefCell::new(IndexMap::new())), true),
            Type::Struct(name) => {
                let fields = self
                    .registry
                    .structs
                    .get(name)
                    .map(|def| def.fields.iter().map(|(n, t, _)| (*n, self.default_value_for_type(t))).collect())
                    .unwrap_or_default();
                Value::Struct(*name, Rc::new(RefCell::new(fields)), true)
            }
            _ => Value::Nil,
        }
    }
}

fn as_index(value: &Value) -> Option<usize> {
    match value {
        Value::Int(i) => i.to_usize(),
        _ => None,
    }
}

fn as_bigint(value: &Value) -> BigInt {
    match value {
        Value::Int(i) => i.clone(),
        _ => BigInt::zero(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Char(x), Value::Char(y)) => x == y,
        (Value::Byte(x), Value::Byte(y)) => x == y,
        (Value::String(x), Value::String(y)) => *x.borrow() == *y.borrow(),
        (Value::Nil, Value::Nil) => true,
        (Value::Enum(e1, m1, _), Value::Enum(e2, m2, _)) => e1 == e2 && m1 == m2,
        _ => false,
    }
}

fn membership(needle: &Value, haystack: &Value) -> bool {
    match haystack {
        Value::Array(items, _) => items.borrow().iter().any(|v| values_equal(needle, v)),
        Value::Map(entries, _) => MapKey::from_value(needle).map(|k| entries.borrow().contains_key(&k)).unwrap_or(false),
        Value::String(s) => match needle {
            Value::Char(c) => s.borrow().contains(*c),
            Value::String(sub) => s.borrow().contains(sub.borrow().as_str()),
            _ => false,
        },
        Value::Range(start, end, _) => match needle {
            Value::Int(n) => n >= start && n < end,
            _ => false,
        },
        _ => false,
    }
}

fn apply_compound<'a>(op: CompoundOp, current: &Value<'a>, rhs: &Value<'a>) -> Result<Value<'a>, String> {
    let bin = match op {
        CompoundOp::Assign => unreachable!("Assign never reaches apply_compound"),
        CompoundOp::AddAssign => BinaryOp::Add,
        CompoundOp::SubAssign => BinaryOp::Sub,
        CompoundOp::MulAssign => BinaryOp::Mul,
        CompoundOp::DivAssign => BinaryOp::Div,
        CompoundOp::ModAssign => BinaryOp::Mod,
    };
    match (current, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(match bin {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div if !b.is_zero() => a / b,
            BinaryOp::Mod if !b.is_zero() => a % b,
            BinaryOp::Div | BinaryOp::Mod => return Err("division by zero".to_string()),
            _ => unreachable!(),
        })),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(match bin {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Mod => a % b,
            _ => unreachable!(),
        })),
        (Value::String(a), Value::String(b)) if matches!(bin, BinaryOp::Add) => Ok(Value::String(Rc::new(RefCell::new(format!("{}{}", a.borrow(), b.borrow()))))),
        _ => Err(format!("incompatible operand types '{}' and '{}'", current.type_name(), rhs.type_name())),
    }
}

/// Renders a value the way `println`/string interpolation show it.
fn display_value(value: &Value) -> String {
    match value {
        Value::Int(i) => i.to_string(),
        Value::Float(f) => {
            let s = format!("{:.6}", f);
            let s = s.trim_end_matches('0');
            s.trim_end_matches('.').to_string()
        }
        Value::Bool(b) => b.to_string(),
        Value::Char(c) => c.to_string(),
        Value::Byte(b) => b.to_string(),
        Value::String(s) => s.borrow().clone(),
        Value::Nil => "nil".to_string(),
        Value::Array(items, _) => {
            let parts: Vec<String> = items.borrow().iter().map(display_value).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Map(entries, _) => {
            let parts: Vec<String> = entries.borrow().iter().map(|(k, v)| format!("{}: {}", display_map_key(k), display_value(v))).collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::Struct(_, fields, _) => {
            let parts: Vec<String> = fields.borrow().iter().map(|(_, v)| display_value(v)).collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::Enum(_, member, _) => member.index().to_string(),
        Value::Function(_) | Value::Builtin(..) => "<function>".to_string(),
        Value::Reference(..) => "<reference>".to_string(),
        Value::Range(a, b, s) => format!("range({}, {}, {})", a, b, s),
        Value::TypeValue(t) => t.to_string(),
        Value::Module(_) => "<module>".to_string(),
        Value::FileHandle(h) => format!("<file {}>", h.path),
        Value::Error(inner) => format!("error: {}", display_value(inner)),
        Value::Unit => String::new(),
    }
}

fn display_map_key(key: &MapKey) -> String {
    match key {
        MapKey::Int(i) => i.to_string(),
        MapKey::Bool(b) => b.to_string(),
        MapKey::Char(c) => c.to_string(),
        MapKey::Byte(b) => b.to_string(),
        MapKey::String(s) => s.clone(),
        MapKey::Enum(_, member) => member.index().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Registry;
    use crate::stdlib_registry::StdlibRegistry;
    use ez_base::Arena;
    use ez_syntax::{Lexer, Parser};

    fn run_source(source: &str) -> (Vec<Value<'static>>, bool) {
        // Leak the arenas: keeping the evaluator's lifetime tied to locals
        // in a small test helper is more trouble than it's worth, and the
        // process exits right after the test.
        let interner: &'static mut Interner = Box::leak(Box::new(Interner::new()));
        let exprs: &'static Arena<Expr> = Box::leak(Box::new(Arena::new()));
        let stmts_arena: &'static Arena<Stmt> = Box::leak(Box::new(Arena::new()));
        let string_parts: &'static Arena<StringPart> = Box::leak(Box::new(Arena::new()));
        let source: &'static str = Box::leak(source.to_string().into_boxed_str());

        let lexer = Lexer::new(source, "main.ez", interner);
        let (tokens, lex_diags) = lexer.tokenize();
        assert!(!lex_diags.has_errors(), "lex errors: {:?}", lex_diags.errors());

        let parser = Parser::new(tokens, "main.ez", source, interner, exprs, stmts_arena, string_parts);
        let (program, diags) = parser.parse_program();
        assert!(!diags.has_errors(), "parse errors: {:?}", diags.errors());

        let registry: &'static mut Registry = Box::leak(Box::new(Registry::new()));
        let stdlib: &'static StdlibRegistry = Box::leak(Box::new(StdlibRegistry::new()));
        {
            let checker = crate::checker::Checker::new(interner, "main.ez", source, registry, stdlib);
            let check_diags = checker.check_program(&program.stmts);
            let _ = check_diags;
        }
        let mut evaluator = Evaluator::new(interner, "main.ez", source, registry, stdlib);
        match evaluator.run(&program.stmts) {
            Ok(values) => (values, false),
            Err(_) => (Vec::new(), true),
        }
    }

    #[test]
    fn evaluates_arithmetic_precedence() {
        let (_values, errored) = run_source("do main() { temp x int = 1 + 2 * 3 }");
        assert!(!errored);
    }

    #[test]
    fn mutable_parameter_is_visible_after_call() {
        let (_values, errored) = run_source(
            "do bump(&n int) { n = n + 1 }\n\
             do main() { temp x int = 5\n\
                         bump(x) }",
        );
        assert!(!errored);
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let (_values, errored) = run_source("do main() { temp x int = 1 / 0 }");
        assert!(errored);
    }

    #[test]
    fn range_with_zero_step_is_a_runtime_error() {
        let (_values, errored) = run_source("do main() { for i in range(0, 10, 0) { } }");
        assert!(errored);
    }
}
