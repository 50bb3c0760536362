//! Two-pass, cross-module-aware static type checker.
//!
//! Phase 1 (registration) records every top-level struct/enum/function/
//! global's type without validating bodies, so declaration order within a
//! file never matters. Phase 2 (body checking) walks each function body and
//! top-level statement, computing expression types and enforcing the
//! mutability, exhaustiveness, and return-path rules.
//!
//! Cross-module lookups go through `registry`, pre-populated by the module
//! loader before this checker runs, rather than the checker resolving
//! imports itself.

use crate::module::{module_basename, Registry};
use crate::stdlib_registry::StdlibRegistry;
use crate::types::{EnumDef, FloatWidth, FunctionSig, IntWidth, ParamType, StructDef, Type};
use ez_base::diagnostic::{Diagnostic, DiagnosticList, ErrorCode, Severity};
use ez_base::{Interner, Span, Symbol};
use ez_syntax::ast::{
    BinaryOp, Block, Expr, FieldInit, ImportSpec, Literal, Param, Stmt, StringPart, TypeExpr, UnaryOp, WhenPattern,
};
use std::collections::HashMap;

#[derive(Clone)]
struct LocalVar {
    ty: Type,
    mutable: bool,
}

pub struct Checker<'a> {
    pub interner: &'a Interner,
    pub file: String,
    pub source: &'a str,
    pub registry: &'a mut Registry,
    pub stdlib: &'a StdlibRegistry,
    diagnostics: DiagnosticList,
    locals: Vec<HashMap<Symbol, LocalVar>>,
    loop_depth: usize,
    current_returns: Vec<Type>,
}

type TResult<T> = Result<T, ()>;

impl<'a> Checker<'a> {
    pub fn new(interner: &'a Interner, file: impl Into<String>, source: &'a str, registry: &'a mut Registry, stdlib: &'a StdlibRegistry) -> Self {
        Checker {
            interner,
            file: file.into(),
            source,
            registry,
            stdlib,
            diagnostics: DiagnosticList::new(),
            locals: vec![HashMap::new()],
            loop_depth: 0,
            current_returns: Vec::new(),
        }
    }

    pub fn check_program(mut self, stmts: &[&'a Stmt<'a>]) -> DiagnosticList {
        for stmt in stmts {
            self.register_top_level(stmt);
        }
        for stmt in stmts {
            self.check_top_level(stmt);
        }
        self.diagnostics
    }

    fn error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        self.diagnostics
            .push(Diagnostic::from_span(code, message, self.file.clone(), self.source, span, Severity::Error));
    }

    fn name(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    // ---- phase 1: registration ----

    fn register_top_level(&mut self, stmt: &'a Stmt<'a>) {
        match stmt {
            Stmt::StructDecl { name, fields, .. } => {
                let mut out = Vec::new();
                for field in fields {
                    let ty = self.resolve_type_expr(&field.ty).unwrap_or(Type::Error);
                    out.push((field.name, ty, field.default));
                }
                self.registry.structs.insert(*name, StructDef { name: *name, fields: out });
            }
            Stmt::EnumDecl { name, members, .. } => {
                let underlying = members
                    .iter()
                    .find_map(|(_, value)| value.and_then(|e| self.literal_type(e)))
                    .unwrap_or(Type::Int(IntWidth::Int));
                let member_names = members.iter().map(|(n, _)| *n).collect();
                self.registry.enums.insert(
                    *name,
                    EnumDef {
                        name: *name,
                        underlying,
                        members: member_names,
                    },
                );
            }
            Stmt::FnDecl {
                name, params, returns, ..
            } => {
                let param_types = params
                    .iter()
                    .map(|p: &Param| ParamType {
                        ty: self.resolve_type_expr(&p.ty).unwrap_or(Type::Error),
                        mutable: p.mutable,
                        has_default: p.default.is_some(),
                    })
                    .collect();
                let return_types = returns
                    .iter()
                    .map(|t| self.resolve_type_expr(t).unwrap_or(Type::Error))
                    .collect();
                self.registry.functions.insert(
                    *name,
                    FunctionSig {
                        params: param_types,
                        returns: return_types,
                    },
                );
            }
            Stmt::VarDecl { mutable, names, ty, .. } => {
                let resolved = ty.as_ref().and_then(|t| self.resolve_type_expr(t).ok()).unwrap_or(Type::Error);
                for n in names {
                    self.registry.globals.insert(*n, (resolved.clone(), *mutable));
                }
            }
            Stmt::Import {
                spec: ImportSpec::Stdlib { alias, name },
                ..
            } => {
                self.registry.imports.insert(alias.unwrap_or(*name), *name);
            }
            _ => {}
        }
    }

    fn literal_type(&self, expr: &Expr) -> Option<Type> {
        match expr {
            Expr::Literal { value: Literal::Int(_), .. } => Some(Type::Int(IntWidth::Int)),
            Expr::Literal { value: Literal::Float(_), .. } => Some(Type::Float(FloatWidth::Float)),
            _ => None,
        }
    }

    fn resolve_type_expr(&self, te: &TypeExpr) -> TResult<Type> {
        match te {
            TypeExpr::Named(sym) => {
                let text = self.name(*sym);
                if let Some(w) = IntWidth::from_name(text) {
                    return Ok(Type::Int(w));
                }
                if let Some(w) = FloatWidth::from_name(text) {
                    return Ok(Type::Float(w));
                }
                match text {
                    "bool" => return Ok(Type::Bool),
                    "char" => return Ok(Type::Char),
                    "byte" => return Ok(Type::Byte),
                    "string" => return Ok(Type::String),
                    "void" => return Ok(Type::Void),
                    "nil" => return Ok(Type::Nil),
                    "error" => return Ok(Type::Error),
                    "any" => return Ok(Type::Any),
                    _ => {}
                }
                if self.registry.structs.contains_key(sym) {
                    return Ok(Type::Struct(*sym));
                }
                if self.registry.enums.contains_key(sym) {
                    return Ok(Type::Enum(*sym));
                }
                Err(())
            }
            TypeExpr::Array(inner) => Ok(Type::Array(Box::new(self.resolve_type_expr(inner)?))),
            TypeExpr::FixedArray(inner, n) => Ok(Type::FixedArray(Box::new(self.resolve_type_expr(inner)?), *n)),
            TypeExpr::Map(k, v) => Ok(Type::Map(Box::new(self.resolve_type_expr(k)?), Box::new(self.resolve_type_expr(v)?))),
        }
    }

    // ---- phase 2: body checking ----

    fn check_top_level(&mut self, stmt: &'a Stmt<'a>) {
        match stmt {
            Stmt::FnDecl { name, params, body, .. } => {
                let sig = self.registry.functions.get(name).cloned();
                self.locals.push(HashMap::new());
                if let Some(sig) = &sig {
                    for (p, pt) in params.iter().zip(sig.params.iter()) {
                        self.declare_local(p.name, pt.ty.clone(), pt.mutable);
                    }
                    self.current_returns = sig.returns.clone();
                } else {
                    self.current_returns.clear();
                }
                self.check_block(body);
                if !self.current_returns.is_empty() && !self.current_returns.iter().all(|t| *t == Type::Void) {
                    if !block_always_returns(body) {
                        self.error(
                            ErrorCode::TypeMissingReturn,
                            format!("function '{}' does not return on every path", self.name(*name)),
                            body.span,
                        );
                    }
                }
                self.locals.pop();
            }
            Stmt::VarDecl { .. } => {
                self.check_stmt(stmt);
            }
            _ => self.check_stmt(stmt),
        }
    }

    fn declare_local(&mut self, name: Symbol, ty: Type, mutable: bool) {
        self.locals.last_mut().unwrap().insert(name, LocalVar { ty, mutable });
    }

    fn lookup_local(&self, name: Symbol) -> Option<LocalVar> {
        for frame in self.locals.iter().rev() {
            if let Some(v) = frame.get(&name) {
                return Some(v.clone());
            }
        }
        None
    }

    fn check_block(&mut self, block: &'a Block<'a>) {
        self.locals.push(HashMap::new());
        for stmt in block.stmts {
            self.check_stmt(stmt);
        }
        self.locals.pop();
    }

    fn check_stmt(&mut self, stmt: &'a Stmt<'a>) {
        match stmt {
            Stmt::VarDecl {
                mutable, names, ty, init, span, ..
            } => {
                let declared = ty.as_ref().map(|t| self.resolve_type_expr(t).unwrap_or(Type::Error));
                if !mutable && init.is_empty() {
                    self.error(ErrorCode::TypeMismatch, "'const' declarations must be initialized", *span);
                }
                let mut init_types = Vec::new();
                for e in init {
                    init_types.push(self.check_expr(e));
                }
                for (i, n) in names.iter().enumerate() {
                    let ty = declared.clone().or_else(|| init_types.get(i).cloned()).unwrap_or(Type::Error);
                    self.declare_local(*n, ty, *mutable);
                }
            }
            Stmt::Assign { op, target, value, span } => {
                let _ = op;
                self.check_assign_target(target);
                let _ = self.check_expr(value);
                let _ = span;
            }
            Stmt::Return { values, .. } => {
                for v in values {
                    self.check_expr(v);
                }
            }
            Stmt::ExprStmt { expr, .. } => {
                self.check_expr(expr);
            }
            Stmt::Block(block) => self.check_block(block),
            Stmt::If { arms, otherwise, .. } => {
                for arm in arms {
                    self.check_expr(arm.cond);
                    self.check_block(&arm.body);
                }
                if let Some(o) = otherwise {
                    self.check_block(o);
                }
            }
            Stmt::For {
                var, var_ty, iterable, body, span, ..
            } => {
                let iterable_ty = self.check_expr(iterable);
                let elem_ty = match &iterable_ty {
                    Type::Array(t) => (**t).clone(),
                    Type::String => Type::Char,
                    Type::Range => Type::Int(IntWidth::Int),
                    _ => {
                        self.error(ErrorCode::TypeMismatch, "'for' requires an array, string, or Range", *span);
                        Type::Error
                    }
                };
                let declared = var_ty.as_ref().map(|t| self.resolve_type_expr(t).unwrap_or(Type::Error));
                self.locals.push(HashMap::new());
                self.declare_local(*var, declared.unwrap_or(elem_ty), false);
                self.loop_depth += 1;
                self.check_block(body);
                self.loop_depth -= 1;
                self.locals.pop();
            }
            Stmt::ForEach { var, collection, body, span, .. } => {
                let ty = self.check_expr(collection);
                let elem_ty = match &ty {
                    Type::Array(t) => (**t).clone(),
                    Type::String => Type::Char,
                    Type::Map(..) => {
                        self.error(ErrorCode::TypeMismatch, "'for_each' over a map is not allowed; use keys()/values()", *span);
                        Type::Error
                    }
                    _ => {
                        self.error(ErrorCode::TypeMismatch, "'for_each' requires an array or string", *span);
                        Type::Error
                    }
                };
                self.locals.push(HashMap::new());
                self.declare_local(*var, elem_ty, false);
                self.loop_depth += 1;
                self.check_block(body);
                self.loop_depth -= 1;
                self.locals.pop();
            }
            Stmt::AsLongAs { cond, body, .. } => {
                self.check_expr(cond);
                self.loop_depth += 1;
                self.check_block(body);
                self.loop_depth -= 1;
            }
            Stmt::Loop { body, .. } => {
                self.loop_depth += 1;
                self.check_block(body);
                self.loop_depth -= 1;
            }
            Stmt::Break { span } | Stmt::Continue { span } => {
                if self.loop_depth == 0 {
                    self.error(ErrorCode::ParseUnexpectedToken, "'break'/'continue' outside a loop", *span);
                }
            }
            Stmt::When {
                scrutinee,
                arms,
                default,
                strict,
                span,
            } => {
                let scrutinee_ty = self.check_expr(scrutinee);
                for arm in arms {
                    match &arm.pattern {
                        WhenPattern::Expr(e) => {
                            if *strict {
                                self.error(ErrorCode::TypeMismatch, "'#strict when' arms must be enum members", e.span());
                            }
                            self.check_expr(e);
                        }
                        WhenPattern::EnumMember(_, _) => {}
                    }
                    self.check_block(&arm.body);
                }
                if let Some(d) = default {
                    self.check_block(d);
                }
                if *strict {
                    if let Type::Enum(enum_name) = &scrutinee_ty {
                        if let Some(def) = self.registry.enums.get(enum_name).cloned() {
                            let mut covered: Vec<Symbol> = Vec::new();
                            for arm in arms {
                                if let WhenPattern::EnumMember(_, member) = arm.pattern {
                                    covered.push(member);
                                }
                            }
                            let missing: Vec<&str> = def
                                .members
                                .iter()
                                .filter(|m| !covered.contains(m))
                                .map(|m| self.name(*m))
                                .collect();
                            if !missing.is_empty() && default.is_none() {
                                self.error(
                                    ErrorCode::TypeNonExhaustiveWhen,
                                    format!("missing arms for: {}", missing.join(", ")),
                                    *span,
                                );
                            }
                        }
                    }
                }
            }
            Stmt::Ensure { body, .. } => self.check_block(body),
            Stmt::Import { spec, span } => self.check_import(spec, *span),
            Stmt::Using { .. } => {}
            Stmt::FnDecl { .. } | Stmt::StructDecl { .. } | Stmt::EnumDecl { .. } | Stmt::ModuleHeader { .. } => {}
        }
    }

    fn check_import(&mut self, spec: &ImportSpec, span: Span) {
        match spec {
            ImportSpec::Stdlib { name, .. } => {
                if !self.stdlib.has_module(*name) {
                    self.error(ErrorCode::ImportNotFound, format!("unknown stdlib module '{}'", self.name(*name)), span);
                }
            }
            ImportSpec::Path { alias, path } => {
                // The driver's import pre-pass (see `ez-cli::resolve_path_imports`)
                // resolves and merges `Path` imports into `registry.modules`
                // before this checker runs; here we only confirm that merge
                // actually happened, since a failed resolve there already
                // reports its own `ImportNotFound`/`ImportCycle` diagnostic.
                let key = match alias {
                    Some(a) => Some(*a),
                    None => self.interner.lookup(module_basename(path)),
                };
                let resolved = key.is_some_and(|k| self.registry.modules.contains_key(&k));
                if !resolved {
                    self.error(ErrorCode::ImportNotFound, format!("module '{}' was not resolved", path), span);
                }
            }
        }
    }

    fn check_assign_target(&mut self, target: &'a Expr<'a>) {
        match target {
            Expr::Ident { name, span } => {
                let mutable = self
                    .lookup_local(*name)
                    .map(|l| l.mutable)
                    .or_else(|| self.registry.globals.get(name).map(|(_, m)| *m));
                match mutable {
                    Some(true) => {}
                    Some(false) => self.error(ErrorCode::RefImmutableAssignment, format!("cannot assign to immutable '{}'", self.name(*name)), *span),
                    None => self.error(ErrorCode::TypeUndefined, format!("undefined variable '{}'", self.name(*name)), *span),
                }
            }
            Expr::Index { receiver, index, .. } => {
                self.check_expr(receiver);
                self.check_expr(index);
            }
            Expr::Member { receiver, .. } => {
                self.check_expr(receiver);
            }
            _ => {
                self.check_expr(target);
            }
        }
    }

    fn check_expr(&mut self, expr: &'a Expr<'a>) -> Type {
        match expr {
            Expr::Ident { name, span } => {
                if let Some(local) = self.lookup_local(*name) {
                    return local.ty;
                }
                if let Some((ty, _)) = self.registry.globals.get(name) {
                    return ty.clone();
                }
                if self.registry.functions.contains_key(name) {
                    return Type::Function(Box::new(self.registry.functions[name].clone()));
                }
                self.error(ErrorCode::RuntimeUndefinedVariable, format!("undefined variable '{}'", self.name(*name)), *span);
                Type::Error
            }
            Expr::Blank { .. } => Type::Any,
            Expr::Literal { value, .. } => match value {
                Literal::Int(_) => Type::Int(IntWidth::Int),
                Literal::Float(_) => Type::Float(FloatWidth::Float),
                Literal::Bool(_) => Type::Bool,
                Literal::Char(_) => Type::Char,
                Literal::Nil => Type::Nil,
            },
            Expr::StringLit { parts, .. } => {
                for p in *parts {
                    if let StringPart::Expr(e) = p {
                        self.check_expr(e);
                    }
                }
                Type::String
            }
            Expr::ArrayLit { elements, span } => {
                let mut elem_ty = None;
                for e in *elements {
                    let t = self.check_expr(e);
                    elem_ty.get_or_insert(t);
                }
                Type::Array(Box::new(elem_ty.unwrap_or_else(|| {
                    let _ = span;
                    Type::Any
                })))
            }
            Expr::MapLit { entries, .. } => {
                let mut kt = None;
                let mut vt = None;
                for (k, v) in *entries {
                    let k_ty = self.check_expr(k);
                    let v_ty = self.check_expr(v);
                    kt.get_or_insert(k_ty);
                    vt.get_or_insert(v_ty);
                }
                Type::Map(Box::new(kt.unwrap_or(Type::Any)), Box::new(vt.unwrap_or(Type::Any)))
            }
            Expr::StructLit { ty, fields, span } => {
                self.check_struct_lit(*ty, fields, *span);
                Type::Struct(*ty)
            }
            Expr::Unary { op, operand, span } => {
                let t = self.check_expr(operand);
                match op {
                    UnaryOp::Neg if !t.is_numeric() => {
                        self.error(ErrorCode::TypeMismatch, "unary '-' requires a numeric operand", *span);
                        Type::Error
                    }
                    UnaryOp::Not if t != Type::Bool => {
                        self.error(ErrorCode::TypeMismatch, "unary '!' requires a bool operand", *span);
                        Type::Error
                    }
                    _ => t,
                }
            }
            Expr::Binary { op, left, right, span } => self.check_binary(*op, left, right, *span),
            Expr::Postfix { operand, .. } => self.check_expr(operand),
            Expr::Call { callee, args, span } => self.check_call(callee, args, *span),
            Expr::Index { receiver, index, span } => {
                let r = self.check_expr(receiver);
                let i = self.check_expr(index);
                match r {
                    Type::Array(t) | Type::FixedArray(t, _) => *t,
                    Type::Map(_, v) => *v,
                    Type::String => Type::Char,
                    _ => {
                        let _ = i;
                        self.error(ErrorCode::TypeMismatch, "indexing requires an array, map, or string", *span);
                        Type::Error
                    }
                }
            }
            Expr::Member { receiver, name, span } => {
                let r = self.check_expr(receiver);
                if let Type::Struct(sname) = &r {
                    if let Some(def) = self.registry.structs.get(sname) {
                        if let Some((_, ty, _)) = def.field(*name) {
                            return ty.clone();
                        }
                    }
                    self.error(ErrorCode::TypeUnknownField, format!("unknown field '{}'", self.name(*name)), *span);
                }
                Type::Error
            }
            Expr::New { ty, span } => self.resolve_type_expr(ty).unwrap_or_else(|_| {
                self.error(ErrorCode::TypeUndefined, "undefined type in 'new'", *span);
                Type::Error
            }),
            Expr::Range { start, end, step, .. } => {
                self.check_expr(start);
                self.check_expr(end);
                if let Some(s) = step {
                    self.check_expr(s);
                }
                Type::Range
            }
        }
    }

    fn check_struct_lit(&mut self, ty: Symbol, fields: &[FieldInit], span: Span) {
        let def = self.registry.structs.get(&ty).cloned();
        let Some(def) = def else {
            self.error(ErrorCode::TypeUndefined, format!("undefined struct '{}'", self.name(ty)), span);
            return;
        };
        for f in fields {
            self.check_expr(f.value);
        }
        for (fname, _, has_default) in &def.fields {
            if *has_default {
                continue;
            }
            if !fields.iter().any(|f| f.name == *fname) {
                self.error(
                    ErrorCode::TypeArityMismatch,
                    format!("missing field '{}' in struct literal", self.name(*fname)),
                    span,
                );
            }
        }
    }

    fn check_binary(&mut self, op: BinaryOp, left: &'a Expr<'a>, right: &'a Expr<'a>, span: Span) -> Type {
        let lt = self.check_expr(left);
        let rt = self.check_expr(right);
        match op {
            BinaryOp::Add if lt == Type::String && rt == Type::String => Type::String,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                if lt == rt && lt.is_numeric() {
                    return lt;
                }
                match Type::promote_numeric(&lt, &rt) {
                    Some(t) => t,
                    None => {
                        self.error(
                            ErrorCode::TypeMismatch,
                            format!("incompatible operand types '{}' and '{}'; use an explicit cast", lt, rt),
                            span,
                        );
                        Type::Error
                    }
                }
            }
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => Type::Bool,
            BinaryOp::And | BinaryOp::Or => {
                if lt != Type::Bool || rt != Type::Bool {
                    self.error(ErrorCode::TypeMismatch, "logical operators require bool operands", span);
                }
                Type::Bool
            }
            BinaryOp::In | BinaryOp::NotIn => {
                match &rt {
                    Type::Array(_) | Type::Map(..) | Type::String | Type::Range => {}
                    _ => self.error(ErrorCode::TypeMismatch, "'in' requires an array, map, string, or Range on the right", span),
                }
                Type::Bool
            }
        }
    }

    fn check_call(&mut self, callee: &'a Expr<'a>, args: &[&'a Expr<'a>], span: Span) -> Type {
        // `alias.func(args)` stdlib dispatch is resolved by name shape, not by
        // the callee's static type, since stdlib modules are not struct values.
        if let Expr::Member { receiver, name, .. } = callee {
            if let Expr::Ident { name: alias, .. } = receiver {
                if let Some(module) = self.registry.imports.get(alias).copied() {
                    for a in args {
                        self.check_expr(a);
                    }
                    return match self.stdlib.signature(module, *name) {
                        Some(sig) => sig.returns.first().cloned().unwrap_or(Type::Void),
                        None => {
                            self.error(ErrorCode::StdlibUnknownFunction, format!("unknown stdlib function '{}'", self.name(*name)), span);
                            Type::Error
                        }
                    };
                }
                if let Some(loaded) = self.registry.modules.get(alias) {
                    let sig = loaded.exports.get(name).cloned();
                    for a in args {
                        self.check_expr(a);
                    }
                    return match sig {
                        Some(sig) => sig.returns.first().cloned().unwrap_or(Type::Void),
                        None => {
                            self.error(ErrorCode::ImportNotFound, format!("unknown function '{}' in imported module", self.name(*name)), span);
                            Type::Error
                        }
                    };
                }
            }

            // Every other `receiver.name(args)` shape: type `receiver` once
            // here and dispatch on its static type, rather than falling
            // through to the generic callee-expression path below (which
            // would re-type `receiver` a second time and double-report any
            // error within it).
            let receiver_ty = self.check_expr(receiver);
            match &receiver_ty {
                // `m.keys()`/`m.values()` are the two member methods a map
                // value supports; map iteration has no syntax of its own
                // (spec.md:118).
                Type::Map(key_ty, val_ty) => {
                    for a in args {
                        self.check_expr(a);
                    }
                    return match self.name(*name) {
                        "keys" => Type::Array(key_ty.clone()),
                        "values" => Type::Array(val_ty.clone()),
                        other => {
                            self.error(ErrorCode::TypeUnknownField, format!("maps have no method '{}'; use keys()/values()", other), span);
                            Type::Error
                        }
                    };
                }
                Type::Struct(sname) => {
                    let field_ty = self.registry.structs.get(sname).and_then(|def| def.field(*name)).map(|(_, ty, _)| ty.clone());
                    return match field_ty {
                        Some(Type::Function(sig)) => self.check_call_sig(*sig, args, span),
                        Some(_) => {
                            self.error(ErrorCode::TypeMismatch, format!("field '{}' is not callable", self.name(*name)), span);
                            for a in args {
                                self.check_expr(a);
                            }
                            Type::Error
                        }
                        None => {
                            self.error(ErrorCode::TypeUnknownField, format!("unknown field '{}'", self.name(*name)), span);
                            for a in args {
                                self.check_expr(a);
                            }
                            Type::Error
                        }
                    };
                }
                _ => {
                    self.error(ErrorCode::TypeMismatch, "call target is not a function", span);
                    for a in args {
                        self.check_expr(a);
                    }
                    return Type::Error;
                }
            }
        }

        // Bare-call prelude (println/print/panic/assert/cast): only consulted
        // when the name isn't shadowed by a local, global, or user function,
        // mirroring the evaluator's own dispatch order.
        if let Expr::Ident { name, .. } = callee {
            if self.lookup_local(*name).is_none() && !self.registry.globals.contains_key(name) && !self.registry.functions.contains_key(name) {
                if let Some(ty) = self.check_prelude_call(*name, args, span) {
                    return ty;
                }
            }
        }

        let callee_ty = self.check_expr(callee);
        let sig = match callee_ty {
            Type::Function(sig) => *sig,
            _ => {
                self.error(ErrorCode::TypeMismatch, "call target is not a function", span);
                for a in args {
                    self.check_expr(a);
                }
                return Type::Error;
            }
        };
        self.check_call_sig(sig, args, span)
    }

    /// Checks a call's arguments against an already-resolved signature:
    /// arity, then each argument's type and mutable-parameter lvalue rule.
    fn check_call_sig(&mut self, sig: FunctionSig, args: &[&'a Expr<'a>], span: Span) -> Type {
        let min_args = sig.params.iter().filter(|p| !p.has_default).count();
        if args.len() < min_args || args.len() > sig.params.len() {
            self.error(ErrorCode::TypeArityMismatch, format!("expected {} argument(s), found {}", sig.params.len(), args.len()), span);
        }
        for (i, a) in args.iter().enumerate() {
            let arg_ty = self.check_expr(a);
            if let Some(param) = sig.params.get(i) {
                if param.mutable && !is_assignable_target(a) {
                    self.error(ErrorCode::RefConstToMutableParam, "cannot pass a const or literal to a mutable (`&p`) parameter", a.span());
                }
                let _ = arg_ty;
            }
        }
        sig.returns.first().cloned().unwrap_or(Type::Void)
    }

    /// Types the small fixed set of built-ins every program can call
    /// unqualified. `None` means `name` isn't one of these, so the caller
    /// should fall back to ordinary function-call resolution.
    fn check_prelude_call(&mut self, name: Symbol, args: &[&'a Expr<'a>], span: Span) -> Option<Type> {
        let text = self.name(name).to_string();
        match text.as_str() {
            "println" | "print" => {
                for a in args {
                    self.check_expr(a);
                }
                Some(Type::Void)
            }
            "panic" => {
                if let Some(a) = args.first() {
                    self.check_expr(a);
                }
                Some(Type::Error)
            }
            "assert" => {
                if let Some(a) = args.first() {
                    self.check_expr(a);
                }
                if let Some(a) = args.get(1) {
                    self.check_expr(a);
                }
                Some(Type::Void)
            }
            "cast" => {
                if args.len() != 2 {
                    self.error(ErrorCode::TypeArityMismatch, "'cast' takes a value and a target type", span);
                    return Some(Type::Error);
                }
                self.check_expr(args[0]);
                let target = match args[1] {
                    Expr::Ident { name: type_name, .. } => self.resolve_type_expr(&TypeExpr::Named(*type_name)),
                    _ => Err(()),
                };
                match target {
                    Ok(ty) => Some(ty),
                    Err(()) => {
                        self.error(ErrorCode::TypeUndefined, "'cast' target is not a known type", args[1].span());
                        Some(Type::Error)
                    }
                }
            }
            _ => None,
        }
    }
}

/// A mutable (`&p`) parameter only binds to a plain identifier — the
/// evaluator only constructs a `Value::Reference` for `Expr::Ident` call
/// arguments (see `eval_call_arg`), so accepting `Index`/`Member` shapes
/// here would approve an argument the evaluator silently copies instead of
/// aliasing.
fn is_assignable_target(expr: &Expr) -> bool {
    matches!(expr, Expr::Ident { .. })
}

/// Return-path analysis (§4.4): an `if`/`or`/…/`otherwise` chain covers iff
/// every arm and the `otherwise` branch return; a lone `if` without
/// `otherwise` never covers; a loop body never covers (it may iterate zero
/// times).
fn block_always_returns(block: &Block) -> bool {
    block.stmts.iter().any(|s| stmt_always_returns(s))
}

fn stmt_always_returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return { .. } => true,
        Stmt::Block(b) => block_always_returns(b),
        Stmt::If { arms, otherwise, .. } => {
            otherwise.as_ref().map(block_always_returns).unwrap_or(false) && arms.iter().all(|a| block_always_returns(&a.body))
        }
        Stmt::When { arms, default, .. } => {
            default.as_ref().map(block_always_returns).unwrap_or(false) && arms.iter().all(|a| block_always_returns(&a.body))
        }
        Stmt::Ensure { .. } => false,
        _ => false,
    }
}
