//! Pratt-precedence parser: token stream → AST.
//!
//! Maintains a [`ScopeStack`] for duplicate-name detection and allocates
//! every AST node out of caller-provided arenas so the resulting tree's
//! lifetime matches the arena's, not the parser's.

use crate::ast::expr::{BinaryOp, Expr, FieldInit, Literal, PostfixOp, StringPart, UnaryOp};
use crate::ast::stmt::{
    Attribute, Block, CompoundOp, Field, IfArm, ImportSpec, Param, Program, Stmt, Visibility, WhenArm, WhenPattern,
};
use crate::ast::ty::TypeExpr;
use crate::scope::ScopeStack;
use crate::token::{Token, TokenKind};
use ez_base::diagnostic::{Diagnostic, DiagnosticList, ErrorCode, Severity};
use ez_base::{Arena, Interner, Span, Symbol};

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    file: String,
    source: &'a str,
    interner: &'a mut Interner,
    exprs: &'a Arena<Expr<'a>>,
    stmts: &'a Arena<Stmt<'a>>,
    string_parts: &'a Arena<StringPart<'a>>,
    scope: ScopeStack,
    diagnostics: DiagnosticList,
    /// Set while parsing an `if`/`for`/`as_long_as`/`when` condition, so a
    /// bare `Ident {` there parses as the start of that construct's block
    /// rather than being swallowed as a struct literal.
    no_struct_lit: bool,
}

type PResult<T> = Result<T, ()>;

/// Is `kind` a closing delimiter, so a missing one is reported as
/// "unclosed" rather than a generic unexpected-token mismatch?
fn is_closing_delimiter(kind: &TokenKind) -> bool {
    matches!(kind, TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket)
}

impl<'a> Parser<'a> {
    pub fn new(
        tokens: Vec<Token>,
        file: impl Into<String>,
        source: &'a str,
        interner: &'a mut Interner,
        exprs: &'a Arena<Expr<'a>>,
        stmts: &'a Arena<Stmt<'a>>,
        string_parts: &'a Arena<StringPart<'a>>,
    ) -> Self {
        Parser {
            tokens,
            pos: 0,
            file: file.into(),
            source,
            interner,
            exprs,
            stmts,
            string_parts,
            scope: ScopeStack::new(),
            diagnostics: DiagnosticList::new(),
            no_struct_lit: false,
        }
    }

    /// Parses an expression in a position immediately followed by a block
    /// (`if cond { ... }`, `for x in iter { ... }`, ...), where a bare
    /// `Name {` must start that block, not a struct literal.
    fn parse_condition(&mut self) -> PResult<&'a Expr<'a>> {
        let saved = self.no_struct_lit;
        self.no_struct_lit = true;
        let result = self.parse_expr();
        self.no_struct_lit = saved;
        result
    }

    /// Parses a sub-expression inside a closing delimiter (`(...)`, `[...]`,
    /// call args, struct-literal field values) where the struct-literal
    /// ambiguity a block-introducing context worries about doesn't apply.
    fn parse_unrestricted(&mut self) -> PResult<&'a Expr<'a>> {
        let saved = self.no_struct_lit;
        self.no_struct_lit = false;
        let result = self.parse_expr();
        self.no_struct_lit = saved;
        result
    }

    pub fn parse_program(mut self) -> (Program<'a>, DiagnosticList) {
        let mut module_header = None;
        let mut stmts = Vec::new();

        if self.peek_kind() == &TokenKind::Module {
            if let Ok(name) = self.parse_module_header() {
                module_header = Some(name);
            }
        }

        while !self.at_eof() {
            match self.parse_top_level() {
                Ok(stmt) => stmts.push(stmt),
                Err(()) => self.recover_to_next_statement(),
            }
        }

        (Program { module_header, stmts }, self.diagnostics)
    }

    // ---- token stream helpers ----

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if !self.at_eof() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek().clone();
            let code = if is_closing_delimiter(kind) {
                ErrorCode::ParseUnclosedDelimiter
            } else {
                ErrorCode::ParseUnexpectedToken
            };
            self.error(code, format!("expected {}, found {:?}", what, tok.kind), self.span_of(&tok));
            Err(())
        }
    }

    fn span_of(&self, tok: &Token) -> Span {
        Span::new(tok.byte_offset, tok.byte_offset + 1)
    }

    fn error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let diag = Diagnostic::from_span(code, message, self.file.clone(), self.source, span, Severity::Error);
        self.diagnostics.push(diag);
    }

    fn warn(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let diag = Diagnostic::from_span(code, message, self.file.clone(), self.source, span, Severity::Warning);
        self.diagnostics.push(diag);
    }

    fn recover_to_next_statement(&mut self) {
        while !self.at_eof() {
            if self.peek_kind().starts_statement() || matches!(self.peek_kind(), TokenKind::RBrace) {
                break;
            }
            self.advance();
        }
    }

    fn expect_ident(&mut self) -> PResult<(Symbol, Span)> {
        let tok = self.peek().clone();
        if let TokenKind::Ident(sym) = tok.kind {
            self.advance();
            Ok((sym, self.span_of(&tok)))
        } else if let Some(keyword) = tok.kind.keyword_text() {
            self.error(
                ErrorCode::ParseReservedName,
                format!("'{}' is a reserved word and cannot be used as an identifier", keyword),
                self.span_of(&tok),
            );
            Err(())
        } else {
            self.error(
                ErrorCode::ParseExpectedIdentifier,
                "expected an identifier",
                self.span_of(&tok),
            );
            Err(())
        }
    }

    // ---- declarations ----

    fn parse_module_header(&mut self) -> PResult<Symbol> {
        let start = self.span_of(self.peek());
        self.expect(&TokenKind::Module, "'module'")?;
        let (name, _) = self.expect_ident()?;
        let _ = start;
        Ok(name)
    }

    fn parse_attributes(&mut self) -> Vec<Attribute> {
        let mut attrs = Vec::new();
        while self.check(&TokenKind::Hash) {
            let start = self.span_of(self.peek());
            self.advance();
            let name = match self.expect_ident() {
                Ok((n, _)) => n,
                Err(()) => continue,
            };
            let mut args = Vec::new();
            if self.eat(&TokenKind::LParen) {
                while !self.check(&TokenKind::RParen) && !self.at_eof() {
                    if let Ok((arg, _)) = self.expect_ident() {
                        args.push(self.interner.resolve(arg).to_string());
                    } else {
                        self.advance();
                    }
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                let _ = self.expect(&TokenKind::RParen, "')'");
            }
            attrs.push(Attribute {
                name,
                args,
                span: start,
            });
        }
        attrs
    }

    fn parse_visibility(&mut self) -> Visibility {
        if self.eat(&TokenKind::Private) {
            Visibility::ModulePrivate
        } else {
            Visibility::Public
        }
    }

    fn parse_top_level(&mut self) -> PResult<&'a Stmt<'a>> {
        let attrs = self.parse_attributes();
        let visibility = self.parse_visibility();

        match self.peek_kind() {
            TokenKind::Import => self.parse_import(),
            TokenKind::Using => self.parse_using(),
            TokenKind::Do => self.parse_fn_decl(attrs, visibility),
            TokenKind::Const if self.peek_at(2).kind == TokenKind::Struct => self.parse_struct_decl(visibility),
            TokenKind::Const if self.peek_at(2).kind == TokenKind::Enum => self.parse_enum_decl(visibility),
            TokenKind::Temp | TokenKind::Const => self.parse_var_decl(visibility),
            _ => self.parse_statement(),
        }
    }

    fn parse_import(&mut self) -> PResult<&'a Stmt<'a>> {
        let start = self.span_of(self.peek());
        self.advance();
        // alias@name | alias "./path" | @name | "./path"
        let alias = if let TokenKind::Ident(sym) = self.peek_kind().clone() {
            if self.peek_at(1).kind == TokenKind::Hash || matches!(self.peek_at(1).kind, TokenKind::StringFragment(_))
            {
                self.advance();
                Some(sym)
            } else {
                None
            }
        } else {
            None
        };

        let spec = if self.eat(&TokenKind::Hash) {
            let (name, _) = self.expect_ident()?;
            ImportSpec::Stdlib { alias, name }
        } else if let TokenKind::StringFragment(path) = self.peek_kind().clone() {
            self.advance();
            ImportSpec::Path { alias, path }
        } else {
            self.error(
                ErrorCode::ParseUnexpectedToken,
                "expected '@module' or a string path after 'import'",
                start,
            );
            return Err(());
        };
        Ok(self.stmts.alloc(Stmt::Import { spec, span: start }))
    }

    fn parse_using(&mut self) -> PResult<&'a Stmt<'a>> {
        let start = self.span_of(self.peek());
        self.advance();
        let (alias, _) = self.expect_ident()?;
        Ok(self.stmts.alloc(Stmt::Using { alias, span: start }))
    }

    fn parse_var_decl(&mut self, visibility: Visibility) -> PResult<&'a Stmt<'a>> {
        let start = self.span_of(self.peek());
        let mutable = matches!(self.peek_kind(), TokenKind::Temp);
        self.advance();

        let mut names = Vec::new();
        loop {
            let (name, span) = self.expect_ident()?;
            if let Some(prior) = self.scope.declare(name, span) {
                let _ = prior;
                self.error(
                    ErrorCode::ParseDuplicateDeclaration,
                    format!("'{}' is already declared in this scope", self.interner.resolve(name)),
                    span,
                );
            }
            names.push(name);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        let ty = if !self.check(&TokenKind::Eq) && !self.at_stmt_end() {
            Some(self.parse_type()?)
        } else {
            None
        };

        let mut init = Vec::new();
        if self.eat(&TokenKind::Eq) {
            loop {
                init.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }

        Ok(self.stmts.alloc(Stmt::VarDecl {
            mutable,
            names,
            ty,
            init,
            visibility,
            span: start,
        }))
    }

    fn at_stmt_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eq | TokenKind::RBrace | TokenKind::Eof)
    }

    fn parse_type(&mut self) -> PResult<TypeExpr> {
        if self.eat(&TokenKind::LBracket) {
            let elem = self.parse_type()?;
            if self.eat(&TokenKind::Comma) {
                let tok = self.peek().clone();
                if let TokenKind::Int(text) = tok.kind {
                    self.advance();
                    self.expect(&TokenKind::RBracket, "']'")?;
                    let n: u64 = text.parse().unwrap_or(0);
                    return Ok(TypeExpr::FixedArray(Box::new(elem), n));
                }
                self.error(ErrorCode::ParseExpectedType, "expected array size", self.span_of(&tok));
                return Err(());
            }
            self.expect(&TokenKind::RBracket, "']'")?;
            return Ok(TypeExpr::Array(Box::new(elem)));
        }

        let (name, span) = self.expect_ident()?;
        if self.interner.resolve(name) == "map" && self.eat(&TokenKind::LBracket) {
            let key = self.parse_type()?;
            self.expect(&TokenKind::Colon, "':'")?;
            let value = self.parse_type()?;
            self.expect(&TokenKind::RBracket, "']'")?;
            return Ok(TypeExpr::Map(Box::new(key), Box::new(value)));
        }
        let _ = span;
        Ok(TypeExpr::Named(name))
    }

    fn parse_fn_decl(&mut self, attributes: Vec<Attribute>, visibility: Visibility) -> PResult<&'a Stmt<'a>> {
        let start = self.span_of(self.peek());
        self.advance(); // 'do'
        let (name, name_span) = self.expect_ident()?;
        if let Some(_prior) = self.scope.declare(name, name_span) {
            self.error(
                ErrorCode::ParseDuplicateDeclaration,
                format!("'{}' is already declared in this scope", self.interner.resolve(name)),
                name_span,
            );
        }
        self.expect(&TokenKind::LParen, "'('")?;
        self.scope.push_scope();
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.at_eof() {
            let pstart = self.span_of(self.peek());
            let mutable = self.eat(&TokenKind::Amp);
            let (pname, pspan) = self.expect_ident()?;
            self.scope.declare(pname, pspan);
            let ty = self.parse_type()?;
            let default = if self.eat(&TokenKind::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            params.push(Param {
                name: pname,
                mutable,
                ty,
                default,
                span: pstart,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;

        let mut returns = Vec::new();
        if self.eat(&TokenKind::Arrow) {
            loop {
                returns.push(self.parse_type()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }

        let body = self.parse_block_no_new_scope()?;
        self.scope.pop_scope();

        Ok(self.stmts.alloc(Stmt::FnDecl {
            name,
            params,
            returns,
            body,
            attributes,
            visibility,
            span: start,
        }))
    }

    fn parse_struct_decl(&mut self, visibility: Visibility) -> PResult<&'a Stmt<'a>> {
        let start = self.span_of(self.peek());
        self.advance(); // const
        let (name, name_span) = self.expect_ident()?;
        self.scope.declare(name, name_span);
        self.expect(&TokenKind::Struct, "'struct'")?;
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let fstart = self.span_of(self.peek());
            let (fname, _) = self.expect_ident()?;
            let ty = self.parse_type()?;
            let mut default = false;
            if self.eat(&TokenKind::Eq) {
                default = true;
                let _ = self.parse_expr()?;
            }
            fields.push(Field {
                name: fname,
                ty,
                tag: None,
                default,
                span: fstart,
            });
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(self.stmts.alloc(Stmt::StructDecl {
            name,
            fields,
            visibility,
            span: start,
        }))
    }

    fn parse_enum_decl(&mut self, visibility: Visibility) -> PResult<&'a Stmt<'a>> {
        let start = self.span_of(self.peek());
        self.advance(); // const
        let (name, name_span) = self.expect_ident()?;
        self.scope.declare(name, name_span);
        self.expect(&TokenKind::Enum, "'enum'")?;
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let (mname, _) = self.expect_ident()?;
            let value = if self.eat(&TokenKind::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            members.push((mname, value));
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(self.stmts.alloc(Stmt::EnumDecl {
            name,
            members,
            visibility,
            span: start,
        }))
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> PResult<&'a Stmt<'a>> {
        match self.peek_kind() {
            TokenKind::Temp | TokenKind::Const => self.parse_var_decl(Visibility::Public),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::ForEach => self.parse_for_each(),
            TokenKind::AsLongAs => self.parse_as_long_as(),
            TokenKind::Loop => self.parse_loop(),
            TokenKind::Break => {
                let span = self.span_of(self.peek());
                self.advance();
                Ok(self.stmts.alloc(Stmt::Break { span }))
            }
            TokenKind::Continue => {
                let span = self.span_of(self.peek());
                self.advance();
                Ok(self.stmts.alloc(Stmt::Continue { span }))
            }
            TokenKind::When => self.parse_when(),
            TokenKind::Ensure => self.parse_ensure(),
            TokenKind::LBrace => Ok(self.stmts.alloc(Stmt::Block(self.parse_block()?))),
            _ => self.parse_assign_or_expr(),
        }
    }

    fn parse_ensure(&mut self) -> PResult<&'a Stmt<'a>> {
        let start = self.span_of(self.peek());
        self.advance(); // ensure
        let body = self.parse_block()?;
        Ok(self.stmts.alloc(Stmt::Ensure { body, span: start }))
    }

    fn parse_return(&mut self) -> PResult<&'a Stmt<'a>> {
        let span = self.span_of(self.peek());
        self.advance();
        let mut values = Vec::new();
        if !self.check(&TokenKind::RBrace) && !matches!(self.peek_kind(), TokenKind::Eof) && !self.starts_new_stmt() {
            loop {
                values.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(self.stmts.alloc(Stmt::Return { values, span }))
    }

    fn starts_new_stmt(&self) -> bool {
        self.peek_kind().starts_statement() && !matches!(self.peek_kind(), TokenKind::Ident(_))
    }

    fn parse_block(&mut self) -> PResult<Block<'a>> {
        self.scope.push_scope();
        let block = self.parse_block_no_new_scope();
        self.scope.pop_scope();
        block
    }

    fn parse_block_no_new_scope(&mut self) -> PResult<Block<'a>> {
        let start = self.span_of(self.peek());
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        let mut seen_terminator = false;
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let stmt_span = self.span_of(self.peek());
            match self.parse_statement() {
                Ok(s) => {
                    if seen_terminator {
                        self.warn(
                            ErrorCode::ParseUnexpectedToken,
                            "unreachable code after a terminating statement",
                            stmt_span,
                        );
                    }
                    seen_terminator = s.is_terminating();
                    stmts.push(s);
                }
                Err(()) => self.recover_to_next_statement(),
            }
        }
        let end_tok = self.peek().clone();
        self.expect(&TokenKind::RBrace, "'}'")?;
        let span = start.merge(self.span_of(&end_tok));
        Ok(Block {
            stmts: self.stmts.alloc_slice(stmts),
            span,
        })
    }

    fn parse_if(&mut self) -> PResult<&'a Stmt<'a>> {
        let start = self.span_of(self.peek());
        self.advance(); // if
        let cond = self.parse_condition()?;
        let body = self.parse_block()?;
        let mut arms = vec![IfArm { cond, body }];
        let mut otherwise = None;
        loop {
            if self.eat(&TokenKind::Or) {
                let cond = self.parse_condition()?;
                let body = self.parse_block()?;
                arms.push(IfArm { cond, body });
            } else if self.eat(&TokenKind::Otherwise) {
                otherwise = Some(self.parse_block()?);
                break;
            } else {
                break;
            }
        }
        Ok(self.stmts.alloc(Stmt::If {
            arms,
            otherwise,
            span: start,
        }))
    }

    fn parse_for(&mut self) -> PResult<&'a Stmt<'a>> {
        let start = self.span_of(self.peek());
        self.advance(); // for
        let (var, var_span) = self.expect_ident()?;
        let var_ty = if !self.check(&TokenKind::In) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(&TokenKind::In, "'in'")?;
        let iterable = self.parse_condition()?;
        self.scope.push_scope();
        if self.scope.declared_in_current(var) {
            self.error(
                ErrorCode::ParseDuplicateDeclaration,
                "loop variable shadows an enclosing loop's variable",
                var_span,
            );
        }
        self.scope.declare(var, var_span);
        let body = self.parse_block_no_new_scope()?;
        self.scope.pop_scope();
        Ok(self.stmts.alloc(Stmt::For {
            var,
            var_ty,
            iterable,
            body,
            span: start,
        }))
    }

    fn parse_for_each(&mut self) -> PResult<&'a Stmt<'a>> {
        let start = self.span_of(self.peek());
        self.advance(); // for_each
        let (var, var_span) = self.expect_ident()?;
        self.expect(&TokenKind::In, "'in'")?;
        let collection = self.parse_condition()?;
        self.scope.push_scope();
        self.scope.declare(var, var_span);
        let body = self.parse_block_no_new_scope()?;
        self.scope.pop_scope();
        Ok(self.stmts.alloc(Stmt::ForEach {
            var,
            collection,
            body,
            span: start,
        }))
    }

    fn parse_as_long_as(&mut self) -> PResult<&'a Stmt<'a>> {
        let start = self.span_of(self.peek());
        self.advance();
        let cond = self.parse_condition()?;
        let body = self.parse_block()?;
        Ok(self.stmts.alloc(Stmt::AsLongAs { cond, body, span: start }))
    }

    fn parse_loop(&mut self) -> PResult<&'a Stmt<'a>> {
        let start = self.span_of(self.peek());
        self.advance();
        let body = self.parse_block()?;
        Ok(self.stmts.alloc(Stmt::Loop { body, span: start }))
    }

    fn parse_when(&mut self) -> PResult<&'a Stmt<'a>> {
        let start = self.span_of(self.peek());
        self.advance(); // when
        let scrutinee = self.parse_condition()?;
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut arms = Vec::new();
        let mut default = None;
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let arm_start = self.span_of(self.peek());
            self.expect(&TokenKind::Is, "'is'")?;
            let pattern = self.parse_when_pattern()?;
            let body = self.parse_block()?;
            arms.push(WhenArm {
                pattern,
                body,
                span: arm_start,
            });
            if self.eat(&TokenKind::Otherwise) {
                default = Some(self.parse_block()?);
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(self.stmts.alloc(Stmt::When {
            scrutinee,
            arms,
            default,
            strict: false, // resolved from the preceding #strict attribute by the caller
            span: start,
        }))
    }

    fn parse_when_pattern(&mut self) -> PResult<WhenPattern<'a>> {
        if let TokenKind::Ident(sym) = self.peek_kind().clone() {
            if self.peek_at(1).kind == TokenKind::Dot {
                self.advance();
                self.advance(); // '.'
                let (member, _) = self.expect_ident()?;
                return Ok(WhenPattern::EnumMember(sym, member));
            }
        }
        let expr = self.parse_condition()?;
        Ok(WhenPattern::Expr(expr))
    }

    fn parse_assign_or_expr(&mut self) -> PResult<&'a Stmt<'a>> {
        let start = self.span_of(self.peek());
        let expr = self.parse_expr()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => Some(CompoundOp::Assign),
            TokenKind::PlusEq => Some(CompoundOp::AddAssign),
            TokenKind::MinusEq => Some(CompoundOp::SubAssign),
            TokenKind::StarEq => Some(CompoundOp::MulAssign),
            TokenKind::SlashEq => Some(CompoundOp::DivAssign),
            TokenKind::PercentEq => Some(CompoundOp::ModAssign),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let value = self.parse_expr()?;
            return Ok(self.stmts.alloc(Stmt::Assign {
                op,
                target: expr,
                value,
                span: start,
            }));
        }
        Ok(self.stmts.alloc(Stmt::ExprStmt { expr, span: start }))
    }

    // ---- expressions (Pratt / precedence climbing) ----
    // logical-or < logical-and < equality < comparison < membership
    // < additive < multiplicative < prefix < postfix < call < index < member

    fn parse_expr(&mut self) -> PResult<&'a Expr<'a>> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<&'a Expr<'a>> {
        let mut left = self.parse_and()?;
        while self.check(&TokenKind::OrOr) {
            self.advance();
            let right = self.parse_and()?;
            left = self.bin(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PResult<&'a Expr<'a>> {
        let mut left = self.parse_equality()?;
        while self.check(&TokenKind::AndAnd) {
            self.advance();
            let right = self.parse_equality()?;
            left = self.bin(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> PResult<&'a Expr<'a>> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = self.bin(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> PResult<&'a Expr<'a>> {
        let mut left = self.parse_membership()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_membership()?;
            left = self.bin(op, left, right);
        }
        Ok(left)
    }

    fn parse_membership(&mut self) -> PResult<&'a Expr<'a>> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::In => BinaryOp::In,
                TokenKind::NotIn => BinaryOp::NotIn,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = self.bin(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> PResult<&'a Expr<'a>> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.bin(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> PResult<&'a Expr<'a>> {
        let mut left = self.parse_prefix()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_prefix()?;
            left = self.bin(op, left, right);
        }
        Ok(left)
    }

    fn bin(&mut self, op: BinaryOp, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        let span = left.span().merge(right.span());
        self.exprs.alloc(Expr::Binary { op, left, right, span })
    }

    fn parse_prefix(&mut self) -> PResult<&'a Expr<'a>> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.span_of(self.peek());
            self.advance();
            let operand = self.parse_prefix()?;
            let span = start.merge(operand.span());
            return Ok(self.exprs.alloc(Expr::Unary { op, operand, span }));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<&'a Expr<'a>> {
        let mut expr = self.parse_call_index_member()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::PlusPlus => Some(PostfixOp::Inc),
                TokenKind::MinusMinus => Some(PostfixOp::Dec),
                _ => None,
            };
            let Some(op) = op else { break };
            let tok = self.advance();
            let span = expr.span().merge(self.span_of(&tok));
            expr = self.exprs.alloc(Expr::Postfix { op, operand: expr, span });
        }
        Ok(expr)
    }

    fn parse_call_index_member(&mut self) -> PResult<&'a Expr<'a>> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    while !self.check(&TokenKind::RParen) && !self.at_eof() {
                        args.push(self.parse_unrestricted()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    let end = self.peek().clone();
                    self.expect(&TokenKind::RParen, "')'")?;
                    let span = expr.span().merge(self.span_of(&end));
                    expr = self.exprs.alloc(Expr::Call {
                        callee: expr,
                        args: self.exprs.alloc_slice(args),
                        span,
                    });
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_unrestricted()?;
                    let end = self.peek().clone();
                    self.expect(&TokenKind::RBracket, "']'")?;
                    let span = expr.span().merge(self.span_of(&end));
                    expr = self.exprs.alloc(Expr::Index {
                        receiver: expr,
                        index,
                        span,
                    });
                }
                TokenKind::Dot => {
                    self.advance();
                    let (name, span) = self.expect_ident()?;
                    let span = expr.span().merge(span);
                    expr = self.exprs.alloc(Expr::Member {
                        receiver: expr,
                        name,
                        span,
                    });
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<&'a Expr<'a>> {
        let tok = self.peek().clone();
        let span = self.span_of(&tok);
        match tok.kind {
            TokenKind::Int(text) => {
                self.advance();
                Ok(self.exprs.alloc(Expr::Literal {
                    value: Literal::Int(text),
                    span,
                }))
            }
            TokenKind::Float(text) => {
                self.advance();
                let value = text.parse().unwrap_or(0.0);
                Ok(self.exprs.alloc(Expr::Literal {
                    value: Literal::Float(value),
                    span,
                }))
            }
            TokenKind::True => {
                self.advance();
                Ok(self.exprs.alloc(Expr::Literal {
                    value: Literal::Bool(true),
                    span,
                }))
            }
            TokenKind::False => {
                self.advance();
                Ok(self.exprs.alloc(Expr::Literal {
                    value: Literal::Bool(false),
                    span,
                }))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(self.exprs.alloc(Expr::Literal {
                    value: Literal::Nil,
                    span,
                }))
            }
            TokenKind::Char(c) => {
                self.advance();
                Ok(self.exprs.alloc(Expr::Literal {
                    value: Literal::Char(c),
                    span,
                }))
            }
            TokenKind::StringFragment(_) => self.parse_string_literal(),
            TokenKind::Underscore => {
                self.advance();
                Ok(self.exprs.alloc(Expr::Blank { span }))
            }
            TokenKind::Ident(sym) => {
                self.advance();
                if !self.no_struct_lit && self.check(&TokenKind::LBrace) {
                    return self.parse_struct_lit(sym, span);
                }
                Ok(self.exprs.alloc(Expr::Ident { name: sym, span }))
            }
            TokenKind::LBracket => self.parse_array_lit(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_unrestricted()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::New => {
                self.advance();
                self.expect(&TokenKind::LParen, "'('")?;
                let ty = self.parse_type()?;
                let end = self.peek().clone();
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(self.exprs.alloc(Expr::New {
                    ty,
                    span: span.merge(self.span_of(&end)),
                }))
            }
            TokenKind::Range => self.parse_range(),
            _ => {
                self.error(ErrorCode::ParseExpectedExpression, "expected an expression", span);
                Err(())
            }
        }
    }

    fn parse_range(&mut self) -> PResult<&'a Expr<'a>> {
        let start = self.span_of(self.peek());
        self.advance(); // 'range'
        self.expect(&TokenKind::LParen, "'('")?;
        let begin = self.parse_expr()?;
        self.expect(&TokenKind::Comma, "','")?;
        let end = self.parse_expr()?;
        let step = if self.eat(&TokenKind::Comma) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let close = self.peek().clone();
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(self.exprs.alloc(Expr::Range {
            start: begin,
            end,
            step,
            span: start.merge(self.span_of(&close)),
        }))
    }

    fn parse_array_lit(&mut self) -> PResult<&'a Expr<'a>> {
        let start = self.span_of(self.peek());
        self.advance(); // '['
        if self.check(&TokenKind::RBracket) {
            let end = self.peek().clone();
            self.advance();
            return Ok(self.exprs.alloc(Expr::ArrayLit {
                elements: self.exprs.alloc_slice(Vec::new()),
                span: start.merge(self.span_of(&end)),
            }));
        }

        let first = self.parse_unrestricted()?;
        if self.eat(&TokenKind::Colon) {
            let mut entries = Vec::new();
            let value = self.parse_unrestricted()?;
            entries.push((first, value));
            while self.eat(&TokenKind::Comma) {
                if self.check(&TokenKind::RBracket) {
                    break;
                }
                let key = self.parse_unrestricted()?;
                self.expect(&TokenKind::Colon, "':'")?;
                let value = self.parse_unrestricted()?;
                entries.push((key, value));
            }
            let end = self.peek().clone();
            self.expect(&TokenKind::RBracket, "']'")?;
            return Ok(self.exprs.alloc(Expr::MapLit {
                entries: self.exprs.alloc_slice(entries),
                span: start.merge(self.span_of(&end)),
            }));
        }

        let mut elements = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            elements.push(self.parse_unrestricted()?);
        }
        let end = self.peek().clone();
        self.expect(&TokenKind::RBracket, "']'")?;
        Ok(self.exprs.alloc(Expr::ArrayLit {
            elements: self.exprs.alloc_slice(elements),
            span: start.merge(self.span_of(&end)),
        }))
    }

    /// Parses the `{ name: value, ... }` body of a struct literal. The
    /// identifier and its span were already consumed by `parse_primary`.
    fn parse_struct_lit(&mut self, ty: Symbol, start: Span) -> PResult<&'a Expr<'a>> {
        let saved = self.no_struct_lit;
        self.no_struct_lit = false;
        let result = self.parse_struct_lit_body(ty, start);
        self.no_struct_lit = saved;
        result
    }

    fn parse_struct_lit_body(&mut self, ty: Symbol, start: Span) -> PResult<&'a Expr<'a>> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let field_start = self.span_of(self.peek());
            let (name, _) = self.expect_ident()?;
            self.expect(&TokenKind::Colon, "':'")?;
            let value = self.parse_expr()?;
            let span = field_start.merge(value.span());
            fields.push(FieldInit { name, value, span });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.peek().clone();
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(self.exprs.alloc(Expr::StructLit {
            ty,
            fields: self.exprs.alloc_slice(fields),
            span: start.merge(self.span_of(&end)),
        }))
    }

    fn parse_string_literal(&mut self) -> PResult<&'a Expr<'a>> {
        let start = self.span_of(self.peek());
        let mut parts: Vec<StringPart<'a>> = Vec::new();
        loop {
            match self.peek_kind().clone() {
                TokenKind::StringFragment(text) => {
                    self.advance();
                    if !text.is_empty() || parts.is_empty() {
                        parts.push(StringPart::Text(text));
                    }
                    if self.check(&TokenKind::InterpolationStart) {
                        self.advance();
                        let expr = self.parse_expr()?;
                        self.expect(&TokenKind::InterpolationEnd, "'}'")?;
                        parts.push(StringPart::Expr(expr));
                        continue;
                    }
                    break;
                }
                _ => break,
            }
        }
        let end_span = self.span_of(self.peek_at(0));
        Ok(self.exprs.alloc(Expr::StringLit {
            parts: self.string_parts.alloc_slice(parts),
            span: start.merge(end_span),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> (Program<'static>, DiagnosticList) {
        let interner: &'static mut Interner = Box::leak(Box::new(Interner::new()));
        let source: &'static str = Box::leak(src.to_string().into_boxed_str());
        let lexer = Lexer::new(source, "test.ez", interner);
        let (tokens, lex_diags) = lexer.tokenize();
        let exprs: &'static Arena<Expr<'static>> = Box::leak(Box::new(Arena::new()));
        let stmts: &'static Arena<Stmt<'static>> = Box::leak(Box::new(Arena::new()));
        let string_parts: &'static Arena<StringPart<'static>> = Box::leak(Box::new(Arena::new()));
        let parser = Parser::new(tokens, "test.ez", source, interner, exprs, stmts, string_parts);
        let (program, mut diags) = parser.parse_program();
        diags.extend(lex_diags);
        (program, diags)
    }

    #[test]
    fn parses_arithmetic_expression_statement() {
        let (program, diags) = parse("do main() { println(1 + 2 * 3) }");
        assert!(!diags.has_errors());
        assert_eq!(program.stmts.len(), 1);
    }

    #[test]
    fn detects_duplicate_declaration_in_same_scope() {
        let (_, diags) = parse("do main() { temp x int = 1 temp x int = 2 }");
        assert!(diags.has_errors());
    }

    #[test]
    fn parses_mutable_parameter() {
        let (program, diags) = parse("do bump(&n int) { n = n + 1 }");
        assert!(!diags.has_errors());
        match program.stmts[0] {
            Stmt::FnDecl { params, .. } => assert!(params[0].mutable),
            _ => panic!("expected fn decl"),
        }
    }

    #[test]
    fn parses_if_or_otherwise_chain() {
        let (program, diags) = parse("do main() { if true { } or false { } otherwise { } }");
        assert!(!diags.has_errors());
        assert_eq!(program.stmts.len(), 1);
    }

    #[test]
    fn parses_for_with_range() {
        let (program, diags) = parse("do main() { for i in range(0, 10, 3) { } }");
        assert!(!diags.has_errors());
        match program.stmts[0] {
            Stmt::FnDecl { .. } => {}
            _ => panic!("expected fn decl"),
        }
    }

    #[test]
    fn parses_struct_and_enum_decl() {
        let (program, diags) = parse("const Point struct { x int y int } const Color enum { Red Green Blue }");
        assert!(!diags.has_errors());
        assert_eq!(program.stmts.len(), 2);
    }

    #[test]
    fn parses_interpolated_string() {
        let (program, diags) = parse("do main() { println(\"x = ${x}\") }");
        assert!(!diags.has_errors());
        let _ = program;
    }

    #[test]
    fn reports_reserved_keyword_as_reserved_name() {
        let (_, diags) = parse("do main() { temp return int = 1 }");
        assert!(diags.has_errors());
        assert!(diags.iter().any(|d| d.code == ErrorCode::ParseReservedName));
    }

    #[test]
    fn reports_unclosed_paren_as_unclosed_delimiter() {
        let (_, diags) = parse("do main() { temp x int = (1 + 2 }");
        assert!(diags.has_errors());
        assert!(diags.iter().any(|d| d.code == ErrorCode::ParseUnclosedDelimiter));
    }

    #[test]
    fn parses_struct_literal() {
        let (program, diags) = parse("do main() { temp p Point = Point{x: 1, y: 2} }");
        assert!(!diags.has_errors());
        let _ = program;
    }

    #[test]
    fn parses_map_literal() {
        let (program, diags) = parse("do main() { temp m map[string:int] = [\"a\": 1, \"b\": 2] }");
        assert!(!diags.has_errors());
        let _ = program;
    }

    #[test]
    fn bare_ident_before_block_is_not_a_struct_literal() {
        let (program, diags) = parse("do main() { temp cond bool = true\nif cond { } }");
        assert!(!diags.has_errors());
        assert_eq!(program.stmts.len(), 1);
    }

    #[test]
    fn parses_ensure_block() {
        let (program, diags) = parse("do main() { ensure { println(1) } }");
        assert!(!diags.has_errors());
        let _ = program;
    }

    #[test]
    fn struct_literal_allowed_as_call_argument() {
        let (program, diags) = parse("do main() { for x in items { println(Point{x: 1, y: 2}) } }");
        assert!(!diags.has_errors());
        let _ = program;
    }
}
