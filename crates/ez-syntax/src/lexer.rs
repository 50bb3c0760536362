//! UTF-8 scanner producing a token stream from EZ source text.
//!
//! The lexer never panics and never refuses to terminate: malformed tokens
//! are recorded as diagnostics and the scan resumes at the next byte that
//! can plausibly start a token, so a caller always gets a token stream
//! ending in [`TokenKind::Eof`].
//!
//! Interpolated strings (`"text ${expr} more"`) lex as a sequence:
//! `StringFragment("text ")`, `InterpolationStart`, ...tokens of `expr`...,
//! `InterpolationEnd`, `StringFragment(" more")`, `StringFragment("")`.
//! The final empty fragment marks the closing quote. A stack of pending
//! interpolation depths tracks nested `${ ${ ... } }` only at the lexical
//! level (the grammar does not nest interpolation inside interpolation,
//! but `{` / `}` inside the inner expression, e.g. a block, must still
//! balance against plain braces first).

use crate::token::{keyword_kind, Token, TokenKind};
use ez_base::diagnostic::{Diagnostic, DiagnosticList, ErrorCode, Severity};
use ez_base::span::Span;
use ez_base::Interner;

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    file: String,
    interner: &'a mut Interner,
    diagnostics: DiagnosticList,
    /// Stack of brace-nesting depths recorded each time `${` opens an
    /// interpolation; a closing `}` resumes fragment scanning only when it
    /// returns nesting to the depth recorded at the matching `${`.
    interp_brace_stack: Vec<usize>,
    brace_depth: usize,
    /// When set, the next call to `next_token` resumes string-fragment
    /// scanning instead of normal token scanning (we just closed a `${...}`).
    resume_fragment: bool,
    /// A synthesized token to emit before resuming normal scanning (used to
    /// emit `InterpolationStart` right after a fragment that ended in `${`).
    pending: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: impl Into<String>, interner: &'a mut Interner) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            file: file.into(),
            interner,
            diagnostics: DiagnosticList::new(),
            interp_brace_stack: Vec::new(),
            brace_depth: 0,
            resume_fragment: false,
            pending: None,
        }
    }

    pub fn tokenize(mut self) -> (Vec<Token>, DiagnosticList) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.is_eof();
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    fn make(&self, kind: TokenKind, start_line: usize, start_col: usize, start_off: usize) -> Token {
        Token::new(kind, start_line, start_col, start_off)
    }

    fn error(&mut self, code: ErrorCode, message: impl Into<String>, start: usize) {
        let span = Span::new(start, self.pos.max(start + 1));
        let diag = Diagnostic::from_span(code, message, self.file.clone(), self.source, span, Severity::Error);
        self.diagnostics.push(diag);
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.advance();
                    self.advance();
                    while self.peek().is_some() {
                        if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Token {
        if let Some(tok) = self.pending.take() {
            return tok;
        }
        if self.resume_fragment {
            self.resume_fragment = false;
            let (line, col, off) = (self.line, self.column, self.pos);
            return self.lex_string_fragment(line, col, off);
        }

        self.skip_whitespace_and_comments();
        let (line, col, off) = (self.line, self.column, self.pos);
        let Some(b) = self.peek() else {
            return self.make(TokenKind::Eof, line, col, off);
        };

        if b.is_ascii_digit() {
            return self.lex_number(line, col, off);
        }
        if b == b'"' {
            self.advance();
            return self.lex_string_fragment(line, col, off);
        }
        if b == b'\'' {
            return self.lex_char(line, col, off);
        }
        if b == b'_' && !self.peek_at(1).map(is_ident_continue).unwrap_or(false) {
            self.advance();
            return self.make(TokenKind::Underscore, line, col, off);
        }
        if is_ident_start(b) {
            return self.lex_ident(line, col, off);
        }

        self.advance();
        let kind = match b {
            b'+' if self.peek() == Some(b'+') => {
                self.advance();
                TokenKind::PlusPlus
            }
            b'+' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::PlusEq
            }
            b'+' => TokenKind::Plus,
            b'-' if self.peek() == Some(b'-') => {
                self.advance();
                TokenKind::MinusMinus
            }
            b'-' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::MinusEq
            }
            b'-' if self.peek() == Some(b'>') => {
                self.advance();
                TokenKind::Arrow
            }
            b'-' => TokenKind::Minus,
            b'*' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::StarEq
            }
            b'*' => TokenKind::Star,
            b'/' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::SlashEq
            }
            b'/' => TokenKind::Slash,
            b'%' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::PercentEq
            }
            b'%' => TokenKind::Percent,
            b'=' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::EqEq
            }
            b'=' => TokenKind::Eq,
            b'!' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::NotEq
            }
            b'!' => TokenKind::Bang,
            b'<' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::LtEq
            }
            b'<' => TokenKind::Lt,
            b'>' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::GtEq
            }
            b'>' => TokenKind::Gt,
            b'&' if self.peek() == Some(b'&') => {
                self.advance();
                TokenKind::AndAnd
            }
            b'&' => TokenKind::Amp,
            b'|' if self.peek() == Some(b'|') => {
                self.advance();
                TokenKind::OrOr
            }
            b'.' => TokenKind::Dot,
            b',' => TokenKind::Comma,
            b':' => TokenKind::Colon,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => {
                self.brace_depth += 1;
                TokenKind::LBrace
            }
            b'}' => {
                if self.interp_brace_stack.last() == Some(&self.brace_depth) {
                    self.interp_brace_stack.pop();
                    self.brace_depth = self.brace_depth.saturating_sub(1);
                    self.resume_fragment = true;
                    return self.make(TokenKind::InterpolationEnd, line, col, off);
                }
                self.brace_depth = self.brace_depth.saturating_sub(1);
                TokenKind::RBrace
            }
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b'#' => TokenKind::Hash,
            other => {
                self.error(
                    ErrorCode::LexUnexpectedCharacter,
                    format!("unexpected character '{}'", other as char),
                    off,
                );
                TokenKind::Error
            }
        };
        self.make(kind, line, col, off)
    }

    fn lex_number(&mut self, line: usize, col: usize, off: usize) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit() || b == b'_') {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') && self.peek_at(1).map(|b| b.is_ascii_digit()).unwrap_or(false) {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(b) if b.is_ascii_digit() || b == b'_') {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let mut lookahead = self.pos + 1;
            if matches!(self.bytes.get(lookahead), Some(b'+') | Some(b'-')) {
                lookahead += 1;
            }
            if self.bytes.get(lookahead).map(|b| b.is_ascii_digit()).unwrap_or(false) {
                is_float = true;
                self.advance();
                if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                    self.advance();
                }
                while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                    self.advance();
                }
            }
        }
        let text: String = self.source[start..self.pos].chars().filter(|c| *c != '_').collect();
        let kind = if is_float {
            TokenKind::Float(text)
        } else {
            TokenKind::Int(text)
        };
        self.make(kind, line, col, off)
    }

    fn lex_ident(&mut self, line: usize, col: usize, off: usize) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if is_ident_continue(b)) {
            self.advance();
        }
        let text = &self.source[start..self.pos];
        let kind = keyword_kind(text).unwrap_or_else(|| TokenKind::Ident(self.interner.intern(text)));
        self.make(kind, line, col, off)
    }

    fn lex_char(&mut self, line: usize, col: usize, off: usize) -> Token {
        self.advance(); // opening quote
        let value = match self.peek() {
            Some(b'\\') => {
                self.advance();
                self.read_escape(off)
            }
            Some(_) => self.read_one_char(),
            None => {
                self.error(ErrorCode::LexUnterminatedString, "unterminated char literal", off);
                return self.make(TokenKind::Error, line, col, off);
            }
        };
        if self.peek() == Some(b'\'') {
            self.advance();
        } else {
            self.error(ErrorCode::LexUnterminatedString, "unterminated char literal", off);
            return self.make(TokenKind::Error, line, col, off);
        }
        self.make(TokenKind::Char(value), line, col, off)
    }

    fn read_one_char(&mut self) -> char {
        let rest = &self.source[self.pos..];
        let c = rest.chars().next().unwrap_or('\u{0}');
        for _ in 0..c.len_utf8() {
            self.advance();
        }
        c
    }

    fn read_escape(&mut self, off: usize) -> char {
        match self.peek() {
            Some(b'n') => {
                self.advance();
                '\n'
            }
            Some(b't') => {
                self.advance();
                '\t'
            }
            Some(b'r') => {
                self.advance();
                '\r'
            }
            Some(b'\\') => {
                self.advance();
                '\\'
            }
            Some(b'"') => {
                self.advance();
                '"'
            }
            Some(b'\'') => {
                self.advance();
                '\''
            }
            Some(b'$') => {
                self.advance();
                '$'
            }
            _ => {
                self.error(ErrorCode::LexInvalidEscape, "invalid escape sequence", off);
                '\u{0}'
            }
        }
    }

    /// Scans string content starting right after an opening `"` (or right
    /// after a closing `${...}` brace) up to the next `"`, `${`, or EOF.
    fn lex_string_fragment(&mut self, line: usize, col: usize, off: usize) -> Token {
        let mut text = String::new();
        loop {
            match self.peek() {
                None => {
                    self.error(ErrorCode::LexUnterminatedString, "unterminated string literal", off);
                    return self.make(TokenKind::StringFragment(text), line, col, off);
                }
                Some(b'"') => {
                    self.advance();
                    return self.make(TokenKind::StringFragment(text), line, col, off);
                }
                Some(b'$') if self.peek_at(1) == Some(b'{') => {
                    self.advance();
                    self.advance();
                    self.brace_depth += 1;
                    self.interp_brace_stack.push(self.brace_depth);
                    // next_token() will be called again by the driver loop;
                    // stash nothing, just return the fragment now and let
                    // the following call naturally emit InterpolationStart.
                    return self.make_fragment_then_interp_start(text, line, col, off);
                }
                Some(b'\\') => {
                    self.advance();
                    text.push(self.read_escape(off));
                }
                Some(_) => {
                    text.push(self.read_one_char());
                }
            }
        }
    }

    /// `${` was just consumed; the caller already owes an `InterpolationStart`
    /// token immediately after this fragment. We emit the fragment now and
    /// flip a flag so the token *after that* starts normal scanning inside
    /// the expression (the `InterpolationStart` itself is synthesized here
    /// via a one-token lookahead so callers see a clean alternating stream).
    fn make_fragment_then_interp_start(&mut self, text: String, line: usize, col: usize, off: usize) -> Token {
        self.pending = Some(self.make(TokenKind::InterpolationStart, self.line, self.column, self.pos));
        self.make(TokenKind::StringFragment(text), line, col, off)
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> (Vec<TokenKind>, DiagnosticList) {
        let mut interner = Interner::new();
        let lexer = Lexer::new(src, "test.ez", &mut interner);
        let (tokens, diags) = lexer.tokenize();
        (tokens.into_iter().map(|t| t.kind).collect(), diags)
    }

    #[test]
    fn lexes_integers_with_underscores() {
        let (tokens, _) = lex("1_000_000");
        assert_eq!(tokens[0], TokenKind::Int("1000000".to_string()));
    }

    #[test]
    fn lexes_float_with_exponent() {
        let (tokens, _) = lex("1.5e10");
        assert_eq!(tokens[0], TokenKind::Float("1.5e10".to_string()));
    }

    #[test]
    fn lexes_keywords_and_idents() {
        let (tokens, _) = lex("temp x");
        assert_eq!(tokens[0], TokenKind::Temp);
        assert!(matches!(tokens[1], TokenKind::Ident(_)));
    }

    #[test]
    fn ends_in_eof() {
        let (tokens, _) = lex("");
        assert_eq!(tokens.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn skips_line_and_block_comments() {
        let (tokens, _) = lex("// comment\n/* block */temp");
        assert_eq!(tokens[0], TokenKind::Temp);
    }

    #[test]
    fn lexes_compound_assignment_operators() {
        let (tokens, _) = lex("+= -= *= /= %=");
        assert_eq!(
            tokens,
            vec![
                TokenKind::PlusEq,
                TokenKind::MinusEq,
                TokenKind::StarEq,
                TokenKind::SlashEq,
                TokenKind::PercentEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn reports_error_on_unterminated_string() {
        let (_, diags) = lex("\"unterminated");
        assert!(diags.has_errors());
    }

    #[test]
    fn lexes_char_escape() {
        let (tokens, _) = lex("'\\n'");
        assert_eq!(tokens[0], TokenKind::Char('\n'));
    }

    #[test]
    fn lexes_plain_string() {
        let (tokens, _) = lex("\"hello\"");
        assert_eq!(tokens[0], TokenKind::StringFragment("hello".to_string()));
    }

    #[test]
    fn lexes_interpolated_string() {
        let (tokens, _) = lex("\"a ${x} b\"");
        assert_eq!(tokens[0], TokenKind::StringFragment("a ".to_string()));
        assert_eq!(tokens[1], TokenKind::InterpolationStart);
        assert!(matches!(tokens[2], TokenKind::Ident(_)));
        assert_eq!(tokens[3], TokenKind::InterpolationEnd);
        assert_eq!(tokens[4], TokenKind::StringFragment(" b".to_string()));
        assert_eq!(tokens[5], TokenKind::Eof);
    }

    #[test]
    fn byte_offset_is_monotonic() {
        let mut interner = Interner::new();
        let lexer = Lexer::new("temp x = 1 + 2", "test.ez", &mut interner);
        let (tokens, _) = lexer.tokenize();
        let mut last = 0;
        for t in &tokens {
            assert!(t.byte_offset >= last);
            last = t.byte_offset;
        }
    }
}
