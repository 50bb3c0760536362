//! Structured diagnostics: error codes, severities, and source-snippet
//! rendering shared by the lexer, parser, type checker, and evaluator.
//!
//! Every diagnostic carries a fixed [`ErrorCode`] (partitioned by subsystem)
//! plus enough source position to render a caret-underlined snippet. This
//! mirrors how a human reads a compiler error: a short slug to search for,
//! a line of context, and a pointer at the exact column.

use crate::span::Span;
use std::fmt;

/// How serious a diagnostic is. Errors make a diagnostic list "has errors";
/// warnings never do, and can be suppressed by `#suppress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A closed enumeration of every diagnosable condition, partitioned by the
/// subsystem that raises it. The discriminant names double as the
/// `#suppress` slug (`code.slug()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // --- lex ---
    LexUnterminatedString,
    LexUnterminatedInterpolation,
    LexInvalidEscape,
    LexInvalidNumber,
    LexUnexpectedCharacter,
    // --- parse ---
    ParseUnexpectedToken,
    ParseExpectedExpression,
    ParseExpectedIdentifier,
    ParseExpectedStatement,
    ParseExpectedType,
    ParseDuplicateDeclaration,
    ParseUnknownAttribute,
    ParseUnterminatedBlock,
    ParseReservedName,
    ParseUnclosedDelimiter,
    // --- type ---
    TypeMismatch,
    TypeUndefined,
    TypeArityMismatch,
    TypeNonExhaustiveWhen,
    TypeMissingReturn,
    TypeUnknownField,
    TypeUnknownFunction,
    TypeDuplicateModule,
    // --- reference / mutability ---
    RefImmutableAssignment,
    RefConstToMutableParam,
    RefUseOfMoved,
    // --- runtime ---
    RuntimeDivisionByZero,
    RuntimeIndexOutOfBounds,
    RuntimeUndefinedVariable,
    RuntimeTypeAssertionFailed,
    RuntimeStackOverflow,
    RuntimeInvalidCast,
    RuntimeNilDereference,
    // --- import / module loader ---
    ImportNotFound,
    ImportCycle,
    ImportAmbiguousModule,
    // --- stdlib ---
    StdlibUnknownFunction,
    StdlibArgumentError,
}

impl ErrorCode {
    /// The stable slug used in rendered messages and `#suppress(slug)`.
    pub fn slug(self) -> &'static str {
        match self {
            ErrorCode::LexUnterminatedString => "lex-unterminated-string",
            ErrorCode::LexUnterminatedInterpolation => "lex-unterminated-interpolation",
            ErrorCode::LexInvalidEscape => "lex-invalid-escape",
            ErrorCode::LexInvalidNumber => "lex-invalid-number",
            ErrorCode::LexUnexpectedCharacter => "lex-unexpected-character",
            ErrorCode::ParseUnexpectedToken => "parse-unexpected-token",
            ErrorCode::ParseExpectedExpression => "parse-expected-expression",
            ErrorCode::ParseExpectedIdentifier => "parse-expected-identifier",
            ErrorCode::ParseExpectedStatement => "parse-expected-statement",
            ErrorCode::ParseExpectedType => "parse-expected-type",
            ErrorCode::ParseDuplicateDeclaration => "parse-duplicate-declaration",
            ErrorCode::ParseUnknownAttribute => "parse-unknown-attribute",
            ErrorCode::ParseUnterminatedBlock => "parse-unterminated-block",
            ErrorCode::ParseReservedName => "parse-reserved-name",
            ErrorCode::ParseUnclosedDelimiter => "parse-unclosed-delimiter",
            ErrorCode::TypeMismatch => "type-mismatch",
            ErrorCode::TypeUndefined => "undefined-type",
            ErrorCode::TypeArityMismatch => "type-arity-mismatch",
            ErrorCode::TypeNonExhaustiveWhen => "type-non-exhaustive-when",
            ErrorCode::TypeMissingReturn => "type-missing-return",
            ErrorCode::TypeUnknownField => "type-unknown-field",
            ErrorCode::TypeUnknownFunction => "type-unknown-function",
            ErrorCode::TypeDuplicateModule => "type-duplicate-module",
            ErrorCode::RefImmutableAssignment => "ref-immutable-assignment",
            ErrorCode::RefConstToMutableParam => "ref-const-to-mutable-param",
            ErrorCode::RefUseOfMoved => "ref-use-of-moved",
            ErrorCode::RuntimeDivisionByZero => "runtime-division-by-zero",
            ErrorCode::RuntimeIndexOutOfBounds => "runtime-index-out-of-bounds",
            ErrorCode::RuntimeUndefinedVariable => "runtime-undefined-variable",
            ErrorCode::RuntimeTypeAssertionFailed => "runtime-type-assertion-failed",
            ErrorCode::RuntimeStackOverflow => "runtime-stack-overflow",
            ErrorCode::RuntimeInvalidCast => "runtime-invalid-cast",
            ErrorCode::RuntimeNilDereference => "runtime-nil-dereference",
            ErrorCode::ImportNotFound => "import-not-found",
            ErrorCode::ImportCycle => "import-cycle",
            ErrorCode::ImportAmbiguousModule => "import-ambiguous-module",
            ErrorCode::StdlibUnknownFunction => "stdlib-unknown-function",
            ErrorCode::StdlibArgumentError => "stdlib-argument-error",
        }
    }

    /// The subsystem category this code belongs to, e.g. `"parse"`.
    pub fn category(self) -> &'static str {
        self.slug().split('-').next().unwrap_or("")
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// A single structured diagnostic: code, message, and enough position
/// information to render a source snippet.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub end_column: usize,
    pub source_line: String,
    pub severity: Severity,
    pub help: Option<String>,
}

impl Diagnostic {
    /// Builds a diagnostic from a span and the full source text it was
    /// taken from, computing line/column/snippet automatically.
    pub fn from_span(
        code: ErrorCode,
        message: impl Into<String>,
        file: impl Into<String>,
        source: &str,
        span: Span,
        severity: Severity,
    ) -> Self {
        let (line, column) = span.line_col(source);
        let end_column = column + span.len().max(1);
        let source_line = source
            .lines()
            .nth(line.saturating_sub(1))
            .unwrap_or("")
            .to_string();
        Diagnostic {
            code,
            message: message.into(),
            file: file.into(),
            line,
            column,
            end_column,
            source_line,
            severity,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Renders `self` as a human-facing block: location header, source
    /// snippet, caret underline, and optional help line.
    pub fn render(&self, color: bool) -> String {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let label = if color {
            match self.severity {
                Severity::Error => Style::bold_red(kind),
                Severity::Warning => Style::yellow(kind),
            }
        } else {
            kind.to_string()
        };

        let width = self.end_column.saturating_sub(self.column).max(1);
        let underline = format!(
            "{}{}",
            " ".repeat(self.column.saturating_sub(1)),
            "^".repeat(width)
        );
        let underline = if color {
            Style::red(&underline)
        } else {
            underline
        };

        let mut out = format!(
            "{}[{}]: {}\n  --> {}:{}:{}\n   |\n{:>3}| {}\n   | {}",
            label,
            self.code.slug(),
            self.message,
            self.file,
            self.line,
            self.column,
            self.line,
            self.source_line,
            underline,
        );
        if let Some(help) = &self.help {
            out.push_str(&format!("\n   = help: {}", help));
        }
        out
    }
}

/// An ordered collection of diagnostics, kept partitioned by severity so
/// checking "has errors" never has to scan the warning partition.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticList {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
}

impl DiagnosticList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => self.errors.push(diag),
            Severity::Warning => self.warnings.push(diag),
        }
    }

    /// Drops a warning if `suppressed` names its code's slug or category.
    /// Errors are never suppressed.
    pub fn push_checked(&mut self, diag: Diagnostic, suppressed: &[String]) {
        if diag.severity == Severity::Warning
            && suppressed
                .iter()
                .any(|s| s == diag.code.slug() || s == diag.code.category())
        {
            return;
        }
        self.push(diag);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter().chain(self.warnings.iter())
    }

    pub fn extend(&mut self, other: DiagnosticList) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn len(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hand-rolled ANSI styling, matching the zero-extra-dependency approach
/// used for terminal color elsewhere in this ecosystem. Colors reset at the
/// end of every wrapped string.
struct Style;

impl Style {
    const RESET: &'static str = "\x1b[0m";
    const BOLD: &'static str = "\x1b[1m";
    const RED: &'static str = "\x1b[31m";
    const YELLOW: &'static str = "\x1b[33m";

    fn red(s: &str) -> String {
        format!("{}{}{}", Self::RED, s, Self::RESET)
    }

    fn yellow(s: &str) -> String {
        format!("{}{}{}", Self::YELLOW, s, Self::RESET)
    }

    fn bold_red(s: &str) -> String {
        format!("{}{}{}{}", Self::BOLD, Self::RED, s, Self::RESET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_round_trips_through_category() {
        assert_eq!(ErrorCode::TypeMismatch.slug(), "type-mismatch");
        assert_eq!(ErrorCode::TypeMismatch.category(), "type");
    }

    #[test]
    fn from_span_computes_line_and_snippet() {
        let source = "let x = 1\nlet y = bogus\n";
        let span = Span::new(19, 24);
        let diag = Diagnostic::from_span(
            ErrorCode::RuntimeUndefinedVariable,
            "undefined variable 'bogus'",
            "main.ez",
            source,
            span,
            Severity::Error,
        );
        assert_eq!(diag.line, 2);
        assert_eq!(diag.source_line, "let y = bogus");
    }

    #[test]
    fn render_includes_code_and_location() {
        let diag = Diagnostic {
            code: ErrorCode::TypeMismatch,
            message: "expected int, found text".into(),
            file: "main.ez".into(),
            line: 3,
            column: 9,
            end_column: 13,
            source_line: "let x = \"hi\"".into(),
            severity: Severity::Error,
            help: Some("try cast(x, int)".into()),
        };
        let rendered = diag.render(false);
        assert!(rendered.contains("type-mismatch"));
        assert!(rendered.contains("main.ez:3:9"));
        assert!(rendered.contains("help: try cast"));
    }

    #[test]
    fn list_partitions_by_severity() {
        let mut list = DiagnosticList::new();
        list.push(Diagnostic {
            code: ErrorCode::TypeMismatch,
            message: "m".into(),
            file: "f".into(),
            line: 1,
            column: 1,
            end_column: 2,
            source_line: String::new(),
            severity: Severity::Error,
            help: None,
        });
        assert!(list.has_errors());
        assert_eq!(list.errors().len(), 1);
        assert_eq!(list.warnings().len(), 0);
    }

    #[test]
    fn suppression_drops_matching_warning_only() {
        let mut list = DiagnosticList::new();
        let warn = Diagnostic {
            code: ErrorCode::ParseUnknownAttribute,
            message: "unknown attribute".into(),
            file: "f".into(),
            line: 1,
            column: 1,
            end_column: 2,
            source_line: String::new(),
            severity: Severity::Warning,
            help: None,
        };
        list.push_checked(warn.clone(), &["parse-unknown-attribute".to_string()]);
        assert!(list.is_empty());
        list.push_checked(warn, &["some-other-slug".to_string()]);
        assert_eq!(list.warnings().len(), 1);
    }

    #[test]
    fn errors_are_never_suppressed() {
        let mut list = DiagnosticList::new();
        let err = Diagnostic {
            code: ErrorCode::TypeMismatch,
            message: "m".into(),
            file: "f".into(),
            line: 1,
            column: 1,
            end_column: 2,
            source_line: String::new(),
            severity: Severity::Error,
            help: None,
        };
        list.push_checked(err, &["type-mismatch".to_string(), "type".to_string()]);
        assert!(list.has_errors());
    }
}
