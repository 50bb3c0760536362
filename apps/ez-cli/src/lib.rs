//! # ez-cli
//!
//! Thin front-end over the `ez-syntax`/`ez-check`/`ez-stdlib` pipeline.
//! All command logic lives here, not in `main.rs`, so it can be
//! exercised by integration tests without spawning a process.
//!
//! Exit codes: `0` clean, `1` any diagnostic error or program-raised
//! error, `2` usage or I/O failure at this front-end layer.

pub mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use ez_base::diagnostic::{Diagnostic, DiagnosticList, ErrorCode, Severity};
use ez_base::{Arena, Interner, Symbol};
use ez_check::checker::Checker;
use ez_check::environment::Environment;
use ez_check::evaluator::Evaluator;
use ez_check::module::{module_basename, LoadedModule, ModuleLoader, Registry};
use ez_check::stdlib_registry::StdlibRegistry;
use ez_syntax::ast::{Expr, ImportSpec, Program, Stmt, StringPart};
use ez_syntax::{Lexer, Parser as EzParser};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const EXIT_OK: i32 = 0;
pub const EXIT_DIAGNOSTIC: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

pub fn run_cli() -> i32 {
    let cli = Cli::parse();
    install_tracing(cli.verbose);
    let color = use_color(cli.no_color);

    match &cli.command {
        Commands::Run { file } => cmd_run(file, color),
        Commands::Check { file, json } => cmd_check(file, color, *json),
    }
}

fn install_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("EZ_LOG").unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

/// `--no-color` always wins; otherwise colorize only when stdout is a real
/// terminal (`NO_COLOR` is the community-standard opt-out env var).
fn use_color(no_color_flag: bool) -> bool {
    if no_color_flag || std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    atty::is(atty::Stream::Stdout) && terminal_size::terminal_size().is_some()
}

fn read_source(path: &Path) -> Result<String, i32> {
    std::fs::read_to_string(path).map_err(|e| {
        eprintln!("error: cannot read {}: {}", path.display(), e);
        EXIT_USAGE
    })
}

/// Lexes and parses `source`, reporting any errors via `report`. Returns
/// `None` (and has already reported) if either stage produced an error.
fn lex_and_parse<'a>(
    file: &str,
    source: &'a str,
    interner: &mut Interner,
    exprs: &'a Arena<Expr<'a>>,
    stmts: &'a Arena<Stmt<'a>>,
    string_parts: &'a Arena<StringPart<'a>>,
    color: bool,
) -> Result<Program<'a>, ()> {
    let lexer = Lexer::new(source, file, interner);
    let (tokens, lex_diags) = lexer.tokenize();
    report(&lex_diags, file, color);
    if lex_diags.has_errors() {
        return Err(());
    }

    let parser = EzParser::new(tokens, file, source, interner, exprs, stmts, string_parts);
    let (program, parse_diags) = parser.parse_program();
    report(&parse_diags, file, color);
    if parse_diags.has_errors() {
        return Err(());
    }
    Ok(program)
}

/// Resolved state for one imported file: the signatures a checker merges
/// into its importer's `Registry`, and the environment an evaluator merges
/// into its importer's call dispatch.
type ResolvedModule = (LoadedModule, Rc<RefCell<Environment<'static>>>);

/// Recursively resolves every relative-path import reachable from
/// `program`, depth-first, so a file's own imports are fully loaded before
/// it is checked/evaluated. Returns the alias → module maps an importing
/// file's `Checker`/`Evaluator` merge in before running.
///
/// Each imported file gets its own leaked (`'static`) arena set: this is a
/// short-lived CLI process, so trading the memory back at exit for a
/// simple, borrow-check-friendly recursive shape is the same trade the
/// evaluator's own test harness already makes (see `run_program` in
/// `ez-check::evaluator`'s tests).
// `interner`/`stdlib` are pinned to `&'static` (not elided) rather than
// borrowed for an ordinary, shorter call-local lifetime: `resolve_file`
// constructs an `Evaluator<'static>` (its environment outlives this call,
// headed for `env_cache`), and `Environment<'a>` is invariant in `'a` (see
// the note in `cmd_run`), so nothing shorter than `'static` would unify
// with the environments this whole resolution pass produces.
#[allow(clippy::too_many_arguments)]
fn resolve_program_imports<'p>(
    program: &Program<'p>,
    current_file: &Path,
    interner: &'static mut Interner,
    stdlib: &'static StdlibRegistry,
    loader: &mut ModuleLoader,
    env_cache: &mut HashMap<PathBuf, Rc<RefCell<Environment<'static>>>>,
    diags: &mut DiagnosticList,
    color: bool,
) -> Result<(HashMap<Symbol, LoadedModule>, HashMap<Symbol, Rc<RefCell<Environment<'static>>>>), ()> {
    let mut modules = HashMap::new();
    let mut envs = HashMap::new();
    let mut ok = true;

    for stmt in program.stmts.iter().copied() {
        let Stmt::Import { spec: ImportSpec::Path { alias, path }, span } = stmt else {
            continue;
        };
        let targets = match loader.resolve_relative(current_file, path) {
            Ok(t) if !t.is_empty() => t,
            Ok(_) => {
                diags.push(Diagnostic::from_span(ErrorCode::ImportNotFound, format!("'{}' has no .ez files", path), current_file.display().to_string(), "", *span, Severity::Error));
                ok = false;
                continue;
            }
            Err(msg) => {
                diags.push(Diagnostic::from_span(ErrorCode::ImportNotFound, msg, current_file.display().to_string(), "", *span, Severity::Error));
                ok = false;
                continue;
            }
        };

        let key = match alias {
            Some(a) => *a,
            None => interner.intern(module_basename(path)),
        };

        let mut exports = HashMap::new();
        let mut struct_defs = HashMap::new();
        let mut file_set = Vec::new();
        let mut outer_env: Option<Rc<RefCell<Environment<'static>>>> = None;
        for target in &targets {
            let (loaded, env) = match resolve_file(target, interner, stdlib, loader, env_cache, diags, color, outer_env.clone()) {
                Ok(resolved) => resolved,
                Err(()) => {
                    ok = false;
                    continue;
                }
            };
            exports.extend(loaded.exports);
            struct_defs.extend(loaded.struct_defs);
            file_set.extend(loaded.file_set);
            outer_env = Some(env);
        }
        if let Some(env) = outer_env {
            envs.insert(key, env);
            modules.insert(
                key,
                LoadedModule {
                    name: key,
                    absolute_path: targets[0].clone(),
                    file_set,
                    exports,
                    struct_defs,
                },
            );
        }
    }

    if ok {
        Ok((modules, envs))
    } else {
        Err(())
    }
}

/// Resolves a single file: checks the loader's cache, detects import
/// cycles, then (on a miss) lexes/parses/checks/evaluates-top-level-only
/// it, after first resolving *its own* imports so nested modules are ready
/// when this file's checker and evaluator run.
#[allow(clippy::too_many_arguments)]
fn resolve_file(
    path: &Path,
    interner: &'static mut Interner,
    stdlib: &'static StdlibRegistry,
    loader: &mut ModuleLoader,
    env_cache: &mut HashMap<PathBuf, Rc<RefCell<Environment<'static>>>>,
    diags: &mut DiagnosticList,
    color: bool,
    outer_env: Option<Rc<RefCell<Environment<'static>>>>,
) -> Result<ResolvedModule, ()> {
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if let (Some(module), Some(env)) = (loader.cached(&canonical), env_cache.get(&canonical)) {
        return Ok((module.clone(), env.clone()));
    }

    if loader.begin_loading(&canonical).is_err() {
        diags.extend(loader.take_diagnostics());
        return Err(());
    }

    let result = (|| {
        let source = std::fs::read_to_string(&canonical).map_err(|e| {
            diags.push(Diagnostic::from_span(
                ErrorCode::ImportNotFound,
                format!("could not read imported module '{}': {}", canonical.display(), e),
                canonical.display().to_string(),
                "",
                ez_base::Span::new(0, 1),
                Severity::Error,
            ));
        })?;
        let file_name = canonical.display().to_string();

        let exprs: &'static Arena<Expr> = Box::leak(Box::new(Arena::default()));
        let stmts_arena: &'static Arena<Stmt> = Box::leak(Box::new(Arena::default()));
        let string_parts: &'static Arena<StringPart> = Box::leak(Box::new(Arena::default()));
        let source: &'static str = Box::leak(source.into_boxed_str());

        let program = lex_and_parse(&file_name, source, interner, exprs, stmts_arena, string_parts, color)?;

        let (nested_modules, nested_envs) = resolve_program_imports(&program, &canonical, interner, stdlib, loader, env_cache, diags, color)?;

        let mut registry = Registry::new();
        registry.modules = nested_modules;
        let checker = Checker::new(&*interner, file_name.clone(), source, &mut registry, stdlib);
        diags.extend(checker.check_program(&program.stmts));

        // Leaked for the same reason `interner`/`stdlib` are pinned to
        // `&'static` above: the `Evaluator` built from it has to be
        // `Evaluator<'static>` to accept `nested_envs`.
        let registry: &'static Registry = Box::leak(Box::new(registry));
        let module_name = interner.intern(module_basename(&file_name));

        let mut evaluator = Evaluator::new(&*interner, file_name.clone(), source, registry, stdlib).with_modules(nested_envs);
        if let Some(outer) = outer_env {
            evaluator = evaluator.with_outer(outer);
        }
        let env = evaluator.module_environment(&program.stmts).map_err(|diag| {
            diags.push(diag);
        })?;

        let loaded = LoadedModule {
            name: module_name,
            absolute_path: canonical.clone(),
            file_set: vec![canonical.clone()],
            exports: registry.functions.clone(),
            struct_defs: registry.structs.clone(),
        };
        Ok((loaded, env))
    })();

    loader.finish_loading(&canonical);
    if let Ok((loaded, env)) = &result {
        loader.insert(&canonical, loaded.clone());
        env_cache.insert(canonical, env.clone());
    }
    result
}

fn cmd_run(file: &Path, color: bool) -> i32 {
    let source = match read_source(file) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let file_name = file.display().to_string();

    // Leaked to `'static` (not borrowed as a local): `Evaluator::with_modules`
    // below takes `Environment<'static>` handles from the import resolver,
    // and `Environment<'a>` is invariant in `'a` (it stores `Value<'a>`
    // directly, which nests `RefCell`-wrapped `'a` data), so the root
    // program's own arena, interner, and stdlib have to share that same
    // `'static` lifetime rather than a shorter per-call one for the two to
    // unify.
    let interner: &'static mut Interner = Box::leak(Box::new(Interner::new()));
    let exprs: &'static Arena<Expr> = Box::leak(Box::new(Arena::default()));
    let stmts_arena: &'static Arena<Stmt> = Box::leak(Box::new(Arena::default()));
    let string_parts: &'static Arena<StringPart> = Box::leak(Box::new(Arena::default()));
    let source: &'static str = Box::leak(source.into_boxed_str());

    let program = match lex_and_parse(&file_name, source, interner, exprs, stmts_arena, string_parts, color) {
        Ok(p) => p,
        Err(()) => return EXIT_DIAGNOSTIC,
    };

    let stdlib: &'static StdlibRegistry = Box::leak(Box::new(ez_stdlib::build_registry(interner)));
    let mut registry = Registry::new();

    let mut loader = ModuleLoader::new();
    let mut env_cache = HashMap::new();
    let mut import_diags = DiagnosticList::new();
    let (modules, module_envs) = match resolve_program_imports(&program, file, interner, stdlib, &mut loader, &mut env_cache, &mut import_diags, color) {
        Ok(resolved) => resolved,
        Err(()) => {
            report(&import_diags, &file_name, color);
            return EXIT_DIAGNOSTIC;
        }
    };
    report(&import_diags, &file_name, color);
    registry.modules = modules;

    let checker = Checker::new(&*interner, file_name.clone(), source, &mut registry, stdlib);
    let check_diags = checker.check_program(&program.stmts);
    report(&check_diags, &file_name, color);
    if check_diags.has_errors() {
        return EXIT_DIAGNOSTIC;
    }

    let registry: &'static Registry = Box::leak(Box::new(registry));
    let mut evaluator = Evaluator::new(&*interner, file_name.clone(), source, registry, stdlib).with_modules(module_envs);
    match evaluator.run(&program.stmts) {
        Ok(_) => {
            report(&evaluator.cleanup_diagnostics, &file_name, color);
            EXIT_OK
        }
        Err(diag) => {
            eprintln!("{}", diag.render(color));
            report(&evaluator.cleanup_diagnostics, &file_name, color);
            EXIT_DIAGNOSTIC
        }
    }
}

fn cmd_check(file: &Path, color: bool, as_json: bool) -> i32 {
    let source = match read_source(file) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let file_name = file.display().to_string();

    // Leaked to `'static` for the same reason `cmd_run` leaks its interner:
    // `resolve_program_imports`/`resolve_file` build `Evaluator<'static>`
    // values internally to populate the module environment cache, even
    // though this command only ever inspects their diagnostics.
    let interner: &'static mut Interner = Box::leak(Box::new(Interner::new()));
    let exprs = Arena::default();
    let stmts_arena = Arena::default();
    let string_parts = Arena::default();

    let lexer = Lexer::new(&source, file_name.clone(), interner);
    let (tokens, lex_diags) = lexer.tokenize();
    let parser = EzParser::new(tokens, file_name.clone(), &source, interner, &exprs, &stmts_arena, &string_parts);
    let (program, parse_diags) = parser.parse_program();

    let mut all = DiagnosticList::new();
    all.extend(lex_diags);
    all.extend(parse_diags);

    if !all.has_errors() {
        let stdlib: &'static StdlibRegistry = Box::leak(Box::new(ez_stdlib::build_registry(interner)));
        let mut registry = Registry::new();
        let mut loader = ModuleLoader::new();
        let mut env_cache = HashMap::new();
        let mut import_diags = DiagnosticList::new();
        if let Ok((modules, _envs)) = resolve_program_imports(&program, file, interner, stdlib, &mut loader, &mut env_cache, &mut import_diags, color) {
            registry.modules = modules;
        }
        all.extend(import_diags);
        if !all.has_errors() {
            let checker = Checker::new(&*interner, file_name.clone(), &source, &mut registry, stdlib);
            all.extend(checker.check_program(&program.stmts));
        }
    }

    if as_json {
        print_json(&all);
    } else {
        for diag in all.iter() {
            eprintln!("{}", diag.render(color));
        }
    }

    if all.has_errors() {
        EXIT_DIAGNOSTIC
    } else {
        EXIT_OK
    }
}

fn report(diags: &DiagnosticList, _file: &str, color: bool) {
    for diag in diags.iter() {
        eprintln!("{}", diag.render(color));
    }
}

fn print_json(diags: &DiagnosticList) {
    let entries: Vec<serde_json::Value> = diags
        .iter()
        .map(|d: &Diagnostic| {
            serde_json::json!({
                "code": d.code.slug(),
                "severity": format!("{:?}", d.severity).to_lowercase(),
                "message": d.message,
                "file": d.file,
                "line": d.line,
                "column": d.column,
                "help": d.help,
            })
        })
        .collect();
    println!("{}", serde_json::Value::Array(entries));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(dir: &tempfile::TempDir, name: &str, source: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(source.as_bytes()).unwrap();
        path
    }

    #[test]
    fn run_clean_program_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, "ok.ez", "do main() { println(1 + 2 * 3) }");
        assert_eq!(cmd_run(&path, false), EXIT_OK);
    }

    #[test]
    fn run_missing_file_exits_usage_error() {
        let path = std::path::PathBuf::from("/nonexistent/does-not-exist.ez");
        assert_eq!(cmd_run(&path, false), EXIT_USAGE);
    }

    #[test]
    fn check_reports_static_error_without_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, "bad.ez", "do main() { const x int = 5\nx = 6 }");
        assert_eq!(cmd_check(&path, false, false), EXIT_DIAGNOSTIC);
    }

    #[test]
    fn check_json_mode_still_reports_errors_as_nonzero() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, "bad.ez", "do main() { const x int = 5\nx = 6 }");
        assert_eq!(cmd_check(&path, false, true), EXIT_DIAGNOSTIC);
    }

    #[test]
    fn use_color_respects_no_color_flag() {
        assert!(!use_color(true));
    }
}
