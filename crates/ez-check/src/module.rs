//! Module loader: resolves `@name` (stdlib) and relative-path imports,
//! groups multi-file modules sharing a directory and `module H` header,
//! detects import cycles, and caches by canonical absolute path.

use crate::types::{EnumDef, FunctionSig, StructDef, Type};
use ez_base::diagnostic::{Diagnostic, DiagnosticList, ErrorCode, Severity};
use ez_base::Symbol;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The registry a [`crate::checker::Checker`] consults and mutates: every
/// struct/enum/function/global visible to the file under check, pre-seeded
/// by the loader with whatever a file's imports bring into scope.
#[derive(Default)]
pub struct Registry {
    pub structs: HashMap<Symbol, StructDef>,
    pub enums: HashMap<Symbol, EnumDef>,
    pub functions: HashMap<Symbol, FunctionSig>,
    pub globals: HashMap<Symbol, (Type, bool)>,
    /// alias → stdlib module name, from `import alias@name` / `import @name`.
    pub imports: HashMap<Symbol, Symbol>,
    /// alias (or the imported file's own basename, when no alias was given)
    /// → the already-resolved relative-path module, merged in by the
    /// driver's import pre-pass before the checker for the importing file
    /// runs (see `resolve_path_imports` in `ez-cli`).
    pub modules: HashMap<Symbol, LoadedModule>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct LoadedModule {
    pub name: Symbol,
    pub absolute_path: PathBuf,
    pub file_set: Vec<PathBuf>,
    pub exports: HashMap<Symbol, FunctionSig>,
    pub struct_defs: HashMap<Symbol, StructDef>,
}

/// Caches loaded modules by canonical absolute path and tracks the
/// "currently loading" set for cycle detection (§4.5, §3.6).
pub struct ModuleLoader {
    cache: HashMap<PathBuf, LoadedModule>,
    loading: Vec<PathBuf>,
    diagnostics: DiagnosticList,
}

impl ModuleLoader {
    pub fn new() -> Self {
        ModuleLoader {
            cache: HashMap::new(),
            loading: Vec::new(),
            diagnostics: DiagnosticList::new(),
        }
    }

    pub fn diagnostics(self) -> DiagnosticList {
        self.diagnostics
    }

    /// Drains this loader's accumulated diagnostics (import cycles found by
    /// `begin_loading`) without consuming the loader, so a multi-file
    /// resolution pass can keep using it afterward.
    pub fn take_diagnostics(&mut self) -> DiagnosticList {
        std::mem::take(&mut self.diagnostics)
    }

    /// Resolves a relative import specifier (`./path` or `../path`) against
    /// `current_file`'s directory. Directory targets are flattened to every
    /// `.ez` file directly inside them; grouping by shared `module H` header
    /// is the caller's job once each file is parsed, since that requires
    /// having already lexed/parsed the file to read its header.
    pub fn resolve_relative(&self, current_file: &Path, spec: &str) -> Result<Vec<PathBuf>, String> {
        let base = current_file.parent().unwrap_or_else(|| Path::new("."));
        let target = base.join(spec);
        if target.is_dir() {
            let mut files = Vec::new();
            let entries = std::fs::read_dir(&target).map_err(|e| e.to_string())?;
            for entry in entries {
                let entry = entry.map_err(|e| e.to_string())?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("ez") {
                    files.push(path);
                }
            }
            files.sort();
            Ok(files)
        } else {
            let mut with_ext = target.clone();
            if with_ext.extension().is_none() {
                with_ext.set_extension("ez");
            }
            if with_ext.exists() {
                Ok(vec![with_ext])
            } else if target.exists() {
                Ok(vec![target])
            } else {
                Err(format!("module file not found: {}", with_ext.display()))
            }
        }
    }

    /// Begins loading `path`; returns `Err` (and records `import-cycle`) if
    /// `path` is already on the in-progress loading stack.
    pub fn begin_loading(&mut self, path: &Path) -> Result<(), ()> {
        let canonical = canonicalize_best_effort(path);
        if self.loading.contains(&canonical) {
            let chain: Vec<String> = self
                .loading
                .iter()
                .chain(std::iter::once(&canonical))
                .map(|p| p.display().to_string())
                .collect();
            self.diagnostics.push(Diagnostic::from_span(
                ErrorCode::ImportCycle,
                format!("cyclic import: {}", chain.join(" -> ")),
                canonical.display().to_string(),
                "",
                ez_base::Span::new(0, 1),
                Severity::Error,
            ));
            return Err(());
        }
        self.loading.push(canonical);
        Ok(())
    }

    pub fn finish_loading(&mut self, path: &Path) {
        let canonical = canonicalize_best_effort(path);
        self.loading.retain(|p| p != &canonical);
    }

    pub fn cached(&self, path: &Path) -> Option<&LoadedModule> {
        self.cache.get(&canonicalize_best_effort(path))
    }

    pub fn insert(&mut self, path: &Path, module: LoadedModule) {
        self.cache.insert(canonicalize_best_effort(path), module);
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn canonicalize_best_effort(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// The qualifier an unaliased `import "./path"` is accessed under
/// (`import "./math_utils.ez"` → `math_utils.square(x)`), mirroring how
/// `import @name` defaults its qualifier to the stdlib module's own name.
pub fn module_basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches(".ez");
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_loading_twice_detects_cycle() {
        let mut loader = ModuleLoader::new();
        let path = PathBuf::from("/tmp/does-not-exist-a.ez");
        assert!(loader.begin_loading(&path).is_ok());
        assert!(loader.begin_loading(&path).is_err());
    }

    #[test]
    fn finish_loading_clears_the_slot() {
        let mut loader = ModuleLoader::new();
        let path = PathBuf::from("/tmp/does-not-exist-b.ez");
        loader.begin_loading(&path).unwrap();
        loader.finish_loading(&path);
        assert!(loader.begin_loading(&path).is_ok());
    }

    #[test]
    fn module_basename_strips_directory_and_extension() {
        assert_eq!(module_basename("./math_utils.ez"), "math_utils");
        assert_eq!(module_basename("../a/b"), "b");
    }
}
