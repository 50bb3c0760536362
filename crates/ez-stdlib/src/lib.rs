//! # ez-stdlib
//!
//! Concrete implementations for the stdlib modules named in the core
//! registry shape (`ez_check::stdlib_registry`): `io`, `strings`, `math`,
//! `time`, `env`, `random`, `json`, `fs`.
//!
//! [`build_registry`] is the sole entry point: it interns every module and
//! function name through the caller's [`Interner`] (the same one the lexer
//! and parser used, so `import strings` resolves to the same [`Symbol`]s
//! these entries are registered under) and returns a populated
//! [`StdlibRegistry`] ready to hand to [`ez_check::Checker`] and
//! [`ez_check::Evaluator`].

mod env;
mod fs;
mod io;
mod json;
mod math;
mod random;
mod strings;
mod time;
mod util;

use ez_base::Interner;
use ez_check::stdlib_registry::StdlibRegistry;

pub fn build_registry(interner: &mut Interner) -> StdlibRegistry {
    let mut registry = StdlibRegistry::new();
    io::register(&mut registry, interner);
    strings::register(&mut registry, interner);
    math::register(&mut registry, interner);
    time::register(&mut registry, interner);
    env::register(&mut registry, interner);
    random::register(&mut registry, interner);
    json::register(&mut registry, interner);
    fs::register(&mut registry, interner);
    tracing::debug!(modules = 8, "stdlib registry populated");
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_module_is_registered() {
        let mut interner = Interner::new();
        let registry = build_registry(&mut interner);
        for name in ["io", "strings", "math", "time", "env", "random", "json", "fs"] {
            let module = interner.intern(name);
            assert!(registry.has_module(module), "missing module: {}", name);
        }
    }

    #[test]
    fn strings_upper_signature_is_registered() {
        let mut interner = Interner::new();
        let registry = build_registry(&mut interner);
        let module = interner.intern("strings");
        let name = interner.intern("upper");
        assert!(registry.signature(module, name).is_some());
    }
}
