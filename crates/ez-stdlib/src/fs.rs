//! `fs` — whole-file reads and writes. No streaming handle API; `io`
//! covers console I/O, and a file-handle abstraction belongs to a future
//! module once the language grows `defer`/`close` semantics beyond what
//! this core interpreter implements.

use crate::util::{arg, as_string, err_pair, ok_pair, string_value};
use ez_base::Interner;
use ez_check::stdlib_registry::{StdEntry, StdlibRegistry};
use ez_check::types::{FunctionSig, ParamType, Type};
use ez_check::value::Value;

/// Errors surfaced across the `fs` io boundary, reported to EZ programs as
/// their `to_string()` (the `Value::Error` payload has no room for a
/// structured cause chain yet).
#[derive(Debug, thiserror::Error)]
enum FsError {
    #[error("could not read '{path}': {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("could not write '{path}': {source}")]
    Write { path: String, #[source] source: std::io::Error },
    #[error("could not remove '{path}': {source}")]
    Remove { path: String, #[source] source: std::io::Error },
}

pub fn register(registry: &mut StdlibRegistry, interner: &mut Interner) {
    let module = interner.intern("fs");
    let path_param = || ParamType { ty: Type::String, mutable: false, has_default: false };

    registry.register(StdEntry {
        module,
        name: interner.intern("read_to_string"),
        signature: FunctionSig { params: vec![path_param()], returns: vec![Type::String, Type::Error] },
        implementation: read_to_string,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("write"),
        signature: FunctionSig {
            params: vec![path_param(), ParamType { ty: Type::String, mutable: false, has_default: false }],
            returns: vec![Type::Error],
        },
        implementation: write,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("exists"),
        signature: FunctionSig { params: vec![path_param()], returns: vec![Type::Bool] },
        implementation: exists,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("remove"),
        signature: FunctionSig { params: vec![path_param()], returns: vec![Type::Error] },
        implementation: remove,
    });
}

fn read_to_string<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let path = as_string(arg(args, 0, "fs.read_to_string")?, "fs.read_to_string")?;
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(ok_pair(string_value(contents))),
        Err(e) => Ok(err_pair(FsError::Read { path, source: e }.to_string())),
    }
}

fn write<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let path = as_string(arg(args, 0, "fs.write")?, "fs.write")?;
    let contents = as_string(arg(args, 1, "fs.write")?, "fs.write")?;
    match std::fs::write(&path, contents) {
        Ok(()) => Ok(vec![Value::Nil]),
        Err(e) => Ok(vec![Value::Error(Box::new(string_value(FsError::Write { path, source: e }.to_string())))]),
    }
}

fn exists<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let path = as_string(arg(args, 0, "fs.exists")?, "fs.exists")?;
    Ok(vec![Value::Bool(std::path::Path::new(&path).exists())])
}

fn remove<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let path = as_string(arg(args, 0, "fs.remove")?, "fs.remove")?;
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(vec![Value::Nil]),
        Err(e) => Ok(vec![Value::Error(Box::new(string_value(FsError::Remove { path, source: e }.to_string())))]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s<'a>(text: &str) -> Value<'a> {
        string_value(text.to_string())
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greeting.txt");
        let path_str = path.to_str().unwrap().to_string();

        let write_result = write(&[s(&path_str), s("hello")]).unwrap();
        assert!(matches!(write_result[0], Value::Nil));

        let read_result = read_to_string(&[s(&path_str)]).unwrap();
        assert_eq!(as_string(&read_result[0], "t").unwrap(), "hello");
        assert!(matches!(read_result[1], Value::Nil));
    }

    #[test]
    fn read_missing_file_reports_error_not_panic() {
        let result = read_to_string(&[s("/nonexistent/path/does-not-exist.ez")]).unwrap();
        assert!(matches!(result[0], Value::Nil));
        assert!(matches!(result[1], Value::Error(_)));
    }

    #[test]
    fn exists_reflects_filesystem_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("present.txt");
        std::fs::write(&path, "x").unwrap();
        let path_str = path.to_str().unwrap().to_string();
        assert!(matches!(exists(&[s(&path_str)]).unwrap()[0], Value::Bool(true)));
        assert!(matches!(exists(&[s("/nope/nope/nope")]).unwrap()[0], Value::Bool(false)));
    }
}
