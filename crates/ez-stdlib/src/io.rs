//! `io` — the parts of console I/O that aren't already covered by the
//! bare-call prelude (`println`/`print`/`panic`/`assert`): reading a line
//! from standard input and writing to standard error.

use crate::util::{arg, as_string, err_pair, ok_pair, string_value};
use ez_base::Interner;
use ez_check::stdlib_registry::{StdEntry, StdlibRegistry};
use ez_check::types::{FunctionSig, ParamType, Type};
use ez_check::value::Value;
use std::io::{BufRead, Write};

pub fn register(registry: &mut StdlibRegistry, interner: &mut Interner) {
    let module = interner.intern("io");

    registry.register(StdEntry {
        module,
        name: interner.intern("read_line"),
        signature: FunctionSig {
            params: vec![],
            returns: vec![Type::String, Type::Error],
        },
        implementation: read_line,
    });

    registry.register(StdEntry {
        module,
        name: interner.intern("eprintln"),
        signature: FunctionSig {
            params: vec![ParamType { ty: Type::String, mutable: false, has_default: false }],
            returns: vec![Type::Void],
        },
        implementation: eprintln_,
    });

    registry.register(StdEntry {
        module,
        name: interner.intern("eprint"),
        signature: FunctionSig {
            params: vec![ParamType { ty: Type::String, mutable: false, has_default: false }],
            returns: vec![Type::Void],
        },
        implementation: eprint_,
    });
}

fn read_line<'a>(_args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) => Ok(err_pair("end of input")),
        Ok(_) => {
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }
            Ok(ok_pair(string_value(line)))
        }
        Err(e) => Ok(err_pair(e.to_string())),
    }
}

fn eprintln_<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let text = as_string(arg(args, 0, "io.eprintln")?, "io.eprintln")?;
    eprintln!("{}", text);
    Ok(vec![Value::Unit])
}

fn eprint_<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let text = as_string(arg(args, 0, "io.eprint")?, "io.eprint")?;
    eprint!("{}", text);
    let _ = std::io::stderr().flush();
    Ok(vec![Value::Unit])
}
