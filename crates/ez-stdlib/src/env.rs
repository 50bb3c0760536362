//! `env` — process environment variables and command-line arguments.

use crate::util::{arg, array_value, as_string, err_pair, ok_pair, string_value};
use ez_base::Interner;
use ez_check::stdlib_registry::{StdEntry, StdlibRegistry};
use ez_check::types::{FunctionSig, ParamType, Type};
use ez_check::value::Value;

pub fn register(registry: &mut StdlibRegistry, interner: &mut Interner) {
    let module = interner.intern("env");

    registry.register(StdEntry {
        module,
        name: interner.intern("get"),
        signature: FunctionSig {
            params: vec![ParamType { ty: Type::String, mutable: false, has_default: false }],
            returns: vec![Type::String, Type::Error],
        },
        implementation: get,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("args"),
        signature: FunctionSig { params: vec![], returns: vec![Type::Array(Box::new(Type::String))] },
        implementation: args,
    });
}

fn get<'a>(call_args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let name = as_string(arg(call_args, 0, "env.get")?, "env.get")?;
    match std::env::var(&name) {
        Ok(value) => Ok(ok_pair(string_value(value))),
        Err(e) => Ok(err_pair(e.to_string())),
    }
}

fn args<'a>(_call_args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let values: Vec<Value<'a>> = std::env::args().skip(1).map(string_value).collect();
    Ok(vec![array_value(values)])
}
