//! `time` — wall-clock access and formatting, grounded in `chrono` rather
//! than hand-rolled calendar math.

use crate::util::{arg, as_i64, string_value};
use chrono::{DateTime, Utc};
use ez_base::Interner;
use ez_check::stdlib_registry::{StdEntry, StdlibRegistry};
use ez_check::types::{FunctionSig, IntWidth, ParamType, Type};
use ez_check::value::Value;
use num_bigint::BigInt;

pub fn register(registry: &mut StdlibRegistry, interner: &mut Interner) {
    let module = interner.intern("time");
    let int_param = || ParamType { ty: Type::Int(IntWidth::Int), mutable: false, has_default: false };

    registry.register(StdEntry {
        module,
        name: interner.intern("now"),
        signature: FunctionSig { params: vec![], returns: vec![Type::Int(IntWidth::Int)] },
        implementation: now,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("sleep_ms"),
        signature: FunctionSig { params: vec![int_param()], returns: vec![Type::Void] },
        implementation: sleep_ms,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("format"),
        signature: FunctionSig {
            params: vec![int_param(), ParamType { ty: Type::String, mutable: false, has_default: false }],
            returns: vec![Type::String, Type::Error],
        },
        implementation: format,
    });
}

fn now<'a>(_args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    Ok(vec![Value::Int(BigInt::from(Utc::now().timestamp_millis()))])
}

fn sleep_ms<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let ms = as_i64(arg(args, 0, "time.sleep_ms")?, "time.sleep_ms")?;
    if ms > 0 {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }
    Ok(vec![Value::Unit])
}

fn format<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let ms = as_i64(arg(args, 0, "time.format")?, "time.format")?;
    let fmt = crate::util::as_string(arg(args, 1, "time.format")?, "time.format")?;
    match DateTime::<Utc>::from_timestamp_millis(ms) {
        Some(dt) => Ok(crate::util::ok_pair(string_value(dt.format(&fmt).to_string()))),
        None => Ok(crate::util::err_pair("timestamp out of range")),
    }
}
