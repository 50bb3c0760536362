//! `random` — thread-local PRNG access via `rand`. No `seed` entry: `rand`'s
//! `thread_rng` doesn't expose reseeding, and a dedicated seeded generator
//! would need to live somewhere stateful this registry has no slot for.

use crate::util::{arg, as_i64};
use ez_base::Interner;
use ez_check::stdlib_registry::{StdEntry, StdlibRegistry};
use ez_check::types::{FloatWidth, FunctionSig, IntWidth, ParamType, Type};
use ez_check::value::Value;
use num_bigint::BigInt;
use rand::Rng;

pub fn register(registry: &mut StdlibRegistry, interner: &mut Interner) {
    let module = interner.intern("random");
    let int_param = || ParamType { ty: Type::Int(IntWidth::Int), mutable: false, has_default: false };

    registry.register(StdEntry {
        module,
        name: interner.intern("int"),
        signature: FunctionSig { params: vec![int_param(), int_param()], returns: vec![Type::Int(IntWidth::Int)] },
        implementation: rand_int,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("float"),
        signature: FunctionSig { params: vec![], returns: vec![Type::Float(FloatWidth::Float)] },
        implementation: rand_float,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("bool"),
        signature: FunctionSig { params: vec![], returns: vec![Type::Bool] },
        implementation: rand_bool,
    });
}

fn rand_int<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let lo = as_i64(arg(args, 0, "random.int")?, "random.int")?;
    let hi = as_i64(arg(args, 1, "random.int")?, "random.int")?;
    if lo >= hi {
        return Err("random.int: lower bound must be less than upper bound".to_string());
    }
    let n = rand::thread_rng().gen_range(lo..hi);
    Ok(vec![Value::Int(BigInt::from(n))])
}

fn rand_float<'a>(_args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    Ok(vec![Value::Float(rand::thread_rng().gen::<f64>())])
}

fn rand_bool<'a>(_args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    Ok(vec![Value::Bool(rand::thread_rng().gen::<bool>())])
}
