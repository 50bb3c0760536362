//! `math` — floating-point transcendental functions plus a handful of
//! width-polymorphic helpers (`abs`/`min`/`max`) that work across both
//! `int` and `float`, hence typed `any` per the stdlib-only escape hatch
//! (`4.4`).

use crate::util::{arg, as_float};
use ez_base::Interner;
use ez_check::stdlib_registry::{StdEntry, StdlibRegistry};
use ez_check::types::{FloatWidth, FunctionSig, ParamType, Type};
use ez_check::value::Value;
use num_bigint::BigInt;
use num_traits::Signed;

pub fn register(registry: &mut StdlibRegistry, interner: &mut Interner) {
    let module = interner.intern("math");
    let float_param = || ParamType { ty: Type::Float(FloatWidth::Float), mutable: false, has_default: false };

    registry.register(StdEntry {
        module,
        name: interner.intern("sqrt"),
        signature: FunctionSig { params: vec![float_param()], returns: vec![Type::Float(FloatWidth::Float)] },
        implementation: sqrt,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("pow"),
        signature: FunctionSig { params: vec![float_param(), float_param()], returns: vec![Type::Float(FloatWidth::Float)] },
        implementation: pow,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("floor"),
        signature: FunctionSig { params: vec![float_param()], returns: vec![Type::Float(FloatWidth::Float)] },
        implementation: floor,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("ceil"),
        signature: FunctionSig { params: vec![float_param()], returns: vec![Type::Float(FloatWidth::Float)] },
        implementation: ceil,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("round"),
        signature: FunctionSig { params: vec![float_param()], returns: vec![Type::Float(FloatWidth::Float)] },
        implementation: round,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("pi"),
        signature: FunctionSig { params: vec![], returns: vec![Type::Float(FloatWidth::Float)] },
        implementation: pi,
    });

    let any_param = || ParamType { ty: Type::Any, mutable: false, has_default: false };
    registry.register(StdEntry {
        module,
        name: interner.intern("abs"),
        signature: FunctionSig { params: vec![any_param()], returns: vec![Type::Any] },
        implementation: abs,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("min"),
        signature: FunctionSig { params: vec![any_param(), any_param()], returns: vec![Type::Any] },
        implementation: min,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("max"),
        signature: FunctionSig { params: vec![any_param(), any_param()], returns: vec![Type::Any] },
        implementation: max,
    });
}

fn sqrt<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    Ok(vec![Value::Float(as_float(arg(args, 0, "math.sqrt")?, "math.sqrt")?.sqrt())])
}

fn pow<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let base = as_float(arg(args, 0, "math.pow")?, "math.pow")?;
    let exp = as_float(arg(args, 1, "math.pow")?, "math.pow")?;
    Ok(vec![Value::Float(base.powf(exp))])
}

fn floor<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    Ok(vec![Value::Float(as_float(arg(args, 0, "math.floor")?, "math.floor")?.floor())])
}

fn ceil<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    Ok(vec![Value::Float(as_float(arg(args, 0, "math.ceil")?, "math.ceil")?.ceil())])
}

fn round<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    Ok(vec![Value::Float(as_float(arg(args, 0, "math.round")?, "math.round")?.round())])
}

fn pi<'a>(_args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    Ok(vec![Value::Float(std::f64::consts::PI)])
}

fn abs<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    match arg(args, 0, "math.abs")? {
        Value::Int(i) => Ok(vec![Value::Int(i.clone().abs())]),
        Value::Float(f) => Ok(vec![Value::Float(f.abs())]),
        other => Err(format!("math.abs: expected int or float, got {}", other.type_name())),
    }
}

fn min<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let a = arg(args, 0, "math.min")?;
    let b = arg(args, 1, "math.min")?;
    numeric_pick(a, b, "math.min", |ord| ord.is_le())
}

fn max<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let a = arg(args, 0, "math.max")?;
    let b = arg(args, 1, "math.max")?;
    numeric_pick(a, b, "math.max", |ord| ord.is_ge())
}

fn numeric_pick<'a>(a: &Value<'a>, b: &Value<'a>, who: &str, keep_a: fn(std::cmp::Ordering) -> bool) -> Result<Vec<Value<'a>>, String> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => {
            let picked: &BigInt = if keep_a(x.cmp(y)) { x } else { y };
            Ok(vec![Value::Int(picked.clone())])
        }
        (Value::Float(x), Value::Float(y)) => {
            let ord = x.partial_cmp(y).ok_or_else(|| format!("{}: NaN is not ordered", who))?;
            Ok(vec![Value::Float(if keep_a(ord) { *x } else { *y })])
        }
        _ => Err(format!("{}: both arguments must be the same numeric type", who)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_handles_negative_int_and_float() {
        assert!(matches!(&abs(&[Value::Int(BigInt::from(-4))]).unwrap()[0], Value::Int(i) if *i == BigInt::from(4)));
        assert!(matches!(abs(&[Value::Float(-2.5)]).unwrap()[0], Value::Float(f) if f == 2.5));
    }

    #[test]
    fn min_max_pick_the_right_side() {
        let a = Value::Int(BigInt::from(3));
        let b = Value::Int(BigInt::from(7));
        assert!(matches!(&min(&[a.clone(), b.clone()]).unwrap()[0], Value::Int(i) if *i == BigInt::from(3)));
        assert!(matches!(&max(&[a, b]).unwrap()[0], Value::Int(i) if *i == BigInt::from(7)));
    }

    #[test]
    fn min_rejects_mismatched_types() {
        assert!(min(&[Value::Int(BigInt::from(1)), Value::Float(1.0)]).is_err());
    }

    #[test]
    fn sqrt_and_pow() {
        assert!(matches!(sqrt(&[Value::Float(9.0)]).unwrap()[0], Value::Float(f) if f == 3.0));
        assert!(matches!(pow(&[Value::Float(2.0), Value::Float(10.0)]).unwrap()[0], Value::Float(f) if f == 1024.0));
    }
}
