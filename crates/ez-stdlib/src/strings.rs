//! `strings` — string inspection and transformation built on Rust's own
//! `str` methods; nothing here reinvents Unicode handling.

use crate::util::{arg, array_value, as_array, as_int, as_string, string_value};
use ez_base::Interner;
use ez_check::stdlib_registry::{StdEntry, StdlibRegistry};
use ez_check::types::{FunctionSig, IntWidth, ParamType, Type};
use ez_check::value::Value;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

pub fn register(registry: &mut StdlibRegistry, interner: &mut Interner) {
    let module = interner.intern("strings");
    let string_param = || ParamType { ty: Type::String, mutable: false, has_default: false };

    let unary = |name: &str, returns: Type, f: ez_check::stdlib_registry::BuiltinFn| StdEntry {
        module,
        name: interner.intern(name),
        signature: FunctionSig { params: vec![string_param()], returns: vec![returns] },
        implementation: f,
    };
    registry.register(unary("upper", Type::String, upper));
    registry.register(unary("lower", Type::String, lower));
    registry.register(unary("trim", Type::String, trim));
    registry.register(unary("len", Type::Int(IntWidth::Int), len));

    let binary = |name: &str, returns: Type, f: ez_check::stdlib_registry::BuiltinFn| StdEntry {
        module,
        name: interner.intern(name),
        signature: FunctionSig { params: vec![string_param(), string_param()], returns: vec![returns] },
        implementation: f,
    };
    registry.register(binary("contains", Type::Bool, contains));
    registry.register(binary("starts_with", Type::Bool, starts_with));
    registry.register(binary("ends_with", Type::Bool, ends_with));
    registry.register(binary("split", Type::Array(Box::new(Type::String)), split));

    registry.register(StdEntry {
        module,
        name: interner.intern("replace"),
        signature: FunctionSig {
            params: vec![string_param(), string_param(), string_param()],
            returns: vec![Type::String],
        },
        implementation: replace,
    });

    registry.register(StdEntry {
        module,
        name: interner.intern("join"),
        signature: FunctionSig {
            params: vec![
                ParamType { ty: Type::Array(Box::new(Type::String)), mutable: false, has_default: false },
                string_param(),
            ],
            returns: vec![Type::String],
        },
        implementation: join,
    });

    registry.register(StdEntry {
        module,
        name: interner.intern("repeat"),
        signature: FunctionSig {
            params: vec![string_param(), ParamType { ty: Type::Int(IntWidth::Int), mutable: false, has_default: false }],
            returns: vec![Type::String],
        },
        implementation: repeat,
    });
}

fn upper<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    Ok(vec![string_value(as_string(arg(args, 0, "strings.upper")?, "strings.upper")?.to_uppercase())])
}

fn lower<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    Ok(vec![string_value(as_string(arg(args, 0, "strings.lower")?, "strings.lower")?.to_lowercase())])
}

fn trim<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    Ok(vec![string_value(as_string(arg(args, 0, "strings.trim")?, "strings.trim")?.trim().to_string())])
}

fn len<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let s = as_string(arg(args, 0, "strings.len")?, "strings.len")?;
    Ok(vec![Value::Int(BigInt::from(s.chars().count()))])
}

fn contains<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let s = as_string(arg(args, 0, "strings.contains")?, "strings.contains")?;
    let needle = as_string(arg(args, 1, "strings.contains")?, "strings.contains")?;
    Ok(vec![Value::Bool(s.contains(&needle))])
}

fn starts_with<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let s = as_string(arg(args, 0, "strings.starts_with")?, "strings.starts_with")?;
    let prefix = as_string(arg(args, 1, "strings.starts_with")?, "strings.starts_with")?;
    Ok(vec![Value::Bool(s.starts_with(&prefix))])
}

fn ends_with<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let s = as_string(arg(args, 0, "strings.ends_with")?, "strings.ends_with")?;
    let suffix = as_string(arg(args, 1, "strings.ends_with")?, "strings.ends_with")?;
    Ok(vec![Value::Bool(s.ends_with(&suffix))])
}

fn split<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let s = as_string(arg(args, 0, "strings.split")?, "strings.split")?;
    let sep = as_string(arg(args, 1, "strings.split")?, "strings.split")?;
    let parts: Vec<Value<'a>> = if sep.is_empty() {
        s.chars().map(|c| string_value(c.to_string())).collect()
    } else {
        s.split(sep.as_str()).map(string_value).collect()
    };
    Ok(vec![array_value(parts)])
}

fn replace<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let s = as_string(arg(args, 0, "strings.replace")?, "strings.replace")?;
    let from = as_string(arg(args, 1, "strings.replace")?, "strings.replace")?;
    let to = as_string(arg(args, 2, "strings.replace")?, "strings.replace")?;
    Ok(vec![string_value(s.replace(from.as_str(), &to))])
}

fn join<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let items = as_array(arg(args, 0, "strings.join")?, "strings.join")?;
    let sep = as_string(arg(args, 1, "strings.join")?, "strings.join")?;
    let mut parts = Vec::with_capacity(items.len());
    for item in &items {
        parts.push(as_string(item, "strings.join")?);
    }
    Ok(vec![string_value(parts.join(&sep))])
}

fn repeat<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let s = as_string(arg(args, 0, "strings.repeat")?, "strings.repeat")?;
    let n = as_int(arg(args, 1, "strings.repeat")?, "strings.repeat")?;
    let n = n.to_usize().ok_or_else(|| "strings.repeat: count out of range".to_string())?;
    Ok(vec![string_value(s.repeat(n))])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s<'a>(text: &str) -> Value<'a> {
        string_value(text.to_string())
    }

    #[test]
    fn upper_lower_roundtrip() {
        assert_eq!(as_string(&upper(&[s("Ez")]).unwrap()[0], "t").unwrap(), "EZ");
        assert_eq!(as_string(&lower(&[s("Ez")]).unwrap()[0], "t").unwrap(), "ez");
    }

    #[test]
    fn len_counts_chars_not_bytes() {
        let result = len(&[s("héllo")]).unwrap();
        assert!(matches!(&result[0], Value::Int(i) if *i == BigInt::from(5)));
    }

    #[test]
    fn split_on_empty_separator_splits_chars() {
        let result = split(&[s("ab"), s("")]).unwrap();
        let items = as_array(&result[0], "t").unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn join_concatenates_with_separator() {
        let list = array_value(vec![s("a"), s("b"), s("c")]);
        let result = join(&[list, s("-")]).unwrap();
        assert_eq!(as_string(&result[0], "t").unwrap(), "a-b-c");
    }

    #[test]
    fn replace_substitutes_every_match() {
        let result = replace(&[s("banana"), s("a"), s("o")]).unwrap();
        assert_eq!(as_string(&result[0], "t").unwrap(), "bonono");
    }

    #[test]
    fn missing_argument_reports_stdlib_error() {
        assert!(upper(&[]).is_err());
    }
}
