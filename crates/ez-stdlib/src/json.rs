//! `json` — encode/decode via `serde_json`'s untyped [`serde_json::Value`],
//! bridged into EZ's own [`Value`] since EZ has no `#[derive(Serialize)]`
//! to hang off user structs.

use crate::util::{arg, as_string, err_pair, ok_pair, string_value};
use ez_base::Interner;
use ez_check::stdlib_registry::{StdEntry, StdlibRegistry};
use ez_check::types::{FunctionSig, ParamType, Type};
use ez_check::value::{MapKey, Value};
use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::cell::RefCell;
use std::rc::Rc;

pub fn register(registry: &mut StdlibRegistry, interner: &mut Interner) {
    let module = interner.intern("json");

    registry.register(StdEntry {
        module,
        name: interner.intern("encode"),
        signature: FunctionSig {
            params: vec![ParamType { ty: Type::Any, mutable: false, has_default: false }],
            returns: vec![Type::String, Type::Error],
        },
        implementation: encode,
    });
    registry.register(StdEntry {
        module,
        name: interner.intern("decode"),
        signature: FunctionSig {
            params: vec![ParamType { ty: Type::String, mutable: false, has_default: false }],
            returns: vec![Type::Any, Type::Error],
        },
        implementation: decode,
    });
}

fn encode<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let value = arg(args, 0, "json.encode")?;
    match to_json(value) {
        Ok(json) => Ok(ok_pair(string_value(json.to_string()))),
        Err(e) => Ok(err_pair(e)),
    }
}

fn decode<'a>(args: &[Value<'a>]) -> Result<Vec<Value<'a>>, String> {
    let text = as_string(arg(args, 0, "json.decode")?, "json.decode")?;
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => Ok(ok_pair(from_json(&json))),
        Err(e) => Ok(err_pair(e.to_string())),
    }
}

fn to_json(value: &Value<'_>) -> Result<serde_json::Value, String> {
    Ok(match value {
        Value::Int(i) => serde_json::Value::Number(
            i.to_i64().map(serde_json::Number::from).ok_or_else(|| "json.encode: integer too large for JSON".to_string())?,
        ),
        Value::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Char(c) => serde_json::Value::String(c.to_string()),
        Value::Byte(b) => serde_json::Value::Number((*b).into()),
        Value::String(s) => serde_json::Value::String(s.borrow().clone()),
        Value::Nil => serde_json::Value::Null,
        Value::Array(items, _) => {
            let mut out = Vec::with_capacity(items.borrow().len());
            for item in items.borrow().iter() {
                out.push(to_json(item)?);
            }
            serde_json::Value::Array(out)
        }
        Value::Map(entries, _) => {
            let mut out = serde_json::Map::new();
            for (key, v) in entries.borrow().iter() {
                let key_text = match key {
                    MapKey::String(s) => s.clone(),
                    MapKey::Int(i) => i.to_string(),
                    MapKey::Bool(b) => b.to_string(),
                    MapKey::Char(c) => c.to_string(),
                    MapKey::Byte(b) => b.to_string(),
                    MapKey::Enum(_, member) => format!("{:?}", member),
                };
                out.insert(key_text, to_json(v)?);
            }
            serde_json::Value::Object(out)
        }
        other => return Err(format!("json.encode: cannot encode a {}", other.type_name())),
    })
}

fn from_json<'a>(json: &serde_json::Value) -> Value<'a> {
    match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(BigInt::from(i))
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => string_value(s.clone()),
        serde_json::Value::Array(items) => {
            Value::Array(Rc::new(RefCell::new(items.iter().map(from_json).collect())), true)
        }
        serde_json::Value::Object(map) => {
            let mut out = IndexMap::new();
            for (k, v) in map {
                out.insert(MapKey::String(k.clone()), from_json(v));
            }
            Value::Map(Rc::new(RefCell::new(out)), true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ez_base::Symbol;

    fn s<'a>(text: &str) -> Value<'a> {
        string_value(text.to_string())
    }

    #[test]
    fn encode_then_decode_array_of_mixed_scalars() {
        let array = Value::Array(Rc::new(RefCell::new(vec![Value::Int(BigInt::from(1)), Value::Bool(true), s("x")])), true);
        let encoded = encode(&[array]).unwrap();
        let text = as_string(&encoded[0], "t").unwrap();
        assert!(matches!(encoded[1], Value::Nil));

        let decoded = decode(&[s(&text)]).unwrap();
        let items = crate::util::as_array(&decoded[0], "t").unwrap();
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn decode_rejects_malformed_input_without_panicking() {
        let result = decode(&[s("{not json")]).unwrap();
        assert!(matches!(result[0], Value::Nil));
        assert!(matches!(result[1], Value::Error(_)));
    }

    #[test]
    fn decode_object_preserves_key_order() {
        let decoded = decode(&[s(r#"{"b": 1, "a": 2}"#)]).unwrap();
        match &decoded[0] {
            Value::Map(entries, _) => {
                let keys: Vec<_> = entries.borrow().keys().cloned().collect();
                assert_eq!(keys, vec![MapKey::String("b".to_string()), MapKey::String("a".to_string())]);
            }
            other => panic!("expected a map, got {:?}", other),
        }
    }

    #[test]
    fn encode_rejects_function_values() {
        assert!(encode(&[Value::Builtin(Symbol::default(), Symbol::default())])
            .map(|v| matches!(v[1], Value::Error(_)))
            .unwrap_or(false));
    }
}
