//! Argument-extraction helpers shared by every module. A malformed call
//! (wrong arity, wrong runtime variant) is a host-side bug — the checker
//! already rejected anything that doesn't match a registered signature —
//! so these return a plain `String` for `StdlibArgumentError`, not a full
//! diagnostic.

use ez_check::value::Value;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::cell::RefCell;
use std::rc::Rc;

pub fn arg<'a, 'b>(args: &'b [Value<'a>], i: usize, who: &str) -> Result<&'b Value<'a>, String> {
    args.get(i).ok_or_else(|| format!("{}: expected at least {} argument(s)", who, i + 1))
}

pub fn as_string<'a>(v: &Value<'a>, who: &str) -> Result<String, String> {
    match v {
        Value::String(s) => Ok(s.borrow().clone()),
        other => Err(format!("{}: expected string, got {}", who, other.type_name())),
    }
}

pub fn as_int(v: &Value<'_>, who: &str) -> Result<BigInt, String> {
    match v {
        Value::Int(i) => Ok(i.clone()),
        other => Err(format!("{}: expected int, got {}", who, other.type_name())),
    }
}

pub fn as_i64(v: &Value<'_>, who: &str) -> Result<i64, String> {
    as_int(v, who)?.to_i64().ok_or_else(|| format!("{}: integer out of range", who))
}

pub fn as_float(v: &Value<'_>, who: &str) -> Result<f64, String> {
    match v {
        Value::Float(f) => Ok(*f),
        other => Err(format!("{}: expected float, got {}", who, other.type_name())),
    }
}

pub fn as_array<'a>(v: &Value<'a>, who: &str) -> Result<Vec<Value<'a>>, String> {
    match v {
        Value::Array(items, _) => Ok(items.borrow().clone()),
        other => Err(format!("{}: expected array, got {}", who, other.type_name())),
    }
}

/// `'a` is generic rather than `'static`: `Value<'a>` is invariant in `'a`
/// (its `Reference`/`Function` variants carry `RefCell`-wrapped recursive
/// data), so a `Value<'static>` does not coerce into a `Vec<Value<'a>>`
/// context even though `String` itself carries no borrow.
pub fn string_value<'a>(s: impl Into<String>) -> Value<'a> {
    Value::String(Rc::new(RefCell::new(s.into())))
}

pub fn array_value<'a>(items: Vec<Value<'a>>) -> Value<'a> {
    Value::Array(Rc::new(RefCell::new(items)), true)
}

/// Builds the `(value, error)` two-element result every fallible stdlib
/// call returns (GLOSSARY "Multi-return"): `nil` in the slot that didn't
/// fire.
pub fn ok_pair<'a>(value: Value<'a>) -> Vec<Value<'a>> {
    vec![value, Value::Nil]
}

pub fn err_pair<'a>(message: impl Into<String>) -> Vec<Value<'a>> {
    vec![Value::Nil, Value::Error(Box::new(string_value(message.into())))]
}
