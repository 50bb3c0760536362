//! The EZ type system: primitives, arrays, maps, structs, enums, functions.

use ez_base::Symbol;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
    Int,
    U8,
    U16,
    U32,
    U64,
    UInt,
}

impl IntWidth {
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            IntWidth::I8 | IntWidth::I16 | IntWidth::I32 | IntWidth::I64 | IntWidth::Int
        )
    }

    /// Bit width used only to decide which of two same-signedness widths is
    /// wider; `Int`/`UInt` are arbitrary precision and always widest.
    pub fn rank(self) -> u8 {
        match self {
            IntWidth::I8 | IntWidth::U8 => 1,
            IntWidth::I16 | IntWidth::U16 => 2,
            IntWidth::I32 | IntWidth::U32 => 3,
            IntWidth::I64 | IntWidth::U64 => 4,
            IntWidth::Int | IntWidth::UInt => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntWidth::I8 => "i8",
            IntWidth::I16 => "i16",
            IntWidth::I32 => "i32",
            IntWidth::I64 => "i64",
            IntWidth::Int => "int",
            IntWidth::U8 => "u8",
            IntWidth::U16 => "u16",
            IntWidth::U32 => "u32",
            IntWidth::U64 => "u64",
            IntWidth::UInt => "uint",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "i8" => IntWidth::I8,
            "i16" => IntWidth::I16,
            "i32" => IntWidth::I32,
            "i64" => IntWidth::I64,
            "int" => IntWidth::Int,
            "u8" => IntWidth::U8,
            "u16" => IntWidth::U16,
            "u32" => IntWidth::U32,
            "u64" => IntWidth::U64,
            "uint" => IntWidth::UInt,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    F32,
    F64,
    Float,
}

impl FloatWidth {
    pub fn name(self) -> &'static str {
        match self {
            FloatWidth::F32 => "f32",
            FloatWidth::F64 => "f64",
            FloatWidth::Float => "float",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "f32" => FloatWidth::F32,
            "f64" => FloatWidth::F64,
            "float" => FloatWidth::Float,
            _ => return None,
        })
    }
}

/// A function's parameter: its type and whether it's bound by reference
/// (`&p T`), plus an optional default-initializer marker (the actual
/// initializer expression lives on the AST node; the type system only
/// needs to know one exists, for arity checking against call sites).
#[derive(Debug, Clone, PartialEq)]
pub struct ParamType {
    pub ty: Type,
    pub mutable: bool,
    pub has_default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    pub params: Vec<ParamType>,
    pub returns: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: Symbol,
    /// Ordered `(field name, type, has_default)`.
    pub fields: Vec<(Symbol, Type, bool)>,
}

impl StructDef {
    pub fn field(&self, name: Symbol) -> Option<&(Symbol, Type, bool)> {
        self.fields.iter().find(|(n, _, _)| *n == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: Symbol,
    pub underlying: Type,
    /// Ordered member names, for exhaustiveness checking of `#strict when`.
    pub members: Vec<Symbol>,
}

/// A type. `Struct`/`Enum` are carried as a name; the checker resolves the
/// name to a [`StructDef`]/[`EnumDef`] through the current registry rather
/// than embedding the definition, so two struct literals of the same name
/// compare equal without deep structural comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int(IntWidth),
    Float(FloatWidth),
    Bool,
    Char,
    Byte,
    String,
    Void,
    Nil,
    Error,
    Array(Box<Type>),
    FixedArray(Box<Type>, u64),
    Map(Box<Type>, Box<Type>),
    Struct(Symbol),
    Enum(Symbol),
    Function(Box<FunctionSig>),
    Range,
    /// Reserved for stdlib signatures only; rejected if it appears in a
    /// user type annotation (`4.4`'s "`any` is reserved for stdlib typing").
    Any,
    /// First-class type token, e.g. the argument to a JSON decoder.
    TypeValue,
}

impl Type {
    pub fn is_hashable(&self, enums: &std::collections::HashMap<Symbol, EnumDef>) -> bool {
        match self {
            Type::Int(_) | Type::Bool | Type::Char | Type::Byte | Type::String => true,
            Type::Enum(name) => enums
                .get(name)
                .map(|def| !matches!(def.underlying, Type::Float(_)))
                .unwrap_or(false),
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int(_) | Type::Float(_))
    }

    /// Same-signedness widening per the promotion rule: widen to the wider
    /// rank, same signedness; cross-signedness or int/float mixing returns
    /// `None` and the checker demands an explicit `cast`.
    pub fn promote_numeric(a: &Type, b: &Type) -> Option<Type> {
        match (a, b) {
            (Type::Int(x), Type::Int(y)) if x.is_signed() == y.is_signed() => {
                Some(Type::Int(if x.rank() >= y.rank() { *x } else { *y }))
            }
            (Type::Float(x), Type::Float(y)) => {
                let rank = |f: &FloatWidth| match f {
                    FloatWidth::F32 => 1,
                    FloatWidth::F64 | FloatWidth::Float => 2,
                };
                Some(Type::Float(if rank(x) >= rank(y) { *x } else { *y }))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int(w) => write!(f, "{}", w.name()),
            Type::Float(w) => write!(f, "{}", w.name()),
            Type::Bool => write!(f, "bool"),
            Type::Char => write!(f, "char"),
            Type::Byte => write!(f, "byte"),
            Type::String => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Nil => write!(f, "nil"),
            Type::Error => write!(f, "error"),
            Type::Array(t) => write!(f, "[{}]", t),
            Type::FixedArray(t, n) => write!(f, "[{}, {}]", t, n),
            Type::Map(k, v) => write!(f, "map[{}:{}]", k, v),
            Type::Struct(_) => write!(f, "struct"),
            Type::Enum(_) => write!(f, "enum"),
            Type::Function(_) => write!(f, "function"),
            Type::Range => write!(f, "Range"),
            Type::Any => write!(f, "any"),
            Type::TypeValue => write!(f, "type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotes_same_signedness_int_widths() {
        let a = Type::Int(IntWidth::I32);
        let b = Type::Int(IntWidth::I64);
        assert_eq!(Type::promote_numeric(&a, &b), Some(Type::Int(IntWidth::I64)));
    }

    #[test]
    fn refuses_cross_signedness_promotion() {
        let a = Type::Int(IntWidth::I32);
        let b = Type::Int(IntWidth::U32);
        assert_eq!(Type::promote_numeric(&a, &b), None);
    }

    #[test]
    fn float_backed_enum_is_not_hashable() {
        let mut enums = std::collections::HashMap::new();
        let name = Symbol::EMPTY;
        enums.insert(
            name,
            EnumDef {
                name,
                underlying: Type::Float(FloatWidth::F64),
                members: vec![],
            },
        );
        assert!(!Type::Enum(name).is_hashable(&enums));
    }

    #[test]
    fn int_backed_enum_is_hashable() {
        let mut enums = std::collections::HashMap::new();
        let name = Symbol::EMPTY;
        enums.insert(
            name,
            EnumDef {
                name,
                underlying: Type::Int(IntWidth::Int),
                members: vec![],
            },
        );
        assert!(Type::Enum(name).is_hashable(&enums));
    }
}
