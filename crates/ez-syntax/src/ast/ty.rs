//! Type annotations as written in source (`int`, `[string]`, `map[int:bool]`,
//! `MyStruct`, ...). This is the *surface* type syntax the parser produces;
//! `ez-check` resolves these into its own `Type` values.

use ez_base::Symbol;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Named(Symbol),
    Array(Box<TypeExpr>),
    FixedArray(Box<TypeExpr>, u64),
    Map(Box<TypeExpr>, Box<TypeExpr>),
}
