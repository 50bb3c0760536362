pub mod expr;
pub mod stmt;
pub mod ty;

pub use expr::{BinaryOp, Expr, FieldInit, Literal, PostfixOp, StringPart, UnaryOp};
pub use stmt::{
    Attribute, Block, CompoundOp, Field, IfArm, ImportSpec, Param, Program, Stmt, Visibility, WhenArm, WhenPattern,
};
pub use ty::TypeExpr;
