pub mod error;
pub mod node;
pub mod parser;
pub mod syntax;

pub use node::{
    BinOp, BoolOp, CmpOp, Constant, Expr, ExprContext, ExprKind, Ident, Module, Param, Stmt,
    StmtKind, UnaryOp,
};
pub use syntax::{Primitive, SyntaxNode, SyntaxValue};
