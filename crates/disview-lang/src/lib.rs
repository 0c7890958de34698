//! `disview-lang` tokenizes, parses and compiles the snippet language shown by `disview`.
//!
//! The language is a small, indentation-structured subset of Python: assignments,
//! `if`/`while`/`for`, functions, lambdas, classes and the usual operators.
//! Compilation produces a [`CompiledProgram`]: an arena of [`CodeUnit`]s whose
//! instructions mirror a CPython 3.12-style stack machine.
//!
//! ## Examples
//!
//! ```rust
//! let program = disview_lang::compile("x = 1").unwrap();
//! let names = program
//!     .root()
//!     .instructions(false)
//!     .iter()
//!     .map(|i| i.opname())
//!     .collect::<Vec<_>>();
//!
//! assert_eq!(names, vec!["RESUME", "LOAD_CONST", "STORE_NAME", "RETURN_CONST"]);
//!
//! let module = disview_lang::parse("def f():\n  pass").unwrap();
//! assert_eq!(module.syntax().label(), "Module");
//! ```
mod arena;
mod ast;
mod code;
mod compiler;
mod error;
mod lexer;
mod range;

use error::InnerError;
use lexer::Lexer;

pub use arena::{Arena, ArenaId};
pub use ast::parser::Parser as AstParser;
pub use ast::{
    BinOp, BoolOp, CmpOp, Constant, Expr, ExprContext, ExprKind, Ident, Module, Param, Primitive,
    Stmt, StmtKind, SyntaxNode, SyntaxValue, UnaryOp,
};
pub use code::{
    ArgValue, CodeArena, CodeUnit, CompiledProgram, INSTRUCTION_SIZE, Instruction, Opcode, UnitId,
    UnitKind,
};
pub use error::Error;
pub use lexer::token::{Token, TokenKind};
pub use range::{Position, Range};

pub type CompileResult = Result<CompiledProgram, Error>;

/// Tokenizes `code` into the indentation-aware token stream consumed by the parser.
#[allow(clippy::result_large_err)]
pub fn tokenize(code: &str) -> Result<Vec<Token>, Error> {
    Lexer::new()
        .tokenize(code)
        .and_then(lexer::layout)
        .map_err(|e| Error::from_error(code, InnerError::Lexer(e)))
}

#[allow(clippy::result_large_err)]
pub fn parse(code: &str) -> Result<Module, Error> {
    AstParser::new(tokenize(code)?.iter())
        .parse()
        .map_err(|e| Error::from_error(code, InnerError::Parse(e)))
}

/// Parses and compiles `code`.
#[allow(clippy::result_large_err)]
pub fn compile(code: &str) -> CompileResult {
    let module = parse(code)?;
    compiler::compile(&module).map_err(|e| Error::from_error(code, InnerError::Compile(e)))
}
