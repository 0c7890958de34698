//! Lowers a parsed [`Module`] into stack-machine code units.
//!
//! Name resolution happens first in [`symtable`]; [`compile::Compiler`] then
//! walks the tree once, allocating one [`CodeUnit`](crate::code::CodeUnit) per
//! module, function, lambda and class body in definition order.
pub mod compile;
pub mod error;
pub mod symtable;

use crate::ast::Module;
use crate::code::CompiledProgram;

use compile::Compiler;
use error::CompileError;
use symtable::SymbolTable;

pub fn compile(module: &Module) -> Result<CompiledProgram, CompileError> {
    let symtable = SymbolTable::build(module);
    Compiler::new(&symtable).compile(module)
}
