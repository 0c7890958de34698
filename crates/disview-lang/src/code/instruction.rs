use std::fmt::{self, Display, Formatter};

use crate::ast::{Constant, Ident};
use crate::range::Range;

use super::opcode::Opcode;
use super::unit::UnitId;

/// Size in bytes of one instruction; offsets advance by this amount.
pub const INSTRUCTION_SIZE: usize = 2;

/// The resolved value of an instruction argument.
#[derive(PartialEq, Debug, Clone)]
pub enum ArgValue {
    None,
    Int(u32),
    Const(Constant),
    Name(Ident),
    Code(UnitId),
    Offset(usize),
    Symbol(&'static str),
}

impl ArgValue {
    pub fn as_code(&self) -> Option<UnitId> {
        match self {
            ArgValue::Code(unit) => Some(*unit),
            _ => None,
        }
    }
}

impl Display for ArgValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::None => Ok(()),
            ArgValue::Int(n) => write!(f, "{}", n),
            ArgValue::Const(constant) => write!(f, "{}", constant),
            ArgValue::Name(name) => write!(f, "{}", name),
            ArgValue::Code(unit) => write!(f, "code@{}", unit),
            ArgValue::Offset(offset) => write!(f, "{}", offset),
            ArgValue::Symbol(symbol) => write!(f, "{}", symbol),
        }
    }
}

/// One operation of a code unit.
#[derive(PartialEq, Debug, Clone)]
pub struct Instruction {
    pub offset: usize,
    pub opcode: Opcode,
    pub arg: Option<u32>,
    pub argval: ArgValue,
    pub argrepr: String,
    /// The source range the instruction was compiled from, if any.
    pub range: Option<Range>,
    /// Set on the first instruction of each source line.
    pub starts_line: Option<u32>,
    /// Absolute offset of the jump destination within the same unit.
    pub jump_target: Option<usize>,
    /// `L<n>` label number, set on instructions that are jump destinations.
    pub label: Option<usize>,
    pub is_jump_target: bool,
}

impl Instruction {
    pub fn opname(&self) -> &'static str {
        self.opcode.name()
    }

    pub fn line_number(&self) -> Option<u32> {
        self.range.map(|range| range.start.line)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.arg {
            Some(arg) if self.argrepr.is_empty() => {
                write!(f, "{:>4} {:<24} {}", self.offset, self.opname(), arg)
            }
            Some(arg) => write!(
                f,
                "{:>4} {:<24} {} ({})",
                self.offset,
                self.opname(),
                arg,
                self.argrepr
            ),
            None => write!(f, "{:>4} {}", self.offset, self.opname()),
        }
    }
}
