use std::fmt::{self, Display, Formatter};

use crate::arena::{Arena, ArenaId};
use crate::ast::Ident;
use crate::range::Range;

use super::instruction::Instruction;

pub type UnitId = ArenaId<CodeUnit>;
pub type CodeArena = Arena<CodeUnit>;

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum UnitKind {
    Module,
    Function,
    Lambda,
    Class,
}

/// A compiled block of instructions: the module body, or one function, lambda or class body.
#[derive(PartialEq, Debug, Clone)]
pub struct CodeUnit {
    pub name: Ident,
    pub kind: UnitKind,
    pub range: Option<Range>,
    pub varnames: Vec<Ident>,
    pub cellvars: Vec<Ident>,
    pub freevars: Vec<Ident>,
    pub names: Vec<Ident>,
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) adaptive: Vec<Instruction>,
}

impl CodeUnit {
    pub(crate) fn new(name: Ident, kind: UnitKind, range: Option<Range>) -> Self {
        Self {
            name,
            kind,
            range,
            varnames: Vec::new(),
            cellvars: Vec::new(),
            freevars: Vec::new(),
            names: Vec::new(),
            instructions: Vec::new(),
            adaptive: Vec::new(),
        }
    }

    /// The base instruction stream, or the specialised one when `adaptive` is set.
    ///
    /// Both streams have the same length and offsets.
    pub fn instructions(&self, adaptive: bool) -> &[Instruction] {
        if adaptive {
            &self.adaptive
        } else {
            &self.instructions
        }
    }

    pub fn first_line(&self) -> Option<u32> {
        self.range.map(|range| range.start.line)
    }

    /// Units referenced by this unit's instructions, in offset order.
    pub fn nested_units(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.instructions
            .iter()
            .filter_map(|instruction| instruction.argval.as_code())
    }
}

/// The output of compiling one source text: every code unit plus the module unit's id.
#[derive(PartialEq, Debug, Clone)]
pub struct CompiledProgram {
    pub units: CodeArena,
    pub root: UnitId,
}

impl CompiledProgram {
    pub fn root(&self) -> &CodeUnit {
        &self.units[self.root]
    }

    pub fn unit(&self, id: UnitId) -> Option<&CodeUnit> {
        self.units.get(id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    fn fmt_unit(&self, f: &mut Formatter<'_>, id: UnitId) -> fmt::Result {
        let unit = &self.units[id];
        for instruction in unit.instructions(false) {
            if let Some(label) = instruction.label {
                writeln!(f, "L{}:", label)?;
            }
            writeln!(f, "{}", instruction)?;
        }

        for nested in unit.nested_units() {
            writeln!(f)?;
            writeln!(f, "Disassembly of {} ({}):", self.units[nested].name, nested)?;
            self.fmt_unit(f, nested)?;
        }

        Ok(())
    }
}

impl Display for CompiledProgram {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.fmt_unit(f, self.root)
    }
}
