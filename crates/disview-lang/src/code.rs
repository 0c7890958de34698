pub mod instruction;
pub mod opcode;
pub mod unit;

pub use instruction::{ArgValue, INSTRUCTION_SIZE, Instruction};
pub use opcode::Opcode;
pub use unit::{CodeArena, CodeUnit, CompiledProgram, UnitId, UnitKind};
