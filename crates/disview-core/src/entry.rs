use std::fmt::{self, Display, Formatter};
use std::sync::LazyLock;

use disview_lang::{ArgValue, Ident, Instruction, Opcode, UnitId};

const LINE_NUMBER_WIDTH: usize = 6;

static OPNAME_WIDTH: LazyLock<usize> = LazyLock::new(|| {
    Opcode::ALL
        .iter()
        .map(|opcode| opcode.name().len())
        .max()
        .unwrap_or_default()
});

/// Stable address of one entry in a flattened disassembly.
///
/// Unit boundaries have no offset. Ids survive a rebuild as long as the unit
/// keeps its id and the instruction keeps its offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId {
    pub unit: UnitId,
    pub offset: Option<usize>,
}

impl EntryId {
    pub fn boundary(unit: UnitId) -> Self {
        Self { unit, offset: None }
    }

    pub fn instruction(unit: UnitId, offset: usize) -> Self {
        Self {
            unit,
            offset: Some(offset),
        }
    }

    pub fn is_boundary(&self) -> bool {
        self.offset.is_none()
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "operation-{}-{}", self.unit, offset),
            None => write!(f, "code-{}", self.unit),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlatEntry {
    /// Marks the start of a nested unit's instructions.
    UnitBoundary { unit: UnitId, name: Ident },
    Instruction {
        unit: UnitId,
        instruction: Instruction,
    },
}

impl FlatEntry {
    pub fn id(&self) -> EntryId {
        match self {
            FlatEntry::UnitBoundary { unit, .. } => EntryId::boundary(*unit),
            FlatEntry::Instruction { unit, instruction } => {
                EntryId::instruction(*unit, instruction.offset)
            }
        }
    }

    pub fn unit(&self) -> UnitId {
        match self {
            FlatEntry::UnitBoundary { unit, .. } | FlatEntry::Instruction { unit, .. } => *unit,
        }
    }

    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            FlatEntry::Instruction { instruction, .. } => Some(instruction),
            FlatEntry::UnitBoundary { .. } => None,
        }
    }

    /// Where selecting this entry should move to: the boundary of a nested unit,
    /// or the target of a jump within the same unit.
    pub fn jump_destination(&self) -> Option<EntryId> {
        let FlatEntry::Instruction { unit, instruction } = self else {
            return None;
        };

        match (&instruction.argval, instruction.jump_target) {
            (ArgValue::Code(nested), _) => Some(EntryId::boundary(*nested)),
            (_, Some(target)) => Some(EntryId::instruction(*unit, target)),
            _ => None,
        }
    }

    /// Display text; jump targets get an extra `L<n>:` line above the instruction.
    pub fn render(&self, show_opcodes: bool) -> String {
        match self {
            FlatEntry::UnitBoundary { unit, name } => format!("@{} {}", name, unit),
            FlatEntry::Instruction { instruction, .. } => {
                let label = match instruction.label {
                    Some(label) if instruction.is_jump_target => format!("L{}:\n", label),
                    _ => String::new(),
                };
                let line_number = instruction
                    .starts_line
                    .map(|line| line.to_string())
                    .unwrap_or_default();
                let opcode = if show_opcodes {
                    format!(" ({})", instruction.opcode.code())
                } else {
                    String::new()
                };
                let arg = match &instruction.argval {
                    ArgValue::Code(unit) => format!("code@{}", unit),
                    _ => instruction.argrepr.clone(),
                };

                format!(
                    "{}{:<line_width$} {:<opname_width$}{} {}",
                    label,
                    line_number,
                    instruction.opname(),
                    opcode,
                    arg,
                    line_width = LINE_NUMBER_WIDTH,
                    opname_width = *OPNAME_WIDTH,
                )
                .trim_end()
                .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disview_lang::{Position, Range};
    use rstest::rstest;

    fn instruction(opcode: Opcode, argval: ArgValue, argrepr: &str) -> Instruction {
        Instruction {
            offset: 4,
            opcode,
            arg: Some(0),
            argval,
            argrepr: argrepr.to_string(),
            range: Some(Range::new(Position::new(3, 1), Position::new(3, 6))),
            starts_line: Some(3),
            jump_target: None,
            label: None,
            is_jump_target: false,
        }
    }

    #[rstest]
    #[case::boundary(EntryId::boundary(UnitId::new(2)), "code-2")]
    #[case::instruction(EntryId::instruction(UnitId::new(2), 8), "operation-2-8")]
    fn test_entry_id_display(#[case] id: EntryId, #[case] expected: &str) {
        assert_eq!(id.to_string(), expected);
    }

    #[test]
    fn test_render_instruction() {
        let entry = FlatEntry::Instruction {
            unit: UnitId::new(0),
            instruction: instruction(Opcode::STORE_NAME, ArgValue::Name("x".into()), "x"),
        };
        let text = entry.render(false);

        assert!(text.starts_with("3      STORE_NAME"));
        assert!(text.ends_with(" x"));
        assert_eq!(text.len(), LINE_NUMBER_WIDTH + 1 + *OPNAME_WIDTH + 2);
    }

    #[test]
    fn test_render_with_opcode_and_label() {
        let mut op = instruction(Opcode::LOAD_CONST, ArgValue::Code(UnitId::new(1)), "<code>");
        op.is_jump_target = true;
        op.label = Some(2);
        op.starts_line = None;
        let entry = FlatEntry::Instruction {
            unit: UnitId::new(0),
            instruction: op,
        };
        let text = entry.render(true);
        let lines = text.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "L2:");
        assert!(lines[1].starts_with("       LOAD_CONST"));
        assert!(lines[1].contains(" (100) code@1"));
    }

    #[test]
    fn test_render_boundary() {
        let entry = FlatEntry::UnitBoundary {
            unit: UnitId::new(3),
            name: "area".into(),
        };
        assert_eq!(entry.render(false), "@area 3");
        assert_eq!(entry.instruction(), None);
        assert_eq!(entry.jump_destination(), None);
    }

    #[rstest]
    #[case::nested_unit(ArgValue::Code(UnitId::new(5)), None, Some(EntryId::boundary(UnitId::new(5))))]
    #[case::jump(ArgValue::Offset(12), Some(12), Some(EntryId::instruction(UnitId::new(1), 12)))]
    #[case::plain(ArgValue::Int(1), None, None)]
    fn test_jump_destination(
        #[case] argval: ArgValue,
        #[case] jump_target: Option<usize>,
        #[case] expected: Option<EntryId>,
    ) {
        let mut op = instruction(Opcode::JUMP_FORWARD, argval, "");
        op.jump_target = jump_target;
        let entry = FlatEntry::Instruction {
            unit: UnitId::new(1),
            instruction: op,
        };

        assert_eq!(entry.jump_destination(), expected);
    }
}
