use std::fmt::{self, Display, Formatter};

use disview_lang::{CompiledProgram, UnitId};

use crate::entry::{EntryId, FlatEntry};
use crate::error::LookupError;
use crate::index::UnitIndex;

/// Display switches for the disassembly view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Show the numeric opcode next to each operation name.
    pub show_opcodes: bool,
    /// Use the specialised instruction stream.
    pub adaptive: bool,
}

/// A compiled program laid out as one navigable list.
///
/// Each unit's instructions are contiguous. Nested units follow the complete
/// instruction list of the unit that defines them, each behind a
/// [`FlatEntry::UnitBoundary`]. The root unit has no boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Disassembly {
    entries: Vec<FlatEntry>,
    index: UnitIndex,
    options: FlattenOptions,
}

pub fn flatten(program: &CompiledProgram, options: FlattenOptions) -> Disassembly {
    let mut disassembly = Disassembly {
        entries: Vec::with_capacity(program.root().instructions(options.adaptive).len()),
        index: UnitIndex::new(),
        options,
    };
    disassembly.add_unit(program, program.root, true);
    disassembly
}

impl Disassembly {
    fn add_unit(&mut self, program: &CompiledProgram, id: UnitId, is_root: bool) {
        let Some(unit) = program.unit(id) else {
            log::warn!("Code unit {} is missing from the program", id);
            return;
        };

        let token = self.index.register(id);
        if !is_root {
            self.push(FlatEntry::UnitBoundary {
                unit: token,
                name: unit.name.clone(),
            });
        }

        let instructions = unit.instructions(self.options.adaptive);
        for instruction in instructions {
            self.push(FlatEntry::Instruction {
                unit: token,
                instruction: instruction.clone(),
            });
        }

        for nested in instructions
            .iter()
            .filter_map(|instruction| instruction.argval.as_code())
        {
            self.add_unit(program, nested, false);
        }
    }

    fn push(&mut self, entry: FlatEntry) {
        self.index.insert(entry.id(), self.entries.len());
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[FlatEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&FlatEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> &UnitIndex {
        &self.index
    }

    pub fn options(&self) -> FlattenOptions {
        self.options
    }

    pub fn position(&self, id: &EntryId) -> Result<usize, LookupError> {
        self.index.resolve(id)
    }

    /// Resolves where selecting the entry at `index` leads, if anywhere.
    pub fn jump_from(&self, index: usize) -> Option<Result<usize, LookupError>> {
        self.entries
            .get(index)
            .and_then(FlatEntry::jump_destination)
            .map(|destination| self.position(&destination))
    }

    /// Index of the first instruction compiled from `line`.
    pub fn first_on_line(&self, line: u32) -> Option<usize> {
        self.entries.iter().position(|entry| {
            entry
                .instruction()
                .is_some_and(|instruction| instruction.line_number() == Some(line))
        })
    }

    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.entries
            .iter()
            .map(|entry| entry.render(self.options.show_opcodes))
    }
}

impl Display for Disassembly {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn disassemble(code: &str, options: FlattenOptions) -> Disassembly {
        flatten(&disview_lang::compile(code).unwrap(), options)
    }

    fn boundaries(disassembly: &Disassembly) -> Vec<(usize, String)> {
        disassembly
            .entries()
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| match entry {
                FlatEntry::UnitBoundary { name, .. } => Some((i, name.to_string())),
                FlatEntry::Instruction { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_nested_units_follow_parent() {
        let code = "def f():\n  def g():\n    pass\n  return g\ndef h():\n  pass";
        let disassembly = disassemble(code, FlattenOptions::default());
        let program = disview_lang::compile(code).unwrap();
        let root_len = program.root().instructions(false).len();

        let boundaries = boundaries(&disassembly);
        assert_eq!(
            boundaries.iter().map(|(_, name)| name.as_str()).collect::<Vec<_>>(),
            vec!["f", "g", "h"]
        );
        assert_eq!(boundaries[0].0, root_len);
        assert!(
            disassembly.entries()[..root_len]
                .iter()
                .all(|entry| entry.unit() == program.root)
        );
    }

    #[test]
    fn test_entries_are_contiguous_per_unit() {
        let code = "def f(a):\n  return lambda: a\nclass C:\n  def m(self):\n    return 1";
        let disassembly = disassemble(code, FlattenOptions::default());
        let mut seen = Vec::new();

        for entry in disassembly.entries() {
            if seen.last() != Some(&entry.unit()) {
                assert!(!seen.contains(&entry.unit()));
                seen.push(entry.unit());
            }
        }
        assert_eq!(seen.len(), 5);
    }

    #[rstest]
    #[case::jump("while x:\n  x = x - 1", 7, 1)]
    #[case::nested_unit("def f():\n  pass", 1, 5)]
    fn test_jump_from(#[case] code: &str, #[case] from: usize, #[case] expected: usize) {
        let disassembly = disassemble(code, FlattenOptions::default());
        assert_eq!(disassembly.jump_from(from), Some(Ok(expected)));
    }

    #[test]
    fn test_jump_from_plain_instruction() {
        let disassembly = disassemble("x = 1", FlattenOptions::default());
        assert_eq!(disassembly.jump_from(1), None);
        assert_eq!(disassembly.jump_from(99), None);
    }

    #[test]
    fn test_adaptive_keeps_ids() {
        let code = "for i in range(3):\n  x = i + 1";
        let base = disassemble(code, FlattenOptions::default());
        let adaptive = disassemble(
            code,
            FlattenOptions {
                adaptive: true,
                ..Default::default()
            },
        );

        assert_eq!(
            base.entries().iter().map(FlatEntry::id).collect::<Vec<_>>(),
            adaptive.entries().iter().map(FlatEntry::id).collect::<Vec<_>>()
        );
        assert!(adaptive.to_string().contains("FOR_ITER_RANGE"));
        assert!(!base.to_string().contains("FOR_ITER_RANGE"));
    }

    #[test]
    fn test_show_opcodes_only_changes_text() {
        let code = "x = 1";
        let plain = disassemble(code, FlattenOptions::default());
        let numbered = disassemble(
            code,
            FlattenOptions {
                show_opcodes: true,
                ..Default::default()
            },
        );

        assert_eq!(plain.entries(), numbered.entries());
        assert!(numbered.to_string().contains("(100)"));
        assert!(!plain.to_string().contains("(100)"));
    }

    #[test]
    fn test_first_on_line() {
        let disassembly = disassemble("x = 1\ny = 2", FlattenOptions::default());
        assert_eq!(disassembly.first_on_line(1), Some(1));
        assert_eq!(disassembly.first_on_line(2), Some(3));
        assert_eq!(disassembly.first_on_line(3), None);
    }

    #[test]
    fn test_root_boundary_is_not_addressable() {
        let program = disview_lang::compile("x = 1").unwrap();
        let disassembly = flatten(&program, FlattenOptions::default());

        assert!(disassembly.index().contains_unit(program.root));
        assert_eq!(
            disassembly.position(&EntryId::boundary(program.root)),
            Err(LookupError::EntryNotFound(EntryId::boundary(program.root)))
        );
    }
}
