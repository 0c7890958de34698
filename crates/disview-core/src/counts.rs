use disview_lang::{CompiledProgram, Instruction};
use itertools::Itertools;

/// How often each operation appears across every unit, most frequent first.
pub fn opcode_counts(program: &CompiledProgram, adaptive: bool) -> Vec<(&'static str, usize)> {
    program
        .units
        .iter()
        .flat_map(|(_, unit)| unit.instructions(adaptive))
        .map(Instruction::opname)
        .counts()
        .into_iter()
        .sorted_by(|(a_name, a_count), (b_name, b_count)| {
            b_count.cmp(a_count).then_with(|| a_name.cmp(b_name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_counts() {
        let program = disview_lang::compile("x = 1\ny = 2\ndef f():\n  return x").unwrap();
        let counts = opcode_counts(&program, false);

        assert_eq!(
            counts[..3],
            [("LOAD_CONST", 3), ("STORE_NAME", 3), ("RESUME", 2)]
        );
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 12);
        assert!(counts.contains(&("LOAD_GLOBAL", 1)));
    }

    #[test]
    fn test_adaptive_counts() {
        let program = disview_lang::compile("x = 1 + 2").unwrap();
        let counts = opcode_counts(&program, true);

        assert!(counts.contains(&("BINARY_OP_ADD_INT", 1)));
        assert!(!counts.iter().any(|(name, _)| *name == "BINARY_OP"));
    }
}
