use disview_lang::{CompiledProgram, Opcode, UnitKind};
use miette::Diagnostic;
use rstest::rstest;

fn opnames(program: &CompiledProgram, name: &str) -> Vec<&'static str> {
    program
        .units
        .iter()
        .find(|(_, unit)| unit.name == name)
        .map(|(_, unit)| unit.instructions(false).iter().map(|i| i.opname()).collect())
        .unwrap_or_default()
}

#[rstest]
#[case::counter(
    "
def counter(n):
    total = 0
    for i in range(n):
        if i % 2 == 0:
            continue
        total += i
    return total
",
    "counter",
    vec![
        "RESUME",
        "LOAD_CONST",
        "STORE_FAST",
        "LOAD_GLOBAL",
        "LOAD_FAST",
        "CALL",
        "GET_ITER",
        "FOR_ITER",
        "STORE_FAST",
        "LOAD_FAST",
        "LOAD_CONST",
        "BINARY_OP",
        "LOAD_CONST",
        "COMPARE_OP",
        "POP_JUMP_IF_FALSE",
        "JUMP_BACKWARD",
        "LOAD_FAST",
        "LOAD_FAST",
        "BINARY_OP",
        "STORE_FAST",
        "JUMP_BACKWARD",
        "END_FOR",
        "LOAD_FAST",
        "RETURN_VALUE",
    ]
)]
#[case::method_call(
    "
class Stack:
    def push(self, item):
        self.items.append(item)
",
    "push",
    vec![
        "RESUME",
        "LOAD_FAST",
        "LOAD_ATTR",
        "LOAD_ATTR",
        "LOAD_FAST",
        "CALL",
        "POP_TOP",
        "RETURN_CONST",
    ]
)]
#[case::lambda("square = lambda x: x * x", "<lambda>", vec![
    "RESUME",
    "LOAD_FAST",
    "LOAD_FAST",
    "BINARY_OP",
    "RETURN_VALUE",
])]
fn test_compile(#[case] code: &str, #[case] unit: &str, #[case] expected: Vec<&str>) {
    let program = disview_lang::compile(code).unwrap();
    assert_eq!(opnames(&program, unit), expected);
}

#[test]
fn test_nested_unit_ranges() {
    let code = "def outer():\n    def inner():\n        pass\n    return inner\n";
    let program = disview_lang::compile(code).unwrap();

    let (_, outer) = program
        .units
        .iter()
        .find(|(_, unit)| unit.name == "outer")
        .unwrap();
    let (_, inner) = program
        .units
        .iter()
        .find(|(_, unit)| unit.name == "inner")
        .unwrap();

    assert_eq!(outer.kind, UnitKind::Function);
    assert_eq!(outer.first_line(), Some(1));
    assert_eq!(inner.first_line(), Some(2));
    assert!(outer.range.unwrap().contains(&inner.range.unwrap().start));
    assert_eq!(program.root().range, None);
}

#[test]
fn test_program_display() {
    let program = disview_lang::compile("def f():\n  return 1").unwrap();
    let text = program.to_string();

    assert!(text.contains("RESUME"));
    assert!(text.contains("Disassembly of f (1):"));
    assert!(text.contains("RETURN_CONST             0 (1)"));
}

#[test]
fn test_adaptive_offsets_match() {
    let code = "for x in [1, 2, 3]:\n    y = x * 2.0\n";
    let program = disview_lang::compile(code).unwrap();

    for (_, unit) in program.units.iter() {
        let base = unit.instructions(false);
        let adaptive = unit.instructions(true);
        assert_eq!(
            base.iter().map(|i| i.offset).collect::<Vec<_>>(),
            adaptive.iter().map(|i| i.offset).collect::<Vec<_>>()
        );
        for (b, a) in base.iter().zip(adaptive) {
            assert_eq!(a.opcode.deoptimize(), b.opcode);
        }
    }

    assert!(
        program
            .root()
            .instructions(true)
            .iter()
            .any(|i| i.opcode == Opcode::FOR_ITER_LIST)
    );
}

#[rstest]
#[case::unclosed_bracket("x = (", "LexerError::UnexpectedEOFDetected")]
#[case::bad_dedent("if a:\n    b\n  c", "LexerError::InconsistentDedent")]
#[case::unexpected_character("x = $", "LexerError::UnexpectedCharacter")]
#[case::missing_block("def f():\nx = 1", "ParseError::ExpectedIndentedBlock")]
#[case::return_outside("return 1", "CompileError::ReturnOutsideFunction")]
#[case::bad_target("f() = 1", "CompileError::InvalidAssignmentTarget")]
fn test_error_code(#[case] code: &str, #[case] expected: &str) {
    let err = disview_lang::compile(code).unwrap_err();
    assert_eq!(err.code().map(|c| c.to_string()), Some(expected.to_string()));
}

#[test]
fn test_error_range() {
    let err = disview_lang::compile("x = 1\nbreak").unwrap_err();

    assert_eq!(err.range().start.line, 2);
    assert_eq!(err.to_string(), "'break' outside loop");
    assert_eq!(err.location.offset(), 6);
}

#[test]
fn test_parse_keeps_going_after_compile_errors() {
    assert!(disview_lang::parse("return 1").is_ok());
    assert!(disview_lang::compile("return 1").is_err());
}
