use disview_core::{
    Controller, FlatEntry, FlattenOptions, LookupError, Notice, Severity, TreeNodeKind, ViewState,
    flatten, tree,
};
use rstest::{fixture, rstest};

#[fixture]
fn controller() -> Controller {
    Controller::default()
}

fn opnames(controller: &Controller) -> Vec<&'static str> {
    controller
        .disassembly()
        .output()
        .unwrap()
        .entries()
        .iter()
        .filter_map(FlatEntry::instruction)
        .map(|instruction| instruction.opname())
        .collect()
}

#[rstest]
fn test_assignment_scenario(mut controller: Controller) {
    controller.on_text_changed("x = 1");

    let tree = controller.tree().output().unwrap();
    assert_eq!(tree.label, "Module");
    let body = &tree.children[0];
    assert_eq!(body.label, "body");
    assert_eq!(body.children.len(), 1);
    assert_eq!(body.children[0].label, "Assign");

    assert_eq!(
        opnames(&controller),
        vec!["RESUME", "LOAD_CONST", "STORE_NAME", "RETURN_CONST"]
    );
    let store = controller.disassembly().output().unwrap().entries()[2]
        .instruction()
        .unwrap();
    assert_eq!(store.argrepr, "x");
}

#[rstest]
fn test_nested_function_scenario(mut controller: Controller) {
    controller.on_text_changed("def f():\n  return 1");
    let program = controller.program().unwrap();
    let root_len = program.root().instructions(false).len();
    let disassembly = controller.disassembly().output().unwrap();

    let defining = disassembly.entries()[..root_len]
        .iter()
        .filter(|entry| {
            entry
                .instruction()
                .is_some_and(|instruction| instruction.argval.as_code().is_some())
        })
        .count();
    assert_eq!(defining, 1);

    assert!(
        disassembly.entries()[..root_len]
            .iter()
            .all(|entry| entry.unit() == program.root)
    );
    assert!(matches!(
        &disassembly.entries()[root_len],
        FlatEntry::UnitBoundary { name, .. } if name == "f"
    ));
    assert!(
        disassembly.entries()[root_len + 1..]
            .iter()
            .all(|entry| entry.unit() != program.root && entry.instruction().is_some())
    );
}

#[rstest]
fn test_malformed_text_preserves_views(mut controller: Controller) {
    controller.on_text_changed("x = 1");
    let disassembly = controller.disassembly().output().unwrap().to_string();
    let outline = controller.tree().output().unwrap().outline();

    controller.on_text_changed("x = (");

    assert_eq!(controller.disassembly().state(), ViewState::Error);
    assert_eq!(controller.tree().state(), ViewState::Error);
    assert_eq!(
        controller.disassembly().output().unwrap().to_string(),
        disassembly
    );
    assert_eq!(controller.tree().output().unwrap().outline(), outline);
    assert!(controller.disassembly().error().is_some());

    controller.on_text_changed("x = (");
    assert_eq!(controller.disassembly().state(), ViewState::Error);

    controller.on_text_changed("x = (2)");
    assert_eq!(controller.disassembly().state(), ViewState::Clean);
    assert_eq!(controller.tree().state(), ViewState::Clean);
    assert_eq!(controller.disassembly().error(), None);
}

#[rstest]
fn test_highlight_restored_after_edit(mut controller: Controller) {
    controller.on_text_changed("a = 1\nb = 2");
    controller.highlight_entry(3);
    let id = controller.highlight().entry;

    controller.on_text_changed("a = 1\nb = 2\nc = 3");
    assert_eq!(controller.highlight().entry, id);
    assert_eq!(controller.highlight().index, Some(3));

    controller.on_text_changed("a = 1\nb = 2\nc = (");
    assert_eq!(controller.highlight().entry, id);
}

#[rstest]
fn test_highlight_clamped_when_entry_is_gone(mut controller: Controller) {
    controller.on_text_changed("a = 1\nb = 2\nc = 3");
    let last = controller.disassembly().output().unwrap().len() - 1;
    controller.highlight_entry(last);

    controller.on_text_changed("a = 1");
    assert_eq!(controller.highlight().index, Some(0));

    controller.highlight_entry(2);
    controller.on_text_changed("a = 1");
    assert_eq!(controller.highlight().index, Some(2));
}

#[rstest]
#[case::function("def f():\n  pass", vec!["name", "args", "body", "returns"])]
#[case::class("class C:\n  pass", vec!["name", "body"])]
#[case::call("f()", vec!["value"])]
fn test_empty_fields_are_suppressed(#[case] code: &str, #[case] fields: Vec<&str>) {
    let module = disview_lang::parse(code).unwrap();
    let root = tree::build(&module.syntax());
    let statement = &root.children[0].children[0];

    assert_eq!(
        statement
            .children
            .iter()
            .map(|child| child.label.as_str())
            .collect::<Vec<_>>(),
        fields
    );
    assert!(
        statement
            .children
            .iter()
            .all(|child| child.kind == TreeNodeKind::Field)
    );
}

#[test]
fn test_stale_entry_from_previous_text() {
    let mut controller = Controller::default();
    controller.on_text_changed("def f():\n  def g():\n    pass\n  return g");
    let disassembly = controller.disassembly().output().unwrap();
    let stale = disassembly.entries().last().map(FlatEntry::id).unwrap();

    controller.on_text_changed("x = 1");

    assert_eq!(
        controller.on_instruction_selected(&stale),
        Err(LookupError::UnitNotRegistered(stale.unit))
    );
    let notices = controller.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, Severity::Error);
    assert_eq!(notices[0], Notice::error("Error", "Unable to find that jump location"));
}

#[test]
fn test_flatten_with_options() {
    let program = disview_lang::compile("x = 2.0 * 3.0").unwrap();
    let text = flatten(
        &program,
        FlattenOptions {
            show_opcodes: true,
            adaptive: true,
        },
    )
    .to_string();

    assert!(text.contains("BINARY_OP_MULTIPLY_FLOAT"));
    assert!(text.contains("(100)"));
}
