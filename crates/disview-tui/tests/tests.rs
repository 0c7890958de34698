use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use disview_core::{FlatEntry, Severity};
use disview_lang::Opcode;
use disview_tui::{App, AppEvent, Focus, Mode, PaneLayout, Settings};
use rstest::rstest;
use std::io::Write;

fn create_test_app() -> App {
    let content = "def area(w, h):\n  return w * h\n\nx = area(2, 3)";
    App::with_file(content.to_string(), "area.py".to_string(), Settings::default())
}

fn press(app: &mut App, code: KeyCode) {
    app.handle_event(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
        .unwrap();
}

fn press_ctrl(app: &mut App, c: char) {
    app.handle_event(Event::Key(KeyEvent::new(
        KeyCode::Char(c),
        KeyModifiers::CONTROL,
    )))
    .unwrap();
}

#[test]
fn test_app_creation() {
    let app = create_test_app();
    assert_eq!(app.mode(), Mode::Normal);
    assert_eq!(app.focus(), Focus::Source);
    assert!(app.show_ast());
    assert_eq!(app.filename().unwrap(), "area.py");
    assert!(app.controller().source_focused());
    assert!(!app.tree_view().items().is_empty());
    assert_eq!(app.controller().highlight().index, Some(0));
}

#[test]
fn test_focus_cycle() {
    let mut app = create_test_app();

    press(&mut app, KeyCode::Tab);
    assert_eq!(app.focus(), Focus::Disassembly);
    assert!(!app.controller().source_focused());

    press(&mut app, KeyCode::Tab);
    assert_eq!(app.focus(), Focus::Ast);

    press(&mut app, KeyCode::Tab);
    assert_eq!(app.focus(), Focus::Source);
    assert!(app.controller().source_focused());

    press(&mut app, KeyCode::BackTab);
    assert_eq!(app.focus(), Focus::Ast);

    // Hiding the syntax tree moves focus back to the source
    press(&mut app, KeyCode::F(2));
    assert!(!app.show_ast());
    assert_eq!(app.focus(), Focus::Source);

    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Tab);
    assert_eq!(app.focus(), Focus::Source);
}

#[rstest]
#[case::help_key(KeyCode::F(1), Mode::Help)]
#[case::counts(KeyCode::F(6), Mode::Counts)]
fn test_popup_modes(#[case] key: KeyCode, #[case] mode: Mode) {
    let mut app = create_test_app();

    press(&mut app, key);
    assert_eq!(app.mode(), mode);

    press(&mut app, KeyCode::Esc);
    assert_eq!(app.mode(), Mode::Normal);
}

#[test]
fn test_counts_popup_describes_selected_opcode() {
    let mut app = create_test_app();
    let counts = app.controller().opcode_counts();

    press(&mut app, KeyCode::F(6));
    press(&mut app, KeyCode::Up);
    assert_eq!(app.counts_selected(), 0);

    press(&mut app, KeyCode::Down);
    assert_eq!(app.counts_selected(), 1);

    press(&mut app, KeyCode::Enter);
    assert_eq!(app.mode(), Mode::Counts);

    let notice = app.notice().unwrap();
    let op = Opcode::from_name(counts[1].0).unwrap();
    assert_eq!(notice.severity, Severity::Information);
    assert_eq!(notice.title, op.name());
    assert_eq!(notice.message, op.description());

    for _ in 0..counts.len() + 5 {
        press(&mut app, KeyCode::Down);
    }
    assert_eq!(app.counts_selected(), counts.len() - 1);

    press(&mut app, KeyCode::Char('x'));
    assert_eq!(app.mode(), Mode::Normal);
    assert_eq!(app.notice(), None);
}

#[test]
fn test_question_mark_is_text_in_source() {
    let mut app = App::new(String::new(), Settings::default());

    press(&mut app, KeyCode::Char('?'));
    assert_eq!(app.mode(), Mode::Normal);
    assert_eq!(app.source_text(), "?");
    assert!(app.controller().disassembly().is_error());

    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Char('?'));
    assert_eq!(app.mode(), Mode::Help);
}

#[test]
fn test_display_toggles() {
    let mut app = create_test_app();

    press(&mut app, KeyCode::F(3));
    assert!(app.controller().options().show_opcodes);
    press(&mut app, KeyCode::F(4));
    assert!(app.controller().options().adaptive);
    press(&mut app, KeyCode::F(3));
    assert!(!app.controller().options().show_opcodes);

    assert_eq!(app.layout(), PaneLayout::Horizontal);
    press(&mut app, KeyCode::F(5));
    assert_eq!(app.layout(), PaneLayout::Vertical);
}

#[test]
fn test_typing_recompiles() {
    let mut app = App::new(String::new(), Settings::default());

    for c in "x = 1".chars() {
        press(&mut app, KeyCode::Char(c));
    }

    assert_eq!(app.source_text(), "x = 1");
    assert!(!app.controller().disassembly().is_error());
    assert_eq!(app.controller().highlight().index, Some(1));
    assert!(
        app.tree_view()
            .items()
            .iter()
            .any(|item| item.label == "Assign")
    );

    press(&mut app, KeyCode::Char('+'));
    assert!(app.controller().disassembly().is_error());
    assert!(app.controller().tree().is_error());
    assert!(
        app.tree_view()
            .items()
            .iter()
            .any(|item| item.label == "Assign")
    );
}

#[test]
fn test_disassembly_navigation_moves_editor() {
    let mut app = create_test_app();
    press(&mut app, KeyCode::Tab);

    press(&mut app, KeyCode::End);
    let len = app.controller().disassembly().output().unwrap().len();
    assert_eq!(app.controller().highlight().index, Some(len - 1));

    press(&mut app, KeyCode::Home);
    press(&mut app, KeyCode::Down);
    assert_eq!(app.controller().highlight().index, Some(1));
    // The code object is loaded by the definition on line 1
    assert_eq!(
        app.controller().highlight().span.map(|span| span.line_number()),
        Some(1)
    );
    assert!(app.editor().cursor().0 <= 1);

    press(&mut app, KeyCode::PageDown);
    assert_eq!(app.controller().highlight().index, Some(11.min(len - 1)));
    press(&mut app, KeyCode::Up);
    press(&mut app, KeyCode::PageUp);
    assert_eq!(app.controller().highlight().index, Some(0));
}

#[test]
fn test_enter_follows_nested_unit() {
    let mut app = create_test_app();
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Down);
    press(&mut app, KeyCode::Enter);

    let index = app.controller().highlight().index.unwrap();
    let entry = app
        .controller()
        .disassembly()
        .output()
        .unwrap()
        .get(index)
        .unwrap();
    assert!(matches!(entry, FlatEntry::UnitBoundary { name, .. } if name == "area"));
    assert_eq!(app.notice(), None);
}

#[test]
fn test_ast_navigation() {
    let mut app = App::new("x = 1".to_string(), Settings::default());
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Tab);
    assert_eq!(app.focus(), Focus::Ast);

    press(&mut app, KeyCode::Down);
    press(&mut app, KeyCode::Down);
    assert_eq!(app.tree_view().selected_path(), Some(&[0, 0][..]));
    assert_eq!(app.controller().highlight().node, Some(vec![0, 0]));
    assert_eq!(app.editor().cursor(), (0, 5));

    let count = app.tree_view().items().len();
    press(&mut app, KeyCode::Enter);
    assert!(app.tree_view().items().len() < count);
}

#[test]
fn test_new_code() {
    let mut app = create_test_app();
    press_ctrl(&mut app, 'n');

    assert_eq!(app.source_text(), "");
    assert_eq!(app.filename(), None);
    assert!(app.tree_view().items().is_empty());
    assert!(!app.controller().disassembly().is_error());
}

#[test]
fn test_open_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "while x:\n  x = x - 1").unwrap();
    let path = file.path().display().to_string();

    let mut app = create_test_app();
    press_ctrl(&mut app, 'o');
    assert_eq!(app.mode(), Mode::Open);
    for c in path.chars() {
        press(&mut app, KeyCode::Char(c));
    }
    assert_eq!(app.open_input(), path);
    press(&mut app, KeyCode::Enter);

    assert_eq!(app.mode(), Mode::Normal);
    assert_eq!(app.filename(), Some(path.as_str()));
    assert_eq!(app.source_text(), "while x:\n  x = x - 1");
    assert_eq!(app.controller().highlight().index, Some(0));
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = create_test_app();
    let text = app.source_text();

    app.open_file(dir.path().join("missing.py"));

    let notice = app.notice().unwrap();
    assert_eq!(notice.severity, Severity::Error);
    assert_eq!(notice.title, "Unable to open file");
    assert_eq!(app.source_text(), text);

    // The next key press clears the notice
    press(&mut app, KeyCode::F(5));
    assert_eq!(app.notice(), None);
}

#[test]
fn test_superseded_load_is_discarded() {
    let mut app = create_test_app();
    let text = app.source_text();
    press_ctrl(&mut app, 'n');
    let generation = app.load_generation();

    app.handle_app_event(AppEvent::FileLoaded {
        generation: generation - 1,
        path: "old.py".into(),
        result: Ok("y = 2".to_string()),
    })
    .unwrap();
    assert_eq!(app.source_text(), "");
    assert_ne!(app.source_text(), text);

    app.handle_app_event(AppEvent::FileLoaded {
        generation,
        path: "new.py".into(),
        result: Ok("y = 2".to_string()),
    })
    .unwrap();
    assert_eq!(app.source_text(), "y = 2");
    assert_eq!(app.filename(), Some("new.py"));
}

#[test]
fn test_quit() {
    let mut app = create_test_app();
    assert!(!app.should_quit());
    press_ctrl(&mut app, 'q');
    assert!(app.should_quit());
}
