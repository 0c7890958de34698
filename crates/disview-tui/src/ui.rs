use disview_core::{FlatEntry, Severity};
use itertools::Itertools;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::app::{App, Focus, Mode, PaneLayout};

pub mod treeview;

pub fn draw_ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(0),    // Panes
            Constraint::Length(1), // Status line
        ])
        .split(frame.area());

    draw_title_bar(frame, app, chunks[0]);

    let constraints = if app.show_ast() {
        vec![
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ]
    } else {
        vec![Constraint::Percentage(50), Constraint::Percentage(50)]
    };
    let direction = match app.layout() {
        PaneLayout::Horizontal => Direction::Horizontal,
        PaneLayout::Vertical => Direction::Vertical,
    };
    let panes = Layout::default()
        .direction(direction)
        .constraints(constraints)
        .split(chunks[1]);

    draw_source(frame, app, panes[0]);
    draw_disassembly(frame, app, panes[1]);
    if app.show_ast() {
        let block = pane_block(
            "Syntax Tree",
            app.focus() == Focus::Ast,
            app.controller().tree().is_error(),
        );
        app.tree_view().render(frame, panes[2], block);
    }

    draw_status_line(frame, app, chunks[2]);

    match app.mode() {
        Mode::Help => draw_help_screen(frame),
        Mode::Counts => draw_counts_popup(frame, app),
        Mode::Open => draw_open_prompt(frame, app),
        Mode::Normal => {}
    }

    if let Some(notice) = app.notice() {
        draw_notice_popup(frame, &notice.title, &notice.message, notice.severity);
    }
}

/// Border is red while the view shows stale output after an error.
fn pane_block(title: &str, focused: bool, error: bool) -> Block<'static> {
    let border = if error {
        Style::default().fg(Color::Red)
    } else if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(border)
}

fn draw_source(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.filename() {
        Some(filename) => format!("Source - {}", filename),
        None => "Source".to_string(),
    };
    let block = pane_block(&title, app.focus() == Focus::Source, false);
    let inner = block.inner(area);

    frame.render_widget(block, area);
    frame.render_widget(app.editor(), inner);
}

fn draw_disassembly(frame: &mut Frame, app: &App, area: Rect) {
    let view = app.controller().disassembly();
    let options = app.controller().options();
    let title = match (options.adaptive, options.show_opcodes) {
        (true, true) => "Disassembly [adaptive, opcodes]",
        (true, false) => "Disassembly [adaptive]",
        (false, true) => "Disassembly [opcodes]",
        (false, false) => "Disassembly",
    };
    let block = pane_block(title, app.focus() == Focus::Disassembly, view.is_error());

    let Some(disassembly) = view.output() else {
        let empty_text = Paragraph::new("Nothing compiled yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty_text, area);
        return;
    };

    let selected = app.controller().highlight().index;
    let items: Vec<ListItem> = disassembly
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let text = Text::raw(entry.render(options.show_opcodes));
            let style = if Some(i) == selected {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                match entry {
                    FlatEntry::UnitBoundary { .. } => Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                    FlatEntry::Instruction { .. } => Style::default(),
                }
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));

    let mut state = ListState::default();
    state.select(selected);

    frame.render_stateful_widget(list, area, &mut state);
}

/// Draw the status line at the bottom
fn draw_status_line(frame: &mut Frame, app: &App, area: Rect) {
    let controller = app.controller();
    let error = controller
        .disassembly()
        .error()
        .or_else(|| controller.tree().error());

    let status_text = match error {
        Some(error) => Paragraph::new(error.to_string()).style(Style::default().fg(Color::Red)),
        None => {
            let entries = controller.disassembly().output().map_or(0, |d| d.len());
            let status = format!(
                "{} entries | Tab: switch pane | F1: help | Ctrl+Q: quit",
                entries
            );
            Paragraph::new(status).style(Style::default().fg(Color::DarkGray))
        }
    };

    frame.render_widget(status_text, area);
}

fn draw_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.filename() {
        Some(filename) => format!("disview - {}", filename),
        None => "disview".to_string(),
    };

    let focus_indicator = match app.focus() {
        Focus::Source => "SOURCE",
        Focus::Disassembly => "DISASSEMBLY",
        Focus::Ast => "AST",
    };

    let title_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);

    let title_spans = vec![
        Span::styled(title, Style::default().fg(Color::Green).bold()),
        Span::raw(" | "),
        Span::styled(
            focus_indicator,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled("Press F1 for help", Style::default().fg(Color::Gray)),
    ];

    let title_text = Paragraph::new(Line::from(title_spans))
        .block(title_block)
        .alignment(Alignment::Center);

    frame.render_widget(title_text, area);
}

fn popup_area(frame: &Frame, width: u16, height: u16) -> Rect {
    let area = frame.area();
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 2;

    Rect::new(x, y, width, height)
}

fn help_line(key: &'static str, description: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<10}", key), Style::default().fg(Color::Yellow)),
        Span::raw(description),
    ])
}

fn help_heading(title: &'static str) -> Line<'static> {
    Line::from(vec![Span::styled(
        title,
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::UNDERLINED),
    )])
}

fn draw_help_screen(frame: &mut Frame) {
    let help_area = popup_area(frame, 60, 26);

    frame.render_widget(Clear, help_area);

    let help_block = Block::default()
        .title("Keyboard Controls")
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .style(Style::default().bg(Color::Black));

    let help_text = vec![
        help_heading("Panes"),
        Line::from(""),
        help_line("Tab", "Next pane"),
        help_line("Shift+Tab", "Previous pane"),
        help_line("F2", "Toggle syntax tree pane"),
        help_line("F5", "Switch horizontal/vertical layout"),
        Line::from(""),
        help_heading("Disassembly"),
        Line::from(""),
        help_line("↑/↓", "Move highlight"),
        help_line("PgUp/PgDn", "Move by page"),
        help_line("Home/End", "First/last entry"),
        help_line("Enter", "Follow jump or nested code"),
        help_line("F3", "Toggle numeric opcodes"),
        help_line("F4", "Toggle adaptive instructions"),
        help_line("F6", "Opcode counts (Enter describes)"),
        Line::from(""),
        help_heading("Other Commands"),
        Line::from(""),
        help_line("Enter", "Expand/collapse syntax tree node"),
        help_line("Ctrl+N", "New empty snippet"),
        help_line("Ctrl+O", "Open file"),
        help_line("F1/?", "Show this help"),
        help_line("Ctrl+Q", "Quit application"),
    ];

    let help_paragraph = Paragraph::new(help_text)
        .block(help_block)
        .style(Style::default())
        .alignment(Alignment::Left);

    frame.render_widget(help_paragraph, help_area);
}

fn draw_counts_popup(frame: &mut Frame, app: &App) {
    let counts = app.controller().opcode_counts();
    let name_width = counts
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or_default();
    let height = (counts.len() as u16).saturating_add(2).clamp(3, 30);
    let counts_area = popup_area(frame, (name_width as u16).saturating_add(12).max(34), height);

    frame.render_widget(Clear, counts_area);

    let items = counts
        .iter()
        .map(|(name, count)| {
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:<width$}", name, width = name_width)),
                Span::styled(format!("{:>6}", count), Style::default().fg(Color::Yellow)),
            ]))
        })
        .collect_vec();

    let counts_block = Block::default()
        .title("Opcode counts (Enter: describe)")
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .style(Style::default().bg(Color::Black));

    let list = List::new(items)
        .block(counts_block)
        .highlight_style(Style::default().fg(Color::Black).bg(Color::White));

    let mut state = ListState::default();
    state.select((!counts.is_empty()).then_some(app.counts_selected()));

    frame.render_stateful_widget(list, counts_area, &mut state);
}

fn draw_open_prompt(frame: &mut Frame, app: &App) {
    let prompt_area = popup_area(frame, 60, 3);

    frame.render_widget(Clear, prompt_area);

    let prompt_block = Block::default()
        .title("Open file (Enter to open, Esc to cancel)")
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::Black));

    let prompt_text = Paragraph::new(app.open_input())
        .style(Style::default().fg(Color::Yellow))
        .block(prompt_block);

    frame.render_widget(prompt_text, prompt_area);
    frame.set_cursor_position((
        prompt_area.x + app.open_input().chars().count() as u16 + 1,
        prompt_area.y + 1,
    ));
}

fn draw_notice_popup(frame: &mut Frame, title: &str, message: &str, severity: Severity) {
    let popup_area = popup_area(frame, 60, 3);

    frame.render_widget(Clear, popup_area);

    let background = match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Information => Color::Blue,
    };

    let notice_block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .style(Style::default().bg(background).fg(Color::White));

    let notice_text = Paragraph::new(message.to_string())
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(background).fg(Color::White))
        .block(notice_block);

    frame.render_widget(notice_text, popup_area);
}
