use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use disview_core::{Controller, FlattenOptions, HighlightRequest, LangFrontend, Notice};
use disview_lang::Opcode;
use miette::IntoDiagnostic;
use ratatui::prelude::*;
use std::{io::Stdout, path::PathBuf, sync::mpsc, time::Duration};
use tui_textarea::{CursorMove, TextArea};

use crate::{
    event::{AppEvent, EventHandler, EventHandlerExt, spawn_file_load},
    ui::{draw_ui, treeview::TreeView},
    util,
};

const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Help,
    /// Typing a path to open
    Open,
    /// Opcode counts popup
    Counts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Source,
    Disassembly,
    Ast,
}

/// How the panes are arranged on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaneLayout {
    /// Side by side
    #[default]
    Horizontal,
    /// Stacked
    Vertical,
}

impl PaneLayout {
    pub fn toggle(self) -> Self {
        match self {
            PaneLayout::Horizontal => PaneLayout::Vertical,
            PaneLayout::Vertical => PaneLayout::Horizontal,
        }
    }
}

/// Initial display settings, usually read from the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub options: FlattenOptions,
    pub show_ast: bool,
    pub layout: PaneLayout,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            options: FlattenOptions::default(),
            show_ast: true,
            layout: PaneLayout::default(),
        }
    }
}

pub struct App {
    /// Source text and the views derived from it
    controller: Controller<LangFrontend>,
    /// The source editor
    editor: TextArea<'static>,
    /// Visible rows of the syntax tree
    tree_view: TreeView,
    /// The pane receiving keys
    focus: Focus,
    /// Current app mode
    mode: Mode,
    /// Show the syntax tree pane
    show_ast: bool,
    layout: PaneLayout,
    /// Should the application exit
    should_quit: bool,
    /// Notice shown until the next key press
    notice: Option<Notice>,
    /// Selected row of the opcode counts popup
    counts_selected: usize,
    /// Path typed into the open prompt
    open_input: String,
    /// Filename (if loaded from a file)
    filename: Option<String>,
    /// Id of the latest file load request
    load_generation: u64,
    /// Where background loads post their result, once the event loop runs
    sender: Option<mpsc::Sender<AppEvent>>,
}

impl App {
    pub fn new(content: String, settings: Settings) -> Self {
        let mut controller = Controller::new(LangFrontend, settings.options);
        controller.replace_text(content.as_str());
        controller.set_source_focused(true);
        let tree_view = TreeView::new(controller.tree().output().cloned());

        Self {
            controller,
            editor: make_editor(&content),
            tree_view,
            focus: Focus::Source,
            mode: Mode::Normal,
            show_ast: settings.show_ast,
            layout: settings.layout,
            should_quit: false,
            notice: None,
            counts_selected: 0,
            open_input: String::new(),
            filename: None,
            load_generation: 0,
            sender: None,
        }
    }

    pub fn with_file(content: String, filename: String, settings: Settings) -> Self {
        let mut app = Self::new(content, settings);
        app.filename = Some(filename);
        app
    }

    pub fn run(&mut self) -> miette::Result<()> {
        let mut terminal = util::setup_terminal()?;
        let events = EventHandler::new(Duration::from_millis(100));
        self.sender = Some(events.sender());

        let result = self.event_loop(&mut terminal, &events);
        util::restore_terminal()?;

        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        events: &EventHandler,
    ) -> miette::Result<()> {
        while !self.should_quit {
            self.draw(terminal)?;

            if let Some(event) = events.next()? {
                self.handle_app_event(event)?;
            }
        }

        Ok(())
    }

    fn draw(&self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> miette::Result<()> {
        terminal
            .draw(|frame| draw_ui(frame, self))
            .into_diagnostic()?;
        Ok(())
    }

    pub fn handle_app_event(&mut self, event: AppEvent) -> miette::Result<()> {
        match event {
            AppEvent::Input(event) => self.handle_event(event),
            AppEvent::FileLoaded {
                generation,
                path,
                result,
            } => {
                self.on_file_loaded(generation, path, result);
                Ok(())
            }
        }
    }

    pub fn handle_event(&mut self, event: Event) -> miette::Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        self.notice = None;
        match self.mode {
            Mode::Normal => self.handle_normal_mode_key(key),
            Mode::Open => self.handle_open_mode_key(key),
            Mode::Counts => self.handle_counts_mode_key(key),
            Mode::Help => self.mode = Mode::Normal,
        }
        self.collect_notices();

        Ok(())
    }

    fn handle_normal_mode_key(&mut self, key: KeyEvent) {
        match (key.code, key.modifiers) {
            (KeyCode::Char('q'), KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            (KeyCode::F(1), _) => {
                self.mode = Mode::Help;
            }
            // `?` is plain text while editing
            (KeyCode::Char('?'), _) if self.focus != Focus::Source => {
                self.mode = Mode::Help;
            }
            (KeyCode::F(2), _) => {
                self.show_ast = !self.show_ast;
                if !self.show_ast && self.focus == Focus::Ast {
                    self.set_focus(Focus::Source);
                }
            }
            (KeyCode::F(3), _) => {
                self.update_options(|options| options.show_opcodes = !options.show_opcodes);
            }
            (KeyCode::F(4), _) => {
                self.update_options(|options| options.adaptive = !options.adaptive);
            }
            (KeyCode::F(5), _) => {
                self.layout = self.layout.toggle();
            }
            (KeyCode::F(6), _) => {
                self.counts_selected = 0;
                self.mode = Mode::Counts;
            }
            (KeyCode::Char('n'), KeyModifiers::CONTROL) => {
                self.load_generation += 1;
                self.replace_source(String::new(), None);
            }
            (KeyCode::Char('o'), KeyModifiers::CONTROL) => {
                self.open_input.clear();
                self.mode = Mode::Open;
            }
            (KeyCode::Tab, _) => self.cycle_focus(true),
            (KeyCode::BackTab, _) => self.cycle_focus(false),
            _ => match self.focus {
                Focus::Source => self.handle_source_key(key),
                Focus::Disassembly => self.handle_disassembly_key(key),
                Focus::Ast => self.handle_ast_key(key),
            },
        }
    }

    fn handle_open_mode_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
            }
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                let path = self.open_input.trim().to_string();
                if !path.is_empty() {
                    self.open_file(PathBuf::from(path));
                }
            }
            KeyCode::Backspace => {
                self.open_input.pop();
            }
            KeyCode::Char(c) => {
                self.open_input.push(c);
            }
            _ => {}
        }
    }

    fn handle_source_key(&mut self, key: KeyEvent) {
        if self.editor.input(key) {
            let text = self.source_text();
            self.controller.on_text_changed(text);
            self.sync_tree();
        }

        let (row, col) = self.editor.cursor();
        let selection = self
            .controller
            .on_source_span_selected(row as u32 + 1, Some(col + 1));
        if let Some(path) = selection.node {
            self.tree_view.select_path(&path);
        }
    }

    fn handle_disassembly_key(&mut self, key: KeyEvent) {
        let len = self
            .controller
            .disassembly()
            .output()
            .map_or(0, |disassembly| disassembly.len());
        if len == 0 {
            return;
        }

        let current = self.controller.highlight().index.unwrap_or(0);
        let target = match key.code {
            KeyCode::Up | KeyCode::Char('k') => current.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => (current + 1).min(len - 1),
            KeyCode::PageUp => current.saturating_sub(PAGE_SIZE),
            KeyCode::PageDown => (current + PAGE_SIZE).min(len - 1),
            KeyCode::Home => 0,
            KeyCode::End => len - 1,
            KeyCode::Enter => {
                // A failed jump is queued as a notice by the controller
                if let Ok(request) = self.controller.select_entry(current) {
                    self.apply_request(request);
                }
                return;
            }
            _ => return,
        };

        let request = self.controller.highlight_entry(target);
        self.apply_request(request);
    }

    fn handle_ast_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.tree_view.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.tree_view.move_down(),
            KeyCode::Enter => {
                self.tree_view.toggle_expand();
                return;
            }
            _ => return,
        }

        if let Some(path) = self.tree_view.selected_path().map(<[usize]>::to_vec) {
            let request = self.controller.on_tree_node_selected(&path);
            self.apply_request(request);
        }
    }

    /// Shows and selects the requested span in the editor.
    fn apply_request(&mut self, request: Option<HighlightRequest>) {
        let Some(HighlightRequest { span }) = request else {
            return;
        };

        let row = span.start_line.saturating_sub(1) as u16;
        self.editor.cancel_selection();

        match (span.start_column, span.end_line, span.end_column) {
            (Some(start), Some(end_line), Some(end)) => {
                self.editor
                    .move_cursor(CursorMove::Jump(row, start.saturating_sub(1) as u16));
                self.editor.start_selection();
                self.editor.move_cursor(CursorMove::Jump(
                    end_line.saturating_sub(1) as u16,
                    end.saturating_sub(1) as u16,
                ));
            }
            _ => {
                self.editor.move_cursor(CursorMove::Jump(row, 0));
                self.editor.start_selection();
                self.editor.move_cursor(CursorMove::End);
            }
        }
    }

    fn update_options(&mut self, update: impl FnOnce(&mut FlattenOptions)) {
        let mut options = self.controller.options();
        update(&mut options);
        self.controller.set_options(options);
    }

    fn cycle_focus(&mut self, forward: bool) {
        let mut panes = vec![Focus::Source, Focus::Disassembly];
        if self.show_ast {
            panes.push(Focus::Ast);
        }

        let current = panes
            .iter()
            .position(|pane| *pane == self.focus)
            .unwrap_or_default();
        let next = if forward {
            (current + 1) % panes.len()
        } else {
            (current + panes.len() - 1) % panes.len()
        };

        self.set_focus(panes[next]);
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.controller.set_source_focused(focus == Focus::Source);
    }

    /// Starts loading `path`. Any load still in flight is superseded.
    pub fn open_file(&mut self, path: PathBuf) {
        self.load_generation += 1;
        log::debug!("Loading {} (request {})", path.display(), self.load_generation);

        match &self.sender {
            Some(sender) => spawn_file_load(sender.clone(), self.load_generation, path),
            // Without a running event loop the file is read in place
            None => {
                let generation = self.load_generation;
                let result = std::fs::read_to_string(&path);
                self.on_file_loaded(generation, path, result);
            }
        }
    }

    fn on_file_loaded(
        &mut self,
        generation: u64,
        path: PathBuf,
        result: std::io::Result<String>,
    ) {
        if generation != self.load_generation {
            log::debug!("Discarding superseded load of {}", path.display());
            return;
        }

        match result {
            Ok(text) => {
                log::info!("Loaded {}", path.display());
                self.replace_source(text, Some(path.display().to_string()));
            }
            Err(err) => {
                log::warn!("Failed to load {}: {}", path.display(), err);
                self.controller.push_notice(Notice::error(
                    "Unable to open file",
                    format!("{}: {}", path.display(), err),
                ));
            }
        }
        self.collect_notices();
    }

    fn replace_source(&mut self, text: String, filename: Option<String>) {
        self.editor = make_editor(&text);
        self.controller.replace_text(text);
        self.filename = filename;
        self.sync_tree();
    }

    fn handle_counts_mode_key(&mut self, key: KeyEvent) {
        let counts = self.controller.opcode_counts();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.counts_selected = self.counts_selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.counts_selected + 1 < counts.len() {
                    self.counts_selected += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(op) = counts
                    .get(self.counts_selected)
                    .and_then(|(name, _)| Opcode::from_name(name))
                {
                    self.notice = Some(Notice::information(op.name(), op.description()));
                }
            }
            _ => self.mode = Mode::Normal,
        }
    }

    fn sync_tree(&mut self) {
        self.tree_view
            .set_root(self.controller.tree().output().cloned());
    }

    fn collect_notices(&mut self) {
        if let Some(notice) = self.controller.take_notices().pop() {
            self.notice = Some(notice);
        }
    }

    /// Get the text in the editor
    pub fn source_text(&self) -> String {
        self.editor.lines().join("\n")
    }

    /// Get the view controller
    pub fn controller(&self) -> &Controller<LangFrontend> {
        &self.controller
    }

    /// Get the source editor
    pub fn editor(&self) -> &TextArea<'static> {
        &self.editor
    }

    /// Get the syntax tree rows
    pub fn tree_view(&self) -> &TreeView {
        &self.tree_view
    }

    /// Get the focused pane
    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// Get the current app mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Check if the syntax tree pane is shown
    pub fn show_ast(&self) -> bool {
        self.show_ast
    }

    pub fn layout(&self) -> PaneLayout {
        self.layout
    }

    /// Get the notice on screen, if any
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Get the selected row of the opcode counts popup
    pub fn counts_selected(&self) -> usize {
        self.counts_selected
    }

    /// Get the path typed into the open prompt
    pub fn open_input(&self) -> &str {
        &self.open_input
    }

    /// Get the filename, if any
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Get the id of the latest load request
    pub fn load_generation(&self) -> u64 {
        self.load_generation
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

fn make_editor(text: &str) -> TextArea<'static> {
    let mut editor = TextArea::new(text.lines().map(str::to_string).collect());
    editor.set_cursor_line_style(Style::default());
    editor.set_line_number_style(Style::default().fg(Color::DarkGray));
    editor.set_selection_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    editor
}
