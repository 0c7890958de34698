use disview_lang::{CompiledProgram, Position};

use crate::counts::opcode_counts;
use crate::entry::{EntryId, FlatEntry};
use crate::error::LookupError;
use crate::flatten::{Disassembly, FlattenOptions, flatten};
use crate::frontend::{Frontend, LangFrontend};
use crate::highlight::{HighlightRequest, HighlightState, SourceSpan};
use crate::notice::Notice;
use crate::tree::{self, NodePath, TreeNode};
use crate::view::DerivedView;

/// Where a selection in the source view landed in the other views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSelection {
    /// Index of the first disassembly entry compiled from the selected line.
    pub entry: Option<usize>,
    /// Path to the syntax tree node under the selection.
    pub node: Option<NodePath>,
}

/// Owns the source text and keeps the disassembly, the structure tree and the
/// highlight consistent with it.
///
/// Every text change recomputes both views synchronously. A view whose
/// recomputation fails keeps its last good output and is put in the error state.
#[derive(Debug)]
pub struct Controller<F = LangFrontend> {
    frontend: F,
    options: FlattenOptions,
    text: String,
    program: Option<CompiledProgram>,
    disassembly: DerivedView<Disassembly>,
    tree: DerivedView<TreeNode>,
    highlight: HighlightState,
    notices: Vec<Notice>,
    source_focused: bool,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(LangFrontend, FlattenOptions::default())
    }
}

impl<F: Frontend> Controller<F> {
    pub fn new(frontend: F, options: FlattenOptions) -> Self {
        let mut controller = Self {
            frontend,
            options,
            text: String::new(),
            program: None,
            disassembly: DerivedView::default(),
            tree: DerivedView::default(),
            highlight: HighlightState::default(),
            notices: Vec::new(),
            source_focused: false,
        };
        controller.replace_text("");
        controller
    }

    /// Applies an edit. The highlighted entry is kept wherever it still exists.
    pub fn on_text_changed(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.disassembly.mark_dirty();
        self.tree.mark_dirty();

        let previous = self.highlight_snapshot();
        let mut controller = scopeguard::guard(self, move |controller| {
            controller.restore_highlight(previous)
        });
        controller.recompute_disassembly();
        controller.recompute_tree();
    }

    /// Replaces the whole text, as when a file is loaded or a new snippet started.
    pub fn replace_text(&mut self, text: impl Into<String>) {
        self.highlight.reset();
        self.on_text_changed(text);
    }

    /// Changes the display switches and re-flattens the last compiled program.
    pub fn set_options(&mut self, options: FlattenOptions) {
        if self.options == options {
            return;
        }
        self.options = options;

        let previous = self.highlight_snapshot();
        let mut controller = scopeguard::guard(self, move |controller| {
            controller.restore_highlight(previous)
        });
        if let Some(program) = &controller.program {
            let disassembly = flatten(program, controller.options);
            controller.disassembly.replace_output(disassembly);
        }
    }

    pub fn set_source_focused(&mut self, focused: bool) {
        self.source_focused = focused;
    }

    /// Moves the disassembly highlight to `index` without following jumps.
    pub fn highlight_entry(&mut self, index: usize) -> Option<HighlightRequest> {
        let entry = self.disassembly.output()?.get(index)?;
        let span = entry.instruction().and_then(|instruction| {
            instruction
                .range
                .map(SourceSpan::from)
                .or_else(|| instruction.starts_line.map(SourceSpan::line))
        });

        self.highlight.entry = Some(entry.id());
        self.highlight.index = Some(index);
        if span.is_some() {
            self.highlight.span = span;
        }

        span.and_then(|span| self.request(span))
    }

    /// Selects an entry, following it to its jump target or nested unit when it has one.
    pub fn on_instruction_selected(
        &mut self,
        id: &EntryId,
    ) -> Result<Option<HighlightRequest>, LookupError> {
        let Some(disassembly) = self.disassembly.output() else {
            return Ok(None);
        };

        let destination = disassembly.position(id).and_then(|index| {
            disassembly
                .jump_from(index)
                .unwrap_or(Ok(index))
        });

        match destination {
            Ok(index) => Ok(self.highlight_entry(index)),
            Err(err) => {
                log::warn!("Jump from {} failed: {}", id, err);
                self.notices.push(Notice::error("Error", err.to_string()));
                Err(err)
            }
        }
    }

    /// [`Self::on_instruction_selected`] for the entry at `index`.
    pub fn select_entry(&mut self, index: usize) -> Result<Option<HighlightRequest>, LookupError> {
        let id = self
            .disassembly
            .output()
            .and_then(|disassembly| disassembly.get(index))
            .map(FlatEntry::id);

        match id {
            Some(id) => self.on_instruction_selected(&id),
            None => Ok(None),
        }
    }

    pub fn on_tree_node_selected(&mut self, path: &[usize]) -> Option<HighlightRequest> {
        let node = self.tree.output()?.get(path)?;
        let span = node.range.map(SourceSpan::from);

        self.highlight.node = Some(path.to_vec());
        if span.is_some() {
            self.highlight.span = span;
        }

        span.and_then(|span| self.request(span))
    }

    /// Mirrors a cursor position in the source view onto the other views.
    ///
    /// This direction is not gated on focus: the source view is where the
    /// selection came from.
    pub fn on_source_span_selected(&mut self, line: u32, column: Option<usize>) -> SourceSelection {
        self.highlight.span = Some(SourceSpan {
            start_line: line,
            start_column: column,
            end_line: None,
            end_column: None,
        });

        let entry = self
            .disassembly
            .output()
            .and_then(|disassembly| disassembly.first_on_line(line));
        if let Some(index) = entry {
            self.highlight.index = Some(index);
            self.highlight.entry = self
                .disassembly
                .output()
                .and_then(|disassembly| disassembly.get(index))
                .map(FlatEntry::id);
        }

        let node = self.tree.output().and_then(|tree| match column {
            Some(column) => tree.locate(&Position::new(line, column)),
            None => tree.locate_line(line),
        });
        if node.is_some() {
            self.highlight.node = node.clone();
        }

        SourceSelection { entry, node }
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Drains the queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Get the current source text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> FlattenOptions {
        self.options
    }

    /// Get the last successfully compiled program
    pub fn program(&self) -> Option<&CompiledProgram> {
        self.program.as_ref()
    }

    pub fn disassembly(&self) -> &DerivedView<Disassembly> {
        &self.disassembly
    }

    pub fn tree(&self) -> &DerivedView<TreeNode> {
        &self.tree
    }

    pub fn highlight(&self) -> &HighlightState {
        &self.highlight
    }

    pub fn source_focused(&self) -> bool {
        self.source_focused
    }

    /// Opcode frequencies of the last compiled program in the current stream.
    pub fn opcode_counts(&self) -> Vec<(&'static str, usize)> {
        self.program
            .as_ref()
            .map(|program| opcode_counts(program, self.options.adaptive))
            .unwrap_or_default()
    }

    fn request(&self, span: SourceSpan) -> Option<HighlightRequest> {
        (!self.source_focused).then_some(HighlightRequest { span })
    }

    fn highlight_snapshot(&self) -> (Option<EntryId>, Option<usize>) {
        (self.highlight.entry, self.highlight.index)
    }

    /// Puts the highlight back on the entry it was on before a rebuild, or
    /// clamps it into the new list when that entry is gone.
    fn restore_highlight(&mut self, (entry, index): (Option<EntryId>, Option<usize>)) {
        let position = self.disassembly.output().and_then(|disassembly| {
            let restored = entry.and_then(|id| disassembly.position(&id).ok());
            if restored.is_none() && entry.is_some() {
                log::debug!("Highlighted entry is gone after rebuild, clamping the selection");
            }

            restored
                .or(index.filter(|&index| index < disassembly.len()))
                .or((!disassembly.is_empty()).then_some(0))
        });

        self.highlight.index = position;
        self.highlight.entry = position
            .and_then(|position| self.disassembly.output()?.get(position))
            .map(FlatEntry::id);

        let node_exists = match (self.tree.output(), &self.highlight.node) {
            (Some(tree), Some(path)) => tree.get(path).is_some(),
            _ => false,
        };
        if !node_exists {
            self.highlight.node = self.tree.output().map(|_| Vec::new());
        }
    }

    fn recompute_disassembly(&mut self) {
        match self.frontend.compile_unit(&self.text) {
            Ok(program) => {
                self.disassembly
                    .succeed(Some(flatten(&program, self.options)));
                self.program = Some(program);
            }
            Err(err) => {
                log::debug!("Compilation failed: {}", err);
                self.disassembly.fail(err);
            }
        }
    }

    fn recompute_tree(&mut self) {
        if self.text.trim().is_empty() {
            self.tree.succeed(None);
            return;
        }

        match self.frontend.parse_syntax(&self.text) {
            Ok(root) => self.tree.succeed(Some(tree::build(&root))),
            Err(err) => {
                log::debug!("Parsing failed: {}", err);
                self.tree.fail(err);
            }
        }
    }
}
