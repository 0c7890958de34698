use disview_lang::Range;

use crate::entry::EntryId;
use crate::tree::NodePath;

/// A location in the source view, either a whole line or a full span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub start_line: u32,
    pub start_column: Option<usize>,
    pub end_line: Option<u32>,
    pub end_column: Option<usize>,
}

impl SourceSpan {
    pub fn line(line: u32) -> Self {
        Self {
            start_line: line,
            start_column: None,
            end_line: None,
            end_column: None,
        }
    }

    pub fn line_number(&self) -> u32 {
        self.start_line
    }

    pub fn line_number_only(&self) -> bool {
        self.start_column.is_none() && self.end_line.is_none() && self.end_column.is_none()
    }
}

impl From<Range> for SourceSpan {
    fn from(range: Range) -> Self {
        Self {
            start_line: range.start.line,
            start_column: Some(range.start.column),
            end_line: Some(range.end.line),
            end_column: Some(range.end.column),
        }
    }
}

/// Asks the source view to show and select a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightRequest {
    pub span: SourceSpan,
}

/// What is currently selected across the views.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightState {
    /// The highlighted disassembly entry and its position in the list.
    pub entry: Option<EntryId>,
    pub index: Option<usize>,
    /// The highlighted structure tree node.
    pub node: Option<NodePath>,
    pub span: Option<SourceSpan>,
}

impl HighlightState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
