//! Terminal UI for `disview`.
//!
//! Three panes show the source being edited, its flattened disassembly and its
//! syntax tree. Moving through any of them highlights the matching parts of the
//! others.
mod app;
mod event;
mod ui;
mod util;

pub use app::{App, Focus, Mode, PaneLayout, Settings};
pub use event::AppEvent;
pub use ui::treeview::{TreeItem, TreeView};
