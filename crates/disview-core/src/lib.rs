//! `disview-core` turns source text into the views shown by `disview` and keeps
//! them in step.
//!
//! - [`flatten`] lays a compiled program out as one list of [`FlatEntry`]s,
//!   addressable by [`EntryId`].
//! - [`tree::build`] mirrors a syntax tree as a navigable [`TreeNode`].
//! - [`Controller`] owns the text, recomputes both views on every change and
//!   propagates highlights between them.
//!
//! ## Examples
//!
//! ```rust
//! use disview_core::{Controller, FlatEntry};
//!
//! let mut controller = Controller::default();
//! controller.on_text_changed("def f():\n  return 1");
//!
//! let disassembly = controller.disassembly().output().unwrap();
//! assert!(disassembly
//!     .entries()
//!     .iter()
//!     .any(|entry| matches!(entry, FlatEntry::UnitBoundary { name, .. } if name == "f")));
//!
//! controller.on_text_changed("def f(:");
//! assert!(controller.disassembly().is_error());
//! assert!(controller.disassembly().output().is_some());
//! ```
mod controller;
mod counts;
mod entry;
mod error;
mod flatten;
mod frontend;
mod highlight;
mod index;
mod notice;
pub mod tree;
mod view;

pub use controller::{Controller, SourceSelection};
pub use counts::opcode_counts;
pub use entry::{EntryId, FlatEntry};
pub use error::LookupError;
pub use flatten::{Disassembly, FlattenOptions, flatten};
pub use frontend::{Frontend, LangFrontend, StructuralError};
pub use highlight::{HighlightRequest, HighlightState, SourceSpan};
pub use index::UnitIndex;
pub use notice::{Notice, Severity};
pub use tree::{NodePath, TreeNode, TreeNodeKind};
pub use view::{DerivedView, ViewState};
