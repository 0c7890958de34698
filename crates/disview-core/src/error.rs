use disview_lang::UnitId;
use thiserror::Error;

use crate::entry::EntryId;

/// A jump target or restored highlight that is not part of the current disassembly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Unable to find that jump location")]
    EntryNotFound(EntryId),
    #[error("Unable to find that jump location")]
    UnitNotRegistered(UnitId),
}
