use disview_lang::UnitId;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::entry::EntryId;
use crate::error::LookupError;

/// Maps entry ids to their position in a flattened disassembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitIndex {
    units: FxHashSet<UnitId>,
    entries: FxHashMap<EntryId, usize>,
}

impl UnitIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `unit` as present and returns the token entry ids are built from.
    pub fn register(&mut self, unit: UnitId) -> UnitId {
        self.units.insert(unit);
        unit
    }

    pub fn make_entry_id(&self, unit: UnitId, offset: Option<usize>) -> EntryId {
        EntryId { unit, offset }
    }

    pub(crate) fn insert(&mut self, id: EntryId, position: usize) {
        self.entries.insert(id, position);
    }

    pub fn resolve(&self, id: &EntryId) -> Result<usize, LookupError> {
        if !self.units.contains(&id.unit) {
            return Err(LookupError::UnitNotRegistered(id.unit));
        }

        self.entries
            .get(id)
            .copied()
            .ok_or(LookupError::EntryNotFound(*id))
    }

    pub fn contains_unit(&self, unit: UnitId) -> bool {
        self.units.contains(&unit)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let mut index = UnitIndex::new();
        let unit = index.register(UnitId::new(1));
        let id = index.make_entry_id(unit, Some(4));
        index.insert(id, 7);

        assert_eq!(index.resolve(&id), Ok(7));
        assert_eq!(
            index.resolve(&EntryId::instruction(unit, 6)),
            Err(LookupError::EntryNotFound(EntryId::instruction(unit, 6)))
        );
        assert_eq!(
            index.resolve(&EntryId::instruction(UnitId::new(9), 4)),
            Err(LookupError::UnitNotRegistered(UnitId::new(9)))
        );
        assert!(index.contains_unit(unit));
        assert_eq!(index.len(), 1);
    }
}
