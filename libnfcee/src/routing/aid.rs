// libnfcee/src/routing/aid.rs

use std::collections::HashMap;

use crate::types::{Aid, EeHandle, PowerMask};
use crate::{Error, Result};

/// Host-side view of one installed AID entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AidEntry {
    pub handle: EeHandle,
    pub power: PowerMask,
    pub prefix: bool,
}

/// Mirror of the controller's AID routing table, used to track remaining
/// capacity. Re-adding an installed AID replaces it in place.
#[derive(Debug, Clone)]
pub struct AidTable {
    max: usize,
    entries: HashMap<Aid, AidEntry>,
}

impl AidTable {
    /// Empty mirror holding at most `max` entries.
    pub fn new(max: usize) -> Self {
        Self {
            max,
            entries: HashMap::new(),
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Free slots left.
    pub fn remaining(&self) -> usize {
        self.max.saturating_sub(self.entries.len())
    }

    pub fn contains(&self, aid: &Aid) -> bool {
        self.entries.contains_key(aid)
    }

    pub fn get(&self, aid: &Aid) -> Option<&AidEntry> {
        self.entries.get(aid)
    }

    /// Whether `aid` can be added without exceeding capacity.
    pub fn has_room_for(&self, aid: &Aid) -> bool {
        self.contains(aid) || self.entries.len() < self.max
    }

    /// Record an installed entry. Returns `true` when the AID is new.
    pub fn insert(&mut self, aid: Aid, entry: AidEntry) -> Result<bool> {
        if !self.has_room_for(&aid) {
            return Err(Error::AidTableFull);
        }
        Ok(self.entries.insert(aid, entry).is_none())
    }

    /// Forget `aid`, returning its entry if it was installed.
    pub fn remove(&mut self, aid: &Aid) -> Option<AidEntry> {
        self.entries.remove(aid)
    }

    /// Drop every entry; capacity is back to `max`.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Aid, &AidEntry)> {
        self.entries.iter()
    }
}
