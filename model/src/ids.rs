//! Process-wide identity for stations and display texts. Both indexes are
//! created fresh per import and thrown away with the container.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::ImportError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StationId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextId(pub usize);

/// Maps `(line name, station name)` to a stable id. Stations referenced
/// before their line is imported (transfers, additional nodes) get a pending
/// id that must be reconciled by a later `register_station` for the same key;
/// anything still pending when the transports are done is a broken map.
pub struct StationIndex {
    registered: BTreeMap<(String, String), StationId>,
    pending: BTreeMap<(String, String), StationId>,
    id_counter: usize,
}

impl StationIndex {
    pub fn new() -> Self {
        Self {
            registered: BTreeMap::new(),
            pending: BTreeMap::new(),
            id_counter: 0,
        }
    }

    pub fn register_station(&mut self, line_name: &str, station_name: &str) -> Result<StationId> {
        let key = (line_name.to_string(), station_name.to_string());
        if self.registered.contains_key(&key) {
            bail!(
                "Station {} on line {} already registered",
                station_name,
                line_name
            );
        }
        let id = match self.pending.remove(&key) {
            Some(id) => id,
            None => StationId(self.id_counter),
        };
        self.registered.insert(key, id);
        // The counter advances even when a pending id is consumed; ids are
        // stable but not dense.
        self.id_counter += 1;
        Ok(id)
    }

    pub fn get_station_id(&mut self, line_name: &str, station_name: &str) -> StationId {
        let key = (line_name.to_string(), station_name.to_string());
        if let Some(id) = self.registered.get(&key) {
            return *id;
        }
        if let Some(id) = self.pending.get(&key) {
            return *id;
        }
        let id = StationId(self.id_counter);
        self.pending.insert(key, id);
        self.id_counter += 1;
        id
    }

    pub fn find_station_id(&self, line_name: &str, station_name: &str) -> Option<StationId> {
        let key = (line_name.to_string(), station_name.to_string());
        self.registered
            .get(&key)
            .or_else(|| self.pending.get(&key))
            .copied()
    }

    pub fn ensure_no_pending_stations(&self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let left: Vec<String> = self
            .pending
            .keys()
            .map(|(line, station)| format!("{} at {}", station, line))
            .collect();
        Err(ImportError::PendingStations(left.join(", ")).into())
    }
}

/// Interns display strings once, handing out monotonic ids starting high
/// enough to never collide with station ids in serialized output. Texts
/// flagged "common" are language-independent (URLs, type tags) and skip any
/// localization downstream.
pub struct TextIndexTable {
    ids: BTreeMap<String, TextId>,
    texts: Vec<(TextId, String, bool)>,
    counter: usize,
}

impl TextIndexTable {
    pub fn new() -> Self {
        Self {
            ids: BTreeMap::new(),
            texts: Vec::new(),
            counter: 100_000,
        }
    }

    pub fn as_text_id(&mut self, text: &str) -> TextId {
        self.intern(text, false)
    }

    pub fn as_common_text_id(&mut self, text: &str) -> TextId {
        self.intern(text, true)
    }

    fn intern(&mut self, text: &str, common: bool) -> TextId {
        if let Some(id) = self.ids.get(text) {
            return *id;
        }
        let id = TextId(self.counter);
        self.counter += 1;
        self.ids.insert(text.to_string(), id);
        self.texts.push((id, text.to_string(), common));
        id
    }

    // TODO Keep an id -> index map if text tables ever get big
    pub fn get_text(&self, id: TextId) -> Option<&str> {
        self.texts
            .iter()
            .find(|(i, _, _)| *i == id)
            .map(|(_, text, _)| text.as_str())
    }

    /// All interned texts in id order.
    pub fn entries(&self) -> &[(TextId, String, bool)] {
        &self.texts
    }

    pub fn text_count(&self) -> usize {
        self.texts.len()
    }

    pub fn total_text_length(&self) -> usize {
        self.texts.iter().map(|(_, text, _)| text.chars().count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_reconciles_to_same_id() {
        let mut index = StationIndex::new();
        let pending = index.get_station_id("Red", "Alpha");
        let registered = index.register_station("Red", "Alpha").unwrap();
        assert_eq!(pending, registered);
        assert_eq!(index.find_station_id("Red", "Alpha"), Some(pending));
        assert!(index.ensure_no_pending_stations().is_ok());
    }

    #[test]
    fn leftover_pending_is_an_error() {
        let mut index = StationIndex::new();
        index.get_station_id("Red", "Ghost");
        let err = index.ensure_no_pending_stations().unwrap_err();
        assert!(err.to_string().contains("Ghost at Red"));
    }

    #[test]
    fn same_name_different_lines_are_distinct() {
        let mut index = StationIndex::new();
        let a = index.register_station("Red", "Center").unwrap();
        let b = index.register_station("Blue", "Center").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn double_registration_fails() {
        let mut index = StationIndex::new();
        index.register_station("Red", "Alpha").unwrap();
        assert!(index.register_station("Red", "Alpha").is_err());
    }

    #[test]
    fn texts_intern_once() {
        let mut texts = TextIndexTable::new();
        let a = texts.as_text_id("Red line");
        let b = texts.as_text_id("Red line");
        assert_eq!(a, b);
        assert_eq!(texts.get_text(a), Some("Red line"));
        assert_eq!(texts.text_count(), 1);
    }
}
