use crate::position::PositionRecord;

/// Append-only list of committed position records, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLog {
    entries: Vec<PositionRecord>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `PositionRecord` can only be built from a well-formed record, so
    /// anything that reaches this point is safe to keep.
    pub fn append(&mut self, record: PositionRecord) {
        self.entries.push(record);
    }

    pub fn get(&self, index: usize) -> Option<&PositionRecord> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PositionRecord> {
        self.entries.iter()
    }

    /// Used by session reset; nothing else shrinks the log.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
