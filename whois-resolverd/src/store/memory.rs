use std::collections::HashMap;
use shared::types::ResolvedRecord;

/// Resolved records keyed by result id. Lives in process memory only.
#[derive(Debug, Default)]
pub struct ResultStore {
    records: HashMap<String, ResolvedRecord>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite
    pub fn put(&mut self, id: String, record: ResolvedRecord) {
        self.records.insert(id, record);
    }

    pub fn get(&self, id: &str) -> Option<ResolvedRecord> {
        self.records.get(id).cloned()
    }

    /// Remove a record; absent ids are not an error
    pub fn delete(&mut self, id: &str) {
        self.records.remove(id);
    }

    /// Fetch and remove in one step
    pub fn take(&mut self, id: &str) -> Option<ResolvedRecord> {
        self.records.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
