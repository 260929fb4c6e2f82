//! Queue of shared state changes waiting to be flushed

use crate::domain::repositories::{PersistedRecord, PersistenceKey};
use std::collections::BTreeMap;

/// Records deduplicated by key; the newest record for a key wins
#[derive(Debug, Clone, Default)]
pub struct PersistenceQueue {
    pending: BTreeMap<PersistenceKey, PersistedRecord>,
}

impl PersistenceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the record for its key
    pub fn enqueue(&mut self, record: PersistedRecord) {
        log::trace!(target: "eventweave::persistence", "queued {:?}", record.key());
        self.pending.insert(record.key(), record);
    }

    /// Put back records of a failed flush without overwriting newer ones
    pub fn requeue(&mut self, records: Vec<PersistedRecord>) {
        for record in records {
            self.pending.entry(record.key()).or_insert(record);
        }
    }

    pub fn drain(&mut self) -> Vec<PersistedRecord> {
        std::mem::take(&mut self.pending).into_values().collect()
    }

    pub fn contains(&self, key: &PersistenceKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn get(&self, key: &PersistenceKey) -> Option<&PersistedRecord> {
        self.pending.get(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{VariableId, VariableValue};

    fn server(id: VariableId, value: i64) -> PersistedRecord {
        PersistedRecord::ServerVariable {
            id,
            value: VariableValue::Integer(value),
        }
    }

    #[test]
    fn enqueue_deduplicates_by_key() {
        let id = VariableId::new();
        let mut queue = PersistenceQueue::new();
        queue.enqueue(server(id, 1));
        queue.enqueue(server(id, 2));

        assert_eq!(queue.len(), 1);
        assert_eq!(
            queue.get(&PersistenceKey::ServerVariable(id)),
            Some(&server(id, 2))
        );
    }

    #[test]
    fn requeue_keeps_newer_records() {
        let id = VariableId::new();
        let mut queue = PersistenceQueue::new();
        queue.enqueue(server(id, 1));
        let failed = queue.drain();
        queue.enqueue(server(id, 5));
        queue.requeue(failed);

        assert_eq!(queue.drain(), vec![server(id, 5)]);
    }
}
