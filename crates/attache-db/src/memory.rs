//! In-memory record repository, used by tests and the standalone server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use attache_core::RecordRef;

use crate::records::{Record, RecordRepository};

#[derive(Clone, Default)]
pub struct InMemoryRecordRepository {
    records: Arc<Mutex<HashMap<RecordRef, Record>>>,
    saves: Arc<Mutex<usize>>,
}

impl InMemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: Record) {
        self.records
            .lock()
            .expect("record store poisoned")
            .insert(record.record_ref.clone(), record);
    }

    pub fn get(&self, record: &RecordRef) -> Option<Record> {
        self.records
            .lock()
            .expect("record store poisoned")
            .get(record)
            .cloned()
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().expect("save counter poisoned")
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn find(&self, record: &RecordRef, attribute: &str) -> Result<Option<Record>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow!("record store poisoned"))?;
        Ok(records.get(record).map(|found| {
            let mut found = found.clone();
            found.attributes.entry(attribute.to_string()).or_insert(None);
            found
        }))
    }

    async fn save(&self, record: &Record) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("record store poisoned"))?;
        let stored = records
            .entry(record.record_ref.clone())
            .or_insert_with(|| Record::new(record.record_ref.clone()));
        for (attribute, value) in &record.attributes {
            stored.attributes.insert(attribute.clone(), value.clone());
        }
        drop(records);

        *self.saves.lock().map_err(|_| anyhow!("save counter poisoned"))? += 1;
        Ok(())
    }
}
