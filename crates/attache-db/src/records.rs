//! Record abstraction shared by all repository implementations.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use attache_core::RecordRef;

/// Column holding the serialized attachment for field `name`.
pub fn data_attribute(name: &str) -> String {
    format!("{}_data", name)
}

/// The slice of a host record the handoff protocol touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub record_ref: RecordRef,
    /// data attribute → serialized attachment JSON (`None` when the column is NULL)
    pub attributes: BTreeMap<String, Option<String>>,
}

impl Record {
    pub fn new(record_ref: RecordRef) -> Self {
        Self {
            record_ref,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>, value: Option<String>) -> Self {
        self.attributes.insert(attribute.into(), value);
        self
    }

    pub fn attribute(&self, attribute: &str) -> Option<&str> {
        self.attributes.get(attribute).and_then(|v| v.as_deref())
    }

    pub fn set_attribute(&mut self, attribute: impl Into<String>, value: String) {
        self.attributes.insert(attribute.into(), Some(value));
    }
}

/// Repository for host records.
///
/// Implementations must make `save` atomic for a single record. `save` is a
/// system-driven update: no validations run.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Load `record` with the given data attribute populated.
    async fn find(&self, record: &RecordRef, attribute: &str) -> Result<Option<Record>>;

    /// Write every attribute carried by `record` back to storage.
    async fn save(&self, record: &Record) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_attribute() {
        assert_eq!(data_attribute("avatar"), "avatar_data");
    }

    #[test]
    fn test_record_attributes() {
        let mut record = Record::new(RecordRef::new("User", "1"))
            .with_attribute("avatar_data", None);
        assert_eq!(record.attribute("avatar_data"), None);

        record.set_attribute("avatar_data", "{}".to_string());
        assert_eq!(record.attribute("avatar_data"), Some("{}"));
        assert_eq!(record.attribute("cover_data"), None);
    }
}
