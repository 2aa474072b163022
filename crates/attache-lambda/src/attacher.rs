//! Attacher: mediates between a host record and one of its attachment fields.

use attache_core::{
    AttachmentState, CallbackContext, LambdaError, RecordRef, StoredAttachment, UploadedFile,
};
use attache_db::{data_attribute, Record, RecordRepository};
use attache_storage::CACHE;

#[derive(Debug, Clone)]
pub struct Attacher {
    record: RecordRef,
    name: String,
    file: Option<StoredAttachment>,
    // Signing key as last read from or written to the repository
    persisted_key: Option<String>,
}

impl Attacher {
    /// Reload the record referenced by `context` and decode its attachment field.
    #[tracing::instrument(skip(repository, context), fields(record = %context.record, attachment = %context.name))]
    pub async fn load(
        repository: &dyn RecordRepository,
        context: &CallbackContext,
    ) -> Result<Self, LambdaError> {
        let attribute = data_attribute(&context.name);
        let record = repository
            .find(&context.record, &attribute)
            .await?
            .ok_or_else(|| LambdaError::RecordNotFound {
                record_type: context.record.record_type.clone(),
                record_id: context.record.record_id.clone(),
            })?;

        let file = record
            .attribute(&attribute)
            .map(StoredAttachment::from_json)
            .transpose()?;
        let persisted_key = file
            .as_ref()
            .and_then(StoredAttachment::signing_key)
            .map(str::to_string);

        Ok(Self {
            record: context.record.clone(),
            name: context.name.clone(),
            file,
            persisted_key,
        })
    }

    pub fn record(&self) -> &RecordRef {
        &self.record
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_attribute(&self) -> String {
        data_attribute(&self.name)
    }

    pub fn file(&self) -> Option<&StoredAttachment> {
        self.file.as_ref()
    }

    /// `None` when the field holds no attachment.
    pub fn state(&self) -> Option<AttachmentState> {
        self.file.as_ref().map(|file| file.state(CACHE))
    }

    /// The signing key the repository currently holds for this field.
    pub fn persisted_signing_key(&self) -> Option<&str> {
        self.persisted_key.as_deref()
    }

    /// Make `file` (a cached file, usually tagged with a signing key) the current file.
    pub fn set_cached(&mut self, file: UploadedFile) {
        self.file = Some(StoredAttachment::Single(file));
    }

    pub fn set_file(&mut self, file: Option<StoredAttachment>) {
        self.file = file;
    }

    /// Replace the in-flight cached file with the processed result.
    pub fn finalize(&mut self, stored: StoredAttachment) -> Result<(), LambdaError> {
        if self.state() != Some(AttachmentState::Processing) {
            return Err(LambdaError::InvalidCallback(format!(
                "{} {} is not awaiting processing",
                self.record, self.name
            )));
        }
        self.file = Some(stored);
        Ok(())
    }

    /// Write the current file into the record's data attribute, bypassing validations.
    #[tracing::instrument(skip(self, repository), fields(record = %self.record, attachment = %self.name))]
    pub async fn save(&mut self, repository: &dyn RecordRepository) -> Result<(), LambdaError> {
        let data = self
            .file
            .as_ref()
            .map(StoredAttachment::to_json)
            .transpose()?;
        let record = Record::new(self.record.clone()).with_attribute(self.data_attribute(), data);

        repository.save(&record).await?;
        self.persisted_key = self
            .file
            .as_ref()
            .and_then(StoredAttachment::signing_key)
            .map(str::to_string);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attache_db::InMemoryRecordRepository;

    fn context() -> CallbackContext {
        CallbackContext::new(RecordRef::new("User", "1"), "avatar")
    }

    fn repository_with(data: Option<String>) -> InMemoryRecordRepository {
        let repo = InMemoryRecordRepository::new();
        repo.insert(
            Record::new(RecordRef::new("User", "1")).with_attribute("avatar_data", data),
        );
        repo
    }

    #[tokio::test]
    async fn test_load_missing_record() {
        let repo = InMemoryRecordRepository::new();
        let err = Attacher::load(&repo, &context()).await.unwrap_err();
        assert!(matches!(
            err,
            LambdaError::RecordNotFound { ref record_type, ref record_id }
                if record_type == "User" && record_id == "1"
        ));
    }

    #[tokio::test]
    async fn test_load_empty_field() {
        let repo = repository_with(None);
        let attacher = Attacher::load(&repo, &context()).await.unwrap();
        assert!(attacher.file().is_none());
        assert_eq!(attacher.state(), None);
        assert_eq!(attacher.persisted_signing_key(), None);
    }

    #[tokio::test]
    async fn test_save_and_reload_cached_file() {
        let repo = repository_with(None);
        let mut attacher = Attacher::load(&repo, &context()).await.unwrap();

        let mut cached = UploadedFile::new("abc.jpg", CACHE);
        attacher.set_cached(cached.clone());
        assert_eq!(attacher.state(), Some(AttachmentState::Uploaded));

        cached.set_signing_key("secret".to_string());
        attacher.set_cached(cached);
        assert_eq!(attacher.persisted_signing_key(), None);

        attacher.save(&repo).await.unwrap();
        assert_eq!(attacher.persisted_signing_key(), Some("secret"));

        let reloaded = Attacher::load(&repo, &context()).await.unwrap();
        assert_eq!(reloaded.state(), Some(AttachmentState::Processing));
        assert_eq!(reloaded.persisted_signing_key(), Some("secret"));
    }

    #[tokio::test]
    async fn test_finalize_requires_processing_state() {
        let repo = repository_with(Some(r#"{"id":"abc.jpg","storage":"cache"}"#.to_string()));
        let mut attacher = Attacher::load(&repo, &context()).await.unwrap();

        let err = attacher
            .finalize(StoredAttachment::Single(UploadedFile::new("abc.jpg", "store")))
            .unwrap_err();
        assert!(matches!(err, LambdaError::InvalidCallback(_)));
    }

    #[tokio::test]
    async fn test_load_rejects_corrupt_data() {
        let repo = repository_with(Some("not json".to_string()));
        let err = Attacher::load(&repo, &context()).await.unwrap_err();
        assert!(matches!(err, LambdaError::Serialization(_)));
    }
}
