//! Callback reconciliation: write the processed result into the record.

use std::sync::Arc;

use attache_core::{CallbackResult, LambdaError, StoredAttachment};
use attache_db::RecordRepository;

use crate::attacher::Attacher;

#[derive(Clone)]
pub struct CallbackReconciler {
    repository: Arc<dyn RecordRepository>,
}

impl CallbackReconciler {
    pub fn new(repository: Arc<dyn RecordRepository>) -> Self {
        Self { repository }
    }

    /// Persist `result` as the attachment of an authenticated callback.
    ///
    /// Signing keys are stripped from every entry before anything is written.
    /// Failures are returned as-is; nothing is retried here.
    #[tracing::instrument(skip(self, attacher, result), fields(record = %attacher.record(), attachment = %attacher.name()))]
    pub async fn reconcile(
        &self,
        attacher: &mut Attacher,
        result: CallbackResult,
    ) -> Result<(), LambdaError> {
        let stored = result.into_stored();
        let entries = match &stored {
            StoredAttachment::Single(_) => 1,
            StoredAttachment::Versions(versions) => versions.len(),
        };

        attacher.finalize(stored)?;
        attacher.save(self.repository.as_ref()).await?;

        tracing::info!(entries, "Reconciled remote processing result");
        Ok(())
    }
}
