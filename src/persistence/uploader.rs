// ABOUTME: Idempotent batched uploader writing stream records to the document store
// ABOUTME: Chunks records into bounded batches, commits each atomically, and logs failed batches
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::records::StreamRecord;
use super::{items_collection, DocumentPath, DocumentStore, WriteBatch};
use insite_core::constants::storage::{DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Outcome of one `upsert` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    /// Documents in successfully committed batches
    pub documents: usize,
    /// Batches committed
    pub batches_committed: usize,
    /// Batches rejected or timed out
    pub batches_failed: usize,
}

impl UploadSummary {
    /// Whether every batch landed
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.batches_failed == 0
    }

    /// Fold another summary into this one
    pub fn absorb(&mut self, other: Self) {
        self.documents += other.documents;
        self.batches_committed += other.batches_committed;
        self.batches_failed += other.batches_failed;
    }
}

/// Writes stream records to `accounts/{account}/{kind}/{subpath}/items/{id}`.
///
/// Each record becomes a merge-upsert keyed by its stable document ID, so a
/// repeated upload of the same bucket overwrites the earlier values. Failed
/// batches are logged and skipped; the next sync pass rewrites them.
#[derive(Clone)]
pub struct StreamUploader {
    store: Arc<dyn DocumentStore>,
    account_id: String,
    batch_size: usize,
    commit_timeout: Duration,
}

impl StreamUploader {
    /// Uploader with the default batch size and a 30 second commit deadline
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, account_id: impl Into<String>) -> Self {
        Self {
            store,
            account_id: account_id.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            commit_timeout: Duration::from_secs(30),
        }
    }

    /// Override the batch size, clamped to `1..=500`
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Override the per-commit deadline
    #[must_use]
    pub const fn with_commit_timeout(mut self, commit_timeout: Duration) -> Self {
        self.commit_timeout = commit_timeout;
        self
    }

    /// Account namespace
    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Maximum operations per batch
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Underlying store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Collection a record type is written to
    #[must_use]
    pub fn collection_for<R: StreamRecord>(&self) -> String {
        items_collection(&self.account_id, R::KIND.as_str(), R::subpath())
    }

    /// Merge-upsert `records` in batches of at most `batch_size`
    pub async fn upsert<R: StreamRecord + Sync>(&self, records: &[R]) -> UploadSummary {
        let collection = self.collection_for::<R>();
        let mut summary = UploadSummary::default();
        if records.is_empty() {
            debug!(upload.kind = %collection, "nothing to upload");
            return summary;
        }

        for (index, chunk) in records.chunks(self.batch_size).enumerate() {
            let mut batch = WriteBatch::with_capacity(chunk.len());
            for record in chunk {
                batch.merge(
                    DocumentPath::new(collection.clone(), record.document_id()),
                    record.payload(),
                );
            }
            let operations = batch.len();

            match tokio::time::timeout(self.commit_timeout, self.store.commit(batch)).await {
                Ok(Ok(())) => {
                    summary.documents += operations;
                    summary.batches_committed += 1;
                    debug!(upload.kind = %collection, upload.batch = index, operations, "batch committed");
                }
                Ok(Err(e)) => {
                    summary.batches_failed += 1;
                    error!(
                        upload.kind = %collection,
                        upload.batch = index,
                        operations,
                        error = %e,
                        "batch commit failed"
                    );
                }
                Err(_) => {
                    summary.batches_failed += 1;
                    error!(
                        upload.kind = %collection,
                        upload.batch = index,
                        operations,
                        timeout_secs = self.commit_timeout.as_secs(),
                        "batch commit timed out"
                    );
                }
            }
        }

        info!(
            upload.kind = %collection,
            upload.documents = summary.documents,
            upload.batches = summary.batches_committed,
            upload.failed = summary.batches_failed,
            store = self.store.name(),
            "upload finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryDocumentStore;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use insite_core::models::HourlyHeartRate;

    fn hours(count: usize) -> Vec<HourlyHeartRate> {
        let base = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        (0..count)
            .map(|index| HourlyHeartRate {
                hour: base + ChronoDuration::hours(index as i64),
                heart_rate: 60.0 + index as f64,
                therapy_profile_id: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_chunks_into_bounded_batches() {
        let memory = InMemoryDocumentStore::new();
        let uploader = StreamUploader::new(Arc::new(memory.clone()), "acct").with_batch_size(4);

        let summary = uploader.upsert(&hours(10)).await;
        assert_eq!(summary.batches_committed, 3);
        assert_eq!(summary.documents, 10);
        assert_eq!(memory.commit_count(), 3);
        assert_eq!(
            memory
                .document_count("accounts/acct/heart_rate/hourly/items")
                .await,
            10
        );
    }

    #[test]
    fn test_batch_size_is_clamped() {
        let uploader = StreamUploader::new(Arc::new(InMemoryDocumentStore::new()), "acct");
        assert_eq!(uploader.batch_size(), 450);
        assert_eq!(uploader.clone().with_batch_size(0).batch_size(), 1);
        assert_eq!(uploader.with_batch_size(10_000).batch_size(), 500);
    }
}
