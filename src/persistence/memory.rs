// ABOUTME: In-memory document store for tests and the CLI demo
// ABOUTME: Applies merge batches atomically and supports commit failure and latency injection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{Document, DocumentPath, DocumentStore, WriteBatch};
use async_trait::async_trait;
use insite_core::errors::{AppError, AppResult};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

type Collections = BTreeMap<String, BTreeMap<String, Document>>;

/// Document store held in process memory.
///
/// Cloning shares the underlying data, so a test can keep a handle while the
/// sync pipeline owns another.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
    failing_commits: Arc<AtomicUsize>,
    commit_latency: Arc<RwLock<Option<Duration>>>,
    commits: Arc<AtomicUsize>,
}

impl InMemoryDocumentStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` commits
    pub fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Delay every commit by `latency`
    pub async fn set_commit_latency(&self, latency: Option<Duration>) {
        *self.commit_latency.write().await = latency;
    }

    /// Commits applied so far
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Documents stored in `collection`
    pub async fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Documents stored across every collection
    pub async fn total_documents(&self) -> usize {
        self.collections
            .read()
            .await
            .values()
            .map(BTreeMap::len)
            .sum()
    }

    /// Collection paths holding at least one document
    pub async fn collection_names(&self) -> Vec<String> {
        self.collections.read().await.keys().cloned().collect()
    }

    /// Whole store as `{collection: {document_id: body}}`
    pub async fn export_json(&self) -> Value {
        let collections = self.collections.read().await;
        let exported: Map<String, Value> = collections
            .iter()
            .map(|(name, documents)| {
                let body: Map<String, Value> = documents
                    .iter()
                    .map(|(id, document)| (id.clone(), Value::Object(document.clone())))
                    .collect();
                (name.clone(), Value::Object(body))
            })
            .collect();
        Value::Object(exported)
    }

    fn take_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn commit(&self, batch: WriteBatch) -> AppResult<()> {
        let latency = *self.commit_latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.take_failure() {
            warn!(operations = batch.len(), "injected commit failure");
            return Err(AppError::storage("commit rejected by store"));
        }

        let operations = batch.len();
        let mut collections = self.collections.write().await;
        for (path, fields) in batch.into_operations() {
            let document = collections
                .entry(path.collection)
                .or_default()
                .entry(path.document_id)
                .or_default();
            for (key, value) in fields {
                document.insert(key, value);
            }
        }
        drop(collections);

        self.commits.fetch_add(1, Ordering::SeqCst);
        debug!(operations, "batch committed");
        Ok(())
    }

    async fn get(&self, path: &DocumentPath) -> AppResult<Option<Document>> {
        Ok(self
            .collections
            .read()
            .await
            .get(&path.collection)
            .and_then(|documents| documents.get(&path.document_id))
            .cloned())
    }

    async fn list(&self, collection: &str) -> AppResult<Vec<(String, Document)>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, document)| (id.clone(), document.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => Document::new(),
        }
    }

    #[tokio::test]
    async fn test_merge_keeps_untouched_fields() {
        let store = InMemoryDocumentStore::new();
        let path = DocumentPath::new("accounts/a/heart_rate/hourly/items", "hr-1");

        let mut first = WriteBatch::new();
        first.merge(path.clone(), fields(json!({"heartRate": 60.0, "hourUtc": "x"})));
        store.commit(first).await.unwrap();

        let mut second = WriteBatch::new();
        second.merge(path.clone(), fields(json!({"heartRate": 72.0})));
        store.commit(second).await.unwrap();

        let stored = store.get(&path).await.unwrap().unwrap();
        assert_eq!(stored["heartRate"], json!(72.0));
        assert_eq!(stored["hourUtc"], json!("x"));
        assert_eq!(store.total_documents().await, 1);
    }

    #[tokio::test]
    async fn test_failed_commit_applies_nothing() {
        let store = InMemoryDocumentStore::new();
        store.fail_next_commits(1);

        let mut batch = WriteBatch::new();
        batch.merge(DocumentPath::new("c", "1"), fields(json!({"v": 1})));
        batch.merge(DocumentPath::new("c", "2"), fields(json!({"v": 2})));
        assert!(store.commit(batch.clone()).await.is_err());
        assert_eq!(store.document_count("c").await, 0);

        store.commit(batch).await.unwrap();
        assert_eq!(store.document_count("c").await, 2);
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_export_nests_collections() {
        let store = InMemoryDocumentStore::new();
        let mut batch = WriteBatch::new();
        batch.merge(DocumentPath::new("c", "doc"), fields(json!({"v": 1})));
        store.commit(batch).await.unwrap();
        assert_eq!(store.export_json().await, json!({"c": {"doc": {"v": 1}}}));
    }
}
