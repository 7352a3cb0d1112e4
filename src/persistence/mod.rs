// ABOUTME: Document store abstraction for the remote system of record
// ABOUTME: Hierarchical paths, merge-upsert write batches, and pluggable store backends
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// In-memory document store implementation
pub mod memory;
/// Per-stream document mapping
pub mod records;
/// Idempotent batched uploader
pub mod uploader;

use async_trait::async_trait;
use insite_core::constants::storage::{ACCOUNTS_COLLECTION, ITEMS_COLLECTION};
use insite_core::errors::AppResult;
use serde_json::{Map, Value};
use std::fmt;

pub use memory::InMemoryDocumentStore;
pub use records::{Cadence, RecordKind, StreamRecord};
pub use uploader::{StreamUploader, UploadSummary};

/// Body of a stored document
pub type Document = Map<String, Value>;

/// Location of one document: `{collection}/{document_id}`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath {
    /// Slash-separated collection path
    pub collection: String,
    /// Document identifier within the collection
    pub document_id: String,
}

impl DocumentPath {
    /// Path of `document_id` inside `collection`
    #[must_use]
    pub fn new(collection: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            document_id: document_id.into(),
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.document_id)
    }
}

/// `accounts/{account}/{kind}/{subpath}/items`
#[must_use]
pub fn items_collection(account_id: &str, kind: &str, subpath: &str) -> String {
    format!("{ACCOUNTS_COLLECTION}/{account_id}/{kind}/{subpath}/{ITEMS_COLLECTION}")
}

/// `accounts/{account}/{collection}`
#[must_use]
pub fn account_collection(account_id: &str, collection: &str) -> String {
    format!("{ACCOUNTS_COLLECTION}/{account_id}/{collection}")
}

/// Merge-upserts committed together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    operations: Vec<(DocumentPath, Document)>,
}

impl WriteBatch {
    /// Empty batch
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty batch with room for `capacity` operations
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            operations: Vec::with_capacity(capacity),
        }
    }

    /// Merge `fields` into the document at `path`, creating it if absent
    pub fn merge(&mut self, path: DocumentPath, fields: Document) {
        self.operations.push((path, fields));
    }

    /// Number of operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the batch holds no operations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations in insertion order
    pub fn operations(&self) -> impl Iterator<Item = &(DocumentPath, Document)> {
        self.operations.iter()
    }

    /// Consume the batch
    #[must_use]
    pub fn into_operations(self) -> Vec<(DocumentPath, Document)> {
        self.operations
    }
}

/// Hierarchical document store with atomic batched merge writes
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Apply every operation in `batch`, or none of them
    ///
    /// Later operations on the same path merge over earlier ones.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the commit is rejected; nothing is applied.
    async fn commit(&self, batch: WriteBatch) -> AppResult<()>;

    /// Read one document
    ///
    /// # Errors
    ///
    /// Returns a storage error when the backend cannot be read.
    async fn get(&self, path: &DocumentPath) -> AppResult<Option<Document>>;

    /// Every document in `collection` as `(document_id, body)`, ordered by ID
    ///
    /// # Errors
    ///
    /// Returns a storage error when the backend cannot be read.
    async fn list(&self, collection: &str) -> AppResult<Vec<(String, Document)>>;
}
