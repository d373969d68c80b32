//! Document store interfaces.
//!
//! Ownership model:
//! - `DocumentStore` is the pipeline-facing client. It is constructed once by
//!   the embedder and passed by reference into every pipeline call.
//! - `InMemoryStore` holds collections in memory for tests and small datasets.
//! - `FsDocumentStore` (in `transport::fs`) reads a JSON export from disk.
//! - `CachedStore` (in `cache`) memoizes any store for a fixed lifetime.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::data::RawDocument;
use crate::errors::PipelineError;
use crate::types::CollectionPath;

/// Pipeline-facing document store client.
///
/// Each call is atomic per collection: it either returns the full current
/// content or an error, never a partial result.
pub trait DocumentStore: Send + Sync {
    /// Fetch every document currently in the collection at `path`.
    fn fetch_collection(&self, path: &str) -> Result<Vec<RawDocument>, PipelineError>;

    /// Fetch one document by id; `Ok(None)` when it does not exist.
    fn fetch_document(&self, path: &str, id: &str) -> Result<Option<RawDocument>, PipelineError>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    fn fetch_collection(&self, path: &str) -> Result<Vec<RawDocument>, PipelineError> {
        (**self).fetch_collection(path)
    }

    fn fetch_document(&self, path: &str, id: &str) -> Result<Option<RawDocument>, PipelineError> {
        (**self).fetch_document(path, id)
    }
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn fetch_collection(&self, path: &str) -> Result<Vec<RawDocument>, PipelineError> {
        (**self).fetch_collection(path)
    }

    fn fetch_document(&self, path: &str, id: &str) -> Result<Option<RawDocument>, PipelineError> {
        (**self).fetch_document(path, id)
    }
}

/// In-memory document store for tests and small datasets.
///
/// Unknown collections read as empty, matching a document store where a
/// collection exists once it holds a document.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    collections: IndexMap<CollectionPath, Vec<RawDocument>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add documents to the collection at `path`, creating it when needed.
    pub fn with_collection<I>(mut self, path: impl Into<CollectionPath>, documents: I) -> Self
    where
        I: IntoIterator<Item = RawDocument>,
    {
        self.insert(path, documents);
        self
    }

    pub fn insert<I>(&mut self, path: impl Into<CollectionPath>, documents: I)
    where
        I: IntoIterator<Item = RawDocument>,
    {
        self.collections
            .entry(path.into())
            .or_default()
            .extend(documents);
    }
}

impl DocumentStore for InMemoryStore {
    fn fetch_collection(&self, path: &str) -> Result<Vec<RawDocument>, PipelineError> {
        Ok(self.collections.get(path).cloned().unwrap_or_default())
    }

    fn fetch_document(&self, path: &str, id: &str) -> Result<Option<RawDocument>, PipelineError> {
        Ok(self
            .collections
            .get(path)
            .and_then(|documents| documents.iter().find(|doc| doc.id == id))
            .cloned())
    }
}
