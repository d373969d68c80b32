use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde_json::Value as JsonValue;
use tracing::debug;
use walkdir::WalkDir;

use crate::constants::collections::DOCUMENT_EXTENSION;
use crate::data::RawDocument;
use crate::errors::PipelineError;
use crate::store::DocumentStore;

/// Directory-backed document store laid out like a JSON export.
///
/// Each collection path is a directory below `root` and each document is a
/// `<id>.json` file holding one JSON object. Nested collections are plain
/// subdirectories and are not part of their parent collection.
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, path: &str) -> Result<PathBuf, PipelineError> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(PipelineError::Configuration(format!(
                "collection path '{path}' must be relative without '..'"
            )));
        }
        Ok(self.root.join(relative))
    }

    fn read_document(collection: &str, id: &str, file: &Path) -> Result<RawDocument, PipelineError> {
        let raw = fs::read_to_string(file).map_err(|err| PipelineError::SourceUnavailable {
            collection: collection.to_string(),
            reason: format!("failed to read {}: {err}", file.display()),
        })?;
        let value: JsonValue =
            serde_json::from_str(&raw).map_err(|err| PipelineError::MalformedDocument {
                collection: collection.to_string(),
                id: id.to_string(),
                details: err.to_string(),
            })?;
        match value {
            JsonValue::Object(fields) => Ok(RawDocument::new(id, fields)),
            other => Err(PipelineError::MalformedDocument {
                collection: collection.to_string(),
                id: id.to_string(),
                details: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }
}

impl DocumentStore for FsDocumentStore {
    fn fetch_collection(&self, path: &str) -> Result<Vec<RawDocument>, PipelineError> {
        let dir = self.collection_dir(path)?;
        if !dir.is_dir() {
            return Err(PipelineError::SourceUnavailable {
                collection: path.to_string(),
                reason: format!("{} is not a directory", dir.display()),
            });
        }
        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|err| PipelineError::SourceUnavailable {
                collection: path.to_string(),
                reason: err.to_string(),
            })?;
            if entry.file_type().is_file() && is_document_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        let mut documents = Vec::with_capacity(files.len());
        for file in &files {
            let Some(id) = document_id(file) else {
                continue;
            };
            documents.push(Self::read_document(path, &id, file)?);
        }
        debug!(collection = path, documents = documents.len(), "collection read");
        Ok(documents)
    }

    fn fetch_document(&self, path: &str, id: &str) -> Result<Option<RawDocument>, PipelineError> {
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(PipelineError::Configuration(format!(
                "invalid document id '{id}'"
            )));
        }
        let file = self
            .collection_dir(path)?
            .join(format!("{id}.{DOCUMENT_EXTENSION}"));
        match fs::metadata(&file) {
            Ok(meta) if meta.is_file() => Self::read_document(path, id, &file).map(Some),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(PipelineError::Io(err)),
        }
    }
}

/// True if the path has a `.json` extension (case-insensitive).
pub fn is_document_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION))
        .unwrap_or(false)
}

fn document_id(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
