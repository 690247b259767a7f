//! A single resource document and the file it came from

use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::codec::{Document, ObjectReference};
use crate::error::Result;

/// One decoded resource document of a chart
///
/// Several manifests share a `source` when a file holds multiple documents.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Path of the manifest file, relative to the chart's `manifests/` directory
    pub source: PathBuf,

    document: Document,
}

impl Manifest {
    pub fn new(source: impl Into<PathBuf>, document: Document) -> Self {
        Self {
            source: source.into(),
            document,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn reference(&self) -> &ObjectReference {
        self.document.reference()
    }

    #[inline]
    pub fn api_version(&self) -> &str {
        &self.reference().api_version
    }

    #[inline]
    pub fn kind(&self) -> &str {
        &self.reference().kind
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.reference().name
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Source path as a forward-slash string, suitable for annotations
    pub fn source_name(&self) -> String {
        self.source
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Decode the payload into a concrete resource type
    pub fn decode<K: DeserializeOwned>(&self) -> Result<K> {
        self.document.decode()
    }

    /// Copy of this manifest with extra annotations merged into its payload
    pub fn with_annotations(&self, annotations: &BTreeMap<String, String>) -> Result<Self> {
        Ok(Self {
            source: self.source.clone(),
            document: self.document.with_annotations(annotations)?,
        })
    }

    /// Value of one annotation in the payload, if set
    pub fn annotation(&self, key: &str) -> Result<Option<String>> {
        let value = self.document.to_value()?;
        Ok(value
            .pointer("/metadata/annotations")
            .and_then(|a| a.get(key))
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }
}

impl std::fmt::Display for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.reference(), self.source_name())
    }
}
