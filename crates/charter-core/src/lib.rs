//! Charter Core - core types for the Kubernetes chart manager
//!
//! This crate provides the foundational types used throughout Charter:
//! - `Chartfile`: chart metadata loaded from `Chart.yaml`
//! - `codec`: splitting YAML/JSON streams into discrete documents
//! - `Manifest`: one decoded resource document and where it came from
//! - `Chart`: a chart directory composed into kind-classified buckets
//! - `version`: lenient semver parsing and constraint matching

pub mod chart;
pub mod chartfile;
pub mod codec;
pub mod error;
pub mod manifest;
pub mod version;

pub use chart::{
    Chart, ChartWarning, DecodePolicy, KindBuckets, KindRegistry, MANIFESTS_DIR, ORIGIN_FILE_ANNOTATION,
};
pub use chartfile::{Chartfile, Dependency, Origin, CHARTFILE_NAME};
pub use codec::{Decoder, Document, Encoding, ObjectReference, YamlDocuments, encode_yaml_stream};
pub use error::{CoreError, Result};
pub use manifest::Manifest;
pub use version::{Constraint, parse_version};
