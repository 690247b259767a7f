//! Chart loading and kind classification
//!
//! A chart directory holds a `Chart.yaml` and an optional `manifests/` tree.
//! Loading decodes every `.yaml`/`.yml` file under `manifests/`, keeps the raw
//! [`Manifest`] list, and sorts core `v1` resources into typed buckets via a
//! [`KindRegistry`].

use indexmap::IndexMap;
use k8s_openapi::api::core::v1::{
    Namespace, PersistentVolume, Pod, ReplicationController, Secret, Service, ServiceAccount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::{Metadata, Resource};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::chartfile::{CHARTFILE_NAME, Chartfile};
use crate::codec::{Decoder, Encoding};
use crate::error::{CoreError, Result};
use crate::manifest::Manifest;

/// Annotation recording which manifest file produced a resource
pub const ORIGIN_FILE_ANNOTATION: &str = "charter.sh/origin-file";

/// Name of the manifest directory inside a chart
pub const MANIFESTS_DIR: &str = "manifests";

/// The only API version sorted into typed buckets
const CLASSIFIED_VERSION: &str = "v1";

/// What to do with a manifest document that fails to decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Abort the load on the first malformed document
    #[default]
    Strict,
    /// Record a warning and keep walking
    SkipInvalid,
}

/// Non-fatal findings from loading a chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartWarning {
    /// Declared apiVersion is not `v1`; the manifest is left out of the buckets
    UnsupportedVersion {
        source: PathBuf,
        kind: String,
        api_version: String,
    },
    /// `v1` kind with no registered bucket; kept in [`KindBuckets::unknown`]
    UnknownKind { source: PathBuf, kind: String },
    /// A document that could not be decoded (only under [`DecodePolicy::SkipInvalid`])
    InvalidDocument { source: PathBuf, message: String },
}

impl std::fmt::Display for ChartWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartWarning::UnsupportedVersion {
                source,
                kind,
                api_version,
            } => write!(
                f,
                "{}: {} has unsupported apiVersion '{}'",
                source.display(),
                kind,
                api_version
            ),
            ChartWarning::UnknownKind { source, kind } => {
                write!(f, "{}: unknown kind '{}'", source.display(), kind)
            }
            ChartWarning::InvalidDocument { source, message } => {
                write!(f, "{}: {}", source.display(), message)
            }
        }
    }
}

/// Typed per-kind resource lists, in file discovery order
#[derive(Debug, Clone, Default)]
pub struct KindBuckets {
    pub pods: Vec<Pod>,
    pub services: Vec<Service>,
    pub replication_controllers: Vec<ReplicationController>,
    pub secrets: Vec<Secret>,
    pub namespaces: Vec<Namespace>,
    pub persistent_volumes: Vec<PersistentVolume>,
    pub service_accounts: Vec<ServiceAccount>,

    /// Unregistered `v1` kinds, keyed by kind in encounter order
    pub unknown: IndexMap<String, Vec<Manifest>>,
}

impl KindBuckets {
    /// Number of classified and unknown resources
    pub fn len(&self) -> usize {
        self.pods.len()
            + self.services.len()
            + self.replication_controllers.len()
            + self.secrets.len()
            + self.namespaces.len()
            + self.persistent_volumes.len()
            + self.service_accounts.len()
            + self.unknown.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type Classifier = Box<dyn Fn(&Manifest, &mut KindBuckets) -> Result<()> + Send + Sync>;

/// Maps a kind to the function that decodes it into its bucket
pub struct KindRegistry {
    classifiers: HashMap<&'static str, Classifier>,
}

impl KindRegistry {
    /// A registry with no kinds; everything lands in the unknown bucket
    pub fn empty() -> Self {
        Self {
            classifiers: HashMap::new(),
        }
    }

    /// The core `v1` kinds
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry
            .register(pods)
            .register(services)
            .register(replication_controllers)
            .register(secrets)
            .register(namespaces)
            .register(persistent_volumes)
            .register(service_accounts);
        registry
    }

    /// Register a typed resource and the bucket it is collected into
    ///
    /// The decoded resource gets the [`ORIGIN_FILE_ANNOTATION`] before it is pushed.
    pub fn register<K>(&mut self, bucket: fn(&mut KindBuckets) -> &mut Vec<K>) -> &mut Self
    where
        K: Resource + Metadata<Ty = ObjectMeta> + DeserializeOwned + 'static,
    {
        let classifier = move |manifest: &Manifest, buckets: &mut KindBuckets| -> Result<()> {
            let mut resource: K = manifest.decode()?;
            resource
                .metadata_mut()
                .annotations
                .get_or_insert_with(Default::default)
                .insert(ORIGIN_FILE_ANNOTATION.to_string(), manifest.source_name());
            bucket(buckets).push(resource);
            Ok(())
        };

        self.classifiers.insert(K::KIND, Box::new(classifier));
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.classifiers.contains_key(kind)
    }

    /// Decode a manifest into its bucket; `Ok(false)` if the kind is not registered
    pub fn classify(&self, manifest: &Manifest, buckets: &mut KindBuckets) -> Result<bool> {
        match self.classifiers.get(manifest.kind()) {
            Some(classify) => {
                classify(manifest, buckets)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.classifiers.keys().collect();
        kinds.sort();
        f.debug_struct("KindRegistry").field("kinds", &kinds).finish()
    }
}

fn pods(b: &mut KindBuckets) -> &mut Vec<Pod> {
    &mut b.pods
}

fn services(b: &mut KindBuckets) -> &mut Vec<Service> {
    &mut b.services
}

fn replication_controllers(b: &mut KindBuckets) -> &mut Vec<ReplicationController> {
    &mut b.replication_controllers
}

fn secrets(b: &mut KindBuckets) -> &mut Vec<Secret> {
    &mut b.secrets
}

fn namespaces(b: &mut KindBuckets) -> &mut Vec<Namespace> {
    &mut b.namespaces
}

fn persistent_volumes(b: &mut KindBuckets) -> &mut Vec<PersistentVolume> {
    &mut b.persistent_volumes
}

fn service_accounts(b: &mut KindBuckets) -> &mut Vec<ServiceAccount> {
    &mut b.service_accounts
}

/// A chart directory loaded into memory
#[derive(Debug, Clone)]
pub struct Chart {
    /// Chart root directory
    pub root: PathBuf,

    pub chartfile: Chartfile,

    /// Every decoded document, in discovery order
    pub manifests: Vec<Manifest>,

    pub buckets: KindBuckets,

    pub warnings: Vec<ChartWarning>,
}

impl Chart {
    /// Load a chart with the standard kinds, failing on malformed documents
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::load_with(dir, &KindRegistry::standard(), DecodePolicy::Strict)
    }

    pub fn load_with<P: AsRef<Path>>(
        dir: P,
        registry: &KindRegistry,
        policy: DecodePolicy,
    ) -> Result<Self> {
        let root = dir.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(CoreError::NotFound { path: root });
        }

        let chartfile = Chartfile::load(root.join(CHARTFILE_NAME))?;
        let manifests_dir = root.join(MANIFESTS_DIR);
        if !manifests_dir.is_dir() {
            return Err(CoreError::NotFound {
                path: manifests_dir,
            });
        }

        let mut chart = Self {
            root,
            chartfile,
            manifests: Vec::new(),
            buckets: KindBuckets::default(),
            warnings: Vec::new(),
        };

        for path in manifest_files(&manifests_dir)? {
            let relative = path
                .strip_prefix(&manifests_dir)
                .unwrap_or(&path)
                .to_path_buf();
            chart.load_file(&path, relative, registry, policy)?;
        }

        tracing::debug!(
            chart = %chart.chartfile.name,
            manifests = chart.manifests.len(),
            warnings = chart.warnings.len(),
            "loaded chart"
        );

        Ok(chart)
    }

    fn load_file(
        &mut self,
        path: &Path,
        relative: PathBuf,
        registry: &KindRegistry,
        policy: DecodePolicy,
    ) -> Result<()> {
        let content = std::fs::read(path)?;
        let source_name = path.display().to_string();
        let decoder = Decoder::new(&content, Encoding::Yaml).named(source_name);

        for document in decoder.documents() {
            let document = match (document, policy) {
                (Ok(doc), _) => doc,
                (Err(e), DecodePolicy::Strict) => return Err(e),
                (Err(e), DecodePolicy::SkipInvalid) => {
                    tracing::warn!(file = %relative.display(), error = %e, "skipping malformed document");
                    self.warnings.push(ChartWarning::InvalidDocument {
                        source: relative.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let manifest = Manifest::new(relative.clone(), document);
            self.classify(&manifest, registry, policy)?;
            self.manifests.push(manifest);
        }

        Ok(())
    }

    fn classify(
        &mut self,
        manifest: &Manifest,
        registry: &KindRegistry,
        policy: DecodePolicy,
    ) -> Result<()> {
        let gvk = manifest.reference().gvk();
        if !gvk.group.is_empty() || gvk.version != CLASSIFIED_VERSION {
            tracing::warn!(
                file = %manifest.source_name(),
                kind = manifest.kind(),
                api_version = manifest.api_version(),
                "unsupported apiVersion, not classified"
            );
            self.warnings.push(ChartWarning::UnsupportedVersion {
                source: manifest.source.clone(),
                kind: manifest.kind().to_string(),
                api_version: manifest.api_version().to_string(),
            });
            return Ok(());
        }

        match registry.classify(manifest, &mut self.buckets) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(file = %manifest.source_name(), kind = manifest.kind(), "unknown kind");
                self.warnings.push(ChartWarning::UnknownKind {
                    source: manifest.source.clone(),
                    kind: manifest.kind().to_string(),
                });
                self.buckets
                    .unknown
                    .entry(manifest.kind().to_string())
                    .or_default()
                    .push(manifest.clone());
            }
            Err(e) if policy == DecodePolicy::SkipInvalid => {
                tracing::warn!(file = %manifest.source_name(), error = %e, "failed to decode resource");
                self.warnings.push(ChartWarning::InvalidDocument {
                    source: manifest.source.clone(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                return Err(CoreError::format(
                    manifest.source_name(),
                    format!("{}: {}", manifest.reference(), e),
                ));
            }
        }

        Ok(())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.chartfile.name
    }

    #[inline]
    pub fn version(&self) -> &str {
        &self.chartfile.version
    }

    /// Count of manifests per declared kind, in encounter order
    pub fn kinds(&self) -> IndexMap<String, usize> {
        let mut kinds = IndexMap::new();
        for manifest in &self.manifests {
            *kinds.entry(manifest.kind().to_string()).or_insert(0) += 1;
        }
        kinds
    }
}

/// Every `.yaml`/`.yml` file under `dir`, sorted by name
///
/// Entries whose name starts with `.` or `_` are skipped, directories included.
/// A missing directory yields no files.
pub fn manifest_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let walker = walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored(e.file_name()));

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if Encoding::from_path(entry.path()) == Some(Encoding::Yaml) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

fn is_ignored(name: &std::ffi::OsStr) -> bool {
    let name = name.to_string_lossy();
    name.starts_with('.') || name.starts_with('_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CHART_YAML: &str = "name: demo\nversion: 0.1.0\ndescription: Demo chart\n";

    fn chart_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CHARTFILE_NAME), CHART_YAML).unwrap();
        for (path, content) in files {
            let path = dir.path().join(MANIFESTS_DIR).join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    // ==========================================================================
    // Loading
    // ==========================================================================

    #[test]
    fn test_load_not_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, "x").unwrap();

        assert!(Chart::load(&file).unwrap_err().is_not_found());
        assert!(Chart::load(dir.path().join("nope")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_load_missing_chartfile() {
        let dir = TempDir::new().unwrap();
        assert!(Chart::load(dir.path()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_load_without_manifests_dir() {
        let dir = chart_dir(&[]);
        let err = Chart::load(dir.path()).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains(MANIFESTS_DIR));
    }

    #[test]
    fn test_load_empty_manifests_dir() {
        let dir = chart_dir(&[]);
        fs::create_dir(dir.path().join(MANIFESTS_DIR)).unwrap();

        let chart = Chart::load(dir.path()).unwrap();
        assert_eq!(chart.name(), "demo");
        assert_eq!(chart.version(), "0.1.0");
        assert!(chart.manifests.is_empty());
        assert!(chart.buckets.is_empty());
    }

    #[test]
    fn test_load_classifies_core_kinds() {
        let dir = chart_dir(&[
            (
                "all.yaml",
                "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: prod\n---\napiVersion: v1\nkind: Service\nmetadata:\n  name: web\n",
            ),
            ("pod.yaml", "apiVersion: v1\nkind: Pod\nmetadata:\n  name: web\n"),
            (
                "secret.yml",
                "apiVersion: v1\nkind: Secret\nmetadata:\n  name: creds\ndata:\n  key: dmFsdWU=\n",
            ),
        ]);

        let chart = Chart::load(dir.path()).unwrap();
        assert_eq!(chart.manifests.len(), 4);
        assert_eq!(chart.buckets.namespaces.len(), 1);
        assert_eq!(chart.buckets.services.len(), 1);
        assert_eq!(chart.buckets.pods.len(), 1);
        assert_eq!(chart.buckets.secrets.len(), 1);
        assert!(chart.warnings.is_empty());

        // Two documents from one file share the source
        assert_eq!(chart.manifests[0].source, chart.manifests[1].source);
    }

    #[test]
    fn test_origin_file_annotation() {
        let dir = chart_dir(&[(
            "web/pod.yaml",
            "apiVersion: v1\nkind: Pod\nmetadata:\n  name: web\n  annotations:\n    team: infra\n",
        )]);

        let chart = Chart::load(dir.path()).unwrap();
        let annotations = chart.buckets.pods[0].metadata.annotations.as_ref().unwrap();
        assert_eq!(
            annotations.get(ORIGIN_FILE_ANNOTATION).map(String::as_str),
            Some("web/pod.yaml")
        );
        assert_eq!(annotations.get("team").map(String::as_str), Some("infra"));

        let yaml = serde_yaml::to_string(&chart.buckets.pods[0]).unwrap();
        let back: Pod = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.metadata.annotations, chart.buckets.pods[0].metadata.annotations);
    }

    #[test]
    fn test_non_v1_is_warned_and_not_classified() {
        let dir = chart_dir(&[(
            "deploy.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n---\napiVersion: v2\nkind: Pod\nmetadata:\n  name: next\n",
        )]);

        let chart = Chart::load(dir.path()).unwrap();
        assert_eq!(chart.manifests.len(), 2);
        assert!(chart.buckets.is_empty());
        assert_eq!(chart.warnings.len(), 2);
        assert!(matches!(
            &chart.warnings[0],
            ChartWarning::UnsupportedVersion { api_version, .. } if api_version == "apps/v1"
        ));
        assert!(matches!(
            &chart.warnings[1],
            ChartWarning::UnsupportedVersion { api_version, .. } if api_version == "v2"
        ));
    }

    #[test]
    fn test_unknown_kinds_keep_encounter_order() {
        let dir = chart_dir(&[(
            "misc.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n---\napiVersion: v1\nkind: LimitRange\nmetadata:\n  name: b\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: c\n",
        )]);

        let chart = Chart::load(dir.path()).unwrap();
        let kinds: Vec<_> = chart.buckets.unknown.keys().cloned().collect();
        assert_eq!(kinds, vec!["ConfigMap", "LimitRange"]);

        let names: Vec<_> = chart.buckets.unknown["ConfigMap"]
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(chart.warnings.len(), 3);
    }

    #[test]
    fn test_walk_skips_hidden_and_underscore_entries() {
        let dir = chart_dir(&[
            ("b.yaml", "apiVersion: v1\nkind: Pod\nmetadata:\n  name: b\n"),
            ("a/nested.yaml", "apiVersion: v1\nkind: Pod\nmetadata:\n  name: a\n"),
            (".hidden.yaml", "apiVersion: v1\nkind: Pod\nmetadata:\n  name: hidden\n"),
            ("_partial.yaml", "apiVersion: v1\nkind: Pod\nmetadata:\n  name: partial\n"),
            ("_drafts/x.yaml", "apiVersion: v1\nkind: Pod\nmetadata:\n  name: draft\n"),
            ("notes.txt", "not a manifest"),
        ]);

        let chart = Chart::load(dir.path()).unwrap();
        let names: Vec<_> = chart.manifests.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_strict_policy_fails_on_malformed_document() {
        let dir = chart_dir(&[("bad.yaml", "kind: [oops\n")]);
        let err = Chart::load(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::Format { .. }));
    }

    #[test]
    fn test_skip_invalid_policy_continues() {
        let dir = chart_dir(&[
            ("a.yaml", "kind: [oops\n"),
            ("b.yaml", "apiVersion: v1\nkind: Pod\nmetadata:\n  name: ok\n"),
        ]);

        let chart =
            Chart::load_with(dir.path(), &KindRegistry::standard(), DecodePolicy::SkipInvalid)
                .unwrap();
        assert_eq!(chart.buckets.pods.len(), 1);
        assert!(matches!(chart.warnings[0], ChartWarning::InvalidDocument { .. }));
    }

    #[test]
    fn test_kinds_summary() {
        let dir = chart_dir(&[(
            "all.yaml",
            "apiVersion: v1\nkind: Pod\nmetadata:\n  name: a\n---\napiVersion: v1\nkind: Service\nmetadata:\n  name: s\n---\napiVersion: v1\nkind: Pod\nmetadata:\n  name: b\n",
        )]);

        let chart = Chart::load(dir.path()).unwrap();
        let kinds: Vec<_> = chart.kinds().into_iter().collect();
        assert_eq!(kinds, vec![("Pod".to_string(), 2), ("Service".to_string(), 1)]);
    }

    // ==========================================================================
    // Registry
    // ==========================================================================

    #[test]
    fn test_empty_registry_sends_everything_to_unknown() {
        let dir = chart_dir(&[("pod.yaml", "apiVersion: v1\nkind: Pod\nmetadata:\n  name: a\n")]);
        let chart =
            Chart::load_with(dir.path(), &KindRegistry::empty(), DecodePolicy::Strict).unwrap();
        assert!(chart.buckets.pods.is_empty());
        assert_eq!(chart.buckets.unknown["Pod"].len(), 1);
    }

    #[test]
    fn test_standard_registry_kinds() {
        let registry = KindRegistry::standard();
        for kind in [
            "Pod",
            "Service",
            "ReplicationController",
            "Secret",
            "Namespace",
            "PersistentVolume",
            "ServiceAccount",
        ] {
            assert!(registry.contains(kind), "missing {kind}");
        }
        assert!(!registry.contains("ConfigMap"));
    }
}
