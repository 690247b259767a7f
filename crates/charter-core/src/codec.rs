//! Manifest stream decoding
//!
//! A manifest file holds zero or more documents. YAML streams are split at
//! separator lines (`---` at the start of a line, followed by a newline,
//! whitespace or end of input). JSON streams are either one JSON value or
//! newline-delimited JSON.
//!
//! Splitting is lazy and restartable: [`Decoder::documents`] returns a fresh
//! iterator over the same buffer every time it is called.

use kube::core::GroupVersionKind;
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Declared encoding of a manifest stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Yaml,
    Json,
}

impl Encoding {
    /// Pick an encoding from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Encoding::Yaml),
            "json" | "jsonl" => Some(Encoding::Json),
            _ => None,
        }
    }
}

/// The identifying header of a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
}

impl ObjectReference {
    /// Split `apiVersion` into group and version
    ///
    /// - "apps/v1" -> group="apps", version="v1"
    /// - "v1" -> group="", version="v1" (core API)
    pub fn gvk(&self) -> GroupVersionKind {
        let (group, version) = match self.api_version.rsplit_once('/') {
            Some((g, v)) => (g.to_string(), v.to_string()),
            None => (String::new(), self.api_version.clone()),
        };

        GroupVersionKind {
            group,
            version,
            kind: self.kind.clone(),
        }
    }
}

impl std::fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    #[serde(default)]
    api_version: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    metadata: HeaderMeta,
}

#[derive(Deserialize, Default)]
struct HeaderMeta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

/// One discrete document from a manifest stream
///
/// Holds the raw bytes plus the cheaply extracted header; the full payload
/// is only materialized by [`Document::decode`] or [`Document::to_value`].
#[derive(Debug, Clone)]
pub struct Document {
    raw: Vec<u8>,
    encoding: Encoding,
    reference: ObjectReference,
}

impl Document {
    /// Build a document from raw bytes, reading its header
    pub fn new(raw: impl Into<Vec<u8>>, encoding: Encoding) -> Result<Self> {
        let raw = raw.into();
        let header: Option<Header> = match encoding {
            Encoding::Yaml => serde_yaml::from_slice(&raw)?,
            Encoding::Json => serde_json::from_slice(&raw)?,
        };
        let header = header.unwrap_or(Header {
            api_version: String::new(),
            kind: String::new(),
            metadata: HeaderMeta::default(),
        });

        Ok(Self {
            raw,
            encoding,
            reference: ObjectReference {
                api_version: header.api_version,
                kind: header.kind,
                name: header.metadata.name,
                namespace: header.metadata.namespace,
            },
        })
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// API version, kind and name without decoding the body
    pub fn reference(&self) -> &ObjectReference {
        &self.reference
    }

    /// Decode into a concrete type (typically a `k8s-openapi` resource)
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        match self.encoding {
            Encoding::Yaml => Ok(serde_yaml::from_slice(&self.raw)?),
            Encoding::Json => Ok(serde_json::from_slice(&self.raw)?),
        }
    }

    /// Decode into an untyped JSON value
    pub fn to_value(&self) -> Result<serde_json::Value> {
        self.decode()
    }

    /// Render the document as YAML text
    pub fn to_yaml_string(&self) -> Result<String> {
        match self.encoding {
            Encoding::Yaml => Ok(String::from_utf8_lossy(&self.raw).into_owned()),
            Encoding::Json => Ok(serde_yaml::to_string(&self.to_value()?)?),
        }
    }

    /// Copy of this document with extra `metadata.annotations` merged in
    pub fn with_annotations(&self, annotations: &BTreeMap<String, String>) -> Result<Self> {
        let mut value = self.to_value()?;
        let object = value
            .as_object_mut()
            .ok_or_else(|| CoreError::format(self.reference.to_string(), "document is not a mapping"))?;

        let metadata = object
            .entry("metadata")
            .or_insert_with(|| serde_json::Value::Object(Default::default()));
        let metadata = metadata
            .as_object_mut()
            .ok_or_else(|| CoreError::format(self.reference.to_string(), "metadata is not a mapping"))?;

        let existing = metadata
            .entry("annotations")
            .or_insert_with(|| serde_json::Value::Object(Default::default()));
        if existing.is_null() {
            *existing = serde_json::Value::Object(Default::default());
        }
        let existing = existing
            .as_object_mut()
            .ok_or_else(|| CoreError::format(self.reference.to_string(), "annotations is not a mapping"))?;

        for (key, val) in annotations {
            existing.insert(key.clone(), serde_json::Value::String(val.clone()));
        }

        match self.encoding {
            Encoding::Yaml => Self::new(serde_yaml::to_string(&value)?, Encoding::Yaml),
            Encoding::Json => Self::new(serde_json::to_vec(&value)?, Encoding::Json),
        }
    }
}

/// Splits a YAML byte stream at `---` separator lines
///
/// Yielded segments are borrowed verbatim from the buffer. A separator
/// followed by inline content (`--- # note`) keeps that content as the
/// first line of the next segment.
#[derive(Debug, Clone)]
pub struct YamlDocuments<'a> {
    buf: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> YamlDocuments<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            done: false,
        }
    }
}

impl<'a> Iterator for YamlDocuments<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let start = self.pos;
        let mut line_start = start;

        loop {
            if let Some(skip) = separator_len(&self.buf[line_start..]) {
                self.pos = line_start + skip;
                return Some(&self.buf[start..line_start]);
            }

            match self.buf[line_start..].iter().position(|b| *b == b'\n') {
                Some(idx) => line_start += idx + 1,
                None => {
                    self.done = true;
                    return Some(&self.buf[start..]);
                }
            }
        }
    }
}

/// Length of the separator at the start of `rest`, if there is one
fn separator_len(rest: &[u8]) -> Option<usize> {
    if !rest.starts_with(b"---") {
        return None;
    }

    match rest.get(3) {
        None => Some(3),
        Some(b'\n') => Some(4),
        Some(b'\r') if rest.get(4) == Some(&b'\n') => Some(5),
        Some(b' ' | b'\t') => {
            let blanks = rest[3..]
                .iter()
                .take_while(|b| matches!(b, b' ' | b'\t'))
                .count();
            Some(3 + blanks)
        }
        _ => None,
    }
}

/// Whether a segment holds nothing but whitespace and comments
fn is_blank(segment: &[u8]) -> bool {
    String::from_utf8_lossy(segment).lines().all(|l| {
        let l = l.trim();
        l.is_empty() || l.starts_with('#')
    })
}

fn is_newline(b: &u8) -> bool {
    *b == b'\n'
}

/// Decodes a byte buffer of a declared encoding into documents
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    source: &'a [u8],
    encoding: Encoding,
    name: String,
}

impl<'a> Decoder<'a> {
    pub fn new(source: &'a [u8], encoding: Encoding) -> Self {
        Self {
            source,
            encoding,
            name: "<stream>".to_string(),
        }
    }

    /// Name the stream for error messages (usually the file path)
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Iterate over the documents, starting from the top of the buffer
    pub fn documents(&self) -> Documents<'_> {
        let state = match self.encoding {
            Encoding::Yaml => State::Yaml(YamlDocuments::new(self.source)),
            Encoding::Json => self.json_state(),
        };

        Documents {
            state,
            name: &self.name,
        }
    }

    /// Decode every document, failing on the first malformed one
    pub fn decode_all(&self) -> Result<Vec<Document>> {
        self.documents().collect()
    }

    fn json_state(&self) -> State<'_> {
        if serde_json::from_slice::<IgnoredAny>(self.source).is_ok() {
            return State::JsonWhole(Some(self.source));
        }

        let mut lines = self.source.split(is_newline as fn(&u8) -> bool);
        let first = lines.by_ref().find(|l| !l.trim_ascii().is_empty());

        match first {
            None => State::Done,
            Some(line) if serde_json::from_slice::<IgnoredAny>(line).is_err() => {
                State::Failed(Some(CoreError::format(self.name.clone(), "neither JSON nor JSONL")))
            }
            Some(_) => State::JsonLines(self.source.split(is_newline as fn(&u8) -> bool)),
        }
    }
}

enum State<'a> {
    Yaml(YamlDocuments<'a>),
    JsonWhole(Option<&'a [u8]>),
    JsonLines(std::slice::Split<'a, u8, fn(&u8) -> bool>),
    Failed(Option<CoreError>),
    Done,
}

/// Iterator returned by [`Decoder::documents`]
pub struct Documents<'a> {
    state: State<'a>,
    name: &'a str,
}

impl Iterator for Documents<'_> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.name;
        match &mut self.state {
            State::Yaml(segments) => {
                let segment = segments.find(|s| !is_blank(s))?;
                Some(
                    Document::new(segment, Encoding::Yaml)
                        .map_err(|e| CoreError::format(name, e.to_string())),
                )
            }
            State::JsonWhole(buf) => {
                let buf = buf.take()?;
                Some(
                    Document::new(buf, Encoding::Json)
                        .map_err(|e| CoreError::format(name, e.to_string())),
                )
            }
            State::JsonLines(lines) => {
                let line = lines.find(|l| !l.trim_ascii().is_empty())?;
                Some(
                    Document::new(line.trim_ascii(), Encoding::Json)
                        .map_err(|e| CoreError::format(name, e.to_string())),
                )
            }
            State::Failed(err) => err.take().map(Err),
            State::Done => None,
        }
    }
}

/// Join documents into one YAML stream using `---` separators
pub fn encode_yaml_stream(documents: &[Document]) -> Result<String> {
    let mut out = String::new();
    for (idx, doc) in documents.iter().enumerate() {
        if idx > 0 {
            out.push_str("---\n");
        }
        let text = doc.to_yaml_string()?;
        out.push_str(text.trim_end_matches('\n'));
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(input: &str) -> Vec<String> {
        YamlDocuments::new(input.as_bytes())
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect()
    }

    #[test]
    fn test_split_no_separator_is_one_document() {
        assert_eq!(split("a: 1\nb: 2\n"), vec!["a: 1\nb: 2\n"]);
    }

    #[test]
    fn test_split_preserves_segment_content() {
        let parts = split("a: 1\n---\nb: 2\n");
        assert_eq!(parts, vec!["a: 1\n", "b: 2\n"]);
    }

    #[test]
    fn test_split_leading_separator() {
        let parts = split("---\na: 1\n");
        assert_eq!(parts, vec!["", "a: 1\n"]);
    }

    #[test]
    fn test_split_trailing_separator_at_eof() {
        let parts = split("a: 1\n---");
        assert_eq!(parts, vec!["a: 1\n", ""]);
    }

    #[test]
    fn test_split_ignores_dashes_inside_lines() {
        let parts = split("a: ---\nb: x---y\n----\nc: 1\n");
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn test_split_inline_content_moves_to_next_document() {
        let parts = split("a: 1\n--- # second\nb: 2\n");
        assert_eq!(parts, vec!["a: 1\n", "# second\nb: 2\n"]);
    }

    #[test]
    fn test_split_crlf_separator() {
        let parts = split("a: 1\r\n---\r\nb: 2\r\n");
        assert_eq!(parts, vec!["a: 1\r\n", "b: 2\r\n"]);
    }

    #[test]
    fn test_split_is_restartable() {
        let input = b"a: 1\n---\nb: 2\n";
        let decoder = Decoder::new(input, Encoding::Yaml);
        assert_eq!(decoder.documents().count(), 2);
        assert_eq!(decoder.documents().count(), 2);
    }

    #[test]
    fn test_yaml_reference_extraction() {
        let input = b"apiVersion: v1\nkind: Pod\nmetadata:\n  name: web\n  namespace: prod\nspec:\n  containers: []\n";
        let docs = Decoder::new(input, Encoding::Yaml).decode_all().unwrap();
        assert_eq!(docs.len(), 1);

        let reference = docs[0].reference();
        assert_eq!(reference.api_version, "v1");
        assert_eq!(reference.kind, "Pod");
        assert_eq!(reference.name, "web");
        assert_eq!(reference.namespace.as_deref(), Some("prod"));
        assert_eq!(reference.to_string(), "Pod/web");
    }

    #[test]
    fn test_yaml_skips_blank_and_comment_documents() {
        let input = b"---\n# just a comment\n---\nkind: Service\n---\n\n";
        let docs = Decoder::new(input, Encoding::Yaml).decode_all().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].reference().kind, "Service");
    }

    #[test]
    fn test_yaml_malformed_document_is_format_error() {
        let input = b"kind: Pod\n---\nkind: [unclosed\n";
        let decoder = Decoder::new(input, Encoding::Yaml).named("bad.yaml");
        let results: Vec<_> = decoder.documents().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            &results[1],
            Err(CoreError::Format { source_name, .. }) if source_name == "bad.yaml"
        ));
    }

    #[test]
    fn test_json_single_value() {
        let input = br#"{
  "apiVersion": "v1",
  "kind": "Namespace",
  "metadata": {"name": "prod"}
}"#;
        let docs = Decoder::new(input, Encoding::Json).decode_all().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].reference().kind, "Namespace");
        assert_eq!(docs[0].reference().name, "prod");
    }

    #[test]
    fn test_json_lines() {
        let input = b"{\"kind\":\"Pod\",\"metadata\":{\"name\":\"a\"}}\n\n{\"kind\":\"Service\",\"metadata\":{\"name\":\"b\"}}\n";
        let docs = Decoder::new(input, Encoding::Json).decode_all().unwrap();
        let kinds: Vec<_> = docs.iter().map(|d| d.reference().kind.as_str()).collect();
        assert_eq!(kinds, vec!["Pod", "Service"]);
    }

    #[test]
    fn test_json_neither_json_nor_jsonl() {
        let input = b"this is not json\n{\"kind\":\"Pod\"}\n";
        let err = Decoder::new(input, Encoding::Json).decode_all().unwrap_err();
        assert!(err.to_string().contains("neither JSON nor JSONL"));
    }

    #[test]
    fn test_json_empty_stream() {
        let docs = Decoder::new(b"  \n", Encoding::Json).decode_all().unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_decode_into_typed_resource() {
        let input = b"apiVersion: v1\nkind: Service\nmetadata:\n  name: web\nspec:\n  ports:\n    - port: 80\n";
        let docs = Decoder::new(input, Encoding::Yaml).decode_all().unwrap();
        let svc: k8s_openapi::api::core::v1::Service = docs[0].decode().unwrap();
        assert_eq!(svc.metadata.name.as_deref(), Some("web"));
        let ports = svc.spec.unwrap().ports.unwrap();
        assert_eq!(ports[0].port, 80);
    }

    #[test]
    fn test_with_annotations_merges() {
        let input = b"apiVersion: v1\nkind: Pod\nmetadata:\n  name: web\n  annotations:\n    keep: me\n";
        let doc = Document::new(&input[..], Encoding::Yaml).unwrap();

        let mut extra = BTreeMap::new();
        extra.insert("charter.io/chart".to_string(), "demo".to_string());
        let annotated = doc.with_annotations(&extra).unwrap();

        let value = annotated.to_value().unwrap();
        assert_eq!(value["metadata"]["annotations"]["keep"], "me");
        assert_eq!(value["metadata"]["annotations"]["charter.io/chart"], "demo");
        assert_eq!(annotated.reference().name, "web");
    }

    #[test]
    fn test_with_annotations_creates_metadata() {
        let doc = Document::new(&b"{\"kind\":\"Pod\"}"[..], Encoding::Json).unwrap();
        let mut extra = BTreeMap::new();
        extra.insert("a".to_string(), "b".to_string());

        let annotated = doc.with_annotations(&extra).unwrap();
        assert_eq!(annotated.encoding(), Encoding::Json);
        assert_eq!(annotated.to_value().unwrap()["metadata"]["annotations"]["a"], "b");
    }

    #[test]
    fn test_yaml_round_trip_through_encoder() {
        let input = "kind: Pod\nmetadata:\n  name: a\n---\nkind: Service\nmetadata:\n  name: b\n---\nkind: Secret\nmetadata:\n  name: c\n";
        let docs = Decoder::new(input.as_bytes(), Encoding::Yaml).decode_all().unwrap();
        assert_eq!(docs.len(), 3);

        let encoded = encode_yaml_stream(&docs).unwrap();
        assert_eq!(encoded, input);

        let again = Decoder::new(encoded.as_bytes(), Encoding::Yaml).decode_all().unwrap();
        let names: Vec<_> = again.iter().map(|d| d.reference().name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_encoding_from_path() {
        assert_eq!(Encoding::from_path(Path::new("a/pod.yaml")), Some(Encoding::Yaml));
        assert_eq!(Encoding::from_path(Path::new("svc.YML")), Some(Encoding::Yaml));
        assert_eq!(Encoding::from_path(Path::new("x.jsonl")), Some(Encoding::Json));
        assert_eq!(Encoding::from_path(Path::new("README.md")), None);
    }

    #[test]
    fn test_gvk_split() {
        let reference = ObjectReference {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            ..Default::default()
        };
        let gvk = reference.gvk();
        assert_eq!(gvk.group, "apps");
        assert_eq!(gvk.version, "v1");

        let core = ObjectReference {
            api_version: "v1".to_string(),
            kind: "Pod".to_string(),
            ..Default::default()
        };
        assert_eq!(core.gvk().group, "");
        assert_eq!(core.gvk().version, "v1");
        assert_eq!(core.gvk().kind, "Pod");
    }
}
