//! Mapping Store.
//!
//! The store is the ordered list of generic rewrite rules consumed by the
//! encoder's sweep phase. It is read once, from the first existing file among a
//! list of candidates, and never mutated afterwards.
//!
//! ## File format
//!
//! ```text
//! {
//!   "mappings": [
//!     { "find": "x", "replace": "[", "type": "literal", "description": "Variable x" },
//!     { "find": "(\\d+)%", "replace": "\\1qR", "type": "regex", "description": "Percent" }
//!   ]
//! }
//! ```
//!
//! Unknown fields are ignored and missing fields default to an empty string, a
//! literal rule and an empty description. The list is deserialized into a `Vec`
//! so file order is rule order.
//!
//! ## Failure semantics
//!
//! [`MappingStore::load`] never fails: I/O and parse errors produce an empty
//! store plus a warning, and the encoder degrades to structural lowering only.
//! Callers that want the error use [`MappingStore::try_load`].

use crate::{MappingRule, RuleKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const BUNDLED_MAPPINGS: &str = include_str!("../data/mappings.json");

/// Errors surfaced by the strict loading paths.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("failed to read mapping file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse mapping file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("none of the {0} candidate mapping sources exists")]
    NoSource(usize),
}

#[derive(Debug, Deserialize)]
struct MappingFile {
    #[serde(default)]
    mappings: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    #[serde(default)]
    find: String,
    #[serde(default)]
    replace: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    structural: Option<bool>,
}

impl From<RawRule> for MappingRule {
    fn from(raw: RawRule) -> Self {
        MappingRule {
            pattern: raw.find,
            replacement: raw.replace,
            kind: RuleKind::from_label(&raw.kind),
            description: raw.description,
            structural: raw.structural,
        }
    }
}

/// Ordered, read-only sequence of [`MappingRule`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingStore {
    rules: Vec<MappingRule>,
    source: Option<PathBuf>,
}

impl MappingStore {
    /// A store with no rules. The encoder then only runs the structural phases.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: Vec<MappingRule>) -> Self {
        MappingStore { rules, source: None }
    }

    /// Parse a mapping document held in memory.
    pub fn from_json(text: &str) -> Result<Self, MappingError> {
        let file: MappingFile = serde_json::from_str(text)?;
        Ok(Self::from_rules(file.mappings.into_iter().map(MappingRule::from).collect()))
    }

    /// The mapping table shipped with the crate (maps the variable `x` to `[`).
    pub fn bundled() -> Self {
        match Self::from_json(BUNDLED_MAPPINGS) {
            Ok(store) => store,
            Err(err) => {
                log::warn!("bundled mapping table is unreadable, using an empty store: {err}");
                Self::empty()
            }
        }
    }

    /// Load from the first existing source, surfacing every failure.
    pub fn try_load<P: AsRef<Path>>(sources: &[P]) -> Result<Self, MappingError> {
        let path = first_existing(sources).ok_or(MappingError::NoSource(sources.len()))?;
        let text =
            std::fs::read_to_string(path).map_err(|source| MappingError::Io { path: path.to_path_buf(), source })?;
        let mut store = Self::from_json(&text)?;
        store.source = Some(path.to_path_buf());
        log::debug!("loaded {} mapping rules from {}", store.rules.len(), path.display());
        Ok(store)
    }

    /// Load from the first existing source. Any failure yields an empty store.
    pub fn load<P: AsRef<Path>>(sources: &[P]) -> Self {
        match Self::try_load(sources) {
            Ok(store) => store,
            Err(err) => {
                log::warn!("mapping store is empty: {err}");
                Self::empty()
            }
        }
    }

    /// Rules in file order.
    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Path the rules were read from, if they came from disk.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Replacement of the first literal rule whose pattern is exactly `pattern`.
    pub fn literal_replacement(&self, pattern: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.kind == RuleKind::Literal && r.pattern == pattern)
            .map(|r| r.replacement.as_str())
    }
}

/// First candidate path that exists on disk.
pub(crate) fn first_existing<P: AsRef<Path>>(sources: &[P]) -> Option<&Path> {
    sources.iter().map(AsRef::as_ref).find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn from_json_keeps_file_order() {
        let store = MappingStore::from_json(
            r#"{"mappings": [
                {"find": "b", "replace": "2", "type": "literal", "description": "second letter"},
                {"find": "a", "replace": "1", "type": "literal", "description": "first letter"},
                {"find": "(\\d)", "replace": "<\\1>", "type": "regex", "description": "digit"}
            ]}"#,
        )
        .unwrap();

        let patterns: Vec<&str> = store.rules().iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["b", "a", "(\\d)"]);
        assert_eq!(store.rules()[2].kind, RuleKind::Regex);
    }

    #[test]
    fn missing_fields_default_and_unknown_fields_are_ignored() {
        let store = MappingStore::from_json(r#"{"mappings": [{"find": "x", "priority": 7}], "version": 3}"#).unwrap();

        let rule = &store.rules()[0];
        assert_eq!(rule.pattern, "x");
        assert_eq!(rule.replacement, "");
        assert_eq!(rule.kind, RuleKind::Literal);
        assert_eq!(rule.description, "");
        assert_eq!(rule.structural, None);
    }

    #[test]
    fn unknown_type_label_is_literal() {
        let store = MappingStore::from_json(r#"{"mappings": [{"find": "x", "replace": "[", "type": "glob"}]}"#).unwrap();
        assert_eq!(store.rules()[0].kind, RuleKind::Literal);
    }

    #[test]
    fn structural_tag_is_read() {
        let store =
            MappingStore::from_json(r#"{"mappings": [{"find": "x", "replace": "[", "structural": true}]}"#).unwrap();
        assert_eq!(store.rules()[0].structural, Some(true));
    }

    #[test]
    fn load_uses_first_existing_source() {
        let first = write_temp(r#"{"mappings": [{"find": "x", "replace": "A"}]}"#);
        let second = write_temp(r#"{"mappings": [{"find": "x", "replace": "B"}]}"#);
        let missing = PathBuf::from("/nonexistent/keylog/mappings.json");

        let store = MappingStore::load(&[missing.as_path(), first.path(), second.path()]);
        assert_eq!(store.literal_replacement("x"), Some("A"));
        assert_eq!(store.source(), Some(first.path()));
    }

    #[test]
    fn load_without_any_source_is_empty() {
        let store = MappingStore::load(&["/nonexistent/a.json", "/nonexistent/b.json"]);
        assert!(store.is_empty());
        assert!(matches!(
            MappingStore::try_load(&["/nonexistent/a.json"]),
            Err(MappingError::NoSource(1))
        ));
    }

    #[test]
    fn malformed_file_yields_empty_store() {
        let broken = write_temp("{\"mappings\": [ {\"find\": ");
        let store = MappingStore::load(&[broken.path()]);
        assert!(store.is_empty());
        assert!(matches!(MappingStore::try_load(&[broken.path()]), Err(MappingError::Parse(_))));
    }

    #[test]
    fn bundled_table_maps_variable_x() {
        let store = MappingStore::bundled();
        assert!(!store.is_empty());
        assert_eq!(store.literal_replacement("x"), Some("["));
    }
}
