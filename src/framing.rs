//! Per-domain framing tables.
//!
//! Composers wrap encoded bodies in version-specific prefixes and suffixes
//! (the key sequence that opens the right calculator mode, and the one that
//! commits the last entry). Those strings are data: each domain reads one table
//! keyed by calculator version and then by a domain key (`2_var`, `degree_3`,
//! `default`, ...). The composer never inspects their content.
//!
//! ```text
//! {
//!   "versions": {
//!     "fx799": {
//!       "2_var": { "prefix": "w912" },
//!       "3_var": { "prefix": "w913", "suffix": "== = =" }
//!     }
//!   }
//! }
//! ```
//!
//! Loading follows the Mapping Store: the first existing candidate wins and the
//! lenient path degrades to an empty table.

use crate::mapping::first_existing;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const BUNDLED_EQUATION: &str = include_str!("../data/equation.json");
const BUNDLED_POLYNOMIAL: &str = include_str!("../data/polynomial.json");
const BUNDLED_GEOMETRY: &str = include_str!("../data/geometry.json");

/// Problem classes that carry a framing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Equation,
    Polynomial,
    Geometry,
}

impl Domain {
    fn bundled_source(self) -> &'static str {
        match self {
            Domain::Equation => BUNDLED_EQUATION,
            Domain::Polynomial => BUNDLED_POLYNOMIAL,
            Domain::Geometry => BUNDLED_GEOMETRY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("failed to read framing table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse framing table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("none of the {0} candidate framing sources exists")]
    NoSource(usize),
}

/// Constant strings placed around an encoded body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: Option<String>,
}

/// Version-keyed lookup of [`Frame`]s for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FramingTable {
    #[serde(default)]
    versions: HashMap<String, HashMap<String, Frame>>,
}

impl FramingTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, FramingError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The table shipped with the crate for `domain`.
    pub fn bundled(domain: Domain) -> Self {
        match Self::from_json(domain.bundled_source()) {
            Ok(table) => table,
            Err(err) => {
                log::warn!("bundled {domain:?} framing table is unreadable: {err}");
                Self::empty()
            }
        }
    }

    pub fn try_load<P: AsRef<Path>>(sources: &[P]) -> Result<Self, FramingError> {
        let path = first_existing(sources).ok_or(FramingError::NoSource(sources.len()))?;
        let text =
            std::fs::read_to_string(path).map_err(|source| FramingError::Io { path: path.to_path_buf(), source })?;
        let table = Self::from_json(&text)?;
        log::debug!("loaded framing for {} versions from {}", table.versions.len(), path.display());
        Ok(table)
    }

    /// Load from the first existing source; any failure yields an empty table.
    pub fn load<P: AsRef<Path>>(sources: &[P]) -> Self {
        match Self::try_load(sources) {
            Ok(table) => table,
            Err(err) => {
                log::warn!("framing table is empty: {err}");
                Self::empty()
            }
        }
    }

    pub fn frame(&self, version: &str, key: &str) -> Option<&Frame> {
        self.versions.get(version)?.get(key)
    }

    /// Known versions, sorted.
    pub fn versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.versions.keys().map(String::as_str).collect();
        versions.sort_unstable();
        versions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn bundled_tables_cover_reference_versions() {
        let equation = FramingTable::bundled(Domain::Equation);
        assert_eq!(equation.versions(), vec!["fx580", "fx799", "fx880"]);
        assert_eq!(equation.frame("fx799", "2_var").map(|f| f.prefix.as_str()), Some("w912"));
        assert!(equation.frame("fx580", "4_var").is_none());

        let polynomial = FramingTable::bundled(Domain::Polynomial);
        assert_eq!(polynomial.frame("fx880", "degree_3").and_then(|f| f.suffix.as_deref()), Some("=="));

        let geometry = FramingTable::bundled(Domain::Geometry);
        assert_eq!(geometry.frame("fx799", "default").map(|f| f.prefix.as_str()), Some("wj"));
    }

    #[test]
    fn missing_suffix_is_none() {
        let table = FramingTable::from_json(r#"{"versions": {"v1": {"k": {"prefix": "P"}}}}"#).unwrap();
        assert_eq!(table.frame("v1", "k"), Some(&Frame { prefix: "P".into(), suffix: None }));
        assert!(table.frame("v2", "k").is_none());
    }

    #[test]
    fn load_falls_back_to_empty() {
        let mut broken = tempfile::NamedTempFile::new().unwrap();
        broken.write_all(b"not json").unwrap();

        assert_eq!(FramingTable::load(&[broken.path()]), FramingTable::empty());
        assert_eq!(FramingTable::load(&["/nonexistent/framing.json"]), FramingTable::empty());
    }

    #[test]
    fn load_reads_first_existing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"versions": {"v9": {"default": {"prefix": "zz"}}}}"#).unwrap();

        let table = FramingTable::try_load(&[Path::new("/nonexistent/x.json"), file.path()]).unwrap();
        assert_eq!(table.versions(), vec!["v9"]);
    }
}
