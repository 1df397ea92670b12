// src/packages/common.rs
//! Package metadata consumed by the converter
//!
//! `PackageMetadata` is what the header reader hands to the translation
//! pass. It is never modified afterwards; the converter copies scriptlets
//! out before rewriting them.

use crate::packages::traits::{FileEntry, ScriptSlot, ScriptStage};
use std::collections::BTreeMap;

/// Header fields needed to build a recipe
#[derive(Debug, Clone, Default)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub release: String,
    /// Target architecture (e.g. "x86_64", "noarch")
    pub architecture: Option<String>,
    /// File name of the package the recipe imports, if known
    pub source_archive: Option<String>,
    /// Files in header order
    pub files: Vec<FileEntry>,
    /// Scriptlets keyed by lifecycle stage
    pub scripts: BTreeMap<ScriptStage, ScriptSlot>,
    /// Install prefixes of a relocatable package
    pub prefixes: Vec<String>,
    /// Header carries trigger scriptlets
    pub has_triggers: bool,
}

impl PackageMetadata {
    /// Create new metadata with required fields
    pub fn new(name: impl Into<String>, version: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            release: release.into(),
            ..Self::default()
        }
    }

    /// Add a file entry (builder style, used heavily by tests)
    pub fn with_file(mut self, file: FileEntry) -> Self {
        self.files.push(file);
        self
    }

    /// Add a scriptlet from raw text
    pub fn with_script(mut self, stage: ScriptStage, interpreter: &str, text: &str) -> Self {
        self.scripts
            .insert(stage, ScriptSlot::from_text(stage, interpreter, text));
        self
    }

    /// File name of the RPM the recipe's `addArchive` refers to
    pub fn archive_name(&self) -> String {
        match &self.source_archive {
            Some(name) => name.clone(),
            None => format!(
                "{}-{}-{}.{}.rpm",
                self.name,
                self.version,
                self.release,
                self.architecture.as_deref().unwrap_or("noarch")
            ),
        }
    }

    /// Conary version string: RPM version and release joined with `_`
    ///
    /// Conary versions may not contain `-`, so any inside the RPM fields are
    /// replaced as well.
    pub fn conary_version(&self) -> String {
        let version = self.version.replace('-', "_");
        if self.release.is_empty() {
            version
        } else {
            format!("{}_{}", version, self.release.replace('-', "_"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_name_defaults() {
        let mut meta = PackageMetadata::new("foo", "1.0", "3.el9");
        meta.architecture = Some("x86_64".to_string());
        assert_eq!(meta.archive_name(), "foo-1.0-3.el9.x86_64.rpm");

        meta.source_archive = Some("renamed.rpm".to_string());
        assert_eq!(meta.archive_name(), "renamed.rpm");

        let meta = PackageMetadata::new("bar", "2", "1");
        assert_eq!(meta.archive_name(), "bar-2-1.noarch.rpm");
    }

    #[test]
    fn test_conary_version() {
        assert_eq!(PackageMetadata::new("foo", "1.0", "3").conary_version(), "1.0_3");
        assert_eq!(PackageMetadata::new("foo", "1.0-rc1", "").conary_version(), "1.0_rc1");
    }
}
