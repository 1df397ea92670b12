// src/packages/rpm.rs

//! RPM header reader
//!
//! Reads just enough of an RPM header to build a recipe: name/version/release,
//! the file list with modes, ownership, device numbers and config flags, the
//! four install/erase scriptlets, relocation prefixes and trigger presence.
//! Payload contents are never touched; the recipe imports the RPM itself.

use crate::error::{Error, Result};
use crate::packages::common::PackageMetadata;
use crate::packages::traits::{FileEntry, HeaderReader, ScriptSlot, ScriptStage};
use rpm::{FileFlags, IndexTag, Package};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Interpreter RPM assumes when a scriptlet declares none
const DEFAULT_INTERPRETER: &str = "/bin/sh";

/// Header reader backed by the `rpm` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct RpmHeaderReader;

impl RpmHeaderReader {
    pub fn new() -> Self {
        Self
    }

    fn extract_scripts(pkg: &Package, meta: &mut PackageMetadata) -> Result<()> {
        let scripts = [
            (ScriptStage::PreInstall, pkg.metadata.get_pre_install_script()),
            (ScriptStage::PostInstall, pkg.metadata.get_post_install_script()),
            (ScriptStage::PreUninstall, pkg.metadata.get_pre_uninstall_script()),
            (ScriptStage::PostUninstall, pkg.metadata.get_post_uninstall_script()),
        ];

        for (stage, result) in scripts {
            if let Some(slot) = scriptlet_slot(stage, result)? {
                meta.scripts.insert(stage, slot);
            }
        }
        Ok(())
    }

    fn extract_files(pkg: &Package) -> Result<Vec<FileEntry>> {
        // Fileless packages have no file tags at all
        let header = &pkg.metadata.header;
        if !header.entry_is_present(IndexTag::RPMTAG_BASENAMES)
            && !header.entry_is_present(IndexTag::RPMTAG_OLDFILENAMES)
        {
            return Ok(Vec::new());
        }

        let entries = pkg
            .metadata
            .get_file_entries()
            .map_err(|e| Error::HeaderRead(format!("file list: {}", e)))?;

        let rdevs = pkg
            .metadata
            .header
            .get_entry_data_as_u16_array(IndexTag::RPMTAG_FILERDEVS)
            .unwrap_or_default();
        let rdevs = if rdevs.len() == entries.len() {
            rdevs
        } else {
            Vec::new()
        };

        let files = entries
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| {
                let mut file = FileEntry::new(
                    entry.path.to_string_lossy().to_string(),
                    u32::from(entry.mode.raw_mode()),
                )
                .with_owner(entry.ownership.user, entry.ownership.group);
                if entry.flags.contains(FileFlags::CONFIG) {
                    file.config = true;
                }
                if file.is_device() {
                    file.rdev = rdevs.get(idx).map(|r| u32::from(*r));
                }
                file
            })
            .collect();

        Ok(files)
    }

    fn has_triggers(pkg: &Package) -> bool {
        [
            IndexTag::RPMTAG_TRIGGERSCRIPTS,
            IndexTag::RPMTAG_FILETRIGGERSCRIPTS,
            IndexTag::RPMTAG_TRANSFILETRIGGERSCRIPTS,
        ]
        .into_iter()
        .any(|tag| pkg.metadata.header.entry_is_present(tag))
    }
}

/// Turn one scriptlet lookup into a slot
///
/// An absent tag or an empty body means the stage has no scriptlet; any
/// other lookup failure is a broken header.
fn scriptlet_slot(
    stage: ScriptStage,
    result: std::result::Result<rpm::Scriptlet, rpm::Error>,
) -> Result<Option<ScriptSlot>> {
    let scriptlet = match result {
        Ok(s) => s,
        Err(rpm::Error::TagNotFound(_) | rpm::Error::ScriptletNotFound) => return Ok(None),
        Err(e) => return Err(Error::HeaderRead(format!("{} scriptlet: {}", stage, e))),
    };
    if scriptlet.script.trim().is_empty() {
        return Ok(None);
    }

    let interpreter = scriptlet
        .program
        .and_then(|progs| progs.into_iter().next())
        .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string());
    Ok(Some(ScriptSlot::from_text(stage, interpreter, &scriptlet.script)))
}

impl HeaderReader for RpmHeaderReader {
    fn read_header(&self, path: &Path) -> Result<PackageMetadata> {
        debug!("Reading RPM header: {}", path.display());

        let file = File::open(path)
            .map_err(|e| Error::HeaderRead(format!("{}: {}", path.display(), e)))?;
        let mut reader = BufReader::new(file);
        let pkg = Package::parse(&mut reader)
            .map_err(|e| Error::HeaderRead(format!("{}: {}", path.display(), e)))?;

        let name = pkg
            .metadata
            .get_name()
            .map_err(|e| Error::HeaderRead(format!("package name: {}", e)))?
            .to_string();
        let version = pkg
            .metadata
            .get_version()
            .map_err(|e| Error::HeaderRead(format!("package version: {}", e)))?
            .to_string();
        let release = pkg
            .metadata
            .get_release()
            .map_err(|e| Error::HeaderRead(format!("package release: {}", e)))?
            .to_string();

        let mut meta = PackageMetadata::new(name, version, release);
        meta.architecture = pkg.metadata.get_arch().ok().map(|s| s.to_string());
        meta.source_archive = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        meta.files = Self::extract_files(&pkg)?;
        meta.prefixes = pkg
            .metadata
            .header
            .get_entry_data_as_string_array(IndexTag::RPMTAG_PREFIXES)
            .map(|p| p.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();
        meta.has_triggers = Self::has_triggers(&pkg);
        Self::extract_scripts(&pkg, &mut meta)?;

        debug!(
            "Parsed RPM header: {}-{}-{} ({} files, {} scriptlets, triggers: {})",
            meta.name,
            meta.version,
            meta.release,
            meta.files.len(),
            meta.scripts.len(),
            meta.has_triggers
        );

        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_nonexistent_file() {
        let result = RpmHeaderReader::new().read_header(Path::new("/nonexistent/file.rpm"));
        assert!(matches!(result, Err(Error::HeaderRead(_))));
    }

    #[test]
    fn test_missing_scriptlet_skipped() {
        let missing = Err(rpm::Error::TagNotFound("RPMTAG_POSTIN".to_string()));
        assert!(scriptlet_slot(ScriptStage::PostInstall, missing).unwrap().is_none());

        let blank = Ok(rpm::Scriptlet::new("  \n"));
        assert!(scriptlet_slot(ScriptStage::PostInstall, blank).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_scriptlet_is_header_error() {
        let corrupt = Err(rpm::Error::UnexpectedTagDataType {
            expected_data_type: "string",
            actual_data_type: "int32".to_string(),
            tag: "RPMTAG_PREUN".to_string(),
        });
        let err = scriptlet_slot(ScriptStage::PreUninstall, corrupt).unwrap_err();
        assert!(matches!(err, Error::HeaderRead(ref msg) if msg.starts_with("pre-uninstall scriptlet")));
    }

    #[test]
    fn test_scriptlet_interpreter() {
        let slot = scriptlet_slot(ScriptStage::PreInstall, Ok(rpm::Scriptlet::new("exit 0")))
            .unwrap()
            .unwrap();
        assert_eq!(slot.interpreter, "/bin/sh");
        assert_eq!(slot.lines, vec!["exit 0"]);

        let mut lua = rpm::Scriptlet::new("print('x')");
        lua.program = Some(vec!["<lua>".to_string()]);
        let slot = scriptlet_slot(ScriptStage::PreInstall, Ok(lua)).unwrap().unwrap();
        assert_eq!(slot.interpreter, "<lua>");
    }

    #[test]
    fn test_read_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.rpm");
        std::fs::write(&path, b"definitely not an rpm").unwrap();

        let result = RpmHeaderReader::new().read_header(&path);
        assert!(matches!(result, Err(Error::HeaderRead(_))));
    }
}
