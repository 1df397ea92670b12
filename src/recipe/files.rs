// src/recipe/files.rs

//! Per-file recipe directives
//!
//! Conary packages directories only when asked to. A directory from the RPM
//! header therefore needs an explicit `ExcludeDirectories` exception when it
//! carries non-default permissions or ownership, or when nothing else in the
//! package would make it exist (an empty directory). A directory is empty
//! when no entry, file or directory, lies anywhere below it; every other
//! directory is implied by its contents and stays out of the recipe.

use crate::config::OwnershipSection;
use crate::packages::traits::{FileEntry, S_IFBLK};
use crate::recipe::format::{DeviceKind, Directive};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Split a packed device number into (major, minor)
///
/// Major lives in bits 8-19; the minor's low byte in bits 0-7 and the rest
/// from bit 20 up.
pub fn decompose_rdev(rdev: u32) -> (u32, u32) {
    let major = (rdev >> 8) & 0xfff;
    let minor = (rdev & 0xff) | ((rdev >> 12) & 0xfff00);
    (major, minor)
}

/// Pack (major, minor) into a device number; inverse of `decompose_rdev`
pub fn compose_rdev(major: u32, minor: u32) -> u32 {
    (minor & 0xff) | ((major & 0xfff) << 8) | ((minor & !0xff) << 12)
}

/// Turns header file entries into ordered recipe directives
#[derive(Debug, Clone)]
pub struct FileClassifier {
    owner: String,
    group: String,
    dir_mode: u32,
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::from_ownership(&OwnershipSection::default())
    }
}

impl FileClassifier {
    pub fn new(owner: impl Into<String>, group: impl Into<String>, dir_mode: u32) -> Self {
        Self {
            owner: owner.into(),
            group: group.into(),
            dir_mode,
        }
    }

    /// Classifier using the configured default identity and directory mode
    pub fn from_ownership(ownership: &OwnershipSection) -> Self {
        Self::new(
            ownership.owner.clone(),
            ownership.group.clone(),
            ownership.dir_mode,
        )
    }

    fn has_default_owner(&self, file: &FileEntry) -> bool {
        file.owner == self.owner && file.group == self.group
    }

    /// Classify entries in header order
    ///
    /// Per-file directives come out in the order of `files`; the inclusion
    /// overrides for empty directories follow at the end. Every entry fills
    /// all of its ancestors, including ones the header does not list.
    pub fn classify(&self, files: &[FileEntry]) -> Vec<Directive> {
        let mut directives = Vec::new();
        let mut directories: Vec<&str> = Vec::new();
        let mut included: HashSet<&str> = HashSet::new();
        let mut filled: HashSet<&str> = HashSet::new();

        for file in files {
            let path = file.path.as_str();

            if !self.has_default_owner(file) {
                directives.push(Directive::Ownership {
                    owner: file.owner.clone(),
                    group: file.group.clone(),
                    path: path.to_string(),
                });
            }

            let mut ancestor = file.parent();
            while let Some(dir) = ancestor {
                if !filled.insert(dir) {
                    break;
                }
                ancestor = parent_of(dir);
            }

            if file.is_dir() {
                directories.push(path);
                if file.permissions() != self.dir_mode || !self.has_default_owner(file) {
                    debug!("Including directory {} ({:o})", path, file.permissions());
                    included.insert(path);
                    directives.push(Directive::IncludeDirectory {
                        path: path.to_string(),
                    });
                }
            }

            if file.is_device() {
                directives.push(self.device_directive(file));
            } else if file.has_special_bits() {
                directives.push(Directive::SetModes {
                    path: path.to_string(),
                    mode: file.permissions(),
                });
            }

            if file.config {
                directives.push(Directive::Config {
                    path: path.to_string(),
                });
            }
        }

        for dir in directories {
            if !included.contains(dir) && !filled.contains(dir) {
                debug!("Including empty directory {}", dir);
                directives.push(Directive::IncludeDirectory {
                    path: dir.to_string(),
                });
            }
        }

        directives
    }

    fn device_directive(&self, file: &FileEntry) -> Directive {
        let rdev = file.rdev.unwrap_or_else(|| {
            warn!("Device {} has no device number; using 0,0", file.path);
            0
        });
        let (major, minor) = decompose_rdev(rdev);
        let kind = if file.file_type() == S_IFBLK {
            DeviceKind::Block
        } else {
            DeviceKind::Character
        };

        Directive::MakeDevice {
            path: file.path.clone(),
            kind,
            major,
            minor,
            owner: file.owner.clone(),
            group: file.group.clone(),
            mode: file.permissions(),
        }
    }
}

fn parent_of(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) if trimmed.len() > 1 => Some("/"),
        Some(0) | None => None,
        Some(idx) => Some(&trimmed[..idx]),
    }
}
