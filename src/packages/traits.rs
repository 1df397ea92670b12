// src/packages/traits.rs

//! Per-file and per-scriptlet header records, and the header reader seam

use crate::error::Result;
use crate::packages::common::PackageMetadata;
use std::path::Path;

/// File type mask (S_IFMT)
pub const S_IFMT: u32 = 0o170000;
/// Directory
pub const S_IFDIR: u32 = 0o040000;
/// Character device
pub const S_IFCHR: u32 = 0o020000;
/// Block device
pub const S_IFBLK: u32 = 0o060000;

/// setuid, setgid and sticky bits
pub const SPECIAL_BITS: u32 = 0o7000;
/// Permission bits including the special bits
pub const PERMISSION_BITS: u32 = 0o7777;

/// Metadata about one file shipped by a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path inside the package
    pub path: String,
    /// Type and permission bits, as stored in the header
    pub mode: u32,
    pub owner: String,
    pub group: String,
    /// Packed device number; only meaningful for block/character devices
    pub rdev: Option<u32>,
    /// Marked `%config` in the spec file
    pub config: bool,
}

impl FileEntry {
    /// Create a root-owned entry
    pub fn new(path: impl Into<String>, mode: u32) -> Self {
        Self {
            path: path.into(),
            mode,
            owner: "root".to_string(),
            group: "root".to_string(),
            rdev: None,
            config: false,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>, group: impl Into<String>) -> Self {
        self.owner = owner.into();
        self.group = group.into();
        self
    }

    pub fn with_rdev(mut self, rdev: u32) -> Self {
        self.rdev = Some(rdev);
        self
    }

    pub fn with_config(mut self) -> Self {
        self.config = true;
        self
    }

    #[inline]
    pub fn file_type(&self) -> u32 {
        self.mode & S_IFMT
    }

    #[inline]
    pub fn permissions(&self) -> u32 {
        self.mode & PERMISSION_BITS
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type() == S_IFDIR
    }

    /// Block or character device node
    #[inline]
    pub fn is_device(&self) -> bool {
        matches!(self.file_type(), S_IFCHR | S_IFBLK)
    }

    /// Carries setuid, setgid or sticky bits
    #[inline]
    pub fn has_special_bits(&self) -> bool {
        self.mode & SPECIAL_BITS != 0
    }

    /// Parent directory of this entry, `None` for `/`
    pub fn parent(&self) -> Option<&str> {
        let trimmed = self.path.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(0) if trimmed.len() > 1 => Some("/"),
            Some(0) | None => None,
            Some(idx) => Some(&trimmed[..idx]),
        }
    }
}

/// Lifecycle stage of an RPM scriptlet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScriptStage {
    /// `%pre`
    PreInstall,
    /// `%post`
    PostInstall,
    /// `%preun`
    PreUninstall,
    /// `%postun`
    PostUninstall,
}

impl ScriptStage {
    /// All stages, in the order they are packaged
    pub const ALL: [ScriptStage; 4] = [
        Self::PreInstall,
        Self::PostInstall,
        Self::PreUninstall,
        Self::PostUninstall,
    ];

    /// Short suffix used to name wrapped scriptlet files
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::PreInstall => "preinstall",
            Self::PostInstall => "postinstall",
            Self::PreUninstall => "preuninstall",
            Self::PostUninstall => "postuninstall",
        }
    }

    /// Whether the stage runs on install/update (as opposed to removal)
    pub fn is_install(&self) -> bool {
        matches!(self, Self::PreInstall | Self::PostInstall)
    }

    /// Value RPM passes as `$1`: instance count after the operation
    pub fn rpm_argument(&self) -> u8 {
        if self.is_install() { 1 } else { 0 }
    }
}

impl std::fmt::Display for ScriptStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreInstall => write!(f, "pre-install"),
            Self::PostInstall => write!(f, "post-install"),
            Self::PreUninstall => write!(f, "pre-uninstall"),
            Self::PostUninstall => write!(f, "post-uninstall"),
        }
    }
}

/// A scriptlet from the package header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSlot {
    pub stage: ScriptStage,
    /// Interpreter declared in the header (e.g. "/bin/sh", "<lua>")
    pub interpreter: String,
    /// Logical lines, continuations already joined
    pub lines: Vec<String>,
}

impl ScriptSlot {
    /// Build a slot from raw script text, joining backslash continuations
    pub fn from_text(stage: ScriptStage, interpreter: impl Into<String>, text: &str) -> Self {
        Self {
            stage,
            interpreter: interpreter.into(),
            lines: join_continuations(text),
        }
    }

    /// True when no line carries anything but whitespace
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    /// Newline-joined body
    pub fn body(&self) -> String {
        let mut body = self.lines.join("\n");
        body.push('\n');
        body
    }
}

/// Split script text into logical lines
///
/// A line ending in an unescaped backslash is joined with the next one; the
/// backslash-newline pair is dropped the way the shell drops it.
pub fn join_continuations(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending = String::new();

    for raw in text.lines() {
        let trailing = raw.chars().rev().take_while(|c| *c == '\\').count();
        if trailing % 2 == 1 {
            pending.push_str(&raw[..raw.len() - 1]);
            continue;
        }
        pending.push_str(raw);
        lines.push(std::mem::take(&mut pending));
    }

    if !pending.is_empty() {
        lines.push(pending);
    }

    lines
}

/// Produces `PackageMetadata` from a package on disk
///
/// Implementations must fail before returning any partial metadata.
pub trait HeaderReader {
    fn read_header(&self, path: &Path) -> Result<PackageMetadata>;
}
