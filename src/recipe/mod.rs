// src/recipe/mod.rs

//! Conary recipe generation
//!
//! A converted package becomes a `PackageRecipe` that imports the RPM payload
//! unchanged and then describes, directive by directive, what the payload
//! alone cannot say: ownership, devices, special modes, config files and
//! directories Conary would otherwise drop. Scriptlets ride along as a tag
//! handler.
//!
//! Directive order is always:
//! 1. archive import, component spec and the policy exception block
//! 2. per-file directives in header order
//! 3. tag handler directives
//!
//! # Example Output
//!
//! ```text
//! class FooRecipe(PackageRecipe):
//!     name = 'foo'
//!     version = '1.0_3'
//!
//!     def setup(r):
//!         r.addArchive('foo-1.0-3.x86_64.rpm', dir='/')
//!         r.ComponentSpec('runtime', '.*')
//!         r.NormalizeCompression(exceptions='.*')
//!         ...
//!         r.Config('/etc/foo\\.conf')
//!         r.addSource('foo-rpm-scriptlets.taghandler', ...)
//! ```

pub mod files;
pub mod format;
pub mod info;
pub mod taghandler;

pub use files::{compose_rdev, decompose_rdev, FileClassifier};
pub use format::{DeviceKind, Directive};
pub use info::{render_info_recipe, render_info_recipes, InfoRecipe, InfoRecipes};
pub use taghandler::{SideFile, SideFileKind, TagHandlerOutput, TagHandlerPackager};

use crate::error::Result;
use crate::packages::PackageMetadata;
use format::{class_name, quote, SETUP_INDENT};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Component every imported file lands in
pub const DEFAULT_COMPONENT: &str = "runtime";

/// A complete recipe plus the files it pulls in with `r.addSource`
#[derive(Debug, Clone)]
pub struct RecipeDocument {
    pub class_name: String,
    pub name: String,
    pub version: String,
    pub directives: Vec<Directive>,
    pub side_files: Vec<SideFile>,
}

impl RecipeDocument {
    /// `<name>.recipe`
    pub fn file_name(&self) -> String {
        format!("{}.recipe", self.name)
    }

    /// Recipe source text
    pub fn render(&self) -> String {
        let mut text = String::new();
        text.push_str(&format!("class {}(PackageRecipe):\n", self.class_name));
        text.push_str(&format!("    name = {}\n", quote(&self.name)));
        text.push_str(&format!("    version = {}\n", quote(&self.version)));
        text.push('\n');
        text.push_str("    def setup(r):\n");
        for directive in &self.directives {
            text.push_str(SETUP_INDENT);
            text.push_str(&directive.to_string());
            text.push('\n');
        }
        text
    }

    /// Write side files, then the recipe, into `dir`
    ///
    /// Returns the written paths in write order.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(self.side_files.len() + 1);
        for side in &self.side_files {
            written.push(write_atomic(dir, &side.name, &side.contents)?);
        }
        written.push(write_atomic(dir, &self.file_name(), &self.render())?);
        Ok(written)
    }
}

/// Write `contents` to `dir/name` through a temp file in the same directory
pub fn write_atomic(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(contents.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(&path).map_err(|e| e.error)?;

    debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(path)
}

/// Puts the recipe together in its fixed order
#[derive(Debug, Default, Clone, Copy)]
pub struct RecipeAssembler;

impl RecipeAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Archive import, component spec and policy exceptions
    pub fn preamble(&self, meta: &PackageMetadata) -> Vec<Directive> {
        let mut directives = vec![
            Directive::AddArchive {
                archive: meta.archive_name(),
            },
            Directive::ComponentSpec {
                component: DEFAULT_COMPONENT.to_string(),
                pattern: ".*".to_string(),
            },
        ];
        directives.extend(Directive::policy_exceptions());
        directives
    }

    pub fn assemble(
        &self,
        meta: &PackageMetadata,
        file_directives: Vec<Directive>,
        handler: Option<TagHandlerOutput>,
    ) -> RecipeDocument {
        let mut directives = self.preamble(meta);
        directives.extend(file_directives);

        let side_files = match handler {
            Some(handler) => {
                directives.extend(handler.directives);
                handler.side_files
            }
            None => Vec::new(),
        };

        RecipeDocument {
            class_name: class_name(&meta.name, "Recipe"),
            name: meta.name.clone(),
            version: meta.conary_version(),
            directives,
            side_files,
        }
    }
}
