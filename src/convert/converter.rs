// src/convert/converter.rs
//! RPM header to Conary recipe converter
//!
//! `RpmConverter` holds configuration only. Each call to `convert` runs a
//! fresh `ConversionPass` that owns every piece of per-package state, so
//! converting a batch of packages with one converter cannot leak scriptlets,
//! accounts or advisories from one package into the next.

use crate::config::ImportConfig;
use crate::convert::report::{Advisory, ConversionReport};
use crate::error::{Error, Result};
use crate::hash::MarkerSource;
use crate::packages::{HeaderReader, PackageMetadata, ScriptSlot, ScriptStage};
use crate::recipe::{
    render_info_recipes, write_atomic, FileClassifier, InfoRecipe, RecipeAssembler,
    RecipeDocument, TagHandlerPackager,
};
use crate::scriptlet::{edits_ld_config, uses_install_prefix, ScriptRewriter};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Output of converting one package
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub document: RecipeDocument,
    /// One per captured account with a preferred id
    pub info_recipes: Vec<InfoRecipe>,
    pub report: ConversionReport,
}

impl ConversionResult {
    /// Write every artifact into `dir`: info recipes, then the document's
    /// side files, then the package recipe
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for recipe in &self.info_recipes {
            written.push(write_atomic(dir, &recipe.file_name(), &recipe.text)?);
        }
        written.extend(self.document.write_to(dir)?);

        info!(
            "Wrote {} artifact(s) for {} to {}",
            written.len(),
            self.document.name,
            dir.display()
        );
        Ok(written)
    }
}

/// Converts RPM headers to Conary recipes
#[derive(Debug, Clone)]
pub struct RpmConverter {
    config: ImportConfig,
    marker: MarkerSource,
    rewriter: ScriptRewriter,
    assembler: RecipeAssembler,
}

impl Default for RpmConverter {
    fn default() -> Self {
        Self::new(ImportConfig::default())
    }
}

impl RpmConverter {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            marker: MarkerSource::default(),
            rewriter: ScriptRewriter::new(),
            assembler: RecipeAssembler::new(),
        }
    }

    /// Use a fixed marker payload instead of random bytes
    pub fn with_marker_source(mut self, marker: MarkerSource) -> Self {
        self.marker = marker;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Read a package with `reader` and convert it
    ///
    /// A header that cannot be read fails here, before anything exists to be
    /// written.
    pub fn convert_file(&self, path: &Path, reader: &dyn HeaderReader) -> Result<ConversionResult> {
        let meta = reader.read_header(path)?;
        self.convert(&meta)
    }

    /// Convert already parsed metadata
    pub fn convert(&self, meta: &PackageMetadata) -> Result<ConversionResult> {
        validate_metadata(meta)?;
        info!("Converting {}-{}-{}", meta.name, meta.version, meta.release);
        Ok(ConversionPass::new(self, meta).run())
    }
}

fn validate_metadata(meta: &PackageMetadata) -> Result<()> {
    if meta.name.trim().is_empty() {
        return Err(Error::InvalidMetadata("package name is empty".to_string()));
    }
    if meta.version.trim().is_empty() {
        return Err(Error::InvalidMetadata(format!(
            "package {} has no version",
            meta.name
        )));
    }

    let mut seen = HashSet::new();
    for file in &meta.files {
        if !seen.insert(file.path.as_str()) {
            return Err(Error::InvalidMetadata(format!(
                "duplicate file path {}",
                file.path
            )));
        }
    }
    Ok(())
}

/// State of converting a single package
struct ConversionPass<'a> {
    converter: &'a RpmConverter,
    meta: &'a PackageMetadata,
    scripts: BTreeMap<ScriptStage, ScriptSlot>,
    report: ConversionReport,
}

impl<'a> ConversionPass<'a> {
    fn new(converter: &'a RpmConverter, meta: &'a PackageMetadata) -> Self {
        Self {
            converter,
            meta,
            scripts: BTreeMap::new(),
            report: ConversionReport::default(),
        }
    }

    fn run(mut self) -> ConversionResult {
        let converter = self.converter;
        let meta = self.meta;
        let config = &converter.config;

        if meta.has_triggers {
            warn!("{}: trigger scriptlets are not converted", meta.name);
            self.report.add(Advisory::TriggerPresent);
        }
        if !meta.prefixes.is_empty() {
            warn!(
                "{}: relocatable package, using default prefixes",
                meta.name
            );
            self.report.add(Advisory::RelocationRequired {
                prefixes: meta.prefixes.clone(),
            });
        }

        for stage in ScriptStage::ALL {
            if let Some(slot) = meta.scripts.get(&stage) {
                self.screen_and_rewrite(slot.clone());
            }
        }

        let classifier = FileClassifier::from_ownership(&config.ownership);
        let file_directives = classifier.classify(&meta.files);

        let packager = TagHandlerPackager::new(config.layout.clone(), converter.marker.clone());
        let handler = packager.package(&meta.name, &self.scripts);

        let document = converter.assembler.assemble(meta, file_directives, handler);

        let info_recipes = self.info_recipes();

        debug!(
            "{}: {} directive(s), {} side file(s), {} info recipe(s), {} advisory(ies)",
            meta.name,
            document.directives.len(),
            document.side_files.len(),
            info_recipes.len(),
            self.report.advisories.len()
        );

        ConversionResult {
            document,
            info_recipes,
            report: self.report,
        }
    }

    fn screen_and_rewrite(&mut self, mut slot: ScriptSlot) {
        let converter = self.converter;
        let stage = slot.stage;
        let allowed = &converter.config.scripts.allowed_interpreters;

        if !allowed.iter().any(|i| *i == slot.interpreter) {
            warn!("{}: unsupported interpreter {}", stage, slot.interpreter);
            self.report.add(Advisory::UnsupportedInterpreter {
                stage,
                interpreter: slot.interpreter.clone(),
            });
            return;
        }
        if slot.lines.iter().any(|l| edits_ld_config(l)) {
            warn!("{}: scriptlet edits ld.so.conf, dropping it", stage);
            self.report.add(Advisory::LdConfigEdit { stage });
            return;
        }
        if slot.lines.iter().any(|l| uses_install_prefix(l)) {
            warn!("{}: scriptlet uses RPM_INSTALL_PREFIX, dropping it", stage);
            self.report.add(Advisory::InstallPrefixReference { stage });
            return;
        }

        let rewrite = converter.rewriter.rewrite_slot(&mut slot);
        self.report.substitutions += rewrite.substitutions;
        for rejected in rewrite.rejected {
            self.report.add(Advisory::MalformedAccountCommand {
                stage,
                line: rejected.line,
                reason: rejected.error,
            });
        }
        for record in rewrite.accounts {
            self.report.add_account(record);
        }

        if slot.is_blank() {
            debug!("{}: nothing left after rewriting", stage);
            return;
        }
        self.scripts.insert(stage, slot);
    }

    fn info_recipes(&mut self) -> Vec<InfoRecipe> {
        let rendered = render_info_recipes(&self.report.accounts);
        for record in rendered.without_id {
            self.report.add(Advisory::AccountWithoutId {
                kind: record.kind,
                name: record.name,
            });
        }

        if self.converter.config.scripts.info_recipes {
            rendered.recipes
        } else {
            Vec::new()
        }
    }
}
