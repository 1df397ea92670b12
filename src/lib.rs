// src/lib.rs

//! RPM to Conary recipe importer
//!
//! Turns the header of an RPM package (file list, modes, ownership, device
//! nodes, config flags and scriptlets) into a Conary `PackageRecipe` that
//! imports the RPM payload as-is.
//!
//! # Architecture
//!
//! - `packages`: header model and the `rpm`-crate backed reader
//! - `scriptlet`: line classifier/rewriter and account command extraction
//! - `recipe`: directives, file classification, tag handler packaging,
//!   info recipes and assembly
//! - `convert`: the per-package conversion pass and its report
//! - `config`: TOML import configuration

pub mod config;
pub mod convert;
mod error;
pub mod hash;
pub mod packages;
pub mod recipe;
pub mod scriptlet;

pub use config::ImportConfig;
pub use convert::{Advisory, ConversionReport, ConversionResult, RpmConverter};
pub use error::{Error, Result};
pub use hash::MarkerSource;
pub use packages::{FileEntry, HeaderReader, PackageMetadata, RpmHeaderReader, ScriptSlot, ScriptStage};
pub use recipe::{Directive, RecipeAssembler, RecipeDocument};
pub use scriptlet::{AccountKind, AccountRecord, ScriptRewriter};
