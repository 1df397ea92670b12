// src/convert/mod.rs
//! RPM to Conary recipe conversion
//!
//! One conversion pass per package:
//!
//! 1. Header checks: triggers and relocation prefixes become advisories
//! 2. Scriptlet screening: unsupported interpreters, `ld.so.conf` edits and
//!    `RPM_INSTALL_PREFIX` users are dropped with an advisory
//! 3. Rewriting of the surviving scriptlets, capturing accounts on the way
//! 4. File classification into per-file directives
//! 5. Tag handler packaging of whatever scriptlet content is left
//! 6. Recipe assembly, plus info recipes for captured accounts
//!
//! Only a header read failure (or unusable metadata) is an error; everything
//! else lands in the `ConversionReport`.

mod converter;
mod report;

pub use converter::{ConversionResult, RpmConverter};
pub use report::{Advisory, ConversionReport};
