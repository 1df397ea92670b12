// src/packages/mod.rs

//! Package header model and readers
//!
//! The converter works on `PackageMetadata`; `RpmHeaderReader` produces it
//! from an `.rpm` file. Anything implementing `HeaderReader` can stand in.

pub mod common;
pub mod rpm;
pub mod traits;

pub use common::PackageMetadata;
pub use self::rpm::RpmHeaderReader;
pub use traits::{FileEntry, HeaderReader, ScriptSlot, ScriptStage};
