// src/commands/mod.rs
//! Command handlers for the rpm2recipe CLI

mod convert;

pub use convert::{cmd_convert, cmd_show_config};
