// src/convert/report.rs
//! Conversion advisories
//!
//! Anything the importer could not carry over faithfully ends up here rather
//! than failing the conversion. The report is meant to be read by whoever
//! reviews the generated recipe.

use crate::packages::ScriptStage;
use crate::scriptlet::{AccountError, AccountKind, AccountRecord};
use std::fmt;

/// One thing the recipe does not express
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// An account creation line that did not yield a record
    MalformedAccountCommand {
        stage: ScriptStage,
        line: String,
        reason: AccountError,
    },
    /// Scriptlet interpreter not accepted; the stage was dropped
    UnsupportedInterpreter {
        stage: ScriptStage,
        interpreter: String,
    },
    /// Package is relocatable; the recipe installs at the default prefixes
    RelocationRequired { prefixes: Vec<String> },
    /// Scriptlet used `RPM_INSTALL_PREFIX`; the stage was dropped
    InstallPrefixReference { stage: ScriptStage },
    /// Scriptlet edits the dynamic linker configuration; the stage was dropped
    LdConfigEdit { stage: ScriptStage },
    /// Header carries trigger scriptlets, which are never converted
    TriggerPresent,
    /// Captured account has no preferred id, so no info recipe was written
    AccountWithoutId { kind: AccountKind, name: String },
}

impl Advisory {
    /// Short category label for summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::MalformedAccountCommand { .. } => "ACCOUNT",
            Self::UnsupportedInterpreter { .. } => "INTERPRETER",
            Self::RelocationRequired { .. } | Self::InstallPrefixReference { .. } => "RELOCATION",
            Self::LdConfigEdit { .. } => "LDCONFIG",
            Self::TriggerPresent => "TRIGGER",
            Self::AccountWithoutId { .. } => "ACCOUNT",
        }
    }

    /// Whether the advisory cost a whole scriptlet
    pub fn discards_script(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedInterpreter { .. }
                | Self::InstallPrefixReference { .. }
                | Self::LdConfigEdit { .. }
        )
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedAccountCommand {
                stage,
                line,
                reason,
            } => write!(
                f,
                "{}: account command not captured ({}): {}",
                stage,
                reason,
                line.trim()
            ),
            Self::UnsupportedInterpreter { stage, interpreter } => write!(
                f,
                "{}: interpreter '{}' not supported, scriptlet dropped",
                stage, interpreter
            ),
            Self::RelocationRequired { prefixes } => write!(
                f,
                "package is relocatable (prefixes: {}); recipe uses the default locations",
                prefixes.join(", ")
            ),
            Self::InstallPrefixReference { stage } => write!(
                f,
                "{}: scriptlet depends on RPM_INSTALL_PREFIX, scriptlet dropped",
                stage
            ),
            Self::LdConfigEdit { stage } => write!(
                f,
                "{}: scriptlet edits /etc/ld.so.conf, scriptlet dropped",
                stage
            ),
            Self::TriggerPresent => write!(f, "package has trigger scriptlets; they are not converted"),
            Self::AccountWithoutId { kind, name } => write!(
                f,
                "{} '{}' has no preferred id; no info recipe written",
                kind, name
            ),
        }
    }
}

/// Advisories and captured accounts of one conversion
#[derive(Debug, Clone, Default)]
pub struct ConversionReport {
    pub advisories: Vec<Advisory>,
    /// Accounts captured from scriptlets, first occurrence wins
    pub accounts: Vec<AccountRecord>,
    /// Command words replaced across all scriptlets
    pub substitutions: usize,
}

impl ConversionReport {
    pub fn is_empty(&self) -> bool {
        self.advisories.is_empty() && self.accounts.is_empty()
    }

    pub fn add(&mut self, advisory: Advisory) {
        self.advisories.push(advisory);
    }

    /// Record an account unless one of the same kind and name is known
    pub fn add_account(&mut self, record: AccountRecord) -> bool {
        let known = self
            .accounts
            .iter()
            .any(|a| a.kind == record.kind && a.name == record.name);
        if !known {
            self.accounts.push(record);
        }
        !known
    }

    /// Stages dropped by an advisory
    pub fn discarded_stages(&self) -> Vec<ScriptStage> {
        self.advisories
            .iter()
            .filter(|a| a.discards_script())
            .filter_map(|a| match a {
                Advisory::UnsupportedInterpreter { stage, .. }
                | Advisory::InstallPrefixReference { stage }
                | Advisory::LdConfigEdit { stage } => Some(*stage),
                _ => None,
            })
            .collect()
    }

    /// Print a summary of the conversion notes
    pub fn print_summary(&self, package: &str) {
        if self.is_empty() {
            return;
        }

        println!("  Conversion notes for {}:", package);

        for advisory in &self.advisories {
            println!("    [{}] {}", advisory.label(), advisory);
        }

        for account in &self.accounts {
            match account.preferred_id() {
                Some(id) => println!("    [CAPTURED] {} {} ({})", account.kind, account.name, id),
                None => println!("    [CAPTURED] {} {}", account.kind, account.name),
            }
        }
    }
}
