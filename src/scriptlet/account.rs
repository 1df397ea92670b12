// src/scriptlet/account.rs

//! Account intent extraction from `useradd` / `groupadd` invocations
//!
//! Scriptlets create accounts with free-form shell commands. This module
//! turns one such command into an `AccountRecord` when, and only when, every
//! flag on the line is understood. Anything unusual (an unknown flag, shell
//! expansion in a value, a stray argument) rejects the whole record: a
//! missing account is easier to notice than a wrong one.
//!
//! `useradd` and `groupadd` accept different options and are handled with
//! separate flag tables.

use std::collections::BTreeMap;
use thiserror::Error;

/// Whether a record describes a user or a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    User,
    Group,
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Group => write!(f, "group"),
        }
    }
}

/// Attributes captured from account-creation flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccountAttribute {
    Comment,
    HomeDir,
    /// Requested uid or gid
    PreferredId,
    Shell,
    /// Primary group of a user
    PrimaryGroup,
}

/// Account creation intent captured from a scriptlet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub kind: AccountKind,
    pub name: String,
    pub attributes: BTreeMap<AccountAttribute, String>,
}

impl AccountRecord {
    pub fn new(kind: AccountKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn get(&self, attr: AccountAttribute) -> Option<&str> {
        self.attributes.get(&attr).map(String::as_str)
    }

    pub fn comment(&self) -> Option<&str> {
        self.get(AccountAttribute::Comment)
    }

    pub fn home_dir(&self) -> Option<&str> {
        self.get(AccountAttribute::HomeDir)
    }

    pub fn shell(&self) -> Option<&str> {
        self.get(AccountAttribute::Shell)
    }

    pub fn primary_group(&self) -> Option<&str> {
        self.get(AccountAttribute::PrimaryGroup)
    }

    /// Preferred uid/gid; validated as numeric when the record was built
    pub fn preferred_id(&self) -> Option<u32> {
        self.get(AccountAttribute::PreferredId)
            .and_then(|id| id.parse().ok())
    }
}

/// Why an account command produced no record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("unbalanced quoting")]
    Unparseable,

    #[error("no useradd or groupadd invocation")]
    NotAccountCommand,

    #[error("{tool}: unknown option '{flag}'")]
    UnknownFlag { tool: &'static str, flag: String },

    #[error("{tool}: option '{flag}' requires a value")]
    MissingValue { tool: &'static str, flag: String },

    #[error("{tool}: no account name")]
    MissingName { tool: &'static str },

    #[error("{tool}: unexpected argument '{arg}'")]
    UnexpectedArgument { tool: &'static str, arg: String },

    #[error("unexpanded shell expression '{0}'")]
    ShellExpansion(String),

    #[error("invalid numeric id '{0}'")]
    InvalidId(String),
}

/// How a recognized flag is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagRule {
    /// Value is stored under the attribute
    Mapped(AccountAttribute),
    /// Understood, but irrelevant to the record
    Ignored,
}

#[derive(Debug, Clone, Copy)]
struct FlagSpec {
    rule: FlagRule,
    takes_value: bool,
}

const fn mapped(attr: AccountAttribute) -> FlagSpec {
    FlagSpec {
        rule: FlagRule::Mapped(attr),
        takes_value: true,
    }
}

const IGNORED: FlagSpec = FlagSpec {
    rule: FlagRule::Ignored,
    takes_value: false,
};

/// Account-creation tools we extract from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountTool {
    UserAdd,
    GroupAdd,
}

impl AccountTool {
    pub fn command(&self) -> &'static str {
        match self {
            Self::UserAdd => "useradd",
            Self::GroupAdd => "groupadd",
        }
    }

    pub fn kind(&self) -> AccountKind {
        match self {
            Self::UserAdd => AccountKind::User,
            Self::GroupAdd => AccountKind::Group,
        }
    }

    fn from_command(word: &str) -> Option<Self> {
        match word.rsplit('/').next().unwrap_or(word) {
            "useradd" => Some(Self::UserAdd),
            "groupadd" => Some(Self::GroupAdd),
            _ => None,
        }
    }

    fn short_flag(&self, flag: char) -> Option<FlagSpec> {
        use AccountAttribute::*;
        match (self, flag) {
            (Self::UserAdd, 'c') => Some(mapped(Comment)),
            (Self::UserAdd, 'd') => Some(mapped(HomeDir)),
            (Self::UserAdd, 'u') => Some(mapped(PreferredId)),
            (Self::UserAdd, 's') => Some(mapped(Shell)),
            (Self::UserAdd, 'g') => Some(mapped(PrimaryGroup)),
            (Self::UserAdd, 'r' | 'm' | 'M' | 'n' | 'o' | 'l') => Some(IGNORED),

            (Self::GroupAdd, 'g') => Some(mapped(PreferredId)),
            (Self::GroupAdd, 'r' | 'f' | 'o') => Some(IGNORED),
            _ => None,
        }
    }

    fn long_flag(&self, name: &str) -> Option<char> {
        match (self, name) {
            (Self::UserAdd, "comment") => Some('c'),
            (Self::UserAdd, "home-dir" | "home") => Some('d'),
            (Self::UserAdd, "uid") => Some('u'),
            (Self::UserAdd, "shell") => Some('s'),
            (Self::UserAdd, "gid") => Some('g'),
            (Self::UserAdd, "system") => Some('r'),
            (Self::UserAdd, "create-home") => Some('m'),
            (Self::UserAdd, "no-create-home") => Some('M'),
            (Self::UserAdd, "non-unique") => Some('o'),
            (Self::UserAdd, "no-log-init") => Some('l'),

            (Self::GroupAdd, "gid") => Some('g'),
            (Self::GroupAdd, "system") => Some('r'),
            (Self::GroupAdd, "force") => Some('f'),
            (Self::GroupAdd, "non-unique") => Some('o'),
            _ => None,
        }
    }
}

/// Tokens that end the account command: redirections and list operators
fn is_terminator(token: &str) -> bool {
    matches!(token, "|" | "||" | "&&" | "&" | ";")
        || token.starts_with('>')
        || token.starts_with('<')
        || token.starts_with("&>")
        || token.starts_with("1>")
        || token.starts_with("2>")
}

fn check_literal(value: &str) -> Result<(), AccountError> {
    if value.contains('$') || value.contains('`') {
        return Err(AccountError::ShellExpansion(value.to_string()));
    }
    Ok(())
}

/// Parse one account-creation line into a record
///
/// The first `useradd`/`groupadd` word (path prefix allowed) starts the
/// command; everything from the first redirection or list operator after it
/// is dropped. The last remaining word is the account name.
pub fn parse_account_command(line: &str) -> Result<AccountRecord, AccountError> {
    parse_invocation(line, None)
}

/// Parse the first `tool` invocation in `text`, skipping any other
/// account command in front of it
///
/// The rewriter calls this with the line sliced at each matched command, so
/// every invocation on a line yields its own record.
pub fn parse_account_invocation(
    text: &str,
    tool: AccountTool,
) -> Result<AccountRecord, AccountError> {
    parse_invocation(text, Some(tool))
}

fn parse_invocation(
    line: &str,
    wanted: Option<AccountTool>,
) -> Result<AccountRecord, AccountError> {
    let tokens = shlex::split(line).ok_or(AccountError::Unparseable)?;

    let (start, tool) = tokens
        .iter()
        .enumerate()
        .find_map(|(idx, tok)| {
            AccountTool::from_command(tok)
                .filter(|tool| wanted.is_none_or(|w| w == *tool))
                .map(|tool| (idx, tool))
        })
        .ok_or(AccountError::NotAccountCommand)?;

    let mut args: Vec<&str> = Vec::new();
    for token in &tokens[start + 1..] {
        if is_terminator(token) {
            break;
        }
        if let Some(stripped) = token.strip_suffix(';') {
            if !stripped.is_empty() {
                args.push(stripped);
            }
            break;
        }
        args.push(token);
    }

    let (name, flags) = match args.split_last() {
        Some((name, flags)) if !name.starts_with('-') => (*name, flags),
        _ => return Err(AccountError::MissingName { tool: tool.command() }),
    };
    check_literal(name)?;

    let mut record = AccountRecord::new(tool.kind(), name);
    let mut idx = 0;
    while idx < flags.len() {
        let token = flags[idx];
        idx += 1;

        if let Some(long) = token.strip_prefix("--") {
            let (opt, inline) = match long.split_once('=') {
                Some((opt, value)) => (opt, Some(value)),
                None => (long, None),
            };
            let letter = tool.long_flag(opt).ok_or_else(|| AccountError::UnknownFlag {
                tool: tool.command(),
                flag: token.to_string(),
            })?;
            let value = match inline {
                Some(v) => Some(v),
                None => take_value(tool, letter, flags, &mut idx)?,
            };
            apply_flag(tool, &mut record, letter, value, token)?;
            continue;
        }

        let Some(cluster) = token.strip_prefix('-').filter(|c| !c.is_empty()) else {
            return Err(AccountError::UnexpectedArgument {
                tool: tool.command(),
                arg: token.to_string(),
            });
        };

        for (pos, letter) in cluster.char_indices() {
            let spec = tool.short_flag(letter).ok_or_else(|| AccountError::UnknownFlag {
                tool: tool.command(),
                flag: format!("-{}", letter),
            })?;
            if !spec.takes_value {
                apply_flag(tool, &mut record, letter, None, token)?;
                continue;
            }
            // `-u500` carries its value inline
            let rest = &cluster[pos + letter.len_utf8()..];
            let value = if rest.is_empty() {
                take_value(tool, letter, flags, &mut idx)?
            } else {
                Some(rest)
            };
            apply_flag(tool, &mut record, letter, value, token)?;
            break;
        }
    }

    Ok(record)
}

fn take_value<'a>(
    tool: AccountTool,
    letter: char,
    flags: &[&'a str],
    idx: &mut usize,
) -> Result<Option<&'a str>, AccountError> {
    let needs_value = tool.short_flag(letter).is_some_and(|s| s.takes_value);
    if !needs_value {
        return Ok(None);
    }
    match flags.get(*idx) {
        Some(value) => {
            *idx += 1;
            Ok(Some(*value))
        }
        None => Err(AccountError::MissingValue {
            tool: tool.command(),
            flag: format!("-{}", letter),
        }),
    }
}

fn apply_flag(
    tool: AccountTool,
    record: &mut AccountRecord,
    letter: char,
    value: Option<&str>,
    token: &str,
) -> Result<(), AccountError> {
    let spec = tool.short_flag(letter).ok_or_else(|| AccountError::UnknownFlag {
        tool: tool.command(),
        flag: token.to_string(),
    })?;

    let FlagRule::Mapped(attr) = spec.rule else {
        return Ok(());
    };
    let value = value.ok_or_else(|| AccountError::MissingValue {
        tool: tool.command(),
        flag: token.to_string(),
    })?;
    check_literal(value)?;
    if attr == AccountAttribute::PreferredId && value.parse::<u32>().is_err() {
        return Err(AccountError::InvalidId(value.to_string()));
    }

    record.attributes.insert(attr, value.to_string());
    Ok(())
}
