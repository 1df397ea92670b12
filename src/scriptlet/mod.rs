// src/scriptlet/mod.rs

//! Scriptlet rewriting for recipe import
//!
//! RPM scriptlets routinely restart services, register init scripts, rebuild
//! the linker cache and create accounts. Conary does all of that itself, so
//! those commands are neutralized before the scriptlet is packaged as a tag
//! handler:
//!
//! - Each logical line is classified against a fixed list of command
//!   categories (`LineCategory`). Matching is line based and only looks at
//!   words in command position, so mentions inside comments or arguments
//!   are left alone.
//! - A matching command word (and its path prefix) becomes the shell no-op
//!   `:`. Indentation and the rest of the line survive, and the line count
//!   never changes.
//! - Categories chain: a line with two recognized commands gets both
//!   replaced.
//! - Each `useradd`/`groupadd` invocation is handed to the account
//!   extractor before it is replaced, so one line can yield several records.
//!   `userdel`/`groupdel` are always removed; deleting accounts on package
//!   removal is never carried over.

pub mod account;

pub use account::{
    parse_account_command, parse_account_invocation, AccountAttribute, AccountError,
    AccountKind, AccountRecord, AccountTool,
};

use crate::packages::traits::ScriptSlot;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Command categories recognized in scriptlet lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineCategory {
    /// `service`
    ServiceControl,
    /// `chkconfig`
    RegistrationTool,
    /// `ldconfig`
    DynamicLinkerCache,
    /// `useradd`
    UserAdd,
    /// `userdel`
    UserDel,
    /// `groupadd`
    GroupAdd,
    /// `groupdel`
    GroupDel,
    /// Anything else; kept verbatim
    Other,
}

/// What happens to a line of a given category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteAction {
    /// Leave the line untouched
    Keep,
    /// Replace the command with `:`
    Neutralize,
    /// Extract an account record, then replace the command
    CaptureThenNeutralize,
    /// Replace the command unconditionally and warn about it
    Suppress,
}

impl LineCategory {
    /// Recognized categories in the order they are tested
    pub const RECOGNIZED: [LineCategory; 7] = [
        Self::ServiceControl,
        Self::RegistrationTool,
        Self::DynamicLinkerCache,
        Self::UserAdd,
        Self::UserDel,
        Self::GroupAdd,
        Self::GroupDel,
    ];

    /// Command word this category matches
    pub fn command(&self) -> Option<&'static str> {
        match self {
            Self::ServiceControl => Some("service"),
            Self::RegistrationTool => Some("chkconfig"),
            Self::DynamicLinkerCache => Some("ldconfig"),
            Self::UserAdd => Some("useradd"),
            Self::UserDel => Some("userdel"),
            Self::GroupAdd => Some("groupadd"),
            Self::GroupDel => Some("groupdel"),
            Self::Other => None,
        }
    }

    pub fn action(&self) -> RewriteAction {
        match self {
            Self::ServiceControl | Self::RegistrationTool | Self::DynamicLinkerCache => {
                RewriteAction::Neutralize
            }
            Self::UserAdd | Self::GroupAdd => RewriteAction::CaptureThenNeutralize,
            Self::UserDel | Self::GroupDel => RewriteAction::Suppress,
            Self::Other => RewriteAction::Keep,
        }
    }

    /// Tool whose invocations carry an account record
    pub fn account_tool(&self) -> Option<AccountTool> {
        match self {
            Self::UserAdd => Some(AccountTool::UserAdd),
            Self::GroupAdd => Some(AccountTool::GroupAdd),
            _ => None,
        }
    }

    fn pattern(&self) -> Option<&'static Regex> {
        let idx = Self::RECOGNIZED.iter().position(|c| c == self)?;
        Some(&PATTERNS[idx])
    }
}

/// Build the command-position matcher for one command word
///
/// `pre` is the line start or a shell separator / keyword plus any
/// whitespace; an optional absolute path may precede the command word.
fn command_pattern(command: &str) -> Regex {
    let pattern = format!(
        r"(?P<pre>(?:^|[;&|(`{{!]|\b(?:then|do|else|if)\s)\s*)(?:/[\w.+-]+)*/?{}(?P<post>[\s;&|)`]|$)",
        regex::escape(command)
    );
    Regex::new(&pattern).expect("command pattern is valid")
}

static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    LineCategory::RECOGNIZED
        .iter()
        .filter_map(|c| c.command())
        .map(command_pattern)
        .collect()
});

static LD_CONFIG_EDIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:>>?\s*|\bsed\s+-\S*i\S*\s.*|\bperl\s+-\S*i\S*\s.*|\b(?:cp|mv|install|ln|rm|tee)\s.*)/etc/ld\.so\.conf",
    )
    .expect("ld.so.conf pattern is valid")
});

/// Classify a line; returns every recognized category it contains, in test
/// order, or `[Other]`
pub fn classify_line(line: &str) -> Vec<LineCategory> {
    let found: Vec<LineCategory> = LineCategory::RECOGNIZED
        .iter()
        .copied()
        .filter(|c| c.pattern().is_some_and(|re| re.is_match(line)))
        .collect();

    if found.is_empty() {
        vec![LineCategory::Other]
    } else {
        found
    }
}

/// True when the line writes to the dynamic linker configuration
pub fn edits_ld_config(line: &str) -> bool {
    !line.trim_start().starts_with('#') && LD_CONFIG_EDIT.is_match(line)
}

/// True when the line depends on the install prefix of a relocated package
pub fn uses_install_prefix(line: &str) -> bool {
    line.contains("RPM_INSTALL_PREFIX")
}

/// An account line the extractor refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedAccount {
    pub line: String,
    pub error: AccountError,
}

/// Side effects of rewriting one scriptlet
#[derive(Debug, Clone, Default)]
pub struct RewriteReport {
    /// Accounts captured from creation commands
    pub accounts: Vec<AccountRecord>,
    /// Creation commands that could not be turned into records
    pub rejected: Vec<RejectedAccount>,
    /// Number of command words replaced
    pub substitutions: usize,
}

/// Line-oriented scriptlet rewriter
///
/// Stateless; the compiled patterns are shared statics.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptRewriter;

impl ScriptRewriter {
    pub fn new() -> Self {
        Self
    }

    /// Rewrite a scriptlet slot in place
    pub fn rewrite_slot(&self, slot: &mut ScriptSlot) -> RewriteReport {
        let label = slot.stage.to_string();
        self.rewrite_lines(&mut slot.lines, &label)
    }

    /// Rewrite lines in place; `label` only appears in log output
    pub fn rewrite_lines(&self, lines: &mut [String], label: &str) -> RewriteReport {
        let mut report = RewriteReport::default();

        for line in lines.iter_mut() {
            let original = line.clone();

            for category in classify_line(line) {
                let Some(re) = category.pattern() else {
                    continue;
                };

                match category.action() {
                    RewriteAction::Keep => continue,
                    RewriteAction::Neutralize => {
                        debug!("{}: neutralizing {:?}: {}", label, category, line.trim());
                        report.substitutions += neutralize(re, line, |_| {});
                    }
                    RewriteAction::CaptureThenNeutralize => {
                        let Some(tool) = category.account_tool() else {
                            continue;
                        };
                        // One record per invocation, read before it is replaced
                        let replaced = neutralize(re, line, |occurrence| {
                            capture_account(&mut report, label, &original, occurrence, tool)
                        });
                        report.substitutions += replaced;
                    }
                    RewriteAction::Suppress => {
                        warn!("{}: removing account deletion: {}", label, line.trim());
                        report.substitutions += neutralize(re, line, |_| {});
                    }
                }
            }
        }

        report
    }
}

fn capture_account(
    report: &mut RewriteReport,
    label: &str,
    original: &str,
    occurrence: &str,
    tool: AccountTool,
) {
    match parse_account_invocation(occurrence, tool) {
        Ok(record) => {
            debug!("{}: captured {} '{}'", label, record.kind, record.name);
            report.accounts.push(record);
        }
        Err(error) => {
            warn!(
                "{}: ignoring account command ({}): {}",
                label,
                error,
                original.trim()
            );
            report.rejected.push(RejectedAccount {
                line: original.to_string(),
                error,
            });
        }
    }
}

/// Replace every command-position occurrence matched by `re` with `:`
///
/// `on_match` sees the line from the start of each occurrence, before that
/// occurrence is replaced. Repeats until nothing matches, since adjacent
/// occurrences can share the separator between them.
fn neutralize(re: &Regex, line: &mut String, mut on_match: impl FnMut(&str)) -> usize {
    let mut count = 0;
    while re.is_match(line.as_str()) {
        for m in re.find_iter(line.as_str()) {
            on_match(&line[m.start()..]);
            count += 1;
        }
        let rewritten = re.replace_all(line.as_str(), "${pre}:${post}").into_owned();
        *line = rewritten;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::traits::ScriptStage;

    fn rewrite(text: &str) -> (Vec<String>, RewriteReport) {
        let mut lines: Vec<String> = text.lines().map(String::from).collect();
        let report = ScriptRewriter::new().rewrite_lines(&mut lines, "test");
        (lines, report)
    }

    #[test]
    fn test_classify_categories() {
        assert_eq!(classify_line("service foo restart"), vec![LineCategory::ServiceControl]);
        assert_eq!(classify_line("/sbin/chkconfig --add foo"), vec![LineCategory::RegistrationTool]);
        assert_eq!(classify_line("  /sbin/ldconfig"), vec![LineCategory::DynamicLinkerCache]);
        assert_eq!(classify_line("useradd foo"), vec![LineCategory::UserAdd]);
        assert_eq!(classify_line("userdel foo"), vec![LineCategory::UserDel]);
        assert_eq!(classify_line("groupadd foo"), vec![LineCategory::GroupAdd]);
        assert_eq!(classify_line("groupdel foo"), vec![LineCategory::GroupDel]);
        assert_eq!(classify_line("echo hello"), vec![LineCategory::Other]);
    }

    #[test]
    fn test_classify_ignores_non_command_positions() {
        assert_eq!(classify_line("# run chkconfig by hand"), vec![LineCategory::Other]);
        assert_eq!(classify_line("echo 'use service to start'"), vec![LineCategory::Other]);
        assert_eq!(classify_line("ldconfiguration"), vec![LineCategory::Other]);
        assert_eq!(classify_line("my-service start"), vec![LineCategory::Other]);
    }

    #[test]
    fn test_preserves_indentation_and_text() {
        let (lines, report) = rewrite("    /sbin/service foo condrestart >/dev/null 2>&1 || :");
        assert_eq!(lines, vec!["    : foo condrestart >/dev/null 2>&1 || :"]);
        assert_eq!(report.substitutions, 1);

        let (lines, _) = rewrite("\tchkconfig --add foo");
        assert_eq!(lines, vec!["\t: --add foo"]);
    }

    #[test]
    fn test_line_count_unchanged() {
        let text = "if [ $1 -eq 0 ]; then\n    service foo stop\n    chkconfig --del foo\nfi\n/sbin/ldconfig";
        let (lines, report) = rewrite(text);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "if [ $1 -eq 0 ]; then");
        assert_eq!(lines[1], "    : foo stop");
        assert_eq!(lines[2], "    : --del foo");
        assert_eq!(lines[3], "fi");
        assert_eq!(lines[4], ":");
        assert_eq!(report.substitutions, 3);
    }

    #[test]
    fn test_categories_chain() {
        let (lines, report) = rewrite("chkconfig --add foo && service foo start; ldconfig");
        assert_eq!(lines, vec![": --add foo && : foo start; :"]);
        assert_eq!(report.substitutions, 3);
    }

    #[test]
    fn test_adjacent_occurrences() {
        let (lines, _) = rewrite("ldconfig;ldconfig");
        assert_eq!(lines, vec![":;:"]);
    }

    #[test]
    fn test_account_capture() {
        let (lines, report) = rewrite(
            "getent group foo >/dev/null || groupadd -r -g 300 foo\n\
             getent passwd foo >/dev/null || useradd -r -g foo -d /var/lib/foo -s /sbin/nologin -u 300 foo",
        );
        assert_eq!(lines[0], "getent group foo >/dev/null || : -r -g 300 foo");
        assert!(lines[1].starts_with("getent passwd foo >/dev/null || : -r"));
        assert_eq!(report.accounts.len(), 2);
        assert_eq!(report.accounts[0].kind, AccountKind::Group);
        assert_eq!(report.accounts[0].preferred_id(), Some(300));
        assert_eq!(report.accounts[1].kind, AccountKind::User);
        assert_eq!(report.accounts[1].home_dir(), Some("/var/lib/foo"));
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn test_group_and_user_on_one_line() {
        let (lines, report) = rewrite("groupadd -r -g 300 foo; useradd -r -g foo -u 300 foo");
        assert_eq!(lines, vec![": -r -g 300 foo; : -r -g foo -u 300 foo"]);
        assert_eq!(report.substitutions, 2);
        assert_eq!(report.accounts.len(), 2);

        let user = report.accounts.iter().find(|r| r.kind == AccountKind::User).unwrap();
        assert_eq!(user.name, "foo");
        assert_eq!(user.preferred_id(), Some(300));
        assert_eq!(user.primary_group(), Some("foo"));
        let group = report.accounts.iter().find(|r| r.kind == AccountKind::Group).unwrap();
        assert_eq!(group.preferred_id(), Some(300));
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn test_repeated_account_command_on_one_line() {
        let (lines, report) = rewrite("useradd -u 10 a && useradd -u 11 b");
        assert_eq!(lines, vec![": -u 10 a && : -u 11 b"]);
        let names: Vec<(&str, Option<u32>)> = report
            .accounts
            .iter()
            .map(|r| (r.name.as_str(), r.preferred_id()))
            .collect();
        assert_eq!(names, vec![("a", Some(10)), ("b", Some(11))]);

        // No whitespace after the separator
        let (lines, report) = rewrite("groupadd x;groupadd y");
        assert_eq!(lines, vec![":;:"]);
        let names: Vec<&str> = report.accounts.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_second_invocation_rejected_first_kept() {
        let (_, report) = rewrite("useradd -u 10 a; useradd -k /etc/skel b");
        assert_eq!(report.accounts.len(), 1);
        assert_eq!(report.accounts[0].name, "a");
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].line, "useradd -u 10 a; useradd -k /etc/skel b");
    }

    #[test]
    fn test_malformed_account_still_neutralized() {
        let (lines, report) = rewrite("useradd -k /etc/skel foo\nexit 0");
        assert_eq!(lines, vec![": -k /etc/skel foo", "exit 0"]);
        assert!(report.accounts.is_empty());
        assert_eq!(report.rejected.len(), 1);
        assert!(matches!(report.rejected[0].error, AccountError::UnknownFlag { .. }));
    }

    #[test]
    fn test_account_removal_suppressed() {
        let (lines, report) = rewrite("if [ $1 = 0 ]; then userdel foo; groupdel foo; fi");
        assert_eq!(lines, vec!["if [ $1 = 0 ]; then : foo; : foo; fi"]);
        assert!(report.accounts.is_empty());
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let text = "service a start\n  /usr/sbin/chkconfig b on\nldconfig\nuseradd -r x\n\
                    userdel x\ngroupadd y\ngroupdel y\nservice a stop; service b stop";
        let (once, _) = rewrite(text);
        for line in &once {
            assert_eq!(classify_line(line), vec![LineCategory::Other], "{}", line);
        }

        let mut twice = once.clone();
        let report = ScriptRewriter::new().rewrite_lines(&mut twice, "again");
        assert_eq!(once, twice);
        assert_eq!(report.substitutions, 0);
    }

    #[test]
    fn test_rewrite_slot() {
        let mut slot = ScriptSlot::from_text(
            ScriptStage::PostInstall,
            "/bin/sh",
            "chkconfig --add foo\nexit 0",
        );
        ScriptRewriter::new().rewrite_slot(&mut slot);
        assert_eq!(slot.lines, vec![": --add foo", "exit 0"]);
    }

    #[test]
    fn test_ld_config_edit_detection() {
        assert!(edits_ld_config("echo /opt/foo/lib >> /etc/ld.so.conf"));
        assert!(edits_ld_config("sed -i '/foo/d' /etc/ld.so.conf"));
        assert!(edits_ld_config("rm -f /etc/ld.so.conf.d/foo.conf"));
        assert!(!edits_ld_config("grep -q foo /etc/ld.so.conf"));
        assert!(!edits_ld_config("# echo x >> /etc/ld.so.conf"));
    }

    #[test]
    fn test_install_prefix_detection() {
        assert!(uses_install_prefix("ln -s $RPM_INSTALL_PREFIX0/bin/foo /usr/bin/foo"));
        assert!(!uses_install_prefix("ln -s /opt/bin/foo /usr/bin/foo"));
    }
}
