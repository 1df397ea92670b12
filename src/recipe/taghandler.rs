// src/recipe/taghandler.rs

//! Tag handler packaging for surviving scriptlets
//!
//! Conary has no per-package lifecycle hooks. Instead a package ships a tag
//! handler and tags one of its own files; Conary then calls
//! `<handler> files update <paths>` when that file is installed or updated
//! and `<handler> files remove <paths>` when it goes away.
//!
//! The generated pieces:
//! - a dispatcher script that runs the wrapped scriptlets for each action,
//!   passing the RPM-style instance count as `$1`
//! - a tag description pointing Conary at the dispatcher
//! - one wrapped scriptlet file per stage, named `<package>.<stage>`
//! - a marker file with fresh contents per build, tagged so that every update
//!   changes a tagged file and the handler fires

use crate::config::LayoutSection;
use crate::hash::MarkerSource;
use crate::packages::traits::{ScriptSlot, ScriptStage};
use crate::recipe::format::Directive;
use std::collections::BTreeMap;
use tracing::debug;

/// Role of a generated side file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideFileKind {
    Dispatcher,
    Description,
    Scriptlet(ScriptStage),
}

/// File written next to the recipe and pulled in with `r.addSource`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideFile {
    /// File name inside the output directory
    pub name: String,
    pub contents: String,
    pub kind: SideFileKind,
}

/// Everything the packager adds to a recipe
#[derive(Debug, Clone)]
pub struct TagHandlerOutput {
    pub tag: String,
    pub directives: Vec<Directive>,
    pub side_files: Vec<SideFile>,
}

/// Wraps rewritten scriptlets into a tag handler
#[derive(Debug, Clone)]
pub struct TagHandlerPackager {
    layout: LayoutSection,
    marker: MarkerSource,
}

impl TagHandlerPackager {
    pub fn new(layout: LayoutSection, marker: MarkerSource) -> Self {
        Self { layout, marker }
    }

    /// Tag name for a package: lower case, `[a-z0-9-]` only
    pub fn tag_name(package: &str) -> String {
        let sanitized: String = package
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        format!("{}-rpm-scriptlets", sanitized.trim_matches('-'))
    }

    fn scriptlet_dir(&self, package: &str) -> String {
        format!("{}/{}", self.layout.scriptlet_dir.trim_end_matches('/'), package)
    }

    fn handler_path(&self, tag: &str) -> String {
        format!("{}/{}", self.layout.handler_dir.trim_end_matches('/'), tag)
    }

    fn description_path(&self, tag: &str) -> String {
        format!("{}/{}", self.layout.description_dir.trim_end_matches('/'), tag)
    }

    /// Installed path of the update marker for a package
    pub fn marker_path(&self, package: &str) -> String {
        format!(
            "{}/{}.marker",
            self.layout.marker_dir.trim_end_matches('/'),
            package
        )
    }

    /// Package the non-blank scriptlets of `package`
    ///
    /// Returns `None` when no stage has content left.
    pub fn package(
        &self,
        package: &str,
        scripts: &BTreeMap<ScriptStage, ScriptSlot>,
    ) -> Option<TagHandlerOutput> {
        let slots: Vec<&ScriptSlot> = ScriptStage::ALL
            .iter()
            .filter_map(|stage| scripts.get(stage))
            .filter(|slot| !slot.is_blank())
            .collect();

        if slots.is_empty() {
            return None;
        }

        let tag = Self::tag_name(package);
        let scriptlet_dir = self.scriptlet_dir(package);
        debug!(
            "Packaging {} scriptlet(s) of {} as tag handler '{}'",
            slots.len(),
            package,
            tag
        );

        let mut side_files = Vec::new();
        let mut directives = Vec::new();

        let dispatcher = SideFile {
            name: format!("{}.taghandler", tag),
            contents: self.dispatcher(package, &scriptlet_dir, &slots),
            kind: SideFileKind::Dispatcher,
        };
        directives.push(Directive::AddSource {
            file: dispatcher.name.clone(),
            dest: self.handler_path(&tag),
            mode: Some(0o755),
            macros: true,
        });
        side_files.push(dispatcher);

        let description = SideFile {
            name: format!("{}.tagdescription", tag),
            contents: self.description(package, &tag, &slots),
            kind: SideFileKind::Description,
        };
        directives.push(Directive::AddSource {
            file: description.name.clone(),
            dest: self.description_path(&tag),
            mode: Some(0o644),
            macros: true,
        });
        side_files.push(description);

        for slot in &slots {
            let wrapped = SideFile {
                name: wrapped_name(package, slot.stage),
                contents: slot.body(),
                kind: SideFileKind::Scriptlet(slot.stage),
            };
            directives.push(Directive::AddSource {
                file: wrapped.name.clone(),
                dest: format!("{}/", scriptlet_dir),
                mode: Some(0o644),
                macros: false,
            });
            side_files.push(wrapped);
        }

        let marker = self.marker_path(package);
        directives.push(Directive::Create {
            path: marker.clone(),
            contents: self.marker.marker_contents(),
        });
        directives.push(Directive::TagSpec {
            tag: tag.clone(),
            path: marker,
        });

        Some(TagHandlerOutput {
            tag,
            directives,
            side_files,
        })
    }

    fn dispatcher(&self, package: &str, scriptlet_dir: &str, slots: &[&ScriptSlot]) -> String {
        let mut script = String::new();
        script.push_str("#!/bin/sh\n");
        script.push_str(&format!("# RPM scriptlets of {}\n", package));
        script.push_str("case \"$1 $2\" in\n");

        for (action, install) in [("update", true), ("remove", false)] {
            let branch: Vec<&&ScriptSlot> = slots
                .iter()
                .filter(|slot| slot.stage.is_install() == install)
                .collect();
            if branch.is_empty() {
                continue;
            }

            script.push_str(&format!("    \"files {}\")\n", action));
            for slot in branch {
                script.push_str(&format!(
                    "        {} {}/{} {}\n",
                    slot.interpreter,
                    scriptlet_dir,
                    wrapped_name(package, slot.stage),
                    slot.stage.rpm_argument()
                ));
            }
            script.push_str("        ;;\n");
        }

        script.push_str("esac\n");
        script.push_str("exit 0\n");
        script
    }

    fn description(&self, package: &str, tag: &str, slots: &[&ScriptSlot]) -> String {
        let mut text = String::new();
        text.push_str(&format!("file            {}\n", self.handler_path(tag)));
        text.push_str(&format!("description     RPM scriptlets of {}\n", package));
        text.push_str("datasource      args\n");
        if slots.iter().any(|slot| slot.stage.is_install()) {
            text.push_str("implements      files update\n");
        }
        if slots.iter().any(|slot| !slot.stage.is_install()) {
            text.push_str("implements      files remove\n");
        }
        text
    }
}

/// `<package>.<stage suffix>`
pub fn wrapped_name(package: &str, stage: ScriptStage) -> String {
    format!("{}.{}", package, stage.suffix())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripts(entries: &[(ScriptStage, &str)]) -> BTreeMap<ScriptStage, ScriptSlot> {
        entries
            .iter()
            .map(|(stage, text)| (*stage, ScriptSlot::from_text(*stage, "/bin/sh", text)))
            .collect()
    }

    fn packager() -> TagHandlerPackager {
        TagHandlerPackager::new(
            LayoutSection::default(),
            MarkerSource::Fixed(b"fixed".to_vec()),
        )
    }

    #[test]
    fn test_nothing_to_package() {
        assert!(packager().package("foo", &BTreeMap::new()).is_none());
        let blank = scripts(&[(ScriptStage::PostInstall, "\n   \n")]);
        assert!(packager().package("foo", &blank).is_none());
    }

    #[test]
    fn test_full_handler() {
        let out = packager()
            .package(
                "foo",
                &scripts(&[
                    (ScriptStage::PostUninstall, ": foo\n"),
                    (ScriptStage::PreInstall, "echo pre\n"),
                    (ScriptStage::PostInstall, ": --add foo\nexit 0"),
                    (ScriptStage::PreUninstall, "echo preun\n"),
                ]),
            )
            .unwrap();

        assert_eq!(out.tag, "foo-rpm-scriptlets");

        let dispatcher = &out.side_files[0];
        assert_eq!(dispatcher.kind, SideFileKind::Dispatcher);
        assert_eq!(
            dispatcher.contents,
            "#!/bin/sh\n\
             # RPM scriptlets of foo\n\
             case \"$1 $2\" in\n    \"files update\")\n        \
             /bin/sh %(datadir)s/conary/rpm-scriptlets/foo/foo.preinstall 1\n        \
             /bin/sh %(datadir)s/conary/rpm-scriptlets/foo/foo.postinstall 1\n        \
             ;;\n    \"files remove\")\n        \
             /bin/sh %(datadir)s/conary/rpm-scriptlets/foo/foo.preuninstall 0\n        \
             /bin/sh %(datadir)s/conary/rpm-scriptlets/foo/foo.postuninstall 0\n        \
             ;;\n\
             esac\n\
             exit 0\n"
        );

        let description = &out.side_files[1];
        assert_eq!(
            description.contents,
            "file            %(taghandlerdir)s/foo-rpm-scriptlets\n\
             description     RPM scriptlets of foo\n\
             datasource      args\n\
             implements      files update\n\
             implements      files remove\n"
        );

        let names: Vec<&str> = out.side_files[2..].iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["foo.preinstall", "foo.postinstall", "foo.preuninstall", "foo.postuninstall"]
        );
        assert_eq!(out.side_files[3].contents, ": --add foo\nexit 0\n");
    }

    #[test]
    fn test_install_only_handler() {
        let out = packager()
            .package("foo", &scripts(&[(ScriptStage::PostInstall, "echo hi")]))
            .unwrap();

        let dispatcher = &out.side_files[0].contents;
        assert!(dispatcher.contains("\"files update\""));
        assert!(!dispatcher.contains("\"files remove\""));

        let description = &out.side_files[1].contents;
        assert!(description.contains("implements      files update"));
        assert!(!description.contains("files remove"));
    }

    #[test]
    fn test_directives() {
        let out = packager()
            .package("foo", &scripts(&[(ScriptStage::PostInstall, "echo hi")]))
            .unwrap();
        let rendered: Vec<String> = out.directives.iter().map(|d| d.to_string()).collect();

        assert_eq!(
            rendered,
            vec![
                "r.addSource('foo-rpm-scriptlets.taghandler', dest='%(taghandlerdir)s/foo-rpm-scriptlets', mode=0755, macros=True)".to_string(),
                "r.addSource('foo-rpm-scriptlets.tagdescription', dest='%(tagdescriptiondir)s/foo-rpm-scriptlets', mode=0644, macros=True)".to_string(),
                "r.addSource('foo.postinstall', dest='%(datadir)s/conary/rpm-scriptlets/foo/', mode=0644)".to_string(),
                format!(
                    "r.Create('%(localstatedir)s/lib/conary/rpm-scriptlets/foo.marker', contents='{}')",
                    crate::hash::sha256(b"fixed")
                ),
                "r.TagSpec('foo-rpm-scriptlets', '%(localstatedir)s/lib/conary/rpm\\\\-scriptlets/foo\\\\.marker')".to_string(),
            ]
        );
    }

    #[test]
    fn test_tag_name() {
        assert_eq!(TagHandlerPackager::tag_name("foo"), "foo-rpm-scriptlets");
        assert_eq!(TagHandlerPackager::tag_name("libstdc++"), "libstdc-rpm-scriptlets");
        assert_eq!(TagHandlerPackager::tag_name("Perl_Foo"), "perl-foo-rpm-scriptlets");
    }

    #[test]
    fn test_random_marker_differs() {
        let packager = TagHandlerPackager::new(LayoutSection::default(), MarkerSource::Random);
        let s = scripts(&[(ScriptStage::PostInstall, "echo hi")]);
        let a = packager.package("foo", &s).unwrap();
        let b = packager.package("foo", &s).unwrap();
        assert_ne!(a.directives, b.directives);
    }
}
