// src/recipe/format.rs

//! Recipe directive model and rendering
//!
//! A recipe is Python source: a class header, `name`/`version` attributes and
//! a `setup(r)` method holding one directive per line. Directives are kept as
//! typed values until the very end so that ordering and quoting are decided in
//! one place.

use std::fmt;

/// Indentation of statements inside `setup(r)`
pub const SETUP_INDENT: &str = "        ";

/// Policies relaxed for every imported package
///
/// The payload comes from an already built RPM, so the normalization and
/// cleanup passes that assume a fresh `%(destdir)s` must not touch it.
pub const POLICY_EXCEPTIONS: &[&str] = &[
    "NormalizeCompression",
    "NormalizeManPages",
    "NormalizeInfoPages",
    "NormalizeInitscriptLocation",
    "NormalizeInitscriptContents",
    "NormalizeAppDefaults",
    "NormalizePkgConfig",
    "NormalizeInterpreterPaths",
    "FixupMultilibPaths",
    "FixDirModes",
    "FixObsoletePaths",
    "RelativeSymlinks",
    "DanglingSymlinks",
    "Strip",
    "RemoveNonPackageFiles",
    "LinkCount",
];

/// Device node type for `r.MakeDevices`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Block,
    Character,
}

impl DeviceKind {
    pub fn letter(&self) -> &'static str {
        match self {
            Self::Block => "b",
            Self::Character => "c",
        }
    }
}

/// One statement inside `setup(r)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `r.addArchive(archive, dir='/')`
    AddArchive { archive: String },
    /// `r.ComponentSpec(component, pattern)`
    ComponentSpec { component: String, pattern: String },
    /// `r.<policy>(exceptions=<filter>)`
    PolicyException { policy: String, filter: String },
    /// `r.Ownership(owner, group, <path filter>)`
    Ownership { owner: String, group: String, path: String },
    /// `r.ExcludeDirectories(exceptions=<path filter>)`; keeps an otherwise
    /// implicit directory in the package
    IncludeDirectory { path: String },
    /// `r.MakeDevices(path, kind, major, minor, owner, group, mode=...)`
    MakeDevice {
        path: String,
        kind: DeviceKind,
        major: u32,
        minor: u32,
        owner: String,
        group: String,
        mode: u32,
    },
    /// `r.SetModes(<path filter>, mode)`
    SetModes { path: String, mode: u32 },
    /// `r.Config(<path filter>)`
    Config { path: String },
    /// `r.addSource(file, dest=..., mode=..., macros=True)`
    AddSource {
        file: String,
        dest: String,
        mode: Option<u32>,
        /// Expand Conary macros inside the file contents
        macros: bool,
    },
    /// `r.Create(path, contents=...)`
    Create { path: String, contents: String },
    /// `r.TagSpec(tag, <path filter>)`
    TagSpec { tag: String, path: String },
}

impl Directive {
    /// The fixed block of policy relaxations, in declaration order
    pub fn policy_exceptions() -> Vec<Directive> {
        POLICY_EXCEPTIONS
            .iter()
            .map(|policy| Directive::PolicyException {
                policy: (*policy).to_string(),
                filter: ".*".to_string(),
            })
            .collect()
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddArchive { archive } => {
                write!(f, "r.addArchive({}, dir='/')", quote(archive))
            }
            Self::ComponentSpec { component, pattern } => {
                write!(f, "r.ComponentSpec({}, {})", quote(component), quote(pattern))
            }
            Self::PolicyException { policy, filter } => {
                write!(f, "r.{}(exceptions={})", policy, quote(filter))
            }
            Self::Ownership { owner, group, path } => write!(
                f,
                "r.Ownership({}, {}, {})",
                quote(owner),
                quote(group),
                path_filter(path)
            ),
            Self::IncludeDirectory { path } => {
                write!(f, "r.ExcludeDirectories(exceptions={})", path_filter(path))
            }
            Self::MakeDevice {
                path,
                kind,
                major,
                minor,
                owner,
                group,
                mode,
            } => write!(
                f,
                "r.MakeDevices({}, {}, {}, {}, {}, {}, mode={})",
                quote(path),
                quote(kind.letter()),
                major,
                minor,
                quote(owner),
                quote(group),
                octal(*mode)
            ),
            Self::SetModes { path, mode } => {
                write!(f, "r.SetModes({}, {})", path_filter(path), octal(*mode))
            }
            Self::Config { path } => write!(f, "r.Config({})", path_filter(path)),
            Self::AddSource {
                file,
                dest,
                mode,
                macros,
            } => {
                write!(f, "r.addSource({}, dest={}", quote(file), quote(dest))?;
                if let Some(mode) = mode {
                    write!(f, ", mode={}", octal(*mode))?;
                }
                if *macros {
                    write!(f, ", macros=True")?;
                }
                write!(f, ")")
            }
            Self::Create { path, contents } => {
                write!(f, "r.Create({}, contents={})", quote(path), quote(contents))
            }
            Self::TagSpec { tag, path } => {
                write!(f, "r.TagSpec({}, {})", quote(tag), path_filter(path))
            }
        }
    }
}

/// Single-quoted Python string literal
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Path used as a policy filter: regex escaped, then quoted
///
/// Conary macros (`%(name)s`) are left alone so they still expand.
pub fn path_filter(path: &str) -> String {
    quote(&escape_path(path))
}

fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(start) = rest.find("%(") {
        let Some(len) = rest[start..].find(")s") else {
            break;
        };
        out.push_str(&regex::escape(&rest[..start]));
        out.push_str(&rest[start..start + len + 2]);
        rest = &rest[start + len + 2..];
    }
    out.push_str(&regex::escape(rest));
    out
}

/// Python 2 octal literal, as Conary recipes spell modes
pub fn octal(mode: u32) -> String {
    format!("0{:o}", mode)
}

/// Recipe class name for a package name
///
/// `foo-bar_baz` becomes `FooBarBazRecipe`; names starting with a digit get a
/// `Package` prefix so the result is a valid identifier.
pub fn class_name(package: &str, suffix: &str) -> String {
    let mut name: String = package
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();

    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "Package");
    }
    name.push_str(suffix);
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote("plain"), "'plain'");
        assert_eq!(quote("it's"), r"'it\'s'");
        assert_eq!(quote(r"a\b"), r"'a\\b'");
        assert_eq!(quote("a\nb"), r"'a\nb'");
    }

    #[test]
    fn test_path_filter_escapes_regex() {
        assert_eq!(path_filter("/usr/lib/libc++.so.6"), r"'/usr/lib/libc\\+\\+\\.so\\.6'");
        assert_eq!(
            path_filter("%(sysconfdir)s/conary/foo.marker"),
            r"'%(sysconfdir)s/conary/foo\\.marker'"
        );
    }

    #[test]
    fn test_render_devices_and_modes() {
        let dev = Directive::MakeDevice {
            path: "/dev/null".to_string(),
            kind: DeviceKind::Character,
            major: 1,
            minor: 3,
            owner: "root".to_string(),
            group: "root".to_string(),
            mode: 0o666,
        };
        assert_eq!(
            dev.to_string(),
            "r.MakeDevices('/dev/null', 'c', 1, 3, 'root', 'root', mode=0666)"
        );

        let modes = Directive::SetModes {
            path: "/usr/bin/su".to_string(),
            mode: 0o4755,
        };
        assert_eq!(modes.to_string(), "r.SetModes('/usr/bin/su', 04755)");
    }

    #[test]
    fn test_render_add_source() {
        let with_mode = Directive::AddSource {
            file: "foo.postinstall".to_string(),
            dest: "%(datadir)s/rpm-scriptlets/foo/".to_string(),
            mode: Some(0o755),
            macros: false,
        };
        assert_eq!(
            with_mode.to_string(),
            "r.addSource('foo.postinstall', dest='%(datadir)s/rpm-scriptlets/foo/', mode=0755)"
        );

        let without = Directive::AddSource {
            file: "foo.tagdescription".to_string(),
            dest: "%(tagdescriptiondir)s/foo".to_string(),
            mode: None,
            macros: true,
        };
        assert_eq!(
            without.to_string(),
            "r.addSource('foo.tagdescription', dest='%(tagdescriptiondir)s/foo', macros=True)"
        );
    }

    #[test]
    fn test_policy_exceptions() {
        let block = Directive::policy_exceptions();
        assert_eq!(block.len(), POLICY_EXCEPTIONS.len());
        assert_eq!(block[0].to_string(), "r.NormalizeCompression(exceptions='.*')");
    }

    #[test]
    fn test_class_name() {
        assert_eq!(class_name("foo", "Recipe"), "FooRecipe");
        assert_eq!(class_name("perl-Foo_bar", "Recipe"), "PerlFooBarRecipe");
        assert_eq!(class_name("389-ds", "Recipe"), "Package389DsRecipe");
        assert_eq!(class_name("info-foo", "InfoRecipe"), "InfoFooInfoRecipe");
    }
}
