//! String-level path algebra for commands captured on another platform.
//!
//! Launcher files and captured commands carry Windows-style paths
//! (`..\..\bin\se.exe`) regardless of the host, so `std::path` cannot be
//! used to take them apart on a Unix host. These helpers accept both `\` and
//! `/` as separators on input and let a [`PathStyle`] decide the separator
//! written on output, whether drive letters count as roots, and whether
//! components compare case-insensitively.
//!
//! None of the functions touch the filesystem or the process environment.

use serde::{Deserialize, Serialize};

/// Path conventions used to resolve and render paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
    /// `\` separator, drive-letter roots, case-insensitive components.
    Windows,
    /// `/` separator, case-sensitive components.
    Posix,
}

impl PathStyle {
    /// The style of the host platform.
    pub fn native() -> Self {
        if cfg!(windows) {
            PathStyle::Windows
        } else {
            PathStyle::Posix
        }
    }

    pub fn separator(&self) -> char {
        match self {
            PathStyle::Windows => '\\',
            PathStyle::Posix => '/',
        }
    }

    fn eq_component(&self, a: &str, b: &str) -> bool {
        match self {
            PathStyle::Windows => a.eq_ignore_ascii_case(b),
            PathStyle::Posix => a == b,
        }
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::native()
    }
}

fn is_separator(c: char) -> bool {
    c == '\\' || c == '/'
}

/// A path split into its root prefix and its components.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Parsed<'a> {
    /// `C:`, `` (for a leading separator) or `None` when relative.
    root: Option<String>,
    components: Vec<&'a str>,
    trailing_separator: bool,
}

fn parse(style: PathStyle, path: &str) -> Parsed<'_> {
    let mut rest = path;
    let mut root = None;

    if style == PathStyle::Windows {
        let bytes = rest.as_bytes();
        if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
            root = Some(rest[..2].to_ascii_uppercase());
            rest = &rest[2..];
            // "C:foo" is drive-relative; treat it as rooted at the drive.
            rest = rest.trim_start_matches(is_separator);
        }
    }
    if root.is_none() && rest.starts_with(is_separator) {
        root = Some(String::new());
        rest = rest.trim_start_matches(is_separator);
    }

    let trailing_separator = !rest.is_empty() && rest.ends_with(is_separator);
    let components = rest.split(is_separator).filter(|c| !c.is_empty()).collect();

    Parsed {
        root,
        components,
        trailing_separator,
    }
}

fn render(style: PathStyle, root: Option<&str>, components: &[&str], trailing: bool) -> String {
    let sep = style.separator();
    let mut out = String::new();

    if let Some(root) = root {
        out.push_str(root);
        out.push(sep);
    }

    out.push_str(&components.join(&sep.to_string()));

    if trailing && !components.is_empty() && !out.ends_with(sep) {
        out.push(sep);
    }

    if out.is_empty() {
        out.push('.');
    }

    out
}

/// Returns `true` when `path` starts at a root (`/`, `\`, or `C:` on Windows).
pub fn is_rooted(style: PathStyle, path: &str) -> bool {
    parse(style, path).root.is_some()
}

fn normalize<'a>(root: Option<&str>, components: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut stack: Vec<&str> = Vec::new();
    for component in components {
        match component {
            "." => {}
            ".." => match stack.last() {
                Some(&"..") | None => {
                    // Climbing above a root is a no-op; above a relative base it is kept.
                    if root.is_none() {
                        stack.push("..");
                    }
                }
                Some(_) => {
                    stack.pop();
                }
            },
            other => stack.push(other),
        }
    }
    stack
}

/// Resolves `path` against `base` and normalizes `.` and `..` components.
///
/// A rooted `path` ignores `base`. An empty `path` resolves to `base`. A
/// trailing separator on `path` is preserved. When `base` is itself relative
/// the result stays relative.
pub fn full_path(style: PathStyle, path: &str, base: &str) -> String {
    let target = parse(style, path);

    if target.root.is_some() {
        let components = normalize(target.root.as_deref(), target.components);
        return render(
            style,
            target.root.as_deref(),
            &components,
            target.trailing_separator,
        );
    }

    let base = parse(style, base);
    let trailing = if target.components.is_empty() {
        base.trailing_separator
    } else {
        target.trailing_separator
    };
    let components = normalize(
        base.root.as_deref(),
        base.components.into_iter().chain(target.components),
    );

    render(style, base.root.as_deref(), &components, trailing)
}

/// The last component of `path`, or an empty string when it ends in a separator.
pub fn file_name(path: &str) -> &str {
    match path.rfind(is_separator) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// The parent directory of `path`.
///
/// Returns `None` for a root, an empty path, or a bare file name.
pub fn directory_name(style: PathStyle, path: &str) -> Option<String> {
    let parsed = parse(style, path);
    if parsed.components.is_empty() {
        return None;
    }
    let parent = &parsed.components[..parsed.components.len() - 1];
    if parent.is_empty() && parsed.root.is_none() {
        return None;
    }
    Some(render(style, parsed.root.as_deref(), parent, false))
}

/// Computes the path of `to` relative to the directory `from`.
///
/// Both paths are normalized first. When they do not share a root, `to` is
/// returned in normalized form. A trailing separator on `to` is preserved.
pub fn relative_path(style: PathStyle, from: &str, to: &str) -> String {
    let trailing = parse(style, to).trailing_separator;
    let from_full = full_path(style, from, "");
    let to_full = full_path(style, to, "");
    let from = parse(style, &from_full);
    let to = parse(style, &to_full);

    let same_root = match (&from.root, &to.root) {
        (Some(a), Some(b)) => style.eq_component(a, b),
        (None, None) => true,
        _ => false,
    };
    if !same_root {
        return to_full.clone();
    }

    let common = from
        .components
        .iter()
        .zip(&to.components)
        .take_while(|(a, b)| style.eq_component(a, b))
        .count();

    let mut components: Vec<&str> = Vec::new();
    components.extend(std::iter::repeat_n("..", from.components.len() - common));
    components.extend(&to.components[common..]);

    if components.is_empty() {
        return if trailing {
            format!(".{}", style.separator())
        } else {
            ".".to_string()
        };
    }

    render(style, None, &components, trailing)
}

/// Joins two path fragments, inserting the style's separator only when
/// neither side already supplies one. An empty side yields the other side.
pub fn join(style: PathStyle, first: &str, second: &str) -> String {
    if first.is_empty() {
        return second.to_string();
    }
    if second.is_empty() {
        return first.to_string();
    }
    if first.ends_with(is_separator) || second.starts_with(is_separator) {
        format!("{first}{second}")
    } else {
        format!("{first}{}{second}", style.separator())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIN: PathStyle = PathStyle::Windows;
    const POSIX: PathStyle = PathStyle::Posix;

    #[test]
    fn test_full_path_resolves_parent_components() {
        assert_eq!(full_path(WIN, r"..\..", r"C:\work\tests\group"), r"C:\work");
        assert_eq!(full_path(POSIX, "../data", "/srv/tests/group"), "/srv/tests/data");
    }

    #[test]
    fn test_full_path_keeps_trailing_separator() {
        assert_eq!(full_path(WIN, r"..\", r"C:\work\tests"), r"C:\work\");
        assert_eq!(full_path(POSIX, r"..\..\", "/a/b/c"), "/a/");
    }

    #[test]
    fn test_full_path_rooted_ignores_base() {
        assert_eq!(full_path(WIN, r"D:\x\.\y", r"C:\base"), r"D:\x\y");
        assert_eq!(full_path(POSIX, "/x/../y", "/base"), "/y");
    }

    #[test]
    fn test_full_path_empty_is_base() {
        assert_eq!(full_path(WIN, "", r"C:\base\dir"), r"C:\base\dir");
    }

    #[test]
    fn test_full_path_cannot_climb_above_root() {
        assert_eq!(full_path(POSIX, "../../..", "/a"), "/");
        assert_eq!(full_path(WIN, r"..\..", r"C:\"), r"C:\");
    }

    #[test]
    fn test_full_path_relative_base_stays_relative() {
        assert_eq!(full_path(POSIX, "../x", "a"), "x");
        assert_eq!(full_path(POSIX, "../../x", "a"), "../x");
    }

    #[test]
    fn test_drive_letters_only_root_windows_paths() {
        assert!(is_rooted(WIN, r"c:\temp"));
        assert!(!is_rooted(POSIX, r"c:\temp"));
        assert!(is_rooted(POSIX, "/tmp"));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(r"..\bin\se.exe"), "se.exe");
        assert_eq!(file_name("bin/se"), "se");
        assert_eq!(file_name("se.exe"), "se.exe");
        assert_eq!(file_name(r"dir\"), "");
    }

    #[test]
    fn test_directory_name() {
        assert_eq!(directory_name(WIN, r"C:\a\b\se.exe").as_deref(), Some(r"C:\a\b"));
        assert_eq!(directory_name(WIN, r"C:\se.exe").as_deref(), Some(r"C:\"));
        assert_eq!(directory_name(WIN, r"C:\"), None);
        assert_eq!(directory_name(POSIX, "se"), None);
        assert_eq!(directory_name(POSIX, "/a/se").as_deref(), Some("/a"));
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path(WIN, r"C:\w\bin\x64", r"C:\w"), r"..\..");
        assert_eq!(relative_path(WIN, r"C:\w\bin", r"C:\w\data\"), r"..\data\");
        assert_eq!(relative_path(POSIX, "/w/bin", "/w/bin"), ".");
        assert_eq!(relative_path(POSIX, "/w", "/w/a/b"), "a/b");
    }

    #[test]
    fn test_relative_path_case_sensitivity_follows_style() {
        assert_eq!(relative_path(WIN, r"C:\Work\bin", r"c:\work"), "..");
        assert_eq!(relative_path(POSIX, "/Work/bin", "/work"), "../../work");
    }

    #[test]
    fn test_relative_path_across_drives_returns_target() {
        assert_eq!(relative_path(WIN, r"C:\a", r"D:\b"), r"D:\b");
    }

    #[test]
    fn test_join() {
        assert_eq!(join(WIN, "source", "in.txt"), r"source\in.txt");
        assert_eq!(join(WIN, r"source\", "in.txt"), r"source\in.txt");
        assert_eq!(join(POSIX, "source", ""), "source");
        assert_eq!(join(POSIX, "", "in.txt"), "in.txt");
        assert_eq!(join(POSIX, "C:/root/configs", "a.ini"), "C:/root/configs/a.ini");
    }
}
