//! Validation script rewriting.
//!
//! Validation scripts are never run as shipped. Two rewritten copies exist:
//!
//! - a *working copy* (`<stem>_copy.<ext>`) produced by a [`ScriptTransform`]
//!   before collection. It prints the command it would have launched instead
//!   of launching it, and drops the input-file juggling around it.
//! - a *debug copy* (`<stem>_debugRTC.<ext>`) produced on demand for one
//!   discovered test. Required arguments become optional, server start-up is
//!   commented out, and the test's input, output and scenario are assigned
//!   right after argument parsing, so the script runs standalone under a
//!   debugger.
//!
//! Both copies are written next to the original and overwrite any previous
//! copy of the same name.

use std::path::{Path, PathBuf};

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::model::DiscoveredTest;
use crate::paths::{self, PathStyle};

/// Suffix appended to the stem of a working copy.
pub const WORKING_COPY_SUFFIX: &str = "_copy";

/// Suffix appended to the stem of a debug copy.
pub const DEBUG_COPY_SUFFIX: &str = "_debugRTC";

pub type ScriptResult<T> = Result<T, ScriptError>;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Script not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid removal pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScriptError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ScriptError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Text edits applied to produce a working copy.
///
/// Literal replacements run first, then every removal pattern is deleted
/// as a multi-line regex, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptTransform {
    /// Text written in place of every entry of `replace`.
    pub replacement: String,

    /// Literal strings replaced by `replacement`.
    pub replace: Vec<String>,

    /// Regular expressions removed from the script (`^`/`$` match per line).
    pub remove_patterns: Vec<String>,
}

impl Default for ScriptTransform {
    fn default() -> Self {
        Self {
            replacement: "print(command)".to_string(),
            replace: vec![
                "subprocess.Popen(command)".to_string(),
                "subprocess.run(command)".to_string(),
            ],
            remove_patterns: vec![
                r"def\s+CreateInputCopyAndAdjustInput\s*\([^)]*\):\s*(?:\n[ \t]+.*)+".to_string(),
                r"CreateInputCopyAndAdjustInput\(\)".to_string(),
                r"os\.remove\(args\.i\)".to_string(),
            ],
        }
    }
}

impl ScriptTransform {
    /// Applies the edits to `content`.
    pub fn apply(&self, content: &str) -> ScriptResult<String> {
        let mut content = content.to_string();

        for literal in self.replace.iter().filter(|s| !s.is_empty()) {
            content = content.replace(literal, &self.replacement);
        }

        for pattern in &self.remove_patterns {
            let re = RegexBuilder::new(pattern)
                .multi_line(true)
                .build()
                .map_err(|source| ScriptError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
            content = re.replace_all(&content, "").into_owned();
        }

        Ok(content)
    }

    /// Writes the transformed working copy of `script` and returns its path.
    pub async fn create_transformed_copy(&self, script: &Path) -> ScriptResult<PathBuf> {
        if !tokio::fs::try_exists(script).await.unwrap_or(false) {
            return Err(ScriptError::NotFound(script.to_path_buf()));
        }

        let content = tokio::fs::read_to_string(script)
            .await
            .map_err(|e| ScriptError::io(script, e))?;
        let transformed = self.apply(&content)?;

        let copy = sibling_with_suffix(script, WORKING_COPY_SUFFIX);
        tokio::fs::write(&copy, transformed)
            .await
            .map_err(|e| ScriptError::io(&copy, e))?;

        debug!("Wrote working copy {}", copy.display());
        Ok(copy)
    }
}

/// `dir/name.ext` -> `dir/name<suffix>.ext`.
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(name)
}

/// Renders the debug variant of a validation script for `test`.
///
/// Rules are checked per line in this order and only the first match
/// applies:
///
/// 1. `required=True` becomes `required=False`.
/// 2. `ServerApi.StartServer` is commented out in place.
/// 3. `waitForServerToStart()` is commented out in place.
/// 4. A line containing `parse_known_args` is kept and followed by
///    assignments of `args.i`, `args.o` and `args.scenario` at the same
///    indentation.
pub fn render_debug_script(source: &str, test: &DiscoveredTest, style: PathStyle) -> String {
    let absolute_root = paths::full_path(style, &test.root_dir, &test.folder.to_string_lossy());
    let mut out = String::with_capacity(source.len() + 256);

    for line in source.lines() {
        if line.contains("required=True") {
            out.push_str(&line.replace("required=True", "required=False"));
        } else if line.contains("ServerApi.StartServer") {
            out.push_str(&line.replace("ServerApi.StartServer", "# ServerApi.StartServer"));
        } else if line.contains("waitForServerToStart()") {
            out.push_str(&line.replace("waitForServerToStart()", "# waitForServerToStart()"));
        } else if line.contains("parse_known_args") {
            let indent = &line[..line.len() - line.trim_start().len()];
            let input = literal_path(&test.input_file, &test.root_dir, &absolute_root, style);
            let output = literal_path(&test.output_file, &test.root_dir, &absolute_root, style);

            out.push_str(line);
            out.push('\n');
            out.push_str(&format!("{indent}args.i = \"{input}\"\n"));
            out.push_str(&format!("{indent}args.o = \"{output}\"\n"));
            out.push_str(&format!("{indent}args.scenario = \"{}\"", test.scenario));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }

    out
}

/// Resolves the root token in `path` and renders it for a string literal.
fn literal_path(path: &str, root_token: &str, absolute_root: &str, style: PathStyle) -> String {
    let mut resolved = path.to_string();
    if !root_token.is_empty() {
        resolved = resolved
            .replace(root_token, absolute_root)
            .replace(&root_token.replace('\\', "/"), absolute_root);
    }

    match style {
        PathStyle::Windows => resolved.replace('\\', "\\\\").replace('/', "\\\\"),
        PathStyle::Posix => resolved.replace('\\', "/"),
    }
}

/// Writes the debug copy of `test`'s validation script and returns its path.
pub async fn create_debug_copy(test: &DiscoveredTest, style: PathStyle) -> ScriptResult<PathBuf> {
    let script = test.script_path.as_path();
    let source = tokio::fs::read_to_string(script).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ScriptError::NotFound(script.to_path_buf())
        } else {
            ScriptError::io(script, e)
        }
    })?;

    let rendered = render_debug_script(&source, test, style);
    let target = sibling_with_suffix(script, DEBUG_COPY_SUFFIX);
    tokio::fs::write(&target, rendered)
        .await
        .map_err(|e| ScriptError::io(&target, e))?;

    debug!("Wrote debug copy {}", target.display());
    Ok(target)
}

/// Deletes every debug copy (`*_debugRTC.*`) below `root` and returns the
/// removed paths, sorted.
pub async fn remove_debug_copies(root: &Path) -> ScriptResult<Vec<PathBuf>> {
    let mut copies: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .file_stem()
                .is_some_and(|stem| stem.to_string_lossy().ends_with(DEBUG_COPY_SUFFIX))
        })
        .map(|entry| entry.into_path())
        .collect();
    copies.sort();

    for copy in &copies {
        tokio::fs::remove_file(copy)
            .await
            .map_err(|e| ScriptError::io(copy, e))?;
        debug!("Removed debug copy {}", copy.display());
    }
    Ok(copies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SCRIPT: &str = r#"import subprocess
import os

def CreateInputCopyAndAdjustInput():
    shutil.copy(args.i, tmp)
    args.i = tmp

def main():
    parser.add_argument("-i", required=True)
    args, unknown = parser.parse_known_args()
    ServerApi.StartServer(args.server)
    waitForServerToStart()
    CreateInputCopyAndAdjustInput()
    command = [exe, "-i", args.i]
    subprocess.Popen(command)
    os.remove(args.i)
"#;

    fn debug_test(folder: &str) -> DiscoveredTest {
        DiscoveredTest::new("T1", "G", "se.exe")
            .with_folder(folder)
            .with_root_dir(r"..\..")
            .with_input_file(r"..\..\Source\in.txt")
            .with_output_file("../../Check/out.txt")
            .with_scenario("s1")
    }

    #[test]
    fn test_transform_defaults() {
        let out = ScriptTransform::default().apply(SCRIPT).unwrap();

        assert!(out.contains("    print(command)"));
        assert!(!out.contains("subprocess.Popen"));
        assert!(!out.contains("CreateInputCopyAndAdjustInput"));
        assert!(!out.contains("shutil.copy"));
        assert!(!out.contains("os.remove"));
        assert!(out.contains("def main():"));
        assert!(out.contains("command = [exe, \"-i\", args.i]"));
    }

    #[test]
    fn test_transform_invalid_pattern() {
        let transform = ScriptTransform {
            remove_patterns: vec!["(unclosed".into()],
            ..ScriptTransform::default()
        };
        assert!(matches!(
            transform.apply("x"),
            Err(ScriptError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_sibling_with_suffix() {
        assert_eq!(
            sibling_with_suffix(Path::new("/a/RegTestX.py"), WORKING_COPY_SUFFIX),
            PathBuf::from("/a/RegTestX_copy.py")
        );
        assert_eq!(
            sibling_with_suffix(Path::new("run"), DEBUG_COPY_SUFFIX),
            PathBuf::from("run_debugRTC")
        );
    }

    #[tokio::test]
    async fn test_create_transformed_copy() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("RegTestX.py");
        std::fs::write(&script, SCRIPT).unwrap();

        let copy = ScriptTransform::default()
            .create_transformed_copy(&script)
            .await
            .unwrap();

        assert_eq!(copy, dir.path().join("RegTestX_copy.py"));
        let content = std::fs::read_to_string(&copy).unwrap();
        assert!(content.contains("print(command)"));
        assert_eq!(std::fs::read_to_string(&script).unwrap(), SCRIPT);
    }

    #[tokio::test]
    async fn test_create_transformed_copy_missing_script() {
        let dir = TempDir::new().unwrap();
        let err = ScriptTransform::default()
            .create_transformed_copy(&dir.path().join("missing.py"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScriptError::NotFound(_)));
    }

    #[test]
    fn test_render_debug_script_windows() {
        let rendered = render_debug_script(SCRIPT, &debug_test(r"C:\w\tests\group"), PathStyle::Windows);

        assert!(rendered.contains(r#"parser.add_argument("-i", required=False)"#));
        assert!(rendered.contains("    # ServerApi.StartServer(args.server)"));
        assert!(rendered.contains("    # waitForServerToStart()"));
        assert!(rendered.contains(
            "    args, unknown = parser.parse_known_args()\n    args.i = \"C:\\\\w\\\\Source\\\\in.txt\"\n"
        ));
        assert!(rendered.contains("    args.o = \"C:\\\\w\\\\Check\\\\out.txt\"\n"));
        assert!(rendered.contains("    args.scenario = \"s1\"\n"));
    }

    #[test]
    fn test_render_debug_script_posix() {
        let rendered = render_debug_script(SCRIPT, &debug_test("/srv/tests/group"), PathStyle::Posix);

        assert!(rendered.contains("    args.i = \"/srv/Source/in.txt\"\n"));
        assert!(rendered.contains("    args.o = \"/srv/Check/out.txt\"\n"));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let source = "x(required=True); ServerApi.StartServer()\n";
        let rendered = render_debug_script(source, &DiscoveredTest::default(), PathStyle::Posix);
        assert_eq!(rendered, "x(required=False); ServerApi.StartServer()\n");
    }

    #[test]
    fn test_render_is_deterministic() {
        let test = debug_test("/srv/tests/group");
        assert_eq!(
            render_debug_script(SCRIPT, &test, PathStyle::Posix),
            render_debug_script(SCRIPT, &test, PathStyle::Posix)
        );
    }

    #[tokio::test]
    async fn test_create_debug_copy_writes_sibling() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("RegTestX.py");
        std::fs::write(&script, SCRIPT).unwrap();

        let test = debug_test(&dir.path().join("a/b").to_string_lossy()).with_script_path(&script);
        let path = create_debug_copy(&test, PathStyle::Posix).await.unwrap();

        assert_eq!(path, dir.path().join("RegTestX_debugRTC.py"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("args.scenario = \"s1\""));

        // Overwrites the previous copy with identical content.
        let again = create_debug_copy(&test, PathStyle::Posix).await.unwrap();
        assert_eq!(std::fs::read_to_string(again).unwrap(), content);
    }

    #[tokio::test]
    async fn test_create_debug_copy_missing_script() {
        let test = DiscoveredTest::default().with_script_path("/nonexistent/RegTest.py");
        let err = create_debug_copy(&test, PathStyle::Posix).await.unwrap_err();
        assert!(matches!(err, ScriptError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_debug_copies_keeps_originals() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        for name in [
            "RegTestA.py",
            "RegTestA_debugRTC.py",
            "b/RegTestB_debugRTC.py",
            "b/RegTestB_copy.py",
        ] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let removed = remove_debug_copies(dir.path()).await.unwrap();

        assert_eq!(
            removed,
            [
                dir.path().join("RegTestA_debugRTC.py"),
                dir.path().join("b/RegTestB_debugRTC.py")
            ]
        );
        assert!(dir.path().join("RegTestA.py").exists());
        assert!(dir.path().join("b/RegTestB_copy.py").exists());
        assert!(!dir.path().join("b/RegTestB_debugRTC.py").exists());
    }
}
