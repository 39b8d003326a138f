//! Reproduction command handling.
//!
//! Two transformations live here:
//!
//! 1. [`format_output_array`] turns the list literal printed by a patched
//!    validation script into a flat, shell-quoted command string. This is how
//!    commands enter a [`DiscoveredTest`].
//! 2. [`CommandBuilder::build`] rewrites a stored command for a target
//!    environment on demand:
//!
//! | Mode | Root token becomes | Executable |
//! |------|--------------------|------------|
//! | absolute, Windows | `folder` + root token, resolved | unchanged |
//! | absolute, Linux | `<linux_home>/<last root segment>` | `.exe` stripped |
//! | relative, Windows | root relative to the executable's directory | file name only |
//! | relative, Linux | same, with `/` separators | file name, `.exe` stripped |
//!
//! Both functions return an empty string instead of an error when there is
//! nothing usable to produce; callers treat `""` as "no command".

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::DiscoveredTest;
use crate::paths::{self, PathStyle};

/// Default home directory substituted for the root on Linux targets.
pub const DEFAULT_LINUX_HOME: &str = "/home/user/.vs";

/// Build configuration substring used in Windows output paths.
pub const DEFAULT_WINDOWS_BUILD_CONFIG: &str = "windows-x86_64-vs-16-md";

/// Build configuration substring that replaces the Windows one on Linux.
pub const DEFAULT_LINUX_BUILD_CONFIG: &str = "linux-x86_64-clang-15-libstdc++11";

static EXE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\.exe(\s|"|$)"#).expect("exe suffix pattern is valid"));

/// Converts a Python-style list literal into a command string.
///
/// ```
/// use regtest_collector::command::format_output_array;
///
/// assert_eq!(
///     format_output_array("['/path/to/file', '--debug', 'value with spaces']"),
///     r#"-path\to\file --debug "value with spaces""#
/// );
/// assert_eq!(format_output_array("[]"), "");
/// assert_eq!(format_output_array("not an array"), "");
/// ```
///
/// Every `/` becomes `\` and doubled backslashes collapse, so the output is
/// always in Windows spelling. A token that starts with a separator is read
/// as a switch (`\debug` becomes `-debug`). Tokens containing whitespace are
/// wrapped in double quotes. Empty tokens are kept, so `['a', '', 'b']`
/// becomes `a  b`.
pub fn format_output_array(raw: &str) -> String {
    let trimmed = raw.trim();
    if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return String::new();
    }

    let flattened = trimmed
        .replace(['[', ']', '\''], " ")
        .replace('/', "\\")
        .replace("\\\\", "\\");

    flattened
        .split(',')
        .map(str::trim)
        .map(|token| {
            let token = match token.strip_prefix('\\') {
                Some(rest) => format!("-{rest}"),
                None => token.to_string(),
            };
            if token.contains(char::is_whitespace) {
                format!("\"{token}\"")
            } else {
                token
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Toggles for [`CommandBuilder::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOptions {
    /// Resolve the root token to an absolute path (otherwise relative to the
    /// executable's directory).
    pub absolute: bool,

    /// Produce a Windows command (otherwise Linux).
    pub windows: bool,

    /// Keep the executable as the first token.
    pub include_exe: bool,

    /// Insert `-d`.
    pub debug: bool,

    /// Insert `-v`.
    pub verbose: bool,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            absolute: true,
            windows: true,
            include_exe: true,
            debug: false,
            verbose: false,
        }
    }
}

/// Rewrites stored reproduction commands.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    style: PathStyle,
    linux_home: String,
    windows_build_config: String,
    linux_build_config: String,
}

impl CommandBuilder {
    pub fn new(style: PathStyle) -> Self {
        Self {
            style,
            linux_home: DEFAULT_LINUX_HOME.to_string(),
            windows_build_config: DEFAULT_WINDOWS_BUILD_CONFIG.to_string(),
            linux_build_config: DEFAULT_LINUX_BUILD_CONFIG.to_string(),
        }
    }

    /// Sets the home directory that replaces the root on Linux targets.
    pub fn with_linux_home(mut self, home: impl Into<String>) -> Self {
        self.linux_home = home.into();
        self
    }

    /// Sets the build-configuration substrings swapped for Linux targets.
    pub fn with_build_configs(
        mut self,
        windows: impl Into<String>,
        linux: impl Into<String>,
    ) -> Self {
        self.windows_build_config = windows.into();
        self.linux_build_config = linux.into();
        self
    }

    pub fn style(&self) -> PathStyle {
        self.style
    }

    /// Builds the command for `test` in the mode selected by `options`.
    ///
    /// Returns an empty string when the test has no command or the
    /// executable's directory cannot be determined in relative mode.
    pub fn build(&self, test: &DiscoveredTest, options: CommandOptions) -> String {
        if test.command.trim().is_empty() {
            return String::new();
        }

        let folder = test.folder.to_string_lossy();
        let root_token = test.root_dir.as_str();
        let mut absolute_root = paths::full_path(self.style, root_token, &folder);

        let mut command = if options.absolute {
            if !options.windows {
                let trimmed = absolute_root.trim_end_matches(['\\', '/']);
                absolute_root = format!(
                    "{}/{}",
                    self.linux_home.trim_end_matches('/'),
                    paths::file_name(trimmed)
                );
            }
            replace_token(&test.command, root_token, &absolute_root)
        } else {
            match self.relative_command(&test.command, root_token, &folder, &absolute_root) {
                Some(command) => command,
                None => {
                    debug!("No executable directory for test '{}'", test.name);
                    return String::new();
                }
            }
        };

        if !options.include_exe {
            command = command
                .split(' ')
                .filter(|token| !token.is_empty())
                .skip(1)
                .collect::<Vec<_>>()
                .join(" ");
        }

        if !options.windows {
            if !self.windows_build_config.is_empty() {
                command = command.replace(&self.windows_build_config, &self.linux_build_config);
            }
            command = command.replace('\\', "/");
            command = EXE_SUFFIX_RE.replace_all(&command, "${1}").into_owned();
        }

        let insert_at = if options.include_exe {
            command.find(' ').map_or(0, |idx| idx + 1)
        } else {
            0
        };
        if options.debug {
            command.insert_str(insert_at, "-d ");
        }
        if options.verbose {
            command.insert_str(insert_at, "-v ");
        }

        command
    }

    fn relative_command(
        &self,
        command: &str,
        root_token: &str,
        folder: &str,
        absolute_root: &str,
    ) -> Option<String> {
        let exe_token = command
            .split(' ')
            .find(|token| !token.is_empty())
            .unwrap_or_default()
            .trim_matches('"');

        let command = replace_token(command, exe_token, paths::file_name(exe_token));

        let exe_absolute = paths::full_path(self.style, exe_token, folder);
        let exe_dir = paths::directory_name(self.style, &exe_absolute)?;
        let relative_root = paths::relative_path(self.style, &exe_dir, absolute_root);

        let command = replace_token(&command, root_token, &relative_root);
        Some(replace_token(
            &command,
            &root_token.replace('\\', "/"),
            &relative_root.replace('\\', "/"),
        ))
    }
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(PathStyle::native())
    }
}

/// `str::replace` that leaves the text alone for an empty pattern.
fn replace_token(text: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        text.to_string()
    } else {
        text.replace(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMAND: &str = concat!(
        r"..\..\builds\windows-x86_64-vs-16-md-release\deploy\bin\candelastudio-se.exe v23compat -e dextImport ",
        r"-r ..\..\SETest\Source\ABS.cdd ",
        r"-i ..\..\SETest\Source\importDEXT.arxml ",
        r"-o ..\..\SETest\Check\Scenario_out.cdd -deact 1"
    );

    fn test() -> DiscoveredTest {
        DiscoveredTest::new("Test", "Group", COMMAND)
            .with_folder(r"D:\dev\studio\candelastudio\SETest\DeprecatedCLIs")
            .with_root_dir(r"..\..")
    }

    fn builder() -> CommandBuilder {
        CommandBuilder::new(PathStyle::Windows)
    }

    fn options(absolute: bool, windows: bool, include_exe: bool) -> CommandOptions {
        CommandOptions {
            absolute,
            windows,
            include_exe,
            ..CommandOptions::default()
        }
    }

    #[test]
    fn test_format_output_array() {
        assert_eq!(
            format_output_array("['/path/to/file', '--debug', 'value with spaces']"),
            r#"-path\to\file --debug "value with spaces""#
        );
        assert_eq!(
            format_output_array(r"['C:\\Program Files\\app.exe', '--arg']"),
            r#""C:\Program Files\app.exe" --arg"#
        );
        assert_eq!(format_output_array(r"['\debug', '\verbose']"), "-debug -verbose");
        assert_eq!(format_output_array("['a', '', 'b']"), "a  b");
    }

    #[test]
    fn test_format_output_array_rejects_non_lists() {
        assert_eq!(format_output_array("not an array format"), "");
        assert_eq!(format_output_array("[]"), "");
        assert_eq!(format_output_array("  [ ]  "), "");
        assert_eq!(format_output_array("['a'"), "");
        assert_eq!(format_output_array(""), "");
    }

    #[test]
    fn test_absolute_windows() {
        assert_eq!(
            builder().build(&test(), options(true, true, true)),
            concat!(
                r"D:\dev\studio\candelastudio\builds\windows-x86_64-vs-16-md-release\deploy\bin\candelastudio-se.exe v23compat -e dextImport ",
                r"-r D:\dev\studio\candelastudio\SETest\Source\ABS.cdd ",
                r"-i D:\dev\studio\candelastudio\SETest\Source\importDEXT.arxml ",
                r"-o D:\dev\studio\candelastudio\SETest\Check\Scenario_out.cdd -deact 1"
            )
        );
    }

    #[test]
    fn test_absolute_windows_without_exe() {
        assert_eq!(
            builder().build(&test(), options(true, true, false)),
            concat!(
                r"v23compat -e dextImport -r D:\dev\studio\candelastudio\SETest\Source\ABS.cdd ",
                r"-i D:\dev\studio\candelastudio\SETest\Source\importDEXT.arxml ",
                r"-o D:\dev\studio\candelastudio\SETest\Check\Scenario_out.cdd -deact 1"
            )
        );
    }

    #[test]
    fn test_relative_windows() {
        assert_eq!(
            builder().build(&test(), options(false, true, true)),
            concat!(
                r"candelastudio-se.exe v23compat -e dextImport ",
                r"-r ..\..\..\..\SETest\Source\ABS.cdd ",
                r"-i ..\..\..\..\SETest\Source\importDEXT.arxml ",
                r"-o ..\..\..\..\SETest\Check\Scenario_out.cdd -deact 1"
            )
        );
    }

    #[test]
    fn test_absolute_linux() {
        assert_eq!(
            builder().build(&test(), options(true, false, true)),
            concat!(
                "/home/user/.vs/candelastudio/builds/linux-x86_64-clang-15-libstdc++11-release/deploy/bin/candelastudio-se ",
                "v23compat -e dextImport ",
                "-r /home/user/.vs/candelastudio/SETest/Source/ABS.cdd ",
                "-i /home/user/.vs/candelastudio/SETest/Source/importDEXT.arxml ",
                "-o /home/user/.vs/candelastudio/SETest/Check/Scenario_out.cdd -deact 1"
            )
        );
    }

    #[test]
    fn test_relative_linux() {
        assert_eq!(
            builder().build(&test(), options(false, false, true)),
            concat!(
                "candelastudio-se v23compat -e dextImport ",
                "-r ../../../../SETest/Source/ABS.cdd ",
                "-i ../../../../SETest/Source/importDEXT.arxml ",
                "-o ../../../../SETest/Check/Scenario_out.cdd -deact 1"
            )
        );
    }

    #[test]
    fn test_root_token_never_survives() {
        for absolute in [true, false] {
            for windows in [true, false] {
                let command = builder().build(&test(), options(absolute, windows, true));
                assert!(!command.contains(r" ..\..\SETest"), "{command}");
                assert!(!command.contains(" ../../SETest"), "{command}");
            }
        }
    }

    #[test]
    fn test_custom_linux_home() {
        let command = builder()
            .with_linux_home("/opt/ws/")
            .build(&test(), options(true, false, false));
        assert!(command.contains("-r /opt/ws/candelastudio/SETest/Source/ABS.cdd"));
    }

    #[test]
    fn test_flags_follow_the_executable() {
        let opts = CommandOptions {
            debug: true,
            verbose: true,
            ..options(false, true, true)
        };
        let command = builder().build(&test(), opts);
        assert!(command.starts_with("candelastudio-se.exe -v -d v23compat"));

        let opts = CommandOptions {
            debug: true,
            ..options(false, true, false)
        };
        assert!(builder().build(&test(), opts).starts_with("-d v23compat"));
    }

    #[test]
    fn test_exe_suffix_only_stripped_at_token_end() {
        let test = DiscoveredTest::new("t", "g", r"..\bin\se.exe -i data.exemplar")
            .with_folder(r"C:\w\tests")
            .with_root_dir(r"..");
        let command = builder().build(&test, options(false, false, true));
        assert_eq!(command, "se -i data.exemplar");
    }

    #[test]
    fn test_empty_command_yields_empty_string() {
        let test = DiscoveredTest::new("t", "g", "")
            .with_folder(r"D:\dev\test")
            .with_root_dir(r"..\..");
        assert_eq!(builder().build(&test, CommandOptions::default()), "");
    }

    #[test]
    fn test_quoted_executable_keeps_quotes() {
        let test = DiscoveredTest::new("t", "g", r#""..\..\builds\app with spaces.exe" -arg value"#)
            .with_folder(r"D:\dev\test\folder")
            .with_root_dir(r"..\..");
        let command = builder().build(&test, options(false, true, true));
        assert!(command.starts_with(r#""app with spaces.exe""#), "{command}");
    }

    #[test]
    fn test_relative_without_executable_directory_is_empty() {
        let test = DiscoveredTest::new("t", "g", "se.exe -i a.txt").with_root_dir("..");
        assert_eq!(builder().build(&test, options(false, true, true)), "");
    }
}
