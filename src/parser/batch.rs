//! Launcher (batch file) argument extraction.
//!
//! Only lines starting with the qualifier (case-insensitive) are scanned.
//! On such a line every `key=value` token is collected, where the value is
//! an unquoted run of non-whitespace characters, a `"double quoted"` string,
//! or a `'single quoted'` string:
//!
//! ```text
//! @echo off
//! regtest.exe def=Group.xml exeTarget=..\bin rootDir="..\.." useConfig=cfg.xml
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::model::BatchArguments;

/// Qualifier of the line that invokes the regression test runner.
pub const DEFAULT_QUALIFIER: &str = "regtest.exe";

/// Keys a launcher must define to be collectable, in reporting order.
pub const REQUIRED_ARGUMENTS: [&str; 4] = ["def", "exeTarget", "rootDir", "useConfig"];

static ARGUMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\w+)=([^\s"']+|"[^"]*"|'[^']*')"#).expect("argument pattern is valid")
});

/// Extracts `key=value` arguments from qualifying lines of a batch file.
#[derive(Debug, Clone)]
pub struct ArgumentLineParser {
    qualifier: String,
}

impl ArgumentLineParser {
    pub fn new(qualifier: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
        }
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    fn qualifies(&self, line: &str) -> bool {
        line.get(..self.qualifier.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(&self.qualifier))
    }

    /// Parses the full text of a batch file.
    ///
    /// Later qualifying lines overwrite keys defined by earlier ones. Tokens
    /// that do not fit the `key=value` grammar are skipped.
    pub fn parse(&self, text: &str) -> BatchArguments {
        let mut args = BatchArguments::new();

        for line in text.lines().filter(|line| self.qualifies(line)) {
            for cap in ARGUMENT_RE.captures_iter(line) {
                let value = cap[2].trim_matches('"').trim_matches('\'');
                args.insert(cap[1].to_string(), value.to_string());
            }
        }

        args
    }
}

impl Default for ArgumentLineParser {
    fn default() -> Self {
        Self::new(DEFAULT_QUALIFIER)
    }
}

/// Returns the required keys missing from `args`, in [`REQUIRED_ARGUMENTS`] order.
pub fn missing_arguments(args: &BatchArguments) -> Vec<&'static str> {
    REQUIRED_ARGUMENTS
        .into_iter()
        .filter(|key| !args.contains_key(*key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ArgumentLineParser {
        ArgumentLineParser::new("TEST")
    }

    #[test]
    fn test_extracts_key_value_pairs() {
        let args = parser().parse("TEST arg1=val1 arg2=val2");
        assert_eq!(args.len(), 2);
        assert_eq!(args["arg1"], "val1");
        assert_eq!(args["arg2"], "val2");
    }

    #[test]
    fn test_non_matching_qualifier_is_ignored() {
        assert!(parser().parse("NoTest arg1=val1 arg2=val2").is_empty());
    }

    #[test]
    fn test_qualifier_ignores_case() {
        let args = parser().parse("teST arg1=val1");
        assert_eq!(args["arg1"], "val1");
    }

    #[test]
    fn test_quotes_are_removed() {
        let args = parser().parse(r#"TEST arg1="val1 with quote" arg2='val2 with single quote'"#);
        assert_eq!(args["arg1"], "val1 with quote");
        assert_eq!(args["arg2"], "val2 with single quote");
    }

    #[test]
    fn test_qualifier_only_yields_empty_map() {
        assert!(parser().parse("TEST").is_empty());
        assert!(parser().parse("").is_empty());
    }

    #[test]
    fn test_later_lines_overwrite_only_redefined_keys() {
        let text = "TEST a=1 b=2\nrem c=3\nTEST b=20";
        let args = parser().parse(text);
        assert_eq!(args.len(), 2);
        assert_eq!(args["a"], "1");
        assert_eq!(args["b"], "20");
        assert!(!args.contains_key("c"));
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let line = r#"TEST def=a.xml rootDir="..\..""#;
        assert_eq!(parser().parse(line), parser().parse(line));
        assert_eq!(parser().parse(line)["rootDir"], r"..\..");
    }

    #[test]
    fn test_malformed_tokens_are_skipped() {
        let args = parser().parse("TEST =novalue key= ok=yes");
        assert_eq!(args.len(), 1);
        assert_eq!(args["ok"], "yes");
    }

    #[test]
    fn test_windows_line_endings() {
        let args = ArgumentLineParser::default()
            .parse("@echo off\r\nregtest.exe def=d.xml exeTarget=..\\bin\r\n");
        assert_eq!(args["def"], "d.xml");
        assert_eq!(args["exeTarget"], r"..\bin");
    }

    #[test]
    fn test_missing_arguments_in_fixed_order() {
        let mut args = BatchArguments::new();
        assert_eq!(missing_arguments(&args), REQUIRED_ARGUMENTS);

        args.insert("rootDir".into(), "..".into());
        args.insert("extra".into(), "x".into());
        assert_eq!(missing_arguments(&args), ["def", "exeTarget", "useConfig"]);

        for key in REQUIRED_ARGUMENTS {
            args.insert(key.into(), "v".into());
        }
        assert!(missing_arguments(&args).is_empty());
    }
}
