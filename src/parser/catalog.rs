//! Test-suite catalogue parsing.
//!
//! A catalogue enumerates the individual tests of a group:
//!
//! ```xml
//! <REGRESSIONTESTCONFIG>
//!   <INIFILES>
//!     <SOURCEDIR>%ROOTDIR;\configs</SOURCEDIR>
//!     <INIFILE id="default">default.ini</INIFILE>
//!   </INIFILES>
//!   <EQUALITYTESTS>
//!     <SOURCEDIR>%ROOTDIR;\input</SOURCEDIR>
//!     <TARGETDIR>%ROOTDIR;\output</TARGETDIR>
//!     <EQUALITYTEST Name="Import01" inifile="default">
//!       <SOURCEFILES><SOURCEFILE>a.txt</SOURCEFILE></SOURCEFILES>
//!       <OUTFILES><OUTFILE>a.out</OUTFILE></OUTFILES>
//!       <LOGFILE>a.log</LOGFILE>
//!       <ADDITIONAL-PARAMETERS>
//!         <PARAMETER value="s1">scenario</PARAMETER>
//!       </ADDITIONAL-PARAMETERS>
//!     </EQUALITYTEST>
//!   </EQUALITYTESTS>
//!   <FAILTESTS>...</FAILTESTS>
//! </REGRESSIONTESTCONFIG>
//! ```
//!
//! Only equality and fail tests are read. `SUCCESSTESTS` sections are left
//! alone even though [`TestKind::Success`] exists in the model.

use std::collections::HashMap;

use tracing::debug;

use super::xml::{Element, parse_document};
use super::{ParseError, ParseResult};
use crate::model::{TestKind, TestSuiteConfiguration};
use crate::paths::{self, PathStyle};

/// Placeholder replaced by the launcher's `rootDir` argument.
pub const ROOTDIR_PLACEHOLDER: &str = "%ROOTDIR;";

/// Kinds read from a catalogue, in output order.
const PARSED_KINDS: [TestKind; 2] = [TestKind::Equality, TestKind::Fail];

/// Parser for test-suite catalogues.
#[derive(Debug, Clone, Copy)]
pub struct CatalogParser {
    style: PathStyle,
}

impl CatalogParser {
    /// Creates a parser that joins directories with `style`'s separator.
    pub fn new(style: PathStyle) -> Self {
        Self { style }
    }

    /// Parses a catalogue, substituting `root_dir` for `%ROOTDIR;`.
    ///
    /// Tests without a `Name` attribute are skipped. A test referencing an
    /// `inifile` id that is not declared under `INIFILES` fails the whole
    /// parse with [`ParseError::UnknownIniFile`].
    pub fn parse(&self, xml: &str, root_dir: &str) -> ParseResult<Vec<TestSuiteConfiguration>> {
        let root = parse_document(xml)?;
        let ini_files = self.ini_files(&root, root_dir);

        let mut tests = Vec::new();
        for kind in PARSED_KINDS {
            tests.extend(self.tests(&root, kind, root_dir, &ini_files)?);
        }

        debug!(
            "Parsed {} catalogue tests ({} ini files)",
            tests.len(),
            ini_files.len()
        );

        Ok(tests)
    }

    fn ini_files(&self, root: &Element, root_dir: &str) -> HashMap<String, String> {
        let sections = root.find_all("INIFILES");

        let source_dir = sections
            .iter()
            .find_map(|section| section.child("SOURCEDIR"))
            .map(|e| e.text().replace(ROOTDIR_PLACEHOLDER, root_dir))
            .unwrap_or_default();

        let mut table = HashMap::new();
        for ini in sections.iter().flat_map(|s| s.children_named("INIFILE")) {
            let id = ini.attribute("id").unwrap_or_default();
            if id.trim().is_empty() {
                continue;
            }
            table.insert(
                id.to_string(),
                paths::join(self.style, &source_dir, &ini.text()),
            );
        }
        table
    }

    fn tests(
        &self,
        root: &Element,
        kind: TestKind,
        root_dir: &str,
        ini_files: &HashMap<String, String>,
    ) -> ParseResult<Vec<TestSuiteConfiguration>> {
        let Some(section) = root.child(kind.section_tag()) else {
            return Ok(Vec::new());
        };

        let dir = |tag: &str| {
            section
                .child(tag)
                .map(|e| e.text().replace(ROOTDIR_PLACEHOLDER, root_dir))
                .unwrap_or_default()
        };
        let source_dir = dir("SOURCEDIR");
        let target_dir = dir("TARGETDIR");

        let mut tests = Vec::new();
        for element in section.children_named(kind.element_tag()) {
            let Some(name) = element.attribute("Name") else {
                debug!("Skipping {} without a Name attribute", kind.element_tag());
                continue;
            };

            let ini_id = element.attribute("inifile").unwrap_or_default();
            let ini_file = ini_files
                .get(ini_id)
                .ok_or_else(|| ParseError::UnknownIniFile {
                    id: ini_id.to_string(),
                    test: name.to_string(),
                })?;

            let nested_text = |outer: &str, inner: &str| {
                element
                    .child(outer)
                    .and_then(|e| e.child(inner))
                    .map(|e| e.text())
                    .unwrap_or_default()
            };

            let mut config = TestSuiteConfiguration::new(name, kind);
            config.ini_file = ini_file.clone();
            config.source_file = paths::join(
                self.style,
                &source_dir,
                &nested_text("SOURCEFILES", "SOURCEFILE"),
            );
            config.out_file = paths::join(self.style, &target_dir, &nested_text("OUTFILES", "OUTFILE"));
            config.log_file = element.child("LOGFILE").map(|e| e.text()).unwrap_or_default();

            for param in element
                .children_named("ADDITIONAL-PARAMETERS")
                .flat_map(|p| p.children_named("PARAMETER"))
            {
                if let Some(value) = param.attribute("value") {
                    config
                        .additional_parameters
                        .insert(param.text(), value.to_string());
                }
            }

            tests.push(config);
        }

        Ok(tests)
    }
}

impl Default for CatalogParser {
    fn default() -> Self {
        Self::new(PathStyle::native())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = r"C:\TestRoot";

    fn parser() -> CatalogParser {
        CatalogParser::new(PathStyle::Windows)
    }

    fn catalogue(sections: &str) -> String {
        format!(
            r#"<root>
              <INIFILES>
                <SOURCEDIR>%ROOTDIR;/configs</SOURCEDIR>
                <INIFILE id="ini1">config1.ini</INIFILE>
              </INIFILES>
              {sections}
            </root>"#
        )
    }

    const EQUALITY: &str = r#"
        <EQUALITYTESTS>
          <SOURCEDIR>%ROOTDIR;/source</SOURCEDIR>
          <TARGETDIR>%ROOTDIR;/target</TARGETDIR>
          <EQUALITYTEST Name="EqualTest1" inifile="ini1">
            <SOURCEFILES><SOURCEFILE>input.txt</SOURCEFILE></SOURCEFILES>
            <OUTFILES><OUTFILE>output.txt</OUTFILE></OUTFILES>
          </EQUALITYTEST>
        </EQUALITYTESTS>"#;

    const FAIL: &str = r#"
        <FAILTESTS>
          <SOURCEDIR>source</SOURCEDIR>
          <TARGETDIR>target</TARGETDIR>
          <FAILTEST Name="FailTest1" inifile="ini1">
            <SOURCEFILES><SOURCEFILE>input.txt</SOURCEFILE></SOURCEFILES>
            <OUTFILES><OUTFILE>output.txt</OUTFILE></OUTFILES>
          </FAILTEST>
        </FAILTESTS>"#;

    #[test]
    fn test_equality_tests_resolve_paths() {
        let tests = parser().parse(&catalogue(EQUALITY), ROOT).unwrap();

        assert_eq!(tests.len(), 1);
        let test = &tests[0];
        assert_eq!(test.kind, TestKind::Equality);
        assert_eq!(test.name, "EqualTest1");
        assert_eq!(test.ini_file, r"C:\TestRoot/configs\config1.ini");
        assert_eq!(test.source_file, r"C:\TestRoot/source\input.txt");
        assert_eq!(test.out_file, r"C:\TestRoot/target\output.txt");
        assert_eq!(test.log_file, "");
    }

    #[test]
    fn test_equality_tests_come_before_fail_tests() {
        let xml = catalogue(&format!("{FAIL}{EQUALITY}"));
        let tests = parser().parse(&xml, ROOT).unwrap();

        let kinds: Vec<_> = tests.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, [TestKind::Equality, TestKind::Fail]);
        assert_eq!(tests[1].name, "FailTest1");
        assert_eq!(tests[1].source_file, r"source\input.txt");
    }

    #[test]
    fn test_success_tests_are_not_parsed() {
        let xml = catalogue(
            r#"<SUCCESSTESTS>
                 <SUCCESSTEST Name="S1" inifile="ini1"/>
               </SUCCESSTESTS>"#,
        );
        assert!(parser().parse(&xml, ROOT).unwrap().is_empty());
    }

    #[test]
    fn test_empty_root_yields_no_tests() {
        assert!(parser().parse("<root></root>", ROOT).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_xml_fails() {
        assert!(matches!(
            parser().parse("<invalid><unclosed>", ROOT),
            Err(ParseError::Xml(_))
        ));
    }

    #[test]
    fn test_nameless_test_is_skipped_without_affecting_siblings() {
        let xml = catalogue(
            r#"<EQUALITYTESTS>
                 <SOURCEDIR>s</SOURCEDIR>
                 <TARGETDIR>t</TARGETDIR>
                 <EQUALITYTEST inifile="unknown-but-ignored"/>
                 <EQUALITYTEST Name="Test2" inifile="ini1"/>
               </EQUALITYTESTS>"#,
        );
        let tests = parser().parse(&xml, ROOT).unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].name, "Test2");
    }

    #[test]
    fn test_unknown_inifile_fails_whole_parse() {
        let xml = catalogue(
            r#"<EQUALITYTESTS>
                 <EQUALITYTEST Name="Good" inifile="ini1"/>
                 <EQUALITYTEST Name="Bad" inifile="nonexistent"/>
               </EQUALITYTESTS>"#,
        );
        match parser().parse(&xml, ROOT) {
            Err(ParseError::UnknownIniFile { id, test }) => {
                assert_eq!(id, "nonexistent");
                assert_eq!(test, "Bad");
            }
            other => panic!("expected UnknownIniFile, got {other:?}"),
        }
    }

    #[test]
    fn test_additional_parameters() {
        let xml = catalogue(
            r#"<EQUALITYTESTS>
                 <EQUALITYTEST Name="T" inifile="ini1">
                   <ADDITIONAL-PARAMETERS>
                     <PARAMETER value="verbose">v</PARAMETER>
                     <PARAMETER value="debug">d</PARAMETER>
                     <PARAMETER>novalue</PARAMETER>
                   </ADDITIONAL-PARAMETERS>
                   <LOGFILE>test.log</LOGFILE>
                 </EQUALITYTEST>
               </EQUALITYTESTS>"#,
        );
        let tests = parser().parse(&xml, ROOT).unwrap();
        let params = &tests[0].additional_parameters;
        assert_eq!(params.len(), 2);
        assert_eq!(params["v"], "verbose");
        assert_eq!(params["d"], "debug");
        assert_eq!(tests[0].log_file, "test.log");
    }

    #[test]
    fn test_missing_source_files_leave_directory_only() {
        let xml = catalogue(
            r#"<EQUALITYTESTS>
                 <SOURCEDIR>source</SOURCEDIR>
                 <EQUALITYTEST Name="T" inifile="ini1"/>
               </EQUALITYTESTS>"#,
        );
        let tests = parser().parse(&xml, ROOT).unwrap();
        assert_eq!(tests[0].source_file, "source");
        assert_eq!(tests[0].out_file, "");
    }
}
