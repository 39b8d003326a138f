//! Parsers for the legacy artifacts that define a regression test group.
//!
//! A test group is described by three files living next to each other:
//!
//! ```text
//! RegressionTestFoo.bat ──► regtest.exe def=foo.xml exeTarget=.. rootDir=..\.. useConfig=foo_cfg.xml
//!        │                          │                               │
//!        │                          ▼                               ▼
//!        │                 definition XML                  catalogue XML
//!        │                 (NAME, server default)          (INIFILES, EQUALITYTESTS, FAILTESTS)
//!        ▼
//! RegTestFoo.py  (validation script, driven per catalogue entry)
//! ```
//!
//! | Parser | Input | Output |
//! |--------|-------|--------|
//! | [`batch::ArgumentLineParser`] | launcher text | [`BatchArguments`](crate::model::BatchArguments) |
//! | [`definition::DefinitionParser`] | definition XML | [`definition::TestDefinition`] |
//! | [`catalog::CatalogParser`] | catalogue XML | `Vec<`[`TestSuiteConfiguration`](crate::model::TestSuiteConfiguration)`>` |
//! | [`report::ReportParser`] | orchestrator stdout | [`CollectionResult`](crate::model::CollectionResult) |
//!
//! The argument parser and the report parser never fail; the XML parsers
//! return [`ParseError`] for malformed documents and unresolved references.

pub mod batch;
pub mod catalog;
pub mod definition;
pub mod report;
pub mod xml;

/// Result type for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors raised by the XML parsers.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The document is not well-formed XML.
    #[error("Malformed XML: {0}")]
    Xml(String),

    /// The document is well-formed but has no root element.
    #[error("Document has no root element")]
    MissingRoot,

    /// A catalogue test references an `inifile` id absent from `INIFILES`.
    #[error("Unknown inifile id '{id}' referenced by test '{test}'")]
    UnknownIniFile { id: String, test: String },
}

impl From<quick_xml::Error> for ParseError {
    fn from(err: quick_xml::Error) -> Self {
        ParseError::Xml(err.to_string())
    }
}
