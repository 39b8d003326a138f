//! Test-definition document parsing.
//!
//! ```xml
//! <REGRESSIONTEST>
//!   <NAME>Import</NAME>
//!   <PARAMETERS>
//!     <ADDITIONAL-PARAMETERS>
//!       <PARAMETER defaultValue="%EXETARGET;\server.exe">server</PARAMETER>
//!     </ADDITIONAL-PARAMETERS>
//!   </PARAMETERS>
//! </REGRESSIONTEST>
//! ```

use serde::{Deserialize, Serialize};

use super::ParseResult;
use super::xml::parse_document;

/// Data extracted from a test-definition document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDefinition {
    /// Group name, empty if the document has no `NAME`.
    pub name: String,

    /// Default value of the `server` parameter, empty if not declared.
    pub server_default: String,
}

impl TestDefinition {
    /// Replaces the `%EXETARGET;` and `%ROOTDIR;` placeholders in the server
    /// default value.
    pub fn resolve_server(&mut self, exe_target: &str, root_dir: &str) {
        self.server_default = self
            .server_default
            .replace("%EXETARGET;", exe_target)
            .replace("%ROOTDIR;", root_dir);
    }
}

/// Parser for test-definition documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionParser;

impl DefinitionParser {
    pub fn new() -> Self {
        Self
    }

    /// Extracts the group name and the server default value.
    ///
    /// The `server` parameter is searched anywhere in the document; only a
    /// `PARAMETER` element whose own text is exactly `server` qualifies.
    pub fn parse(&self, xml: &str) -> ParseResult<TestDefinition> {
        let root = parse_document(xml)?;

        let name = root.child("NAME").map(|e| e.text()).unwrap_or_default();

        let server_default = root
            .find_all("PARAMETER")
            .into_iter()
            .find(|e| e.has_text_node("server"))
            .and_then(|e| e.attribute("defaultValue"))
            .unwrap_or_default()
            .to_string();

        Ok(TestDefinition {
            name,
            server_default,
        })
    }
}
