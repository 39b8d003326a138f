//! Search filtering over discovered tests.

use std::collections::BTreeSet;

use crate::model::DiscoveredTest;
use crate::text::{contains_all, parse_search_terms};

/// Group selection that stands for every group.
pub const ALL_GROUPS: &str = "(All)";

/// A parsed search query, optionally restricted to a set of groups.
///
/// A test matches when every term occurs, case-insensitively, in at least
/// one of its name, group or command, and its group is selected. An empty
/// query and an empty group set match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestFilter {
    terms: Vec<String>,
    groups: BTreeSet<String>,
}

impl TestFilter {
    pub fn new(query: &str) -> Self {
        Self {
            terms: parse_search_terms(query),
            groups: BTreeSet::new(),
        }
    }

    /// Restricts matches to the given groups. Selecting [`ALL_GROUPS`]
    /// clears the restriction.
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        if self.groups.contains(ALL_GROUPS) {
            self.groups.clear();
        }
        self
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.groups.is_empty()
    }

    pub fn matches(&self, test: &DiscoveredTest) -> bool {
        if !self.groups.is_empty() && !self.groups.contains(&test.group) {
            return false;
        }
        self.terms.iter().all(|term| {
            let term = std::slice::from_ref(term);
            contains_all(&test.name, term)
                || contains_all(&test.group, term)
                || contains_all(&test.command, term)
        })
    }

    /// Returns the matching tests in their original order.
    pub fn apply<'a>(&self, tests: &'a [DiscoveredTest]) -> Vec<&'a DiscoveredTest> {
        tests.iter().filter(|t| self.matches(t)).collect()
    }
}

/// Distinct group names of `tests`, sorted, preceded by [`ALL_GROUPS`].
pub fn group_choices(tests: &[DiscoveredTest]) -> Vec<String> {
    let groups: BTreeSet<&str> = tests.iter().map(|t| t.group.as_str()).collect();
    std::iter::once(ALL_GROUPS)
        .chain(groups)
        .map(str::to_string)
        .collect()
}
