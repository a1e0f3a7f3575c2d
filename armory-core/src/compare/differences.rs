use itertools::Itertools;
use std::fmt;

/// Ordered discrepancies found by a comparison.
///
/// Each line names the path of the differing field and, where possible, both
/// values. `Display` joins the lines with newlines, so the rendering of an
/// empty result is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Differences(Vec<String>);

impl Differences {
    /// Creates an empty result.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates a result with a single discrepancy.
    pub fn from_line(line: impl Into<String>) -> Self {
        Self(vec![line.into()])
    }

    /// Returns `true` if no discrepancy was found.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of discrepancies.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The discrepancy lines.
    pub fn lines(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` if any line starts with the given field path.
    pub fn mentions(&self, path: &str) -> bool {
        self.0.iter().any(|line| line.starts_with(path))
    }

    /// Appends a discrepancy.
    pub fn push(&mut self, line: impl Into<String>) {
        self.0.push(line.into());
    }

    /// Appends the discrepancies of a nested module, qualified with `prefix`.
    pub fn extend_prefixed(&mut self, prefix: &str, nested: Differences) {
        self.0
            .extend(nested.0.into_iter().map(|line| format!("{}.{}", prefix, line)));
    }

    /// Iterates over the discrepancy lines.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl fmt::Display for Differences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("\n"))
    }
}

impl IntoIterator for Differences {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
