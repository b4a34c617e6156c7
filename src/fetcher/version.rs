use serde::{Deserialize, Serialize};
use std::fmt;

const VERSION_MARKER: &str = "# Version:";
const MODIFIED_MARKER: &str = "# Last modified:";
/// Markers are only looked for in the header block.
pub const HEADER_LINES: usize = 20;

/// Opaque version marker taken from a blocklist header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Finds `# Version: x` in the first [`HEADER_LINES`] lines, falling back to
/// `# Last modified: x`. Empty markers are ignored.
pub fn extract_version(content: &str) -> Option<VersionToken> {
    let header: Vec<&str> = content
        .lines()
        .take(HEADER_LINES)
        .map(str::trim)
        .collect();

    find_marker(&header, VERSION_MARKER).or_else(|| find_marker(&header, MODIFIED_MARKER))
}

fn find_marker(lines: &[&str], marker: &str) -> Option<VersionToken> {
    lines
        .iter()
        .filter_map(|line| line.strip_prefix(marker))
        .map(str::trim)
        .find(|token| !token.is_empty())
        .map(VersionToken::new)
}
