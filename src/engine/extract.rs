use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

const MAX_DOMAIN_LEN: usize = 253;

static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9]+(-[a-z0-9]+)*\.)+[a-z]{2,}$").expect("hardcoded regex pattern is valid")
});

/// Case-insensitive syntax check; at most 253 characters.
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return false;
    }
    DOMAIN_REGEX.is_match(&domain.to_ascii_lowercase())
}

/// Deduplicated, lowercased, syntactically valid domains of one blocklist.
///
/// Iterates in lexicographic order so chunk contents are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainSet {
    domains: BTreeSet<String>,
}

impl DomainSet {
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }
}

impl FromIterator<String> for DomainSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            domains: iter.into_iter().collect(),
        }
    }
}

fn parse_line(line: &str) -> Option<String> {
    let line = line.trim();
    // Skip comments and empty lines
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let domain = line.to_ascii_lowercase();
    is_valid_domain(&domain).then_some(domain)
}

/// Parses raw blocklist text. Invalid lines are dropped silently.
pub fn extract_domains(text: &str) -> DomainSet {
    text.lines().filter_map(parse_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_domain() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("EXAMPLE.COM"));
        assert!(is_valid_domain("ads-1.tracker.co.uk"));
        assert!(!is_valid_domain("-bad.com"));
        assert!(!is_valid_domain("bad-.com"));
        assert!(!is_valid_domain("no_tld"));
        assert!(!is_valid_domain("localhost"));
        assert!(!is_valid_domain("example.c0m"));
        assert!(!is_valid_domain(""));

        let long = format!("{}.com", "a".repeat(254));
        assert!(!is_valid_domain(&long));
    }

    #[test]
    fn test_length_limit_is_inclusive() {
        // 249 + ".com" = 253
        let at_limit = format!("{}.com", "a".repeat(249));
        assert_eq!(at_limit.len(), 253);
        assert!(is_valid_domain(&at_limit));

        let over = format!("{}.com", "a".repeat(250));
        assert!(!is_valid_domain(&over));
    }

    #[test]
    fn test_extract_dedupes_and_drops_garbage() {
        let text = "# comment\nfoo.com\nFOO.com\nbar.invalid_\n\n";
        let set = extract_domains(text);
        assert_eq!(set.len(), 1);
        assert!(set.contains("foo.com"));
        assert_eq!(extract_domains(text), set);
    }

    #[test]
    fn test_extract_trims_and_sorts() {
        let text = "
        # Check comments
        zeta.net
          adserver.net
        # Empty line

        alpha.org
        ";
        let set = extract_domains(text);
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec!["adserver.net", "alpha.org", "zeta.net"]
        );
    }

    #[test]
    fn test_extract_empty_input() {
        assert!(extract_domains("# only comments\n\n").is_empty());
    }
}
