use super::extract::DomainSet;

/// Maximum domains per remote list.
pub const CHUNK_SIZE: usize = 1000;
/// Advisory threshold under the account's hard limit of ~1000 lists.
pub const MAX_LISTS_WARNING: usize = 900;
/// Advisory proxy for the service's traffic-expression size limit.
pub const MAX_EXPRESSION_LEN: usize = 4000;

/// A bounded slice of a [`DomainSet`]; `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub domains: Vec<String>,
}

/// Splits `set` into contiguous chunks of at most `size` domains, in set order.
pub fn chunk_domains(set: &DomainSet, size: usize) -> Vec<Chunk> {
    let domains: Vec<String> = set.iter().map(str::to_string).collect();
    domains
        .chunks(size.max(1))
        .enumerate()
        .map(|(i, slice)| Chunk {
            index: i + 1,
            domains: slice.to_vec(),
        })
        .collect()
}

/// Names of the remote objects owned by one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNaming {
    source: String,
    list_prefix: String,
    policy_name: String,
}

impl SourceNaming {
    pub fn new(source_name: &str) -> Self {
        Self {
            source: source_name.to_string(),
            list_prefix: format!("{}_List_", source_name.replace(' ', "_")),
            policy_name: format!("Block {}", source_name),
        }
    }

    pub fn list_prefix(&self) -> &str {
        &self.list_prefix
    }

    pub fn policy_name(&self) -> &str {
        &self.policy_name
    }

    pub fn list_name(&self, index: usize) -> String {
        format!("{}{}", self.list_prefix, index)
    }

    pub fn owns_list(&self, list_name: &str) -> bool {
        list_name.starts_with(&self.list_prefix)
    }

    pub fn list_description(&self, index: usize, total: usize) -> String {
        format!("{} Chunk {}/{}", self.source, index, total)
    }

    pub fn policy_description(&self, lists: usize, domains: usize) -> String {
        format!(
            "Block domains from {} ({} lists, {} domains)",
            self.source, lists, domains
        )
    }
}

/// OR of "DNS query domain is in list X", one term per list id.
pub fn build_traffic_expression<S: AsRef<str>>(list_ids: &[S]) -> String {
    list_ids
        .iter()
        .map(|id| format!("any(dns.domains[*] in ${})", id.as_ref()))
        .collect::<Vec<_>>()
        .join(" or ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_set(n: usize) -> DomainSet {
        (0..n).map(|i| format!("d{:05}.com", i)).collect()
    }

    #[test]
    fn test_chunk_count_and_coverage() {
        for n in [1, 999, 1000, 1001, 2500] {
            let set = numbered_set(n);
            let chunks = chunk_domains(&set, CHUNK_SIZE);
            assert_eq!(chunks.len(), n.div_ceil(CHUNK_SIZE));
            assert!(chunks.iter().all(|c| c.domains.len() <= CHUNK_SIZE));

            let flattened: Vec<&str> = chunks
                .iter()
                .flat_map(|c| c.domains.iter().map(String::as_str))
                .collect();
            assert_eq!(flattened, set.iter().collect::<Vec<_>>());

            let indexes: Vec<usize> = chunks.iter().map(|c| c.index).collect();
            assert_eq!(indexes, (1..=chunks.len()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_chunking_is_stable() {
        let set = numbered_set(2500);
        assert_eq!(chunk_domains(&set, 1000), chunk_domains(&set, 1000));
        assert!(chunk_domains(&DomainSet::default(), 1000).is_empty());
    }

    #[test]
    fn test_naming() {
        let naming = SourceNaming::new("Hagezi Pro++");
        assert_eq!(naming.policy_name(), "Block Hagezi Pro++");
        assert_eq!(naming.list_name(3), "Hagezi_Pro++_List_3");
        assert!(naming.owns_list("Hagezi_Pro++_List_12"));
        assert!(!naming.owns_list("Hagezi_Pro_List_1"));
        assert_eq!(naming.list_description(2, 5), "Hagezi Pro++ Chunk 2/5");
    }

    #[test]
    fn test_traffic_expression() {
        assert_eq!(
            build_traffic_expression(&["abc"]),
            "any(dns.domains[*] in $abc)"
        );
        assert_eq!(
            build_traffic_expression(&["a", "b"]),
            "any(dns.domains[*] in $a) or any(dns.domains[*] in $b)"
        );
    }
}
