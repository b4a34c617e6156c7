use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard response envelope of the gateway API.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub result_info: Option<ResultInfo>,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ResultInfo {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Object returned by create calls; only the id is used.
#[derive(Debug, Deserialize)]
pub struct Created {
    pub id: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RemoteList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RemotePolicy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub traffic: String,
}

impl fmt::Display for RemoteList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "list {} ({})", self.name, self.id)
    }
}

impl fmt::Display for RemotePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "policy {} ({})", self.name, self.id)
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub value: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct NewList {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub items: Vec<ListItem>,
}

impl NewList {
    pub fn domains(name: String, description: String, domains: &[String]) -> Self {
        Self {
            name,
            kind: "DOMAIN".to_string(),
            description,
            items: domains
                .iter()
                .map(|d| ListItem { value: d.clone() })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct NewPolicy {
    pub name: String,
    pub description: String,
    pub action: String,
    pub enabled: bool,
    pub filters: Vec<String>,
    pub traffic: String,
}

impl NewPolicy {
    /// Enabled DNS block rule.
    pub fn dns_block(name: String, description: String, traffic: String) -> Self {
        Self {
            name,
            description,
            action: "block".to_string(),
            enabled: true,
            filters: vec!["dns".to_string()],
            traffic,
        }
    }
}
