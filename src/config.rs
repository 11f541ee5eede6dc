//! File configuration, persisted as TOML.
//!
//! ```toml
//! [agent]
//! max_steps = 15
//! duplicate_window = 5
//!
//! [graph]
//! base_iri = "https://example.org/"
//!
//! [graph.namespaces]
//! bldg = "https://example.org/bldg-59#"
//!
//! [llm]
//! model = "llama3.2"
//! ```
//!
//! Every key is optional; missing keys take the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::agent::AgentConfig;
use crate::agent::llm::OllamaConfig;
use crate::error::ConfigError;
use crate::graph::Namespaces;

/// Loop and executor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSection {
    /// Step budget per session.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// How many recent actions a candidate is compared against.
    #[serde(default = "default_duplicate_window")]
    pub duplicate_window: usize,
    /// Actions included in the decision-maker's context.
    #[serde(default = "default_history_last_n")]
    pub history_last_n: usize,
    /// Rows shown when rendering a query result.
    #[serde(default = "default_table_max_rows")]
    pub table_max_rows: usize,
    /// Rewrite common query mistakes before execution.
    #[serde(default = "default_repair_queries")]
    pub repair_queries: bool,
}

fn default_max_steps() -> usize {
    15
}
fn default_duplicate_window() -> usize {
    5
}
fn default_history_last_n() -> usize {
    10
}
fn default_table_max_rows() -> usize {
    10
}
fn default_repair_queries() -> bool {
    true
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            duplicate_window: default_duplicate_window(),
            history_last_n: default_history_last_n(),
            table_max_rows: default_table_max_rows(),
            repair_queries: default_repair_queries(),
        }
    }
}

/// Graph store settings. Namespaces (`brick`, `bldg`, `reference`) go in the
/// nested `[graph.namespaces]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphSection {
    /// Base IRI for resolving relative IRIs in loaded Turtle.
    #[serde(default = "default_base_iri")]
    pub base_iri: String,
    #[serde(default)]
    pub namespaces: Namespaces,
    /// Hits returned per search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// Examples returned per property lookup.
    #[serde(default = "default_property_example_limit")]
    pub property_example_limit: usize,
    /// Entries kept per lookup cache. 0 disables caching.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_base_iri() -> String {
    "https://example.org/".into()
}
fn default_search_limit() -> usize {
    8
}
fn default_property_example_limit() -> usize {
    5
}
fn default_cache_capacity() -> usize {
    1000
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            base_iri: default_base_iri(),
            namespaces: Namespaces::default(),
            search_limit: default_search_limit(),
            property_example_limit: default_property_example_limit(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Ollama settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "llama3.2".into()
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrickConfig {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub graph: GraphSection,
    #[serde(default)]
    pub llm: LlmSection,
}

impl BrickConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content, &path.display().to_string())
    }

    /// Parse TOML text. `origin` names the source in error messages.
    pub fn from_toml(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_steps == 0 {
            return Err(ConfigError::Invalid {
                message: "agent.max_steps must be at least 1".into(),
            });
        }
        if self.agent.history_last_n == 0 {
            return Err(ConfigError::Invalid {
                message: "agent.history_last_n must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Loop/executor settings for [`crate::agent::LoopDriver`].
    pub fn to_agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_steps: self.agent.max_steps,
            duplicate_window: self.agent.duplicate_window,
            history_last_n: self.agent.history_last_n,
            table_max_rows: self.agent.table_max_rows,
            repair_queries: self.agent.repair_queries,
            search_limit: self.graph.search_limit,
            property_example_limit: self.graph.property_example_limit,
        }
    }

    pub fn to_ollama_config(&self) -> OllamaConfig {
        OllamaConfig {
            base_url: self.llm.base_url.clone(),
            model: self.llm.model.clone(),
            timeout_secs: self.llm.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config = BrickConfig::from_toml("", "inline").unwrap();
        assert_eq!(config, BrickConfig::default());
        let agent = config.to_agent_config();
        assert_eq!(agent.max_steps, 15);
        assert_eq!(agent.duplicate_window, 5);
        assert_eq!(agent.history_last_n, 10);
        assert_eq!(agent.search_limit, 8);
        assert_eq!(agent.property_example_limit, 5);
        assert_eq!(config.graph.cache_capacity, 1000);
    }

    #[test]
    fn partial_sections_override() {
        let config = BrickConfig::from_toml(
            r#"
[agent]
max_steps = 4

[graph]
search_limit = 3

[graph.namespaces]
bldg = "urn:building#"

[llm]
model = "qwen2.5"
"#,
            "inline",
        )
        .unwrap();
        assert_eq!(config.agent.max_steps, 4);
        assert_eq!(config.agent.duplicate_window, 5);
        assert_eq!(config.graph.namespaces.bldg, "urn:building#");
        assert_eq!(
            config.graph.namespaces.brick,
            "https://brickschema.org/schema/Brick#"
        );
        assert_eq!(config.to_agent_config().search_limit, 3);
        assert_eq!(config.to_ollama_config().model, "qwen2.5");
        assert_eq!(config.to_ollama_config().timeout_secs, 120);
    }

    #[test]
    fn unknown_key_rejected() {
        let err = BrickConfig::from_toml("[agent]\nmax_step = 3\n", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unknown_graph_key_rejected() {
        let err = BrickConfig::from_toml("[graph]\nsearch_limt = 3\n", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = BrickConfig::from_toml("[graph.namespaces]\nbrik = \"urn:x#\"\n", "inline")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn zero_budget_rejected() {
        let err = BrickConfig::from_toml("[agent]\nmax_steps = 0\n", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("brick.toml");
        std::fs::write(&path, "[agent]\nduplicate_window = 3\n").unwrap();
        let config = BrickConfig::load(&path).unwrap();
        assert_eq!(config.agent.duplicate_window, 3);

        let missing = BrickConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
