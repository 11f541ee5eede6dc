//! Graph store: the Brick building graph the agent queries.
//!
//! The agent never talks to oxigraph directly. Everything it needs goes through
//! the [`GraphBackend`] trait:
//!
//! - **SPARQL execution** ([`GraphBackend::query`]): rows plus a [`QueryStatus`]
//! - **Entity search** ([`GraphBackend::search`]): free-text lookup of sensors and equipment
//! - **Entity inspection** ([`GraphBackend::inspect_entity`]): outgoing edges and types
//! - **Property examples** ([`GraphBackend::property_examples`]): sample usages of a relation
//!
//! [`sparql::SparqlGraph`] is the oxigraph-backed implementation and
//! [`cache::CachedGraph`] memoizes search/inspect lookups on top of any backend.

pub mod cache;
pub mod format;
pub mod result;
pub mod sparql;
pub mod timeseries;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use crate::error::{GraphError, GraphResult};
pub use result::{Binding, QueryResult, QueryStatus, Row};

/// RDF namespace for `rdf:`.
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
/// RDF namespace for `rdfs:`.
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
/// RDF namespace for `xsd:`.
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

/// The three Brick namespaces that vary between deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Namespaces {
    /// Brick ontology classes (`brick:`).
    #[serde(default = "default_brick_ns")]
    pub brick: String,
    /// Building instance data (`bldg:`). Bare entity ids resolve here.
    #[serde(default = "default_bldg_ns")]
    pub bldg: String,
    /// Brick time-series reference properties (`ref:`).
    #[serde(default = "default_ref_ns")]
    pub reference: String,
}

fn default_brick_ns() -> String {
    "https://brickschema.org/schema/Brick#".into()
}
fn default_bldg_ns() -> String {
    "https://example.org/bldg-59#".into()
}
fn default_ref_ns() -> String {
    "https://brickschema.org/schema/Brick/ref#".into()
}

impl Default for Namespaces {
    fn default() -> Self {
        Self {
            brick: default_brick_ns(),
            bldg: default_bldg_ns(),
            reference: default_ref_ns(),
        }
    }
}

impl Namespaces {
    /// `(prefix, namespace)` pairs, in declaration order.
    pub fn prefixes(&self) -> [(&str, &str); 6] {
        [
            ("brick", self.brick.as_str()),
            ("bldg", self.bldg.as_str()),
            ("ref", self.reference.as_str()),
            ("rdf", RDF_NS),
            ("rdfs", RDFS_NS),
            ("xsd", XSD_NS),
        ]
    }

    /// The `PREFIX` block prepended to queries that declare none.
    pub fn prefix_block(&self) -> String {
        let mut block = String::new();
        for (prefix, ns) in self.prefixes() {
            block.push_str(&format!("PREFIX {prefix}: <{ns}>\n"));
        }
        block
    }

    /// Expand a prefixed name like `ref:hasObservation` to a full IRI.
    ///
    /// Returns `None` for unknown prefixes.
    pub fn expand(&self, prefixed: &str) -> Option<String> {
        let (prefix, local) = prefixed.split_once(':')?;
        self.prefixes()
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, ns)| format!("{ns}{local}"))
    }

    /// Resolve an entity id to an IRI. Full IRIs pass through, bare ids land in `bldg:`.
    pub fn entity_iri(&self, id: &str) -> String {
        if id.starts_with("http") {
            id.to_string()
        } else if let Some(iri) = self.expand(id) {
            iri
        } else {
            format!("{}{id}", self.bldg)
        }
    }

    /// Resolve a property name to an IRI. Bare names land in `ref:`.
    pub fn property_iri(&self, name: &str) -> String {
        self.property_iris(name).swap_remove(0)
    }

    /// Candidate IRIs for a property name, most likely first. A bare name may
    /// live in `ref:` or `brick:`.
    pub fn property_iris(&self, name: &str) -> Vec<String> {
        if name.starts_with("http") {
            vec![name.to_string()]
        } else if let Some(iri) = self.expand(name) {
            vec![iri]
        } else {
            vec![
                format!("{}{name}", self.reference),
                format!("{}{name}", self.brick),
            ]
        }
    }
}

/// Local name of an IRI: the part after the last `#`, or after the last `/`.
pub fn local_name(iri: &str) -> &str {
    if let Some((_, local)) = iri.rsplit_once('#') {
        local
    } else if let Some((_, local)) = iri.rsplit_once('/') {
        local
    } else {
        iri
    }
}

/// One hit from an entity search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Local name of the entity.
    pub id: String,
    /// Full IRI.
    pub uri: String,
    /// `rdfs:label`, or the local name when unlabeled.
    pub label: String,
    /// Local name of the matched `rdf:type`.
    pub entity_type: String,
    /// One-line human description.
    pub description: String,
}

/// A single value of an entity property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// A literal with its datatype IRI (`"string"` when untyped).
    Literal { value: String, datatype: String },
    /// A node reference: local name plus full IRI.
    Uri { value: String, uri: String },
}

impl PropertyValue {
    /// Display value (literal lexical form or IRI local name).
    pub fn value(&self) -> &str {
        match self {
            Self::Literal { value, .. } | Self::Uri { value, .. } => value,
        }
    }
}

/// Outgoing edges and declared types of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    /// The id as requested.
    pub entity: String,
    /// Full IRI the id resolved to.
    pub uri: String,
    /// Local names of `rdf:type` objects.
    pub types: Vec<String>,
    /// Property local name -> values.
    pub properties: BTreeMap<String, Vec<PropertyValue>>,
}

/// One `(subject, property, object)` usage of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyExample {
    pub subject: String,
    pub property: String,
    pub object: String,
}

/// Read access to a Brick graph.
///
/// Implementations are populated before any session starts and only read
/// afterwards, so every method takes `&self`.
pub trait GraphBackend: Send + Sync {
    /// Execute a SPARQL query. Never fails: errors are folded into the status.
    fn query(&self, sparql: &str) -> (Vec<Row>, QueryStatus);

    /// Search entities whose IRI, type or label contains `term` (case-insensitive).
    fn search(&self, term: &str, limit: usize) -> GraphResult<Vec<SearchHit>>;

    /// Fetch all outgoing edges and types for an entity id.
    fn inspect_entity(&self, id: &str) -> GraphResult<EntityRecord>;

    /// Fetch up to `limit` usages of a property.
    fn property_examples(&self, property: &str, limit: usize)
    -> GraphResult<Vec<PropertyExample>>;
}

impl<G: GraphBackend + ?Sized> GraphBackend for &G {
    fn query(&self, sparql: &str) -> (Vec<Row>, QueryStatus) {
        (**self).query(sparql)
    }

    fn search(&self, term: &str, limit: usize) -> GraphResult<Vec<SearchHit>> {
        (**self).search(term, limit)
    }

    fn inspect_entity(&self, id: &str) -> GraphResult<EntityRecord> {
        (**self).inspect_entity(id)
    }

    fn property_examples(
        &self,
        property: &str,
        limit: usize,
    ) -> GraphResult<Vec<PropertyExample>> {
        (**self).property_examples(property, limit)
    }
}
