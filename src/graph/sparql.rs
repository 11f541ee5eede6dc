//! Brick graph backed by oxigraph.
//!
//! Holds the building model (Turtle) plus any ingested time-series observations
//! and answers the agent's SPARQL, search, inspect and property-example calls.

use std::collections::BTreeMap;
use std::path::Path;

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{GraphNameRef, Literal, NamedNode, Quad, Term};
use oxigraph::sparql::{Query, QueryResults};
use oxigraph::store::Store;

use crate::error::GraphError;

use super::{
    local_name, Binding, EntityRecord, GraphBackend, GraphResult, Namespaces, PropertyExample,
    PropertyValue, QueryStatus, Row, SearchHit, RDF_NS,
};

/// In-memory SPARQL-capable Brick graph.
///
/// Each value owns its own oxigraph store; separate instances never share data.
pub struct SparqlGraph {
    store: Store,
    namespaces: Namespaces,
    base_iri: String,
}

impl SparqlGraph {
    /// Create an empty in-memory graph.
    pub fn in_memory(namespaces: Namespaces, base_iri: impl Into<String>) -> GraphResult<Self> {
        let store = Store::new().map_err(|e| GraphError::Sparql {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self {
            store,
            namespaces,
            base_iri: base_iri.into(),
        })
    }

    /// Create a graph and load a Turtle file into it.
    pub fn from_turtle_file(
        path: &Path,
        namespaces: Namespaces,
        base_iri: impl Into<String>,
    ) -> GraphResult<Self> {
        let graph = Self::in_memory(namespaces, base_iri)?;
        let data = std::fs::read_to_string(path).map_err(|e| GraphError::Load {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;
        let loaded = graph.load_turtle(&data, &path.display().to_string())?;
        tracing::info!(path = %path.display(), triples = loaded, "loaded Brick model");
        Ok(graph)
    }

    /// Parse Turtle text into the store. Relative IRIs resolve against the base IRI.
    ///
    /// Returns the store size after loading.
    pub fn load_turtle(&self, data: &str, source_name: &str) -> GraphResult<usize> {
        let parser = RdfParser::from_format(RdfFormat::Turtle)
            .with_base_iri(self.base_iri.as_str())
            .map_err(|e| GraphError::Load {
                source_name: source_name.to_string(),
                message: format!("invalid base IRI \"{}\": {e}", self.base_iri),
            })?;
        self.store
            .load_from_reader(parser, data.as_bytes())
            .map_err(|e| GraphError::Load {
                source_name: source_name.to_string(),
                message: e.to_string(),
            })?;
        self.len()
    }

    /// Insert one triple with an IRI object.
    pub fn insert_link(&self, subject: &str, predicate: &str, object: &str) -> GraphResult<()> {
        let object = Self::named_node(object)?;
        self.insert(subject, predicate, object.into())
    }

    /// Insert one triple with a typed literal object.
    pub fn insert_literal(
        &self,
        subject: &str,
        predicate: &str,
        value: &str,
        datatype: &str,
    ) -> GraphResult<()> {
        let datatype = Self::named_node(datatype)?;
        self.insert(subject, predicate, Literal::new_typed_literal(value, datatype).into())
    }

    fn insert(&self, subject: &str, predicate: &str, object: Term) -> GraphResult<()> {
        let quad = Quad::new(
            Self::named_node(subject)?,
            Self::named_node(predicate)?,
            object,
            GraphNameRef::DefaultGraph,
        );
        self.store.insert(&quad).map_err(|e| GraphError::Sparql {
            message: format!("insert failed: {e}"),
        })?;
        Ok(())
    }

    fn named_node(iri: &str) -> GraphResult<NamedNode> {
        NamedNode::new(iri).map_err(|e| GraphError::InvalidIri {
            iri: iri.to_string(),
            message: e.to_string(),
        })
    }

    /// Number of triples in the store.
    pub fn len(&self) -> GraphResult<usize> {
        self.store.len().map_err(|e| GraphError::Sparql {
            message: format!("failed to count triples: {e}"),
        })
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> GraphResult<bool> {
        self.len().map(|n| n == 0)
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// Run a query, failing with the store's message on any error.
    ///
    /// Queries that declare no `PREFIX` get the standard Brick prefixes.
    pub fn select(&self, sparql: &str) -> GraphResult<Vec<Row>> {
        let text = if sparql.to_uppercase().contains("PREFIX") {
            sparql.to_string()
        } else {
            format!("{}{sparql}", self.namespaces.prefix_block())
        };

        let query = Query::try_from(text.as_str()).map_err(|e| GraphError::SparqlSyntax {
            message: e.to_string(),
        })?;
        let results = self.store.query(query).map_err(|e| GraphError::Sparql {
            message: e.to_string(),
        })?;

        let mut rows = Vec::new();
        match results {
            QueryResults::Solutions(solutions) => {
                for solution in solutions {
                    let solution = solution.map_err(|e| GraphError::Sparql {
                        message: format!("solution error: {e}"),
                    })?;
                    let mut row = Row::new();
                    for (var, term) in solution.iter() {
                        row.push(var.as_str(), term_to_binding(term));
                    }
                    // Rows where every projected variable is unbound carry nothing.
                    if !row.is_empty() {
                        rows.push(row);
                    }
                }
            }
            QueryResults::Boolean(b) => {
                rows.push(Row::new().with(
                    "result",
                    Binding::literal(b.to_string(), format!("{}boolean", super::XSD_NS)),
                ));
            }
            QueryResults::Graph(triples) => {
                for triple in triples {
                    let triple = triple.map_err(|e| GraphError::Sparql {
                        message: format!("triple error: {e}"),
                    })?;
                    rows.push(
                        Row::new()
                            .with("subject", Binding::node(triple.subject.to_string()))
                            .with("predicate", Binding::node(triple.predicate.as_str()))
                            .with("object", term_to_binding(&triple.object)),
                    );
                }
            }
        }
        Ok(rows)
    }
}

fn term_to_binding(term: &Term) -> Binding {
    match term {
        Term::NamedNode(node) => Binding::node(node.as_str()),
        Term::BlankNode(node) => Binding::node(node.as_str()),
        Term::Literal(literal) => {
            Binding::literal(literal.value(), literal.datatype().as_str())
        }
        #[allow(unreachable_patterns)]
        other => Binding::node(other.to_string()),
    }
}

/// Escape a user term for use inside a SPARQL string literal.
fn escape_literal(term: &str) -> String {
    term.replace('\\', "\\\\").replace('"', "\\\"")
}

impl GraphBackend for SparqlGraph {
    fn query(&self, sparql: &str) -> (Vec<Row>, QueryStatus) {
        match self.select(sparql) {
            Ok(rows) if rows.is_empty() => (rows, QueryStatus::EmptyResult),
            Ok(rows) => (rows, QueryStatus::Success),
            Err(e) => {
                let message = e.to_string();
                let status = match e {
                    GraphError::SparqlSyntax { .. } => QueryStatus::SyntaxError,
                    _ => QueryStatus::classify_error(&message),
                };
                tracing::warn!(%status, error = %message, "SPARQL execution failed");
                (Vec::new(), status)
            }
        }
    }

    fn search(&self, term: &str, limit: usize) -> GraphResult<Vec<SearchHit>> {
        let needle = escape_literal(&term.to_lowercase());
        let query = format!(
            "SELECT DISTINCT ?entity ?type ?label WHERE {{
                ?entity rdf:type ?type .
                OPTIONAL {{ ?entity rdfs:label ?label }}
                FILTER(CONTAINS(LCASE(STR(?entity)), \"{needle}\") ||
                       CONTAINS(LCASE(STR(?type)), \"{needle}\") ||
                       CONTAINS(LCASE(STR(?label)), \"{needle}\"))
            }}
            LIMIT {limit}"
        );

        let rows = self.select(&query)?;
        let hits = rows
            .iter()
            .filter_map(|row| {
                let uri = row.get("entity")?.value.clone();
                let type_iri = row.get("type").map(|b| b.value.as_str()).unwrap_or("");
                let id = local_name(&uri).to_string();
                let entity_type = local_name(type_iri).to_string();
                let label = row
                    .get("label")
                    .map(|b| b.value.clone())
                    .unwrap_or_else(|| id.clone());
                Some(SearchHit {
                    description: format!("A {entity_type} in the building"),
                    id,
                    uri,
                    label,
                    entity_type,
                })
            })
            .take(limit)
            .collect();
        Ok(hits)
    }

    fn inspect_entity(&self, id: &str) -> GraphResult<EntityRecord> {
        let uri = self.namespaces.entity_iri(id);
        Self::named_node(&uri)?;

        let rows = self.select(&format!("SELECT ?p ?o WHERE {{ <{uri}> ?p ?o }}"))?;

        let rdf_type = format!("{RDF_NS}type");
        let mut types = Vec::new();
        let mut properties: BTreeMap<String, Vec<PropertyValue>> = BTreeMap::new();
        for row in &rows {
            let (Some(p), Some(o)) = (row.get("p"), row.get("o")) else {
                continue;
            };
            if p.value == rdf_type {
                types.push(local_name(&o.value).to_string());
            }
            let value = match &o.datatype {
                Some(datatype) => PropertyValue::Literal {
                    value: o.value.clone(),
                    datatype: datatype.clone(),
                },
                None => PropertyValue::Uri {
                    value: local_name(&o.value).to_string(),
                    uri: o.value.clone(),
                },
            };
            properties
                .entry(local_name(&p.value).to_string())
                .or_default()
                .push(value);
        }

        Ok(EntityRecord {
            entity: id.to_string(),
            uri,
            types,
            properties,
        })
    }

    fn property_examples(
        &self,
        property: &str,
        limit: usize,
    ) -> GraphResult<Vec<PropertyExample>> {
        for iri in self.namespaces.property_iris(property) {
            Self::named_node(&iri)?;
            let rows = self.select(&format!(
                "SELECT ?subject ?object WHERE {{ ?subject <{iri}> ?object }} LIMIT {limit}"
            ))?;
            if rows.is_empty() {
                continue;
            }
            return Ok(rows
                .iter()
                .filter_map(|row| {
                    Some(PropertyExample {
                        subject: local_name(&row.get("subject")?.value).to_string(),
                        property: property.to_string(),
                        object: local_name(&row.get("object")?.value).to_string(),
                    })
                })
                .collect());
        }
        Ok(Vec::new())
    }
}

impl std::fmt::Debug for SparqlGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparqlGraph")
            .field("base_iri", &self.base_iri)
            .field("namespaces", &self.namespaces)
            .finish()
    }
}
