//! Runs one action against the graph and fills in its observation.

use crate::graph::format::{format_entity_info, format_property_examples, format_search_results};
use crate::graph::{GraphBackend, GraphError, QueryResult};

use super::AgentConfig;
use super::action::{Action, ActionKind, ObservationPayload};
use super::repair::repair_query;

/// Observation text for a Stop action.
pub const STOP_OBSERVATION: &str = "Stopping execution";

/// Dispatches actions to a [`GraphBackend`].
///
/// [`execute`](Self::execute) never fails: collaborator errors become an
/// `"Error executing action: ..."` observation with no payload.
#[derive(Debug)]
pub struct ActionExecutor<G> {
    graph: G,
    search_limit: usize,
    property_example_limit: usize,
    table_max_rows: usize,
    repair_queries: bool,
}

struct Executed {
    observation: String,
    payload: Option<ObservationPayload>,
    query_result: Option<QueryResult>,
}

impl Executed {
    fn text(observation: impl Into<String>, payload: Option<ObservationPayload>) -> Self {
        Self {
            observation: observation.into(),
            payload,
            query_result: None,
        }
    }
}

impl<G: GraphBackend> ActionExecutor<G> {
    pub fn new(graph: G, config: &AgentConfig) -> Self {
        Self {
            graph,
            search_limit: config.search_limit,
            property_example_limit: config.property_example_limit,
            table_max_rows: config.table_max_rows,
            repair_queries: config.repair_queries,
        }
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Execute `action`, returning it with its observation filled in and, for
    /// query actions only, the structured result.
    pub fn execute(&self, action: Action) -> (Action, Option<QueryResult>) {
        match self.dispatch(&action) {
            Ok(done) => {
                let action = action.with_observation(done.observation, done.payload);
                (action, done.query_result)
            }
            Err(e) => {
                tracing::warn!(
                    kind = %action.kind(),
                    argument = action.argument(),
                    "action failed: {e}"
                );
                let action = action.with_observation(format!("Error executing action: {e}"), None);
                (action, None)
            }
        }
    }

    fn dispatch(&self, action: &Action) -> Result<Executed, GraphError> {
        let argument = action.argument();
        match action.kind() {
            ActionKind::Search => {
                let hits = self.graph.search(argument, self.search_limit)?;
                Ok(Executed::text(
                    format_search_results(&hits),
                    Some(ObservationPayload::SearchHits(hits)),
                ))
            }
            ActionKind::Inspect => {
                let record = self.graph.inspect_entity(argument)?;
                Ok(Executed::text(
                    format_entity_info(&record),
                    Some(ObservationPayload::Entity(record)),
                ))
            }
            ActionKind::PropertyExamples => {
                let examples = self
                    .graph
                    .property_examples(argument, self.property_example_limit)?;
                Ok(Executed::text(
                    format_property_examples(&examples),
                    Some(ObservationPayload::PropertyExamples(examples)),
                ))
            }
            ActionKind::ExecuteQuery => Ok(self.run_query(argument)),
            ActionKind::Stop => Ok(Executed::text(STOP_OBSERVATION, None)),
        }
    }

    fn run_query(&self, text: &str) -> Executed {
        let query = if self.repair_queries {
            let repaired = repair_query(text);
            if repaired.changed() {
                let applied: Vec<String> = repaired.applied.iter().map(|r| r.to_string()).collect();
                tracing::debug!(
                    original = %repaired.original,
                    repaired = %repaired.repaired,
                    applied = ?applied,
                    "repaired query"
                );
            }
            repaired.repaired
        } else {
            text.to_string()
        };

        let (rows, status) = self.graph.query(&query);
        let result = QueryResult::new(query, text, rows, status);
        tracing::info!(status = %result.status(), rows = result.row_count(), "executed query");

        let observation = if result.has_results() {
            result.results_as_table(self.table_max_rows)
        } else {
            format!("Query returned no results. Status: {}", result.status())
        };
        Executed {
            observation,
            payload: Some(ObservationPayload::Query(result.clone())),
            query_result: Some(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::graph::{
        Binding, EntityRecord, GraphResult, PropertyExample, PropertyValue, QueryStatus, Row,
        SearchHit,
    };

    #[derive(Default)]
    struct StubGraph {
        queries: Mutex<Vec<String>>,
        rows: Vec<Row>,
        fail_lookups: bool,
    }

    impl GraphBackend for StubGraph {
        fn query(&self, sparql: &str) -> (Vec<Row>, QueryStatus) {
            self.queries.lock().unwrap().push(sparql.to_string());
            if sparql.contains("BROKEN") {
                return (Vec::new(), QueryStatus::SyntaxError);
            }
            let status = if self.rows.is_empty() {
                QueryStatus::EmptyResult
            } else {
                QueryStatus::Success
            };
            (self.rows.clone(), status)
        }

        fn search(&self, term: &str, limit: usize) -> GraphResult<Vec<SearchHit>> {
            if self.fail_lookups {
                return Err(GraphError::Sparql {
                    message: "store offline".into(),
                });
            }
            Ok((0..limit.min(2))
                .map(|i| SearchHit {
                    id: format!("{term}_{i}"),
                    uri: format!("urn:{term}_{i}"),
                    label: format!("{term} {i}"),
                    entity_type: "Sensor".into(),
                    description: "A Sensor in the building".into(),
                })
                .collect())
        }

        fn inspect_entity(&self, id: &str) -> GraphResult<EntityRecord> {
            let mut record = EntityRecord {
                entity: id.into(),
                uri: format!("urn:{id}"),
                types: vec!["Temperature_Sensor".into()],
                ..Default::default()
            };
            record.properties.insert(
                "hasUnit".into(),
                vec![PropertyValue::Uri {
                    value: "DEG_F".into(),
                    uri: "urn:DEG_F".into(),
                }],
            );
            Ok(record)
        }

        fn property_examples(&self, _property: &str, _limit: usize) -> GraphResult<Vec<PropertyExample>> {
            Ok(Vec::new())
        }
    }

    fn executor(graph: StubGraph) -> ActionExecutor<StubGraph> {
        ActionExecutor::new(graph, &AgentConfig::default())
    }

    #[test]
    fn search_fills_observation_and_payload() {
        let exec = executor(StubGraph::default());
        let (action, result) = exec.execute(Action::new("", ActionKind::Search, "temperature"));
        assert!(result.is_none());
        assert!(action.observation().unwrap().contains("temperature 0 (temperature_0)"));
        assert!(matches!(action.payload(), Some(ObservationPayload::SearchHits(h)) if h.len() == 2));
    }

    #[test]
    fn inspect_renders_entity() {
        let exec = executor(StubGraph::default());
        let (action, _) = exec.execute(Action::new("", ActionKind::Inspect, "RM_TEMP"));
        let obs = action.observation().unwrap();
        assert!(obs.starts_with("Entity: RM_TEMP\nTypes: Temperature_Sensor"));
        assert!(obs.contains("hasUnit"));
    }

    #[test]
    fn empty_examples_observation() {
        let exec = executor(StubGraph::default());
        let (action, _) = exec.execute(Action::new("", ActionKind::PropertyExamples, "hasUnit"));
        assert_eq!(action.observation(), Some("No examples found"));
    }

    #[test]
    fn stop_has_fixed_observation() {
        let exec = executor(StubGraph::default());
        let (action, result) = exec.execute(Action::stop("done"));
        assert_eq!(action.observation(), Some(STOP_OBSERVATION));
        assert!(action.payload().is_none());
        assert!(result.is_none());
    }

    #[test]
    fn collaborator_failure_becomes_observation() {
        let exec = executor(StubGraph {
            fail_lookups: true,
            ..Default::default()
        });
        let (action, result) = exec.execute(Action::new("", ActionKind::Search, "temperature"));
        assert!(result.is_none());
        assert!(action.payload().is_none());
        assert_eq!(
            action.observation(),
            Some("Error executing action: SPARQL query error: store offline")
        );
    }

    #[test]
    fn query_is_repaired_before_execution() {
        let exec = executor(StubGraph::default());
        let (action, result) =
            exec.execute(Action::new("", ActionKind::ExecuteQuery, "SELECT ?v WHERE { ?s ?p ?v }"));
        let result = result.unwrap();
        assert_eq!(result.query_text(), "SELECT ?v WHERE { ?s ?p ?v } LIMIT 10");
        assert_eq!(result.original_text(), "SELECT ?v WHERE { ?s ?p ?v }");
        assert_eq!(
            exec.graph().queries.lock().unwrap().as_slice(),
            ["SELECT ?v WHERE { ?s ?p ?v } LIMIT 10"]
        );
        assert_eq!(
            action.observation(),
            Some("Query returned no results. Status: empty_result")
        );
    }

    #[test]
    fn repair_can_be_disabled() {
        let config = AgentConfig {
            repair_queries: false,
            ..Default::default()
        };
        let exec = ActionExecutor::new(StubGraph::default(), &config);
        let (_, result) =
            exec.execute(Action::new("", ActionKind::ExecuteQuery, "SELECT ?v WHERE { ?s ?p ?v }"));
        assert_eq!(result.unwrap().query_text(), "SELECT ?v WHERE { ?s ?p ?v }");
    }

    #[test]
    fn failed_query_still_returns_result() {
        let exec = executor(StubGraph::default());
        let (action, result) = exec.execute(Action::new("", ActionKind::ExecuteQuery, "BROKEN"));
        let result = result.unwrap();
        assert_eq!(result.status(), QueryStatus::SyntaxError);
        assert!(!result.has_results());
        assert_eq!(
            action.observation(),
            Some("Query returned no results. Status: syntax_error")
        );
    }

    #[test]
    fn successful_query_renders_table() {
        let rows = (1..=3)
            .map(|i| Row::new().with("value", Binding::literal(format!("7{i}.5"), "xsd:float")))
            .collect();
        let exec = executor(StubGraph {
            rows,
            ..Default::default()
        });
        let (action, result) =
            exec.execute(Action::new("", ActionKind::ExecuteQuery, "SELECT ?value WHERE { ?s ?p ?value } LIMIT 3"));
        assert_eq!(result.unwrap().row_count(), 3);
        let obs = action.observation().unwrap();
        assert!(obs.starts_with("value"));
        assert!(obs.contains("72.5"));
        assert!(matches!(action.payload(), Some(ObservationPayload::Query(_))));
    }
}
