//! End-to-end tests for brick-agent.
//!
//! These build a real oxigraph-backed graph from Turtle and CSV files on disk,
//! then drive whole sessions through the loop with scripted decision-makers.

use brick_agent::agent::{
    Action, ActionKind, AgentConfig, AgentError, DecisionContext, DecisionMaker,
    FallbackController, LlmController, LlmError, LoopDriver, ObservationPayload,
    ScriptedController, SessionPhase,
};
use brick_agent::config::BrickConfig;
use brick_agent::graph::cache::CachedGraph;
use brick_agent::graph::sparql::SparqlGraph;
use brick_agent::graph::timeseries::ingest_timeseries_file;
use brick_agent::graph::{GraphBackend, QueryStatus};

const MODEL: &str = r#"
@prefix brick: <https://brickschema.org/schema/Brick#> .
@prefix bldg: <bldg-59#> .
@prefix ref: <https://brickschema.org/schema/Brick/ref#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

bldg:FCU_1 a brick:Fan_Coil_Unit ;
    rdfs:label "Fan coil unit 1" ;
    brick:hasPoint bldg:RM_TEMP, bldg:FCU_OAT .
bldg:RM_TEMP a brick:Zone_Air_Temperature_Sensor ;
    rdfs:label "Room temperature" ;
    brick:isPointOf bldg:FCU_1 .
bldg:FCU_OAT a brick:Outside_Air_Temperature_Sensor ;
    brick:isPointOf bldg:FCU_1 .
"#;

const CSV: &str = "\
Datetime,RM_TEMP,FCU_OAT
12/31/2018 23:55,20.5,4.0
12/31/2018 23:56,21.0,4.5
12/31/2018 23:57,21.5,5.0
12/31/2018 23:58,22.0,5.5
";

const ROOM_TEMP_QUERY: &str =
    "SELECT ?value WHERE { bldg:RM_TEMP ref:hasObservation ?obs . ?obs ref:hasValue ?value } LIMIT 10";

fn building(dir: &std::path::Path, max_csv_rows: usize) -> SparqlGraph {
    let ttl = dir.join("Brick_Model.ttl");
    let csv = dir.join("timeseries.csv");
    std::fs::write(&ttl, MODEL).unwrap();
    std::fs::write(&csv, CSV).unwrap();

    let config = BrickConfig::default();
    let graph = SparqlGraph::from_turtle_file(
        &ttl,
        config.graph.namespaces.clone(),
        config.graph.base_iri.clone(),
    )
    .unwrap();
    let report = ingest_timeseries_file(&graph, &csv, max_csv_rows).unwrap();
    assert_eq!(report.total_rows, 4);
    graph
}

#[test]
fn room_temperature_session_end_to_end() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = building(dir.path(), 100);

    let script = ScriptedController::new(vec![
        Action::new("find sensors", ActionKind::Search, "temperature"),
        Action::new("look at the room sensor", ActionKind::Inspect, "RM_TEMP"),
        Action::new("fetch readings", ActionKind::ExecuteQuery, ROOM_TEMP_QUERY),
        Action::stop("that answers it"),
    ]);
    let mut driver = LoopDriver::new(script, &graph, AgentConfig::default());
    let (state, final_result) = driver.run("What are the room temperature values?").unwrap();

    assert_eq!(state.step_count(), 4);
    assert_eq!(state.phase(), SessionPhase::StoppedByAction);
    assert_eq!(state.query_results().len(), 1);
    let final_result = final_result.unwrap();
    assert_eq!(&final_result, &state.query_results()[0]);
    assert_eq!(final_result.status(), QueryStatus::Success);
    assert_eq!(final_result.row_count(), 4);
    assert_eq!(final_result.query_text(), ROOM_TEMP_QUERY);

    let mut values: Vec<&str> = final_result
        .rows()
        .unwrap()
        .iter()
        .filter_map(|r| r.get("value").map(|b| b.value.as_str()))
        .collect();
    values.sort();
    assert_eq!(values, ["20.5", "21", "21.5", "22"]);

    let search = &state.actions()[0];
    assert!(search.observation().unwrap().contains("Room temperature (RM_TEMP)"));
    let inspect = &state.actions()[1];
    assert!(inspect.observation().unwrap().starts_with("Entity: RM_TEMP"));
    assert!(matches!(inspect.payload(), Some(ObservationPayload::Entity(e)) if e.properties.contains_key("hasObservation")));
    assert_eq!(state.actions()[3].observation(), Some("Stopping execution"));
}

#[test]
fn repeated_action_terminates_within_budget() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = building(dir.path(), 100);

    let script = ScriptedController::repeating(vec![Action::new(
        "again",
        ActionKind::Search,
        "temperature",
    )]);
    let mut driver = LoopDriver::new(script, &graph, AgentConfig::default());
    let (state, final_result) = driver.run("loop forever?").unwrap();

    assert!(state.step_count() <= AgentConfig::default().max_steps);
    assert_eq!(state.step_count(), 2);
    assert_eq!(state.phase(), SessionPhase::StoppedByAction);
    assert!(final_result.is_none());
}

#[test]
fn exhausted_budget_without_queries_returns_none() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = building(dir.path(), 100);

    let terms = ["temperature", "fan", "coil", "outside", "room", "air"];
    let script = ScriptedController::new(
        terms
            .iter()
            .map(|t| Action::new("keep looking", ActionKind::Search, *t))
            .collect(),
    );
    let config = AgentConfig {
        max_steps: 3,
        ..Default::default()
    };
    let mut driver = LoopDriver::new(script, &graph, config);
    let (state, final_result) = driver.run("Which fans exist?").unwrap();

    assert_eq!(state.step_count(), 3);
    assert_eq!(state.phase(), SessionPhase::BudgetExhausted);
    assert!(state.query_results().is_empty());
    assert!(final_result.is_none());
}

#[test]
fn failed_queries_are_recorded_and_last_one_wins() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = building(dir.path(), 100);

    let script = ScriptedController::new(vec![
        Action::new("try", ActionKind::ExecuteQuery, "SELECT ?v WHERE { ?s ?p "),
        Action::new(
            "latest reading",
            ActionKind::ExecuteQuery,
            "SELECT ?t ?v WHERE { bldg:RM_TEMP ref:hasObservation ?o . ?o ref:hasTimestamp ?t . ?o ref:hasValue ?v } ORDER BY DESC(?t)",
        ),
        Action::stop("done"),
    ]);
    let mut driver = LoopDriver::new(script, &graph, AgentConfig::default());
    let (state, final_result) = driver.run("What is the latest room temperature?").unwrap();

    assert_eq!(state.query_results().len(), 2);
    assert_eq!(state.query_results()[0].status(), QueryStatus::SyntaxError);
    assert!(
        state.actions()[0]
            .observation()
            .unwrap()
            .starts_with("Query returned no results. Status: syntax_error")
    );

    let latest = final_result.unwrap();
    assert!(latest.query_text().ends_with("ORDER BY DESC(?t) LIMIT 1"));
    assert_eq!(latest.row_count(), 1);
    let row = &latest.rows().unwrap()[0];
    assert_eq!(row.get("v").unwrap().value, "22");
    assert_eq!(row.get("t").unwrap().value, "2018-12-31T23:58:00");
}

#[test]
fn only_recent_rows_are_ingested() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = building(dir.path(), 2);

    let (rows, status) = graph.query(
        "SELECT ?t WHERE { bldg:RM_TEMP ref:hasObservation ?o . ?o ref:hasTimestamp ?t } ORDER BY ?t",
    );
    assert_eq!(status, QueryStatus::Success);
    let times: Vec<&str> = rows.iter().map(|r| r.get("t").unwrap().value.as_str()).collect();
    assert_eq!(times, ["2018-12-31T23:57:00", "2018-12-31T23:58:00"]);
}

#[test]
fn unknown_entity_is_reported_not_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = building(dir.path(), 100);

    let script = ScriptedController::new(vec![
        Action::new("", ActionKind::Inspect, "NO_SUCH_POINT"),
        Action::new("", ActionKind::PropertyExamples, "isPointOf"),
    ]);
    let mut driver = LoopDriver::new(script, &graph, AgentConfig::default());
    let (state, _) = driver.run("q").unwrap();

    assert_eq!(state.step_count(), 3);
    assert_eq!(
        state.actions()[0].observation(),
        Some("Entity: NO_SUCH_POINT\n\nProperties:")
    );
    let examples = state.actions()[1].observation().unwrap();
    assert!(examples.contains("RM_TEMP -- isPointOf --> FCU_1"));
}

#[test]
fn model_output_drives_session_through_cache() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = CachedGraph::new(building(dir.path(), 100), 16);

    let replies = [
        "Thought: find the sensor\nAction: search_brick(temperature)",
        "Thought: read values\nAction: execute_sparql(SELECT ?value WHERE { bldg:RM_TEMP ref:hasObservation ?obs . ?obs ref:hasValue ?value } LIMIT 10)",
        "Thought: done\nAction: stop()",
    ];
    let calls = std::cell::Cell::new(0usize);
    let predictor = |_prompt: &str| -> Result<String, LlmError> {
        let i = calls.get();
        calls.set(i + 1);
        Ok(replies[i.min(replies.len() - 1)].to_string())
    };

    let mut driver = LoopDriver::new(LlmController::new(predictor), &graph, AgentConfig::default());
    let (state, final_result) = driver.run("What are the room temperature values?").unwrap();

    assert_eq!(state.step_count(), 3);
    assert_eq!(final_result.unwrap().row_count(), 4);
    assert_eq!(graph.cached_entries(), 1);
}

#[test]
fn parse_failure_surfaces_or_falls_back() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = building(dir.path(), 100);
    let garbled = |_: &str| -> Result<String, LlmError> { Ok("Action: execute_sparql(SELECT (".into()) };

    let mut driver = LoopDriver::new(LlmController::new(garbled), &graph, AgentConfig::default());
    let err = driver.run("q").unwrap_err();
    assert!(matches!(err, AgentError::ActionParse { .. }));

    let fallback = FallbackController::new(
        LlmController::new(garbled),
        ScriptedController::room_temperature_demo(),
    );
    let mut driver = LoopDriver::new(fallback, &graph, AgentConfig::default());
    let (state, final_result) = driver.run("What are the room temperature values?").unwrap();
    assert_eq!(state.step_count(), 4);
    assert_eq!(final_result.unwrap().row_count(), 4);
    assert_eq!(driver.decision_maker().fallbacks_used(), 4);
}

#[test]
fn fallback_continues_a_session_the_model_started() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = building(dir.path(), 100);
    let calls = std::cell::Cell::new(0);
    let flaky = move |_: &str| -> Result<String, LlmError> {
        calls.set(calls.get() + 1);
        Ok(if calls.get() == 1 {
            "Thought: find sensors\nAction: search_brick(temperature)".into()
        } else {
            "I have lost track of the format".into()
        })
    };

    let fallback = FallbackController::new(
        LlmController::new(flaky),
        ScriptedController::room_temperature_demo(),
    );
    let mut driver = LoopDriver::new(fallback, &graph, AgentConfig::default());
    let (state, final_result) = driver.run("What are the room temperature values?").unwrap();

    let kinds: Vec<_> = state.actions().iter().map(|a| a.kind()).collect();
    assert_eq!(
        kinds,
        [
            ActionKind::Search,
            ActionKind::Inspect,
            ActionKind::ExecuteQuery,
            ActionKind::Stop
        ]
    );
    assert_eq!(state.actions()[0].rationale(), "find sensors");
    assert_eq!(final_result.unwrap().row_count(), 4);
    assert_eq!(driver.decision_maker().fallbacks_used(), 3);
}

#[test]
fn apostrophes_and_comments_survive_the_loop() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = building(dir.path(), 100);
    let replies = [
        "Thought: look\nAction: search_brick(room's temperature)",
        "Thought: all readings\nAction: execute_sparql(SELECT ?value WHERE { bldg:RM_TEMP ref:hasObservation ?o . ?o ref:hasValue ?value } # the room's values\n)",
        "Action: stop()",
    ];
    let calls = std::cell::Cell::new(0);
    let model = move |_: &str| -> Result<String, LlmError> {
        let i = calls.get();
        calls.set(i + 1);
        Ok(replies[i.min(replies.len() - 1)].to_string())
    };

    let mut driver = LoopDriver::new(LlmController::new(model), &graph, AgentConfig::default());
    let (state, final_result) = driver.run("What are the room temperature values?").unwrap();

    assert_eq!(state.step_count(), 3);
    assert_eq!(state.actions()[0].argument(), "room's temperature");
    let result = final_result.unwrap();
    assert!(result.query_text().ends_with("# the room's values\nLIMIT 10"));
    assert_eq!(result.status(), QueryStatus::Success);
    assert_eq!(result.row_count(), 4);
}

#[test]
fn independent_graphs_do_not_share_data() {
    let dir = tempfile::TempDir::new().unwrap();
    let full = building(dir.path(), 100);
    let config = BrickConfig::default();
    let empty = SparqlGraph::in_memory(config.graph.namespaces, config.graph.base_iri).unwrap();

    assert!(!full.search("temperature", 8).unwrap().is_empty());
    assert!(empty.search("temperature", 8).unwrap().is_empty());
}

struct CountingDecisions {
    seen_history: Vec<String>,
}

impl DecisionMaker for CountingDecisions {
    fn next_action(&mut self, context: &DecisionContext<'_>) -> Result<Action, AgentError> {
        self.seen_history.push(context.history.to_string());
        Ok(match context.step {
            0 => Action::new("", ActionKind::Search, "temperature"),
            1 => Action::new("", ActionKind::Inspect, "RM_TEMP"),
            2 => Action::new("", ActionKind::PropertyExamples, "hasPoint"),
            _ => Action::stop("enough"),
        })
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[test]
fn decision_maker_sees_windowed_history() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = building(dir.path(), 100);

    let mut driver = LoopDriver::new(
        CountingDecisions {
            seen_history: Vec::new(),
        },
        &graph,
        AgentConfig::default(),
    );
    driver.run("q").unwrap();

    let seen = &driver.decision_maker().seen_history;
    assert_eq!(seen.len(), 4);
    assert!(seen[0].is_empty());
    assert!(seen[1].contains("Observation: "));
    assert!(seen[1].contains("Room temperature (RM_TEMP)"));
    // By step 3 the search is no longer among the last two actions.
    assert!(seen[3].contains("Action: search_brick(temperature)"));
    assert!(!seen[3].contains("Room temperature (RM_TEMP)"));
    assert!(seen[3].contains("FCU_1 -- hasPoint --> RM_TEMP"));
}
