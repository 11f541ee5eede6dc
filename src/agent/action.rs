//! Actions: one thought-act-observe step of a session.
//!
//! An [`Action`] is proposed by a decision-maker with a rationale, a kind and an
//! argument, then filled in exactly once by the executor with an observation.
//! Two actions are equal when their kind and argument are equal; the rationale
//! and observation do not take part.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::graph::{EntityRecord, PropertyExample, QueryResult, SearchHit};

use super::error::{AgentError, AgentResult};

/// What an action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Free-text entity search.
    Search,
    /// Outgoing edges and types of one entity.
    Inspect,
    /// Sample usages of a relation.
    PropertyExamples,
    /// Run a SPARQL query.
    ExecuteQuery,
    /// Accept the last query and end the session.
    Stop,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        Self::Search,
        Self::Inspect,
        Self::PropertyExamples,
        Self::ExecuteQuery,
        Self::Stop,
    ];

    /// Name the decision-maker writes in `Action: name(argument)`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Search => "search_brick",
            Self::Inspect => "get_brick_entity",
            Self::PropertyExamples => "get_property_examples",
            Self::ExecuteQuery => "execute_sparql",
            Self::Stop => "stop",
        }
    }

    /// One-line usage shown in the prompt.
    pub fn usage(self) -> &'static str {
        match self {
            Self::Search => {
                "search_brick(string): Search for Brick entities (sensors, equipment) matching the string"
            }
            Self::Inspect => {
                "get_brick_entity(entity_id): Get all properties and relationships of a Brick entity"
            }
            Self::PropertyExamples => {
                "get_property_examples(property_name): See examples of how a property is used"
            }
            Self::ExecuteQuery => "execute_sparql(SPARQL): Run a SPARQL query and get results",
            Self::Stop => "stop(): Mark the last SPARQL query as final answer and end",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActionKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| AgentError::InvalidActionKind { name: s.to_string() })
    }
}

/// Structured data behind an observation, by action kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObservationPayload {
    SearchHits(Vec<SearchHit>),
    Entity(EntityRecord),
    PropertyExamples(Vec<PropertyExample>),
    Query(QueryResult),
}

/// One reasoning step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    rationale: String,
    kind: ActionKind,
    argument: String,
    observation: Option<String>,
    payload: Option<ObservationPayload>,
}

impl Action {
    /// A new, not yet executed action.
    pub fn new(rationale: impl Into<String>, kind: ActionKind, argument: impl Into<String>) -> Self {
        Self {
            rationale: rationale.into(),
            kind,
            argument: argument.into(),
            observation: None,
            payload: None,
        }
    }

    /// Build an action from a kind name, failing with
    /// [`AgentError::InvalidActionKind`] for unknown names.
    pub fn create(
        rationale: impl Into<String>,
        kind: &str,
        argument: impl Into<String>,
    ) -> AgentResult<Self> {
        let kind = kind.parse::<ActionKind>()?;
        Ok(Self::new(rationale, kind, argument))
    }

    /// A `stop()` action.
    pub fn stop(rationale: impl Into<String>) -> Self {
        Self::new(rationale, ActionKind::Stop, "")
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn argument(&self) -> &str {
        &self.argument
    }

    pub fn observation(&self) -> Option<&str> {
        self.observation.as_deref()
    }

    pub fn payload(&self) -> Option<&ObservationPayload> {
        self.payload.as_ref()
    }

    /// Whether the executor has filled this action in.
    pub fn is_executed(&self) -> bool {
        self.observation.is_some()
    }

    /// Attach the execution outcome. Only the executor calls this, once.
    pub(crate) fn with_observation(
        mut self,
        observation: impl Into<String>,
        payload: Option<ObservationPayload>,
    ) -> Self {
        debug_assert!(self.observation.is_none(), "action observed twice");
        self.observation = Some(observation.into());
        self.payload = payload;
        self
    }

    /// `Thought:` / `Action:` / `Observation:` lines.
    ///
    /// The observation line is left out entirely when `include_observation` is
    /// false or nothing has been observed yet.
    pub fn render(&self, include_observation: bool) -> String {
        let mut out = format!(
            "Thought: {}\nAction: {}({})",
            self.rationale, self.kind, self.argument
        );
        if include_observation {
            if let Some(observation) = &self.observation {
                out.push_str("\nObservation: ");
                out.push_str(observation);
            }
        }
        out
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.argument == other.argument
    }
}

impl Eq for Action {}

impl Hash for Action {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.argument.hash(state);
    }
}
