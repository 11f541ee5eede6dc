//! Agent layer: the bounded think-act-observe loop that builds a SPARQL query.
//!
//! - **Actions** ([`Action`]): one thought, one call, one observation
//! - **Parsing** ([`parse_action`]): free-form model output to an action
//! - **Repair** ([`repair_query`]): mechanical fixes before a query runs
//! - **Execution** ([`ActionExecutor`]): dispatch to the graph, failures become observations
//! - **State** ([`SessionState`]): actions, query results, derived phase
//! - **Decision-makers** ([`DecisionMaker`]): model-backed, scripted, or with fallback
//! - **Driver** ([`LoopDriver`]): the loop itself

pub mod action;
pub mod controller;
pub mod driver;
pub mod error;
pub mod executor;
pub mod llm;
pub mod parse;
pub mod prompt;
pub mod repair;
mod scan;
pub mod state;

pub use action::{Action, ActionKind, ObservationPayload};
pub use controller::{
    DecisionContext, DecisionMaker, FallbackController, LlmController, ScriptedController,
};
pub use driver::{LoopDriver, StepOutcome};
pub use error::{AgentError, AgentResult};
pub use executor::ActionExecutor;
pub use llm::{LlmError, OllamaClient, OllamaConfig, Predictor};
pub use parse::{Quoting, parse_action};
pub use prompt::render_prompt;
pub use repair::{Repair, RepairedQuery, repair_query};
pub use state::{SessionPhase, SessionState};

/// Loop and executor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Step budget per session (default: 15).
    pub max_steps: usize,
    /// Recent actions a candidate is checked against for repeats (default: 5).
    pub duplicate_window: usize,
    /// Actions rendered into the decision-maker's context (default: 10).
    pub history_last_n: usize,
    /// Rows shown in a query observation (default: 10).
    pub table_max_rows: usize,
    /// Hits per search (default: 8).
    pub search_limit: usize,
    /// Examples per property lookup (default: 5).
    pub property_example_limit: usize,
    /// Run [`repair_query`] before executing queries (default: true).
    pub repair_queries: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 15,
            duplicate_window: 5,
            history_last_n: 10,
            table_max_rows: 10,
            search_limit: 8,
            property_example_limit: 5,
            repair_queries: true,
        }
    }
}
