// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # brick-agent
//!
//! Answers natural-language questions about a building by growing a SPARQL
//! query over its Brick model one tested fragment at a time.
//!
//! ## Architecture
//!
//! - **Graph** (`graph`): oxigraph store with the Brick model and optional
//!   time-series observations, behind the `GraphBackend` trait
//! - **Agent** (`agent`): action parsing, query repair, execution, session
//!   state and the bounded think-act-observe loop
//! - **Config** (`config`): TOML settings for the loop, the graph and Ollama
//!
//! ## Library usage
//!
//! ```no_run
//! use brick_agent::agent::{AgentConfig, LoopDriver, ScriptedController};
//! use brick_agent::graph::Namespaces;
//! use brick_agent::graph::sparql::SparqlGraph;
//!
//! let graph = SparqlGraph::from_turtle_file(
//!     "Brick_Model.ttl".as_ref(),
//!     Namespaces::default(),
//!     "https://example.org/",
//! )
//! .unwrap();
//! let mut driver = LoopDriver::new(
//!     ScriptedController::room_temperature_demo(),
//!     &graph,
//!     AgentConfig::default(),
//! );
//! let (state, answer) = driver.run("What are the room temperature values?").unwrap();
//! println!("{} steps", state.step_count());
//! if let Some(answer) = answer {
//!     println!("{}", answer.results_as_table(10));
//! }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod graph;
