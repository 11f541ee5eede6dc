//! Agent-specific error types with rich miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use super::llm::LlmError;

/// Errors specific to the agent layer (action construction, parsing, decision-making).
///
/// Collaborator failures during execution are not here: the executor turns them
/// into observations and the loop carries on.
#[derive(Debug, Error, Diagnostic)]
pub enum AgentError {
    #[error("invalid action kind: \"{name}\"")]
    #[diagnostic(
        code(brick::agent::invalid_action_kind),
        help(
            "Valid actions are search_brick, get_brick_entity, get_property_examples, \
             execute_sparql and stop."
        )
    )]
    InvalidActionKind { name: String },

    #[error("could not parse an action from the decision-maker output: {message}")]
    #[diagnostic(
        code(brick::agent::action_parse),
        help(
            "The response must contain one `Action: name(argument)` block with balanced \
             parentheses. Use a FallbackController to substitute a scripted action."
        )
    )]
    ActionParse { message: String, excerpt: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Llm(#[from] LlmError),
}

/// Convenience alias for agent operations.
pub type AgentResult<T> = std::result::Result<T, AgentError>;
