//! Rich diagnostic error types for brick-agent.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so users know what went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

use crate::agent::error::AgentError;

/// Top-level error type for brick-agent.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum BrickError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("SPARQL query error: {message}")]
    #[diagnostic(
        code(brick::graph::sparql),
        help(
            "The SPARQL query failed during evaluation. Check that the referenced \
             prefixes and IRIs exist in the loaded Brick model."
        )
    )]
    Sparql { message: String },

    #[error("SPARQL syntax error: {message}")]
    #[diagnostic(
        code(brick::graph::sparql_syntax),
        help(
            "The query could not be parsed. Check brackets around PREFIX IRIs, \
             balanced parentheses, and that every prefixed name has a PREFIX declaration."
        )
    )]
    SparqlSyntax { message: String },

    #[error("failed to load \"{source_name}\": {message}")]
    #[diagnostic(
        code(brick::graph::load),
        help("Ensure the file exists and is valid Turtle. Relative IRIs resolve against the configured base IRI.")
    )]
    Load { source_name: String, message: String },

    #[error("invalid IRI \"{iri}\": {message}")]
    #[diagnostic(
        code(brick::graph::invalid_iri),
        help("Entity ids and property names must form absolute IRIs once expanded. Check the configured namespaces.")
    )]
    InvalidIri { iri: String, message: String },

    #[error("time-series ingest failed: {message}")]
    #[diagnostic(
        code(brick::graph::ingest),
        help("The CSV needs a header with a \"Datetime\" column (MM/DD/YYYY HH:MM) followed by one column per sensor.")
    )]
    Ingest { message: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(brick::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(brick::config::parse),
        help("Check the TOML syntax and key names against the [agent], [graph] and [llm] sections.")
    )]
    Parse { path: String, message: String },

    #[error("invalid config value: {message}")]
    #[diagnostic(
        code(brick::config::invalid),
        help("{message}")
    )]
    Invalid { message: String },
}

/// Convenience alias for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Convenience alias for top-level operations.
pub type BrickResult<T> = std::result::Result<T, BrickError>;
