//! brick-agent CLI: ask questions about a Brick building model.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use brick_agent::agent::{
    AgentConfig, DecisionMaker, FallbackController, LlmController, LoopDriver, OllamaClient,
    ScriptedController, SessionState,
};
use brick_agent::config::BrickConfig;
use brick_agent::error::BrickResult;
use brick_agent::graph::cache::CachedGraph;
use brick_agent::graph::format::{format_entity_info, format_property_examples, format_search_results};
use brick_agent::graph::sparql::SparqlGraph;
use brick_agent::graph::timeseries::ingest_timeseries_file;
use brick_agent::graph::{GraphBackend, QueryResult};

#[derive(Parser)]
#[command(name = "brick-agent", version, about = "Iterative SPARQL agent for Brick building models")]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Brick model in Turtle.
    #[arg(long, global = true, default_value = "Brick_Model.ttl")]
    ttl: PathBuf,

    /// Time-series CSV to ingest as observations.
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Most recent CSV rows to ingest.
    #[arg(long, global = true, default_value = "100")]
    max_csv_rows: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question by building a SPARQL query step by step.
    Ask {
        question: String,

        /// Use the canned walkthrough instead of Ollama.
        #[arg(long)]
        scripted: bool,

        /// Fall back to the canned walkthrough when the model's reply cannot be parsed.
        #[arg(long, conflicts_with = "scripted")]
        fallback: bool,

        /// Override the step budget.
        #[arg(long)]
        max_steps: Option<usize>,

        /// Execute queries exactly as written.
        #[arg(long)]
        no_repair: bool,

        /// Print the finished session as JSON instead of the step log.
        #[arg(long)]
        json: bool,
    },

    /// Run one SPARQL query.
    Query {
        sparql: String,

        /// Execute the query exactly as written.
        #[arg(long)]
        no_repair: bool,

        /// Rows to show.
        #[arg(long, default_value = "10")]
        max_rows: usize,
    },

    /// Search entities by label or id.
    Search {
        term: String,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show the types and properties of one entity.
    Inspect { id: String },

    /// Show how a property is used.
    Examples {
        property: String,

        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BrickConfig::load(path)?,
        None => BrickConfig::default(),
    };

    let store = open_graph(&config, &cli.ttl, cli.csv.as_deref(), cli.max_csv_rows)?;
    let graph = CachedGraph::new(store, config.graph.cache_capacity);

    match cli.command {
        Commands::Ask {
            question,
            scripted,
            fallback,
            max_steps,
            no_repair,
            json,
        } => {
            let mut agent_config = config.to_agent_config();
            if let Some(max_steps) = max_steps {
                agent_config.max_steps = max_steps.max(1);
            }
            if no_repair {
                agent_config.repair_queries = false;
            }

            let decision_maker: Box<dyn DecisionMaker> = if scripted {
                Box::new(ScriptedController::room_temperature_demo())
            } else {
                let mut client = OllamaClient::new(config.to_ollama_config());
                client.probe();
                client.ensure_ready()?;
                let controller = LlmController::new(client);
                if fallback {
                    Box::new(FallbackController::new(
                        controller,
                        ScriptedController::room_temperature_demo(),
                    ))
                } else {
                    Box::new(controller)
                }
            };

            let (state, final_result) = ask(decision_maker, &graph, agent_config, &question, !json)?;
            if json {
                let out = serde_json::to_string_pretty(&state).into_diagnostic()?;
                println!("{out}");
            } else {
                print_summary(&state, final_result.as_ref(), config.agent.table_max_rows);
            }
        }

        Commands::Query {
            sparql,
            no_repair,
            max_rows,
        } => {
            let text = if no_repair {
                sparql.clone()
            } else {
                brick_agent::agent::repair_query(&sparql).repaired
            };
            if text != sparql {
                println!("Executing: {text}\n");
            }
            let (rows, status) = graph.query(&text);
            let result = QueryResult::new(text, sparql, rows, status);
            if result.has_results() {
                println!("{}", result.results_as_table(max_rows));
                println!("\n{} row(s)", result.row_count());
            } else {
                println!("No results. Status: {} ({})", result.status(), result.status().message());
            }
        }

        Commands::Search { term, limit } => {
            let hits = graph.search(&term, limit.unwrap_or(config.graph.search_limit))?;
            println!("{}", format_search_results(&hits));
        }

        Commands::Inspect { id } => {
            let record = graph.inspect_entity(&id)?;
            println!("{}", format_entity_info(&record));
        }

        Commands::Examples { property, limit } => {
            let examples = graph.property_examples(
                &property,
                limit.unwrap_or(config.graph.property_example_limit),
            )?;
            println!("{}", format_property_examples(&examples));
        }
    }

    Ok(())
}

fn open_graph(
    config: &BrickConfig,
    ttl: &Path,
    csv: Option<&Path>,
    max_csv_rows: usize,
) -> BrickResult<SparqlGraph> {
    let graph = SparqlGraph::from_turtle_file(
        ttl,
        config.graph.namespaces.clone(),
        config.graph.base_iri.clone(),
    )?;
    if let Some(csv) = csv {
        ingest_timeseries_file(&graph, csv, max_csv_rows)?;
    }
    Ok(graph)
}

fn ask<G: GraphBackend>(
    decision_maker: Box<dyn DecisionMaker>,
    graph: G,
    config: AgentConfig,
    question: &str,
    verbose: bool,
) -> BrickResult<(SessionState, Option<QueryResult>)> {
    let mut driver = LoopDriver::new(decision_maker, graph, config);
    let mut state = driver.new_session(question);

    if verbose {
        println!("{}", "=".repeat(80));
        println!("Question: {question}");
        println!("{}\n", "=".repeat(80));
    }

    while let Some(outcome) = driver.step(&mut state)? {
        if verbose {
            if let Some(action) = state.actions().get(outcome.index) {
                if outcome.forced_stop {
                    println!("[duplicate action detected, stopping]");
                }
                println!("{}\n", action.render(true));
            }
        }
    }

    let final_result = state.final_result().cloned();
    Ok((state, final_result))
}

fn print_summary(state: &SessionState, final_result: Option<&QueryResult>, max_rows: usize) {
    println!("{}", "=".repeat(80));
    println!("Completed in {} actions ({:?})", state.step_count(), state.phase());
    match final_result {
        Some(result) => {
            println!("\nFinal SPARQL:\n{}", result.query_text());
            println!("\nFinal Results:\n{}", result.results_as_table(max_rows));
        }
        None => println!("\nNo SPARQL query was produced."),
    }
    println!("{}", "=".repeat(80));
}
