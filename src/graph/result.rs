//! SPARQL result values: bindings, rows, execution status and the tabular view.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A bound value in a result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Lexical form of a literal, or the full IRI / blank node id.
    pub value: String,
    /// Datatype IRI for literals. `None` for IRIs and blank nodes.
    pub datatype: Option<String>,
}

impl Binding {
    /// A node binding (IRI or blank node).
    pub fn node(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
        }
    }

    /// A typed literal binding.
    pub fn literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: Some(datatype.into()),
        }
    }
}

/// One solution: variable name -> binding, in projection order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Row {
    bindings: Vec<(String, Binding)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding (builder style).
    pub fn with(mut self, var: impl Into<String>, binding: Binding) -> Self {
        self.push(var, binding);
        self
    }

    pub fn push(&mut self, var: impl Into<String>, binding: Binding) {
        self.bindings.push((var.into(), binding));
    }

    /// Look up a variable (without the leading `?`).
    pub fn get(&self, var: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|(name, _)| name == var)
            .map(|(_, b)| b)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bindings.iter().map(|(name, b)| (name.as_str(), b))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Outcome class of a SPARQL execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Success,
    EmptyResult,
    SyntaxError,
    TimedOut,
    OtherError,
}

impl QueryStatus {
    /// Short explanation for humans.
    pub fn message(self) -> &'static str {
        match self {
            Self::Success => "Query executed successfully",
            Self::EmptyResult => "Query returned no results",
            Self::SyntaxError => "Query has syntax error",
            Self::TimedOut => "Query execution timed out",
            Self::OtherError => "Query execution encountered an error",
        }
    }

    /// Classify a store error message.
    pub fn classify_error(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("syntax") || lower.contains("parse") || lower.contains("parsing") {
            Self::SyntaxError
        } else if lower.contains("timeout") || lower.contains("timed out") {
            Self::TimedOut
        } else {
            Self::OtherError
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::EmptyResult => "empty_result",
            Self::SyntaxError => "syntax_error",
            Self::TimedOut => "timed_out",
            Self::OtherError => "other_error",
        };
        f.write_str(s)
    }
}

/// A structured query together with the outcome of running it.
///
/// `rows` is `Some` only when `status` is [`QueryStatus::Success`], and then it is
/// never empty. An empty successful result is [`QueryStatus::EmptyResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    query_text: String,
    original_text: String,
    rows: Option<Vec<Row>>,
    status: QueryStatus,
}

impl QueryResult {
    /// Build a result, normalizing `Success` with zero rows to `EmptyResult`.
    ///
    /// `query_text` is the text that was executed, `original_text` what the
    /// decision-maker wrote before repair.
    pub fn new(
        query_text: impl Into<String>,
        original_text: impl Into<String>,
        rows: Vec<Row>,
        status: QueryStatus,
    ) -> Self {
        let (rows, status) = match status {
            QueryStatus::Success if !rows.is_empty() => (Some(rows), QueryStatus::Success),
            QueryStatus::Success => (None, QueryStatus::EmptyResult),
            other => (None, other),
        };
        Self {
            query_text: query_text.into(),
            original_text: original_text.into(),
            rows,
            status,
        }
    }

    /// The executed (repaired) query text.
    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    /// The query text before repair.
    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn rows(&self) -> Option<&[Row]> {
        self.rows.as_deref()
    }

    pub fn status(&self) -> QueryStatus {
        self.status
    }

    /// Whether the query returned at least one row.
    pub fn has_results(&self) -> bool {
        self.rows.is_some()
    }

    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }

    /// Render the rows as a text table (see [`render_table`]).
    pub fn results_as_table(&self, max_rows: usize) -> String {
        match &self.rows {
            Some(rows) => render_table(rows, max_rows),
            None => "No results".into(),
        }
    }
}

/// Render rows as aligned columns.
///
/// With more than `max_rows` rows, the first `max_rows / 2` and the last
/// `max_rows - max_rows / 2` are shown around an omission line; the trailing
/// block has no header.
pub fn render_table(rows: &[Row], max_rows: usize) -> String {
    if rows.is_empty() {
        return "No results".into();
    }

    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for (var, _) in row.iter() {
            if !columns.contains(&var) {
                columns.push(var);
            }
        }
    }

    let (head, tail, omitted) = if rows.len() > max_rows {
        let half = max_rows / 2;
        let tail_len = max_rows - half;
        (
            &rows[..half],
            &rows[rows.len() - tail_len..],
            rows.len() - max_rows,
        )
    } else {
        (rows, &rows[rows.len()..], 0)
    };

    let cells = |row: &Row| -> Vec<String> {
        columns
            .iter()
            .map(|c| row.get(c).map(|b| b.value.clone()).unwrap_or_default())
            .collect()
    };
    let head_cells: Vec<Vec<String>> = head.iter().map(&cells).collect();
    let tail_cells: Vec<Vec<String>> = tail.iter().map(&cells).collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            head_cells
                .iter()
                .chain(tail_cells.iter())
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |values: &[String]| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, &w)| format!("{v:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    let mut lines = vec![format_line(&header)];
    lines.extend(head_cells.iter().map(|r| format_line(r)));
    if omitted > 0 {
        lines.push(format!("... ({omitted} rows omitted) ..."));
        lines.extend(tail_cells.iter().map(|r| format_line(r)));
    }
    lines.join("\n")
}
