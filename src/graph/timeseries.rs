//! Time-series ingestion: sensor readings from CSV into the Brick graph.
//!
//! The CSV has a `Datetime` column (`12/31/2018 23:59` style) followed by one
//! column per sensor. Each non-empty numeric cell becomes an observation node:
//!
//! ```text
//! bldg:<col> ref:hasObservation bldg:obs_<col>_<row> .
//! bldg:obs_<col>_<row> ref:hasTimestamp "2018-12-31T23:59:00"^^xsd:dateTime ;
//!                      ref:hasValue "21.5"^^xsd:float .
//! ```
//!
//! Columns whose name cannot form an IRI (spaces, angle brackets) are skipped
//! with a warning.

use std::path::Path;

use chrono::NaiveDateTime;
use oxigraph::model::NamedNode;

use crate::error::GraphError;

use super::sparql::SparqlGraph;
use super::{GraphResult, XSD_NS};

/// Name of the timestamp column.
pub const TIMESTAMP_COLUMN: &str = "Datetime";

const INPUT_TIME_FORMAT: &str = "%m/%d/%Y %H:%M";
const ISO_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Data rows in the file.
    pub total_rows: usize,
    /// Rows actually loaded (the trailing window).
    pub rows_loaded: usize,
    /// Observation nodes created.
    pub observations: usize,
    /// Cells skipped because they were empty or not numeric.
    pub skipped_cells: usize,
    /// Sensor columns left out because their name is not usable in an IRI.
    pub skipped_columns: Vec<String>,
    /// ISO timestamp of the first loaded row.
    pub first_timestamp: Option<String>,
    /// ISO timestamp of the last loaded row.
    pub last_timestamp: Option<String>,
}

/// Convert `12/31/2018 23:59` to `2018-12-31T23:59:00`.
pub fn to_iso_timestamp(raw: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(raw.trim(), INPUT_TIME_FORMAT)
        .ok()
        .map(|dt| dt.format(ISO_TIME_FORMAT).to_string())
}

/// Split one CSV line. Double-quoted fields may contain commas, and `""`
/// inside them is a literal quote.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field).trim().to_string()),
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

/// Load the last `max_rows` rows of a time-series CSV file.
pub fn ingest_timeseries_file(
    graph: &SparqlGraph,
    path: &Path,
    max_rows: usize,
) -> GraphResult<IngestReport> {
    let content = std::fs::read_to_string(path).map_err(|e| GraphError::Load {
        source_name: path.display().to_string(),
        message: e.to_string(),
    })?;
    let report = ingest_timeseries(graph, &content, max_rows)?;
    tracing::info!(
        path = %path.display(),
        rows = report.rows_loaded,
        total = report.total_rows,
        observations = report.observations,
        first = report.first_timestamp.as_deref().unwrap_or("-"),
        last = report.last_timestamp.as_deref().unwrap_or("-"),
        "ingested time-series data"
    );
    Ok(report)
}

/// Load the last `max_rows` data rows of CSV `content` into `graph`.
///
/// Loading the tail keeps the most recent readings, which is what
/// "latest value" questions ask about.
pub fn ingest_timeseries(
    graph: &SparqlGraph,
    content: &str,
    max_rows: usize,
) -> GraphResult<IngestReport> {
    let mut lines = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'));

    let header = lines.next().ok_or_else(|| GraphError::Ingest {
        message: "CSV has no header line".into(),
    })?;
    let columns = split_fields(header);
    let ts_index = columns
        .iter()
        .position(|c| c == TIMESTAMP_COLUMN)
        .ok_or_else(|| GraphError::Ingest {
            message: format!("CSV header has no \"{TIMESTAMP_COLUMN}\" column"),
        })?;

    let data: Vec<&str> = lines.collect();
    let start = data.len().saturating_sub(max_rows);

    let ns = graph.namespaces().clone();
    let has_observation = format!("{}hasObservation", ns.reference);
    let has_timestamp = format!("{}hasTimestamp", ns.reference);
    let has_value = format!("{}hasValue", ns.reference);
    let xsd_datetime = format!("{XSD_NS}dateTime");
    let xsd_float = format!("{XSD_NS}float");

    let mut report = IngestReport {
        total_rows: data.len(),
        ..Default::default()
    };

    // Sensor IRI per column; `None` for the timestamp and unusable columns.
    let sensors: Vec<Option<String>> = columns
        .iter()
        .enumerate()
        .map(|(col_index, column)| {
            if col_index == ts_index || column.is_empty() {
                return None;
            }
            let sensor = format!("{}{column}", ns.bldg);
            if NamedNode::new(sensor.as_str()).is_err() {
                tracing::warn!(column = %column, "skipping column: name is not valid in an IRI");
                report.skipped_columns.push(column.clone());
                return None;
            }
            Some(sensor)
        })
        .collect();

    for (row_index, line) in data.iter().enumerate().skip(start) {
        let fields = split_fields(line);
        let raw_ts = fields.get(ts_index).map(String::as_str).unwrap_or("");
        let timestamp = to_iso_timestamp(raw_ts).ok_or_else(|| GraphError::Ingest {
            message: format!("row {row_index}: unparseable timestamp \"{raw_ts}\""),
        })?;

        if report.first_timestamp.is_none() {
            report.first_timestamp = Some(timestamp.clone());
        }
        report.last_timestamp = Some(timestamp.clone());
        report.rows_loaded += 1;

        for (col_index, (column, sensor)) in columns.iter().zip(&sensors).enumerate() {
            let Some(sensor) = sensor else {
                continue;
            };
            let raw = fields.get(col_index).map(String::as_str).unwrap_or("");
            let value = match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => {
                    report.skipped_cells += 1;
                    continue;
                }
            };

            let obs = format!("{}obs_{column}_{row_index}", ns.bldg);
            graph.insert_link(sensor, &has_observation, &obs)?;
            graph.insert_literal(&obs, &has_timestamp, &timestamp, &xsd_datetime)?;
            graph.insert_literal(&obs, &has_value, &value.to_string(), &xsd_float)?;
            report.observations += 1;
        }
    }

    Ok(report)
}
