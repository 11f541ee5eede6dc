//! Mechanical fixes applied to a SPARQL query before it is executed.
//!
//! Four rewrites run in a fixed order, each a pure string transform:
//!
//! 1. `PREFIX ex: http://...` gets its IRI wrapped in angle brackets.
//! 2. `ORDER BY DESC(?v` missing its `)` is closed.
//! 3. A descending order with no `LIMIT n` gets `LIMIT 1`.
//! 4. Anything still without `LIMIT n` gets `LIMIT 10`.
//!
//! Running the pass on its own output changes nothing. Text inside `#`
//! comments neither triggers nor satisfies a rewrite, and a `LIMIT` appended
//! after a trailing comment starts on its own line.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::scan::{closing_paren_sparql, scan, strip_comments};

static BARE_PREFIX_IRI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\bPREFIX\s+[A-Za-z0-9_.-]*:\s*)([A-Za-z][A-Za-z0-9+.-]*://[^\s<>]+)").unwrap()
});

static ORDER_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bORDER\s+BY\s+(DESC|ASC)\s*(\()\s*(\?[A-Za-z_][A-Za-z0-9_]*)").unwrap()
});

static DESCENDING_ORDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bORDER\s+BY\b[^{}]*\bDESC\b").unwrap());

static LIMIT_CLAUSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bLIMIT\s+\d+").unwrap());

/// Row limit appended to descending-order queries without one.
pub const DESCENDING_LIMIT: usize = 1;

/// Row limit appended to any other query without one.
pub const DEFAULT_LIMIT: usize = 10;

/// One rewrite that changed the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    BracketedPrefixIri,
    ClosedOrderCall,
    DescendingLimit,
    DefaultLimit,
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BracketedPrefixIri => "bracketed PREFIX IRI",
            Self::ClosedOrderCall => "closed ORDER BY call",
            Self::DescendingLimit => "added LIMIT 1 to descending order",
            Self::DefaultLimit => "added LIMIT 10",
        })
    }
}

/// Original and repaired text, plus which rewrites fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairedQuery {
    pub original: String,
    pub repaired: String,
    pub applied: Vec<Repair>,
}

impl RepairedQuery {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Run all four rewrites over `query`.
pub fn repair_query(query: &str) -> RepairedQuery {
    let mut applied = Vec::new();
    let mut text = query.to_string();

    let steps: [(Repair, fn(&str) -> Option<String>); 4] = [
        (Repair::BracketedPrefixIri, bracket_prefix_iris),
        (Repair::ClosedOrderCall, close_order_calls),
        (Repair::DescendingLimit, limit_descending),
        (Repair::DefaultLimit, limit_default),
    ];
    for (repair, step) in steps {
        if let Some(next) = step(&text) {
            text = next;
            applied.push(repair);
        }
    }

    RepairedQuery {
        original: query.to_string(),
        repaired: text,
        applied,
    }
}

/// Whether `query` has a `LIMIT n` outside comments.
pub fn has_limit(query: &str) -> bool {
    LIMIT_CLAUSE.is_match(&strip_comments(query))
}

fn bracket_prefix_iris(query: &str) -> Option<String> {
    if !BARE_PREFIX_IRI.is_match(query) {
        return None;
    }
    Some(BARE_PREFIX_IRI.replace_all(query, "${1}<${2}>").into_owned())
}

fn close_order_calls(query: &str) -> Option<String> {
    let scanned = scan(query);
    // (start, end, replacement) for each call whose `(` never closes.
    let fixes: Vec<(usize, usize, String)> = ORDER_CALL
        .captures_iter(query)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let open = caps.get(2)?.start();
            if !scanned.is_code(whole.start()) || closing_paren_sparql(&query[open..]).is_some() {
                return None;
            }
            let func = caps.get(1)?.as_str().to_ascii_uppercase();
            let var = caps.get(3)?.as_str();
            Some((whole.start(), whole.end(), format!("ORDER BY {func}({var})")))
        })
        .collect();

    if fixes.is_empty() {
        return None;
    }
    let mut out = query.to_string();
    for (start, end, replacement) in fixes.into_iter().rev() {
        out.replace_range(start..end, &replacement);
    }
    Some(out)
}

fn limit_descending(query: &str) -> Option<String> {
    let code = strip_comments(query);
    (DESCENDING_ORDER.is_match(&code) && !LIMIT_CLAUSE.is_match(&code))
        .then(|| append_limit(query, DESCENDING_LIMIT))
}

fn limit_default(query: &str) -> Option<String> {
    (!has_limit(query)).then(|| append_limit(query, DEFAULT_LIMIT))
}

fn append_limit(query: &str, limit: usize) -> String {
    let body = query.trim_end();
    let separator = if scan(body).ends_in_comment(body.len()) {
        '\n'
    } else {
        ' '
    };
    format!("{body}{separator}LIMIT {limit}")
}
