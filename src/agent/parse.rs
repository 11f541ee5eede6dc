//! Extracting an [`Action`] from free-form decision-maker output.
//!
//! The expected shape is
//!
//! ```text
//! Thought: I need the room temperature sensor.
//! Action: search_brick(temperature)
//! ```
//!
//! The argument is everything between the opening parenthesis after the action
//! name and its matching close, so SPARQL with nested `FILTER(...)` or
//! `DESC(...)` calls survives intact. In `execute_sparql` arguments,
//! parentheses inside string literals, IRIs and `#` comments do not count;
//! other actions count every parenthesis, so `search_brick(occupant's room)`
//! needs no quoting.

use std::sync::LazyLock;

use regex::Regex;

use super::action::{Action, ActionKind};
use super::error::{AgentError, AgentResult};
use super::scan::{closing_paren, closing_paren_sparql};

static ACTION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t>*_`-]*Action[*_]*\s*:[*_]*\s*").unwrap());

static ACTION_MARKER_ANYWHERE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Action\s*:\s*").unwrap());

static ACTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s`*]*([A-Za-z_][A-Za-z0-9_]*)").unwrap());

static THOUGHT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t>*_`-]*Thought[*_]*\s*:[*_]*\s*").unwrap());

const EXCERPT_CHARS: usize = 200;

/// Parse the first `Action: name(argument)` block in `text`.
///
/// Fails with [`AgentError::ActionParse`] when no block is found or its
/// parentheses never balance, and with [`AgentError::InvalidActionKind`] when
/// the name is not one of the known actions.
pub fn parse_action(text: &str) -> AgentResult<Action> {
    let marker = ACTION_MARKER
        .find(text)
        .or_else(|| ACTION_MARKER_ANYWHERE.find(text))
        .ok_or_else(|| parse_error("no `Action:` line found", text))?;

    let after_marker = &text[marker.end()..];
    let name_match = ACTION_NAME
        .captures(after_marker)
        .and_then(|c| c.get(1))
        .ok_or_else(|| parse_error("`Action:` is not followed by an action name", text))?;
    let name = name_match.as_str();

    let rest = &after_marker[name_match.end()..];
    let open = rest
        .find('(')
        .filter(|&i| rest[..i].trim().is_empty())
        .ok_or_else(|| parse_error(&format!("`{name}` is not followed by `(`"), text))?;

    let kind = name.parse::<ActionKind>();
    let quoting = match kind {
        Ok(ActionKind::ExecuteQuery) => Quoting::Sparql,
        _ => Quoting::Plain,
    };
    let argument = extract_balanced(rest, open, quoting)
        .ok_or_else(|| parse_error(&format!("unbalanced parentheses after `{name}`"), text))?;

    let kind = kind?;
    let argument = clean_argument(kind, argument);
    let rationale = extract_rationale(&text[..marker.start()]);

    Ok(Action::new(rationale, kind, argument))
}

/// How [`extract_balanced`] treats quotes and comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// Every parenthesis counts.
    Plain,
    /// Parentheses inside SPARQL literals, IRIs and comments are skipped.
    Sparql,
}

/// Contents between the `(` at byte `open` and its matching `)`.
///
/// Returns `None` if `text[open..]` does not start with `(` or the group never closes.
pub fn extract_balanced(text: &str, open: usize, quoting: Quoting) -> Option<&str> {
    let group = text.get(open..)?;
    if !group.starts_with('(') {
        return None;
    }
    let close = match quoting {
        Quoting::Plain => closing_paren(group),
        Quoting::Sparql => closing_paren_sparql(group),
    }?;
    Some(&group[1..close])
}

fn extract_rationale(before_action: &str) -> String {
    let thought = match THOUGHT_MARKER.find_iter(before_action).last() {
        Some(m) => &before_action[m.end()..],
        None => before_action,
    };
    thought.trim().to_string()
}

/// Trim whitespace; for the lookup actions also drop one pair of surrounding quotes.
fn clean_argument(kind: ActionKind, argument: &str) -> String {
    let trimmed = argument.trim();
    match kind {
        ActionKind::ExecuteQuery => strip_code_fence(trimmed).to_string(),
        _ => {
            for q in ['"', '\'', '`'] {
                if let Some(inner) = trimmed
                    .strip_prefix(q)
                    .and_then(|s| s.strip_suffix(q))
                {
                    return inner.trim().to_string();
                }
            }
            trimmed.to_string()
        }
    }
}

fn strip_code_fence(query: &str) -> &str {
    let Some(body) = query.strip_prefix("```") else {
        return query;
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    let body = body
        .strip_prefix("sparql")
        .or_else(|| body.strip_prefix("SPARQL"))
        .unwrap_or(body);
    body.trim()
}

fn parse_error(message: &str, text: &str) -> AgentError {
    AgentError::ActionParse {
        message: message.to_string(),
        excerpt: text.chars().take(EXCERPT_CHARS).collect(),
    }
}
