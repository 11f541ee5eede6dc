//! Character-level view of SPARQL text.
//!
//! Separates query syntax from the text inside string literals, `<...>` IRI
//! references and `#` comments, so parentheses and keywords can be matched
//! without being fooled by `"(a"` or `# it's`.

use std::ops::Range;

/// Output of [`scan`].
#[derive(Debug, Default)]
pub(crate) struct Scan {
    /// Syntax characters with their byte offsets, in order.
    pub code: Vec<(usize, char)>,
    /// Byte ranges of `#` comments, not including the newline.
    pub comments: Vec<Range<usize>>,
}

impl Scan {
    /// Whether byte `offset` is query syntax (not inside a literal, IRI or comment).
    pub fn is_code(&self, offset: usize) -> bool {
        self.code.binary_search_by_key(&offset, |&(i, _)| i).is_ok()
    }

    /// Whether the scanned text of length `len` ends inside a comment.
    pub fn ends_in_comment(&self, len: usize) -> bool {
        self.comments.last().is_some_and(|c| c.end == len)
    }
}

pub(crate) fn scan(text: &str) -> Scan {
    let mut out = Scan::default();
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' | '\'' => {
                let mut escaped = false;
                for (_, d) in chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if d == '\\' {
                        escaped = true;
                    } else if d == c {
                        break;
                    }
                }
            }
            '#' => {
                let mut end = text.len();
                while let Some(&(j, d)) = chars.peek() {
                    if d == '\n' {
                        end = j;
                        break;
                    }
                    chars.next();
                }
                out.comments.push(i..end);
            }
            '<' => match iri_len(&text[i..]) {
                Some(len) => {
                    while chars.next_if(|&(j, _)| j < i + len).is_some() {}
                }
                None => out.code.push((i, c)),
            },
            _ => out.code.push((i, c)),
        }
    }
    out
}

/// Length of the IRI reference at the start of `s` (which begins with `<`).
///
/// `None` when the `<` is a comparison operator instead.
fn iri_len(s: &str) -> Option<usize> {
    for (j, c) in s.char_indices().skip(1) {
        match c {
            '>' => return Some(j + 1),
            '<' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => return None,
            c if c.is_whitespace() => return None,
            _ => {}
        }
    }
    None
}

/// `text` with every `#` comment removed; newlines are kept.
pub(crate) fn strip_comments(text: &str) -> String {
    let scanned = scan(text);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for comment in &scanned.comments {
        out.push_str(&text[last..comment.start]);
        last = comment.end;
    }
    out.push_str(&text[last..]);
    out
}

/// Byte offset of the `)` matching the `(` that starts `group`, counting every
/// parenthesis.
pub(crate) fn closing_paren(group: &str) -> Option<usize> {
    match_depth(group.char_indices())
}

/// Like [`closing_paren`], but parentheses inside literals, IRIs and comments
/// do not count. Falls back to plain counting when that finds no match, e.g.
/// after a stray apostrophe opens a literal that never closes.
pub(crate) fn closing_paren_sparql(group: &str) -> Option<usize> {
    match_depth(scan(group).code).or_else(|| closing_paren(group))
}

fn match_depth(chars: impl IntoIterator<Item = (usize, char)>) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in chars {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
