//! Tiered recovery of directives embedded in free text.
//!
//! Every `{` starts a candidate. A candidate whose braces balance is tried
//! in three tiers, stopping at the first tier that can read it at all:
//!
//! 1. **Strict**: the span parses as JSON as-is.
//! 2. **Fuzzy**: the span parses after undoing `\{`, `\}` and `\"`.
//! 3. **Manual**: `protocol`, `tool` and the `arguments` object are pulled
//!    out by pattern, with a loose `key:value` split as the last resort.
//!
//! A JSON value that parses but fails validation is decisive; later tiers
//! only run when earlier ones could not parse the text.

use regex_lite::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;
use thiserror::Error;

use crate::directive::{Directive, DirectiveError, PROTOCOL};
use crate::scanner::{balanced_end, split_once_unquoted, split_unquoted};

static PROTOCOL_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""protocol"\s*:\s*"([^"]*)""#).unwrap());
static TOOL_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""tool"\s*:\s*"([^"]*)""#).unwrap());
static ARGUMENTS_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""arguments"\s*:\s*\{"#).unwrap());

/// Which recovery tier read a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Strict,
    Fuzzy,
    Manual,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Strict => "strict",
            Tier::Fuzzy => "fuzzy",
            Tier::Manual => "manual",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a candidate produced no directive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("unbalanced braces")]
    Unbalanced,

    #[error(transparent)]
    Invalid(#[from] DirectiveError),
}

/// A directive and where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    /// Byte range of the encoded object in the scanned text
    pub span: Range<usize>,
    pub tier: Tier,
    pub directive: Directive,
}

/// A scanned candidate that was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Byte range examined; for [`RejectReason::Unbalanced`] this runs to the end of the text
    pub span: Range<usize>,
    /// The tier that rendered the verdict, `None` when the braces never balanced
    pub tier: Option<Tier>,
    pub reason: RejectReason,
}

impl Rejection {
    /// Whether the rejected text still presented itself as a modai directive.
    pub fn claims_protocol(&self) -> bool {
        matches!(&self.reason, RejectReason::Invalid(e) if e.claims_protocol())
    }

    /// The first `max_chars` characters of the rejected text.
    pub fn excerpt<'t>(&self, text: &'t str, max_chars: usize) -> &'t str {
        let region = &text[self.span.clone()];
        match region.char_indices().nth(max_chars) {
            Some((cut, _)) => &region[..cut],
            None => region,
        }
    }
}

/// One scanned candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Accepted(Accepted),
    Rejected(Rejection),
}

impl Candidate {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Candidate::Accepted(a) => &a.span,
            Candidate::Rejected(r) => &r.span,
        }
    }

    pub fn into_directive(self) -> Option<Directive> {
        match self {
            Candidate::Accepted(a) => Some(a.directive),
            Candidate::Rejected(_) => None,
        }
    }

    /// Whether this span should be removed from user-visible text.
    pub(crate) fn is_strippable(&self) -> bool {
        match self {
            Candidate::Accepted(_) => true,
            Candidate::Rejected(r) => r.claims_protocol(),
        }
    }
}

/// Left-to-right iterator over every candidate in a text.
///
/// Created by [`candidates`]; call it again to rescan from the beginning.
#[derive(Debug, Clone)]
pub struct Candidates<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for Candidates<'a> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        let start = self.pos + self.text.get(self.pos..)?.find('{')?;

        match balanced_end(self.text, start) {
            Some(end) => {
                self.pos = end;
                Some(evaluate(&self.text[start..end], start..end))
            }
            None => {
                // Resume just past the brace: a real directive may sit inside.
                self.pos = start + 1;
                Some(Candidate::Rejected(Rejection {
                    span: start..self.text.len(),
                    tier: None,
                    reason: RejectReason::Unbalanced,
                }))
            }
        }
    }
}

impl std::iter::FusedIterator for Candidates<'_> {}

/// Scan `text` for every `{`-delimited candidate.
pub fn candidates(text: &str) -> Candidates<'_> {
    Candidates { text, pos: 0 }
}

/// Lazily yield the directives in `text`, in order of first occurrence.
pub fn directives(text: &str) -> impl Iterator<Item = Directive> + '_ {
    candidates(text).filter_map(Candidate::into_directive)
}

/// Every directive in `text`, in order of first occurrence.
///
/// Malformed candidates are dropped; use [`rejections`] to see them.
pub fn extract_all(text: &str) -> Vec<Directive> {
    directives(text).collect()
}

/// The candidates in `text` that produced no directive.
pub fn rejections(text: &str) -> Vec<Rejection> {
    candidates(text)
        .filter_map(|c| match c {
            Candidate::Rejected(r) => Some(r),
            Candidate::Accepted(_) => None,
        })
        .collect()
}

fn evaluate(candidate: &str, span: Range<usize>) -> Candidate {
    let (tier, verdict) = read_candidate(candidate);
    match verdict {
        Ok(directive) => Candidate::Accepted(Accepted {
            span,
            tier,
            directive,
        }),
        Err(reason) => Candidate::Rejected(Rejection {
            span,
            tier: Some(tier),
            reason: reason.into(),
        }),
    }
}

fn read_candidate(candidate: &str) -> (Tier, Result<Directive, DirectiveError>) {
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return (Tier::Strict, Directive::from_value(&value));
    }

    let unescaped = candidate
        .contains('\\')
        .then(|| unescape(candidate));

    if let Some(unescaped) = &unescaped {
        if let Ok(value) = serde_json::from_str::<Value>(unescaped) {
            return (Tier::Fuzzy, Directive::from_value(&value));
        }
    }

    let manual = match (read_fields(candidate), &unescaped) {
        (Err(_), Some(unescaped)) => read_fields(unescaped),
        (first, _) => first,
    };
    (Tier::Manual, manual)
}

/// Undo one level of escaping around braces and quotes.
fn unescape(text: &str) -> String {
    text.replace("\\{", "{")
        .replace("\\}", "}")
        .replace("\\\"", "\"")
}

fn read_fields(candidate: &str) -> Result<Directive, DirectiveError> {
    let protocol = PROTOCOL_FIELD
        .captures(candidate)
        .and_then(|c| c.get(1))
        .ok_or(DirectiveError::MissingProtocol)?
        .as_str();
    if protocol != PROTOCOL {
        return Err(DirectiveError::WrongProtocol(format!("\"{protocol}\"")));
    }

    let tool = TOOL_FIELD
        .captures(candidate)
        .and_then(|c| c.get(1))
        .ok_or(DirectiveError::MissingTool)?
        .as_str();

    let opener = ARGUMENTS_FIELD
        .find(candidate)
        .ok_or(DirectiveError::MissingArguments)?;
    let brace = opener.end() - 1;
    let end = balanced_end(candidate, brace).ok_or(DirectiveError::MissingArguments)?;
    let arguments = read_arguments(&candidate[brace..end]);

    if arguments.is_empty() {
        return Err(DirectiveError::EmptyArguments);
    }
    Directive::new(tool, arguments)
}

/// Parse an `{...}` region, falling back to a flat `key:value` split.
fn read_arguments(region: &str) -> Map<String, Value> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(region) {
        return map;
    }

    let inner = &region[1..region.len() - 1];
    let mut arguments = Map::new();
    for pair in split_unquoted(inner, b',') {
        let Some((key, value)) = split_once_unquoted(pair, b':') else {
            continue;
        };
        let key = strip_quotes(key.trim());
        if key.is_empty() {
            continue;
        }
        arguments.insert(key.to_string(), loose_value(value.trim()));
    }
    arguments
}

fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

fn loose_value(text: &str) -> Value {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        return Value::String(text[1..text.len() - 1].to_string());
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
