//! # Message Selectors
//!
//! A selector decides which queued message a receiver takes. Messages that
//! do not match stay on the destination for other receivers.
//!
//! Textual selectors use the header-equality syntax common to channel
//! frameworks:
//!
//! ```text
//! operation = 'create' AND correlation-id = 'order-42'
//! ```

use crate::errors::SelectorError;
use crate::message::Message;
use std::fmt;
use std::sync::Arc;

/// Predicate over messages on a destination.
#[derive(Clone, Default)]
pub enum MessageSelector {
    /// Matches every message.
    #[default]
    Any,
    /// Matches when the header exists with exactly this value.
    HeaderEquals { name: String, value: String },
    /// Matches when every inner selector matches.
    All(Vec<MessageSelector>),
    /// Arbitrary predicate, e.g. a correlation-key comparison.
    Predicate(Arc<dyn Fn(&Message) -> bool + Send + Sync>),
}

impl MessageSelector {
    /// Selector on a single header value.
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::HeaderEquals {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Selector backed by a closure.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Test a message against this selector.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        match self {
            Self::Any => true,
            Self::HeaderEquals { name, value } => message.header(name) == Some(value.as_str()),
            Self::All(selectors) => selectors.iter().all(|s| s.matches(message)),
            Self::Predicate(f) => f(message),
        }
    }

    /// Parse a textual selector of `name = 'value'` clauses joined by `AND`.
    ///
    /// An empty expression selects everything. Values may be single-quoted,
    /// double-quoted or bare.
    ///
    /// # Errors
    ///
    /// Returns `SelectorError` when a clause lacks `=`, has an empty header
    /// name, or leaves a quote open.
    pub fn parse(expression: &str) -> Result<Self, SelectorError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Ok(Self::Any);
        }

        let mut clauses = Vec::new();
        for clause in split_conjunction(expression) {
            let clause = clause.trim();
            let (name, value) = clause
                .split_once('=')
                .ok_or_else(|| SelectorError::MissingOperator(clause.to_string()))?;

            let name = name.trim();
            if name.is_empty() {
                return Err(SelectorError::EmptyHeaderName(clause.to_string()));
            }

            let value = unquote(value.trim())
                .ok_or_else(|| SelectorError::UnterminatedQuote(clause.to_string()))?;

            clauses.push(Self::header(name, value));
        }

        if clauses.len() == 1 {
            Ok(clauses.remove(0))
        } else {
            Ok(Self::All(clauses))
        }
    }
}

impl fmt::Debug for MessageSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "Any"),
            Self::HeaderEquals { name, value } => write!(f, "{} = '{}'", name, value),
            Self::All(selectors) => f.debug_list().entries(selectors).finish(),
            Self::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// Split on `AND` (any case) outside of quoted values.
fn split_conjunction(expression: &str) -> Vec<&str> {
    const SEPARATOR: &str = " and ";

    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut skip_until = 0;

    for (idx, ch) in expression.char_indices() {
        if idx < skip_until {
            continue;
        }
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None => {
                let candidate = expression.get(idx..idx + SEPARATOR.len());
                if candidate.is_some_and(|c| c.eq_ignore_ascii_case(SEPARATOR)) {
                    parts.push(&expression[start..idx]);
                    start = idx + SEPARATOR.len();
                    skip_until = start;
                }
            }
        }
    }
    parts.push(&expression[start..]);
    parts
}

fn unquote(value: &str) -> Option<String> {
    let mut chars = value.chars();
    match chars.next() {
        Some(q @ ('\'' | '"')) => {
            if value.len() >= 2 && value.ends_with(q) {
                Some(value[1..value.len() - 1].to_string())
            } else {
                None
            }
        }
        _ => Some(value.to_string()),
    }
}
