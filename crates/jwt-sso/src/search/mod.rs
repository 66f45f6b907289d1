//! Attribute path search over JSON documents
//!
//! Evaluates JMESPath expressions against decoded token claims. Paths are
//! compiled once into an [`Expression`] and evaluated many times.
//!
//! A path that matches nothing yields `Ok(None)`. Only malformed paths,
//! malformed input and type errors inside functions are errors, and every
//! error carries the offending path for diagnostics.
//!
//! # Supported syntax
//!
//! - identifiers, quoted identifiers and sub-expressions: `a.b`, `"x-y".z`
//! - indexes and slices: `[0]`, `[-1]`, `[1:3]`, `[::-1]`
//! - projections: `[*]`, `.*`, `[]`, `[?expr]`
//! - comparators `== != < <= > >=`, `&&`, `||`, `!`, parentheses, pipes
//! - `@`, multi-select lists and hashes, `'raw'` strings and `` `json` `` literals
//! - built-in functions such as `contains`, `length`, `join`, `sort_by`
//!
//! # Example
//!
//! ```
//! use jwt_sso::search::Expression;
//! use serde_json::json;
//!
//! let expr = Expression::compile("contains(groups[*], 'admins') && 'Admin' || 'Viewer'").unwrap();
//! let claims = json!({"groups": ["admins", "devs"]});
//! assert_eq!(expr.search(&claims).unwrap(), Some(json!("Admin")));
//! ```

mod ast;
mod functions;
mod interpreter;
mod lexer;
mod parser;

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

/// Attribute path search errors
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no attribute path specified")]
    EmptyPath,

    #[error("empty input provided")]
    EmptyInput,

    #[error("failed to decode input as JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("failed to parse attribute path {path:?} at position {position}: {reason}")]
    Parse {
        path: String,
        position: usize,
        reason: String,
    },

    #[error("failed to search with provided path {path:?}: {reason}")]
    Evaluation { path: String, reason: String },
}

impl SearchError {
    /// The attribute path involved in the failure, if any
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Parse { path, .. } | Self::Evaluation { path, .. } => Some(path.as_str()),
            _ => None,
        }
    }
}

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParseError {
    pub position: usize,
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(position: usize, reason: impl Into<String>) -> Self {
        Self {
            position,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EvalError(String);

impl EvalError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// A compiled attribute path
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    ast: ast::Ast,
}

impl Expression {
    pub fn compile(path: &str) -> SearchResult<Self> {
        if path.trim().is_empty() {
            return Err(SearchError::EmptyPath);
        }
        let ast = parser::parse(path).map_err(|e| SearchError::Parse {
            path: path.to_string(),
            position: e.position,
            reason: e.reason,
        })?;
        Ok(Self {
            source: path.to_string(),
            ast,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate against a decoded document; `None` when nothing matched
    pub fn search(&self, document: &Value) -> SearchResult<Option<Value>> {
        let value =
            interpreter::evaluate(&self.ast, document).map_err(|e| SearchError::Evaluation {
                path: self.source.clone(),
                reason: e.0,
            })?;
        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }
}

impl FromStr for Expression {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Search raw JSON bytes with an attribute path
pub fn search(path: &str, input: &[u8]) -> SearchResult<Option<Value>> {
    if path.trim().is_empty() {
        return Err(SearchError::EmptyPath);
    }
    if input.is_empty() {
        return Err(SearchError::EmptyInput);
    }
    let document: Value = serde_json::from_slice(input).map_err(SearchError::InvalidJson)?;
    Expression::compile(path)?.search(&document)
}

/// Search an already decoded document with an attribute path
pub fn search_value(path: &str, document: &Value) -> SearchResult<Option<Value>> {
    Expression::compile(path)?.search(document)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_search_bytes() {
        let input = br#"{"role": "Editor", "groups": ["a"]}"#;
        assert_eq!(search("role", input).unwrap(), Some(json!("Editor")));
        assert_eq!(search("groups", input).unwrap(), Some(json!(["a"])));
    }

    #[test]
    fn test_not_found_is_none() {
        let input = br#"{"role": "Editor"}"#;
        assert_eq!(search("missing", input).unwrap(), None);
        assert_eq!(search("role.nested", input).unwrap(), None);
    }

    #[test]
    fn test_empty_path() {
        let err = search("", b"{}").unwrap_err();
        assert!(matches!(err, SearchError::EmptyPath));
        assert_eq!(err.to_string(), "no attribute path specified");
    }

    #[test]
    fn test_empty_input() {
        let err = search("role", b"").unwrap_err();
        assert!(matches!(err, SearchError::EmptyInput));
        assert_eq!(err.to_string(), "empty input provided");
    }

    #[test]
    fn test_invalid_json_input() {
        let err = search("role", b"{not json").unwrap_err();
        assert!(matches!(err, SearchError::InvalidJson(_)));
    }

    #[test]
    fn test_parse_error_includes_path() {
        let err = search("roles[", b"{}").unwrap_err();
        assert_eq!(err.path(), Some("roles["));
        assert!(err.to_string().contains("\"roles[\""));
    }

    #[test]
    fn test_evaluation_error_includes_path() {
        let err = search_value("length(missing)", &json!({})).unwrap_err();
        assert!(matches!(err, SearchError::Evaluation { .. }));
        assert_eq!(err.path(), Some("length(missing)"));
    }

    #[test]
    fn test_expression_from_str_and_display() {
        let expr: Expression = "realm_access.roles[0]".parse().unwrap();
        assert_eq!(expr.to_string(), "realm_access.roles[0]");
        assert_eq!(expr.as_str(), "realm_access.roles[0]");
        let claims = json!({"realm_access": {"roles": ["Admin"]}});
        assert_eq!(expr.search(&claims).unwrap(), Some(json!("Admin")));
    }

    #[test]
    fn test_compiled_expression_reused() {
        let expr = Expression::compile("email").unwrap();
        assert_eq!(
            expr.search(&json!({"email": "a@x.com"})).unwrap(),
            Some(json!("a@x.com"))
        );
        assert_eq!(expr.search(&json!({"login": "b"})).unwrap(), None);
    }
}
