//! Input validation for text that ends up inside SQL.
//!
//! Table and column names cannot be bound as query parameters, so every
//! identifier is checked against a restricted grammar before it is
//! interpolated. Free-form queries go through a keyword blocklist and a
//! statement-type check.
//!
//! The blocklist is a coarse filter, not a guarantee: a comment placed
//! between two keywords (`DROP/**/TABLE`) defeats the word-boundary match.
//! [`ensure_single_select`] closes most of that gap by parsing the text.

use regex::Regex;
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::sync::LazyLock;
use thiserror::Error;

/// Rejected input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifier does not match `^[A-Za-z_][A-Za-z0-9_]*$`.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Query text matched a destructive keyword pattern.
    #[error("Query contains a blocked statement")]
    UnsafeQuery,

    /// Only single SELECT statements may be executed.
    #[error("Only SELECT queries are allowed")]
    NotSelect,

    /// A SELECT that writes (`INTO`) or takes row locks (`FOR UPDATE`).
    #[error("Query must be read-only")]
    NotReadOnly,

    /// Query could not be parsed.
    #[error("Could not parse query: {0}")]
    Unparsable(String),

    /// A required argument was empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("identifier regex"));

const DANGEROUS_PATTERNS: &[&str] = &[
    r"\bDROP\s+TABLE\b",
    r"\bDELETE\s+FROM\b",
    r"\bTRUNCATE\b",
    r"\bALTER\s+TABLE\b",
    r"\bCREATE\s+USER\b",
    r"\bGRANT\b",
    r"\bREVOKE\b",
];

static DANGEROUS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DANGEROUS_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("blocklist regex"))
        .collect()
});

/// True iff `name` is safe to interpolate as a table or column name.
pub fn validate_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Return `name` unchanged if it is a valid identifier.
pub fn sanitize_identifier(name: &str) -> Result<&str, ValidationError> {
    if validate_identifier(name) {
        Ok(name)
    } else {
        Err(ValidationError::InvalidIdentifier(name.to_string()))
    }
}

/// True iff the upper-cased query matches none of the blocked patterns.
pub fn is_safe_query(query: &str) -> bool {
    let upper = query.to_uppercase();
    !DANGEROUS.iter().any(|re| re.is_match(&upper))
}

/// Check that `query` is a single read-only SELECT.
///
/// Applies, in order: the `SELECT` prefix rule, the keyword blocklist, and
/// a parse that must yield exactly one query statement with no `INTO`, no
/// row locks and no data-modifying CTE. The first two need no parser and
/// reject the common cases cheaply.
pub fn ensure_single_select(query: &str) -> Result<(), ValidationError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty("query"));
    }
    if !trimmed.to_uppercase().starts_with("SELECT") {
        return Err(ValidationError::NotSelect);
    }
    if !is_safe_query(trimmed) {
        return Err(ValidationError::UnsafeQuery);
    }

    let statements = Parser::parse_sql(&PostgreSqlDialect {}, trimmed)
        .map_err(|e| ValidationError::Unparsable(e.to_string()))?;

    match statements.as_slice() {
        [Statement::Query(query)] if is_read_only(query) => Ok(()),
        [Statement::Query(_)] => Err(ValidationError::NotReadOnly),
        _ => Err(ValidationError::NotSelect),
    }
}

fn is_read_only(query: &Query) -> bool {
    if !query.locks.is_empty() {
        return false;
    }
    let ctes_read_only = query
        .with
        .as_ref()
        .is_none_or(|with| with.cte_tables.iter().all(|cte| is_read_only(&cte.query)));
    if !ctes_read_only {
        return false;
    }
    body_is_read_only(&query.body)
}

fn body_is_read_only(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(select) => select.into.is_none(),
        SetExpr::Query(query) => is_read_only(query),
        SetExpr::SetOperation { left, right, .. } => {
            body_is_read_only(left) && body_is_read_only(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => true,
        _ => false,
    }
}
