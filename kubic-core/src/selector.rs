//! Structured label and field selectors and their wire grammar.
//!
//! Selectors are ordered conjunctions: requirements are serialized in the
//! order the caller supplied them, and duplicate keys are forwarded verbatim
//! rather than deduplicated, so the server sees exactly what was asked.
use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::Error;

/// One requirement on object labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expression {
    /// The label equals the value (`k=v`)
    Eq(String, String),
    /// The label differs from the value, or is absent (`k!=v`)
    NotEq(String, String),
    /// The label is one of the values (`k in (a,b)`)
    In(String, Vec<String>),
    /// The label is none of the values, or is absent (`k notin (a,b)`)
    NotIn(String, Vec<String>),
    /// The label key is present (`k`)
    Exists(String),
    /// The label key is absent (`!k`)
    DoesNotExist(String),
}

impl Expression {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Expression::Eq(key, value) => labels.get(key) == Some(value),
            Expression::NotEq(key, value) => labels.get(key) != Some(value),
            Expression::In(key, values) => match labels.get(key) {
                Some(v) => values.contains(v),
                None => false,
            },
            Expression::NotIn(key, values) => match labels.get(key) {
                Some(v) => !values.contains(v),
                None => true,
            },
            Expression::Exists(key) => labels.contains_key(key),
            Expression::DoesNotExist(key) => !labels.contains_key(key),
        }
    }

    fn validate(&self) -> Result<(), Error> {
        match self {
            Expression::Eq(key, value) | Expression::NotEq(key, value) => {
                check_value(key, value)?;
            }
            Expression::In(key, values) | Expression::NotIn(key, values) => {
                if values.is_empty() {
                    return Err(Error::InvalidRequest(format!(
                        "label selector on {key} requires at least one value"
                    )));
                }
                for value in values {
                    check_value(key, value)?;
                }
            }
            Expression::Exists(_) | Expression::DoesNotExist(_) => {}
        }
        Ok(())
    }
}

// Label values are validated before transport so a bad selector never
// reaches the apiserver.
fn check_value(key: &str, value: &str) -> Result<(), Error> {
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        Ok(())
    } else {
        Err(Error::InvalidRequest(format!(
            "label value {value:?} on {key} contains characters outside [A-Za-z0-9_.-]"
        )))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Eq(key, value) => write!(f, "{key}={value}"),
            Expression::NotEq(key, value) => write!(f, "{key}!={value}"),
            Expression::In(key, values) => write!(f, "{key} in ({})", values.join(",")),
            Expression::NotIn(key, values) => write!(f, "{key} notin ({})", values.join(",")),
            Expression::Exists(key) => write!(f, "{key}"),
            Expression::DoesNotExist(key) => write!(f, "!{key}"),
        }
    }
}

/// An ordered conjunction of label requirements.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector(Vec<Expression>);

impl LabelSelector {
    /// An empty selector, matching everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the selector has no requirements
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a requirement
    pub fn push(&mut self, expr: Expression) {
        self.0.push(expr);
    }

    /// Return the selector with an additional requirement
    #[must_use]
    pub fn and(mut self, expr: Expression) -> Self {
        self.push(expr);
        self
    }

    /// The requirements in caller order
    pub fn requirements(&self) -> &[Expression] {
        &self.0
    }

    /// Serialize to the query string grammar.
    ///
    /// Returns `None` for an empty selector so no query parameter is emitted.
    /// Requirements are validated on the way out.
    pub fn to_query(&self) -> Result<Option<String>, Error> {
        if self.0.is_empty() {
            return Ok(None);
        }
        for expr in &self.0 {
            expr.validate()?;
        }
        let parts: Vec<String> = self.0.iter().map(Expression::to_string).collect();
        Ok(Some(parts.join(",")))
    }

    /// Evaluate the selector against a label map.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0.iter().all(|e| e.matches(labels))
    }
}

impl From<Expression> for LabelSelector {
    fn from(expr: Expression) -> Self {
        LabelSelector(vec![expr])
    }
}

impl FromIterator<Expression> for LabelSelector {
    fn from_iter<T: IntoIterator<Item = Expression>>(iter: T) -> Self {
        LabelSelector(iter.into_iter().collect())
    }
}

impl FromIterator<(String, String)> for LabelSelector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        LabelSelector(iter.into_iter().map(|(k, v)| Expression::Eq(k, v)).collect())
    }
}

/// Failed to parse a selector string.
#[derive(Debug, Error)]
#[error("failed to parse selector: {0}")]
pub struct ParseSelectorError(pub String);

impl FromStr for LabelSelector {
    type Err = ParseSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut exprs = vec![];
        for req in split_requirements(s)? {
            let req = req.trim();
            if req.is_empty() {
                continue;
            }
            exprs.push(parse_requirement(req)?);
        }
        Ok(LabelSelector(exprs))
    }
}

// Splits on commas outside of `in (...)` value lists.
fn split_requirements(s: &str) -> Result<Vec<&str>, ParseSelectorError> {
    let mut parts = vec![];
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ParseSelectorError(s.to_string()))?
            }
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ParseSelectorError(s.to_string()));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

fn parse_requirement(req: &str) -> Result<Expression, ParseSelectorError> {
    if let Some((key, rest)) = req.split_once(" notin ") {
        return Ok(Expression::NotIn(key.trim().to_string(), parse_values(req, rest)?));
    }
    if let Some((key, rest)) = req.split_once(" in ") {
        return Ok(Expression::In(key.trim().to_string(), parse_values(req, rest)?));
    }
    if let Some((key, value)) = req.split_once("!=") {
        return Ok(Expression::NotEq(key.trim().to_string(), value.trim().to_string()));
    }
    if let Some((key, value)) = req.split_once('=') {
        let value = value.strip_prefix('=').unwrap_or(value); // tolerate k==v
        return Ok(Expression::Eq(key.trim().to_string(), value.trim().to_string()));
    }
    if let Some(key) = req.strip_prefix('!') {
        return Ok(Expression::DoesNotExist(key.trim().to_string()));
    }
    Ok(Expression::Exists(req.to_string()))
}

fn parse_values(req: &str, rest: &str) -> Result<Vec<String>, ParseSelectorError> {
    let inner = rest
        .trim()
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| ParseSelectorError(req.to_string()))?;
    Ok(inner
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}

/// One requirement on object fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldExpression {
    /// The field equals the value (`path=value`)
    Eq(String, String),
    /// The field differs from the value (`path!=value`)
    NotEq(String, String),
}

impl fmt::Display for FieldExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldExpression::Eq(path, value) => write!(f, "{path}={value}"),
            FieldExpression::NotEq(path, value) => write!(f, "{path}!={value}"),
        }
    }
}

/// An ordered conjunction of field requirements.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelector(Vec<FieldExpression>);

impl FieldSelector {
    /// An empty selector, matching everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the selector has no requirements
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a requirement
    pub fn push(&mut self, expr: FieldExpression) {
        self.0.push(expr);
    }

    /// Return the selector with an additional requirement
    #[must_use]
    pub fn and(mut self, expr: FieldExpression) -> Self {
        self.push(expr);
        self
    }

    /// Serialize to the query string grammar, `None` when empty.
    pub fn to_query(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        let parts: Vec<String> = self.0.iter().map(FieldExpression::to_string).collect();
        Some(parts.join(","))
    }
}

impl From<FieldExpression> for FieldSelector {
    fn from(expr: FieldExpression) -> Self {
        FieldSelector(vec![expr])
    }
}

impl FromIterator<FieldExpression> for FieldSelector {
    fn from_iter<T: IntoIterator<Item = FieldExpression>>(iter: T) -> Self {
        FieldSelector(iter.into_iter().collect())
    }
}
