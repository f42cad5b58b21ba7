//! Document filter predicates
//!
//! A [`Filter`] is a conjunction of field conditions evaluated against a JSON document,
//! close to what a `$match` stage of a document database would accept.

use serde_json::Value;

/// Single field condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the given JSON value
    Eq(String, Value),
    /// Field is a number strictly greater than the bound
    Gt(String, f64),
}

impl Condition {
    /// Evaluate the condition against a document (pure function)
    ///
    /// Missing fields never match.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Condition::Eq(field, expected) => document.get(field) == Some(expected),
            Condition::Gt(field, bound) => document
                .get(field)
                .and_then(Value::as_f64)
                .is_some_and(|actual| actual > *bound),
        }
    }
}

/// Conjunction of conditions; an empty filter matches every document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Filter matching every document
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality condition
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    /// Add a strict numeric lower bound
    pub fn gt(mut self, field: &str, bound: f64) -> Self {
        self.conditions.push(Condition::Gt(field.to_string(), bound));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// True when the document satisfies every condition
    pub fn matches(&self, document: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(document))
    }
}
