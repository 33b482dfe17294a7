//! The dual closure/expression predicate form (spec §9 redesign note).

use std::fmt;
use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A pure predicate over the scope `{variables, nodeOutputs, inputData}`
/// assembled by the engine for `condition` and `trigger/await`-filter
/// dispatch.
pub type PredicateFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Either a runtime-only closure or a serializable expression string.
///
/// Only the expression form survives a round trip through persisted
/// workflow definitions — the engine always prefers the closure when one
/// is present in memory (spec §6.4, §9).
#[derive(Clone)]
pub enum ConditionPredicate {
    /// Evaluated through the sandboxed expression language (spec §6.5).
    Expression(String),
    /// A native closure, only ever constructed in-process.
    Closure(PredicateFn),
}

impl ConditionPredicate {
    /// Build the expression form.
    #[must_use]
    pub fn expression(source: impl Into<String>) -> Self {
        Self::Expression(source.into())
    }

    /// Build the closure form.
    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::Closure(Arc::new(f))
    }

    /// The expression source, if this is the expression form.
    #[must_use]
    pub fn as_expression(&self) -> Option<&str> {
        match self {
            Self::Expression(source) => Some(source),
            Self::Closure(_) => None,
        }
    }
}

impl fmt::Debug for ConditionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expression(source) => f.debug_tuple("Expression").field(source).finish(),
            Self::Closure(_) => f.write_str("Closure(..)"),
        }
    }
}

impl Serialize for ConditionPredicate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Expression(source) => serializer.serialize_str(source),
            Self::Closure(_) => Err(serde::ser::Error::custom(
                "a closure-form predicate cannot be serialized; persist the expression form",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for ConditionPredicate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let source = String::deserialize(deserializer)?;
        if source.is_empty() {
            return Err(D::Error::custom("predicate expression must not be empty"));
        }
        Ok(Self::Expression(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expression_round_trips_through_json() {
        let predicate = ConditionPredicate::expression("vars.tier === \"premium\"");
        let json = serde_json::to_string(&predicate).unwrap();
        let back: ConditionPredicate = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_expression(), Some("vars.tier === \"premium\""));
    }

    #[test]
    fn closure_form_cannot_be_serialized() {
        let predicate = ConditionPredicate::closure(|v| v["tier"] == "premium");
        assert!(serde_json::to_string(&predicate).is_err());
    }
}
