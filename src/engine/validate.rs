use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;

use crate::driver::Value;
use crate::error::{EngineError, EngineResult};

/// A composable column validation predicate.
///
/// Predicates are plain `value -> bool` checks. Richer rules are built by
/// combining them: `Predicate::matches("...")?.or(Predicate::null())`.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl Predicate {
    pub fn new<F>(f: F) -> Predicate
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Predicate(Arc::new(f))
    }

    /// The default validator: accepts everything.
    pub fn accept_all() -> Predicate {
        Predicate::new(|_| true)
    }

    /// Accepts only SQL null.
    pub fn null() -> Predicate {
        Predicate::new(|value| value.is_null())
    }

    /// Accepts values whose textual form matches the pattern.
    ///
    /// Non-textual values are rendered through their display form first,
    /// so `matches("[0-9]+")` accepts both `Value::Text("42")` and
    /// `Value::Integer(42)`. Null and blobs never match.
    pub fn matches(pattern: &str) -> EngineResult<Predicate> {
        let re = Regex::new(pattern).map_err(|err| EngineError::TemplateSyntax {
            reason: format!("invalid validator pattern '{}': {}", pattern, err),
        })?;
        Ok(Predicate::new(move |value| match value {
            Value::Text(s) => re.is_match(s),
            Value::Integer(n) => re.is_match(&n.to_string()),
            Value::Real(x) => re.is_match(&x.to_string()),
            _ => false,
        }))
    }

    /// Accepts text that parses as JSON.
    pub fn json() -> Predicate {
        Predicate::new(|value| match value {
            Value::Text(s) => serde_json::from_str::<serde_json::Value>(s).is_ok(),
            _ => false,
        })
    }

    pub fn test(&self, value: &Value) -> bool {
        (self.0)(value)
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::new(move |value| self.test(value) || other.test(value))
    }

    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::new(move |value| self.test(value) && other.test(value))
    }

    pub fn not(self) -> Predicate {
        Predicate::new(move |value| !self.test(value))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate")
    }
}

/// The per-table validator registry, frozen at `init()` time.
///
/// Ordered by column declaration, one predicate per column. Looking up an
/// unknown column is an error rather than a pass; that is what catches
/// typos in bulk insert calls.
#[derive(Debug, Default)]
pub struct Validators {
    registry: IndexMap<String, Predicate>,
}

impl Validators {
    pub fn contains(&self, column: &str) -> bool {
        self.registry.contains_key(column)
    }

    pub(crate) fn register(&mut self, column: String, predicate: Predicate) {
        self.registry.insert(column, predicate);
    }

    pub fn validate(&self, column: &str, value: &Value) -> EngineResult<()> {
        //! Check one value against one column's predicate.
        //!
        //! Fails if the column has no registry entry, or if the entry's
        //! predicate rejects the value.

        let predicate = self
            .registry
            .get(column)
            .ok_or_else(|| EngineError::Validation {
                column: column.to_string(),
                reason: "column doesn't exist".to_string(),
            })?;

        if !predicate.test(value) {
            return Err(EngineError::Validation {
                column: column.to_string(),
                reason: format!("value {:?} rejected by validator", value),
            });
        }

        Ok(())
    }

    pub fn validate_named(&self, row: &IndexMap<String, Value>) -> EngineResult<()> {
        //! Validate every key-value pair of a named row; keys are column
        //! names.

        for (column, value) in row {
            self.validate(column, value)?;
        }
        Ok(())
    }

    pub fn validate_positional(&self, columns: &[&str], values: &[Value]) -> EngineResult<()> {
        //! Validate a positional row against an explicit column list.

        if columns.len() != values.len() {
            return Err(EngineError::TemplateSyntax {
                reason: format!(
                    "value-column length mismatch: {} columns, {} values",
                    columns.len(),
                    values.len()
                ),
            });
        }
        for (column, value) in columns.iter().zip(values) {
            self.validate(column, value)?;
        }
        Ok(())
    }
}
