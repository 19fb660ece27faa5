//! The driver boundary needs to provide the following to the engine
//! - DDL application (create a table from a recorded column plan)
//! - Raw statement execution with positional or named bindings
//!
//! Everything above this boundary is driver-agnostic; the engine compiles
//! templates and bindings and hands them over in one call.

//  All modules of this boundary
mod sqlite;

//  External API
pub use sqlite::SqliteDriver;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::engine::ColumnDescriptor;
use crate::error::EngineResult;

/// A scalar value travelling between the engine and the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// One result row, column name to value, in select order.
pub type Row = IndexMap<String, Value>;

/// Bindings accompanying a statement: none, positional (`?` markers),
/// or named (`:key` markers).
#[derive(Debug, Clone)]
pub enum Bindings {
    None,
    Positional(Vec<Value>),
    Named(IndexMap<String, Value>),
}

/// What the engine requires from a relational backend.
///
/// The driver owns parameter substitution and SQL execution; the engine
/// never interpolates values into statement text itself.
pub trait Driver: Send + Sync {
    /// Create a table from the recorded column plans, replaying each
    /// column's deferred operations in declaration order.
    fn apply_ddl(&self, table_name: &str, columns: &[ColumnDescriptor]) -> EngineResult<()>;

    /// Execute one final statement with its bindings and return the rows.
    fn raw_exec(&self, statement: &str, bindings: Bindings) -> EngineResult<Vec<Row>>;
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The textual form of this value, if it has one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Value {
        Value::Integer(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Real(x)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Value {
        Value::Blob(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Value {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
