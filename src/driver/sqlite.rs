use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, Statement, ToSql, params_from_iter};

use crate::driver::{Bindings, Driver, Row, Value};
use crate::engine::ColumnDescriptor;
use crate::error::{EngineError, EngineResult};

/// SQLite-backed driver for the table engine.
///
/// Wraps one connection behind a mutex so tables can share the driver
/// across threads. Statement-level atomicity is all this driver promises
/// for batches; the engine compiles a batch into one statement precisely
/// so that holds.
pub struct SqliteDriver {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDriver {
    /// Open an in-memory database. Each call gets a fresh, private one.
    pub fn open_in_memory() -> EngineResult<SqliteDriver> {
        let conn = Connection::open_in_memory()?;
        Ok(SqliteDriver {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create or open a database file.
    pub fn open(db_path: &Path) -> EngineResult<SqliteDriver> {
        let conn = Connection::open(db_path)?;

        // Configure for better performance and reliability
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        Ok(SqliteDriver {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn column_sql(table_name: &str, column: &ColumnDescriptor) -> EngineResult<(String, Vec<String>)> {
        //! Replay one column's recorded operations into a column clause
        //! plus any follow-up `CREATE INDEX` statements.
        //!
        //! Operations the builder recorded but this driver has no meaning
        //! for fail here, at application time.

        let name = column.name().unwrap_or_default();
        let mut ops = column.ops().iter();

        let type_op = ops.next().ok_or_else(|| EngineError::UnsupportedDdl {
            op: "<none>".to_string(),
            column: name.to_string(),
        })?;
        let sql_type = match type_op.op.as_str() {
            "string" | "text" => "TEXT",
            "integer" => "INTEGER",
            "float" => "REAL",
            "blob" => "BLOB",
            other => {
                return Err(EngineError::UnsupportedDdl {
                    op: other.to_string(),
                    column: name.to_string(),
                });
            }
        };

        let mut clause = format!("{} {}", name, sql_type);
        let mut indexes = Vec::new();
        for build_op in ops {
            match build_op.op.as_str() {
                "unique" => clause.push_str(" UNIQUE"),
                "primary" => clause.push_str(" PRIMARY KEY"),
                "not_null" => clause.push_str(" NOT NULL"),
                "default_to" => {
                    let literal = match build_op.args.first() {
                        Some(value) => sql_literal(value),
                        None => "NULL".to_string(),
                    };
                    clause.push_str(" DEFAULT ");
                    clause.push_str(&literal);
                }
                "index" => indexes.push(format!(
                    "CREATE INDEX idx_{}_{} ON {}({})",
                    table_name, name, table_name, name
                )),
                other => {
                    return Err(EngineError::UnsupportedDdl {
                        op: other.to_string(),
                        column: name.to_string(),
                    });
                }
            }
        }

        Ok((clause, indexes))
    }
}

impl Driver for SqliteDriver {
    fn apply_ddl(&self, table_name: &str, columns: &[ColumnDescriptor]) -> EngineResult<()> {
        let mut clauses = Vec::with_capacity(columns.len());
        let mut indexes = Vec::new();
        for column in columns {
            let (clause, mut column_indexes) = Self::column_sql(table_name, column)?;
            clauses.push(clause);
            indexes.append(&mut column_indexes);
        }

        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!("CREATE TABLE {} ({})", table_name, clauses.join(", ")),
            [],
        )?;
        for index_sql in indexes {
            conn.execute(&index_sql, [])?;
        }
        Ok(())
    }

    fn raw_exec(&self, statement: &str, bindings: Bindings) -> EngineResult<Vec<Row>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(statement)?;

        match bindings {
            Bindings::None => run_statement(&mut stmt, rusqlite::params![]),
            Bindings::Positional(values) => {
                let values: Vec<SqlValue> = values.iter().map(to_sql_value).collect();
                run_statement(&mut stmt, params_from_iter(values))
            }
            Bindings::Named(map) => {
                // bind only the names the statement actually uses; extra
                // entries are ignored
                let mut owned: Vec<(String, SqlValue)> = Vec::with_capacity(map.len());
                for (key, value) in &map {
                    let name = format!(":{}", key);
                    if stmt.parameter_index(&name)?.is_some() {
                        owned.push((name, to_sql_value(value)));
                    }
                }
                let params: Vec<(&str, &dyn ToSql)> = owned
                    .iter()
                    .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
                    .collect();
                run_statement(&mut stmt, params.as_slice())
            }
        }
    }
}

fn run_statement<P: rusqlite::Params>(stmt: &mut Statement<'_>, params: P) -> EngineResult<Vec<Row>> {
    // statements that produce no columns (inserts, ddl) are executed;
    // everything else is queried for rows
    if stmt.column_count() == 0 {
        stmt.execute(params)?;
        return Ok(Vec::new());
    }

    let names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut rows = stmt.query(params)?;
    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (index, name) in names.iter().enumerate() {
            record.insert(name.clone(), from_sql_ref(row.get_ref(index)?));
        }
        results.push(record);
    }
    Ok(results)
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(n) => SqlValue::Integer(*n),
        Value::Real(x) => SqlValue::Real(*x),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

fn from_sql_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Integer(n),
        ValueRef::Real(x) => Value::Real(x),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Real(x) => x.to_string(),
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Blob(_) => "NULL".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SchemaTable;

    fn _driver_with_foo() -> SqliteDriver {
        let driver = SqliteDriver::open_in_memory().unwrap();
        let columns = vec![
            SchemaTable::column().string("foo").unique(),
            SchemaTable::column().float("bar"),
        ];
        driver.apply_ddl("Foo", &columns).unwrap();
        driver
    }

    #[test]
    fn ddl_and_positional_roundtrip() {
        let driver = _driver_with_foo();
        driver
            .raw_exec(
                "insert into Foo (foo, bar) values (?, ?)",
                Bindings::Positional(vec![Value::from("abc"), Value::from(5.3)]),
            )
            .unwrap();

        let rows = driver
            .raw_exec("select * from Foo", Bindings::None)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("foo"), Some(&Value::from("abc")));
        assert_eq!(rows[0].get("bar"), Some(&Value::from(5.3)));
    }

    #[test]
    fn named_bindings_ignore_extra_entries() {
        let driver = _driver_with_foo();
        let mut map = indexmap::IndexMap::new();
        map.insert("foo".to_string(), Value::from("abc"));
        map.insert("unused".to_string(), Value::from("dropped"));
        map.insert("bar".to_string(), Value::from(1.0));
        driver
            .raw_exec(
                "insert into Foo (foo, bar) values ( :foo, :bar )",
                Bindings::Named(map),
            )
            .unwrap();

        let rows = driver
            .raw_exec("select * from Foo", Bindings::None)
            .unwrap();
        assert_eq!(rows[0].get("foo"), Some(&Value::from("abc")));
    }

    #[test]
    fn unknown_column_op_fails_at_application_time() {
        let driver = SqliteDriver::open_in_memory().unwrap();
        let columns = vec![
            SchemaTable::column()
                .string("foo")
                .op("method_does_not_exist", vec![]),
        ];
        let err = driver.apply_ddl("Foo", &columns).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedDdl { .. }));
    }

    #[test]
    fn duplicate_table_is_a_driver_error() {
        let driver = _driver_with_foo();
        let columns = vec![SchemaTable::column().string("foo")];
        let err = driver.apply_ddl("Foo", &columns).unwrap_err();
        assert!(matches!(err, EngineError::Driver(_)));
    }

    #[test]
    fn file_backed_database_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");

        {
            let driver = SqliteDriver::open(&db_path).unwrap();
            driver
                .apply_ddl("Foo", &[SchemaTable::column().string("foo")])
                .unwrap();
            driver
                .raw_exec(
                    "insert into Foo (foo) values (?)",
                    Bindings::Positional(vec![Value::from("kept")]),
                )
                .unwrap();
        }

        let reopened = SqliteDriver::open(&db_path).unwrap();
        let rows = reopened
            .raw_exec("select * from Foo", Bindings::None)
            .unwrap();
        assert_eq!(rows[0].get("foo"), Some(&Value::from("kept")));
    }
}
