use std::mem;
use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;

use crate::driver::{Bindings, Driver, Row, Value};
use crate::engine::column::ColumnDescriptor;
use crate::engine::template::{
    QueryTemplate, SqlArg, TemplateComponent, compile_named, compile_positional, rebind_row,
};
use crate::engine::validate::{Predicate, Validators};
use crate::error::{EngineError, EngineResult};

/// A table declared through lazy column descriptors, queried through
/// sanitizing templates.
///
/// This is the smart class between application code and the driver: it
/// replays the deferred schema at `init()`, enforces per-column
/// validation on every write, and compiles batched calls into exactly
/// one driver round trip. The driver is the dumb end that substitutes
/// parameters and runs SQL.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use tabula_engine::driver::SqliteDriver;
/// # use tabula_engine::engine::SchemaTable;
/// # fn demo() -> tabula_engine::error::EngineResult<()> {
/// let driver = Arc::new(SqliteDriver::open_in_memory()?);
/// let mut foo = SchemaTable::new(
///     driver,
///     "foo",
///     vec![
///         SchemaTable::column().string("name").unique().primary(),
///         SchemaTable::column().integer("score"),
///     ],
/// );
/// foo.init()?;
/// # Ok(())
/// # }
/// ```
pub struct SchemaTable {
    driver: Arc<dyn Driver>,
    table_name: String,
    schema: Vec<ColumnDescriptor>,
    validators: Validators,
    initialized: bool,
}

impl std::fmt::Debug for SchemaTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaTable")
            .field("table_name", &self.table_name)
            .field("schema", &self.schema)
            .field("validators", &self.validators)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl SchemaTable {
    pub fn new(
        driver: Arc<dyn Driver>,
        table_name: &str,
        schema: Vec<ColumnDescriptor>,
    ) -> SchemaTable {
        SchemaTable {
            driver,
            table_name: table_name.to_string(),
            schema,
            validators: Validators::default(),
            initialized: false,
        }
    }

    /// Start a lazy column declaration. Shorthand for
    /// [`ColumnDescriptor::new`], so table declarations read in one
    /// vocabulary.
    pub fn column() -> ColumnDescriptor {
        ColumnDescriptor::new()
    }

    pub fn name(&self) -> &str {
        &self.table_name
    }

    pub fn validators(&self) -> &Validators {
        &self.validators
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn init(&mut self) -> EngineResult<&mut Self> {
        //! Write the deferred schema to the database and freeze the
        //! validator registry.
        //!
        //! Fails if a column never received a naming operation or if two
        //! columns resolve to the same name. Returns `self` so creation
        //! can chain. The engine does not forbid a second call; the
        //! driver will reject the duplicate table itself.

        let mut schema = mem::take(&mut self.schema);

        for column in &schema {
            let name = column.name().ok_or_else(|| EngineError::Schema {
                table: self.table_name.clone(),
                reason: "the column should have a name".to_string(),
            })?;
            if self.validators.contains(name) {
                return Err(EngineError::Schema {
                    table: self.table_name.clone(),
                    reason: format!("a validator for column '{}' already exists", name),
                });
            }
            self.validators.register(
                name.to_string(),
                Predicate::accept_all(), // replaced below if the column carries one
            );
        }

        self.driver.apply_ddl(&self.table_name, &schema)?;

        for column in &mut schema {
            if let Some(predicate) = column.take_validator() {
                if let Some(name) = column.name() {
                    self.validators.register(name.to_string(), predicate);
                }
            }
        }

        self.initialized = true;
        debug!("initialized table '{}'", self.table_name);
        Ok(self)
    }

    /// Run a compiled template as-is.
    pub fn exec_template(&self, template: QueryTemplate) -> EngineResult<Vec<Row>> {
        self.ensure_initialized()?;
        self.driver
            .raw_exec(&template.expression, Bindings::Positional(template.values))
    }

    /// Run a bare statement with no bindings.
    pub fn exec_raw(&self, statement: &str) -> EngineResult<Vec<Row>> {
        self.ensure_initialized()?;
        self.driver.raw_exec(statement, Bindings::None)
    }

    pub fn exec_batch_positional(
        &self,
        template: &[TemplateComponent],
        columns: Option<&[&str]>,
        rows: &[Vec<Value>],
    ) -> EngineResult<Vec<Row>> {
        //! Run a batch of positional rows as one statement.
        //!
        //! The template's repeat component is replicated once per row and
        //! all rows are flattened, in order, into one positional binding
        //! list. Supplying `columns` turns on per-position validation;
        //! the whole batch is validated before anything reaches the
        //! driver. An empty batch is a no-op.

        self.ensure_initialized()?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(columns) = columns {
            for row in rows {
                self.validators.validate_positional(columns, row)?;
            }
        }

        let expression = compile_positional(template, rows.len());
        let values: Vec<Value> = rows.iter().flatten().cloned().collect();
        debug!(
            "batch exec on '{}': {} rows, {} bindings",
            self.table_name,
            rows.len(),
            values.len()
        );
        self.driver.raw_exec(&expression, Bindings::Positional(values))
    }

    pub fn exec_batch_named(
        &self,
        template: &[TemplateComponent],
        rows: &[IndexMap<String, Value>],
    ) -> EngineResult<Vec<Row>> {
        //! Run a batch of named rows as one statement.
        //!
        //! Every row is validated against its own keys up front. Because
        //! named markers use fixed names, each repetition of the template
        //! is rewritten to carry a per-index binding name and each row's
        //! keys are rewritten to match, so rows never collide on a key.
        //! Extra keys not referenced by the statement are ignored. An
        //! empty batch is a no-op.

        self.ensure_initialized()?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        for row in rows {
            self.validators.validate_named(row)?;
        }

        let expression = compile_named(template, rows.len());
        let mut bindings = IndexMap::new();
        for (index, row) in rows.iter().enumerate() {
            bindings.extend(rebind_row(row, index));
        }
        debug!(
            "batch exec on '{}': {} rows, {} named bindings",
            self.table_name,
            rows.len(),
            bindings.len()
        );
        self.driver.raw_exec(&expression, Bindings::Named(bindings))
    }

    pub fn sql(&self, fragments: &[&str], args: Vec<SqlArg>) -> EngineResult<QueryTemplate> {
        //! Build a sanitized template from alternating literal fragments
        //! and bound values, the structured stand-in for a tagged
        //! template string.
        //!
        //! Fragments are joined with positional placeholders. A
        //! [`SqlArg::Checked`] slot is validated against its named column
        //! before substitution and must hold exactly one column-value
        //! pair; bare values pass through untouched.

        let expression = fragments.join("?");
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                SqlArg::Bare(value) => values.push(value),
                SqlArg::Checked(pairs) => match pairs.as_slice() {
                    [(column, value)] => {
                        self.validators.validate(column, value)?;
                        values.push(value.clone());
                    }
                    _ => {
                        return Err(EngineError::TemplateSyntax {
                            reason: format!(
                                "got a checked binding with {} columns, expected one",
                                pairs.len()
                            ),
                        });
                    }
                },
            }
        }
        Ok(QueryTemplate { expression, values })
    }

    /// Shorthand for `exec_template(sql(...))`.
    pub fn exec_sql(&self, fragments: &[&str], args: Vec<SqlArg>) -> EngineResult<Vec<Row>> {
        let template = self.sql(fragments, args)?;
        self.exec_template(template)
    }

    fn ensure_initialized(&self) -> EngineResult<()> {
        if !self.initialized {
            return Err(EngineError::TableNotInitialized {
                table: self.table_name.clone(),
            });
        }
        Ok(())
    }
}
