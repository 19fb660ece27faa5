use std::sync::Arc;

use indexmap::IndexMap;

use crate::driver::{Driver, Value};
use crate::engine::{SchemaTable, SqlArg, TemplateComponent};
use crate::error::EngineResult;

/// A very simple key-value table for storing information about the
/// database itself.
pub struct MetadataTable {
    table: SchemaTable,
}

impl MetadataTable {
    pub fn new(driver: Arc<dyn Driver>) -> MetadataTable {
        let table = SchemaTable::new(
            driver,
            "metadata",
            vec![
                SchemaTable::column().string("key").unique().primary().index(),
                SchemaTable::column().string("value"),
            ],
        );
        MetadataTable { table }
    }

    pub fn init(&mut self) -> EngineResult<&mut Self> {
        self.table.init()?;
        Ok(self)
    }

    pub fn table(&self) -> &SchemaTable {
        &self.table
    }

    pub fn get(&self, key: &str) -> EngineResult<Option<String>> {
        let rows = self.table.exec_sql(
            &["select value from metadata where key=", ""],
            vec![SqlArg::checked("key", key)],
        )?;
        Ok(rows
            .first()
            .and_then(|row| row.get("value"))
            .and_then(Value::as_text)
            .map(str::to_string))
    }

    pub fn set(&self, entries: &[(&str, &str)]) -> EngineResult<()> {
        //! Upsert every entry in one round trip.

        let rows: Vec<IndexMap<String, Value>> = entries
            .iter()
            .map(|(key, value)| {
                IndexMap::from([
                    ("key".to_string(), Value::from(*key)),
                    ("value".to_string(), Value::from(*value)),
                ])
            })
            .collect();
        let template = [
            TemplateComponent::literal("insert or replace into metadata (key, value) values "),
            TemplateComponent::repeat("( :key, :value )", ","),
        ];
        self.table.exec_batch_named(&template, &rows)?;
        Ok(())
    }
}
