use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::driver::{Driver, Row, Value};
use crate::engine::{Predicate, SchemaTable, SqlArg, TemplateComponent};
use crate::error::{EngineError, EngineResult};
use crate::tables::validators;

/// One stored comment record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Comment {
    pub name: String,
    pub parent_comment_name: Option<String>,
    pub article_name: String,
    pub body: String,
    pub body_index: String,
    pub score: Option<i64>,
    pub json: Option<serde_json::Value>,
}

/// Comment storage: a record table with typed-name validated columns and
/// upsert-style batched writes.
pub struct CommentTable {
    table: SchemaTable,
}

impl Comment {
    fn to_row(&self) -> IndexMap<String, Value> {
        IndexMap::from([
            ("name".to_string(), Value::from(self.name.clone())),
            (
                "parent_comment_name".to_string(),
                Value::from(self.parent_comment_name.clone()),
            ),
            (
                "article_name".to_string(),
                Value::from(self.article_name.clone()),
            ),
            ("body".to_string(), Value::from(self.body.clone())),
            (
                "body_index".to_string(),
                Value::from(self.body_index.clone()),
            ),
            ("score".to_string(), Value::from(self.score)),
            (
                "json".to_string(),
                match &self.json {
                    Some(json) => Value::from(json.to_string()),
                    None => Value::Null,
                },
            ),
        ])
    }

    fn from_row(row: &Row) -> EngineResult<Comment> {
        let text = |column: &str| {
            row.get(column)
                .and_then(Value::as_text)
                .map(str::to_string)
                .ok_or_else(|| EngineError::Validation {
                    column: column.to_string(),
                    reason: "missing from result row".to_string(),
                })
        };

        let json = match row.get("json").and_then(Value::as_text) {
            Some(raw) => {
                Some(
                    serde_json::from_str(raw).map_err(|err| EngineError::Validation {
                        column: "json".to_string(),
                        reason: format!("stored value is not valid JSON: {}", err),
                    })?,
                )
            }
            None => None,
        };

        Ok(Comment {
            name: text("name")?,
            parent_comment_name: row
                .get("parent_comment_name")
                .and_then(Value::as_text)
                .map(str::to_string),
            article_name: text("article_name")?,
            body: text("body")?,
            body_index: text("body_index")?,
            score: row.get("score").and_then(Value::as_integer),
            json,
        })
    }
}

impl CommentTable {
    pub fn new(driver: Arc<dyn Driver>) -> EngineResult<CommentTable> {
        let table = SchemaTable::new(
            driver,
            "comment",
            vec![
                SchemaTable::column()
                    .string("name")
                    .unique()
                    .primary()
                    .index()
                    .validator(validators::comment_name()?),
                SchemaTable::column()
                    .string("parent_comment_name")
                    .index()
                    .validator(validators::comment_name()?.or(Predicate::null())),
                SchemaTable::column()
                    .string("article_name")
                    .validator(validators::article_name()?),
                SchemaTable::column().text("body"),
                SchemaTable::column().text("body_index").index(),
                SchemaTable::column().integer("score").index(),
                SchemaTable::column()
                    .text("json")
                    .validator(Predicate::json().or(Predicate::null())),
            ],
        );
        Ok(CommentTable { table })
    }

    pub fn init(&mut self) -> EngineResult<&mut Self> {
        self.table.init()?;
        Ok(self)
    }

    pub fn table(&self) -> &SchemaTable {
        &self.table
    }

    pub fn get(&self, name: &str) -> EngineResult<Option<Comment>> {
        let rows = self.table.exec_sql(
            &["select * from comment where name=", ""],
            vec![SqlArg::checked("name", name)],
        )?;
        rows.first().map(Comment::from_row).transpose()
    }

    pub fn set(&self, comments: &[Comment]) -> EngineResult<()> {
        //! Upsert every comment in one round trip. The whole batch is
        //! validated before anything is written.

        let rows: Vec<IndexMap<String, Value>> =
            comments.iter().map(Comment::to_row).collect();
        let template = [
            TemplateComponent::literal("insert or replace into comment values "),
            TemplateComponent::repeat(
                "( :name, :parent_comment_name, :article_name, :body, :body_index, :score, :json )",
                ",",
            ),
        ];
        self.table.exec_batch_named(&template, &rows)?;
        Ok(())
    }

    /// All comments, ordered by name.
    pub fn scan(&self) -> EngineResult<Vec<Comment>> {
        let rows = self.table.exec_raw("select * from comment order by name")?;
        rows.iter().map(Comment::from_row).collect()
    }

    /// Comments whose body index matches, best scores first.
    pub fn search(&self, body_index: &str, limit: i64) -> EngineResult<Vec<Comment>> {
        let rows = self.table.exec_sql(
            &[
                "select * from comment where body_index=",
                " order by score desc limit ",
                "",
            ],
            vec![SqlArg::checked("body_index", body_index), SqlArg::from(limit)],
        )?;
        rows.iter().map(Comment::from_row).collect()
    }

    pub fn transform<F>(&self, transformer: F, chunk_len: usize) -> EngineResult<usize>
    where
        F: Fn(Comment) -> Comment,
    {
        //! Rewrite the whole table through `transformer`, one page at a
        //! time, upserting each page before fetching the next.
        //!
        //! The transformer must not change a record's primary name; a
        //! rename would insert a new row instead of replacing the old
        //! one. Returns the number of rewritten records.

        let mut offset: usize = 0;
        let mut total = 0;
        loop {
            let rows = self.table.exec_sql(
                &["select * from comment order by name limit ", " offset ", ""],
                vec![
                    SqlArg::from(chunk_len as i64),
                    SqlArg::from(offset as i64),
                ],
            )?;
            if rows.is_empty() {
                break;
            }

            let chunk: Vec<Comment> = rows
                .iter()
                .map(Comment::from_row)
                .collect::<EngineResult<_>>()?;
            let short_page = chunk.len() < chunk_len;

            let mut updated = Vec::with_capacity(chunk.len());
            for original in chunk {
                let name = original.name.clone();
                let result = transformer(original);
                if result.name != name {
                    return Err(EngineError::Validation {
                        column: "name".to_string(),
                        reason: "transform must not change the primary name".to_string(),
                    });
                }
                updated.push(result);
            }
            total += updated.len();
            self.set(&updated)?;

            if short_page {
                break;
            }
            offset += chunk_len;
        }
        Ok(total)
    }
}
