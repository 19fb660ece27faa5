//! The table engine needs to have the following components
//! - ColumnDescriptor (lazy, fluent column declarations, replayed at init)
//! - Predicate / Validators (per-column write validation, composable)
//! - Query templates (sanitized statements, single-row and batched)
//! - SchemaTable (the orchestrator owning one physical table)
//!

//  All modules of this lib
mod column;
mod table;
mod template;
mod validate;

//  External API
pub use column::{BuildOp, ColumnDescriptor};
pub use table::SchemaTable;
pub use template::{QueryTemplate, SqlArg, TemplateComponent};
pub use validate::{Predicate, Validators};
