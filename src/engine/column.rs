use crate::driver::Value;
use crate::engine::validate::Predicate;

/// One deferred builder operation: a method name and the arguments it was
/// called with, replayed verbatim against the driver's DDL builder.
#[derive(Debug, Clone)]
pub struct BuildOp {
    pub op: String,
    pub args: Vec<Value>,
}

/// A lazily-defined column.
///
/// Nothing here touches the driver. Every fluent call is recorded as a
/// [`BuildOp`] and replayed in order during `init()`, so a descriptor can
/// be built standalone (in tests, for example) with no database present.
///
/// The first recorded operation resolves the column's name (its first
/// textual argument) and type (the operation name); both are immutable
/// afterwards. A descriptor whose first operation carries no name is only
/// rejected later, at `init()` time.
#[derive(Debug, Clone, Default)]
pub struct ColumnDescriptor {
    name: Option<String>,
    column_type: Option<String>,
    ops: Vec<BuildOp>,
    validator: Option<Predicate>,
}

impl ColumnDescriptor {
    pub fn new() -> ColumnDescriptor {
        ColumnDescriptor::default()
    }

    /// Record an arbitrary builder operation.
    ///
    /// The vocabulary is open-ended on purpose: operations the driver does
    /// not understand are still recorded here and fail later, when they
    /// are replayed at DDL-application time.
    pub fn op(mut self, op: &str, args: Vec<Value>) -> Self {
        if self.name.is_none() && self.ops.is_empty() {
            if let Some(Value::Text(first)) = args.first() {
                self.name = Some(first.clone());
            }
            self.column_type = Some(op.to_string());
        }
        self.ops.push(BuildOp {
            op: op.to_string(),
            args,
        });
        self
    }

    pub fn string(self, name: &str) -> Self {
        self.op("string", vec![Value::from(name)])
    }

    pub fn text(self, name: &str) -> Self {
        self.op("text", vec![Value::from(name)])
    }

    pub fn integer(self, name: &str) -> Self {
        self.op("integer", vec![Value::from(name)])
    }

    pub fn float(self, name: &str) -> Self {
        self.op("float", vec![Value::from(name)])
    }

    pub fn blob(self, name: &str) -> Self {
        self.op("blob", vec![Value::from(name)])
    }

    pub fn unique(self) -> Self {
        self.op("unique", vec![])
    }

    pub fn primary(self) -> Self {
        self.op("primary", vec![])
    }

    pub fn index(self) -> Self {
        self.op("index", vec![])
    }

    pub fn not_null(self) -> Self {
        self.op("not_null", vec![])
    }

    pub fn default_to(self, value: impl Into<Value>) -> Self {
        self.op("default_to", vec![value.into()])
    }

    /// Attach a validation predicate. Does not count as a naming
    /// operation and is not replayed against the DDL builder.
    pub fn validator(mut self, predicate: Predicate) -> Self {
        self.validator = Some(predicate);
        self
    }

    /// The column name resolved from the first recorded operation.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The column type resolved from the first recorded operation.
    pub fn column_type(&self) -> Option<&str> {
        self.column_type.as_deref()
    }

    pub fn ops(&self) -> &[BuildOp] {
        &self.ops
    }

    pub(crate) fn take_validator(&mut self) -> Option<Predicate> {
        self.validator.take()
    }
}
