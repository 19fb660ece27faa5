use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::driver::Value;

/// A compiled statement: final SQL text plus its positional bindings,
/// ready to hand to the driver in one call.
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    pub expression: String,
    pub values: Vec<Value>,
}

/// One piece of a batchable statement template.
///
/// `Literal` text is emitted once. A `Repeat` component is replicated once
/// per batch row and joined by `sep`, with the trailing separator trimmed:
///
/// ```text
/// insert into foo (a, b) values   <- Literal
/// ( :a, :b )                      <- Repeat, sep ","
/// ```
#[derive(Debug, Clone)]
pub enum TemplateComponent {
    Literal(String),
    Repeat { code: String, sep: String },
}

impl TemplateComponent {
    pub fn literal(text: &str) -> TemplateComponent {
        TemplateComponent::Literal(text.to_string())
    }

    pub fn repeat(code: &str, sep: &str) -> TemplateComponent {
        TemplateComponent::Repeat {
            code: code.to_string(),
            sep: sep.to_string(),
        }
    }
}

/// One bound slot in a `sql()` call.
///
/// `Bare` values pass through unvalidated. A `Checked` slot names the
/// column its value must be validated against before substitution; it
/// must hold exactly one column-value pair.
#[derive(Debug, Clone)]
pub enum SqlArg {
    Bare(Value),
    Checked(Vec<(String, Value)>),
}

impl SqlArg {
    pub fn checked(column: &str, value: impl Into<Value>) -> SqlArg {
        SqlArg::Checked(vec![(column.to_string(), value.into())])
    }
}

impl From<Value> for SqlArg {
    fn from(value: Value) -> SqlArg {
        SqlArg::Bare(value)
    }
}

impl From<&str> for SqlArg {
    fn from(value: &str) -> SqlArg {
        SqlArg::Bare(Value::from(value))
    }
}

impl From<String> for SqlArg {
    fn from(value: String) -> SqlArg {
        SqlArg::Bare(Value::from(value))
    }
}

impl From<i64> for SqlArg {
    fn from(value: i64) -> SqlArg {
        SqlArg::Bare(Value::from(value))
    }
}

impl From<i32> for SqlArg {
    fn from(value: i32) -> SqlArg {
        SqlArg::Bare(Value::from(value))
    }
}

impl From<f64> for SqlArg {
    fn from(value: f64) -> SqlArg {
        SqlArg::Bare(Value::from(value))
    }
}

// Matches a `:key` marker preceded by whitespace. Derived from the regex
// knex uses for its keyed bindings; the optional trailing colon covers its
// `:key:` identifier form.
fn binding_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"(\s):(\w+:?)").unwrap())
}

pub(crate) fn rebind_expression(code: &str, index: usize) -> String {
    //! Rewrite every named marker in `code` to a name unique to this
    //! repetition index, so a repeated component never binds two rows to
    //! the same key.

    binding_marker()
        .replace_all(code, |caps: &regex::Captures<'_>| {
            format!("{}:__bind_{}_{}", &caps[1], index, &caps[2])
        })
        .into_owned()
}

pub(crate) fn rebind_row(row: &IndexMap<String, Value>, index: usize) -> IndexMap<String, Value> {
    //! The key-side counterpart of [`rebind_expression`]: produce a row
    //! whose keys carry the same per-repetition suffix.

    row.iter()
        .map(|(key, value)| (format!("__bind_{}_{}", index, key), value.clone()))
        .collect()
}

pub(crate) fn compile_positional(template: &[TemplateComponent], len: usize) -> String {
    //! Compile a template for a positional batch of `len` rows: literals
    //! pass through untouched, repeat components are replicated and
    //! joined.

    let mut result = String::new();
    for component in template {
        match component {
            TemplateComponent::Literal(text) => result.push_str(text),
            TemplateComponent::Repeat { code, sep } => {
                for _ in 0..len {
                    result.push_str(code);
                    result.push_str(sep);
                }
                if len > 0 && !sep.is_empty() {
                    result.truncate(result.len() - sep.len());
                }
            }
        }
    }
    result
}

pub(crate) fn compile_named(template: &[TemplateComponent], len: usize) -> String {
    //! Compile a template for a named batch. Repeat components get one
    //! rewritten copy per row; markers in literal parts are rewritten
    //! with index 0, so they resolve against the first row's bindings.

    let mut result = String::new();
    for component in template {
        match component {
            TemplateComponent::Literal(text) => result.push_str(&rebind_expression(text, 0)),
            TemplateComponent::Repeat { code, sep } => {
                for index in 0..len {
                    result.push_str(&rebind_expression(code, index));
                    result.push_str(sep);
                }
                if len > 0 && !sep.is_empty() {
                    result.truncate(result.len() - sep.len());
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebind_suffixes_markers_by_index() {
        assert_eq!(
            rebind_expression("( :foo, :bar )", 2),
            "( :__bind_2_foo, :__bind_2_bar )"
        );
    }

    #[test]
    fn rebind_requires_leading_whitespace() {
        // a colon glued to an identifier is not a binding marker
        assert_eq!(rebind_expression("a:b", 0), "a:b");
    }

    #[test]
    fn rebind_row_mirrors_expression_rewrite() {
        let mut row = IndexMap::new();
        row.insert("foo".to_string(), Value::from(1));
        let rebound = rebind_row(&row, 3);
        assert_eq!(rebound.get("__bind_3_foo"), Some(&Value::from(1)));
    }

    #[test]
    fn positional_compilation_replicates_and_trims() {
        let template = [
            TemplateComponent::literal("insert into foo (a, b) values "),
            TemplateComponent::repeat("(?, ?)", ", "),
        ];
        assert_eq!(
            compile_positional(&template, 3),
            "insert into foo (a, b) values (?, ?), (?, ?), (?, ?)"
        );
        assert_eq!(
            compile_positional(&template, 1),
            "insert into foo (a, b) values (?, ?)"
        );
    }

    #[test]
    fn named_compilation_disambiguates_repetitions() {
        let template = [
            TemplateComponent::literal("insert into foo (a) values "),
            TemplateComponent::repeat("( :a )", ","),
        ];
        assert_eq!(
            compile_named(&template, 2),
            "insert into foo (a) values ( :__bind_0_a ),( :__bind_1_a )"
        );
    }
}
