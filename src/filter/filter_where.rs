use super::error::FilterError;
use super::types::{quote_column, SqlParam};

/// Accumulates search predicates; the result is their conjunction.
///
/// Placeholders are numbered as predicates are added, so the parameter list
/// always lines up with the generated SQL.
#[derive(Debug, Default)]
pub struct FilterWhere {
    conditions: Vec<String>,
    param_values: Vec<SqlParam>,
}

impl FilterWhere {
    pub fn new() -> Self {
        Self::default()
    }

    /// `column >= $n`
    pub fn gte(&mut self, column: &str, value: impl Into<SqlParam>) -> &mut Self {
        let placeholder = self.param(value.into());
        self.conditions.push(format!("{} >= {}", quote_column(column), placeholder));
        self
    }

    /// `column <= $n`
    pub fn lte(&mut self, column: &str, value: impl Into<SqlParam>) -> &mut Self {
        let placeholder = self.param(value.into());
        self.conditions.push(format!("{} <= {}", quote_column(column), placeholder));
        self
    }

    /// Case-insensitive substring match. LIKE wildcards in `text` match literally.
    pub fn contains(&mut self, column: &str, text: &str) -> &mut Self {
        let pattern = format!("%{}%", escape_like(text));
        let placeholder = self.param(SqlParam::from(pattern));
        self.conditions.push(format!("{} ILIKE {}", quote_column(column), placeholder));
        self
    }

    /// `column > 0` when `enabled`; a disabled flag never narrows the result.
    pub fn positive(&mut self, column: &str, enabled: bool) -> &mut Self {
        if enabled {
            self.conditions.push(format!("{} > 0", quote_column(column)));
        }
        self
    }

    /// Reject a lower bound above its upper bound before any SQL runs.
    pub fn validate_range(
        min_name: &'static str,
        min: Option<i32>,
        max_name: &'static str,
        max: Option<i32>,
    ) -> Result<(), FilterError> {
        match (min, max) {
            (Some(min), Some(max)) if min > max => {
                Err(FilterError::InvalidRange { min_name, min, max_name, max })
            }
            _ => Ok(()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// The predicate joined with AND (empty when nothing was added) and its params.
    pub fn generate(&self) -> (String, Vec<SqlParam>) {
        (self.conditions.join(" AND "), self.param_values.clone())
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        format!("${}", self.param_values.len())
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
