use super::error::FilterError;
use super::types::{quote_column, SqlParam, SqlResult};

/// Builds the assignment list of a partial UPDATE.
///
/// Knows nothing about the target table: callers wrap the fragment in
/// `UPDATE <table> SET ... WHERE <pk> = <next placeholder>` and push the key
/// as the final parameter.
pub struct FilterSet;

impl FilterSet {
    /// Turn `(logical name, value)` pairs into `"col"=$1, "col"=$2, ...`.
    ///
    /// `column_names` maps logical names to storage columns where they differ;
    /// anything not listed is used verbatim. Positions follow the order of
    /// `fields`, starting at 1.
    pub fn generate(
        fields: &[(&str, SqlParam)],
        column_names: &[(&str, &str)],
    ) -> Result<SqlResult, FilterError> {
        if fields.is_empty() {
            return Err(FilterError::NoData);
        }

        let assignments: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, (name, _))| {
                let column = column_names
                    .iter()
                    .find(|(logical, _)| logical == name)
                    .map(|(_, column)| *column)
                    .unwrap_or(*name);
                format!("{}=${}", quote_column(column), i + 1)
            })
            .collect();

        let params = fields.iter().map(|(_, value)| value.clone()).collect();

        Ok(SqlResult { query: assignments.join(", "), params })
    }
}
