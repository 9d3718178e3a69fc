use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::{Validate, ValidateUrl, ValidationError};

use super::job::JobSummary;
use super::{double_option, field_error, validate_handle, validate_required_text};
use crate::database::manager::{is_unique_violation, DatabaseError};
use crate::database::query_builder::QueryBuilder;
use crate::database::repository::Repository;
use crate::filter::{Filter, FilterError, FilterOrderInfo, FilterSet, FilterWhere, SqlParam};

/// Logical (JSON) field names whose storage column differs.
pub const COMPANY_COLUMNS: &[(&str, &str)] = &[
    ("numEmployees", "num_employees"),
    ("logoUrl", "logo_url"),
];

const SELECT_COLUMNS: &str = "handle, name, description, num_employees, logo_url";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub handle: String,
    pub name: String,
    pub description: String,
    pub num_employees: Option<i32>,
    pub logo_url: Option<String>,
}

/// A company with the jobs it currently offers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub company: Company,
    pub jobs: Vec<JobSummary>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCompany {
    #[validate(length(min = 1, max = 25), custom(function = "validate_handle"))]
    pub handle: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub description: String,
    #[validate(range(min = 0))]
    pub num_employees: Option<i32>,
    #[validate(url)]
    pub logo_url: Option<String>,
}

/// Partial update. `handle` is not a field, so sending it is rejected.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "validate_company_patch"))]
pub struct CompanyPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub num_employees: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub logo_url: Option<Option<String>>,
}

fn validate_company_patch(patch: &CompanyPatch) -> Result<(), ValidationError> {
    validate_required_text("name", &patch.name, 1, None)?;
    validate_required_text("description", &patch.description, 0, None)?;
    if let Some(Some(n)) = patch.num_employees {
        if n < 0 {
            return Err(field_error("range", "numEmployees", "numEmployees must not be negative".to_string()));
        }
    }
    if let Some(Some(url)) = &patch.logo_url {
        if !url.validate_url() {
            return Err(field_error("url", "logoUrl", "logoUrl must be a URL".to_string()));
        }
    }
    Ok(())
}

impl CompanyPatch {
    /// The present fields, keyed by their JSON names.
    pub fn into_fields(self) -> Vec<(&'static str, SqlParam)> {
        let mut fields = Vec::new();
        if let Some(name) = self.name {
            fields.push(("name", name.into()));
        }
        if let Some(description) = self.description {
            fields.push(("description", description.into()));
        }
        if let Some(num_employees) = self.num_employees {
            fields.push(("numEmployees", num_employees.into()));
        }
        if let Some(logo_url) = self.logo_url {
            fields.push(("logoUrl", logo_url.into()));
        }
        fields
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompanySearch {
    #[validate(length(min = 1))]
    pub name_like: Option<String>,
    #[validate(range(min = 0))]
    pub min_employees: Option<i32>,
    #[validate(range(min = 0))]
    pub max_employees: Option<i32>,
}

impl CompanySearch {
    /// Companies ordered by name, narrowed by whichever filters are set.
    pub fn to_filter(&self) -> Result<Filter, FilterError> {
        FilterWhere::validate_range(
            "minEmployees",
            self.min_employees,
            "maxEmployees",
            self.max_employees,
        )?;

        let mut conditions = FilterWhere::new();
        if let Some(min) = self.min_employees {
            conditions.gte("num_employees", min);
        }
        if let Some(max) = self.max_employees {
            conditions.lte("num_employees", max);
        }
        if let Some(name) = &self.name_like {
            conditions.contains("name", name);
        }

        Ok(Filter::new("companies", SELECT_COLUMNS)
            .where_clause(conditions)
            .order(vec![FilterOrderInfo::asc("name")]))
    }
}

#[derive(Clone)]
pub struct CompanyRepository {
    pool: PgPool,
}

impl CompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn duplicate_error(err: sqlx::Error, handle: &str, name: Option<&str>) -> DatabaseError {
        if !is_unique_violation(&err) {
            return err.into();
        }
        let constraint = err.as_database_error().and_then(|e| e.constraint());
        match (constraint, name) {
            (Some("companies_name_key"), Some(name)) => {
                DatabaseError::BadRequest(format!("Duplicate company name: {}", name))
            }
            _ => DatabaseError::BadRequest(format!("Duplicate company: {}", handle)),
        }
    }
}

#[async_trait]
impl Repository for CompanyRepository {
    type Key = String;
    type New = NewCompany;
    type Patch = CompanyPatch;
    type Search = CompanySearch;
    type Summary = Company;
    type Record = Company;
    type Detail = CompanyDetail;

    async fn create(&self, data: NewCompany) -> Result<Company, DatabaseError> {
        let existing = sqlx::query_scalar::<_, String>("SELECT handle FROM companies WHERE handle = $1")
            .bind(&data.handle)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(DatabaseError::BadRequest(format!("Duplicate company: {}", data.handle)));
        }

        sqlx::query_as::<_, Company>(
            "INSERT INTO companies (handle, name, description, num_employees, logo_url)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING handle, name, description, num_employees, logo_url",
        )
        .bind(&data.handle)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.num_employees)
        .bind(&data.logo_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::duplicate_error(e, &data.handle, Some(&data.name)))
    }

    async fn find_all(&self, search: CompanySearch) -> Result<Vec<Company>, DatabaseError> {
        let filter = search.to_filter()?;
        QueryBuilder::<Company>::new(filter.to_sql())
            .select_all(&self.pool)
            .await
    }

    async fn get(&self, handle: &String) -> Result<CompanyDetail, DatabaseError> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT handle, name, description, num_employees, logo_url
             FROM companies
             WHERE handle = $1",
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("No company: {}", handle)))?;

        let jobs = sqlx::query_as::<_, JobSummary>(
            "SELECT id, title, salary, equity
             FROM jobs
             WHERE company_handle = $1
             ORDER BY id",
        )
        .bind(handle)
        .fetch_all(&self.pool)
        .await?;

        Ok(CompanyDetail { company, jobs })
    }

    async fn update(&self, handle: &String, patch: CompanyPatch) -> Result<Company, DatabaseError> {
        let new_name = patch.name.clone();
        let fields = patch.into_fields();
        let mut sql = FilterSet::generate(&fields, COMPANY_COLUMNS)?;

        sql.query = format!(
            "UPDATE companies SET {} WHERE handle = {} RETURNING {}",
            sql.query,
            sql.next_placeholder(),
            SELECT_COLUMNS
        );
        sql.push_param(handle.as_str());

        match QueryBuilder::<Company>::new(sql).select_optional(&self.pool).await {
            Ok(Some(company)) => Ok(company),
            Ok(None) => Err(DatabaseError::NotFound(format!("No company: {}", handle))),
            Err(DatabaseError::Sqlx(e)) => Err(Self::duplicate_error(e, handle, new_name.as_ref().and_then(|n| n.as_deref()))),
            Err(other) => Err(other),
        }
    }

    async fn remove(&self, handle: &String) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM companies WHERE handle = $1")
            .bind(handle)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("No company: {}", handle)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let patch: CompanyPatch = serde_json::from_value(json!({
            "name": "New Name",
            "logoUrl": null
        }))
        .unwrap();

        assert_eq!(patch.num_employees, None);
        assert_eq!(patch.logo_url, Some(None));

        let fields = patch.into_fields();
        assert_eq!(
            fields,
            vec![("name", SqlParam::from("New Name")), ("logoUrl", SqlParam::Text(None))]
        );
    }

    #[test]
    fn patch_builds_mapped_set_clause() {
        let patch = CompanyPatch {
            num_employees: Some(Some(10)),
            description: Some(Some("Desc".to_string())),
            ..Default::default()
        };
        let sql = FilterSet::generate(&patch.into_fields(), COMPANY_COLUMNS).unwrap();
        assert_eq!(sql.query, "\"description\"=$1, \"num_employees\"=$2");
    }

    #[test]
    fn patch_rejects_null_name_and_description() {
        for body in [
            json!({ "name": null, "description": "changed" }),
            json!({ "name": null }),
            json!({ "description": null }),
        ] {
            let patch: CompanyPatch = serde_json::from_value(body.clone()).unwrap();
            assert!(patch.validate().is_err(), "{}", body);
        }

        let patch: CompanyPatch = serde_json::from_value(json!({ "description": "" })).unwrap();
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn patch_rejects_handle_changes() {
        let result = serde_json::from_value::<CompanyPatch>(json!({ "handle": "other" }));
        assert!(result.is_err());
    }

    #[test]
    fn empty_patch_has_no_fields() {
        let patch: CompanyPatch = serde_json::from_value(json!({})).unwrap();
        let fields = patch.into_fields();
        assert_eq!(FilterSet::generate(&fields, COMPANY_COLUMNS).unwrap_err(), FilterError::NoData);
    }

    #[test]
    fn new_company_validation() {
        let company: NewCompany = serde_json::from_value(json!({
            "handle": "new",
            "name": "New",
            "description": "DescNew",
            "numEmployees": 10,
            "logoUrl": "http://new.img"
        }))
        .unwrap();
        assert!(company.validate().is_ok());

        let bad: NewCompany = serde_json::from_value(json!({
            "handle": "New",
            "name": "",
            "description": "DescNew",
            "numEmployees": -1,
            "logoUrl": "not-a-url"
        }))
        .unwrap();
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        for field in ["handle", "name", "num_employees", "logo_url"] {
            assert!(fields.keys().any(|k| *k == field), "missing error for {field}");
        }
    }

    #[test]
    fn patch_validation_checks_present_values() {
        let patch: CompanyPatch = serde_json::from_value(json!({
            "numEmployees": -5
        }))
        .unwrap();
        assert!(patch.validate().is_err());

        let patch: CompanyPatch = serde_json::from_value(json!({
            "logoUrl": "nope"
        }))
        .unwrap();
        assert!(patch.validate().is_err());

        let patch: CompanyPatch = serde_json::from_value(json!({
            "numEmployees": null,
            "logoUrl": null
        }))
        .unwrap();
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn search_without_filters_is_ordered_by_name() {
        let sql = CompanySearch::default().to_filter().unwrap().to_sql();
        assert_eq!(
            sql.query,
            "SELECT handle, name, description, num_employees, logo_url FROM companies ORDER BY \"name\" ASC"
        );
        assert!(sql.params.is_empty());
    }

    #[test]
    fn search_combines_all_filters() {
        let search = CompanySearch {
            name_like: Some("net".to_string()),
            min_employees: Some(10),
            max_employees: Some(100),
        };
        let sql = search.to_filter().unwrap().to_sql();
        assert_eq!(
            sql.query,
            "SELECT handle, name, description, num_employees, logo_url FROM companies \
             WHERE \"num_employees\" >= $1 AND \"num_employees\" <= $2 AND \"name\" ILIKE $3 \
             ORDER BY \"name\" ASC"
        );
        assert_eq!(sql.params, vec![SqlParam::from(10), SqlParam::from(100), SqlParam::from("%net%")]);
    }

    #[test]
    fn search_rejects_inverted_range() {
        let search = CompanySearch {
            min_employees: Some(10),
            max_employees: Some(1),
            ..Default::default()
        };
        assert!(matches!(search.to_filter(), Err(FilterError::InvalidRange { .. })));
    }

    #[test]
    fn search_query_string_uses_camel_case() {
        let search: CompanySearch = serde_json::from_value(json!({ "minEmployees": 3 })).unwrap();
        assert_eq!(search.min_employees, Some(3));
        assert!(serde_json::from_value::<CompanySearch>(json!({ "foo": 1 })).is_err());
    }
}
