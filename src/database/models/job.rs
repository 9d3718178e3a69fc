use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::{Validate, ValidationError};

use super::company::Company;
use super::{double_option, field_error, validate_equity, validate_required_text};
use crate::database::manager::{is_foreign_key_violation, DatabaseError};
use crate::database::query_builder::QueryBuilder;
use crate::database::repository::Repository;
use crate::filter::{Filter, FilterError, FilterOrderInfo, FilterSet, FilterWhere, SqlParam};

/// Jobs have no renamed updatable fields; the table documents that.
pub const JOB_COLUMNS: &[(&str, &str)] = &[];

const RETURNING_COLUMNS: &str = "id, title, salary, equity, company_handle";

const LISTING_SOURCE: &str = "jobs j JOIN companies c ON c.handle = j.company_handle";
const LISTING_COLUMNS: &str =
    "j.id, j.title, j.salary, j.equity, j.company_handle, c.name AS company_name";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<Decimal>,
    pub company_handle: String,
}

/// A job as nested under its company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<Decimal>,
}

/// A search result row, carrying the owning company's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<Decimal>,
    pub company_handle: String,
    pub company_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<Decimal>,
    pub company: Company,
}

/// One row of the job-with-company join behind `JobDetail`.
#[derive(FromRow)]
struct JobWithCompany {
    id: i32,
    title: String,
    salary: Option<i32>,
    equity: Option<Decimal>,
    #[sqlx(flatten)]
    company: Company,
}

impl From<JobWithCompany> for JobDetail {
    fn from(row: JobWithCompany) -> Self {
        JobDetail {
            id: row.id,
            title: row.title,
            salary: row.salary,
            equity: row.equity,
            company: row.company,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "validate_new_job"))]
pub struct NewJob {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(range(min = 0))]
    pub salary: Option<i32>,
    pub equity: Option<Decimal>,
    #[validate(length(min = 1, max = 25))]
    pub company_handle: String,
}

fn validate_new_job(job: &NewJob) -> Result<(), ValidationError> {
    match &job.equity {
        Some(equity) => validate_equity(equity),
        None => Ok(()),
    }
}

/// Partial update over title, salary and equity. `id` and `companyHandle`
/// are not fields, so sending them is rejected.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "validate_job_patch"))]
pub struct JobPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub salary: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub equity: Option<Option<Decimal>>,
}

fn validate_job_patch(patch: &JobPatch) -> Result<(), ValidationError> {
    validate_required_text("title", &patch.title, 1, None)?;
    if let Some(Some(salary)) = patch.salary {
        if salary < 0 {
            return Err(field_error("range", "salary", "salary must not be negative".to_string()));
        }
    }
    match &patch.equity {
        Some(Some(equity)) => validate_equity(equity),
        _ => Ok(()),
    }
}

impl JobPatch {
    pub fn into_fields(self) -> Vec<(&'static str, SqlParam)> {
        let mut fields = Vec::new();
        if let Some(title) = self.title {
            fields.push(("title", title.into()));
        }
        if let Some(salary) = self.salary {
            fields.push(("salary", salary.into()));
        }
        if let Some(equity) = self.equity {
            fields.push(("equity", equity.into()));
        }
        fields
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobSearch {
    #[validate(length(min = 1))]
    pub title: Option<String>,
    #[validate(range(min = 0))]
    pub min_salary: Option<i32>,
    pub has_equity: Option<bool>,
}

impl JobSearch {
    /// Listing rows ordered by title then id.
    pub fn to_filter(&self) -> Result<Filter, FilterError> {
        let mut conditions = FilterWhere::new();
        if let Some(min) = self.min_salary {
            conditions.gte("j.salary", min);
        }
        conditions.positive("j.equity", self.has_equity.unwrap_or(false));
        if let Some(title) = &self.title {
            conditions.contains("j.title", title);
        }

        Ok(Filter::new(LISTING_SOURCE, LISTING_COLUMNS)
            .where_clause(conditions)
            .order(vec![FilterOrderInfo::asc("j.title"), FilterOrderInfo::asc("j.id")]))
    }
}

#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for JobRepository {
    type Key = i32;
    type New = NewJob;
    type Patch = JobPatch;
    type Search = JobSearch;
    type Summary = JobListing;
    type Record = Job;
    type Detail = JobDetail;

    async fn create(&self, data: NewJob) -> Result<Job, DatabaseError> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (title, salary, equity, company_handle)
             VALUES ($1, $2, $3, $4)
             RETURNING id, title, salary, equity, company_handle",
        )
        .bind(&data.title)
        .bind(data.salary)
        .bind(data.equity)
        .bind(&data.company_handle)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                DatabaseError::NotFound(format!("No company: {}", data.company_handle))
            } else {
                e.into()
            }
        })
    }

    async fn find_all(&self, search: JobSearch) -> Result<Vec<JobListing>, DatabaseError> {
        let filter = search.to_filter()?;
        QueryBuilder::<JobListing>::new(filter.to_sql())
            .select_all(&self.pool)
            .await
    }

    async fn get(&self, id: &i32) -> Result<JobDetail, DatabaseError> {
        let row = sqlx::query_as::<_, JobWithCompany>(
            "SELECT j.id, j.title, j.salary, j.equity,
                    c.handle, c.name, c.description, c.num_employees, c.logo_url
             FROM jobs j
             JOIN companies c ON c.handle = j.company_handle
             WHERE j.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("No job: {}", id)))?;

        Ok(row.into())
    }

    async fn update(&self, id: &i32, patch: JobPatch) -> Result<Job, DatabaseError> {
        let fields = patch.into_fields();
        let mut sql = FilterSet::generate(&fields, JOB_COLUMNS)?;

        sql.query = format!(
            "UPDATE jobs SET {} WHERE id = {} RETURNING {}",
            sql.query,
            sql.next_placeholder(),
            RETURNING_COLUMNS
        );
        sql.push_param(*id);

        QueryBuilder::<Job>::new(sql)
            .select_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("No job: {}", id)))
    }

    async fn remove(&self, id: &i32) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("No job: {}", id)));
        }
        Ok(())
    }
}
