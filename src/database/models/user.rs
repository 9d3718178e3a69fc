use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::{Validate, ValidationError};

use super::{double_option, validate_patch_email, validate_required_text};
use crate::auth::{hash_password, verify_password, AuthUser};
use crate::database::manager::{is_foreign_key_violation, is_unique_violation, DatabaseError};
use crate::database::query_builder::QueryBuilder;
use crate::database::repository::Repository;
use crate::filter::{FilterSet, SqlParam};

pub const USER_COLUMNS: &[(&str, &str)] = &[
    ("firstName", "first_name"),
    ("lastName", "last_name"),
];

const USER_SELECT: &str = "username, first_name, last_name, email, is_admin";

/// A user as returned to clients. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        AuthUser {
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    /// Ids of the jobs applied to, ascending.
    pub applications: Vec<i32>,
}

#[derive(FromRow)]
struct UserCredentials {
    #[sqlx(flatten)]
    user: User,
    password: String,
}

/// Admin-side creation; may grant admin rights.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewUser {
    #[validate(length(min = 1, max = 25))]
    pub username: String,
    #[validate(length(min = 5, max = 20))]
    pub password: String,
    #[validate(length(min = 1, max = 30))]
    pub first_name: String,
    #[validate(length(min = 1, max = 30))]
    pub last_name: String,
    #[validate(length(min = 6, max = 60), email)]
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Self-service signup; always a regular user.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserRegistration {
    #[validate(length(min = 1, max = 25))]
    pub username: String,
    #[validate(length(min = 5, max = 20))]
    pub password: String,
    #[validate(length(min = 1, max = 30))]
    pub first_name: String,
    #[validate(length(min = 1, max = 30))]
    pub last_name: String,
    #[validate(length(min = 6, max = 60), email)]
    pub email: String,
}

impl From<UserRegistration> for NewUser {
    fn from(reg: UserRegistration) -> Self {
        NewUser {
            username: reg.username,
            password: reg.password,
            first_name: reg.first_name,
            last_name: reg.last_name,
            email: reg.email,
            is_admin: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserLogin {
    #[validate(length(min = 1, max = 25))]
    pub username: String,
    #[validate(length(min = 1, max = 20))]
    pub password: String,
}

/// Partial update. `username` and `isAdmin` are not fields, so sending them
/// is rejected.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "validate_user_patch"))]
pub struct UserPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub password: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
}

fn validate_user_patch(patch: &UserPatch) -> Result<(), ValidationError> {
    validate_required_text("password", &patch.password, 5, Some(20))?;
    validate_required_text("firstName", &patch.first_name, 1, Some(30))?;
    validate_required_text("lastName", &patch.last_name, 1, Some(30))?;
    validate_patch_email(&patch.email)
}

impl UserPatch {
    /// Present fields keyed by JSON name. `password` must already be hashed.
    pub fn into_fields(self) -> Vec<(&'static str, SqlParam)> {
        let mut fields = Vec::new();
        if let Some(password) = self.password {
            fields.push(("password", password.into()));
        }
        if let Some(first_name) = self.first_name {
            fields.push(("firstName", first_name.into()));
        }
        if let Some(last_name) = self.last_name {
            fields.push(("lastName", last_name.into()));
        }
        if let Some(email) = self.email {
            fields.push(("email", email.into()));
        }
        fields
    }
}

async fn hash_off_thread(password: String) -> Result<String, DatabaseError> {
    let hashed = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| DatabaseError::PasswordHash(e.to_string()))??;
    Ok(hashed)
}

async fn verify_off_thread(password: String, hash: String) -> Result<bool, DatabaseError> {
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| DatabaseError::PasswordHash(e.to_string()))??;
    Ok(valid)
}

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check a username/password pair. Unknown users and wrong passwords are
    /// indistinguishable to the caller.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, DatabaseError> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT username, first_name, last_name, email, is_admin, password
             FROM users
             WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        let Some(credentials) = credentials else {
            return Err(DatabaseError::InvalidCredentials);
        };

        if verify_off_thread(password.to_string(), credentials.password).await? {
            Ok(credentials.user)
        } else {
            Err(DatabaseError::InvalidCredentials)
        }
    }

    /// Record that `username` applied to job `job_id`. Applying twice is a no-op.
    pub async fn apply_to_job(&self, username: &str, job_id: i32) -> Result<(), DatabaseError> {
        let job = sqlx::query_scalar::<_, i32>("SELECT id FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        if job.is_none() {
            return Err(DatabaseError::NotFound(format!("No job: {}", job_id)));
        }

        let user = sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        if user.is_none() {
            return Err(DatabaseError::NotFound(format!("No user: {}", username)));
        }

        sqlx::query(
            "INSERT INTO applications (username, job_id)
             VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(username)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if !is_foreign_key_violation(&e) {
                return e.into();
            }
            match e.as_database_error().and_then(|d| d.constraint()) {
                Some("applications_job_id_fkey") => DatabaseError::NotFound(format!("No job: {}", job_id)),
                _ => DatabaseError::NotFound(format!("No user: {}", username)),
            }
        })?;

        Ok(())
    }
}

#[async_trait]
impl Repository for UserRepository {
    type Key = String;
    type New = NewUser;
    type Patch = UserPatch;
    type Search = ();
    type Summary = User;
    type Record = User;
    type Detail = UserDetail;

    async fn create(&self, data: NewUser) -> Result<User, DatabaseError> {
        let hashed = hash_off_thread(data.password).await?;

        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password, first_name, last_name, email, is_admin)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING username, first_name, last_name, email, is_admin",
        )
        .bind(&data.username)
        .bind(&hashed)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(data.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DatabaseError::BadRequest(format!("Duplicate username: {}", data.username))
            } else {
                e.into()
            }
        })
    }

    async fn find_all(&self, _search: ()) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT username, first_name, last_name, email, is_admin
             FROM users
             ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn get(&self, username: &String) -> Result<UserDetail, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT username, first_name, last_name, email, is_admin
             FROM users
             WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("No user: {}", username)))?;

        let applications = sqlx::query_scalar::<_, i32>(
            "SELECT job_id
             FROM applications
             WHERE username = $1
             ORDER BY job_id",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(UserDetail { user, applications })
    }

    async fn update(&self, username: &String, mut patch: UserPatch) -> Result<User, DatabaseError> {
        if let Some(Some(password)) = &mut patch.password {
            *password = hash_off_thread(std::mem::take(password)).await?;
        }

        let fields = patch.into_fields();
        let mut sql = FilterSet::generate(&fields, USER_COLUMNS)?;

        sql.query = format!(
            "UPDATE users SET {} WHERE username = {} RETURNING {}",
            sql.query,
            sql.next_placeholder(),
            USER_SELECT
        );
        sql.push_param(username.as_str());

        QueryBuilder::<User>::new(sql)
            .select_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("No user: {}", username)))
    }

    async fn remove(&self, username: &String) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("No user: {}", username)));
        }
        Ok(())
    }
}
