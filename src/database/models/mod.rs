pub mod company;
pub mod job;
pub mod user;

pub use company::{Company, CompanyDetail, CompanyPatch, CompanyRepository, CompanySearch, NewCompany};
pub use job::{Job, JobDetail, JobListing, JobPatch, JobRepository, JobSearch, JobSummary, NewJob};
pub use user::{NewUser, User, UserDetail, UserLogin, UserPatch, UserRegistration, UserRepository};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::borrow::Cow;
use validator::{ValidateEmail, ValidationError};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use together with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A struct-level error that still names the field it is about. The API
/// reports it under `field` rather than under the struct as a whole.
pub(crate) fn field_error(code: &'static str, field: &str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code).with_message(Cow::Owned(message));
    error.add_param(Cow::Borrowed("field"), &field);
    error
}

/// Patch field backed by a NOT NULL text column. An explicit `null` is an
/// error; a present value must fit `min..=max` characters.
pub(crate) fn validate_required_text(
    field: &str,
    value: &Option<Option<String>>,
    min: usize,
    max: Option<usize>,
) -> Result<(), ValidationError> {
    let text = match value {
        None => return Ok(()),
        Some(None) => return Err(field_error("required", field, format!("{} must not be null", field))),
        Some(Some(text)) => text,
    };

    let len = text.chars().count();
    if len < min || max.is_some_and(|max| len > max) {
        let bounds = match max {
            Some(max) => format!("{} must be {} to {} characters", field, min, max),
            None => format!("{} must be at least {} characters", field, min),
        };
        return Err(field_error("length", field, bounds));
    }
    Ok(())
}

pub(crate) fn validate_patch_email(value: &Option<Option<String>>) -> Result<(), ValidationError> {
    validate_required_text("email", value, 6, Some(60))?;
    if let Some(Some(email)) = value {
        if !email.validate_email() {
            return Err(field_error("email", "email", "email must be an email address".to_string()));
        }
    }
    Ok(())
}

pub(crate) fn validate_handle(handle: &str) -> Result<(), ValidationError> {
    if handle != handle.to_lowercase() {
        return Err(ValidationError::new("lowercase")
            .with_message(Cow::Borrowed("handle must be lowercase")));
    }
    Ok(())
}

pub(crate) fn validate_equity(equity: &Decimal) -> Result<(), ValidationError> {
    if equity.is_sign_negative() || *equity > Decimal::ONE {
        return Err(field_error("equity", "equity", "equity must be between 0 and 1".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equity_bounds() {
        assert!(validate_equity(&Decimal::ZERO).is_ok());
        assert!(validate_equity(&Decimal::new(5, 1)).is_ok());
        assert!(validate_equity(&Decimal::ONE).is_ok());
        assert!(validate_equity(&Decimal::new(11, 1)).is_err());
        assert!(validate_equity(&Decimal::new(-1, 2)).is_err());
    }

    #[test]
    fn required_text_rejects_null_and_bad_lengths() {
        assert!(validate_required_text("name", &None, 1, None).is_ok());
        assert!(validate_required_text("name", &Some(Some("Acme".into())), 1, Some(30)).is_ok());

        let err = validate_required_text("name", &Some(None), 1, None).unwrap_err();
        assert_eq!(err.code, "required");
        assert_eq!(err.message.as_deref(), Some("name must not be null"));
        assert_eq!(err.params["field"], "name");

        let err = validate_required_text("name", &Some(Some(String::new())), 1, None).unwrap_err();
        assert_eq!(err.code, "length");
        assert!(validate_required_text("password", &Some(Some("x".repeat(21))), 5, Some(20)).is_err());
    }

    #[test]
    fn patch_email_must_be_an_address() {
        assert!(validate_patch_email(&Some(Some("new@email.com".into()))).is_ok());
        assert!(validate_patch_email(&Some(Some("not-an-email".into()))).is_err());
        assert!(validate_patch_email(&Some(None)).is_err());
    }

    #[test]
    fn handles_must_be_lowercase() {
        assert!(validate_handle("acme-co").is_ok());
        assert!(validate_handle("Acme").is_err());
    }
}
