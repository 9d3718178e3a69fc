pub mod auth;
pub mod response;
pub mod validate;

pub use auth::{authenticate_jwt, ensure_admin, ensure_correct_user_or_admin, ensure_logged_in, Identity};
pub use response::{ApiResponse, ApiResult};
pub use validate::{ValidatedJson, ValidatedPath, ValidatedQuery};
