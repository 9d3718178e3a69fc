use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("No data")]
    NoData,

    #[error("{min_name} ({min}) cannot be greater than {max_name} ({max})")]
    InvalidRange {
        min_name: &'static str,
        min: i32,
        max_name: &'static str,
        max: i32,
    },
}
