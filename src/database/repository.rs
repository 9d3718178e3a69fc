use async_trait::async_trait;

use crate::database::manager::DatabaseError;

/// The capability every entity exposes to the HTTP layer.
///
/// `Summary` is a row of a search result, `Record` the canonical projection
/// returned by create/update, `Detail` the projection of a single lookup with
/// its associated data nested in.
#[async_trait]
pub trait Repository {
    type Key: Send + Sync;
    type New: Send;
    type Patch: Send;
    type Search: Send;
    type Summary: Send;
    type Record: Send;
    type Detail: Send;

    async fn create(&self, data: Self::New) -> Result<Self::Record, DatabaseError>;

    async fn find_all(&self, search: Self::Search) -> Result<Vec<Self::Summary>, DatabaseError>;

    /// Fails with `NotFound` when the key does not exist.
    async fn get(&self, key: &Self::Key) -> Result<Self::Detail, DatabaseError>;

    /// Applies only the fields present in `patch`. An empty patch is a
    /// `BadRequest`; a missing key is `NotFound`.
    async fn update(&self, key: &Self::Key, patch: Self::Patch) -> Result<Self::Record, DatabaseError>;

    async fn remove(&self, key: &Self::Key) -> Result<(), DatabaseError>;
}
