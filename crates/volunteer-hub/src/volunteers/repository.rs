use super::domain::{TaskId, UserId, Volunteer, VolunteerId};

/// Storage boundary for volunteer records.
///
/// `update` and `remove` are compare-and-swap operations keyed on
/// [`Volunteer::version`]: they succeed only while the stored version still
/// equals `expected_version`, and report [`RepositoryError::Conflict`]
/// otherwise so the losing writer learns about the race.
pub trait VolunteerRepository: Send + Sync {
    /// Reserves an id that no stored or previously issued record uses.
    fn next_id(&self) -> Result<VolunteerId, RepositoryError>;
    /// Stores a new record. Fails with `Conflict` when the `(user_id, task_id)`
    /// pair or the id is already taken.
    fn insert(&self, record: Volunteer) -> Result<Volunteer, RepositoryError>;
    /// Replaces a record and returns it with its version bumped.
    fn update(&self, record: Volunteer, expected_version: u64)
        -> Result<Volunteer, RepositoryError>;
    fn fetch(&self, id: VolunteerId) -> Result<Option<Volunteer>, RepositoryError>;
    fn find_by_user_and_task(
        &self,
        user_id: UserId,
        task_id: TaskId,
    ) -> Result<Option<Volunteer>, RepositoryError>;
    /// Removes a record, returning what was stored.
    fn remove(&self, id: VolunteerId, expected_version: u64) -> Result<Volunteer, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
