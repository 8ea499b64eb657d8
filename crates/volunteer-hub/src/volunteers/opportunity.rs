use super::domain::{Actor, Task, TaskId, UserId};

/// Read-only access to opportunity metadata plus the notices the opportunity
/// service sends on behalf of a task.
pub trait OpportunityLookup: Send + Sync {
    fn find_by_id(&self, task_id: TaskId) -> Result<Option<Task>, LookupError>;
    /// Tells the task's managers that `actor` applied.
    fn notify_task_applied(&self, actor: &Actor, task: &Task) -> Result<(), LookupError>;
    /// Tells `assignee` they have been placed on `task`.
    fn notify_task_assigned(&self, assignee: UserId, task: &Task) -> Result<(), LookupError>;
}

/// Failure talking to the opportunity service.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("opportunity service unavailable: {0}")]
    Unavailable(String),
    #[error("opportunity notice rejected: {0}")]
    Rejected(String),
}
