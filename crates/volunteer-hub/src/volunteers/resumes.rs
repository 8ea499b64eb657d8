use std::sync::Arc;

use tracing::debug;

use super::domain::{Actor, ResumeRef, SignedUrl, TaskId, UserId, VolunteerId};
use super::error::VolunteerError;
use super::opportunity::OpportunityLookup;
use super::policy::AuthorizationPolicy;
use super::repository::VolunteerRepository;

/// External storage holding resume binaries.
pub trait ResumeStore: Send + Sync {
    fn resumes_for(&self, user_id: UserId) -> Result<Vec<ResumeRef>, ResumeStoreError>;
    /// Issue a time-limited URL, or `None` when the artifact is gone.
    fn signed_url(&self, resume: &ResumeRef) -> Result<Option<SignedUrl>, ResumeStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ResumeStoreError {
    #[error("resume store unavailable: {0}")]
    Unavailable(String),
}

/// Authorization-scoped access to resume artifacts.
pub struct ResumeAccessGateway<S> {
    store: Arc<S>,
}

impl<S> ResumeAccessGateway<S>
where
    S: ResumeStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn list_own_resumes(&self, actor: &Actor) -> Result<Vec<ResumeRef>, VolunteerError> {
        let resumes = self.store.resumes_for(actor.id)?;
        if resumes.is_empty() {
            return Err(VolunteerError::NotFound);
        }
        Ok(resumes)
    }

    /// Only the volunteer themself or a manager of `task_id` may read the
    /// resume. Callers who are neither get `Unauthorized` whether or not the
    /// volunteer exists.
    pub fn resume_access<R, O>(
        &self,
        repository: &R,
        opportunities: &O,
        policy: &AuthorizationPolicy,
        actor: &Actor,
        volunteer_id: VolunteerId,
        task_id: TaskId,
    ) -> Result<SignedUrl, VolunteerError>
    where
        R: VolunteerRepository + ?Sized,
        O: OpportunityLookup + ?Sized,
    {
        let volunteer = repository
            .fetch(volunteer_id)?
            .filter(|volunteer| volunteer.task_id == task_id);

        let owns = volunteer
            .as_ref()
            .is_some_and(|volunteer| volunteer.user_id == actor.id);
        if !owns && !policy.can_manage_volunteers(opportunities, task_id, actor)? {
            debug!(volunteer_id = %volunteer_id, user_id = %actor.id, "resume access denied");
            return Err(VolunteerError::Unauthorized);
        }

        let volunteer = volunteer.ok_or(VolunteerError::NotFound)?;
        let resume = volunteer.resume_ref.ok_or(VolunteerError::NotFound)?;
        self.store
            .signed_url(&resume)?
            .ok_or(VolunteerError::NotFound)
    }
}
