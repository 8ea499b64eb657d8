use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::domain::{
    DeleteSelector, FlagTransition, NewVolunteer, ResumeRef, TaskId, Volunteer, VolunteerFlag,
    VolunteerId, VolunteerSnapshot, VolunteerUpdate,
};
use super::error::{FieldError, VolunteerError};
use super::repository::VolunteerRepository;

const MAX_RESUME_REF_LEN: usize = 512;

/// Owns the volunteer state machine.
///
/// The engine performs no authorization of its own; callers evaluate
/// [`super::policy::AuthorizationPolicy`] first. Every write is a
/// compare-and-swap against the version that was read, so two callers racing
/// on one record resolve to one winner and one [`VolunteerError::Conflict`].
pub struct VolunteerLifecycleEngine<R> {
    repository: Arc<R>,
}

impl<R> VolunteerLifecycleEngine<R>
where
    R: VolunteerRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Create a volunteer with every flag cleared.
    pub fn apply(&self, new: NewVolunteer) -> Result<Volunteer, VolunteerError> {
        let now = Utc::now();
        let record = Volunteer {
            id: self.repository.next_id()?,
            user_id: new.user_id,
            task_id: new.task_id,
            assigned: false,
            selected: false,
            completed: false,
            resume_ref: new.resume_ref,
            created_at: now,
            updated_at: now,
            version: 1,
        };

        let stored = self.repository.insert(record)?;
        info!(
            volunteer_id = %stored.id,
            user_id = %stored.user_id,
            task_id = %stored.task_id,
            "volunteer applied"
        );
        Ok(stored)
    }

    /// Fetch a volunteer scoped to `task_id`; a record on another task is
    /// reported as missing.
    pub fn get(&self, id: VolunteerId, task_id: TaskId) -> Result<Volunteer, VolunteerError> {
        self.repository
            .fetch(id)?
            .filter(|volunteer| volunteer.task_id == task_id)
            .ok_or(VolunteerError::NotFound)
    }

    pub fn assign(
        &self,
        id: VolunteerId,
        task_id: TaskId,
        assign: bool,
    ) -> Result<FlagTransition, VolunteerError> {
        self.transition(id, task_id, VolunteerFlag::Assigned, assign)
    }

    pub fn select(
        &self,
        id: VolunteerId,
        task_id: TaskId,
        select: bool,
    ) -> Result<FlagTransition, VolunteerError> {
        self.transition(id, task_id, VolunteerFlag::Selected, select)
    }

    pub fn complete(
        &self,
        id: VolunteerId,
        task_id: TaskId,
        complete: bool,
    ) -> Result<FlagTransition, VolunteerError> {
        self.transition(id, task_id, VolunteerFlag::Completed, complete)
    }

    fn transition(
        &self,
        id: VolunteerId,
        task_id: TaskId,
        flag: VolunteerFlag,
        value: bool,
    ) -> Result<FlagTransition, VolunteerError> {
        let current = self.get(id, task_id)?;

        let before = flag.read(&current);
        if before == value {
            debug!(volunteer_id = %id, flag = flag.label(), value, "transition is a no-op");
            return Ok(FlagTransition {
                flag,
                before,
                after: value,
                volunteer: current,
            });
        }

        let expected_version = current.version;
        let mut next = current;
        flag.write(&mut next, value);
        next.updated_at = Utc::now();

        let stored = self.repository.update(next, expected_version)?;
        info!(
            volunteer_id = %stored.id,
            task_id = %stored.task_id,
            flag = flag.label(),
            before,
            after = value,
            "volunteer transitioned"
        );

        Ok(FlagTransition {
            flag,
            before,
            after: value,
            volunteer: stored,
        })
    }

    /// Apply a general update. `id` and `updated_at` stay engine controlled.
    pub fn update(
        &self,
        id: VolunteerId,
        changes: VolunteerUpdate,
    ) -> Result<Volunteer, VolunteerError> {
        let current = self
            .repository
            .fetch(id)?
            .ok_or(VolunteerError::NotFound)?;

        let errors = validate_update(&current, &changes);
        if !errors.is_empty() {
            return Err(VolunteerError::Validation(errors));
        }
        if changes.updated_at.is_some() {
            debug!(volunteer_id = %id, "ignoring caller supplied updatedAt");
        }

        let mut next = current.clone();
        if changes.remove_resume {
            next.resume_ref = None;
        } else if let Some(resume) = changes.resume_ref {
            next.resume_ref = Some(ResumeRef(resume.trim().to_string()));
        }

        if next == current {
            return Ok(current);
        }

        next.updated_at = Utc::now();
        let stored = self.repository.update(next, current.version)?;
        info!(volunteer_id = %stored.id, "volunteer updated");
        Ok(stored)
    }

    /// Remove a volunteer and hand back what was stored.
    pub fn delete(&self, selector: DeleteSelector) -> Result<VolunteerSnapshot, VolunteerError> {
        let target = match selector {
            DeleteSelector::Own { user_id, task_id } => {
                self.repository.find_by_user_and_task(user_id, task_id)?
            }
            DeleteSelector::Managed { id, task_id } => self
                .repository
                .fetch(id)?
                .filter(|volunteer| volunteer.task_id == task_id),
        }
        .ok_or(VolunteerError::NotFound)?;

        let snapshot = self.repository.remove(target.id, target.version)?;
        info!(
            volunteer_id = %snapshot.id,
            user_id = %snapshot.user_id,
            task_id = %snapshot.task_id,
            "volunteer removed"
        );
        Ok(snapshot)
    }
}

fn validate_update(current: &Volunteer, changes: &VolunteerUpdate) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if changes.id.is_some_and(|id| id != current.id) {
        errors.push(FieldError::new(
            "id",
            "does not match the volunteer being updated",
        ));
    }
    if changes.user_id.is_some_and(|user_id| user_id != current.user_id) {
        errors.push(FieldError::new("userId", "cannot be changed"));
    }
    if changes.task_id.is_some_and(|task_id| task_id != current.task_id) {
        errors.push(FieldError::new("taskId", "cannot be changed"));
    }

    if let Some(resume) = &changes.resume_ref {
        let trimmed = resume.trim();
        if trimmed.is_empty() {
            errors.push(FieldError::new("resumeRef", "must not be blank"));
        } else if trimmed.chars().count() > MAX_RESUME_REF_LEN {
            errors.push(FieldError::new(
                "resumeRef",
                format!("must be at most {MAX_RESUME_REF_LEN} characters"),
            ));
        }
        if changes.remove_resume {
            errors.push(FieldError::new(
                "removeResume",
                "cannot be combined with resumeRef",
            ));
        }
    }

    errors
}
