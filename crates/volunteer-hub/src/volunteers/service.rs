use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::domain::{
    Actor, ApplyRequest, DeleteSelector, FlagTransition, ManageRequest, NewVolunteer, ResumeRef,
    SignedUrl, Task, TaskId, Volunteer, VolunteerFlag, VolunteerId, VolunteerSnapshot,
    VolunteerUpdate,
};
use super::engine::VolunteerLifecycleEngine;
use super::error::VolunteerError;
use super::notifications::{DispatchMode, NotificationDispatcher, VolunteerNotifier};
use super::opportunity::OpportunityLookup;
use super::policy::AuthorizationPolicy;
use super::repository::VolunteerRepository;
use super::resumes::{ResumeAccessGateway, ResumeStore};
use crate::config::VolunteerConfig;

/// Apply response: the stored record plus the applicant's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedVolunteer {
    #[serde(flatten)]
    pub volunteer: Volunteer,
    pub name: String,
}

/// Service composing the authorization policy, lifecycle engine, dispatcher,
/// and resume gateway. Every operation takes the acting identity explicitly.
pub struct VolunteerService<R, O, N, S> {
    policy: Arc<AuthorizationPolicy>,
    engine: Arc<VolunteerLifecycleEngine<R>>,
    opportunities: Arc<O>,
    dispatcher: Arc<NotificationDispatcher<N, O>>,
    resumes: Arc<ResumeAccessGateway<S>>,
}

impl<R, O, N, S> VolunteerService<R, O, N, S>
where
    R: VolunteerRepository + 'static,
    O: OpportunityLookup + 'static,
    N: VolunteerNotifier + 'static,
    S: ResumeStore + 'static,
{
    pub fn new(
        repository: Arc<R>,
        opportunities: Arc<O>,
        notifier: Arc<N>,
        resume_store: Arc<S>,
        config: &VolunteerConfig,
    ) -> Self {
        Self::with_policy(
            AuthorizationPolicy::from_config(config),
            repository,
            opportunities,
            notifier,
            resume_store,
            config.dispatch_mode,
        )
    }

    pub fn with_policy(
        policy: AuthorizationPolicy,
        repository: Arc<R>,
        opportunities: Arc<O>,
        notifier: Arc<N>,
        resume_store: Arc<S>,
        mode: DispatchMode,
    ) -> Self {
        let dispatcher = NotificationDispatcher::new(
            notifier,
            Arc::clone(&opportunities),
            policy.assignment_rule().clone(),
            mode,
        );

        Self {
            policy: Arc::new(policy),
            engine: Arc::new(VolunteerLifecycleEngine::new(repository)),
            opportunities,
            dispatcher: Arc::new(dispatcher),
            resumes: Arc::new(ResumeAccessGateway::new(resume_store)),
        }
    }

    pub fn policy(&self) -> &AuthorizationPolicy {
        &self.policy
    }

    /// Apply to a task as `actor`. The task is read before the mutation so a
    /// lookup failure can never follow a committed record.
    pub fn apply(
        &self,
        actor: &Actor,
        request: ApplyRequest,
    ) -> Result<AppliedVolunteer, VolunteerError> {
        let task = self.opportunities.find_by_id(request.task_id)?;
        let allowed = self.policy.can_add_volunteer(
            self.engine.repository(),
            self.opportunities.as_ref(),
            &request,
            actor,
        )?;
        let task = match task {
            Some(task) if allowed => task,
            _ => return Err(VolunteerError::Unauthorized),
        };

        let volunteer = self.engine.apply(NewVolunteer {
            user_id: actor.id,
            task_id: request.task_id,
            resume_ref: request.resume_ref,
        })?;

        self.dispatcher
            .notify_applied(actor, &volunteer, &task, request.silent);

        Ok(AppliedVolunteer {
            volunteer,
            name: actor.name.clone(),
        })
    }

    pub fn get_volunteer(
        &self,
        volunteer_id: VolunteerId,
        task_id: TaskId,
    ) -> Result<Volunteer, VolunteerError> {
        self.engine.get(volunteer_id, task_id)
    }

    /// Update by the volunteer themself or a manager of their task.
    pub fn update_volunteer(
        &self,
        actor: &Actor,
        volunteer_id: VolunteerId,
        changes: VolunteerUpdate,
    ) -> Result<Volunteer, VolunteerError> {
        let current = self
            .engine
            .repository()
            .fetch(volunteer_id)?
            .ok_or(VolunteerError::NotFound)?;

        if current.user_id != actor.id
            && !self.policy.can_manage_volunteers(
                self.opportunities.as_ref(),
                current.task_id,
                actor,
            )?
        {
            return Err(VolunteerError::Unauthorized);
        }

        self.engine.update(volunteer_id, changes)
    }

    /// Self-service withdrawal; returns the pre-delete snapshot.
    pub fn withdraw(
        &self,
        actor: &Actor,
        task_id: TaskId,
    ) -> Result<VolunteerSnapshot, VolunteerError> {
        let snapshot = self.engine.delete(DeleteSelector::Own {
            user_id: actor.id,
            task_id,
        })?;
        self.dispatcher.notify_deleted(&snapshot);
        Ok(snapshot)
    }

    pub fn assign(&self, actor: &Actor, request: ManageRequest) -> Result<Volunteer, VolunteerError> {
        self.place(actor, request, VolunteerFlag::Assigned)
    }

    pub fn select(&self, actor: &Actor, request: ManageRequest) -> Result<Volunteer, VolunteerError> {
        self.place(actor, request, VolunteerFlag::Selected)
    }

    pub fn complete(
        &self,
        actor: &Actor,
        request: ManageRequest,
    ) -> Result<Volunteer, VolunteerError> {
        self.authorize_manager(actor, request.task_id)?;
        let transition = self
            .engine
            .complete(request.volunteer_id, request.task_id, request.value)?;
        Ok(transition.volunteer)
    }

    /// Clear a selection. Placement notices never fire from here, whatever
    /// the caller's body says.
    pub fn deselect(
        &self,
        actor: &Actor,
        task_id: TaskId,
        volunteer_id: VolunteerId,
    ) -> Result<Volunteer, VolunteerError> {
        self.authorize_manager(actor, task_id)?;
        let transition = self.engine.select(volunteer_id, task_id, false)?;
        Ok(transition.volunteer)
    }

    /// Manager removal of a volunteer from their task.
    pub fn remove(
        &self,
        actor: &Actor,
        task_id: TaskId,
        volunteer_id: VolunteerId,
    ) -> Result<(), VolunteerError> {
        self.authorize_manager(actor, task_id)?;
        let snapshot = self.engine.delete(DeleteSelector::Managed {
            id: volunteer_id,
            task_id,
        })?;
        self.dispatcher.notify_deleted(&snapshot);
        Ok(())
    }

    pub fn list_own_resumes(&self, actor: &Actor) -> Result<Vec<ResumeRef>, VolunteerError> {
        self.resumes.list_own_resumes(actor)
    }

    pub fn resume_access(
        &self,
        actor: &Actor,
        volunteer_id: VolunteerId,
        task_id: TaskId,
    ) -> Result<SignedUrl, VolunteerError> {
        self.resumes.resume_access(
            self.engine.repository(),
            self.opportunities.as_ref(),
            &self.policy,
            actor,
            volunteer_id,
            task_id,
        )
    }

    fn place(
        &self,
        actor: &Actor,
        request: ManageRequest,
        flag: VolunteerFlag,
    ) -> Result<Volunteer, VolunteerError> {
        let task = self.authorize_manager(actor, request.task_id)?;

        if !self.policy.assignment_rule().permits(&task, request.value) {
            debug!(task_id = %task.id, state = %task.state, "placement rejected for inactive task");
            return Err(VolunteerError::TaskNotActive {
                task_state: task.state,
            });
        }

        let transition: FlagTransition = match flag {
            VolunteerFlag::Selected => {
                self.engine
                    .select(request.volunteer_id, request.task_id, request.value)?
            }
            _ => self
                .engine
                .assign(request.volunteer_id, request.task_id, request.value)?,
        };

        self.dispatcher.notify_task_assigned(&task, &transition);
        Ok(transition.volunteer)
    }

    /// Checks management rights and returns the task read for this request.
    fn authorize_manager(&self, actor: &Actor, task_id: TaskId) -> Result<Task, VolunteerError> {
        if !self
            .policy
            .can_manage_volunteers(self.opportunities.as_ref(), task_id, actor)?
        {
            debug!(task_id = %task_id, user_id = %actor.id, "manager action denied");
            return Err(VolunteerError::Unauthorized);
        }

        self.opportunities
            .find_by_id(task_id)?
            .ok_or(VolunteerError::NotFound)
    }
}
