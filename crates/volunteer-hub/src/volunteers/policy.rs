//! Permission predicates gating volunteer transitions.
//!
//! Both predicates read through their collaborators on every call and never
//! cache or mutate anything. A denial is the value `false`; only a collaborator
//! failure produces an error.

use tracing::debug;

use super::domain::{Actor, ApplyRequest, Task, TaskId};
use super::error::VolunteerError;
use super::opportunity::OpportunityLookup;
use super::repository::VolunteerRepository;
use crate::config::VolunteerConfig;

pub const DEFAULT_ACTIVE_TASK_STATE: &str = "in progress";
pub const DEFAULT_CLOSED_TASK_STATES: [&str; 2] = ["completed", "cancelled"];

/// Rule deciding whether placing a volunteer on a task should notify them,
/// and optionally whether the placement is allowed at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRule {
    pub active_state: String,
    /// Reject `assign`/`select` to `true` outside the active state instead of
    /// only skipping the notification.
    pub enforce: bool,
}

impl AssignmentRule {
    pub fn task_is_active(&self, task: &Task) -> bool {
        task.state_is(&self.active_state)
    }

    /// Whether a placement flipping to `value` may proceed on `task`.
    pub fn permits(&self, task: &Task, value: bool) -> bool {
        !self.enforce || !value || self.task_is_active(task)
    }
}

impl Default for AssignmentRule {
    fn default() -> Self {
        Self {
            active_state: DEFAULT_ACTIVE_TASK_STATE.to_string(),
            enforce: false,
        }
    }
}

/// Authorization policy for applying to and managing volunteers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationPolicy {
    closed_states: Vec<String>,
    assignment: AssignmentRule,
}

impl AuthorizationPolicy {
    pub fn new(closed_states: Vec<String>, assignment: AssignmentRule) -> Self {
        Self {
            closed_states,
            assignment,
        }
    }

    pub fn from_config(config: &VolunteerConfig) -> Self {
        Self::new(
            config.closed_task_states.clone(),
            AssignmentRule {
                active_state: config.active_task_state.clone(),
                enforce: config.enforce_active_task,
            },
        )
    }

    pub fn assignment_rule(&self) -> &AssignmentRule {
        &self.assignment
    }

    pub fn accepts_applications(&self, task: &Task) -> bool {
        !self.closed_states.iter().any(|state| task.state_is(state))
    }

    /// `true` unless the task is missing or closed, or the actor already
    /// volunteers for it.
    pub fn can_add_volunteer<R, O>(
        &self,
        repository: &R,
        opportunities: &O,
        request: &ApplyRequest,
        actor: &Actor,
    ) -> Result<bool, VolunteerError>
    where
        R: VolunteerRepository + ?Sized,
        O: OpportunityLookup + ?Sized,
    {
        let Some(task) = opportunities.find_by_id(request.task_id)? else {
            debug!(task_id = %request.task_id, user_id = %actor.id, "apply denied: unknown task");
            return Ok(false);
        };

        if !self.accepts_applications(&task) {
            debug!(task_id = %task.id, state = %task.state, "apply denied: task closed");
            return Ok(false);
        }

        if repository
            .find_by_user_and_task(actor.id, request.task_id)?
            .is_some()
        {
            debug!(task_id = %task.id, user_id = %actor.id, "apply denied: already volunteering");
            return Ok(false);
        }

        Ok(true)
    }

    /// `true` iff the actor owns or manages the task.
    pub fn can_manage_volunteers<O>(
        &self,
        opportunities: &O,
        task_id: TaskId,
        actor: &Actor,
    ) -> Result<bool, VolunteerError>
    where
        O: OpportunityLookup + ?Sized,
    {
        let allowed = opportunities
            .find_by_id(task_id)?
            .map(|task| task.is_managed_by(actor.id))
            .unwrap_or(false);
        Ok(allowed)
    }
}

impl Default for AuthorizationPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_CLOSED_TASK_STATES
                .iter()
                .map(|state| state.to_string())
                .collect(),
            AssignmentRule::default(),
        )
    }
}
