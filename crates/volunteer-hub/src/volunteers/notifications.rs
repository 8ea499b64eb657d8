use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::domain::{Actor, FlagTransition, Task, UserId, Volunteer, VolunteerSnapshot};
use super::opportunity::OpportunityLookup;
use super::policy::AssignmentRule;

pub const APPLIED_TEMPLATE: &str = "volunteer.create.thanks";
pub const WITHDRAWN_TEMPLATE: &str = "volunteer.destroy.decline";

/// Outbound hook for volunteer-scoped messages (e-mail, push, ...).
pub trait VolunteerNotifier: Send + Sync {
    fn send(&self, notice: VolunteerNotice) -> Result<(), NotifyError>;
}

/// Message payload handed to the delivery adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolunteerNotice {
    pub template: String,
    pub recipient: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    pub volunteer: Volunteer,
}

/// Delivery failure. Never surfaced to callers of the service.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Whether deliveries run on the caller's thread or on the blocking pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    Inline,
    Background,
}

/// Fires post-commit notices for committed transitions.
///
/// Only successful results reach the dispatcher. Delivery errors are logged
/// and dropped; there are no retries.
pub struct NotificationDispatcher<N, O> {
    notifier: Arc<N>,
    opportunities: Arc<O>,
    rule: AssignmentRule,
    mode: DispatchMode,
}

impl<N, O> NotificationDispatcher<N, O>
where
    N: VolunteerNotifier + 'static,
    O: OpportunityLookup + 'static,
{
    pub fn new(
        notifier: Arc<N>,
        opportunities: Arc<O>,
        rule: AssignmentRule,
        mode: DispatchMode,
    ) -> Self {
        Self {
            notifier,
            opportunities,
            rule,
            mode,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Thank the applicant and tell the task's managers, unless `silent` is
    /// explicitly `true`. Returns whether anything was scheduled.
    pub fn notify_applied(
        &self,
        actor: &Actor,
        volunteer: &Volunteer,
        task: &Task,
        silent: Option<bool>,
    ) -> bool {
        if silent == Some(true) {
            debug!(volunteer_id = %volunteer.id, "apply notification suppressed");
            return false;
        }

        let notifier = Arc::clone(&self.notifier);
        let opportunities = Arc::clone(&self.opportunities);
        let notice = VolunteerNotice {
            template: APPLIED_TEMPLATE.to_string(),
            recipient: actor.id,
            recipient_name: Some(actor.name.clone()),
            volunteer: volunteer.clone(),
        };
        let actor = actor.clone();
        let task = task.clone();

        self.run(move || {
            if let Err(err) = notifier.send(notice) {
                warn!(template = APPLIED_TEMPLATE, error = %err, "notification dropped");
            }
            if let Err(err) = opportunities.notify_task_applied(&actor, &task) {
                warn!(task_id = %task.id, error = %err, "task applied notice dropped");
            }
        });
        true
    }

    /// Tell the former volunteer their participation ended, using the
    /// pre-delete snapshot.
    pub fn notify_deleted(&self, snapshot: &VolunteerSnapshot) -> bool {
        let notifier = Arc::clone(&self.notifier);
        let notice = VolunteerNotice {
            template: WITHDRAWN_TEMPLATE.to_string(),
            recipient: snapshot.user_id,
            recipient_name: None,
            volunteer: snapshot.clone(),
        };

        self.run(move || {
            if let Err(err) = notifier.send(notice) {
                warn!(template = WITHDRAWN_TEMPLATE, error = %err, "notification dropped");
            }
        });
        true
    }

    /// Notify the assignee only when the flag actually flipped to `true` and
    /// the task is in its active state.
    pub fn notify_task_assigned(&self, task: &Task, transition: &FlagTransition) -> bool {
        if !transition.activated() {
            debug!(
                volunteer_id = %transition.volunteer.id,
                flag = transition.flag.label(),
                "no placement change; skipping notice"
            );
            return false;
        }
        if !self.rule.task_is_active(task) {
            debug!(task_id = %task.id, state = %task.state, "task not active; skipping notice");
            return false;
        }

        let opportunities = Arc::clone(&self.opportunities);
        let assignee = transition.volunteer.user_id;
        let task = task.clone();

        self.run(move || {
            if let Err(err) = opportunities.notify_task_assigned(assignee, &task) {
                warn!(task_id = %task.id, user_id = %assignee, error = %err, "task assigned notice dropped");
            }
        });
        true
    }

    fn run<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self.mode {
            DispatchMode::Inline => job(),
            DispatchMode::Background => match Handle::try_current() {
                Ok(handle) => {
                    handle.spawn_blocking(job);
                }
                Err(_) => job(),
            },
        }
    }
}
