use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::config::VolunteerConfig;
use crate::volunteers::domain::{
    Actor, ApplyRequest, ResumeRef, Task, TaskId, UserId, Volunteer, VolunteerId,
};
use crate::volunteers::memory::{
    InMemoryOpportunityCatalog, InMemoryResumeStore, InMemoryVolunteerRepository,
};
use crate::volunteers::notifications::{
    DispatchMode, NotifyError, VolunteerNotice, VolunteerNotifier,
};
use crate::volunteers::opportunity::{LookupError, OpportunityLookup};
use crate::volunteers::repository::{RepositoryError, VolunteerRepository};
use crate::volunteers::service::VolunteerService;

pub(super) const ACTIVE_TASK: TaskId = TaskId(5);
pub(super) const OPEN_TASK: TaskId = TaskId(6);
pub(super) const CLOSED_TASK: TaskId = TaskId(7);
pub(super) const OWNER: UserId = UserId(100);
pub(super) const MANAGER: UserId = UserId(101);
pub(super) const APPLICANT: UserId = UserId(9);
pub(super) const OTHER_APPLICANT: UserId = UserId(10);
pub(super) const STRANGER: UserId = UserId(200);

pub(super) type TestService = VolunteerService<
    InMemoryVolunteerRepository,
    InMemoryOpportunityCatalog,
    RecordingNotifier,
    InMemoryResumeStore,
>;

pub(super) fn actor(id: UserId) -> Actor {
    let name = match id {
        APPLICANT => "Avery",
        OTHER_APPLICANT => "Jordan",
        OWNER => "Olive",
        MANAGER => "Morgan",
        _ => "Sam",
    };
    Actor {
        id,
        name: name.to_string(),
    }
}

pub(super) fn task(id: TaskId, state: &str) -> Task {
    Task {
        id,
        title: format!("Task {}", id.0),
        state: state.to_string(),
        owner_id: OWNER,
        managers: BTreeSet::from([MANAGER]),
    }
}

pub(super) fn catalog() -> InMemoryOpportunityCatalog {
    InMemoryOpportunityCatalog::with_tasks([
        task(ACTIVE_TASK, "in progress"),
        task(OPEN_TASK, "open"),
        task(CLOSED_TASK, "completed"),
    ])
}

pub(super) fn apply_request(task_id: TaskId) -> ApplyRequest {
    ApplyRequest {
        task_id,
        resume_ref: None,
        silent: None,
    }
}

pub(super) fn inline_config() -> VolunteerConfig {
    VolunteerConfig {
        dispatch_mode: DispatchMode::Inline,
        ..VolunteerConfig::default()
    }
}

pub(super) struct Harness {
    pub(super) service: TestService,
    pub(super) repository: Arc<InMemoryVolunteerRepository>,
    pub(super) catalog: Arc<InMemoryOpportunityCatalog>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) resumes: Arc<InMemoryResumeStore>,
}

pub(super) fn harness_with(config: VolunteerConfig) -> Harness {
    let repository = Arc::new(InMemoryVolunteerRepository::default());
    let catalog = Arc::new(catalog());
    let notifier = Arc::new(RecordingNotifier::default());
    let resumes = Arc::new(InMemoryResumeStore::new("https://resumes.test", 60));
    let service = VolunteerService::new(
        repository.clone(),
        catalog.clone(),
        notifier.clone(),
        resumes.clone(),
        &config,
    );
    Harness {
        service,
        repository,
        catalog,
        notifier,
        resumes,
    }
}

pub(super) fn harness() -> Harness {
    harness_with(inline_config())
}

impl Harness {
    pub(super) fn apply_as(&self, user: UserId, task_id: TaskId) -> Volunteer {
        self.service
            .apply(&actor(user), apply_request(task_id))
            .expect("apply succeeds")
            .volunteer
    }

    pub(super) fn stored(&self, id: VolunteerId) -> Option<Volunteer> {
        self.repository.fetch(id).expect("fetch succeeds")
    }

    pub(super) fn add_resume(&self, user: UserId, key: &str) -> ResumeRef {
        let resume = ResumeRef(key.to_string());
        self.resumes.add(user, resume.clone());
        resume
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    notices: Mutex<Vec<VolunteerNotice>>,
}

impl RecordingNotifier {
    pub(super) fn notices(&self) -> Vec<VolunteerNotice> {
        self.notices.lock().expect("notice mutex poisoned").clone()
    }

    pub(super) fn templates(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .map(|notice| notice.template)
            .collect()
    }
}

impl VolunteerNotifier for RecordingNotifier {
    fn send(&self, notice: VolunteerNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notice mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl VolunteerNotifier for FailingNotifier {
    fn send(&self, _notice: VolunteerNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp offline".to_string()))
    }
}

/// Opportunity service whose lookups work but whose notices always fail.
#[derive(Default)]
pub(super) struct MuteOpportunities {
    pub(super) inner: InMemoryOpportunityCatalog,
}

impl OpportunityLookup for MuteOpportunities {
    fn find_by_id(&self, task_id: TaskId) -> Result<Option<Task>, LookupError> {
        self.inner.find_by_id(task_id)
    }

    fn notify_task_applied(&self, _actor: &Actor, _task: &Task) -> Result<(), LookupError> {
        Err(LookupError::Rejected("mailer quota exceeded".to_string()))
    }

    fn notify_task_assigned(&self, _assignee: UserId, _task: &Task) -> Result<(), LookupError> {
        Err(LookupError::Rejected("mailer quota exceeded".to_string()))
    }
}

/// Repository that lets a competing writer commit between the engine's read
/// and its compare-and-swap, once.
#[derive(Default)]
pub(super) struct RacingRepository {
    pub(super) inner: InMemoryVolunteerRepository,
    raced: AtomicBool,
}

impl VolunteerRepository for RacingRepository {
    fn next_id(&self) -> Result<VolunteerId, RepositoryError> {
        self.inner.next_id()
    }

    fn insert(&self, record: Volunteer) -> Result<Volunteer, RepositoryError> {
        self.inner.insert(record)
    }

    fn update(
        &self,
        record: Volunteer,
        expected_version: u64,
    ) -> Result<Volunteer, RepositoryError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            let mut competitor = self
                .inner
                .fetch(record.id)?
                .ok_or(RepositoryError::NotFound)?;
            competitor.assigned = !record.assigned;
            let version = competitor.version;
            self.inner.update(competitor, version)?;
        }
        self.inner.update(record, expected_version)
    }

    fn fetch(&self, id: VolunteerId) -> Result<Option<Volunteer>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn find_by_user_and_task(
        &self,
        user_id: UserId,
        task_id: TaskId,
    ) -> Result<Option<Volunteer>, RepositoryError> {
        self.inner.find_by_user_and_task(user_id, task_id)
    }

    fn remove(&self, id: VolunteerId, expected_version: u64) -> Result<Volunteer, RepositoryError> {
        self.inner.remove(id, expected_version)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
