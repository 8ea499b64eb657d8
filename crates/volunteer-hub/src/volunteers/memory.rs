//! In-process collaborators used by the API binary, the demo, and tests.

use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::info;

use super::domain::{Actor, ResumeRef, SignedUrl, Task, TaskId, UserId, Volunteer, VolunteerId};
use super::opportunity::{LookupError, OpportunityLookup};
use super::repository::{RepositoryError, VolunteerRepository};
use super::resumes::{ResumeStore, ResumeStoreError};

#[derive(Default)]
pub struct InMemoryVolunteerRepository {
    records: Mutex<HashMap<VolunteerId, Volunteer>>,
    last_issued: AtomicU64,
}

impl InMemoryVolunteerRepository {
    /// Repository pre-loaded with existing records, e.g. from an import.
    pub fn with_records(records: impl IntoIterator<Item = Volunteer>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().map(|record| (record.id, record)).collect()),
            last_issued: AtomicU64::new(0),
        }
    }

    fn records(&self) -> Result<MutexGuard<'_, HashMap<VolunteerId, Volunteer>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.records().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VolunteerRepository for InMemoryVolunteerRepository {
    fn next_id(&self) -> Result<VolunteerId, RepositoryError> {
        let records = self.records()?;
        let highest_stored = records.keys().map(|id| id.0).max().unwrap_or(0);
        let id = highest_stored.max(self.last_issued.load(Ordering::SeqCst)) + 1;
        self.last_issued.store(id, Ordering::SeqCst);
        Ok(VolunteerId(id))
    }

    fn insert(&self, record: Volunteer) -> Result<Volunteer, RepositoryError> {
        let mut records = self.records()?;
        let duplicate = records.contains_key(&record.id)
            || records.values().any(|existing| {
                existing.user_id == record.user_id && existing.task_id == record.task_id
            });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        records.insert(record.id, record.clone());
        Ok(record)
    }

    fn update(
        &self,
        mut record: Volunteer,
        expected_version: u64,
    ) -> Result<Volunteer, RepositoryError> {
        let mut records = self.records()?;
        let stored = records.get_mut(&record.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::Conflict);
        }
        record.version = expected_version + 1;
        *stored = record.clone();
        Ok(record)
    }

    fn fetch(&self, id: VolunteerId) -> Result<Option<Volunteer>, RepositoryError> {
        Ok(self.records()?.get(&id).cloned())
    }

    fn find_by_user_and_task(
        &self,
        user_id: UserId,
        task_id: TaskId,
    ) -> Result<Option<Volunteer>, RepositoryError> {
        Ok(self
            .records()?
            .values()
            .find(|record| record.user_id == user_id && record.task_id == task_id)
            .cloned())
    }

    fn remove(&self, id: VolunteerId, expected_version: u64) -> Result<Volunteer, RepositoryError> {
        let mut records = self.records()?;
        let stored_version = records
            .get(&id)
            .map(|stored| stored.version)
            .ok_or(RepositoryError::NotFound)?;
        if stored_version != expected_version {
            return Err(RepositoryError::Conflict);
        }
        records.remove(&id).ok_or(RepositoryError::NotFound)
    }
}

/// Task-scoped notice recorded by [`InMemoryOpportunityCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskNotice {
    Applied { task_id: TaskId, applicant: UserId },
    Assigned { task_id: TaskId, assignee: UserId },
}

#[derive(Default)]
pub struct InMemoryOpportunityCatalog {
    tasks: RwLock<HashMap<TaskId, Task>>,
    notices: Mutex<Vec<TaskNotice>>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read task catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("task catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl InMemoryOpportunityCatalog {
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let catalog = Self::default();
        for task in tasks {
            catalog.upsert(task);
        }
        catalog
    }

    /// Load a JSON array of tasks.
    pub fn from_reader<Rd: Read>(reader: Rd) -> Result<Self, CatalogError> {
        let tasks: Vec<Task> = serde_json::from_reader(reader)?;
        Ok(Self::with_tasks(tasks))
    }

    pub fn upsert(&self, task: Task) {
        if let Ok(mut tasks) = self.tasks.write() {
            tasks.insert(task.id, task);
        }
    }

    /// Change a task's state label, returning whether the task exists.
    pub fn set_state(&self, task_id: TaskId, state: &str) -> bool {
        match self.tasks.write() {
            Ok(mut tasks) => match tasks.get_mut(&task_id) {
                Some(task) => {
                    task.state = state.to_string();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    pub fn notices(&self) -> Vec<TaskNotice> {
        self.notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }

    fn record(&self, notice: TaskNotice) -> Result<(), LookupError> {
        self.notices
            .lock()
            .map_err(|_| LookupError::Unavailable("notice log poisoned".to_string()))?
            .push(notice);
        Ok(())
    }
}

impl OpportunityLookup for InMemoryOpportunityCatalog {
    fn find_by_id(&self, task_id: TaskId) -> Result<Option<Task>, LookupError> {
        let tasks = self
            .tasks
            .read()
            .map_err(|_| LookupError::Unavailable("task catalog poisoned".to_string()))?;
        Ok(tasks.get(&task_id).cloned())
    }

    fn notify_task_applied(&self, actor: &Actor, task: &Task) -> Result<(), LookupError> {
        info!(task_id = %task.id, applicant = %actor.id, "task applied notice");
        self.record(TaskNotice::Applied {
            task_id: task.id,
            applicant: actor.id,
        })
    }

    fn notify_task_assigned(&self, assignee: UserId, task: &Task) -> Result<(), LookupError> {
        info!(task_id = %task.id, assignee = %assignee, "task assigned notice");
        self.record(TaskNotice::Assigned {
            task_id: task.id,
            assignee,
        })
    }
}

/// Resume store issuing expiring URLs under a fixed base.
pub struct InMemoryResumeStore {
    base_url: String,
    ttl: Duration,
    resumes: RwLock<HashMap<UserId, Vec<ResumeRef>>>,
}

impl InMemoryResumeStore {
    pub fn new(base_url: impl Into<String>, ttl_secs: i64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ttl: Duration::seconds(ttl_secs),
            resumes: RwLock::new(HashMap::new()),
        }
    }

    pub fn add(&self, user_id: UserId, resume: ResumeRef) {
        if let Ok(mut resumes) = self.resumes.write() {
            resumes.entry(user_id).or_default().push(resume);
        }
    }
}

impl ResumeStore for InMemoryResumeStore {
    fn resumes_for(&self, user_id: UserId) -> Result<Vec<ResumeRef>, ResumeStoreError> {
        let resumes = self
            .resumes
            .read()
            .map_err(|_| ResumeStoreError::Unavailable("resume index poisoned".to_string()))?;
        Ok(resumes.get(&user_id).cloned().unwrap_or_default())
    }

    fn signed_url(&self, resume: &ResumeRef) -> Result<Option<SignedUrl>, ResumeStoreError> {
        let resumes = self
            .resumes
            .read()
            .map_err(|_| ResumeStoreError::Unavailable("resume index poisoned".to_string()))?;
        if !resumes.values().flatten().any(|stored| stored == resume) {
            return Ok(None);
        }

        let expires_at = Utc::now() + self.ttl;
        Ok(Some(SignedUrl {
            url: format!(
                "{}/{}?expires={}",
                self.base_url,
                resume.0,
                expires_at.timestamp()
            ),
            expires_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volunteer(id: u64, user: u64, task: u64) -> Volunteer {
        let now = Utc::now();
        Volunteer {
            id: VolunteerId(id),
            user_id: UserId(user),
            task_id: TaskId(task),
            assigned: false,
            selected: false,
            completed: false,
            resume_ref: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[test]
    fn insert_rejects_second_record_for_same_user_and_task() {
        let repository = InMemoryVolunteerRepository::default();
        repository.insert(volunteer(1, 9, 5)).expect("first insert");
        assert!(matches!(
            repository.insert(volunteer(2, 9, 5)),
            Err(RepositoryError::Conflict)
        ));
        repository.insert(volunteer(3, 9, 6)).expect("other task");
        assert_eq!(repository.len(), 2);
    }

    #[test]
    fn issued_ids_skip_seeded_records() {
        let repository =
            InMemoryVolunteerRepository::with_records([volunteer(1, 9, 5), volunteer(7, 10, 5)]);

        let first = repository.next_id().expect("id issued");
        let second = repository.next_id().expect("id issued");
        assert_eq!(first, VolunteerId(8));
        assert_eq!(second, VolunteerId(9));

        repository.remove(VolunteerId(7), 1).expect("remove");
        assert_eq!(repository.next_id().expect("id issued"), VolunteerId(10));
    }

    #[test]
    fn update_is_compare_and_swap() {
        let repository = InMemoryVolunteerRepository::default();
        let stored = repository.insert(volunteer(1, 9, 5)).expect("insert");

        let mut first = stored.clone();
        first.assigned = true;
        let first = repository.update(first, 1).expect("first writer wins");
        assert_eq!(first.version, 2);

        let mut stale = stored;
        stale.assigned = false;
        assert!(matches!(
            repository.update(stale, 1),
            Err(RepositoryError::Conflict)
        ));

        let current = repository.fetch(VolunteerId(1)).unwrap().unwrap();
        assert!(current.assigned);
        assert_eq!(current.version, 2);
    }

    #[test]
    fn remove_checks_version_and_returns_record() {
        let repository = InMemoryVolunteerRepository::default();
        repository.insert(volunteer(1, 9, 5)).expect("insert");
        assert!(matches!(
            repository.remove(VolunteerId(1), 7),
            Err(RepositoryError::Conflict)
        ));
        let removed = repository.remove(VolunteerId(1), 1).expect("removed");
        assert_eq!(removed.user_id, UserId(9));
        assert!(repository.is_empty());
    }

    #[test]
    fn catalog_loads_json_tasks() {
        let json = r#"[{"id": 5, "title": "Park cleanup", "state": "open", "ownerId": 1, "managers": [2]}]"#;
        let catalog = InMemoryOpportunityCatalog::from_reader(json.as_bytes()).expect("parses");
        let task = catalog.find_by_id(TaskId(5)).unwrap().expect("task present");
        assert!(task.is_managed_by(UserId(2)));
        assert!(catalog.set_state(TaskId(5), "in progress"));
        assert!(!catalog.set_state(TaskId(6), "in progress"));
    }

    #[test]
    fn resume_store_only_signs_known_artifacts() {
        let store = InMemoryResumeStore::new("https://resumes.test/", 60);
        store.add(UserId(9), ResumeRef("9/cv.pdf".to_string()));

        let signed = store
            .signed_url(&ResumeRef("9/cv.pdf".to_string()))
            .unwrap()
            .expect("known resume");
        assert!(signed.url.starts_with("https://resumes.test/9/cv.pdf?expires="));
        assert!(store
            .signed_url(&ResumeRef("missing.pdf".to_string()))
            .unwrap()
            .is_none());
    }
}
