use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use volunteer_hub::config::VolunteerConfig;
use volunteer_hub::error::AppError;
use volunteer_hub::volunteers::memory::{
    InMemoryOpportunityCatalog, InMemoryResumeStore, InMemoryVolunteerRepository,
};
use volunteer_hub::volunteers::{
    NotifyError, Task, TaskId, UserId, VolunteerNotice, VolunteerNotifier, VolunteerService,
};

pub(crate) type ApiService = VolunteerService<
    InMemoryVolunteerRepository,
    InMemoryOpportunityCatalog,
    LoggingNotifier,
    InMemoryResumeStore,
>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Notifier that writes each notice to the log and keeps a copy.
#[derive(Default)]
pub(crate) struct LoggingNotifier {
    sent: Mutex<Vec<VolunteerNotice>>,
}

impl LoggingNotifier {
    pub(crate) fn sent(&self) -> Vec<VolunteerNotice> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl VolunteerNotifier for LoggingNotifier {
    fn send(&self, notice: VolunteerNotice) -> Result<(), NotifyError> {
        info!(
            template = %notice.template,
            recipient = %notice.recipient,
            volunteer_id = %notice.volunteer.id,
            "volunteer notice sent"
        );
        self.sent
            .lock()
            .map_err(|_| NotifyError::Transport("notice log poisoned".to_string()))?
            .push(notice);
        Ok(())
    }
}

/// In-process collaborators backing one service instance.
pub(crate) struct Collaborators {
    pub(crate) repository: Arc<InMemoryVolunteerRepository>,
    pub(crate) catalog: Arc<InMemoryOpportunityCatalog>,
    pub(crate) notifier: Arc<LoggingNotifier>,
    pub(crate) resumes: Arc<InMemoryResumeStore>,
}

impl Collaborators {
    pub(crate) fn service(&self, config: &VolunteerConfig) -> ApiService {
        VolunteerService::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.catalog),
            Arc::clone(&self.notifier),
            Arc::clone(&self.resumes),
            config,
        )
    }
}

/// Build collaborators, seeding the task catalog from `tasks_path` when set
/// and from [`sample_tasks`] otherwise.
pub(crate) fn build_collaborators(config: &VolunteerConfig) -> Result<Collaborators, AppError> {
    let catalog = match &config.tasks_path {
        Some(path) => {
            let file = File::open(path)?;
            let catalog = InMemoryOpportunityCatalog::from_reader(BufReader::new(file))?;
            info!(path = %path.display(), "task catalog loaded");
            catalog
        }
        None => {
            warn!("VOLUNTEER_TASKS_PATH not set; seeding sample tasks");
            InMemoryOpportunityCatalog::with_tasks(sample_tasks())
        }
    };

    Ok(Collaborators {
        repository: Arc::new(InMemoryVolunteerRepository::default()),
        catalog: Arc::new(catalog),
        notifier: Arc::new(LoggingNotifier::default()),
        resumes: Arc::new(InMemoryResumeStore::new(
            config.resume_base_url.clone(),
            config.resume_url_ttl_secs,
        )),
    })
}

pub(crate) const SAMPLE_OWNER: UserId = UserId(100);
pub(crate) const SAMPLE_MANAGER: UserId = UserId(101);

pub(crate) fn sample_tasks() -> Vec<Task> {
    [
        (1, "Community garden cleanup", "in progress"),
        (2, "Food bank intake shift", "open"),
        (3, "Spring fundraiser", "completed"),
    ]
    .into_iter()
    .map(|(id, title, state)| Task {
        id: TaskId(id),
        title: title.to_string(),
        state: state.to_string(),
        owner_id: SAMPLE_OWNER,
        managers: BTreeSet::from([SAMPLE_MANAGER]),
    })
    .collect()
}
