use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a stored volunteer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolunteerId(pub u64);

/// Identifier of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Identifier of an opportunity (task) volunteers apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

/// Storage key of a resume artifact held by the resume store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeRef(pub String);

impl fmt::Display for VolunteerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Acting identity resolved by the upstream token check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub name: String,
}

/// One user's participation in one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volunteer {
    pub id: VolunteerId,
    pub user_id: UserId,
    pub task_id: TaskId,
    pub assigned: bool,
    pub selected: bool,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_ref: Option<ResumeRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Compare-and-swap token owned by the repository.
    pub version: u64,
}

/// Copy of a volunteer taken immediately before removal.
pub type VolunteerSnapshot = Volunteer;

/// Read-only view of an opportunity as exposed by the opportunity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub state: String,
    pub owner_id: UserId,
    #[serde(default)]
    pub managers: BTreeSet<UserId>,
}

impl Task {
    pub fn is_managed_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id || self.managers.contains(&user_id)
    }

    /// Exact label comparison; state labels are free-form and not normalised.
    pub fn state_is(&self, label: &str) -> bool {
        self.state == label
    }
}

/// Apply request body. `userId` is never read from the payload; the actor
/// applying is always the volunteer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub task_id: TaskId,
    #[serde(default)]
    pub resume_ref: Option<ResumeRef>,
    #[serde(default, deserialize_with = "deserialize_optional_flag")]
    pub silent: Option<bool>,
}

/// Fields the engine needs to create a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVolunteer {
    pub user_id: UserId,
    pub task_id: TaskId,
    pub resume_ref: Option<ResumeRef>,
}

/// General update payload. `id` and `updatedAt` may appear but are engine
/// controlled: a mismatching `id` is rejected and `updatedAt` is discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerUpdate {
    #[serde(default)]
    pub id: Option<VolunteerId>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub task_id: Option<TaskId>,
    #[serde(default)]
    pub resume_ref: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag_or_false")]
    pub remove_resume: bool,
}

/// Manager action against one volunteer of one task. The flag field name
/// differs per route (`assign`, `select`, `complete`) and is aliased here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageRequest {
    pub task_id: TaskId,
    pub volunteer_id: VolunteerId,
    #[serde(
        alias = "assign",
        alias = "select",
        alias = "complete",
        deserialize_with = "deserialize_flag"
    )]
    pub value: bool,
}

/// Body of a selection removal. A `select` field may be present and is
/// ignored; removal always clears the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeselectRequest {
    pub task_id: TaskId,
    pub volunteer_id: VolunteerId,
}

/// Body of a self-service withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub task_id: TaskId,
}

/// Identifies which record a delete targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteSelector {
    /// The applicant withdrawing their own application.
    Own { user_id: UserId, task_id: TaskId },
    /// A manager removing a volunteer from their task.
    Managed { id: VolunteerId, task_id: TaskId },
}

/// Which boolean axis a manager transition targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolunteerFlag {
    Assigned,
    Selected,
    Completed,
}

impl VolunteerFlag {
    pub fn label(self) -> &'static str {
        match self {
            VolunteerFlag::Assigned => "assigned",
            VolunteerFlag::Selected => "selected",
            VolunteerFlag::Completed => "completed",
        }
    }

    pub fn read(self, volunteer: &Volunteer) -> bool {
        match self {
            VolunteerFlag::Assigned => volunteer.assigned,
            VolunteerFlag::Selected => volunteer.selected,
            VolunteerFlag::Completed => volunteer.completed,
        }
    }

    pub(crate) fn write(self, volunteer: &mut Volunteer, value: bool) {
        match self {
            VolunteerFlag::Assigned => volunteer.assigned = value,
            VolunteerFlag::Selected => volunteer.selected = value,
            VolunteerFlag::Completed => volunteer.completed = value,
        }
    }
}

/// Result of a boolean transition. Notification decisions key on the
/// `(before, after)` pair rather than on how many times the call was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagTransition {
    pub flag: VolunteerFlag,
    pub before: bool,
    pub after: bool,
    pub volunteer: Volunteer,
}

impl FlagTransition {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }

    pub fn activated(&self) -> bool {
        !self.before && self.after
    }
}

/// Time-limited download location for a resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseFlag {
    Bool(bool),
    Text(String),
}

fn resolve_flag<E: serde::de::Error>(raw: LooseFlag) -> Result<bool, E> {
    match raw {
        LooseFlag::Bool(value) => Ok(value),
        LooseFlag::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(E::custom(format!(
                "expected a boolean or \"true\"/\"false\", found \"{other}\""
            ))),
        },
    }
}

/// Accepts `true`/`false` as JSON booleans or strings.
pub(crate) fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    resolve_flag(LooseFlag::deserialize(deserializer)?)
}

pub(crate) fn deserialize_flag_or_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_optional_flag(deserializer)?.unwrap_or(false))
}

/// Tri-state flag: absent or `null` is `None`, otherwise a canonical boolean.
pub(crate) fn deserialize_optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<LooseFlag>::deserialize(deserializer)?
        .map(resolve_flag)
        .transpose()
}
