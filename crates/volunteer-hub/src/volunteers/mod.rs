//! Volunteer lifecycle: authorization, state transitions, post-commit
//! notifications, and resume access.

pub mod domain;
pub mod engine;
pub mod error;
pub mod memory;
pub mod notifications;
pub mod opportunity;
pub mod policy;
pub mod repository;
pub mod resumes;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Actor, ApplyRequest, DeleteSelector, DeselectRequest, FlagTransition, ManageRequest,
    NewVolunteer, ResumeRef, SignedUrl, Task, TaskId, UserId, Volunteer, VolunteerFlag,
    VolunteerId, VolunteerSnapshot, VolunteerUpdate, WithdrawRequest,
};
pub use engine::VolunteerLifecycleEngine;
pub use error::{FieldError, VolunteerError};
pub use notifications::{
    DispatchMode, NotificationDispatcher, NotifyError, VolunteerNotice, VolunteerNotifier,
};
pub use opportunity::{LookupError, OpportunityLookup};
pub use policy::{AssignmentRule, AuthorizationPolicy};
pub use repository::{RepositoryError, VolunteerRepository};
pub use resumes::{ResumeAccessGateway, ResumeStore, ResumeStoreError};
pub use router::volunteer_router;
pub use service::{AppliedVolunteer, VolunteerService};
