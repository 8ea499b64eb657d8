use crate::infra::{build_collaborators, SAMPLE_MANAGER, SAMPLE_OWNER};
use clap::Args;
use serde::Serialize;
use volunteer_hub::config::VolunteerConfig;
use volunteer_hub::error::AppError;
use volunteer_hub::volunteers::memory::TaskNotice;
use volunteer_hub::volunteers::{
    Actor, ApplyRequest, DispatchMode, ManageRequest, TaskId, UserId, Volunteer, VolunteerError,
    VolunteerNotice,
};

const DEMO_TASK: TaskId = TaskId(1);
const DEMO_APPLICANT: UserId = UserId(9);
const DEMO_STRANGER: UserId = UserId(200);

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the demo task's state before the lifecycle runs (e.g. "open").
    #[arg(long)]
    pub(crate) task_state: Option<String>,
    /// Reject placements on tasks that are not in progress.
    #[arg(long)]
    pub(crate) enforce_active_task: bool,
    /// Apply without sending the thank-you notice.
    #[arg(long)]
    pub(crate) silent: bool,
    /// Print the transcript as JSON instead of text.
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct DemoStep {
    pub(crate) action: &'static str,
    pub(crate) actor: UserId,
    pub(crate) outcome: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DemoTranscript {
    pub(crate) steps: Vec<DemoStep>,
    pub(crate) notices: Vec<VolunteerNotice>,
    pub(crate) task_notices: Vec<TaskNotice>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let json = args.json;
    let transcript = run_script(&args)?;

    if json {
        match serde_json::to_string_pretty(&transcript) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => println!("transcript unavailable: {err}"),
        }
        return Ok(());
    }

    println!("Volunteer lifecycle demo (task {})", DEMO_TASK);
    for (index, step) in transcript.steps.iter().enumerate() {
        println!(
            "{:>2}. {:<10} by user {:<4} -> {}",
            index + 1,
            step.action,
            step.actor,
            step.outcome
        );
    }

    println!("\nVolunteer notices ({})", transcript.notices.len());
    for notice in &transcript.notices {
        println!(
            "  - {} -> user {} (volunteer {})",
            notice.template, notice.recipient, notice.volunteer.id
        );
    }

    println!("Task notices ({})", transcript.task_notices.len());
    for notice in &transcript.task_notices {
        match notice {
            TaskNotice::Applied { task_id, applicant } => {
                println!("  - task {task_id}: user {applicant} applied")
            }
            TaskNotice::Assigned { task_id, assignee } => {
                println!("  - task {task_id}: user {assignee} placed")
            }
        }
    }

    Ok(())
}

/// Drive apply, placement, completion, and withdrawal through the service
/// against in-memory collaborators with inline delivery.
pub(crate) fn run_script(args: &DemoArgs) -> Result<DemoTranscript, AppError> {
    let config = VolunteerConfig {
        dispatch_mode: DispatchMode::Inline,
        enforce_active_task: args.enforce_active_task,
        ..VolunteerConfig::default()
    };
    let collaborators = build_collaborators(&config)?;
    if let Some(state) = &args.task_state {
        collaborators.catalog.set_state(DEMO_TASK, state);
    }
    let service = collaborators.service(&config);

    let applicant = demo_actor(DEMO_APPLICANT, "Avery");
    let manager = demo_actor(SAMPLE_MANAGER, "Morgan");
    let owner = demo_actor(SAMPLE_OWNER, "Olive");
    let stranger = demo_actor(DEMO_STRANGER, "Sam");

    let mut steps = Vec::new();
    let applied = service.apply(
        &applicant,
        ApplyRequest {
            task_id: DEMO_TASK,
            resume_ref: None,
            silent: Some(args.silent),
        },
    );
    let volunteer_id = match applied {
        Ok(applied) => {
            steps.push(step("apply", &applicant, Ok(applied.volunteer.clone())));
            applied.volunteer.id
        }
        Err(err) => {
            steps.push(step("apply", &applicant, Err(err)));
            return Ok(transcript(steps, &collaborators));
        }
    };

    let placement = |value: bool| ManageRequest {
        task_id: DEMO_TASK,
        volunteer_id,
        value,
    };

    steps.push(step("assign", &manager, service.assign(&manager, placement(true))));
    steps.push(step("assign", &manager, service.assign(&manager, placement(true))));
    steps.push(step("select", &owner, service.select(&owner, placement(true))));
    steps.push(step("assign", &stranger, service.assign(&stranger, placement(false))));
    steps.push(step("complete", &manager, service.complete(&manager, placement(true))));
    steps.push(step("withdraw", &applicant, service.withdraw(&applicant, DEMO_TASK)));

    Ok(transcript(steps, &collaborators))
}

fn demo_actor(id: UserId, name: &str) -> Actor {
    Actor {
        id,
        name: name.to_string(),
    }
}

fn step(
    action: &'static str,
    actor: &Actor,
    result: Result<Volunteer, VolunteerError>,
) -> DemoStep {
    let outcome = match result {
        Ok(volunteer) => format!(
            "volunteer {} assigned={} selected={} completed={} (v{})",
            volunteer.id,
            volunteer.assigned,
            volunteer.selected,
            volunteer.completed,
            volunteer.version
        ),
        Err(err) => format!("rejected: {err}"),
    };
    DemoStep {
        action,
        actor: actor.id,
        outcome,
    }
}

fn transcript(steps: Vec<DemoStep>, collaborators: &crate::infra::Collaborators) -> DemoTranscript {
    DemoTranscript {
        steps,
        notices: collaborators.notifier.sent(),
        task_notices: collaborators.catalog.notices(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volunteer_hub::volunteers::notifications::{APPLIED_TEMPLATE, WITHDRAWN_TEMPLATE};

    #[test]
    fn demo_walks_full_lifecycle() {
        let transcript = run_script(&DemoArgs::default()).expect("demo runs");

        let actions: Vec<_> = transcript.steps.iter().map(|step| step.action).collect();
        assert_eq!(
            actions,
            vec!["apply", "assign", "assign", "select", "assign", "complete", "withdraw"]
        );
        assert!(transcript.steps[4].outcome.starts_with("rejected"));
        assert!(transcript.steps[5].outcome.contains("completed=true"));

        let templates: Vec<_> = transcript
            .notices
            .iter()
            .map(|notice| notice.template.as_str())
            .collect();
        assert_eq!(templates, vec![APPLIED_TEMPLATE, WITHDRAWN_TEMPLATE]);

        let placements = transcript
            .task_notices
            .iter()
            .filter(|notice| matches!(notice, TaskNotice::Assigned { .. }))
            .count();
        assert_eq!(placements, 2, "one for assign, one for select");
    }

    #[test]
    fn demo_on_closed_task_stops_after_apply() {
        let args = DemoArgs {
            task_state: Some("completed".to_string()),
            ..DemoArgs::default()
        };
        let transcript = run_script(&args).expect("demo runs");

        assert_eq!(transcript.steps.len(), 1);
        assert!(transcript.steps[0].outcome.starts_with("rejected"));
        assert!(transcript.notices.is_empty());
    }

    #[test]
    fn enforced_rule_rejects_placement_on_open_task() {
        let args = DemoArgs {
            task_state: Some("open".to_string()),
            enforce_active_task: true,
            silent: true,
            ..DemoArgs::default()
        };
        let transcript = run_script(&args).expect("demo runs");

        assert!(transcript.steps[1].outcome.starts_with("rejected"));
        assert!(transcript.task_notices.is_empty());
        assert_eq!(transcript.notices.len(), 1, "only the withdrawal notice");
    }
}
