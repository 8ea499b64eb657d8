use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use volunteer_hub::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Volunteer Hub",
    about = "Serve the volunteer lifecycle API or walk through a scripted demo",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run apply, assign, select, complete, and withdraw against in-memory collaborators
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["volunteer-hub-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn demo_flags_parse() {
        let cli = Cli::try_parse_from([
            "volunteer-hub-api",
            "demo",
            "--task-state",
            "open",
            "--enforce-active-task",
            "--json",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Demo(args)) => {
                assert_eq!(args.task_state.as_deref(), Some("open"));
                assert!(args.enforce_active_task);
                assert!(args.json);
                assert!(!args.silent);
            }
            other => panic!("expected demo command, got {other:?}"),
        }
    }

    #[test]
    fn serve_overrides_parse() {
        let cli = Cli::try_parse_from(["volunteer-hub-api", "serve", "--port", "8080"])
            .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.port, Some(8080));
                assert!(args.host.is_none());
            }
            other => panic!("expected serve command, got {other:?}"),
        }
    }
}
