use crate::demo::{run_demo, run_list, run_show, DemoArgs, ListArgs, ShowArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use complaint_desk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Complaint Desk",
    about = "Run the complaint intake and review service, or inspect stored complaints",
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
    /// Walk a complaint through intake, review and appeal against an in-memory store
    Demo(DemoArgs),
    /// Inspect complaints persisted in a slot file
    Complaints {
        #[command(subcommand)]
        command: ComplaintsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ComplaintsCommand {
    /// List complaints in insertion order, optionally filtered by status
    List(ListArgs),
    /// Show the status view for a single reference
    Show(ShowArgs),
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
        Command::Complaints {
            command: ComplaintsCommand::List(args),
        } => run_list(args),
        Command::Complaints {
            command: ComplaintsCommand::Show(args),
        } => run_show(args),
    }
}
