mod api;
mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "stepper",
    about = "Load named robot actions and drive one at a time against an execution service",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .stepper/)
    #[arg(long, global = true, env = "STEPPER_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .stepper/config.yaml and a sample action package
    Init {
        /// Address of the execution service
        #[arg(long, env = "STEPPER_ACTION_SERVER", default_value = "http://localhost:8090")]
        action_server: String,
    },

    /// Run the dispatcher, its driving loop and the HTTP API
    Serve {
        /// Port to listen on (default: server.port from config; 0 = OS-assigned)
        #[arg(long)]
        port: Option<u16>,

        /// Override the configured execution service address
        #[arg(long, env = "STEPPER_ACTION_SERVER")]
        action_server: Option<String>,
    },

    /// List actions in the catalog
    Actions {
        /// Only show members of this collection
        #[arg(long)]
        collection: Option<String>,
    },

    /// List collections in the catalog
    Collections,

    /// Show one action's descriptor
    Show { id: String },

    /// Ask a running server to load and run an action
    Send {
        id: String,

        /// Server URL (default: http://localhost:<server.port>)
        #[arg(long, env = "STEPPER_SERVER")]
        server: Option<String>,
    },

    /// Ask a running server to stop and drop its action
    Reset {
        #[arg(long, env = "STEPPER_SERVER")]
        server: Option<String>,
    },

    /// Show the action installed in a running server
    Status {
        #[arg(long, env = "STEPPER_SERVER")]
        server: Option<String>,
    },

    /// Ask a running server to rescan its catalog
    Update {
        #[arg(long, env = "STEPPER_SERVER")]
        server: Option<String>,
    },

    /// Validate the config and the catalog
    Check,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { action_server } => cmd::init::run(&root, &action_server),
        Commands::Serve {
            port,
            action_server,
        } => cmd::serve::run(&root, port, action_server.as_deref()),
        Commands::Actions { collection } => {
            cmd::catalog::list_actions(&root, collection.as_deref(), cli.json)
        }
        Commands::Collections => cmd::catalog::list_collections(&root, cli.json),
        Commands::Show { id } => cmd::catalog::show(&root, &id, cli.json),
        Commands::Send { id, server } => cmd::control::send(&root, server.as_deref(), &id, cli.json),
        Commands::Reset { server } => cmd::control::reset(&root, server.as_deref(), cli.json),
        Commands::Status { server } => cmd::control::status(&root, server.as_deref(), cli.json),
        Commands::Update { server } => cmd::control::update(&root, server.as_deref(), cli.json),
        Commands::Check => cmd::check::run(&root, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
