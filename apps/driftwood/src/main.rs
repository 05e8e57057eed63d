use std::{io::IsTerminal, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{FilterMode, HttpRemoteService, RemoteService, SimulationLab};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod console;
mod render;
mod scenario_file;
mod shell;

use console::Console;
use render::Style;
use scenario_file::ScenarioFile;

#[derive(Parser, Debug)]
#[command(name = "driftwood", about = "Terminal client for the Driftwood simulation lab")]
struct Cli {
    /// Settings file; defaults to ./driftwood.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    server_url: Option<String>,
    /// Disable colors and text styling.
    #[arg(long, global = true)]
    plain: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session (default).
    Shell,
    /// Create a scenario from a TOML file and run it.
    Run { file: PathBuf },
    History {
        #[arg(long)]
        starred: bool,
    },
    Show { run: String },
    Star { run: String },
    Unstar { run: String },
    Delete {
        run: String,
        #[arg(long)]
        yes: bool,
    },
    /// Delete every unstarred run.
    Purge {
        #[arg(long)]
        yes: bool,
    },
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let settings = config::load_settings(cli.config.as_deref(), cli.server_url.as_deref())?;
    let remote = HttpRemoteService::new(&settings.server_url, settings.request_timeout())
        .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
    info!(server_url = remote.server_url(), "driftwood: backend configured");
    let lab = SimulationLab::new(
        Arc::new(remote) as Arc<dyn RemoteService>,
        settings.draft_defaults.clone(),
    );
    let style = Style {
        ansi: !cli.plain && std::io::stdout().is_terminal(),
    };
    let mut console = Console::new(lab.subscribe_events(), style);

    let outcome = match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => shell::run(&lab, &mut console).await,
        Command::Run { file } => {
            let scenario = ScenarioFile::load(&file)?;
            scenario.apply(&lab).await?;
            console.discard();
            lab.submit_draft().await.map(|_| ()).map_err(Into::into)
        }
        Command::History { starred } => {
            if starred {
                lab.set_history_filter(FilterMode::Starred).await;
            }
            lab.refresh_history().await.map(|_| ()).map_err(Into::into)
        }
        Command::Show { run } => match shell::resolve_run(&lab, &mut console, &run).await {
            Ok(id) => lab.view_run(id).await.map(|_| ()).map_err(Into::into),
            Err(err) => Err(err),
        },
        Command::Star { run } => set_star(&lab, &mut console, &run, true).await,
        Command::Unstar { run } => set_star(&lab, &mut console, &run, false).await,
        Command::Delete { run, yes } => match shell::resolve_run(&lab, &mut console, &run).await {
            Ok(id) => shell::delete_with_confirmation(&lab, &mut console, id, yes).await,
            Err(err) => Err(err),
        },
        Command::Purge { yes } => shell::purge_with_confirmation(&lab, &mut console, yes).await,
        Command::Health => match lab.health().await {
            Ok(health) => {
                println!("{}: {}", health.status, health.message);
                Ok(())
            }
            Err(err) => Err(err.into()),
        },
    };
    console.flush();
    outcome
}

async fn set_star(
    lab: &SimulationLab,
    console: &mut Console,
    needle: &str,
    starred: bool,
) -> Result<()> {
    let id = shell::resolve_run(lab, console, needle).await?;
    lab.toggle_star(id, starred).await?;
    Ok(())
}
