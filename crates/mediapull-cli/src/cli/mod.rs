//! CLI for the MediaPull batch media fetcher.

mod commands;
mod control_socket;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mediapull_core::config::{self, MediaPullConfig};
use mediapull_core::engine::EngineLauncher;
use mediapull_core::job_db::JobDb;
use mediapull_core::progress::ProgressHub;
use mediapull_core::{Supervisor, SupervisorSettings};
use std::path::PathBuf;

use commands::{
    run_add, run_completions, run_cookies, run_info, run_list, run_manpage, run_open,
    run_open_root, run_pause, run_remove, run_resume, run_status, run_update_engine, AddArgs,
};

/// Top-level CLI for MediaPull.
#[derive(Debug, Parser)]
#[command(name = "mediapull")]
#[command(about = "MediaPull: resumable batch downloads through yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Create a batch job from one or more URLs.
    Add(AddArgs),

    /// Run jobs in the foreground until they finish or are paused.
    Resume {
        /// Job identifiers.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Pause a job. Reaches a foreground `resume` in another shell if one is running.
    Pause {
        /// Job identifier.
        id: String,
    },

    /// Show one job and its items.
    Status {
        /// Job identifier.
        id: String,
    },

    /// List jobs, running and paused ones first.
    List {
        /// Show at most N jobs.
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Remove a job (and optionally its completed files) by ID.
    Remove {
        /// Job identifier.
        id: String,
        /// Also delete completed output files and their leftovers.
        #[arg(long)]
        delete_files: bool,
    },

    /// Open a job's folder in the file manager.
    Open {
        /// Job identifier.
        id: String,
    },

    /// Open the download root in the file manager.
    OpenRoot,

    /// Print the engine's metadata for a URL as JSON.
    Info {
        /// Video or playlist URL.
        url: String,
    },

    /// Run the engine's self-update.
    UpdateEngine,

    /// Install a Netscape cookie file for the engine, or clear it.
    Cookies {
        /// Cookie file to copy in.
        #[arg(required_unless_present = "clear", conflicts_with = "clear")]
        file: Option<PathBuf>,
        /// Remove the stored cookies.
        #[arg(long)]
        clear: bool,
    },

    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Print the man page (roff).
    Manpage,
}

/// Wire the supervisor from config: store, engine launcher, progress hub.
async fn build_supervisor(cfg: &MediaPullConfig) -> Result<Supervisor> {
    let db = JobDb::open_default().await?;
    let hub = ProgressHub::new();
    let launcher = EngineLauncher::from_config(cfg, hub.clone())?;
    let settings = SupervisorSettings::from_config(cfg)?;
    Ok(Supervisor::new(db, launcher, hub, settings))
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        // These need neither config nor the job store.
        match &cli.command {
            CliCommand::Completions { shell } => return run_completions(*shell),
            CliCommand::Manpage => return run_manpage(),
            _ => {}
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let sup = build_supervisor(&cfg).await?;

        match cli.command {
            CliCommand::Add(args) => run_add(&sup, args).await?,
            CliCommand::Resume { ids } => run_resume(&sup, &ids).await?,
            CliCommand::Pause { id } => run_pause(&sup, &id).await?,
            CliCommand::Status { id } => run_status(&sup, &id).await?,
            CliCommand::List { limit } => run_list(&sup, limit).await?,
            CliCommand::Remove { id, delete_files } => run_remove(&sup, &id, delete_files).await?,
            CliCommand::Open { id } => run_open(&sup, &id).await?,
            CliCommand::OpenRoot => run_open_root(&sup).await?,
            CliCommand::Info { url } => run_info(&sup, &url).await?,
            CliCommand::UpdateEngine => run_update_engine(&sup).await?,
            CliCommand::Cookies { file, clear } => run_cookies(&sup, file.as_deref(), clear).await?,
            CliCommand::Completions { .. } | CliCommand::Manpage => {}
        }

        Ok(())
    }
}
