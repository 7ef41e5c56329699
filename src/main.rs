use anyhow::{Context, Result};
use asset_tagger::{
    attributes::JsonAttributeStore,
    config::{self, Config},
    estimate::{CostEstimate, TiktokenCounter},
    filter,
    folder::{plan_folders, FolderTagger},
    llm::OpenAiClient,
    pipeline::{Collaborators, Confirmation, Decision, RunOutcome, RunSettings, TaggingRun},
    progress::ConsoleProgress,
    thumbnail::ImageThumbnailProvider,
    TaggerError,
};
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "asset-tagger")]
#[command(about = "Tag game assets and asset folders with AI-generated types, genres and objects")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to config/settings.toml or ~/.config/asset-tagger/settings.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag files from their previews; folders are expanded recursively
    Files {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Leave files that already have AI-Types tags alone
        #[arg(long)]
        skip_existing: bool,
    },
    /// Tag folders from their file listing
    Folders {
        /// Folders to tag (defaults to the current directory)
        #[arg(value_name = "DIR")]
        dirs: Vec<PathBuf>,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the tags stored for a path
    Show {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

/// Terminal confirmation of the estimated cost
struct DialogConfirmation {
    assume_yes: bool,
    skip_existing: bool,
}

impl Confirmation for DialogConfirmation {
    fn confirm(&self, estimate: &CostEstimate) -> Result<Decision> {
        println!("{}", estimate);
        if self.assume_yes {
            return Ok(Decision::Proceed {
                skip_existing: self.skip_existing,
            });
        }

        let proceed = Confirm::new()
            .with_prompt("Proceed with tagging?")
            .default(false)
            .interact()
            .context("Failed to read user input")?;
        if !proceed {
            return Ok(Decision::Cancel);
        }

        let skip_existing = Confirm::new()
            .with_prompt("Skip files that already have tags?")
            .default(self.skip_existing)
            .interact()
            .context("Failed to read user input")?;
        Ok(Decision::Proceed { skip_existing })
    }
}

fn init_logging(debug_log: bool) {
    let level = if debug_log { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,asset_tagger={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
}

fn absolute(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .map(|path| path.canonicalize().unwrap_or(path))
        .collect()
}

/// Progress bars whose cancel flag is raised by Ctrl-C
fn console_progress() -> ConsoleProgress {
    let progress = ConsoleProgress::new();
    let handle = progress.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancelling after the current step");
            handle.cancel();
        }
    });
    progress
}

async fn open_store(config: &Config) -> Result<JsonAttributeStore> {
    let path = config.store.resolved_path();
    JsonAttributeStore::open(&path)
        .await
        .with_context(|| format!("Failed to open attribute store: {}", path.display()))
}

async fn tag_files(config: &Config, paths: Vec<PathBuf>, yes: bool, skip_existing: bool) -> Result<()> {
    let backend = OpenAiClient::from_config(config)?;
    let settings = RunSettings::from_config(config)?;

    let (folders, files): (Vec<PathBuf>, Vec<PathBuf>) = absolute(paths).into_iter().partition(|p| p.is_dir());
    let selection = filter::expand_selection(&files, &folders);

    let store = open_store(config).await?;
    let mut thumbnails = ImageThumbnailProvider::new(config.thumbnails.render_size);
    if let Some(dir) = &config.thumbnails.existing_dir {
        thumbnails = thumbnails.with_existing_dir(config::expand_path(dir));
    }
    let tokens = TiktokenCounter::for_model(backend.model())?;
    let progress = console_progress();
    let confirmation = DialogConfirmation {
        assume_yes: yes,
        skip_existing: skip_existing || config.files.skip_existing,
    };

    let env = Collaborators {
        thumbnails: &thumbnails,
        store: &store,
        backend: &backend,
        tokens: &tokens,
        progress: &progress,
        confirmation: &confirmation,
    };
    let mut run = TaggingRun::new(env, settings);
    match run.run(selection).await? {
        RunOutcome::Cancelled(report) => println!(
            "Cancelled after tagging {} file(s) in {} request(s)",
            report.files_tagged, report.batches_completed
        ),
        RunOutcome::Completed(report) => println!(
            "Tagged {} file(s) in {} request(s)",
            report.files_tagged, report.batches_completed
        ),
    }
    Ok(())
}

async fn tag_folders(config: &Config, dirs: Vec<PathBuf>, yes: bool) -> Result<()> {
    let backend = OpenAiClient::from_config(config)?;
    let categories = config.folder_categories()?;

    let dirs = if dirs.is_empty() {
        vec![std::env::current_dir().context("Failed to read current directory")?]
    } else {
        absolute(dirs)
    };

    let tokens = TiktokenCounter::for_model(backend.model())?;
    let progress = console_progress();
    let plan = plan_folders(&dirs, &categories, &tokens, &config.pricing, &progress);
    if plan.requests.is_empty() {
        return Err(TaggerError::NoSupportedFiles.into());
    }

    println!("{}", plan.estimate);
    if !yes {
        let proceed = Confirm::new()
            .with_prompt("Proceed with tagging?")
            .default(false)
            .interact()
            .context("Failed to read user input")?;
        if !proceed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let store = open_store(config).await?;
    let report = FolderTagger::new(&backend, &store, categories)
        .tag_folders(&plan, &progress)
        .await?;

    for (path, reason) in &report.failed {
        eprintln!("{}: {}", path.display(), reason);
    }
    if report.cancelled {
        println!("Cancelled.");
    }
    println!("Tagged {} folder(s)", report.tagged.len());
    Ok(())
}

async fn show(config: &Config, path: PathBuf) -> Result<()> {
    let store = open_store(config).await?;
    let path = path.canonicalize().unwrap_or(path);
    let values = store.values_for(&path).await;

    if values.is_empty() {
        println!("No tags stored for {}", path.display());
        return Ok(());
    }
    for (attribute, tags) in values {
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        println!("{}: {}", attribute, names.join(", "));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(config.debug_log);

    let result = match cli.command {
        Commands::Files {
            paths,
            yes,
            skip_existing,
        } => tag_files(&config, paths, yes, skip_existing).await,
        Commands::Folders { dirs, yes } => tag_folders(&config, dirs, yes).await,
        Commands::Show { path } => show(&config, path).await,
    };

    if let Err(e) = &result {
        error!(error = %e, "Run failed");
    }
    result
}
