//! # Briefing CLI (`brief`)
//!
//! Terminal client for a summarization and RAG backend. Each command
//! drives one of the library's controllers against the configured
//! backend and prints the rendered outcome.
//!
//! ## Usage
//!
//! ```bash
//! brief --config ./config/brief.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `brief summarize --url <u>` | Summarize a web page |
//! | `brief summarize --text <t>` | Summarize pasted text |
//! | `brief summarize --file <f>` | Upload a PDF or text file and summarize it |
//! | `brief generate "<message>"` | Ask a question against the indexed documents |
//! | `brief prompt show\|set\|clear` | Manage the persisted system prompt |
//! | `brief collections list` | Show indexed collections |
//! | `brief collections purge <source>` | Delete documents by exact source |
//! | `brief health` | Check that the backend is reachable |
//! | `brief completions <shell>` | Print shell completions |
//!
//! A missing config file is not an error: the backend defaults to
//! `http://127.0.0.1:8000` and can be overridden with `BRIEF_BASE_URL`.

use anyhow::{bail, Result};
use clap::{ArgGroup, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use briefing::admin::AdminController;
use briefing::config::{self, Config};
use briefing::display;
use briefing::generate::GenerateSession;
use briefing::models::{Detail, GenerationParams, StagedFile, Temperature};
use briefing::prefs::{FilePreferenceStore, PreferenceStore, SYSTEM_PROMPT_KEY};
use briefing::session::SessionPhase;
use briefing::summarize::SummarizeSession;
use briefing::transport::{self, Backend, HttpBackend};

/// Briefing: summarize documents and query a RAG backend from the terminal.
#[derive(Parser)]
#[command(
    name = "brief",
    about = "Summarize documents and query a RAG backend from the terminal",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/brief.toml`. When the file does not exist the
    /// built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/brief.toml")]
    config: PathBuf,

    /// Increase log verbosity (`-v` info, `-vv` debug). `RUST_LOG` wins.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a URL, pasted text, or an uploaded file.
    ///
    /// `--url` and `--text` go through the JSON path; `--file` is
    /// uploaded as multipart and cannot be combined with the others.
    #[command(group(
        ArgGroup::new("source")
            .required(true)
            .multiple(true)
            .args(["url", "text", "file"])
    ))]
    Summarize {
        /// Web page to summarize.
        #[arg(long)]
        url: Option<String>,

        /// Raw text to summarize.
        #[arg(long)]
        text: Option<String>,

        /// PDF or plain-text file to upload.
        #[arg(long, conflicts_with_all = ["url", "text"])]
        file: Option<PathBuf>,

        /// Summary detail percentage (0-100). Out-of-range values are clamped.
        #[arg(long)]
        detail: Option<i64>,

        /// Sampling temperature (0.0-1.0, step 0.05).
        #[arg(long)]
        temperature: Option<f64>,
    },

    /// Ask a question against the indexed documents.
    Generate {
        /// The question or instruction.
        message: String,

        /// Sampling temperature (0.0-1.0, step 0.05).
        #[arg(long)]
        temperature: Option<f64>,

        /// Persist this system prompt before running the query.
        #[arg(long)]
        system_prompt: Option<String>,
    },

    /// Manage the persisted system prompt.
    Prompt {
        #[command(subcommand)]
        action: PromptAction,
    },

    /// Inspect and purge indexed collections.
    Collections {
        #[command(subcommand)]
        action: CollectionsAction,
    },

    /// Check that the backend is up and answering.
    Health,

    /// Print shell completions to stdout.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum PromptAction {
    /// Print the stored prompt.
    Show,
    /// Store a new prompt. A blank value clears it.
    Set { text: String },
    /// Remove the stored prompt.
    Clear,
}

#[derive(Subcommand)]
enum CollectionsAction {
    /// List collections and their document counts.
    List,
    /// Delete every document whose source matches exactly.
    Purge {
        /// Exact filename or page title.
        source: String,

        /// Load a listing first; it is refreshed after the purge.
        #[arg(long)]
        list: bool,
    },
}

fn http_backend(cfg: &Config) -> Result<Arc<dyn Backend>> {
    let backend = HttpBackend::new(&cfg.backend)?;
    debug!(base_url = backend.base_url(), "backend configured");
    Ok(Arc::new(backend))
}

async fn run_summarize(
    cfg: &Config,
    url: Option<String>,
    text: Option<String>,
    file: Option<PathBuf>,
    detail: Option<i64>,
    temperature: Option<f64>,
) -> Result<()> {
    let params = GenerationParams {
        detail: Detail::new(detail.unwrap_or(cfg.summarize.detail)),
        temperature: Temperature::new(temperature.unwrap_or(cfg.summarize.temperature)),
    };
    let session = SummarizeSession::new(http_backend(cfg)?, params, cfg.summarize.source_conflict);

    let phase = match file {
        Some(path) => {
            session.stage_file(Some(StagedFile::from_path(&path)?));
            session.submit_upload().await
        }
        None => {
            session.set_url(url.unwrap_or_default());
            session.set_text(text.unwrap_or_default());
            session.submit().await
        }
    };

    let view = session.view();
    match (phase, view.result) {
        (SessionPhase::Succeeded, Some(result)) => {
            println!("{}", display::render_summary(&result));
            Ok(())
        }
        _ => bail!(view.error.unwrap_or_else(|| "Failed".to_string())),
    }
}

async fn run_generate(
    cfg: &Config,
    message: String,
    temperature: Option<f64>,
    system_prompt: Option<String>,
) -> Result<()> {
    let prefs = Arc::new(FilePreferenceStore::new(&cfg.prefs.path));
    let temperature = Temperature::new(temperature.unwrap_or(cfg.generate.temperature));
    let session = GenerateSession::new(http_backend(cfg)?, prefs, temperature)?;

    if let Some(prompt) = system_prompt {
        session.set_system_prompt(prompt)?;
    }
    session.set_message(message);

    let phase = session.run().await;
    let view = session.view();
    match (phase, view.answer) {
        (SessionPhase::Succeeded, Some(answer)) => {
            println!("{}", display::render_answer(&answer));
            Ok(())
        }
        _ => bail!(view.error.unwrap_or_else(|| "Failed".to_string())),
    }
}

fn run_prompt(cfg: &Config, action: PromptAction) -> Result<()> {
    let store = FilePreferenceStore::new(&cfg.prefs.path);
    match action {
        PromptAction::Show => match store.load(SYSTEM_PROMPT_KEY)? {
            Some(prompt) => println!("{}", prompt),
            None => println!("(no system prompt set)"),
        },
        PromptAction::Set { text } => {
            store.save(SYSTEM_PROMPT_KEY, &text)?;
            if text.trim().is_empty() {
                println!("System prompt cleared.");
            } else {
                println!("System prompt saved to {}", store.path().display());
            }
        }
        PromptAction::Clear => {
            store.clear(SYSTEM_PROMPT_KEY)?;
            println!("System prompt cleared.");
        }
    }
    Ok(())
}

async fn run_collections(cfg: &Config, action: CollectionsAction) -> Result<()> {
    let admin = AdminController::new(http_backend(cfg)?, cfg.admin.collection.clone());
    match action {
        CollectionsAction::List => {
            if !admin.list_collections().await {
                bail!(admin.view().message.unwrap_or_else(|| "List failed".to_string()));
            }
            println!("{}", display::render_listing(&admin.view().listing));
        }
        CollectionsAction::Purge { source, list } => {
            if list && !admin.list_collections().await {
                bail!(admin.view().message.unwrap_or_else(|| "List failed".to_string()));
            }
            let ok = admin.delete_by_source(&source).await;
            let view = admin.view();
            let message = view.message.unwrap_or_default();
            if !ok {
                bail!(message);
            }
            println!("{}", message);
            if view.listing.is_loaded() {
                println!();
                println!("{}", display::render_listing(&view.listing));
            }
        }
    }
    Ok(())
}

async fn run_health(cfg: &Config) -> Result<()> {
    let backend = http_backend(cfg)?;
    if !transport::ping(backend.as_ref()).await? {
        bail!("Backend at {} is not healthy", cfg.backend.base_url);
    }
    println!("ok: {}", cfg.backend.base_url);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    briefing::logging::init(cli.verbose);

    // Completions need no config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "brief", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_or_minimal(&cli.config)?;

    match cli.command {
        Commands::Summarize {
            url,
            text,
            file,
            detail,
            temperature,
        } => {
            run_summarize(&cfg, url, text, file, detail, temperature).await?;
        }
        Commands::Generate {
            message,
            temperature,
            system_prompt,
        } => {
            run_generate(&cfg, message, temperature, system_prompt).await?;
        }
        Commands::Prompt { action } => {
            run_prompt(&cfg, action)?;
        }
        Commands::Collections { action } => {
            run_collections(&cfg, action).await?;
        }
        Commands::Health => {
            run_health(&cfg).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
