//! # Refpack CLI (`refpack`)
//!
//! The `refpack` binary manages a local knowledge base of reference
//! documents and assembles token-budgeted context blobs from it for AI
//! functions.
//!
//! ## Usage
//!
//! ```bash
//! refpack --config ./config/refpack.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `refpack init` | Create the SQLite database and run schema migrations |
//! | `refpack load <path>` | Load a file or directory into the knowledge base |
//! | `refpack docs list` | List loaded documents |
//! | `refpack docs rm <id>` | Remove a document by id |
//! | `refpack settings set <function>` | Configure a function's knowledge-base usage |
//! | `refpack settings list` | List stored settings |
//! | `refpack assemble <function>` | Assemble reference context for a function |
//! | `refpack prompt <function>` | Build a complete prompt around assembled context |
//! | `refpack stats` | Show knowledge-base statistics |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! refpack init --config ./config/refpack.toml
//!
//! # Load a directory of reference material as global scope
//! refpack load ./docs --scope global
//!
//! # Load one document for a specific entity
//! refpack load ./contracts/acme.md --scope entity --entity "Acme Corp"
//!
//! # Cap the draft_reply function at 50k tokens
//! refpack settings set draft_reply --tokens 50000
//!
//! # Assemble context and inspect the budget decision
//! refpack assemble draft_reply --entity "Acme Corp" --json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use refpack::models::Scope;
use refpack::{admin, assemble, config, loader, migrate, prompt, stats};

/// Refpack CLI — a token-budgeted knowledge-base context assembler for
/// AI functions.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/refpack.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "refpack",
    about = "Refpack — a token-budgeted knowledge-base context assembler for AI functions",
    version,
    long_about = "Refpack maintains a local SQLite knowledge base of reference documents in three \
    scope tiers (system, global, entity) and assembles prompt context from it: documents are \
    selected by tier and priority, packed into a per-function token budget with proportional \
    truncation, and emitted as one labeled text blob."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/refpack.toml`. Database path, assembly
    /// tuning, and loader globs are read from this file.
    #[arg(long, global = true, default_value = "./config/refpack.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the reference_documents and
    /// admin_settings tables. This command is idempotent — running it
    /// multiple times is safe.
    Init,

    /// Load a file or directory into the knowledge base.
    ///
    /// Single files are stored under their file name (or --title);
    /// directories are walked with the `[loader]` glob filters and each
    /// file is stored under its relative path. Re-loading a title
    /// replaces the stored document.
    Load {
        /// File or directory to load.
        path: PathBuf,

        /// Document scope: `system`, `global`, or `entity`.
        #[arg(long, default_value = "system")]
        scope: String,

        /// Entity name the documents belong to (required with `--scope entity`).
        #[arg(long)]
        entity: Option<String>,

        /// Title override (single files only).
        #[arg(long)]
        title: Option<String>,

        /// Priority within the scope tier; higher sorts first.
        #[arg(long, default_value_t = 0)]
        priority: i64,

        /// Page count annotation, e.g. for text extracted from a PDF
        /// (single files only).
        #[arg(long)]
        pages: Option<i64>,
    },

    /// Inspect or remove loaded documents.
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Manage per-function knowledge-base settings.
    ///
    /// The assembler reads two keys per function:
    /// `<function>_use_kb` (the string "false" disables assembly) and
    /// `<function>_tokens` (token budget).
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Assemble reference context for a function.
    ///
    /// Prints the formatted context blob to stdout and a short summary
    /// to stderr. Failures never abort: the command degrades to an
    /// empty context, matching the library contract.
    Assemble {
        /// Consuming function name (settings key prefix).
        function: String,

        /// Entity name; also pulls in matching entity-scoped documents.
        #[arg(long)]
        entity: Option<String>,

        /// Token budget override; wins over the stored `_tokens` setting.
        #[arg(long)]
        max_tokens: Option<i64>,

        /// Print the result as JSON (context, token_count, docs_loaded).
        #[arg(long)]
        json: bool,

        /// Suppress the context blob; print only the summary.
        #[arg(long)]
        quiet: bool,
    },

    /// Build a complete prompt around assembled context.
    ///
    /// Combines optional system instructions, the assembled reference
    /// materials, and the user input into one labeled prompt on stdout.
    Prompt {
        /// Consuming function name (settings key prefix).
        function: String,

        /// User input text.
        #[arg(long)]
        input: String,

        /// System instructions section.
        #[arg(long)]
        system: Option<String>,

        /// Entity name; also pulls in matching entity-scoped documents.
        #[arg(long)]
        entity: Option<String>,

        /// Token budget override; wins over the stored `_tokens` setting.
        #[arg(long)]
        max_tokens: Option<i64>,
    },

    /// Show knowledge-base statistics.
    ///
    /// Document and token counts per scope, settings count, and
    /// database size.
    Stats,
}

/// Document management subcommands.
#[derive(Subcommand)]
enum DocsAction {
    /// List all documents, newest first.
    List,
    /// Remove a document by id.
    Rm {
        /// Document UUID (as shown by `docs list`).
        id: String,
    },
}

/// Settings management subcommands.
#[derive(Subcommand)]
enum SettingsAction {
    /// Set one or both keys for a function.
    Set {
        /// Consuming function name (settings key prefix).
        function: String,

        /// Enable or disable the knowledge base for this function.
        #[arg(long)]
        use_kb: Option<bool>,

        /// Token budget for this function.
        #[arg(long)]
        tokens: Option<i64>,
    },
    /// List all stored settings.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Load {
            path,
            scope,
            entity,
            title,
            priority,
            pages,
        } => {
            let Some(scope) = Scope::parse(&scope) else {
                anyhow::bail!("Unknown scope: '{}'. Use system, global, or entity.", scope);
            };
            let opts = loader::LoadOptions {
                title,
                scope,
                entity,
                priority,
                pages,
            };
            loader::run_load(&cfg, &path, opts).await?;
        }
        Commands::Docs { action } => match action {
            DocsAction::List => {
                admin::run_docs_list(&cfg).await?;
            }
            DocsAction::Rm { id } => {
                admin::run_docs_rm(&cfg, &id).await?;
            }
        },
        Commands::Settings { action } => match action {
            SettingsAction::Set {
                function,
                use_kb,
                tokens,
            } => {
                admin::run_settings_set(&cfg, &function, use_kb, tokens).await?;
            }
            SettingsAction::List => {
                admin::run_settings_list(&cfg).await?;
            }
        },
        Commands::Assemble {
            function,
            entity,
            max_tokens,
            json,
            quiet,
        } => {
            assemble::run_assemble(&cfg, &function, entity.as_deref(), max_tokens, json, quiet)
                .await?;
        }
        Commands::Prompt {
            function,
            input,
            system,
            entity,
            max_tokens,
        } => {
            prompt::run_prompt(
                &cfg,
                &function,
                &input,
                system.as_deref(),
                entity.as_deref(),
                max_tokens,
            )
            .await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
