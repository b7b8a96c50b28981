//! Bindgraph CLI - analyze a codebase and query its resolved bindings

use anyhow::Context;
use bindgraph::adapter;
use bindgraph::analyzer::{AnalyzerOptions, Analyzer};
use bindgraph::config::{self, AnalyzerConfig};
use bindgraph::storage::{BindingRecord, EntityRecord, SqliteStore};
use bindgraph::ui::{self, Icons, ProgressManager, ProgressMessage, ProgressPhase, TableBuilder};
use bindgraph::EntityId;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bindgraph")]
#[command(version)]
#[command(about = "Multi-language entity model and binding resolver")]
#[command(long_about = r#"
Bindgraph extracts program entities from a codebase and binds every name
reference to the entity it denotes:
  • Scope-aware lookup through files, packages, types and functions
  • Imports, aliases and redeclarations fused across files
  • Expression typing through member-access chains

Example usage:
  bindgraph init
  bindgraph analyze --path ./src
  bindgraph lookup --name Widget
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a bindgraph.toml with defaults
    Init {
        /// Directory to analyze by default
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Parse and resolve a directory, then save the result
    Analyze {
        /// Path to the directory to analyze
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Restrict to these languages (python, go)
        #[arg(short, long = "lang")]
        languages: Vec<String>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Type expressions after resolution instead of during it
        #[arg(long)]
        lazy: bool,

        /// Extra gitignore-style exclude patterns
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Parser worker threads (0 = available parallelism)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Skip writing the database
        #[arg(long)]
        no_save: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Look up entities by raw or qualified name
    Lookup {
        /// Name to look up
        #[arg(short, long)]
        name: String,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show statistics about the saved analysis
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Serialize)]
struct LookupResult {
    entity: EntityRecord,
    bindings: Vec<BindingRecord>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let settings = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Init { path, database, force } => {
            let config_path = cli.config.unwrap_or_else(config::default_config_path);
            let root = path.unwrap_or_else(|| PathBuf::from("."));
            let database = database.unwrap_or_else(|| config::default_database_path_in(Path::new(".")));
            let new_config = AnalyzerConfig {
                path: Some(root.display().to_string()),
                database: Some(database.display().to_string()),
                ..AnalyzerConfig::default()
            };
            config::write_config(&config_path, &new_config, force)?;
            ui::success(&format!("Wrote {}", config_path.display()));
        }

        Commands::Analyze {
            path,
            languages,
            database,
            lazy,
            exclude,
            threads,
            no_save,
            format,
        } => {
            let root = path
                .or_else(|| settings.path.as_ref().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("."));
            let database = database_path(database, &settings);
            let languages = if languages.is_empty() { settings.languages.clone() } else { languages };

            let mut registry = adapter::default_registry();
            registry.retain_languages(&languages)?;
            let options = AnalyzerOptions {
                eager_expression_resolve: settings.eager_expression_resolve && !lazy,
                threads: threads.unwrap_or(settings.threads),
                exclude: settings.exclude.iter().cloned().chain(exclude).collect(),
            };
            let analyzer = Analyzer::new(registry, options);

            let human = format == OutputFormat::Text;
            if human {
                ui::header(&format!("Analyzing {}", root.display()));
            }
            let (progress, tx) = ProgressManager::new();
            let analysis = analyzer
                .run(&root, human.then_some(&tx))
                .with_context(|| format!("analysis of {} failed", root.display()))?;

            if !no_save {
                if human {
                    let _ = tx.send(ProgressMessage::Started {
                        phase: ProgressPhase::Saving,
                        total: analysis.repo.len(),
                    });
                }
                config::ensure_db_dir(&database)?;
                let mut store = SqliteStore::open(&database)?;
                let unresolved: BTreeSet<String> = analysis.report.unresolved.iter().cloned().collect();
                store.save_repo(&analysis.repo, &unresolved)?;
                if human {
                    let _ = tx.send(ProgressMessage::Finished {
                        phase: ProgressPhase::Saving,
                    });
                }
            }
            drop(tx);

            let report = &analysis.report;
            if !human {
                progress.clear();
                println!("{}", serde_json::to_string_pretty(report)?);
                return Ok(());
            }
            progress.finish_with_summary(
                Duration::from_millis(report.elapsed_ms as u64),
                report.files,
                report.entity_count(),
                report.unresolved.len(),
            );

            let mut table = TableBuilder::new();
            table.add_row("Files", &report.files.to_string());
            for (kind, count) in &report.entities {
                table.add_row(kind, &count.to_string());
            }
            table.add_row(
                "Typed expressions",
                &format!("{}/{}", report.typed_expressions, report.expressions),
            );
            table.add_row("Unresolved names", &report.unresolved.len().to_string());
            println!("{}", table.build());

            if !report.unresolved.is_empty() {
                ui::section("Unresolved");
                for name in &report.unresolved {
                    ui::unresolved_row(name);
                }
            }
            if !report.parse_errors.is_empty() {
                ui::section("Parse errors");
                for failure in &report.parse_errors {
                    ui::error(&format!("{}: {}", failure.path, failure.message));
                }
            }
            if !no_save {
                ui::status(Icons::DATABASE, "Database", &database.display().to_string());
            }
        }

        Commands::Lookup { name, database, format } => {
            let store = open_existing(&database_path(database, &settings))?;
            let results = store
                .find_entities_by_name(&name)?
                .into_iter()
                .map(|entity| -> bindgraph::Result<LookupResult> {
                    let bindings = store.bindings_of(EntityId(entity.id))?;
                    Ok(LookupResult { entity, bindings })
                })
                .collect::<bindgraph::Result<Vec<_>>>()?;

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&results)?);
                return Ok(());
            }
            if results.is_empty() {
                ui::warn(&format!("No entity named {}", name));
                return Ok(());
            }
            for result in results {
                let entity = &result.entity;
                ui::entity_line(entity.kind.as_str(), &entity.display_name);
                if let Some(file) = &entity.file {
                    ui::binding_row("file", file);
                }
                for binding in &result.bindings {
                    ui::binding_row(binding.role.as_str(), &binding.target.qualified_name);
                }
            }
        }

        Commands::Stats { database, format } => {
            let database = database_path(database, &settings);
            let store = open_existing(&database)?;
            let stats = store.stats()?;

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }
            ui::header(&format!("Bindgraph Statistics ({})", database.display()));
            let mut table = TableBuilder::new();
            table.add_row("Entities", &stats.entities.to_string());
            for (kind, count) in &stats.by_kind {
                table.add_row(&format!("  {}", kind), &count.to_string());
            }
            table.add_row("Bindings", &stats.bindings.to_string());
            table.add_row(
                "Typed expressions",
                &format!("{}/{}", stats.typed_expressions, stats.expressions),
            );
            table.add_row("Unresolved names", &stats.unresolved.to_string());
            println!("{}", table.build());
        }
    }

    Ok(())
}

fn database_path(flag: Option<PathBuf>, settings: &AnalyzerConfig) -> PathBuf {
    flag.or_else(|| settings.database.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| config::default_database_path_in(Path::new(".")))
}

fn open_existing(database: &Path) -> anyhow::Result<SqliteStore> {
    if !database.exists() {
        anyhow::bail!(
            "no database at {} (run `bindgraph analyze` first)",
            database.display()
        );
    }
    Ok(SqliteStore::open(database)?)
}
