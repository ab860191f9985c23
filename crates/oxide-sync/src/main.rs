//! oxide-sync CLI
//!
//! Command-line tool for reconciling a MySQL database with its schema files.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_sync::prelude::*;

/// Declarative schema and privilege reconciliation for MySQL.
#[derive(Parser)]
#[command(name = "oxide-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Server URL, without a database (e.g. mysql://root@localhost:3306).
    #[arg(short = 'u', long, env = "DATABASE_URL")]
    database_url: String,

    /// Database to reconcile.
    #[arg(short, long)]
    database: String,

    /// Read REAL as FLOAT instead of DOUBLE.
    #[arg(long)]
    real_as_float: bool,

    /// Never drop tables missing from the schema files.
    #[arg(long)]
    no_drop_tables: bool,

    /// Substitution for `${NAME}` in schema files.
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE", value_parser = parse_define)]
    defines: Vec<(String, String)>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the statements that would be executed.
    Diff {
        /// Print the result list as JSON.
        #[arg(long)]
        json: bool,

        /// Schema files.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Execute the statements.
    Apply {
        /// Execute destructive statements without running their guards.
        #[arg(long)]
        force: bool,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,

        /// Schema files.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn parse_define(value: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{value}`"))?;
    Ok((name.trim().to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let files = match &cli.command {
        Commands::Diff { files, .. } | Commands::Apply { files, .. } => files,
    };

    let loader = cli
        .defines
        .iter()
        .fold(SourceLoader::new(), |loader, (name, value)| loader.define(name, value));
    let sources = loader.load_all(files.as_slice())?;

    let real_policy = if cli.real_as_float {
        RealPolicy::Float
    } else {
        RealPolicy::Double
    };
    let options = SyncOptions::default()
        .real_policy(real_policy)
        .drop_tables(!cli.no_drop_tables);

    // Connect to the server; statements run against the target database
    // once it exists.
    let connect: MySqlConnectOptions = cli
        .database_url
        .parse()
        .context("invalid database URL")?;
    let server = MySqlExecutor::new(
        MySqlPoolOptions::new()
            .max_connections(5)
            .connect_with(connect.clone())
            .await?,
    );

    let mut reconciliation = Reconciler::new(&server, &cli.database)
        .options(options)
        .reconcile(&sources)
        .await?;
    if !reconciliation.passthrough.is_empty() {
        info!(
            count = reconciliation.passthrough.len(),
            "Statements kept verbatim and not reconciled"
        );
    }

    match cli.command {
        Commands::Diff { json, .. } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&reconciliation)?);
            } else {
                print_text(&reconciliation);
            }
        }

        Commands::Apply { force, dry_run, .. } => {
            if dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
            }
            let creates_database = reconciliation
                .items
                .iter()
                .any(|item| matches!(item, ResultItem::CreateDatabase(_)));
            let report = if creates_database {
                Applier::new(&server)
                    .force(force)
                    .dry_run(dry_run)
                    .apply(&mut reconciliation)
                    .await
            } else {
                let target = MySqlExecutor::new(
                    MySqlPoolOptions::new()
                        .max_connections(5)
                        .connect_lazy_with(connect.database(&cli.database)),
                );
                Applier::new(&target)
                    .force(force)
                    .dry_run(dry_run)
                    .apply(&mut reconciliation)
                    .await
            };
            for sql in &report.dry_run {
                println!("{sql}");
            }
            for statement in reconciliation.statements() {
                if let Some(warning) = &statement.warning {
                    eprintln!("{}: {warning}", statement.target);
                }
            }
            if report.refused > 0 || report.failed > 0 {
                bail!(
                    "{} statement(s) refused, {} failed",
                    report.refused,
                    report.failed
                );
            }
        }
    }

    if reconciliation.errors().next().is_some() {
        for error in reconciliation.errors() {
            eprintln!("error: {}", error.message);
        }
        bail!("reconciliation reported errors");
    }
    Ok(())
}

fn print_text(reconciliation: &Reconciliation) {
    for item in &reconciliation.items {
        match item {
            ResultItem::Error(error) => println!("-- error: {}", error.message),
            ResultItem::Drop(drop) => println!("-- skipped {}: {}", drop.count, drop.reason),
            ResultItem::Table(table) => {
                println!("-- table {} ({:?})", table.name, table.presence);
            }
            ResultItem::CreateDatabase(_)
            | ResultItem::CreateUser(_)
            | ResultItem::AlterUser(_)
            | ResultItem::DropUser(_) => {}
        }
        for statement in item.statements() {
            if let Some(context) = &statement.context {
                println!("-- {context}");
            }
            if let Some(guard) = &statement.guard {
                println!("-- guard: {guard}");
            }
            println!("{}", statement.sql);
        }
    }
}
