//! Operator CLI for cardopt stores.
//!
//! # Responsibility
//! - Open a store from a connection string or JSON config file.
//! - Expose schema reset, seeding, listing, and default switching.

use anyhow::{bail, Context, Result};
use cardopt_core::db::{open_store, recreate_schema};
use cardopt_core::{
    core_version, default_log_level, flush_logging, init_logging, init_stderr_logging,
    CardOption, CardOptionListQuery, CardOptionRepository, DefaultSwitchService, OwnerService,
    SqliteCardOptionRepository, StoreConfig, UserId,
};
use clap::{Parser, Subcommand};
use log::info;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cardopt")]
#[command(about = "Inspect and switch default card options")]
struct Cli {
    /// Connection string, e.g. `Data Source=cards.db;Verbose SQL=true`.
    #[arg(long, conflicts_with = "config")]
    connection: Option<String>,
    /// JSON file holding a store config.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log statements executed against the store.
    #[arg(long)]
    verbose_sql: bool,
    /// Absolute directory for rolling log files. Logs go to stderr when unset.
    #[arg(long)]
    log_dir: Option<String>,
    #[arg(long)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drop and recreate the schema.
    Reset,
    /// Create one user with card options.
    Seed {
        /// Default flag per card option, in insert order.
        #[arg(long, value_delimiter = ',', default_values_t = [true, false])]
        defaults: Vec<bool>,
    },
    /// Print card options as JSON.
    List {
        #[arg(long)]
        user: Option<UserId>,
    },
    /// Move a user's default flag to their other card option.
    Switch {
        #[arg(long)]
        user: UserId,
        #[arg(long, default_value_t = 1)]
        times: u32,
    },
    /// Reset, seed one user with two card options, and switch twice.
    Demo,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    start_logging(&cli)?;
    info!(
        "event=cli_start module=cli status=ok core_version={}",
        core_version()
    );

    let config = load_config(&cli)?;
    let mut conn = open_store(&config).context("failed to open store")?;

    let result = match cli.command {
        Command::Reset => reset(&mut conn),
        Command::Seed { defaults } => seed(&conn, &defaults),
        Command::List { user } => list(&conn, user),
        Command::Switch { user, times } => switch(&conn, user, times),
        Command::Demo => demo(&mut conn),
    };
    flush_logging();
    result
}

fn start_logging(cli: &Cli) -> Result<()> {
    let level = cli
        .log_level
        .as_deref()
        .unwrap_or_else(|| default_log_level());
    let result = match cli.log_dir.as_deref() {
        Some(dir) => init_logging(level, dir),
        None => init_stderr_logging(level),
    };
    result.map_err(anyhow::Error::msg)
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let config = match (&cli.connection, &cli.config) {
        (Some(connection), _) => StoreConfig::from_connection_string(connection)
            .context("invalid connection string")?,
        (None, Some(path)) => read_config_file(path)?,
        (None, None) => bail!("either --connection or --config is required"),
    };
    Ok(if cli.verbose_sql {
        config.with_verbose_sql(true)
    } else {
        config
    })
}

fn read_config_file(path: &Path) -> Result<StoreConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config '{}'", path.display()))
}

fn reset(conn: &mut Connection) -> Result<()> {
    recreate_schema(conn).context("failed to reset schema")?;
    println!("schema recreated");
    Ok(())
}

fn seed(conn: &Connection, defaults: &[bool]) -> Result<()> {
    let service = OwnerService::new(SqliteCardOptionRepository::try_new(conn)?);
    let (user, options) = service.seed_owner(defaults)?;
    println!("seeded user {}", user.id);
    print_rows(&options)
}

fn list(conn: &Connection, user: Option<UserId>) -> Result<()> {
    let repo = SqliteCardOptionRepository::try_new(conn)?;
    let query = CardOptionListQuery {
        user_id: user,
        ..CardOptionListQuery::default()
    };
    print_rows(&repo.list_card_options(&query)?)
}

fn switch(conn: &Connection, user: UserId, times: u32) -> Result<()> {
    let service = DefaultSwitchService::new(SqliteCardOptionRepository::try_new(conn)?);
    for _ in 0..times {
        let outcome = service
            .switch_default(user)
            .with_context(|| format!("failed to switch default for user {user}"))?;
        println!(
            "user {}: default {} -> {} ({} rows modified)",
            outcome.user_id, outcome.previous_default, outcome.new_default, outcome.modified
        );
    }
    list(conn, Some(user))
}

fn demo(conn: &mut Connection) -> Result<()> {
    recreate_schema(conn).context("failed to reset schema")?;
    info!("event=demo module=cli status=start");

    let user_id = {
        let service = OwnerService::new(SqliteCardOptionRepository::try_new(conn)?);
        let (user, options) = service.seed_owner(&[true, false])?;
        println!("seeded user {}", user.id);
        print_rows(&options)?;
        user.id
    };

    for _ in 0..2 {
        switch(conn, user_id, 1)?;
    }

    info!("event=demo module=cli status=ok user_id={user_id}");
    Ok(())
}

fn print_rows(rows: &[CardOption]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(rows)?);
    Ok(())
}
