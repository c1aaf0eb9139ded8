//! Command-line front end for the inventory core.
//!
//! # Responsibility
//! - Stand in for the admin UI: list, create, close and search periods.
//! - Ingest invoice lines into the catalog and inspect parser output.
//! - Route operation results to a notifier that prints to the terminal.

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{CatalogCommand, Cli, Command, PeriodCommand};
use inventa_core::db::open_db;
use inventa_core::{
    default_log_level, extract_title_and_author, logging, CatalogService, CloseOutcome,
    InvoiceLine, LifecycleError, LogConfig, Notice, NoticeKind, Notifier, Period, PeriodId,
    PeriodLifecycle, PeriodStore, SqliteBookRepository, SqlitePeriodRepository,
};
use log::info;
use rusqlite::Connection;
use std::process::ExitCode;

/// Prints notices as `[kind] message` lines.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str, kind: NoticeKind) {
        match kind {
            NoticeKind::Success => println!("[{kind}] {message}"),
            NoticeKind::Warning | NoticeKind::Error => eprintln!("[{kind}] {message}"),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    let log_config = LogConfig::from_options(&level, cli.log_dir.as_deref())
        .context("invalid logging options")?;
    logging::init(log_config).context("failed to initialize logging")?;
    info!("event=cli_start module=cli status=ok version={}", inventa_core::core_version());

    if let Command::Parse { description } = &cli.command {
        let result = extract_title_and_author(description);
        println!("title:  {}", result.title);
        println!("author: {}", result.author.as_deref().unwrap_or("-"));
        return Ok(ExitCode::SUCCESS);
    }

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    let notifier = TerminalNotifier;

    match cli.command {
        Command::Parse { .. } => Ok(ExitCode::SUCCESS),
        Command::Period(command) => run_period(&conn, command, cli.user.as_deref(), &notifier),
        Command::Catalog(command) => run_catalog(&conn, command, &notifier),
    }
}

fn run_period(
    conn: &Connection,
    command: PeriodCommand,
    user: Option<&str>,
    notifier: &dyn Notifier,
) -> Result<ExitCode> {
    let store = SqlitePeriodRepository::try_new(conn)?;
    let mut lifecycle = PeriodLifecycle::new(store.list_periods()?);

    match command {
        PeriodCommand::List => print_periods(lifecycle.periods().iter()),
        PeriodCommand::Active => match lifecycle.find_active() {
            Some(period) => print_periods(std::iter::once(period)),
            None => println!("no open period"),
        },
        PeriodCommand::Search { term } => print_periods(lifecycle.search(&term).into_iter()),
        PeriodCommand::Create { name } => {
            let Some(user) = user else {
                bail!("creating a period requires --user or INVENTA_USER");
            };
            if let Err(err) = lifecycle.open_create_form() {
                return Ok(report(&err, notifier));
            }
            match lifecycle.create(&store, &name, user) {
                Ok(period) => Notice::period_created(&period).deliver(notifier),
                Err(err) => return Ok(report(&err, notifier)),
            }
        }
        PeriodCommand::Close { target } => {
            let Some(id) = resolve_period(&lifecycle, &target) else {
                Notice::error(format!("no period matches `{target}`")).deliver(notifier);
                return Ok(ExitCode::FAILURE);
            };
            if let Err(err) = lifecycle.open_close_prompt(id) {
                return Ok(report(&err, notifier));
            }
            match lifecycle.close(&store, id) {
                Ok(CloseOutcome::Closed(period)) => Notice::period_closed(&period).deliver(notifier),
                Ok(CloseOutcome::Ignored) => {
                    Notice::warning("a close request is already in progress").deliver(notifier)
                }
                Err(err) => return Ok(report(&err, notifier)),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_catalog(
    conn: &Connection,
    command: CatalogCommand,
    notifier: &dyn Notifier,
) -> Result<ExitCode> {
    let service = CatalogService::new(SqliteBookRepository::try_new(conn)?);

    match command {
        CatalogCommand::Ingest(args) => {
            let line = InvoiceLine {
                description: args.description,
                quantity: args.quantity,
                unit_price_cents: args.price_cents,
            };
            match service.ingest_line(&line) {
                Ok(outcome) => Notice::book_merged(&outcome.book, outcome.created).deliver(notifier),
                Err(err) => {
                    Notice::warning(err.to_string()).deliver(notifier);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        CatalogCommand::List { limit, offset } => {
            for book in service.list_books(limit, offset)? {
                println!(
                    "{}\t{}\t{}\t{}",
                    book.uuid,
                    book.title,
                    book.author.as_deref().unwrap_or("-"),
                    book.quantity
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn resolve_period(lifecycle: &PeriodLifecycle, target: &str) -> Option<PeriodId> {
    if let Ok(id) = target.parse::<PeriodId>() {
        return Some(id);
    }
    let wanted = target.trim().to_lowercase();
    lifecycle
        .periods()
        .iter()
        .find(|period| period.name.to_lowercase() == wanted)
        .map(|period| period.uuid)
}

fn report(err: &LifecycleError, notifier: &dyn Notifier) -> ExitCode {
    err.notice().deliver(notifier);
    ExitCode::FAILURE
}

fn print_periods<'a>(periods: impl Iterator<Item = &'a Period>) {
    for period in periods {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            period.uuid,
            period.name,
            period.status,
            period.created_by,
            period.total_movements,
            period.total_books
        );
    }
}
