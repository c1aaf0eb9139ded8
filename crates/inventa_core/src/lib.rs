//! Core domain logic for Inventa.
//! This crate is the single source of truth for period and catalog invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod parse;
pub mod repo;
pub mod service;

pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogConfig, LogLevel,
    LogTarget, LoggingError,
};
pub use model::attribution::AttributionResult;
pub use model::book::{catalog_match_key, Book, BookId, InvoiceLine};
pub use model::period::{Period, PeriodId, PeriodStatus, PeriodValidationError};
pub use notify::{LogNotifier, Notice, NoticeKind, Notifier};
pub use parse::attribution::{extract_title_and_author, looks_like_person_name};
pub use repo::book_repo::{BookRepository, CatalogMerge, MergeReceipt, SqliteBookRepository};
pub use repo::period_repo::{
    PeriodConflict, PeriodStore, RepoError, RepoResult, SqlitePeriodRepository,
};
pub use service::catalog_service::{CatalogService, CatalogServiceError, IngestOutcome};
pub use service::period_service::{
    CloseOutcome, CloseRequest, CloseTicket, LifecycleError, NameError, PeriodLifecycle, Workflow,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
