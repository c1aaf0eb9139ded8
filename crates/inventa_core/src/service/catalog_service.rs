//! Catalog ingestion use-case service.
//!
//! # Responsibility
//! - Turn invoice lines into catalog entries via the attribution parser.
//! - Delegate merge and movement bookkeeping to the book repository.
//!
//! # Invariants
//! - Lines are validated before any write; a rejected line changes nothing.
//! - Blank descriptions never create catalog entries.

use crate::model::attribution::AttributionResult;
use crate::model::book::{Book, InvoiceLine};
use crate::model::period::PeriodId;
use crate::parse::attribution::extract_title_and_author;
use crate::repo::book_repo::{BookRepository, CatalogMerge};
use crate::repo::period_repo::{RepoError, RepoResult};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for catalog ingestion.
#[derive(Debug)]
pub enum CatalogServiceError {
    /// Quantity must be at least one unit.
    InvalidQuantity(u32),
    /// Unit price must not be negative.
    InvalidUnitPrice(i64),
    /// Description parsed to an empty title.
    BlankTitle,
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for CatalogServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuantity(value) => write!(f, "invalid invoice quantity: {value}"),
            Self::InvalidUnitPrice(value) => write!(f, "invalid unit price: {value}"),
            Self::BlankTitle => write!(f, "invoice description has no usable title"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CatalogServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Result of ingesting one invoice line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Parser output the merge was keyed on.
    pub attribution: AttributionResult,
    /// Catalog entry after the merge.
    pub book: Book,
    /// `true` when a new catalog entry was created.
    pub created: bool,
    /// Open period credited with this movement, if any.
    pub period_id: Option<PeriodId>,
}

/// Catalog service facade over repository implementations.
pub struct CatalogService<R: BookRepository> {
    repo: R,
}

impl<R: BookRepository> CatalogService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Parses and merges one invoice line into the catalog.
    pub fn ingest_line(&self, line: &InvoiceLine) -> Result<IngestOutcome, CatalogServiceError> {
        if line.quantity == 0 {
            return Err(CatalogServiceError::InvalidQuantity(line.quantity));
        }
        if let Some(price) = line.unit_price_cents.filter(|price| *price < 0) {
            return Err(CatalogServiceError::InvalidUnitPrice(price));
        }

        let attribution = extract_title_and_author(&line.description);
        if attribution.title.is_empty() {
            return Err(CatalogServiceError::BlankTitle);
        }

        let receipt = self.repo.merge_entry(&CatalogMerge {
            title: attribution.title.clone(),
            author: attribution.author.clone().filter(|author| !author.is_empty()),
            quantity: i64::from(line.quantity),
            unit_price_cents: line.unit_price_cents,
        })?;

        info!(
            "event=catalog_ingest module=catalog status=ok book_id={} created={} has_author={} period_credited={}",
            receipt.book.uuid,
            receipt.created,
            attribution.author.is_some(),
            receipt.period_id.is_some()
        );

        Ok(IngestOutcome {
            attribution,
            book: receipt.book,
            created: receipt.created,
            period_id: receipt.period_id,
        })
    }

    /// Ingests several lines, stopping at the first failure.
    ///
    /// Lines before the failing one stay committed; each merge is its own
    /// transaction.
    pub fn ingest_lines(
        &self,
        lines: &[InvoiceLine],
    ) -> Result<Vec<IngestOutcome>, CatalogServiceError> {
        lines.iter().map(|line| self.ingest_line(line)).collect()
    }

    /// Lists catalog entries.
    pub fn list_books(&self, limit: Option<u32>, offset: u32) -> RepoResult<Vec<Book>> {
        self.repo.list_books(limit, offset)
    }
}
