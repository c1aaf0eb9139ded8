//! Inventory period domain model.
//!
//! # Responsibility
//! - Define the inventory accounting interval and its two-state lifecycle.
//! - Provide name normalization shared by duplicate checks and search.
//!
//! # Invariants
//! - A period is created `Open` and transitions to `Closed` exactly once.
//! - `closed_at` is set iff `status == Closed`.
//! - At most one period is open across the whole collection (enforced by the
//!   lifecycle service and the store, not by this type).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier assigned by the period store at creation.
pub type PeriodId = Uuid;

/// Lifecycle state of an inventory period.
///
/// Serialized with the labels used by the admin UI and persisted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodStatus {
    #[serde(rename = "abierto")]
    Open,
    #[serde(rename = "cerrado")]
    Closed,
}

impl PeriodStatus {
    /// Stable label used for storage and text search.
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "abierto",
            Self::Closed => "cerrado",
        }
    }

    /// Parses a stored label.
    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "abierto" => Some(Self::Open),
            "cerrado" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl Display for PeriodStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Inventory accounting interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub uuid: PeriodId,
    pub name: String,
    pub status: PeriodStatus,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Set once, at close.
    pub closed_at: Option<i64>,
    /// Identifier of the user who opened the period.
    pub created_by: String,
    /// Maintained by catalog ingestion; read-only for the lifecycle service.
    pub total_movements: i64,
    /// Maintained by catalog ingestion; read-only for the lifecycle service.
    pub total_books: i64,
}

/// Validation failures for persisted or constructed periods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodValidationError {
    BlankName,
    BlankCreator,
    MissingClosedAt,
    UnexpectedClosedAt,
    ClosedBeforeCreated { created_at: i64, closed_at: i64 },
    NegativeCounter(&'static str),
}

impl Display for PeriodValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "period name must not be blank"),
            Self::BlankCreator => write!(f, "period creator must not be blank"),
            Self::MissingClosedAt => write!(f, "closed period requires closed_at"),
            Self::UnexpectedClosedAt => write!(f, "open period must not carry closed_at"),
            Self::ClosedBeforeCreated {
                created_at,
                closed_at,
            } => write!(
                f,
                "closed_at ({closed_at}) is earlier than created_at ({created_at})"
            ),
            Self::NegativeCounter(field) => write!(f, "{field} must not be negative"),
        }
    }
}

impl Error for PeriodValidationError {}

impl Period {
    /// Returns whether this period currently accepts inventory movements.
    pub fn is_open(&self) -> bool {
        self.status == PeriodStatus::Open
    }

    /// Checks lifecycle field consistency.
    pub fn validate(&self) -> Result<(), PeriodValidationError> {
        if self.name.trim().is_empty() {
            return Err(PeriodValidationError::BlankName);
        }
        if self.created_by.trim().is_empty() {
            return Err(PeriodValidationError::BlankCreator);
        }

        match (self.status, self.closed_at) {
            (PeriodStatus::Open, Some(_)) => return Err(PeriodValidationError::UnexpectedClosedAt),
            (PeriodStatus::Closed, None) => return Err(PeriodValidationError::MissingClosedAt),
            (PeriodStatus::Closed, Some(closed_at)) if closed_at < self.created_at => {
                return Err(PeriodValidationError::ClosedBeforeCreated {
                    created_at: self.created_at,
                    closed_at,
                });
            }
            _ => {}
        }

        if self.total_movements < 0 {
            return Err(PeriodValidationError::NegativeCounter("total_movements"));
        }
        if self.total_books < 0 {
            return Err(PeriodValidationError::NegativeCounter("total_books"));
        }

        Ok(())
    }

    /// Returns `true` when `term` (already lowercased) occurs in the name,
    /// creator, or status label.
    pub(crate) fn matches_lowercase(&self, term: &str) -> bool {
        self.name.to_lowercase().contains(term)
            || self.created_by.to_lowercase().contains(term)
            || self.status.label().contains(term)
    }
}

/// Normalizes a period name for uniqueness comparisons.
///
/// Returns `None` for blank input.
pub fn normalize_period_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
