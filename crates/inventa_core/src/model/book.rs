//! Book catalog domain model.
//!
//! # Responsibility
//! - Define catalog entries produced by merging parsed invoice lines.
//! - Define the invoice line input accepted by catalog ingestion.
//!
//! # Invariants
//! - `match_key` is derived from normalized title and author, and is unique
//!   across the catalog.
//! - `quantity` only grows through ingestion.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for catalog entries.
pub type BookId = Uuid;

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub uuid: BookId,
    /// Title as first seen during ingestion.
    pub title: String,
    /// Author as first seen during ingestion.
    pub author: Option<String>,
    /// Normalized merge key; see [`catalog_match_key`].
    pub match_key: String,
    /// Accumulated units received.
    pub quantity: i64,
    /// Unit price of the most recent invoice line, in cents.
    pub last_unit_price_cents: Option<i64>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

/// One invoice line as received from purchasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// Free-text description, e.g. `LIBRO: Juan Rulfo - Pedro Páramo`.
    pub description: String,
    /// Units received. Must be positive.
    pub quantity: u32,
    /// Unit price in cents, when the invoice carries one.
    pub unit_price_cents: Option<i64>,
}

impl InvoiceLine {
    pub fn new(description: impl Into<String>, quantity: u32) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price_cents: None,
        }
    }
}

/// Builds the catalog merge key for a title/author pair.
///
/// Whitespace runs collapse to one space and letters are lowercased, so
/// `"Pedro  Páramo"` and `"pedro páramo"` land in the same entry.
pub fn catalog_match_key(title: &str, author: Option<&str>) -> String {
    let title = collapse_lowercase(title);
    let author = author.map(collapse_lowercase).unwrap_or_default();
    format!("{title}|{author}")
}

fn collapse_lowercase(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
