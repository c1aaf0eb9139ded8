//! Book catalog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Merge parsed invoice lines into catalog entries keyed by `match_key`.
//! - Record each merge as one inventory movement on the open period.
//!
//! # Invariants
//! - Entry merge and period counter update commit in the same transaction.
//! - First-seen `title`/`author` spelling is kept; later merges only touch
//!   quantity, price and `updated_at`.
//! - Catalog list is sorted by `title ASC, uuid ASC`.

use crate::db::ensure_connection_ready;
use crate::model::book::{catalog_match_key, Book, BookId};
use crate::model::period::{PeriodId, PeriodStatus};
use crate::repo::period_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const BOOKS_DEFAULT_LIMIT: u32 = 20;
const BOOKS_LIMIT_MAX: u32 = 100;

const BOOK_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    author,
    match_key,
    quantity,
    last_unit_price_cents,
    created_at,
    updated_at
FROM books";

const BOOK_COLUMNS: &[&str] = &[
    "uuid",
    "title",
    "author",
    "match_key",
    "quantity",
    "last_unit_price_cents",
    "created_at",
    "updated_at",
];

/// Catalog merge request built from one parsed invoice line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogMerge {
    pub title: String,
    pub author: Option<String>,
    /// Units to add. Must be positive.
    pub quantity: i64,
    pub unit_price_cents: Option<i64>,
}

/// Result of one catalog merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReceipt {
    /// Catalog entry after the merge.
    pub book: Book,
    /// `true` when the merge created a new entry.
    pub created: bool,
    /// Open period whose counters were incremented, if any.
    pub period_id: Option<PeriodId>,
}

/// Repository interface for catalog operations.
pub trait BookRepository {
    /// Inserts or accumulates one catalog entry and records the movement.
    fn merge_entry(&self, merge: &CatalogMerge) -> RepoResult<MergeReceipt>;
    /// Gets one entry by stable ID.
    fn get_book(&self, id: BookId) -> RepoResult<Option<Book>>;
    /// Lists entries with pagination.
    fn list_books(&self, limit: Option<u32>, offset: u32) -> RepoResult<Vec<Book>>;
}

/// SQLite-backed catalog repository.
pub struct SqliteBookRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "books", BOOK_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl BookRepository for SqliteBookRepository<'_> {
    fn merge_entry(&self, merge: &CatalogMerge) -> RepoResult<MergeReceipt> {
        if merge.quantity <= 0 {
            return Err(RepoError::InvalidData(format!(
                "catalog merge quantity must be positive, got {}",
                merge.quantity
            )));
        }

        let match_key = catalog_match_key(&merge.title, merge.author.as_deref());
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT uuid FROM books WHERE match_key = ?1;",
                [match_key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let created = existing.is_none();
        match existing {
            Some(uuid) => {
                tx.execute(
                    "UPDATE books
                     SET
                        quantity = quantity + ?2,
                        last_unit_price_cents = COALESCE(?3, last_unit_price_cents),
                        updated_at = (strftime('%s', 'now') * 1000)
                     WHERE uuid = ?1;",
                    params![uuid, merge.quantity, merge.unit_price_cents],
                )?;
            }
            None => {
                tx.execute(
                    "INSERT INTO books (uuid, title, author, match_key, quantity, last_unit_price_cents)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                    params![
                        Uuid::new_v4().to_string(),
                        merge.title.trim(),
                        merge.author.as_deref().map(str::trim),
                        match_key.as_str(),
                        merge.quantity,
                        merge.unit_price_cents,
                    ],
                )?;
            }
        }

        let period_id = record_movement(&tx, merge.quantity)?;

        let book = load_book_by_key(&tx, &match_key)?.ok_or_else(|| {
            RepoError::InvalidData(format!("catalog entry `{match_key}` missing after merge"))
        })?;
        tx.commit()?;

        Ok(MergeReceipt {
            book,
            created,
            period_id,
        })
    }

    fn get_book(&self, id: BookId) -> RepoResult<Option<Book>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BOOK_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_book_row(row)?));
        }
        Ok(None)
    }

    fn list_books(&self, limit: Option<u32>, offset: u32) -> RepoResult<Vec<Book>> {
        let limit = normalize_book_limit(limit);
        let mut stmt = self.conn.prepare(&format!(
            "{BOOK_SELECT_SQL}
             ORDER BY title COLLATE NOCASE ASC, uuid ASC
             LIMIT ?1 OFFSET ?2;"
        ))?;
        let mut rows = stmt.query(params![i64::from(limit), i64::from(offset)])?;
        let mut books = Vec::new();
        while let Some(row) = rows.next()? {
            books.push(parse_book_row(row)?);
        }
        Ok(books)
    }
}

/// Applies default and max bounds to a catalog list limit.
pub fn normalize_book_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => BOOKS_DEFAULT_LIMIT,
        Some(value) => value.min(BOOKS_LIMIT_MAX),
    }
}

fn record_movement(conn: &Connection, quantity: i64) -> RepoResult<Option<PeriodId>> {
    let open_id: Option<String> = conn
        .query_row(
            "SELECT uuid FROM inventory_periods WHERE status = ?1 LIMIT 1;",
            [PeriodStatus::Open.label()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(open_id) = open_id else {
        return Ok(None);
    };

    conn.execute(
        "UPDATE inventory_periods
         SET
            total_movements = total_movements + 1,
            total_books = total_books + ?2
         WHERE uuid = ?1;",
        params![open_id.as_str(), quantity],
    )?;

    let id = Uuid::parse_str(&open_id).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{open_id}` in inventory_periods.uuid"
        ))
    })?;
    Ok(Some(id))
}

fn load_book_by_key(conn: &Connection, match_key: &str) -> RepoResult<Option<Book>> {
    let mut stmt = conn.prepare(&format!("{BOOK_SELECT_SQL} WHERE match_key = ?1;"))?;
    let mut rows = stmt.query([match_key])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_book_row(row)?));
    }
    Ok(None)
}

fn parse_book_row(row: &Row<'_>) -> RepoResult<Book> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in books.uuid"))
    })?;

    let quantity: i64 = row.get("quantity")?;
    if quantity < 0 {
        return Err(RepoError::InvalidData(format!(
            "negative quantity `{quantity}` in books.quantity"
        )));
    }

    Ok(Book {
        uuid,
        title: row.get("title")?,
        author: row.get("author")?,
        match_key: row.get("match_key")?,
        quantity,
        last_unit_price_cents: row.get("last_unit_price_cents")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
