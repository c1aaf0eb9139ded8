//! Free-text parsing for invoice ingestion.
//!
//! # Responsibility
//! - Provide pure, infallible heuristics over invoice line text.
//!
//! # Invariants
//! - Parsers never touch storage and never return errors.

pub mod attribution;
