//! Domain model for inventory periods and the book catalog.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep lifecycle rules (open/closed) next to the data they constrain.
//!
//! # Invariants
//! - Periods and books are identified by stable UUIDs assigned at creation.
//! - Closed periods are terminal; there is no reopen transition.

pub mod attribution;
pub mod book;
pub mod period;
