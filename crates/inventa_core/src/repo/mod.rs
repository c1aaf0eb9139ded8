//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the period store contract consumed by the lifecycle service.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repositories only accept connections opened through `db::open_db*`.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.

pub mod book_repo;
pub mod period_repo;
