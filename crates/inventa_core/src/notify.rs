//! User-facing notices derived from operation results.
//!
//! # Responsibility
//! - Define the notifier collaborator contract (`message`, `kind`).
//! - Turn explicit operation outcomes into notices the caller can route.
//!
//! # Invariants
//! - Notifying is fire-and-forget; core logic never depends on delivery.
//! - Core operations return results; they never notify on their own.

use crate::logging::log_value;
use crate::model::book::Book;
use crate::model::period::Period;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
    Warning,
}

impl Display for NoticeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
        })
    }
}

/// One message ready for a notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, message)
    }

    pub fn period_created(period: &Period) -> Self {
        Self::success(format!("Periodo \"{}\" creado", period.name))
    }

    pub fn period_closed(period: &Period) -> Self {
        Self::success(format!("Periodo \"{}\" cerrado", period.name))
    }

    pub fn book_merged(book: &Book, created: bool) -> Self {
        if created {
            Self::success(format!("Libro \"{}\" agregado al catálogo", book.title))
        } else {
            Self::success(format!(
                "Libro \"{}\" actualizado ({} unidades)",
                book.title, book.quantity
            ))
        }
    }

    /// Hands this notice to `notifier`.
    pub fn deliver(&self, notifier: &dyn Notifier) {
        notifier.notify(&self.message, self.kind);
    }
}

/// Notifier collaborator (toast/flash channel in a UI).
pub trait Notifier {
    fn notify(&self, message: &str, kind: NoticeKind);
}

/// Notifier that writes notices to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, kind: NoticeKind) {
        let message = log_value(message);
        match kind {
            NoticeKind::Success => info!("event=notice module=notify kind={kind} message={message}"),
            NoticeKind::Warning | NoticeKind::Error => {
                warn!("event=notice module=notify kind={kind} message={message}")
            }
        }
    }
}
