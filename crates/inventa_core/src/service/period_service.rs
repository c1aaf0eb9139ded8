//! Inventory period lifecycle use-case service.
//!
//! # Responsibility
//! - Pre-check the single-open-period and unique-name rules before creating.
//! - Drive the close confirmation workflow with a busy guard.
//! - Filter and look up periods in the caller-supplied collection.
//!
//! # Invariants
//! - At most one close request is in flight; extra requests are ignored, not
//!   queued.
//! - Busy state is cleared on every completion path, success or failure.
//! - The local collection is only mutated after the store confirms a change.
//! - The service never re-fetches on its own; callers decide when to refresh.

use crate::logging::log_value;
use crate::model::period::{
    normalize_period_name, Period, PeriodId, PeriodStatus, PeriodValidationError,
};
use crate::notify::Notice;
use crate::repo::period_repo::{PeriodConflict, PeriodStore, RepoError, RepoResult};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Input rejected before reaching the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// Name is empty or whitespace-only.
    Empty,
    /// Another period already uses this name (case-insensitive, trimmed).
    Duplicate(String),
}

impl Display for NameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "period name must not be empty"),
            Self::Duplicate(name) => write!(f, "a period named `{name}` already exists"),
        }
    }
}

/// Errors from period lifecycle operations.
#[derive(Debug)]
pub enum LifecycleError {
    /// Invalid input shape; retry after correcting it.
    Validation(NameError),
    /// Business-rule violation (second open period, already closed).
    Conflict(PeriodConflict),
    /// Target period is not in the local collection or the store.
    NotFound(PeriodId),
    /// Store or transport failure.
    Transport(RepoError),
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict(conflict) => write!(f, "{conflict}"),
            Self::NotFound(id) => write!(f, "period not found: {id}"),
            Self::Transport(err) => write!(f, "period store failed: {err}"),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LifecycleError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Conflict(PeriodConflict::DuplicateName(name)) => {
                Self::Validation(NameError::Duplicate(name))
            }
            RepoError::Conflict(conflict) => Self::Conflict(conflict),
            RepoError::Validation(PeriodValidationError::BlankName) => {
                Self::Validation(NameError::Empty)
            }
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Transport(other),
        }
    }
}

impl LifecycleError {
    /// Notice the caller should route to its notifier.
    pub fn notice(&self) -> Notice {
        match self {
            Self::Validation(_) | Self::Conflict(_) => Notice::warning(self.to_string()),
            Self::NotFound(_) | Self::Transport(_) => Notice::error(self.to_string()),
        }
    }
}

/// Transient workflow state of the period admin screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    Idle,
    /// Create form is open.
    Creating,
    /// Close confirmation prompt is open for this period.
    ConfirmingClose(PeriodId),
    /// A close request for this period is in flight.
    Closing(PeriodId),
}

/// Proof that a close request was started. Consumed by
/// [`PeriodLifecycle::finish_close`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a started close must be finished to clear the busy state"]
pub struct CloseTicket {
    period_id: PeriodId,
}

impl CloseTicket {
    pub fn period_id(&self) -> PeriodId {
        self.period_id
    }
}

/// Result of asking to start a close.
#[derive(Debug, PartialEq, Eq)]
pub enum CloseRequest {
    /// Caller must issue the store request and then call `finish_close`.
    Started(CloseTicket),
    /// Another close is in flight; nothing was issued.
    Ignored { in_flight: PeriodId },
}

/// Outcome of [`PeriodLifecycle::close`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed(Period),
    Ignored,
}

/// Period lifecycle manager over a caller-supplied collection.
#[derive(Debug, Clone)]
pub struct PeriodLifecycle {
    periods: Vec<Period>,
    workflow: Workflow,
}

impl PeriodLifecycle {
    /// Wraps a collection as returned by `PeriodStore::list_periods`.
    pub fn new(periods: Vec<Period>) -> Self {
        Self {
            periods,
            workflow: Workflow::Idle,
        }
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn workflow(&self) -> Workflow {
        self.workflow
    }

    /// Returns whether a close request is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self.workflow, Workflow::Closing(_))
    }

    /// Replaces the collection with a fresh list from the caller.
    pub fn replace_periods(&mut self, periods: Vec<Period>) {
        self.periods = periods;
    }

    /// Re-lists periods from `store`. Local state is kept on failure.
    pub fn refresh(&mut self, store: &impl PeriodStore) -> Result<(), LifecycleError> {
        let periods = store.list_periods().map_err(LifecycleError::Transport)?;
        self.replace_periods(periods);
        Ok(())
    }

    /// Returns the single open period, if any.
    pub fn find_active(&self) -> Option<&Period> {
        self.periods.iter().find(|period| period.is_open())
    }

    /// Case-insensitive, trimmed name comparison. Blank candidates are never
    /// duplicates.
    pub fn is_duplicate_name(&self, candidate: &str) -> bool {
        let Some(candidate) = normalize_period_name(candidate) else {
            return false;
        };
        self.periods
            .iter()
            .any(|period| normalize_period_name(&period.name).as_deref() == Some(candidate.as_str()))
    }

    /// Case-insensitive substring filter over name, creator and status label.
    ///
    /// A blank term returns the whole collection. Order is preserved.
    pub fn search(&self, term: &str) -> Vec<&Period> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.periods.iter().collect();
        }
        self.periods
            .iter()
            .filter(|period| period.matches_lowercase(&term))
            .collect()
    }

    /// Opens the create form unless a period is already open.
    ///
    /// Returns `Ok(false)` and leaves the workflow untouched while a close is
    /// in flight.
    pub fn open_create_form(&mut self) -> Result<bool, LifecycleError> {
        if let Some(active) = self.find_active() {
            return Err(active_conflict(active));
        }
        if self.is_busy() {
            return Ok(false);
        }
        self.workflow = Workflow::Creating;
        Ok(true)
    }

    /// Creates and appends a new open period.
    ///
    /// On failure the collection and workflow are left untouched, so an open
    /// create form stays open for correction.
    pub fn create(
        &mut self,
        store: &impl PeriodStore,
        name: &str,
        actor: &str,
    ) -> Result<Period, LifecycleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LifecycleError::Validation(NameError::Empty));
        }
        if self.is_duplicate_name(name) {
            return Err(LifecycleError::Validation(NameError::Duplicate(
                name.to_string(),
            )));
        }
        if let Some(active) = self.find_active() {
            return Err(active_conflict(active));
        }

        match store.create_period(name, actor) {
            Ok(period) => {
                info!(
                    "event=period_create module=period status=ok period_id={}",
                    period.uuid
                );
                self.periods.push(period.clone());
                if self.workflow == Workflow::Creating {
                    self.workflow = Workflow::Idle;
                }
                Ok(period)
            }
            Err(err) => {
                warn!(
                    "event=period_create module=period status=error error={}",
                    log_value(&err.to_string())
                );
                Err(err.into())
            }
        }
    }

    /// Opens the close confirmation prompt for `id`.
    ///
    /// Returns `Ok(false)` and keeps the in-flight close while busy.
    pub fn open_close_prompt(&mut self, id: PeriodId) -> Result<bool, LifecycleError> {
        self.closable(id)?;
        if self.is_busy() {
            return Ok(false);
        }
        self.workflow = Workflow::ConfirmingClose(id);
        Ok(true)
    }

    /// Dismisses any open form or prompt.
    ///
    /// Returns `false` and keeps the prompt while a close is in flight.
    pub fn dismiss_prompt(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.workflow = Workflow::Idle;
        true
    }

    /// Starts a close for `id`, entering the busy state.
    pub fn begin_close(&mut self, id: PeriodId) -> Result<CloseRequest, LifecycleError> {
        if let Workflow::Closing(in_flight) = self.workflow {
            info!(
                "event=period_close module=period status=ignored period_id={id} in_flight={in_flight}"
            );
            return Ok(CloseRequest::Ignored { in_flight });
        }
        self.closable(id)?;
        self.workflow = Workflow::Closing(id);
        Ok(CloseRequest::Started(CloseTicket { period_id: id }))
    }

    /// Completes a started close with the store's outcome.
    ///
    /// Success replaces the local entry and returns to `Idle`. Failure leaves
    /// the collection untouched and reopens the prompt so the user can retry.
    pub fn finish_close(
        &mut self,
        ticket: CloseTicket,
        outcome: RepoResult<Period>,
    ) -> Result<Period, LifecycleError> {
        let id = ticket.period_id;
        match outcome {
            Ok(closed) => {
                self.workflow = Workflow::Idle;
                if let Some(slot) = self.periods.iter_mut().find(|period| period.uuid == id) {
                    *slot = closed.clone();
                }
                info!("event=period_close module=period status=ok period_id={id}");
                Ok(closed)
            }
            Err(err) => {
                self.workflow = Workflow::ConfirmingClose(id);
                warn!(
                    "event=period_close module=period status=error period_id={id} error={}",
                    log_value(&err.to_string())
                );
                Err(err.into())
            }
        }
    }

    /// Starts, issues and finishes a close in one call.
    pub fn close(
        &mut self,
        store: &impl PeriodStore,
        id: PeriodId,
    ) -> Result<CloseOutcome, LifecycleError> {
        match self.begin_close(id)? {
            CloseRequest::Ignored { .. } => Ok(CloseOutcome::Ignored),
            CloseRequest::Started(ticket) => {
                let outcome = store.close_period(ticket.period_id());
                self.finish_close(ticket, outcome).map(CloseOutcome::Closed)
            }
        }
    }

    fn closable(&self, id: PeriodId) -> Result<&Period, LifecycleError> {
        let period = self
            .periods
            .iter()
            .find(|period| period.uuid == id)
            .ok_or(LifecycleError::NotFound(id))?;
        if period.status == PeriodStatus::Closed {
            return Err(LifecycleError::Conflict(PeriodConflict::AlreadyClosed(id)));
        }
        Ok(period)
    }
}

fn active_conflict(active: &Period) -> LifecycleError {
    LifecycleError::Conflict(PeriodConflict::ActivePeriodExists {
        active_name: Some(active.name.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::{CloseRequest, LifecycleError, NameError, PeriodLifecycle, Workflow};
    use crate::model::period::{Period, PeriodStatus};
    use crate::notify::NoticeKind;
    use crate::repo::period_repo::{PeriodConflict, RepoError};
    use uuid::Uuid;

    fn period(name: &str, status: PeriodStatus, created_by: &str) -> Period {
        Period {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            status,
            created_at: 1_000,
            closed_at: (status == PeriodStatus::Closed).then_some(2_000),
            created_by: created_by.to_string(),
            total_movements: 0,
            total_books: 0,
        }
    }

    fn sample() -> PeriodLifecycle {
        PeriodLifecycle::new(vec![
            period("Inventario Enero", PeriodStatus::Closed, "ana"),
            period("Inventario Febrero", PeriodStatus::Open, "luis"),
            period("Cierre anual", PeriodStatus::Closed, "abierto.user"),
        ])
    }

    #[test]
    fn duplicate_name_is_trimmed_and_case_insensitive() {
        let lifecycle = sample();
        assert!(lifecycle.is_duplicate_name("  inventario Enero  "));
        assert!(lifecycle.is_duplicate_name("INVENTARIO FEBRERO"));
        assert!(!lifecycle.is_duplicate_name("Inventario Marzo"));
        assert!(!lifecycle.is_duplicate_name("   "));
        assert!(!lifecycle.is_duplicate_name(""));
    }

    #[test]
    fn search_blank_returns_everything_in_order() {
        let lifecycle = sample();
        let names: Vec<&str> = lifecycle
            .search("  ")
            .into_iter()
            .map(|period| period.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Inventario Enero", "Inventario Febrero", "Cierre anual"]
        );
    }

    #[test]
    fn search_matches_status_name_and_creator() {
        let lifecycle = sample();
        let names: Vec<&str> = lifecycle
            .search("ABIERTO")
            .into_iter()
            .map(|period| period.name.as_str())
            .collect();
        assert_eq!(names, vec!["Inventario Febrero", "Cierre anual"]);

        assert_eq!(lifecycle.search("enero").len(), 1);
        assert_eq!(lifecycle.search("LUIS").len(), 1);
        assert!(lifecycle.search("marzo").is_empty());
    }

    #[test]
    fn find_active_returns_open_period() {
        let lifecycle = sample();
        assert_eq!(
            lifecycle.find_active().map(|period| period.name.as_str()),
            Some("Inventario Febrero")
        );
        assert!(PeriodLifecycle::new(Vec::new()).find_active().is_none());
    }

    #[test]
    fn open_create_form_rejects_when_active_exists() {
        let mut lifecycle = sample();
        let err = lifecycle.open_create_form().unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Conflict(PeriodConflict::ActivePeriodExists { .. })
        ));
        assert_eq!(lifecycle.workflow(), Workflow::Idle);
    }

    #[test]
    fn forms_report_not_opened_while_close_in_flight() {
        let mut lifecycle = sample();
        let open_id = lifecycle.find_active().unwrap().uuid;
        assert!(lifecycle.open_close_prompt(open_id).unwrap());

        let CloseRequest::Started(_ticket) = lifecycle.begin_close(open_id).unwrap() else {
            panic!("close should start");
        };
        assert!(!lifecycle.open_close_prompt(open_id).unwrap());
        assert_eq!(lifecycle.workflow(), Workflow::Closing(open_id));

        // A refresh mid-flight can drop the open period from the collection.
        let closed_only: Vec<_> = lifecycle
            .periods()
            .iter()
            .filter(|period| !period.is_open())
            .cloned()
            .collect();
        lifecycle.replace_periods(closed_only);
        assert!(!lifecycle.open_create_form().unwrap());
        assert_eq!(lifecycle.workflow(), Workflow::Closing(open_id));
    }

    #[test]
    fn second_begin_close_is_ignored_while_busy() {
        let mut lifecycle = sample();
        let open_id = lifecycle.find_active().unwrap().uuid;

        let first = lifecycle.begin_close(open_id).unwrap();
        assert!(matches!(first, CloseRequest::Started(_)));
        assert!(lifecycle.is_busy());
        assert!(!lifecycle.dismiss_prompt());

        let second = lifecycle.begin_close(open_id).unwrap();
        assert_eq!(second, CloseRequest::Ignored { in_flight: open_id });

        let CloseRequest::Started(ticket) = first else {
            unreachable!();
        };
        let err = lifecycle
            .finish_close(ticket, Err(RepoError::InvalidData("offline".to_string())))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Transport(_)));
        assert!(!lifecycle.is_busy());
        assert_eq!(lifecycle.workflow(), Workflow::ConfirmingClose(open_id));
        assert_eq!(lifecycle.find_active().unwrap().uuid, open_id);
        assert!(lifecycle.dismiss_prompt());
    }

    #[test]
    fn begin_close_rejects_closed_and_unknown_periods() {
        let mut lifecycle = sample();
        let closed_id = lifecycle.periods()[0].uuid;
        assert!(matches!(
            lifecycle.begin_close(closed_id),
            Err(LifecycleError::Conflict(PeriodConflict::AlreadyClosed(id))) if id == closed_id
        ));

        let unknown = Uuid::new_v4();
        assert!(matches!(
            lifecycle.begin_close(unknown),
            Err(LifecycleError::NotFound(id)) if id == unknown
        ));
        assert!(!lifecycle.is_busy());
    }

    #[test]
    fn errors_map_to_notice_kinds() {
        assert_eq!(
            LifecycleError::Validation(NameError::Empty).notice().kind,
            NoticeKind::Warning
        );
        assert_eq!(
            LifecycleError::Transport(RepoError::InvalidData("x".to_string()))
                .notice()
                .kind,
            NoticeKind::Error
        );
    }

    #[test]
    fn store_duplicate_conflict_maps_to_validation() {
        let err: LifecycleError =
            RepoError::Conflict(PeriodConflict::DuplicateName("Enero".to_string())).into();
        assert!(matches!(
            err,
            LifecycleError::Validation(NameError::Duplicate(name)) if name == "Enero"
        ));
    }
}
