use inventa_core::db::open_db_in_memory;
use inventa_core::{
    CloseOutcome, CloseRequest, LifecycleError, NameError, NoticeKind, Notifier, Period,
    PeriodConflict, PeriodId, PeriodLifecycle, PeriodStatus, PeriodStore, RepoError, RepoResult,
    SqlitePeriodRepository, Workflow,
};
use std::cell::{Cell, RefCell};

/// Store wrapper that counts requests and can be told to fail closes.
struct CountingStore<'conn> {
    inner: SqlitePeriodRepository<'conn>,
    create_calls: Cell<usize>,
    close_calls: Cell<usize>,
    fail_close: Cell<bool>,
}

impl<'conn> CountingStore<'conn> {
    fn new(conn: &'conn rusqlite::Connection) -> Self {
        Self {
            inner: SqlitePeriodRepository::try_new(conn).unwrap(),
            create_calls: Cell::new(0),
            close_calls: Cell::new(0),
            fail_close: Cell::new(false),
        }
    }
}

impl PeriodStore for CountingStore<'_> {
    fn list_periods(&self) -> RepoResult<Vec<Period>> {
        self.inner.list_periods()
    }

    fn create_period(&self, name: &str, created_by: &str) -> RepoResult<Period> {
        self.create_calls.set(self.create_calls.get() + 1);
        self.inner.create_period(name, created_by)
    }

    fn close_period(&self, id: PeriodId) -> RepoResult<Period> {
        self.close_calls.set(self.close_calls.get() + 1);
        if self.fail_close.get() {
            return Err(RepoError::InvalidData("connection reset".to_string()));
        }
        self.inner.close_period(id)
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: RefCell<Vec<(String, NoticeKind)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, kind: NoticeKind) {
        self.notices.borrow_mut().push((message.to_string(), kind));
    }
}

fn lifecycle_from(store: &impl PeriodStore) -> PeriodLifecycle {
    PeriodLifecycle::new(store.list_periods().unwrap())
}

#[test]
fn create_appends_open_period_when_none_active() {
    let conn = open_db_in_memory().unwrap();
    let store = CountingStore::new(&conn);
    let mut lifecycle = lifecycle_from(&store);

    assert!(lifecycle.open_create_form().unwrap());
    assert_eq!(lifecycle.workflow(), Workflow::Creating);

    let created = lifecycle.create(&store, "Inventario Enero", "ana").unwrap();
    assert_eq!(created.status, PeriodStatus::Open);
    assert_eq!(lifecycle.periods().len(), 1);
    assert_eq!(lifecycle.find_active().map(|period| period.uuid), Some(created.uuid));
    assert_eq!(lifecycle.workflow(), Workflow::Idle);
}

#[test]
fn create_while_active_fails_with_conflict_without_calling_store() {
    let conn = open_db_in_memory().unwrap();
    let store = CountingStore::new(&conn);
    let mut lifecycle = lifecycle_from(&store);
    lifecycle.create(&store, "Enero", "ana").unwrap();

    let err = lifecycle.create(&store, "Febrero", "ana").unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Conflict(PeriodConflict::ActivePeriodExists { .. })
    ));
    assert_eq!(store.create_calls.get(), 1);
    assert_eq!(lifecycle.periods().len(), 1);
}

#[test]
fn create_rejects_blank_and_duplicate_names() {
    let conn = open_db_in_memory().unwrap();
    let store = CountingStore::new(&conn);
    let mut lifecycle = lifecycle_from(&store);
    let first = lifecycle.create(&store, "Inventario Enero", "ana").unwrap();
    lifecycle.close(&store, first.uuid).unwrap();

    assert!(matches!(
        lifecycle.create(&store, "   ", "ana"),
        Err(LifecycleError::Validation(NameError::Empty))
    ));
    assert!(lifecycle.is_duplicate_name("  inventario Enero  "));
    assert!(matches!(
        lifecycle.create(&store, "  inventario Enero  ", "ana"),
        Err(LifecycleError::Validation(NameError::Duplicate(_)))
    ));
    assert_eq!(store.create_calls.get(), 1);
}

#[test]
fn create_honors_store_conflict_when_local_collection_is_stale() {
    let conn = open_db_in_memory().unwrap();
    let store = CountingStore::new(&conn);
    let mut stale = lifecycle_from(&store);

    // Another session opens a period after `stale` was listed.
    store.inner.create_period("Enero", "luis").unwrap();

    assert!(stale.open_create_form().unwrap());
    let err = stale.create(&store, "Febrero", "ana").unwrap_err();
    match err {
        LifecycleError::Conflict(PeriodConflict::ActivePeriodExists { active_name }) => {
            assert_eq!(active_name.as_deref(), Some("Enero"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(stale.periods().is_empty());
    assert_eq!(stale.workflow(), Workflow::Creating);

    stale.refresh(&store).unwrap();
    assert_eq!(stale.find_active().map(|period| period.name.as_str()), Some("Enero"));
}

#[test]
fn double_close_issues_exactly_one_store_request() {
    let conn = open_db_in_memory().unwrap();
    let store = CountingStore::new(&conn);
    let mut lifecycle = lifecycle_from(&store);
    let period = lifecycle.create(&store, "Enero", "ana").unwrap();

    assert!(lifecycle.open_close_prompt(period.uuid).unwrap());
    let CloseRequest::Started(ticket) = lifecycle.begin_close(period.uuid).unwrap() else {
        panic!("first close should start");
    };

    // Impatient second click while the first request is outstanding.
    assert_eq!(
        lifecycle.close(&store, period.uuid).unwrap(),
        CloseOutcome::Ignored
    );
    assert!(!lifecycle.dismiss_prompt());
    assert_eq!(lifecycle.workflow(), Workflow::Closing(period.uuid));
    assert_eq!(store.close_calls.get(), 0);

    let outcome = store.close_period(ticket.period_id());
    let closed = lifecycle.finish_close(ticket, outcome).unwrap();
    assert_eq!(store.close_calls.get(), 1);

    assert_eq!(closed.status, PeriodStatus::Closed);
    assert!(closed.closed_at.is_some());
    assert_eq!(lifecycle.periods()[0].status, PeriodStatus::Closed);
    assert!(lifecycle.find_active().is_none());
    assert_eq!(lifecycle.workflow(), Workflow::Idle);
    assert!(!lifecycle.is_busy());
}

#[test]
fn failed_close_leaves_status_unchanged_and_clears_busy() {
    let conn = open_db_in_memory().unwrap();
    let store = CountingStore::new(&conn);
    let mut lifecycle = lifecycle_from(&store);
    let period = lifecycle.create(&store, "Enero", "ana").unwrap();

    store.fail_close.set(true);
    let err = lifecycle.close(&store, period.uuid).unwrap_err();
    assert!(matches!(err, LifecycleError::Transport(_)));
    assert_eq!(lifecycle.periods()[0].status, PeriodStatus::Open);
    assert_eq!(lifecycle.periods()[0].closed_at, None);
    assert!(!lifecycle.is_busy());
    assert_eq!(lifecycle.workflow(), Workflow::ConfirmingClose(period.uuid));

    let notifier = RecordingNotifier::default();
    err.notice().deliver(&notifier);
    assert_eq!(notifier.notices.borrow()[0].1, NoticeKind::Error);

    store.fail_close.set(false);
    let outcome = lifecycle.close(&store, period.uuid).unwrap();
    assert!(matches!(outcome, CloseOutcome::Closed(ref closed) if closed.status == PeriodStatus::Closed));
    assert_eq!(store.close_calls.get(), 2);
}

#[test]
fn close_rejects_already_closed_period_locally() {
    let conn = open_db_in_memory().unwrap();
    let store = CountingStore::new(&conn);
    let mut lifecycle = lifecycle_from(&store);
    let period = lifecycle.create(&store, "Enero", "ana").unwrap();
    lifecycle.close(&store, period.uuid).unwrap();

    let err = lifecycle.close(&store, period.uuid).unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Conflict(PeriodConflict::AlreadyClosed(id)) if id == period.uuid
    ));
    assert_eq!(store.close_calls.get(), 1);
}

#[test]
fn search_over_stored_periods() {
    let conn = open_db_in_memory().unwrap();
    let store = CountingStore::new(&conn);
    let mut lifecycle = lifecycle_from(&store);

    let enero = lifecycle.create(&store, "Inventario Enero", "ana").unwrap();
    lifecycle.close(&store, enero.uuid).unwrap();
    lifecycle.create(&store, "Inventario Febrero", "luis").unwrap();

    let all: Vec<&str> = lifecycle
        .search("")
        .into_iter()
        .map(|period| period.name.as_str())
        .collect();
    assert_eq!(all, vec!["Inventario Enero", "Inventario Febrero"]);

    let open: Vec<&str> = lifecycle
        .search("abierto")
        .into_iter()
        .map(|period| period.name.as_str())
        .collect();
    assert_eq!(open, vec!["Inventario Febrero"]);

    assert_eq!(lifecycle.search("CERRADO").len(), 1);
    assert_eq!(lifecycle.search("Ana").len(), 1);
}

#[test]
fn success_notices_name_the_period() {
    let conn = open_db_in_memory().unwrap();
    let store = CountingStore::new(&conn);
    let mut lifecycle = lifecycle_from(&store);
    let notifier = RecordingNotifier::default();

    let period = lifecycle.create(&store, "Enero", "ana").unwrap();
    inventa_core::Notice::period_created(&period).deliver(&notifier);

    let notices = notifier.notices.borrow();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].0.contains("Enero"));
    assert_eq!(notices[0].1, NoticeKind::Success);
}
