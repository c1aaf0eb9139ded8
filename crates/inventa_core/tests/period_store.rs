use inventa_core::db::open_db_in_memory;
use inventa_core::{
    PeriodConflict, PeriodStatus, PeriodStore, PeriodValidationError, RepoError,
    SqlitePeriodRepository,
};
use rusqlite::params;
use uuid::Uuid;

#[test]
fn create_period_starts_open_with_trimmed_name() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePeriodRepository::try_new(&conn).unwrap();

    let period = repo.create_period("  Inventario Enero ", "ana").unwrap();
    assert_eq!(period.name, "Inventario Enero");
    assert_eq!(period.status, PeriodStatus::Open);
    assert_eq!(period.closed_at, None);
    assert_eq!(period.created_by, "ana");
    assert_eq!(period.total_movements, 0);
    assert_eq!(period.total_books, 0);
    assert!(period.created_at > 0);

    let loaded = repo.get_period(period.uuid).unwrap().unwrap();
    assert_eq!(loaded, period);
}

#[test]
fn create_period_rejects_blank_name_and_creator() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePeriodRepository::try_new(&conn).unwrap();

    let err = repo.create_period("   ", "ana").unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(PeriodValidationError::BlankName)
    ));

    let err = repo.create_period("Enero", " ").unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(PeriodValidationError::BlankCreator)
    ));
    assert!(repo.list_periods().unwrap().is_empty());
}

#[test]
fn create_period_rejects_second_open_period() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePeriodRepository::try_new(&conn).unwrap();

    repo.create_period("Enero", "ana").unwrap();
    let err = repo.create_period("Febrero", "ana").unwrap_err();
    match err {
        RepoError::Conflict(PeriodConflict::ActivePeriodExists { active_name }) => {
            assert_eq!(active_name.as_deref(), Some("Enero"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(repo.list_periods().unwrap().len(), 1);
}

#[test]
fn create_period_rejects_duplicate_name_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePeriodRepository::try_new(&conn).unwrap();

    let first = repo.create_period("Año Único", "ana").unwrap();
    repo.close_period(first.uuid).unwrap();

    let err = repo.create_period("  AÑO ÚNICO ", "luis").unwrap_err();
    assert!(matches!(
        err,
        RepoError::Conflict(PeriodConflict::DuplicateName(_))
    ));
}

#[test]
fn close_period_sets_closed_at_once() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePeriodRepository::try_new(&conn).unwrap();

    let period = repo.create_period("Enero", "ana").unwrap();
    let closed = repo.close_period(period.uuid).unwrap();
    assert_eq!(closed.status, PeriodStatus::Closed);
    let closed_at = closed.closed_at.expect("closed_at should be set");
    assert!(closed_at >= closed.created_at);

    let err = repo.close_period(period.uuid).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Conflict(PeriodConflict::AlreadyClosed(id)) if id == period.uuid
    ));
    assert_eq!(
        repo.get_period(period.uuid).unwrap().unwrap().closed_at,
        Some(closed_at)
    );
}

#[test]
fn close_missing_period_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePeriodRepository::try_new(&conn).unwrap();

    let missing = Uuid::new_v4();
    let err = repo.close_period(missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn closing_allows_next_period_to_open() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePeriodRepository::try_new(&conn).unwrap();

    let first = repo.create_period("Enero", "ana").unwrap();
    repo.close_period(first.uuid).unwrap();
    let second = repo.create_period("Febrero", "ana").unwrap();
    assert_eq!(second.status, PeriodStatus::Open);
}

#[test]
fn list_periods_is_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePeriodRepository::try_new(&conn).unwrap();

    let first = repo.create_period("Enero", "ana").unwrap();
    repo.close_period(first.uuid).unwrap();
    let second = repo.create_period("Febrero", "ana").unwrap();

    conn.execute(
        "UPDATE inventory_periods SET created_at = ?2 WHERE uuid = ?1;",
        params![first.uuid.to_string(), 1_000_i64],
    )
    .unwrap();

    let names: Vec<String> = repo
        .list_periods()
        .unwrap()
        .into_iter()
        .map(|period| period.name)
        .collect();
    assert_eq!(names, vec![second.name, first.name]);
}

#[test]
fn invalid_persisted_status_is_reported() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePeriodRepository::try_new(&conn).unwrap();
    let period = repo.create_period("Enero", "ana").unwrap();

    conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
        .unwrap();
    conn.execute(
        "UPDATE inventory_periods SET status = 'pausado' WHERE uuid = ?1;",
        [period.uuid.to_string()],
    )
    .unwrap();

    let err = repo.list_periods().unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}
