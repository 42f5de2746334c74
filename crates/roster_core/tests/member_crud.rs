use roster_core::{
    Member, MemoryRecordStore, RecordStore, RepoError, Repository, SqliteRecordStore,
    StoreConfig, ValidationError,
};
use std::sync::Arc;

fn memory_repo() -> Repository<Member, MemoryRecordStore<Member>> {
    Repository::new(Arc::new(MemoryRecordStore::new()))
}

fn sqlite_repo() -> Repository<Member, SqliteRecordStore> {
    let store = SqliteRecordStore::open_in_memory(&StoreConfig::default()).unwrap();
    Repository::new(Arc::new(store))
}

fn save_then_find_returns_equal_record<S: RecordStore<Member>>(repo: Repository<Member, S>) {
    let saved = repo.save(Member::with_age("member1", 10)).unwrap();
    let id = saved.id.unwrap();
    assert!(id > 0);

    let audit = saved.audit.unwrap();
    assert_eq!(audit.created_at, audit.updated_at);

    repo.clear();
    assert_eq!(repo.find_by_id(id).unwrap(), Some(saved));
}

#[test]
fn save_then_find_returns_equal_record_memory() {
    save_then_find_returns_equal_record(memory_repo());
}

#[test]
fn save_then_find_returns_equal_record_sqlite() {
    save_then_find_returns_equal_record(sqlite_repo());
}

fn missing_ids_are_absent_not_errors<S: RecordStore<Member>>(repo: Repository<Member, S>) {
    assert_eq!(repo.find_by_id(999).unwrap(), None);
    assert!(!repo.exists_by_id(999).unwrap());
}

#[test]
fn missing_ids_are_absent_not_errors_memory() {
    missing_ids_are_absent_not_errors(memory_repo());
}

#[test]
fn missing_ids_are_absent_not_errors_sqlite() {
    missing_ids_are_absent_not_errors(sqlite_repo());
}

fn delete_is_idempotent_and_ids_are_never_reused<S: RecordStore<Member>>(
    repo: Repository<Member, S>,
) {
    let first = repo.save(Member::new("member1")).unwrap();
    let first_id = first.id.unwrap();
    let second_id = repo.save(Member::new("member2")).unwrap().id.unwrap();

    assert!(repo.delete_by_id(second_id).unwrap());
    assert_eq!(repo.find_by_id(second_id).unwrap(), None);
    assert!(!repo.delete_by_id(second_id).unwrap());

    let third_id = repo.save(Member::new("member3")).unwrap().id.unwrap();
    assert!(third_id != first_id && third_id != second_id);

    let mut reused = Member::new("member4");
    reused.id = Some(second_id);
    assert!(matches!(
        repo.insert(reused),
        Err(RepoError::DuplicateIdentifier { id, .. }) if id == second_id
    ));
    assert_eq!(repo.count().unwrap(), 2);
}

#[test]
fn delete_is_idempotent_and_ids_are_never_reused_memory() {
    delete_is_idempotent_and_ids_are_never_reused(memory_repo());
}

#[test]
fn delete_is_idempotent_and_ids_are_never_reused_sqlite() {
    delete_is_idempotent_and_ids_are_never_reused(sqlite_repo());
}

fn update_keeps_created_at_and_advances_updated_at<S: RecordStore<Member>>(
    repo: Repository<Member, S>,
) {
    let saved = repo.save(Member::with_age("member1", 10)).unwrap();
    let before = saved.audit.unwrap();

    let mut changed = saved.clone();
    changed.username = "renamed".to_string();
    let updated = repo.save(changed).unwrap();
    let after = updated.audit.unwrap();

    assert_eq!(updated.id, saved.id);
    assert_eq!(updated.username, "renamed");
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at > before.updated_at);
}

#[test]
fn update_keeps_created_at_and_advances_updated_at_memory() {
    update_keeps_created_at_and_advances_updated_at(memory_repo());
}

#[test]
fn update_keeps_created_at_and_advances_updated_at_sqlite() {
    update_keeps_created_at_and_advances_updated_at(sqlite_repo());
}

fn caller_supplied_ids_are_honoured<S: RecordStore<Member>>(repo: Repository<Member, S>) {
    let mut member = Member::new("member1");
    member.id = Some(40);
    let stored = repo.insert(member.clone()).unwrap();
    assert_eq!(stored.id, Some(40));

    assert!(matches!(
        repo.insert(member),
        Err(RepoError::DuplicateIdentifier { id: 40, .. })
    ));

    let next = repo.save(Member::new("member2")).unwrap();
    assert!(next.id.unwrap() > 40);
}

#[test]
fn caller_supplied_ids_are_honoured_memory() {
    caller_supplied_ids_are_honoured(memory_repo());
}

#[test]
fn caller_supplied_ids_are_honoured_sqlite() {
    caller_supplied_ids_are_honoured(sqlite_repo());
}

fn invalid_records_are_rejected_on_write<S: RecordStore<Member>>(repo: Repository<Member, S>) {
    let blank = repo.save(Member::new("   ")).unwrap_err();
    assert!(matches!(
        blank,
        RepoError::Validation(ValidationError::EmptyField { .. })
    ));

    let negative = repo.save(Member::with_age("member1", -1)).unwrap_err();
    assert!(matches!(
        negative,
        RepoError::Validation(ValidationError::NegativeValue { .. })
    ));

    let mut ghost = Member::new("ghost");
    ghost.id = Some(77);
    assert!(repo.save(ghost).unwrap_err().is_not_found());
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn invalid_records_are_rejected_on_write_memory() {
    invalid_records_are_rejected_on_write(memory_repo());
}

#[test]
fn invalid_records_are_rejected_on_write_sqlite() {
    invalid_records_are_rejected_on_write(sqlite_repo());
}
