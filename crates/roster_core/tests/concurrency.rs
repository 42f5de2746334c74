use roster_core::{
    LockMode, Member, MemoryRecordStore, Mutation, Predicate, Query, RecordStore, Repository,
    SqliteRecordStore, StoreConfig,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

const THREADS: usize = 4;
const PER_THREAD: usize = 25;

fn memory_repo() -> Repository<Member, MemoryRecordStore<Member>> {
    Repository::new(Arc::new(MemoryRecordStore::new()))
}

fn sqlite_repo() -> Repository<Member, SqliteRecordStore> {
    let store = SqliteRecordStore::open_in_memory(&StoreConfig::default()).unwrap();
    Repository::new(Arc::new(store))
}

fn parallel_inserts_get_unique_ids<S: RecordStore<Member>>(repo: Repository<Member, S>) {
    let ids: Vec<i64> = thread::scope(|scope| {
        let workers: Vec<_> = (0..THREADS)
            .map(|worker| {
                let repo = &repo;
                scope.spawn(move || {
                    (0..PER_THREAD)
                        .map(|n| {
                            let name = format!("w{worker}-m{n}");
                            repo.save(Member::with_age(name, 10)).unwrap().id.unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|worker| worker.join().unwrap())
            .collect()
    });

    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), THREADS * PER_THREAD);
    assert!(ids.iter().all(|id| *id > 0));
    assert_eq!(repo.count().unwrap(), (THREADS * PER_THREAD) as u64);
}

#[test]
fn parallel_inserts_get_unique_ids_memory() {
    parallel_inserts_get_unique_ids(memory_repo());
}

#[test]
fn parallel_inserts_get_unique_ids_sqlite() {
    parallel_inserts_get_unique_ids(sqlite_repo());
}

/// Readers run beside bulk updates and must never see a half-applied one.
fn bulk_updates_are_atomic_to_concurrent_readers<S: RecordStore<Member>>(
    repo: Repository<Member, S>,
) {
    for n in 0..10 {
        repo.save(Member::with_age(format!("member{n}"), 0)).unwrap();
    }
    let rounds = 5;

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..rounds {
                    repo.bulk_update(&Predicate::All, &Mutation::increment("age", 1))
                        .unwrap();
                }
            });
        }
        for _ in 0..2 {
            scope.spawn(|| {
                for _ in 0..50 {
                    let ages: HashSet<i64> = repo
                        .find(&Query::all())
                        .unwrap()
                        .into_iter()
                        .map(|m| m.age)
                        .collect();
                    assert_eq!(ages.len(), 1, "mixed ages observed: {ages:?}");
                }
            });
        }
    });

    let expected = (THREADS * rounds) as i64;
    let members = repo.find(&Query::all()).unwrap();
    assert_eq!(members.len(), 10);
    assert!(members.iter().all(|m| m.age == expected));
}

#[test]
fn bulk_updates_are_atomic_to_concurrent_readers_memory() {
    bulk_updates_are_atomic_to_concurrent_readers(memory_repo());
}

#[test]
fn bulk_updates_are_atomic_to_concurrent_readers_sqlite() {
    bulk_updates_are_atomic_to_concurrent_readers(sqlite_repo());
}

/// Each thread owns one record and rewrites it under the exclusive lock.
fn exclusive_writes_issue_distinct_increasing_stamps<S: RecordStore<Member>>(
    repo: Repository<Member, S>,
) {
    let ids: Vec<i64> = (0..THREADS)
        .map(|n| {
            repo.save(Member::with_age(format!("member{n}"), 0))
                .unwrap()
                .id
                .unwrap()
        })
        .collect();

    let stamps: Vec<i64> = thread::scope(|scope| {
        let workers: Vec<_> = ids
            .iter()
            .map(|&id| {
                let repo = &repo;
                scope.spawn(move || {
                    let mut seen = Vec::with_capacity(PER_THREAD);
                    for _ in 0..PER_THREAD {
                        let mut member = repo
                            .find_by_id_with_lock(id, LockMode::Exclusive)
                            .unwrap()
                            .unwrap();
                        member.age += 1;
                        let saved = repo.save_with_lock(member, LockMode::Exclusive).unwrap();
                        seen.push(saved.audit.unwrap().updated_at);
                    }
                    assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
                    seen
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|worker| worker.join().unwrap())
            .collect()
    });

    let unique: HashSet<i64> = stamps.iter().copied().collect();
    assert_eq!(unique.len(), THREADS * PER_THREAD);

    repo.clear();
    for id in ids {
        let member = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(member.age, PER_THREAD as i64);
    }
}

#[test]
fn exclusive_writes_issue_distinct_increasing_stamps_memory() {
    exclusive_writes_issue_distinct_increasing_stamps(memory_repo());
}

#[test]
fn exclusive_writes_issue_distinct_increasing_stamps_sqlite() {
    exclusive_writes_issue_distinct_increasing_stamps(sqlite_repo());
}
