use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use datarepo::construct::{DataRepo, KeyOptions};
use datarepo::datatype::{TypedScalar, ValueKind};
use datarepo::error::RepoError;

#[test]
fn only_one_concurrent_create_succeeds() {
    let repo = DataRepo::new();
    let created = AtomicUsize::new(0);
    let duplicates = AtomicUsize::new(0);
    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| match repo.create_key("shared", ValueKind::Integer, &KeyOptions::new()) {
                Ok(()) => {
                    created.fetch_add(1, Ordering::SeqCst);
                }
                Err(RepoError::DuplicateKey(_)) => {
                    duplicates.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => panic!("unexpected error {e}"),
            });
        }
    });
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(duplicates.load(Ordering::SeqCst), 7);
}

#[test]
fn readers_always_see_whole_snapshots() {
    let repo = DataRepo::new();
    repo.create_key("cfg", ValueKind::Json, &KeyOptions::new()).unwrap();
    let a = "a".repeat(512);
    let b = "b".repeat(512);
    thread::scope(|s| {
        for candidate in [&a, &b] {
            let repo = &repo;
            s.spawn(move || {
                for _ in 0..500 {
                    repo.write("cfg", candidate.as_str(), None).unwrap();
                }
            });
        }
        for _ in 0..2 {
            s.spawn(|| {
                for _ in 0..500 {
                    match repo.read("cfg", None).unwrap().value() {
                        None => {}
                        Some(TypedScalar::Json(text)) => assert!(*text == a || *text == b),
                        Some(other) => panic!("unexpected {other:?}"),
                    }
                }
            });
        }
    });
}

#[test]
fn disjoint_keys_from_many_threads() {
    let repo = Arc::new(DataRepo::new());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let repo = Arc::clone(&repo);
            thread::spawn(move || {
                for i in 0..250 {
                    let key = format!("t{}.k{}", t, i);
                    repo.create_and_write(key.as_str(), ValueKind::Integer, i, &KeyOptions::new())
                        .unwrap();
                    if i % 2 == 0 {
                        repo.delete_key(&key, None).unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(repo.len(), 4 * 125);
    assert_eq!(repo.child_keys("t0").unwrap().len(), 125);
}

#[test]
fn racing_appends_never_double_create() {
    let repo = DataRepo::new();
    let appended = AtomicUsize::new(0);
    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..50 {
                    match repo.add_array_element("log.[].line", ValueKind::String, None, &KeyOptions::new()) {
                        Ok(_) => {
                            appended.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(RepoError::DuplicateKey(_)) => {}
                        Err(e) => panic!("unexpected error {e}"),
                    }
                }
            });
        }
    });
    let count = appended.load(Ordering::SeqCst);
    assert_eq!(repo.array_index_count("log.[]").unwrap(), count);
    assert_eq!(repo.len(), count);
}

#[test]
fn structure_clock_never_moves_backwards() {
    let repo = DataRepo::new();
    thread::scope(|s| {
        for t in 0..4 {
            let repo = &repo;
            s.spawn(move || {
                let mut last = repo.last_structure_change();
                for i in 0..100 {
                    let key = format!("c{}.{}", t, i);
                    repo.create_key(key.as_str(), ValueKind::Bool, &KeyOptions::new()).unwrap();
                    let now = repo.last_structure_change();
                    assert!(now >= last);
                    last = now;
                    repo.delete_key(&key, None).unwrap();
                    let now = repo.last_structure_change();
                    assert!(now >= last);
                    last = now;
                }
            });
        }
    });
    assert!(repo.is_empty());
}
