//! Integration tests for the SQLite-backed engine.

use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;
use waitlist::engine::Engine;
use waitlist::event::EventKind;
use waitlist::model::*;

fn db(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("waitlist.db")
}

fn new_customer(name: &str) -> NewCustomer {
    NewCustomer::new(name, 2, "+971501234567")
}

#[test]
fn queue_survives_reopen() {
    let dir = TempDir::new().unwrap();

    let (a, b, c) = {
        let mut engine = Engine::open(db(&dir)).unwrap();
        let a = engine.register(new_customer("A")).unwrap();
        let b = engine.register(new_customer("B")).unwrap();
        let c = engine.register(new_customer("C")).unwrap();
        engine.seat(b.id, 6).unwrap();
        engine.cancel(c.id).unwrap();
        (a, b, c)
    };

    let mut engine = Engine::open(db(&dir)).unwrap();
    assert_eq!(engine.get(a.id).unwrap().unwrap(), a);
    assert_eq!(engine.position(a.id).unwrap(), Some(0));

    let seated = engine.get(b.id).unwrap().unwrap();
    assert_eq!(seated.state(), State::Seated);
    assert_eq!(seated.table_number, Some(6));
    assert_eq!(engine.get(c.id).unwrap().unwrap().state(), State::Canceled);

    engine.finish(b.id).unwrap();
    assert_eq!(engine.finished().unwrap().len(), 1);
    assert_eq!(engine.events_since(0).unwrap().len(), 6);
}

#[test]
fn reopened_queue_keeps_arrival_order() {
    let dir = TempDir::new().unwrap();
    {
        let mut engine = Engine::open(db(&dir)).unwrap();
        for name in ["A", "B", "C"] {
            engine.register(new_customer(name)).unwrap();
        }
    }

    let mut engine = Engine::open(db(&dir)).unwrap();
    engine.register(new_customer("D")).unwrap();

    let names: Vec<String> = engine
        .waiting()
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["A", "B", "C", "D"]);
}

#[test]
fn second_connection_sees_committed_moves() {
    let dir = TempDir::new().unwrap();
    let mut host = Engine::open(db(&dir)).unwrap();
    let mut other = Engine::open(db(&dir)).unwrap();

    let a = host.register(new_customer("A")).unwrap();
    other.seat(a.id, 3).unwrap();

    let err = host.cancel(a.id).unwrap_err();
    assert!(err.is_state_conflict());
    assert_eq!(host.get(a.id).unwrap().unwrap().state(), State::Seated);
}

#[test]
fn racing_cancel_and_seat_commit_exactly_one() {
    let dir = TempDir::new().unwrap();
    let id = Engine::open(db(&dir))
        .unwrap()
        .register(new_customer("A"))
        .unwrap()
        .id;

    let barrier = Arc::new(Barrier::new(2));
    let spawn = |seat: bool| {
        let path = db(&dir);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            let mut engine = Engine::open(path).unwrap();
            barrier.wait();
            if seat {
                engine.seat(id, 1).is_ok()
            } else {
                engine.cancel(id).is_ok()
            }
        })
    };

    let seater = spawn(true);
    let canceler = spawn(false);
    let seated = seater.join().unwrap();
    let canceled = canceler.join().unwrap();
    assert!(seated ^ canceled, "exactly one move must win");

    let engine = Engine::open(db(&dir)).unwrap();
    let record = engine.get(id).unwrap().unwrap();
    let expected = if seated {
        State::Seated
    } else {
        State::Canceled
    };
    assert_eq!(record.state(), expected);

    let total: usize = State::ALL
        .iter()
        .map(|s| engine.list_by_state(*s).unwrap().len())
        .sum();
    assert_eq!(total, 1);

    let moves = engine
        .events_since(0)
        .unwrap()
        .into_iter()
        .filter(|e| {
            matches!(
                e.kind,
                EventKind::CustomerSeated { .. } | EventKind::CustomerCanceled { .. }
            )
        })
        .count();
    assert_eq!(moves, 1);
}
