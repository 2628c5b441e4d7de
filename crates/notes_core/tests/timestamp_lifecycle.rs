use notes_core::{Note, Storable, User};
use std::thread::sleep;
use std::time::Duration;

fn lifecycle<E: Storable>(entity: &mut E) {
    entity.created();
    let ts = entity.timestamp().clone();
    assert_eq!(ts.created_at, ts.updated_at);
    assert!(ts.deleted_at.is_none());

    sleep(Duration::from_millis(2));
    entity.deleted();
    let deleted_at = entity.timestamp().deleted_at.expect("deleted_at should be set");
    assert!(deleted_at >= entity.timestamp().updated_at);

    sleep(Duration::from_millis(2));
    entity.updated();
    let after = entity.timestamp();
    assert!(after.deleted_at.is_none(), "write must undelete");
    assert_eq!(after.created_at, ts.created_at);
    assert!(after.updated_at > ts.updated_at);
}

#[test]
fn users_follow_timestamp_lifecycle() {
    lifecycle(&mut User::new("alice", "alice@example.com", Vec::new()));
}

#[test]
fn notes_follow_timestamp_lifecycle() {
    lifecycle(&mut Note::new(1, None, "body"));
}

#[test]
fn created_resets_soft_delete_and_overwrites_creation_time() {
    let mut note = Note::new(1, Some("title".to_string()), "body");
    note.created();
    let first = note.timestamp.created_at;
    note.deleted();

    sleep(Duration::from_millis(2));
    note.created();
    assert!(note.timestamp.deleted_at.is_none());
    assert!(note.timestamp.created_at > first);
}

#[test]
fn row_id_reports_store_identifier() {
    let mut user = User::new("alice", "alice@example.com", Vec::new());
    user.id = 7;
    assert_eq!(user.row_id(), 7);

    let mut note = Note::new(7, None, "body");
    note.id = 9;
    assert_eq!(note.row_id(), 9);
}
