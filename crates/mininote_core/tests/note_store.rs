use mininote_core::db::DbError;
use mininote_core::{Note, NoteRepository, RepoError, SqliteNoteRepository};
use rusqlite::Connection;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn pairs(notes: &[Note]) -> Vec<(i64, &str)> {
    notes
        .iter()
        .map(|note| (note.id, note.text.as_str()))
        .collect()
}

#[test]
fn buy_milk_scenario_matches_expected_listing_after_each_step() {
    let repo = SqliteNoteRepository::open_in_memory().unwrap();
    assert!(repo.list_all().unwrap().is_empty());

    let first = repo.insert("buy milk").unwrap();
    assert_eq!(first.id, 1);
    assert_eq!(pairs(&repo.list_all().unwrap()), vec![(1, "buy milk")]);

    let second = repo.insert("call mom").unwrap();
    assert_eq!(second.id, 2);
    assert_eq!(
        pairs(&repo.list_all().unwrap()),
        vec![(2, "call mom"), (1, "buy milk")]
    );

    repo.update(1, "buy milk and eggs").unwrap();
    assert_eq!(
        pairs(&repo.list_all().unwrap()),
        vec![(2, "call mom"), (1, "buy milk and eggs")]
    );

    repo.delete(2).unwrap();
    assert_eq!(
        pairs(&repo.list_all().unwrap()),
        vec![(1, "buy milk and eggs")]
    );
}

#[test]
fn insert_returns_persisted_row_with_creation_time() {
    let repo = SqliteNoteRepository::open_in_memory().unwrap();
    let note = repo.insert("first").unwrap();

    assert!(note.created_at > 0);
    assert_eq!(repo.get(note.id).unwrap(), Some(note));
}

#[test]
fn store_accepts_empty_text() {
    let repo = SqliteNoteRepository::open_in_memory().unwrap();
    let note = repo.insert("").unwrap();
    assert_eq!(repo.get(note.id).unwrap().unwrap().text, "");
}

#[test]
fn ids_keep_increasing_after_deleting_the_newest_note() {
    let repo = SqliteNoteRepository::open_in_memory().unwrap();
    let mut assigned = Vec::new();

    for round in 0..5 {
        let note = repo.insert(&format!("note {round}")).unwrap();
        assigned.push(note.id);
        // Removing the highest id is the case plain rowids would reuse.
        repo.delete(note.id).unwrap();
    }

    assert!(assigned.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(repo.list_all().unwrap().is_empty());
}

#[test]
fn ids_are_not_reused_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.sqlite3");

    let repo = SqliteNoteRepository::open(&path).unwrap();
    let a = repo.insert("a").unwrap();
    let b = repo.insert("b").unwrap();
    repo.delete(b.id).unwrap();
    drop(repo);

    let reopened = SqliteNoteRepository::open(&path).unwrap();
    let c = reopened.insert("c").unwrap();
    assert!(c.id > b.id);
    assert_eq!(
        pairs(&reopened.list_all().unwrap()),
        vec![(c.id, "c"), (a.id, "a")]
    );
}

#[test]
fn update_keeps_id_and_position() {
    let repo = SqliteNoteRepository::open_in_memory().unwrap();
    let oldest = repo.insert("oldest").unwrap();
    let middle = repo.insert("middle").unwrap();
    let newest = repo.insert("newest").unwrap();

    repo.update(oldest.id, "oldest, edited").unwrap();

    let ids: Vec<i64> = repo.list_all().unwrap().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);
    let edited = repo.get(oldest.id).unwrap().unwrap();
    assert_eq!(edited.text, "oldest, edited");
    assert_eq!(edited.created_at, oldest.created_at);
}

#[test]
fn update_and_delete_of_missing_id_return_not_found_without_changes() {
    let repo = SqliteNoteRepository::open_in_memory().unwrap();
    let kept = repo.insert("kept").unwrap();
    let gone = repo.insert("gone").unwrap();
    repo.delete(gone.id).unwrap();
    let before = repo.list_all().unwrap();

    let delete_err = repo.delete(gone.id).unwrap_err();
    assert!(matches!(delete_err, RepoError::NotFound(id) if id == gone.id));
    assert!(!delete_err.is_storage_fault());

    let update_err = repo.update(999, "nobody").unwrap_err();
    assert!(matches!(update_err, RepoError::NotFound(999)));

    assert_eq!(repo.list_all().unwrap(), before);
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].id, kept.id);
}

#[test]
fn concurrent_inserts_are_not_lost() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 25;

    let repo = Arc::new(SqliteNoteRepository::open_in_memory().unwrap());
    let handles: Vec<_> = (0..THREADS)
        .map(|worker| {
            let repo = Arc::clone(&repo);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|idx| repo.insert(&format!("w{worker}-{idx}")).unwrap().id)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(ids.insert(id), "id {id} assigned twice");
        }
    }

    let listed = repo.list_all().unwrap();
    assert_eq!(ids.len(), THREADS * PER_THREAD);
    assert_eq!(listed.len(), THREADS * PER_THREAD);
    assert!(listed.windows(2).all(|pair| pair[0].id > pair[1].id));
}

#[test]
fn committed_notes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.sqlite3");

    {
        let repo = SqliteNoteRepository::open(&path).unwrap();
        repo.insert("durable").unwrap();
    }

    let reopened = SqliteNoteRepository::open(&path).unwrap();
    assert_eq!(pairs(&reopened.list_all().unwrap()), vec![(1, "durable")]);
}

#[test]
fn try_new_rejects_connection_without_notes_table() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteNoteRepository::try_new(conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("notes")));
    assert!(err.is_storage_fault());
}

#[test]
fn second_store_on_same_file_is_refused_until_first_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.sqlite3");

    let owner = SqliteNoteRepository::open(&path).unwrap();
    owner.insert("owned").unwrap();

    let err = SqliteNoteRepository::open(&path).err().unwrap();
    match &err {
        RepoError::Db(DbError::StoreInUse { path: locked }) => assert_eq!(locked, &path),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_storage_fault());
    assert_eq!(pairs(&owner.list_all().unwrap()), vec![(1, "owned")]);

    drop(owner);
    let next_owner = SqliteNoteRepository::open(&path).unwrap();
    assert_eq!(pairs(&next_owner.list_all().unwrap()), vec![(1, "owned")]);
}

#[test]
fn in_memory_stores_are_independent() {
    let first = SqliteNoteRepository::open_in_memory().unwrap();
    let second = SqliteNoteRepository::open_in_memory().unwrap();
    first.insert("only in first").unwrap();

    assert!(second.list_all().unwrap().is_empty());
}
