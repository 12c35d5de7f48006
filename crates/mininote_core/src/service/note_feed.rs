//! Change-notifying view over the note record store.
//!
//! # Responsibility
//! - Turn point-in-time store mutations into a live stream of full,
//!   newest-first note lists.
//! - Pass mutations through to the store with unchanged failure semantics.
//!
//! # Invariants
//! - The published snapshot equals the committed table contents after every
//!   successful mutation.
//! - Write, re-read and publish happen under one lock, so snapshots are
//!   published in commit order.
//! - A failed mutation publishes nothing; an unchanged table wakes nobody.
//! - A committed mutation is reported as committed even when the re-read
//!   after it fails; the feed is then stale until a re-read succeeds.

use crate::live::{LiveValue, Subscription};
use crate::model::note::{Note, NoteId};
use crate::repo::note_repo::{NoteRepository, RepoError, RepoResult};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Immutable full note list, newest id first.
pub type NoteSnapshot = Arc<Vec<Note>>;

/// Live note list backed by a record store.
pub struct NoteFeed<R: NoteRepository> {
    repo: R,
    snapshot: LiveValue<NoteSnapshot>,
    publish_lock: Mutex<()>,
    stale: AtomicBool,
}

impl<R: NoteRepository> NoteFeed<R> {
    /// Wraps `repo`, loading its current contents as the first snapshot.
    ///
    /// Performs a blocking full scan.
    pub fn new(repo: R) -> RepoResult<Self> {
        let initial = repo.list_all()?;
        debug!(
            "event=feed_init module=service status=ok count={}",
            initial.len()
        );
        Ok(Self {
            repo,
            snapshot: LiveValue::new(Arc::new(initial)),
            publish_lock: Mutex::new(()),
            stale: AtomicBool::new(false),
        })
    }

    /// Subscribes to the live note list; the first value is the current list.
    pub fn observe_all(&self) -> Subscription<NoteSnapshot> {
        self.snapshot.subscribe()
    }

    /// Latest published snapshot. Never touches storage.
    pub fn current(&self) -> NoteSnapshot {
        self.snapshot.get()
    }

    pub fn add(&self, text: &str) -> RepoResult<Note> {
        self.mutate(|repo| repo.insert(text))
    }

    pub fn update(&self, id: NoteId, text: &str) -> RepoResult<()> {
        self.mutate(|repo| repo.update(id, text))
    }

    pub fn delete(&self, id: NoteId) -> RepoResult<()> {
        self.mutate(|repo| repo.delete(id))
    }

    /// Re-reads the store and publishes when contents differ.
    ///
    /// Returns whether subscribers were woken. Clears the stale mark on
    /// success.
    pub fn refresh(&self) -> RepoResult<bool> {
        let _guard = self.publish_lock.lock().map_err(|_| RepoError::LockPoisoned)?;
        self.republish()
            .inspect_err(|_| self.stale.store(true, Ordering::SeqCst))
    }

    /// Whether the last re-read failed, leaving `current()` behind storage.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    fn mutate<T>(&self, op: impl FnOnce(&R) -> RepoResult<T>) -> RepoResult<T> {
        let _guard = self.publish_lock.lock().map_err(|_| RepoError::LockPoisoned)?;
        let value = op(&self.repo)?;
        if let Err(err) = self.republish() {
            self.stale.store(true, Ordering::SeqCst);
            warn!("event=feed_publish module=service status=stale error={err}");
        }
        Ok(value)
    }

    fn republish(&self) -> RepoResult<bool> {
        let notes = self.repo.list_all()?;
        let count = notes.len();
        let changed = self.snapshot.publish(Arc::new(notes));
        self.stale.store(false, Ordering::SeqCst);
        debug!(
            "event=feed_publish module=service status=ok count={} changed={} subscribers={}",
            count,
            changed,
            self.snapshot.subscriber_count()
        );
        Ok(changed)
    }
}
