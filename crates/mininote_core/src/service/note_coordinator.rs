//! Mutation coordinator between presentation code and the note feed.
//!
//! # Responsibility
//! - Accept add/update/delete intents without blocking the caller.
//! - Execute them one at a time, in submission order, on tokio's blocking
//!   pool.
//! - Surface storage faults through a persistent, observable fault state.
//!
//! # Invariants
//! - Callers never perform storage I/O; `request_*` only validates and
//!   enqueues.
//! - `NotFound` outcomes are benign and never reach the fault state.
//! - Every other failure is published as a [`MutationFault`] and stays there
//!   until [`NoteCoordinator::clear_fault`].
//! - A write that committed is never reported as unsaved; when only the
//!   re-read behind it fails, the worker retries it once and reports a
//!   fault with `committed = true` if that fails too.

use crate::live::{LiveValue, Subscription};
use crate::model::note::{validate_note_text, Note, NoteId, NoteValidationError};
use crate::repo::note_repo::{NoteRepository, RepoError, RepoResult};
use crate::service::note_feed::{NoteFeed, NoteSnapshot};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Kind of user intent a fault belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Add,
    Update,
    Delete,
}

impl MutationKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Reportable record of a mutation that could not be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationFault {
    /// Increases with every fault reported by one coordinator.
    pub sequence: u64,
    pub operation: MutationKind,
    /// Target note for update/delete.
    pub note_id: Option<NoteId>,
    /// The write was saved; only the published note list is behind.
    pub committed: bool,
    pub message: String,
}

/// Synchronous rejection of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    ValidationRejected(NoteValidationError),
    /// The coordinator has shut down.
    Closed,
}

impl Display for CoordinatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValidationRejected(err) => write!(f, "request rejected: {err}"),
            Self::Closed => write!(f, "note coordinator is closed"),
        }
    }
}

impl Error for CoordinatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ValidationRejected(err) => Some(err),
            Self::Closed => None,
        }
    }
}

impl From<NoteValidationError> for CoordinatorError {
    fn from(value: NoteValidationError) -> Self {
        Self::ValidationRejected(value)
    }
}

enum Mutation {
    Add { text: String },
    Update { id: NoteId, text: String },
    Delete { id: NoteId },
}

impl Mutation {
    fn kind(&self) -> MutationKind {
        match self {
            Self::Add { .. } => MutationKind::Add,
            Self::Update { .. } => MutationKind::Update,
            Self::Delete { .. } => MutationKind::Delete,
        }
    }

    fn note_id(&self) -> Option<NoteId> {
        match self {
            Self::Add { .. } => None,
            Self::Update { id, .. } | Self::Delete { id } => Some(*id),
        }
    }

    fn apply<R: NoteRepository>(&self, feed: &NoteFeed<R>) -> RepoResult<()> {
        match self {
            Self::Add { text } => feed.add(text).map(|_| ()),
            Self::Update { id, text } => feed.update(*id, text),
            Self::Delete { id } => feed.delete(*id),
        }
    }
}

enum Command {
    Mutate(Mutation),
    Flush(oneshot::Sender<()>),
}

/// Single entry point presentation code uses to read and change notes.
pub struct NoteCoordinator<R: NoteRepository + 'static> {
    feed: Arc<NoteFeed<R>>,
    fault: Arc<LiveValue<Option<MutationFault>>>,
    commands: mpsc::UnboundedSender<Command>,
    worker: JoinHandle<()>,
}

impl<R: NoteRepository + 'static> NoteCoordinator<R> {
    /// Starts the mutation worker for `feed` on `runtime`.
    pub fn spawn(feed: Arc<NoteFeed<R>>, runtime: &Handle) -> Self {
        let fault = Arc::new(LiveValue::new(None));
        let (commands, receiver) = mpsc::unbounded_channel();
        let worker = runtime.spawn(run_worker(
            Arc::clone(&feed),
            Arc::clone(&fault),
            receiver,
        ));
        info!("event=coordinator_start module=service status=ok");

        Self {
            feed,
            fault,
            commands,
            worker,
        }
    }

    /// Latest known note list, for synchronous rendering.
    pub fn current(&self) -> NoteSnapshot {
        self.feed.current()
    }

    pub fn observe_all(&self) -> Subscription<NoteSnapshot> {
        self.feed.observe_all()
    }

    /// Queues creation of a note. Blank text is rejected immediately.
    pub fn request_add(&self, text: impl Into<String>) -> Result<(), CoordinatorError> {
        let text = text.into();
        validate_note_text(&text)?;
        self.enqueue(Command::Mutate(Mutation::Add { text }))
    }

    /// Queues replacement of `note`'s text, keeping its id.
    pub fn request_update(
        &self,
        note: &Note,
        text: impl Into<String>,
    ) -> Result<(), CoordinatorError> {
        let text = text.into();
        validate_note_text(&text)?;
        self.enqueue(Command::Mutate(Mutation::Update { id: note.id, text }))
    }

    pub fn request_delete(&self, note: &Note) -> Result<(), CoordinatorError> {
        self.enqueue(Command::Mutate(Mutation::Delete { id: note.id }))
    }

    /// Resolves once every request submitted before this call has finished.
    pub async fn flush(&self) -> Result<(), CoordinatorError> {
        let (done, finished) = oneshot::channel();
        self.enqueue(Command::Flush(done))?;
        finished.await.map_err(|_| CoordinatorError::Closed)
    }

    /// Observes the persistent fault state; `None` means no outstanding fault.
    pub fn faults(&self) -> Subscription<Option<MutationFault>> {
        self.fault.subscribe()
    }

    pub fn last_fault(&self) -> Option<MutationFault> {
        self.fault.get()
    }

    /// Acknowledges the outstanding fault, if any.
    pub fn clear_fault(&self) {
        self.fault.publish(None);
    }

    pub fn feed(&self) -> &NoteFeed<R> {
        &self.feed
    }

    /// Stops accepting requests, drains the queue and joins the worker.
    pub async fn shutdown(self) {
        let Self {
            commands, worker, ..
        } = self;
        drop(commands);
        if let Err(err) = worker.await {
            error!("event=coordinator_stop module=service status=error error={err}");
        }
    }

    fn enqueue(&self, command: Command) -> Result<(), CoordinatorError> {
        self.commands
            .send(command)
            .map_err(|_| CoordinatorError::Closed)
    }
}

async fn run_worker<R: NoteRepository + 'static>(
    feed: Arc<NoteFeed<R>>,
    fault: Arc<LiveValue<Option<MutationFault>>>,
    mut receiver: mpsc::UnboundedReceiver<Command>,
) {
    let mut fault_sequence = 0_u64;

    while let Some(command) = receiver.recv().await {
        let mutation = match command {
            Command::Mutate(mutation) => mutation,
            Command::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        let operation = mutation.kind();
        let note_id = mutation.note_id();
        let task_feed = Arc::clone(&feed);
        let (applied, resync) = tokio::task::spawn_blocking(move || {
            let applied = mutation.apply(&*task_feed);
            if matches!(&applied, Err(err) if err.is_storage_fault()) {
                return (applied, None);
            }
            let resync = task_feed
                .is_stale()
                .then(|| task_feed.refresh())
                .and_then(Result::err);
            (applied, resync)
        })
        .await
        .unwrap_or_else(|join_err| (Err(RepoError::BackgroundTask(join_err.to_string())), None));

        match applied {
            Ok(()) => {}
            Err(RepoError::NotFound(id)) => {
                info!(
                    "event=note_{} module=service status=skipped reason=not_found id={}",
                    operation.label(),
                    id
                );
            }
            Err(err) => {
                fault_sequence += 1;
                report_fault(&fault, fault_sequence, operation, note_id, false, err);
            }
        }

        if let Some(err) = resync {
            fault_sequence += 1;
            report_fault(&fault, fault_sequence, operation, note_id, true, err);
        }
    }

    info!("event=coordinator_stop module=service status=ok");
}

fn report_fault(
    fault: &LiveValue<Option<MutationFault>>,
    sequence: u64,
    operation: MutationKind,
    note_id: Option<NoteId>,
    committed: bool,
    err: RepoError,
) {
    error!(
        "event=note_{} module=service status=error fault_seq={} committed={} error={}",
        operation.label(),
        sequence,
        committed,
        err
    );
    fault.publish(Some(MutationFault {
        sequence,
        operation,
        note_id,
        committed,
        message: err.to_string(),
    }));
}
