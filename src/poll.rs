//! Level-triggered refresh of the task table and reference pickers.
//!
//! The loop is a plain thread ticking on `recv_timeout`: every tick
//! re-fetches each rendered row, and every few ticks the reference lists.
//! There is no push channel to the service and no retry policy: a row
//! whose fetch fails is treated as gone, and the next tick starts from
//! whatever is still rendered.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Utc;

use crate::Session;

/// Default spacing between task-row refreshes.
pub const TASK_INTERVAL: Duration = Duration::from_secs(10);

/// Reference lists are re-fetched every this many ticks.
pub const REFERENCE_EVERY: u64 = 3;

/// Handle to a background polling thread. [`PollerHandle::stop`] shuts the
/// thread down and waits for it; dropping the handle instead leaves the
/// poller running for the life of the process.
pub struct PollerHandle {
    tx: Sender<()>,
    thread: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(self) {
        let _ = self.tx.send(());
        let _ = self.thread.join();
    }
}

/// Spawn the polling loop for a shared session.
pub fn spawn(session: Arc<Mutex<Session>>, interval: Duration) -> PollerHandle {
    let (tx, rx) = mpsc::channel();
    let thread = std::thread::spawn(move || run(&session, interval, &rx));

    PollerHandle { tx, thread }
}

fn run(session: &Arc<Mutex<Session>>, interval: Duration, rx: &Receiver<()>) {
    let mut tick: u64 = 0;

    loop {
        match rx.recv_timeout(interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        tick += 1;
        refresh_rows(session);

        if tick.is_multiple_of(REFERENCE_EVERY) {
            refresh_references(session);
        }
    }
}

/// Refresh every rendered row in place. Each record is fetched with the
/// session unlocked; the refresh ticket decides whether the result still
/// applies once the lock is re-taken, so a row deleted mid-fetch stays
/// deleted.
fn refresh_rows(session: &Arc<Mutex<Session>>) {
    let (api, ids) = {
        let session = session.lock().unwrap();
        (session.api().clone(), session.table().ids())
    };

    for id in ids {
        let Some(ticket) = session.lock().unwrap().table_mut().begin_refresh(&id) else {
            continue;
        };

        let result = api.task(&id);

        let mut session = session.lock().unwrap();
        match result {
            Ok(task) => {
                if !session.table_mut().apply_refresh(&id, ticket, &task, Utc::now()) {
                    tracing::debug!("discarding a stale refresh of task {id}");
                }
            }
            Err(err) => {
                tracing::warn!("couldn't refresh task {id}, dropping its row: {err}");
                session.table_mut().remove_failed(&id, ticket);
            }
        }
    }
}

/// Re-fetch the directory and target reference lists and merge them into
/// the pickers. Failures only log; the stale lists stay usable.
fn refresh_references(session: &Arc<Mutex<Session>>) {
    let api = session.lock().unwrap().api().clone();

    let directories = api.directories();
    let assays = api.assays();
    let studies = api.studies();

    let mut session = session.lock().unwrap();
    match (directories, assays, studies) {
        (Ok(directories), Ok(assays), Ok(studies)) => {
            session.merge_references(&directories, &assays, &studies);
        }
        (directories, assays, studies) => {
            for err in [directories.err(), assays.err(), studies.err()]
                .into_iter()
                .flatten()
            {
                tracing::warn!("couldn't refresh reference lists: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::{Api, Endpoints};

    fn offline_session() -> Session {
        let base = Url::parse("http://127.0.0.1:9/api/").unwrap();
        let endpoints = Endpoints {
            users: base.join("users").unwrap(),
            projects: base.join("projects").unwrap(),
            assays: base.join("assays").unwrap(),
            studies: base.join("studies").unwrap(),
            directories: base.join("dir").unwrap(),
            tasks: base.join("tasks").unwrap(),
        };
        Session::with_api(Api::new(endpoints))
    }

    #[test]
    fn a_spawned_poller_stops_on_request() {
        let session = Arc::new(Mutex::new(offline_session()));
        let handle = spawn(session.clone(), Duration::from_secs(60));

        // No tick has fired yet; stop must come back promptly.
        handle.stop();
        assert!(session.lock().unwrap().table().is_empty());
    }
}
