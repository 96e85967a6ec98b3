// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::model::SessionState;
use crate::store::chat_store::ChatStore;

/// Trailing debounce window for persisting chat state.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
struct SchedulerState {
    pending: Option<SessionState>,
    deadline: Option<Instant>,
    in_flight: bool,
}

#[derive(Debug)]
struct SchedulerInner {
    state: Mutex<SchedulerState>,
    cv: Condvar,
}

/// Debounced writer for chat state.
///
/// Every `schedule` replaces the single pending snapshot and pushes the
/// deadline out by the debounce window, so a burst of edits produces one
/// write. `flush` forces the pending snapshot out immediately and blocks
/// until the worker has written it.
#[derive(Debug)]
pub struct SaveScheduler {
    inner: Arc<SchedulerInner>,
    debounce: Duration,
}

impl SaveScheduler {
    pub fn new(store: ChatStore) -> Self {
        Self::with_debounce(store, SAVE_DEBOUNCE)
    }

    pub fn with_debounce(store: ChatStore, debounce: Duration) -> Self {
        let inner = Arc::new(SchedulerInner {
            state: Mutex::new(SchedulerState::default()),
            cv: Condvar::new(),
        });

        std::thread::Builder::new()
            .name("questmap-save".to_owned())
            .spawn({
                let inner = inner.clone();
                move || Self::run_worker(inner, store)
            })
            .expect("spawn save worker thread");

        Self { inner, debounce }
    }

    pub fn schedule(&self, snapshot: SessionState) {
        let mut state = self.inner.state.lock().expect("save scheduler lock poisoned");
        state.pending = Some(snapshot);
        state.deadline = Some(Instant::now() + self.debounce);
        self.inner.cv.notify_all();
    }

    /// Force the pending snapshot out now and wait for the write to finish.
    pub fn flush(&self) {
        let mut state = self.inner.state.lock().expect("save scheduler lock poisoned");
        if state.pending.is_some() {
            state.deadline = Some(Instant::now());
            self.inner.cv.notify_all();
        }
        while state.pending.is_some() || state.in_flight {
            state = self.inner.cv.wait(state).expect("save scheduler cv poisoned");
        }
    }

    fn run_worker(inner: Arc<SchedulerInner>, store: ChatStore) {
        loop {
            let snapshot = {
                let mut state = inner.state.lock().expect("save scheduler lock poisoned");

                loop {
                    match (state.pending.is_some(), state.deadline) {
                        (true, Some(deadline)) => {
                            let now = Instant::now();
                            if now >= deadline {
                                state.deadline = None;
                                state.in_flight = true;
                                break state.pending.take().expect("pending snapshot present");
                            }
                            let (next, _timeout) = inner
                                .cv
                                .wait_timeout(state, deadline - now)
                                .expect("save scheduler cv poisoned");
                            state = next;
                        }
                        _ => {
                            state = inner.cv.wait(state).expect("save scheduler cv poisoned");
                        }
                    }
                }
            };

            if let Err(err) = store.save_state(&snapshot) {
                warn!(error = %err, "debounced chat state save failed");
            }

            let mut state = inner.state.lock().expect("save scheduler lock poisoned");
            state.in_flight = false;
            inner.cv.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::SaveScheduler;
    use crate::model::{ChatId, ChatSession, SessionState};
    use crate::store::chat_store::ChatStore;

    fn temp_store(prefix: &str) -> (std::path::PathBuf, ChatStore) {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let root = std::env::temp_dir()
            .join(format!("questmap-{prefix}-{}-{nanos}", std::process::id()));
        (root.clone(), ChatStore::new(root))
    }

    fn state_with_chat(id: &str, title: &str) -> SessionState {
        let chat_id = ChatId::new(id).unwrap();
        let mut state = SessionState::default();
        state
            .chats_mut()
            .insert(chat_id.clone(), ChatSession::new(chat_id.clone(), title));
        state.set_active_chat_id(Some(chat_id));
        state
    }

    #[test]
    fn flush_writes_the_pending_snapshot() {
        let (root, store) = temp_store("scheduler-flush");
        let scheduler = SaveScheduler::with_debounce(store.clone(), Duration::from_secs(60));

        scheduler.schedule(state_with_chat("chat_1", "First"));
        scheduler.flush();

        let loaded = store.load_state().unwrap();
        assert!(loaded.chats().contains_key(&ChatId::new("chat_1").unwrap()));
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn rapid_schedules_coalesce_to_the_last_snapshot() {
        let (root, store) = temp_store("scheduler-coalesce");
        let scheduler = SaveScheduler::with_debounce(store.clone(), Duration::from_secs(60));

        for n in 1..=5 {
            let title = format!("Rev {n}");
            scheduler.schedule(state_with_chat("chat_1", &title));
        }
        scheduler.flush();

        let loaded = store.load_state().unwrap();
        let chat = loaded.chats().get(&ChatId::new("chat_1").unwrap()).unwrap();
        assert_eq!(chat.title(), "Rev 5");
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn debounce_elapses_without_a_flush() {
        let (root, store) = temp_store("scheduler-elapse");
        let scheduler = SaveScheduler::with_debounce(store.clone(), Duration::from_millis(10));

        scheduler.schedule(state_with_chat("chat_1", "First"));

        // Give the worker time to fire on its own.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            if store.load_state().is_ok() {
                break;
            }
            assert!(std::time::Instant::now() < deadline, "debounced save never fired");
            std::thread::sleep(Duration::from_millis(10));
        }

        let _ = std::fs::remove_dir_all(root);
        // Keep the scheduler alive to the end of the test.
        drop(scheduler);
    }

    #[test]
    fn flush_with_nothing_pending_returns_immediately() {
        let (root, store) = temp_store("scheduler-idle");
        let scheduler = SaveScheduler::new(store);
        scheduler.flush();
        let _ = std::fs::remove_dir_all(root);
    }
}
