//! The action dispatcher: the single owner of the current snapshot.
//!
//! [`Store::dispatch`] is the only way state changes. It applies one
//! action at a time, in call order, and notifies every subscriber with
//! the resulting snapshot before the next action is considered.
//!
//! # Concurrency note
//!
//! The snapshot lives behind a `parking_lot::Mutex` that is held for the
//! whole dispatch, notifications included. Concurrent callers queue on
//! that lock, so both application and notification follow one total
//! order. Callbacks therefore must not block and must not call
//! [`Store::dispatch`] themselves (the lock is not re-entrant). Dropping a
//! [`Subscription`] from inside a callback is fine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::{Action, RoomError, Rules, Snapshot, apply};

type Callback = dyn Fn(&Arc<Snapshot>) + Send + Sync;

struct Shared {
    rules: Rules,
    current: Mutex<Arc<Snapshot>>,
    subscribers: RwLock<Vec<(u64, Arc<Callback>)>>,
    next_subscriber: AtomicU64,
}

/// Handle to the process-wide state cell.
///
/// Cheap to clone; every clone refers to the same snapshot and subscriber
/// list.
#[derive(Clone)]
pub struct Store {
    shared: Arc<Shared>,
}

impl Store {
    /// A store holding the initial (empty legacy) snapshot.
    pub fn new(rules: Rules) -> Self {
        Self::with_snapshot(Snapshot::default(), rules)
    }

    /// A store starting from an existing snapshot.
    pub fn with_snapshot(snapshot: Snapshot, rules: Rules) -> Self {
        Self {
            shared: Arc::new(Shared {
                rules,
                current: Mutex::new(Arc::new(snapshot)),
                subscribers: RwLock::new(Vec::new()),
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    /// The current snapshot. Holding it never blocks dispatch.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.shared.current.lock())
    }

    pub fn rules(&self) -> &Rules {
        &self.shared.rules
    }

    /// Checks `action` against the current snapshot without applying it.
    pub fn validate(&self, action: &Action) -> Result<(), RoomError> {
        crate::validate(&self.snapshot(), action, &self.shared.rules)
    }

    /// Applies `action` and notifies every subscriber.
    ///
    /// Subscribers are called even when the action was a no-op; they get
    /// the same snapshot they saw last time.
    pub fn dispatch(&self, action: Action) {
        let _ = self.try_dispatch(action);
    }

    /// Like [`dispatch`](Self::dispatch), but reports whether the action
    /// applied. On success the snapshot it produced is returned.
    ///
    /// Subscribers are notified either way, so the outcome seen here and
    /// the one published agree.
    pub fn try_dispatch(&self, action: Action) -> Result<Arc<Snapshot>, RoomError> {
        let mut current = self.shared.current.lock();

        let outcome = match apply(&current, &action, &self.shared.rules) {
            Ok(next) => {
                debug_assert!(
                    phase_moved_forward(&current, &next, &action),
                    "{} moved a phase backwards",
                    action.kind()
                );
                log_applied(&current, &next, &action);
                *current = Arc::new(next);
                Ok(Arc::clone(&current))
            }
            Err(reason) => {
                tracing::debug!(
                    action = action.kind(),
                    room_id = ?action.room_id(),
                    %reason,
                    "action ignored"
                );
                Err(reason)
            }
        };

        let snapshot = Arc::clone(&current);
        // Clone the list out so callbacks may unsubscribe.
        let subscribers: Vec<Arc<Callback>> = self
            .shared
            .subscribers
            .read()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in subscribers {
            callback(&snapshot);
        }
        outcome
    }

    /// Registers `callback` to run after every dispatch.
    ///
    /// The callback stays registered until the returned [`Subscription`]
    /// is dropped or [`unsubscribed`](Subscription::unsubscribe).
    pub fn subscribe(
        &self,
        callback: impl Fn(&Arc<Snapshot>) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.shared.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.shared
            .subscribers
            .write()
            .push((id, Arc::new(callback)));
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.read().len()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(Rules::default())
    }
}

/// Keeps a subscriber registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its callback"]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Removes the callback now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.subscribers.write().retain(|(id, _)| *id != self.id);
        }
    }
}

/// Whether the room `action` touched stayed in its phase or followed the
/// lifecycle. Creation and legacy updates always pass.
fn phase_moved_forward(before: &Snapshot, after: &Snapshot, action: &Action) -> bool {
    let Some(room_id) = action.room_id() else {
        return true;
    };
    match (before.room(room_id), after.room(room_id)) {
        (Some(before), Some(after)) => {
            let (from, to) = (before.phase(), after.phase());
            from == to || from.can_transition_to(to)
        }
        _ => true,
    }
}

/// Logs lifecycle changes worth seeing at `info`.
fn log_applied(before: &Snapshot, after: &Snapshot, action: &Action) {
    let Some(room_id) = action.room_id() else {
        tracing::debug!(action = action.kind(), "legacy session updated");
        return;
    };
    let Some(room) = after.room(room_id) else {
        return;
    };
    let previous = before.room(room_id).map(|r| r.phase());

    match action {
        Action::CreateRoom { creator, .. } => {
            tracing::info!(%room_id, %creator, name = %room.name, "room created");
        }
        Action::StartVoting { .. } => {
            tracing::info!(%room_id, entries = room.entries().len() + 2, "voting started");
        }
        Action::Next { .. } if room.phase().is_terminal() => {
            if let Some(winner) = room.winner() {
                tracing::info!(%room_id, winner = %winner.content, "tournament completed");
            }
        }
        Action::Next { .. } => {
            tracing::info!(%room_id, pending = room.entries().len(), "round resolved");
        }
        _ => {
            tracing::debug!(
                action = action.kind(),
                %room_id,
                phase = %room.phase(),
                ?previous,
                "action applied"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tourney_protocol::{ParticipantId, RoomId};

    use super::*;
    use crate::Phase;

    fn create(id: &str) -> Action {
        Action::CreateRoom {
            room_id: RoomId::new(id),
            name: "Friday".into(),
            theme: "Movies".into(),
            creator: ParticipantId::new("alice"),
        }
    }

    #[test]
    fn test_dispatch_replaces_snapshot() {
        let store = Store::default();
        let before = store.snapshot();
        store.dispatch(create("r1"));
        let after = store.snapshot();

        assert!(before.is_legacy());
        assert_eq!(after.room_count(), 1);
    }

    #[test]
    fn test_subscribers_run_on_every_dispatch_including_no_ops() {
        let store = Store::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _sub = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.dispatch(create("r1"));
        store.dispatch(create("r1")); // duplicate id: no-op
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_no_op_publishes_identical_snapshot() {
        let store = Store::default();
        store.dispatch(create("r1"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe(move |snap| sink.lock().push(Arc::clone(snap)));

        store.dispatch(Action::Next {
            room_id: Some(RoomId::new("r1")),
        });

        let seen = seen.lock();
        assert!(Arc::ptr_eq(&seen[0], &store.snapshot()));
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let store = Store::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(store.subscriber_count(), 1);

        sub.unsubscribe();
        store.dispatch(create("r1"));

        assert_eq!(store.subscriber_count(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscription_outliving_store_is_harmless() {
        let store = Store::default();
        let sub = store.subscribe(|_| {});
        drop(store);
        drop(sub);
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let store = Store::default();
        store.dispatch(create("r1"));
        let held = store.snapshot();
        store.dispatch(Action::JoinRoom {
            room_id: RoomId::new("r1"),
            participant: ParticipantId::new("bob"),
        });

        let room_id = RoomId::new("r1");
        assert_eq!(held.room(&room_id).unwrap().participants.len(), 1);
        assert_eq!(store.snapshot().room(&room_id).unwrap().participants.len(), 2);
    }

    #[test]
    fn test_concurrent_dispatch_applies_every_action() {
        let store = Store::default();
        store.dispatch(create("r1"));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.dispatch(Action::AddEntry {
                        room_id: RoomId::new("r1"),
                        participant: ParticipantId::new(format!("p{i}")),
                        content: format!("entry {i}"),
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snap = store.snapshot();
        assert_eq!(snap.room(&RoomId::new("r1")).unwrap().entries().len(), 8);
    }

    #[test]
    fn test_try_dispatch_reports_reason_and_still_notifies() {
        let store = Store::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _sub = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let created = store.try_dispatch(create("r1")).unwrap();
        assert!(Arc::ptr_eq(&created, &store.snapshot()));
        assert_eq!(
            store.try_dispatch(create("r1")),
            Err(RoomError::AlreadyExists(RoomId::new("r1")))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_phase_check_accepts_a_full_lifecycle() {
        let store = Store::default();
        let r1 = RoomId::new("r1");
        let mut actions = vec![create("r1")];
        for name in ["a", "b"] {
            actions.push(Action::AddEntry {
                room_id: r1.clone(),
                participant: ParticipantId::new(name),
                content: name.to_uppercase(),
            });
        }
        actions.push(Action::StartVoting {
            room_id: Some(r1.clone()),
        });
        actions.push(Action::Next {
            room_id: Some(r1.clone()),
        });

        for action in actions {
            let before = store.snapshot();
            let after = store.try_dispatch(action.clone()).unwrap();
            assert!(phase_moved_forward(&before, &after, &action));
        }
        // The 0–0 tie keeps both entries, so the room is still voting.
        assert_eq!(store.snapshot().room(&r1).unwrap().phase(), Phase::Voting);
    }

    #[test]
    fn test_phase_check_rejects_going_back_to_collecting() {
        let r1 = RoomId::new("r1");
        let voting = Store::default();
        voting.dispatch(create("r1"));
        for name in ["a", "b"] {
            voting.dispatch(Action::AddEntry {
                room_id: r1.clone(),
                participant: ParticipantId::new(name),
                content: name.into(),
            });
        }
        let collecting = voting.snapshot();
        voting.dispatch(Action::StartVoting {
            room_id: Some(r1.clone()),
        });

        let action = Action::Next {
            room_id: Some(r1.clone()),
        };
        assert!(!phase_moved_forward(&voting.snapshot(), &collecting, &action));
    }

    #[test]
    fn test_validate_reports_reason_without_applying() {
        let store = Store::default();
        let err = store
            .validate(&Action::StartVoting { room_id: None })
            .unwrap_err();
        assert_eq!(err, RoomError::NotEnoughEntries(0));
        assert!(store.snapshot().is_legacy());
    }
}
