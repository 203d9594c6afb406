//! Connected clients and snapshot fan-out.
//!
//! The registry knows, for every live connection, where to send frames
//! and which room (if any) it is bound to. [`Registry::publish`] runs as
//! the store's subscriber: it compares each snapshot with the last one it
//! saw and queues a `state` frame for every client whose room changed.
//!
//! The last published snapshot is kept here, under the same lock as the
//! client table, so a client that binds while a dispatch is in flight
//! still receives its states in order.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;
use tourney_protocol::{Codec, JsonCodec, ParticipantId, RoomId, ServerMessage};
use tourney_room::{Bracket, Room, Snapshot};
use tourney_transport::ConnectionId;

/// State payload of a `state` frame: a room, or the legacy session.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StateView {
    Room(Arc<Room>),
    Session(Arc<Bracket>),
}

/// Every message the server sends.
pub type Outgoing = ServerMessage<StateView>;

/// Who a connection speaks for, once it has created or joined a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub participant: ParticipantId,
    pub room_id: RoomId,
}

struct Client {
    outbound: mpsc::UnboundedSender<String>,
    binding: Option<Binding>,
}

struct Inner {
    latest: Arc<Snapshot>,
    clients: HashMap<ConnectionId, Client>,
}

pub struct Registry {
    inner: RwLock<Inner>,
    codec: JsonCodec,
}

impl Registry {
    pub fn new(initial: Arc<Snapshot>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                latest: initial,
                clients: HashMap::new(),
            }),
            codec: JsonCodec,
        }
    }

    /// Adds a connection and returns the receiving end of its outbound
    /// queue. In legacy mode the session state is queued right away.
    pub fn register(&self, id: ConnectionId) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.write();

        if let Some(session) = inner.latest.legacy() {
            let state = Outgoing::State {
                state: StateView::Session(Arc::clone(session)),
            };
            self.push(&tx, &state);
        }
        inner.clients.insert(
            id,
            Client {
                outbound: tx,
                binding: None,
            },
        );
        rx
    }

    /// Drops a connection. Its outbound queue closes once drained.
    pub fn unregister(&self, id: ConnectionId) {
        if self.inner.write().clients.remove(&id).is_some() {
            tracing::debug!(%id, "connection unregistered");
        }
    }

    /// Binds `id` to a room, then queues `ack` followed by the room's
    /// current state.
    pub fn bind(&self, id: ConnectionId, binding: Binding, ack: &Outgoing) {
        let mut inner = self.inner.write();
        let room = inner.latest.room(&binding.room_id).cloned();
        let Some(client) = inner.clients.get_mut(&id) else {
            return;
        };

        tracing::debug!(%id, participant = %binding.participant, room_id = %binding.room_id, "connection bound");
        client.binding = Some(binding);
        self.push(&client.outbound, ack);
        if let Some(room) = room {
            self.push(
                &client.outbound,
                &Outgoing::State {
                    state: StateView::Room(room),
                },
            );
        }
    }

    pub fn binding(&self, id: ConnectionId) -> Option<Binding> {
        self.inner
            .read()
            .clients
            .get(&id)
            .and_then(|client| client.binding.clone())
    }

    /// Queues `message` for one connection.
    pub fn send(&self, id: ConnectionId, message: &Outgoing) {
        if let Some(client) = self.inner.read().clients.get(&id) {
            self.push(&client.outbound, message);
        }
    }

    pub fn connection_count(&self) -> usize {
        self.inner.read().clients.len()
    }

    /// Fans `snapshot` out to the clients it concerns.
    ///
    /// Rooms are compared by pointer: a room whose `Arc` is unchanged since
    /// the last call was not touched, and its clients hear nothing.
    pub fn publish(&self, snapshot: &Arc<Snapshot>) {
        let mut inner = self.inner.write();
        if Arc::ptr_eq(&inner.latest, snapshot) {
            return;
        }

        match snapshot.as_ref() {
            Snapshot::Legacy { session } => {
                let unchanged = inner
                    .latest
                    .legacy()
                    .is_some_and(|previous| Arc::ptr_eq(previous, session));
                if !unchanged {
                    self.broadcast_session(&inner, session);
                }
            }
            Snapshot::Rooms { rooms } => {
                for (room_id, room) in rooms {
                    let unchanged = inner
                        .latest
                        .room(room_id)
                        .is_some_and(|previous| Arc::ptr_eq(previous, room));
                    if !unchanged {
                        self.broadcast_room(&inner, room_id, room);
                    }
                }
            }
        }

        inner.latest = Arc::clone(snapshot);
    }

    fn broadcast_session(&self, inner: &Inner, session: &Arc<Bracket>) {
        let Some(frame) = self.encode(&Outgoing::State {
            state: StateView::Session(Arc::clone(session)),
        }) else {
            return;
        };
        for client in inner.clients.values() {
            let _ = client.outbound.send(frame.clone());
        }
    }

    fn broadcast_room(&self, inner: &Inner, room_id: &RoomId, room: &Arc<Room>) {
        let mut recipients = inner
            .clients
            .values()
            .filter(|client| client.binding.as_ref().is_some_and(|b| &b.room_id == room_id))
            .peekable();
        if recipients.peek().is_none() {
            return;
        }

        let Some(frame) = self.encode(&Outgoing::State {
            state: StateView::Room(Arc::clone(room)),
        }) else {
            return;
        };
        let mut delivered = 0;
        for client in recipients {
            if client.outbound.send(frame.clone()).is_ok() {
                delivered += 1;
            }
        }
        tracing::debug!(%room_id, delivered, "room state published");
    }

    fn push(&self, outbound: &mpsc::UnboundedSender<String>, message: &Outgoing) {
        if let Some(frame) = self.encode(message) {
            // A closed queue means the writer already stopped; the handler
            // unregisters shortly after.
            let _ = outbound.send(frame);
        }
    }

    fn encode(&self, message: &Outgoing) -> Option<String> {
        match self.codec.encode(message) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode outgoing message");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tourney_room::{Action, Rules, Store};

    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(serde_json::from_str(&frame).unwrap());
        }
        frames
    }

    fn create(store: &Store, id: &str) {
        store.dispatch(Action::CreateRoom {
            room_id: RoomId::new(id),
            name: id.into(),
            theme: "Movies".into(),
            creator: ParticipantId::new("host"),
        });
    }

    fn bind(registry: &Registry, conn: ConnectionId, room: &str) {
        registry.bind(
            conn,
            Binding {
                participant: ParticipantId::new("host"),
                room_id: RoomId::new(room),
            },
            &Outgoing::RoomJoined {
                room_id: RoomId::new(room),
            },
        );
    }

    /// A store wired to a registry the way the server wires them.
    fn wired() -> (Store, Arc<Registry>, tourney_room::Subscription) {
        let store = Store::new(Rules::default());
        let registry = Arc::new(Registry::new(store.snapshot()));
        let sink = Arc::clone(&registry);
        let sub = store.subscribe(move |snap| sink.publish(snap));
        (store, registry, sub)
    }

    #[test]
    fn test_register_in_legacy_mode_queues_session_state() {
        let (_store, registry, _sub) = wired();
        let mut rx = registry.register(ConnectionId::new(1));

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "state");
        assert_eq!(frames[0]["state"]["phase"], "collecting");
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_bind_queues_ack_then_state() {
        let (store, registry, _sub) = wired();
        let conn = ConnectionId::new(1);
        let mut rx = registry.register(conn);
        create(&store, "r1");
        drain(&mut rx);

        bind(&registry, conn, "r1");
        let frames = drain(&mut rx);
        assert_eq!(frames[0]["type"], "room_joined");
        assert_eq!(frames[1]["type"], "state");
        assert_eq!(frames[1]["state"]["id"], "r1");
        assert_eq!(registry.binding(conn).unwrap().room_id, RoomId::new("r1"));
    }

    #[test]
    fn test_publish_only_reaches_clients_of_changed_room() {
        let (store, registry, _sub) = wired();
        let (a, b) = (ConnectionId::new(1), ConnectionId::new(2));
        let mut rx_a = registry.register(a);
        let mut rx_b = registry.register(b);
        create(&store, "r1");
        create(&store, "r2");
        bind(&registry, a, "r1");
        bind(&registry, b, "r2");
        drain(&mut rx_a);
        drain(&mut rx_b);

        store.dispatch(Action::JoinRoom {
            room_id: RoomId::new("r1"),
            participant: ParticipantId::new("guest"),
        });

        let frames = drain(&mut rx_a);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["state"]["participants"], serde_json::json!(["guest", "host"]));
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn test_no_op_dispatch_publishes_nothing() {
        let (store, registry, _sub) = wired();
        let conn = ConnectionId::new(1);
        let mut rx = registry.register(conn);
        create(&store, "r1");
        bind(&registry, conn, "r1");
        drain(&mut rx);

        store.dispatch(Action::Next {
            room_id: Some(RoomId::new("r1")),
        });
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_legacy_changes_reach_every_connection() {
        let (store, registry, _sub) = wired();
        let mut rx_a = registry.register(ConnectionId::new(1));
        let mut rx_b = registry.register(ConnectionId::new(2));
        drain(&mut rx_a);
        drain(&mut rx_b);

        store.dispatch(Action::SetEntries {
            entries: vec![
                tourney_room::Entry::new("Alien", "seed"),
                tourney_room::Entry::new("Heat", "seed"),
            ],
        });

        assert_eq!(drain(&mut rx_a).len(), 1);
        assert_eq!(drain(&mut rx_b).len(), 1);
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let (store, registry, _sub) = wired();
        let conn = ConnectionId::new(1);
        let mut rx = registry.register(conn);
        drain(&mut rx);

        registry.unregister(conn);
        create(&store, "r1");

        assert_eq!(registry.connection_count(), 0);
        assert!(rx.try_recv().is_err());
        assert!(registry.binding(conn).is_none());
    }
}
