use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::types::WsMessage;

pub type WsSender = mpsc::UnboundedSender<WsMessage>;

/// Cap on simultaneous connections per identity. A user hitting this many
/// live devices is either a bug or abuse; further connections are refused.
pub const MAX_CONNECTIONS_PER_USER: usize = 8;

/// Registry of live push channels, keyed by identity. One identity may hold
/// several connections at once (multi-device); connect/disconnect for the
/// same identity can race from different connection tasks, so the map must
/// stay internally synchronized.
#[derive(Clone, Default)]
pub struct ConnectionManager {
    connections: Arc<DashMap<Uuid, HashMap<Uuid, WsSender>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection handle. Returns false (and registers nothing)
    /// when the identity is already at the connection cap.
    pub fn add_connection(&self, user_id: Uuid, connection_id: Uuid, tx: WsSender) -> bool {
        let mut handles = self.connections.entry(user_id).or_default();
        if handles.len() >= MAX_CONNECTIONS_PER_USER {
            return false;
        }
        handles.insert(connection_id, tx);
        true
    }

    /// Remove one connection handle. Removing an unknown handle is a no-op;
    /// the identity key is dropped once its last handle is gone so offline
    /// identities cost nothing.
    pub fn remove_connection(&self, user_id: &Uuid, connection_id: &Uuid) {
        let mut emptied = false;
        if let Some(mut handles) = self.connections.get_mut(user_id) {
            handles.remove(connection_id);
            emptied = handles.is_empty();
        }
        if emptied {
            self.connections.remove_if(user_id, |_, handles| handles.is_empty());
        }
    }

    /// Push a frame to every live handle of `user_id`, returning how many
    /// handles it was delivered to. Handles whose receiving task has gone
    /// away are pruned on the spot; a dead handle never blocks delivery to
    /// the rest.
    pub fn send_to_user(&self, user_id: &Uuid, message: WsMessage) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        if let Some(handles) = self.connections.get(user_id) {
            for (connection_id, tx) in handles.iter() {
                if tx.send(message.clone()).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(*connection_id);
                }
            }
        }

        for connection_id in &dead {
            self.remove_connection(user_id, connection_id);
        }

        delivered
    }

    /// Number of live handles for an identity.
    pub fn connection_count(&self, user_id: &Uuid) -> usize {
        self.connections
            .get(user_id)
            .map(|handles| handles.len())
            .unwrap_or(0)
    }
}
