//! Registry of sessions opened against discovered instances

use std::sync::Arc;

use dashmap::DashMap;

use wb_core::{Endpoint, Session};

use crate::dispatch::Dispatcher;

struct TrackedSession {
    session: Session,
    dispatcher: Arc<Dispatcher>,
}

/// Sessions keyed by `{host}_{port}`
///
/// Records outlive the coordinator's current attachment; the `connected`
/// flag is refreshed from the dispatcher whenever a record is read.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, TrackedSession>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a session, replacing any record for the same endpoint
    ///
    /// A replaced record's channel is closed unless it is the same one.
    pub fn insert(&self, session: Session, dispatcher: Arc<Dispatcher>) {
        let key = session.endpoint.key();
        let incoming = Arc::clone(&dispatcher);
        let previous = self.sessions.insert(
            key,
            TrackedSession {
                session,
                dispatcher,
            },
        );
        if let Some(previous) = previous {
            if !Arc::ptr_eq(&previous.dispatcher, &incoming) {
                previous.dispatcher.disconnect();
            }
        }
    }

    /// Session record for an endpoint
    pub fn get(&self, endpoint: &Endpoint) -> Option<Session> {
        self.sessions.get(&endpoint.key()).map(|entry| snapshot(&entry))
    }

    /// All records, ordered by host then numeric port
    pub fn list(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> =
            self.sessions.iter().map(|entry| snapshot(&entry)).collect();
        sessions.sort_by(|a, b| {
            (a.endpoint.host(), a.endpoint.port()).cmp(&(b.endpoint.host(), b.endpoint.port()))
        });
        sessions
    }

    /// Forget an endpoint, closing its channel
    pub fn remove(&self, endpoint: &Endpoint) -> Option<Session> {
        self.sessions.remove(&endpoint.key()).map(|(_, tracked)| {
            tracked.dispatcher.disconnect();
            Session {
                connected: false,
                ..tracked.session
            }
        })
    }

    /// Close and forget every session
    pub fn disconnect_all(&self) -> usize {
        let keys: Vec<String> = self
            .sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        let mut closed = 0;
        for key in keys {
            if let Some((_, tracked)) = self.sessions.remove(&key) {
                tracked.dispatcher.disconnect();
                closed += 1;
            }
        }
        closed
    }

    /// Number of tracked sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn snapshot(tracked: &TrackedSession) -> Session {
    Session {
        connected: tracked.dispatcher.is_connected(),
        ..tracked.session.clone()
    }
}
