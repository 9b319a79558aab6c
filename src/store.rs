use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::models::Session;

/// In-memory session registry shared by the HTTP handlers.
///
/// Sessions are independent; the lock only guards the map. Callers must not
/// hold it across an `.await`, which is why access goes through closures.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Session) -> Session {
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        sessions.insert(session.id(), session.clone());
        session
    }

    pub fn get(&self, id: Uuid) -> Option<Session> {
        let sessions = self.sessions.lock().expect("session store lock poisoned");
        sessions.get(&id).cloned()
    }

    /// Run `f` against the session, if it exists.
    pub fn with_session<R>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        sessions.get_mut(&id).map(f)
    }

    pub fn remove(&self, id: Uuid) -> bool {
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        sessions.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
