use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::{DashboardSession, SessionId};
use crate::config::DashboardConfig;
use crate::error::MetricsError;

/// Holds every cached dashboard session, keyed by id.
///
/// Tables are generated once when a session opens and served from the
/// cache afterwards. When the manager is full, the least recently touched
/// session with no live connection is evicted to make room.
pub struct SessionManager {
    config: DashboardConfig,
    base_seed: Option<u64>,
    max_sessions: usize,
    sessions: HashMap<SessionId, DashboardSession>,
    /// Source of session ids. Ids are random so one client cannot guess
    /// another's.
    id_rng: StdRng,
    /// Logical clock, advanced on every access.
    clock: u64,
}

impl SessionManager {
    pub fn new(
        config: DashboardConfig,
        base_seed: Option<u64>,
        max_sessions: usize,
    ) -> Result<Self, MetricsError> {
        config.validate()?;
        let id_rng = match base_seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ 0x5eed_1d5),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            base_seed,
            max_sessions: max_sessions.max(1),
            sessions: HashMap::new(),
            id_rng,
            clock: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[cfg(test)]
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Create a session, generate its table and attach the caller to it.
    /// Returns the new id.
    pub fn open(&mut self) -> Result<SessionId, MetricsError> {
        if self.sessions.len() >= self.max_sessions && !self.evict_oldest() {
            return Err(MetricsError::SessionLimit(self.max_sessions));
        }

        let id = self.fresh_id();
        let mut session = DashboardSession::new(id, self.config.clone(), self.base_seed)?;
        session.last_touch = self.tick();
        session.attached = 1;
        self.sessions.insert(id, session);
        info!("Session {} opened ({} cached)", id, self.len());
        Ok(id)
    }

    /// Attach another connection to an existing session.
    pub fn attach(&mut self, id: SessionId) -> Result<(), MetricsError> {
        let session = self.get_mut(id)?;
        session.attached += 1;
        info!("Session {} resumed ({} attached)", id, session.attached);
        Ok(())
    }

    /// Release one connection's hold on a session. The session stays cached
    /// and becomes evictable once nothing is attached.
    pub fn detach(&mut self, id: SessionId) {
        if let Some(session) = self.sessions.get_mut(&id) {
            session.attached = session.attached.saturating_sub(1);
            debug!("Session {} detached ({} attached)", id, session.attached);
        }
    }

    /// Borrow a session without touching it.
    pub fn get(&self, id: SessionId) -> Result<&DashboardSession, MetricsError> {
        self.sessions
            .get(&id)
            .ok_or(MetricsError::UnknownSession(id))
    }

    /// Borrow a session, touching it.
    pub fn get_mut(&mut self, id: SessionId) -> Result<&mut DashboardSession, MetricsError> {
        let now = self.tick();
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(MetricsError::UnknownSession(id))?;
        session.last_touch = now;
        Ok(session)
    }

    fn fresh_id(&mut self) -> SessionId {
        loop {
            let id: SessionId = self.id_rng.gen();
            if id != 0 && !self.sessions.contains_key(&id) {
                return id;
            }
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Drop the least recently touched detached session. Returns false when
    /// every session is attached.
    fn evict_oldest(&mut self) -> bool {
        let oldest = self
            .sessions
            .values()
            .filter(|s| s.attached == 0)
            .min_by_key(|s| s.last_touch)
            .map(|s| s.id);
        match oldest {
            Some(id) => {
                self.sessions.remove(&id);
                debug!("Evicted idle session {}", id);
                true
            }
            None => false,
        }
    }
}
