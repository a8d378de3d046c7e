use bargein_types::{ChannelId, SessionId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
#[cfg(test)]
use mockall::automock;

/// Resolves the channel a signal arrived on to the session it belongs to.
#[cfg_attr(test, automock)]
pub trait SessionDirectory: Send + Sync {
    fn lookup_session_id(&self, channel: &ChannelId) -> Option<SessionId>;
}

#[derive(Debug)]
struct Binding {
    session: SessionId,
    connections: usize,
}

/// Channel-to-session map kept in memory for the lifetime of the process.
///
/// Every `bind` must be paired with a `release`; the mapping stays until the
/// last connection on the channel has released it.
#[derive(Debug, Default)]
pub struct InMemorySessionDirectory {
    sessions: DashMap<ChannelId, Binding>,
}

impl InMemorySessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session bound to `channel`, creating one on first use.
    pub fn bind(&self, channel: &ChannelId) -> SessionId {
        let mut binding = self
            .sessions
            .entry(channel.clone())
            .or_insert_with(|| Binding {
                session: SessionId::generate(),
                connections: 0,
            });
        binding.connections += 1;
        binding.session.clone()
    }

    /// Drops one connection's hold on `channel`. Returns the session once the
    /// last hold is gone and the channel no longer resolves.
    pub fn release(&self, channel: &ChannelId) -> Option<SessionId> {
        let Entry::Occupied(mut entry) = self.sessions.entry(channel.clone()) else {
            return None;
        };
        let binding = entry.get_mut();
        binding.connections = binding.connections.saturating_sub(1);
        if binding.connections > 0 {
            return None;
        }
        Some(entry.remove().session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionDirectory for InMemorySessionDirectory {
    fn lookup_session_id(&self, channel: &ChannelId) -> Option<SessionId> {
        self.sessions
            .get(channel)
            .map(|entry| entry.value().session.clone())
    }
}
