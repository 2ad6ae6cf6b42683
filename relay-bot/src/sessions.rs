use std::time::{Duration, Instant};

use dashmap::DashMap;
use relay_blob::BlobLocator;

/// What the relay remembers about one chat
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    pub last_locator: BlobLocator,
    pub captured: u32,
    touched: Instant,
}

/// Per-chat state keyed by chat id, forgotten after `idle_ttl` without activity
#[derive(Debug)]
pub struct ChatSessions {
    sessions: DashMap<i64, ChatSession>,
    idle_ttl: Duration,
}

impl ChatSessions {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
        }
    }

    /// Remember a freshly stored capture for the chat
    pub fn record_capture(&self, chat_id: i64, locator: BlobLocator) {
        self.record_capture_at(chat_id, locator, Instant::now());
    }

    fn record_capture_at(&self, chat_id: i64, locator: BlobLocator, now: Instant) {
        let mut entry = self.sessions.entry(chat_id).or_insert_with(|| ChatSession {
            last_locator: locator.clone(),
            captured: 0,
            touched: now,
        });
        entry.last_locator = locator;
        entry.captured += 1;
        entry.touched = now;
    }

    /// Live session for the chat; an expired one is dropped on the way
    pub fn get(&self, chat_id: i64) -> Option<ChatSession> {
        self.get_at(chat_id, Instant::now())
    }

    fn get_at(&self, chat_id: i64, now: Instant) -> Option<ChatSession> {
        let ttl = self.idle_ttl;
        self.sessions
            .remove_if(&chat_id, |_, session| is_expired(session, ttl, now));
        self.sessions.get(&chat_id).map(|session| session.clone())
    }

    /// Forget the chat; returns whether there was anything to forget
    pub fn clear(&self, chat_id: i64) -> bool {
        self.sessions.remove(&chat_id).is_some()
    }

    /// Drop every idle session, returning how many went away
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let ttl = self.idle_ttl;
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !is_expired(session, ttl, now));
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn is_expired(session: &ChatSession, ttl: Duration, now: Instant) -> bool {
    now.saturating_duration_since(session.touched) > ttl
}
