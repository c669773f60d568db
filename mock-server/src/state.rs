//! In-memory users, sessions and tasks.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::SESSION_MAX_AGE_SECS;
use crate::rate_limit::RateLimiter;

/// How long a session token stays valid, matching the cookie's `Max-Age`.
pub const SESSION_TTL: Duration = Duration::from_secs(SESSION_MAX_AGE_SECS);

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct Account {
    pub(crate) user: User,
    pub(crate) password: String,
}

pub struct SessionRecord {
    pub(crate) user_id: Uuid,
    pub(crate) issued_at: Instant,
}

impl SessionRecord {
    fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.issued_at) <= SESSION_TTL
    }
}

pub struct TaskRecord {
    pub(crate) owner: Uuid,
    /// Insertion order, breaks ties between equal `created_at` values.
    pub(crate) seq: u64,
    pub(crate) task: Task,
}

#[derive(Default)]
pub struct Store {
    pub(crate) accounts: HashMap<Uuid, Account>,
    pub(crate) emails: HashMap<String, Uuid>,
    /// Session token -> owner and issue time.
    pub(crate) sessions: HashMap<String, SessionRecord>,
    pub(crate) tasks: HashMap<Uuid, TaskRecord>,
    pub(crate) next_seq: u64,
    pub(crate) auth_limiter: RateLimiter,
}

impl Store {
    /// Issue a fresh token for `user_id`. Sessions expired at `now` are
    /// dropped on the way.
    pub(crate) fn open_session(&mut self, user_id: Uuid, now: Instant) -> String {
        self.sessions.retain(|_, session| session.is_live(now));
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            token.clone(),
            SessionRecord {
                user_id,
                issued_at: now,
            },
        );
        token
    }

    /// The user owning a live session `token`.
    pub(crate) fn session_user(&self, token: &str, now: Instant) -> Option<&User> {
        self.sessions
            .get(token)
            .filter(|session| session.is_live(now))
            .and_then(|session| self.accounts.get(&session.user_id))
            .map(|account| &account.user)
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn new_db() -> Db {
    Arc::new(RwLock::new(Store::default()))
}
