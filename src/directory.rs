// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! User Directory
//!
//! In-memory registry of all known accounts, seeded once at startup from the
//! credential store. Accounts are never removed while the process runs.
//!
//! Every mutable per-account field (presence, connection handle, friend set,
//! offline queue) is shared across sessions: a sender resolves its recipient
//! while the recipient's own session logs in or out. All of it sits behind
//! a single lock per account. Compound transitions (attach connection, mark
//! online, drain queue) take that lock exactly once.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::mpsc;

/// Channel handle used to push lines into an account's live session.
///
/// The channel closes when the owning session ends; nothing notifies the
/// account. Liveness is re-checked lazily via [`mpsc::Sender::is_closed`].
pub type PushSender = mpsc::Sender<String>;

/// One message stored for an offline recipient, drained on next login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub sender: String,
    pub content: String,
}

#[derive(Default)]
struct AccountState {
    online: bool,
    conn: Option<PushSender>,
    friends: BTreeSet<String>,
    offline_queue: Vec<QueuedMessage>,
}

/// One user account. Username and credential are immutable; everything else
/// is session-mutated through the state lock.
pub struct Account {
    username: String,
    password: String,
    state: Mutex<AccountState>,
}

impl Account {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Account {
            username: username.into(),
            password: password.into(),
            state: Mutex::new(AccountState::default()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Attaches a live connection and drains the offline queue.
    ///
    /// Marking online, replacing the connection handle and taking the queue
    /// happen under one lock acquisition: no queued message can be delivered
    /// twice or lost between the read and the clear. A previous handle (dead
    /// session, or relogin) is simply replaced.
    pub fn begin_session(&self, conn: PushSender) -> Vec<QueuedMessage> {
        let mut state = self.state.lock().unwrap();
        state.online = true;
        state.conn = Some(conn);
        std::mem::take(&mut state.offline_queue)
    }

    pub fn set_offline(&self) {
        self.state.lock().unwrap().online = false;
    }

    pub fn is_online(&self) -> bool {
        self.state.lock().unwrap().online
    }

    /// Stores a message for later delivery and marks the account offline.
    pub fn defer_message(&self, sender: &str, content: &str) {
        let mut state = self.state.lock().unwrap();
        state.online = false;
        state.offline_queue.push(QueuedMessage {
            sender: sender.to_string(),
            content: content.to_string(),
        });
    }

    /// Returns the push channel when the account is reachable right now.
    ///
    /// A closed channel means the session ended without an EXIT; presence is
    /// corrected to offline as a side effect and `None` is returned.
    pub fn live_conn(&self) -> Option<PushSender> {
        let mut state = self.state.lock().unwrap();
        match &state.conn {
            Some(conn) if conn.is_closed() => {
                state.online = false;
                None
            }
            Some(conn) if state.online => Some(conn.clone()),
            _ => None,
        }
    }

    /// Current presence as seen by a friends-list query, with the same lazy
    /// staleness correction as [`Account::live_conn`].
    pub fn presence(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if let Some(conn) = &state.conn {
            if conn.is_closed() {
                state.online = false;
            }
        }
        state.online
    }

    /// Inserts into the friend set. Duplicate additions are a no-op.
    /// One-directional: the named friend's own set is untouched.
    pub fn add_friend(&self, name: &str) -> bool {
        self.state.lock().unwrap().friends.insert(name.to_string())
    }

    /// Removes from the friend set; `false` when no entry existed.
    pub fn remove_friend(&self, name: &str) -> bool {
        self.state.lock().unwrap().friends.remove(name)
    }

    /// Snapshot of the friend set. Entries are usernames only; presence is
    /// always re-resolved through the directory, never cached here.
    pub fn friends(&self) -> Vec<String> {
        self.state.lock().unwrap().friends.iter().cloned().collect()
    }

    /// Number of messages currently queued for offline delivery.
    pub fn queued_count(&self) -> usize {
        self.state.lock().unwrap().offline_queue.len()
    }
}

/// Thread-safe registry mapping username → account.
///
/// Built once at startup; `insert` exists for seeding and is a no-op on an
/// existing key. There is no removal.
pub struct UserDirectory {
    users: RwLock<HashMap<String, Arc<Account>>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        UserDirectory {
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Builds a directory from a parsed `username → password` mapping.
    /// Later duplicates of a username are ignored.
    pub fn from_credentials<I>(credentials: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let directory = Self::new();
        for (username, password) in credentials {
            directory.insert(Account::new(username, password));
        }
        directory
    }

    /// Adds an account. Returns `false` (and drops the argument) when the
    /// username is already present.
    pub fn insert(&self, account: Account) -> bool {
        let mut users = self.users.write().unwrap();
        match users.entry(account.username.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(account));
                true
            }
        }
    }

    pub fn lookup(&self, username: &str) -> Option<Arc<Account>> {
        self.users.read().unwrap().get(username).cloned()
    }

    /// Stored credential for a username, or `None` for an unknown account.
    pub fn password_for(&self, username: &str) -> Option<String> {
        self.users
            .read()
            .unwrap()
            .get(username)
            .map(|account| account.password.clone())
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().unwrap().is_empty()
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}
