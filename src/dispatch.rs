//! Message Dispatch
//!
//! Stateless routing over the fixed command set. Each handler reads or
//! mutates directory state and produces at most one reply line for the
//! requesting session, plus (for live message delivery) one push line into
//! the destination session's channel.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::directory::{PushSender, UserDirectory};
use crate::metrics::RelayMetrics;
use crate::protocol::{self, Command};

/// What the session should do after a command has been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Response line for the requesting client, if the command produces one.
    pub line: Option<String>,
    /// True when the session loop should terminate (EXIT).
    pub disconnect: bool,
}

impl Reply {
    fn respond(line: String) -> Self {
        Reply {
            line: Some(line),
            disconnect: false,
        }
    }

    fn silent() -> Self {
        Reply {
            line: None,
            disconnect: false,
        }
    }

    fn hangup() -> Self {
        Reply {
            line: None,
            disconnect: true,
        }
    }
}

/// Routes parsed commands to the directory.
pub struct Dispatcher {
    directory: Arc<UserDirectory>,
    metrics: RelayMetrics,
}

impl Dispatcher {
    pub fn new(directory: Arc<UserDirectory>, metrics: RelayMetrics) -> Self {
        Dispatcher { directory, metrics }
    }

    /// Handles one parsed command on behalf of a session. `conn` is the
    /// session's push channel; LOGIN attaches it to the account.
    pub fn dispatch(&self, command: Command, conn: &PushSender) -> Reply {
        match command {
            Command::Login { username, password } => self.login(&username, &password, conn),
            Command::FriendsList { username } => self.friends_list(&username),
            Command::SendMessage {
                destination,
                source,
                content,
            } => self.send_message(&destination, &source, &content),
            Command::AddFriend { username, friend } => self.add_friend(&username, &friend),
            Command::RemoveFriend { username, friend } => self.remove_friend(&username, &friend),
            Command::Exit { username } => self.exit(&username),
        }
    }

    fn login(&self, username: &str, password: &str, conn: &PushSender) -> Reply {
        // Unknown username and wrong password produce the same RETRY; the
        // response must not reveal which field was wrong.
        match self.directory.password_for(username) {
            Some(stored) if stored == password => {}
            _ => {
                self.metrics.logins_rejected.inc();
                return Reply::respond(protocol::login_retry());
            }
        }
        let Some(account) = self.directory.lookup(username) else {
            return Reply::respond(protocol::login_retry());
        };

        let queued = account.begin_session(conn.clone());
        self.metrics.logins_succeeded.inc();
        debug!(
            "{} logged in, {} queued messages delivered",
            username,
            queued.len()
        );
        Reply::respond(protocol::login_success(&queued))
    }

    fn friends_list(&self, username: &str) -> Reply {
        let Some(account) = self.directory.lookup(username) else {
            return Reply::respond(protocol::friends_list(&[]));
        };

        // Presence is re-resolved through the directory for every entry; a
        // friend whose session died without an EXIT is corrected to offline
        // here, and a name that no longer resolves reports offline.
        let entries: Vec<(String, bool)> = account
            .friends()
            .into_iter()
            .map(|name| {
                let online = self
                    .directory
                    .lookup(&name)
                    .map(|friend| friend.presence())
                    .unwrap_or(false);
                (name, online)
            })
            .collect();

        Reply::respond(protocol::friends_list(&entries))
    }

    fn send_message(&self, destination: &str, source: &str, content: &str) -> Reply {
        let Some(dest) = self.directory.lookup(destination) else {
            return Reply::respond(protocol::send_failed_unknown(destination));
        };

        match dest.live_conn() {
            Some(conn) => {
                // Fire-and-forget: nothing is sent back to the sender on
                // success, and a failed push is reported, not retried.
                let push = protocol::incoming_message(source, content);
                match conn.try_send(push) {
                    Ok(()) => {
                        self.metrics.messages_relayed.inc();
                        Reply::silent()
                    }
                    Err(_) => {
                        self.metrics.messages_dropped.inc();
                        warn!("Push to {} failed, message lost", destination);
                        Reply::respond(protocol::send_disconnect(destination))
                    }
                }
            }
            None => {
                dest.defer_message(source, content);
                self.metrics.messages_queued.inc();
                Reply::respond(protocol::send_deferred(destination))
            }
        }
    }

    fn add_friend(&self, username: &str, friend: &str) -> Reply {
        if self.directory.lookup(friend).is_none() {
            return Reply::respond(protocol::add_friend_failed(friend));
        }
        match self.directory.lookup(username) {
            Some(account) => {
                // Duplicate additions are a no-op; the relation stays
                // one-directional.
                account.add_friend(friend);
                Reply::respond(protocol::add_friend_success())
            }
            None => Reply::respond(protocol::add_friend_failed(friend)),
        }
    }

    fn remove_friend(&self, username: &str, friend: &str) -> Reply {
        let removed = self
            .directory
            .lookup(username)
            .map(|account| account.remove_friend(friend))
            .unwrap_or(false);
        Reply::respond(protocol::remove_friend_result(removed))
    }

    fn exit(&self, username: &str) -> Reply {
        if let Some(account) = self.directory.lookup(username) {
            account.set_offline();
        }
        // Closing the connection is the session's own job.
        Reply::hangup()
    }
}
