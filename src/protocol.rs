//! Wire Protocol
//!
//! Text commands, one per socket read. A client message is a prefix up to and
//! including the first `=`, followed by `.`-separated content fields. Prefixes
//! are case-sensitive. Responses are single newline-terminated lines built by
//! the helpers below.

use crate::directory::QueuedMessage;

/// Command prefixes (client → server).
pub const LOGIN: &str = "LOGIN REQUEST=";
pub const FRIENDS_LIST: &str = "FRIENDS LIST REQUEST=";
pub const SEND_MESSAGE: &str = "SEND MESSAGE REQUEST=";
pub const ADD_FRIEND: &str = "ADD FRIEND REQUEST=";
pub const REMOVE_FRIEND: &str = "REMOVE FRIEND REQUEST=";
pub const EXIT: &str = "EXIT REQUEST=";

/// Response prefix for friends-list replies.
pub const SHOW_FRIENDS: &str = "SHOW FRIENDS LIST=";
/// Push prefix for server-initiated message delivery.
pub const INCOMING: &str = "INCOMING UMESSAGE=";

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login {
        username: String,
        password: String,
    },
    FriendsList {
        username: String,
    },
    SendMessage {
        destination: String,
        source: String,
        content: String,
    },
    AddFriend {
        username: String,
        friend: String,
    },
    RemoveFriend {
        username: String,
        friend: String,
    },
    Exit {
        username: String,
    },
}

/// Parse failure for an incoming message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("message has no `=` prefix separator")]
    MissingPrefix,
    #[error("unrecognized prefix `{0}`")]
    UnknownPrefix(String),
    #[error("malformed `{prefix}` content: expected {expected} `.`-separated fields")]
    MalformedContent {
        prefix: &'static str,
        expected: usize,
        content: String,
    },
}

impl ParseError {
    /// Generic failure line for malformed content of a known command, where
    /// the protocol has one. Unknown prefixes get no response at all.
    pub fn failure_reply(&self) -> Option<String> {
        match self {
            ParseError::MalformedContent {
                prefix, content, ..
            } => match *prefix {
                LOGIN => Some(login_retry()),
                SEND_MESSAGE => {
                    let destination = content.split('.').next().unwrap_or_default();
                    Some(send_failed_unknown(destination))
                }
                ADD_FRIEND => Some(add_friend_failed(content)),
                REMOVE_FRIEND => Some(remove_friend_result(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Parses one trimmed wire message into a [`Command`].
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let eq = line.find('=').ok_or(ParseError::MissingPrefix)?;
    let (prefix, content) = line.split_at(eq + 1);

    match prefix {
        LOGIN => {
            // The password is everything after the first `.`.
            let (username, password) =
                split_two(content).ok_or_else(|| malformed(LOGIN, 2, content))?;
            Ok(Command::Login { username, password })
        }
        FRIENDS_LIST => Ok(Command::FriendsList {
            username: content.to_string(),
        }),
        SEND_MESSAGE => {
            // Content may itself contain `.`, so split into at most 3 parts.
            let mut parts = content.splitn(3, '.');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(destination), Some(source), Some(content)) => Ok(Command::SendMessage {
                    destination: destination.to_string(),
                    source: source.to_string(),
                    content: content.to_string(),
                }),
                _ => Err(malformed(SEND_MESSAGE, 3, content)),
            }
        }
        ADD_FRIEND => {
            let (username, friend) =
                split_two(content).ok_or_else(|| malformed(ADD_FRIEND, 2, content))?;
            Ok(Command::AddFriend { username, friend })
        }
        REMOVE_FRIEND => {
            let (username, friend) =
                split_two(content).ok_or_else(|| malformed(REMOVE_FRIEND, 2, content))?;
            Ok(Command::RemoveFriend { username, friend })
        }
        EXIT => Ok(Command::Exit {
            username: content.to_string(),
        }),
        other => Err(ParseError::UnknownPrefix(other.to_string())),
    }
}

fn split_two(content: &str) -> Option<(String, String)> {
    let (first, second) = content.split_once('.')?;
    Some((first.to_string(), second.to_string()))
}

fn malformed(prefix: &'static str, expected: usize, content: &str) -> ParseError {
    ParseError::MalformedContent {
        prefix,
        expected,
        content: content.to_string(),
    }
}

// ============================================================================
// Response lines (server → client)
// ============================================================================

pub fn login_retry() -> String {
    format!("{LOGIN}RETRY")
}

/// Success line with every queued offline message rendered inline, in append
/// order, each as `sender.content.`.
pub fn login_success(queued: &[QueuedMessage]) -> String {
    let mut line = format!("{LOGIN}SUCCESS.");
    for message in queued {
        line.push_str(&message.sender);
        line.push('.');
        line.push_str(&message.content);
        line.push('.');
    }
    line
}

/// Friends-list reply. An empty set yields the distinguished `null` payload
/// rather than an empty list.
pub fn friends_list(entries: &[(String, bool)]) -> String {
    if entries.is_empty() {
        return format!("{SHOW_FRIENDS}null");
    }
    let mut line = String::from(SHOW_FRIENDS);
    for (name, online) in entries {
        line.push_str(name);
        line.push('.');
        line.push_str(if *online { "true" } else { "false" });
        line.push('.');
    }
    line
}

pub fn send_failed_unknown(destination: &str) -> String {
    format!("SEND MESSAGE REQUEST FAILED={destination}")
}

pub fn send_deferred(destination: &str) -> String {
    format!("SEND UMESSAGE FAILED={destination}")
}

pub fn send_disconnect(destination: &str) -> String {
    format!("SEND UMESSAGE DISCONNECT={destination}")
}

pub fn incoming_message(source: &str, content: &str) -> String {
    format!("{INCOMING}{source}.{content}")
}

pub fn add_friend_success() -> String {
    format!("{ADD_FRIEND}SUCCESS")
}

pub fn add_friend_failed(friend: &str) -> String {
    format!("{ADD_FRIEND}FAILED.{friend}")
}

pub fn remove_friend_result(removed: bool) -> String {
    if removed {
        format!("{REMOVE_FRIEND}SUCCESSFUL")
    } else {
        format!("{REMOVE_FRIEND}FAILED")
    }
}
