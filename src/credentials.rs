//! Credential Store
//!
//! Loads the persisted `username.password` mapping the directory is seeded
//! from. One pair per line, split on the first `.`. When the file does not
//! exist it is created with a single default account, so a fresh install can
//! always log in. Credentials are stored and compared in plaintext, a known
//! weakness carried from the original design.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::warn;

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "password";

/// Loads the credential file, creating it with the single default account
/// when it does not exist.
pub fn load_or_create(path: &Path) -> io::Result<Vec<(String, String)>> {
    if !path.exists() {
        let mut file = fs::File::create(path)?;
        writeln!(file, "{DEFAULT_USERNAME}.{DEFAULT_PASSWORD}")?;
        return Ok(vec![(
            DEFAULT_USERNAME.to_string(),
            DEFAULT_PASSWORD.to_string(),
        )]);
    }

    let contents = fs::read_to_string(path)?;
    Ok(parse(&contents))
}

/// Parses credential lines. Malformed lines are skipped with a warning, not
/// fatal: one bad entry must not take the whole directory down.
pub fn parse(contents: &str) -> Vec<(String, String)> {
    let mut credentials = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once('.') {
            Some((username, password)) if !username.is_empty() => {
                credentials.push((username.to_string(), password.to_string()));
            }
            _ => warn!("Skipping malformed credential line {}", index + 1),
        }
    }
    credentials
}
