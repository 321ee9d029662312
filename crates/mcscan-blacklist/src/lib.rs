//! CIDR longest-prefix-match blacklist over IPv4 and IPv6, loaded from a
//! plain-text file and optionally kept fresh by polling its mtime.

mod blacklist;
mod error;
mod trie;
mod watcher;

pub use blacklist::Blacklist;
pub use error::BlacklistError;
pub use watcher::{spawn_auto_update, spawn_auto_update_with_interval};
