use std::fs;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::str::FromStr;

use ipnet::IpNet;
use tracing::{debug, warn};

use crate::error::BlacklistError;
use crate::trie::PrefixTrie;

/// A loaded set of blocked IPv4/IPv6 networks, queried by longest-prefix
/// match. One entry per line in the source file: a bare IP (treated as a
/// host route, `/32` or `/128`) or a CIDR. Blank lines and `#`-prefixed
/// comments are ignored.
#[derive(Default)]
pub struct Blacklist {
    v4: PrefixTrie,
    v6: PrefixTrie,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses blacklist entries out of `text`, as read from a file at
    /// `path` (used only to produce useful error messages).
    pub fn parse(path: &str, text: &str) -> Result<Self, BlacklistError> {
        let mut blacklist = Blacklist::new();

        for (idx, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let net = parse_entry(line).ok_or_else(|| BlacklistError::InvalidEntry {
                path: path.to_string(),
                line: idx + 1,
                entry: line.to_string(),
            })?;

            blacklist.insert(net, line.to_string());
        }

        debug!(path, entries = blacklist.len(), "parsed blacklist file");
        Ok(blacklist)
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, BlacklistError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| BlacklistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&path.display().to_string(), &text)
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, net: IpNet, label: String) {
        match net {
            IpNet::V4(v4) => {
                let addr = ipv4_to_u128(v4.network());
                self.v4.insert(addr, v4.prefix_len(), label);
            }
            IpNet::V6(v6) => {
                let addr = ipv6_to_u128(v6.network());
                self.v6.insert(addr, v6.prefix_len(), label);
            }
        }
    }

    /// Returns the label of the covering network if `addr` is blocked.
    pub fn matched(&self, addr: IpAddr) -> Option<&str> {
        match addr {
            IpAddr::V4(v4) => self.v4.longest_match(ipv4_to_u128(v4), 32),
            IpAddr::V6(v6) => self.v6.longest_match(ipv6_to_u128(v6), 128),
        }
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        self.matched(addr).is_some()
    }
}

fn parse_entry(line: &str) -> Option<IpNet> {
    if let Ok(net) = IpNet::from_str(line) {
        return Some(net);
    }
    if let Ok(ip) = IpAddr::from_str(line) {
        return Some(IpNet::new(ip, if ip.is_ipv4() { 32 } else { 128 }).ok()?);
    }
    None
}

fn ipv4_to_u128(addr: Ipv4Addr) -> u128 {
    (u32::from(addr) as u128) << 96
}

fn ipv6_to_u128(addr: Ipv6Addr) -> u128 {
    u128::from(addr)
}

/// Returns the file's current modification time, used by the auto-update
/// poller to detect changes without re-reading the file on every tick.
pub(crate) fn file_mtime(path: &Path) -> Option<std::time::SystemTime> {
    match fs::metadata(path) {
        Ok(meta) => meta.modified().ok(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not stat blacklist file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blank_and_comment_lines() {
        let text = "\n# a comment\n10.0.0.0/8\n\n  # another\n";
        let blacklist = Blacklist::parse("test.txt", text).unwrap();
        assert_eq!(blacklist.len(), 1);
    }

    #[test]
    fn bare_ip_becomes_host_route() {
        let blacklist = Blacklist::parse("test.txt", "203.0.113.7").unwrap();
        assert!(blacklist.contains("203.0.113.7".parse().unwrap()));
        assert!(!blacklist.contains("203.0.113.8".parse().unwrap()));
    }

    #[test]
    fn cidr_matches_contained_address() {
        let blacklist = Blacklist::parse("test.txt", "10.0.0.0/8").unwrap();
        assert!(blacklist.contains("10.200.3.4".parse().unwrap()));
        assert!(!blacklist.contains("11.0.0.1".parse().unwrap()));
    }

    #[test]
    fn ipv6_cidr_is_supported() {
        let blacklist = Blacklist::parse("test.txt", "2001:db8::/32").unwrap();
        assert!(blacklist.contains("2001:db8::1".parse().unwrap()));
        assert!(!blacklist.contains("2001:db9::1".parse().unwrap()));
    }

    #[test]
    fn invalid_entry_reports_line_number() {
        let err = Blacklist::parse("test.txt", "10.0.0.0/8\nnot-an-ip\n").unwrap_err();
        match err {
            BlacklistError::InvalidEntry { line, .. } => assert_eq!(line, 2),
            other => panic!("expected InvalidEntry, got {other:?}"),
        }
    }
}
