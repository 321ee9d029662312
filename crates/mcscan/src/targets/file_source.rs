use std::fs;
use std::net::IpAddr;
use std::str::FromStr;

use tracing::warn;

use crate::result::Target;
use crate::targets::TargetSource;

/// One target per line: `ip` or `ip:port`. Blank lines and `#`-prefixed
/// comments are skipped. Malformed lines are logged and skipped rather than
/// aborting the whole source.
pub struct FileSource {
    targets: std::vec::IntoIter<Target>,
}

impl FileSource {
    pub fn load(path: &str, default_ports: &[u16]) -> std::io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut targets = Vec::new();

        for (idx, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match parse_line(line, default_ports) {
                Some(parsed) => targets.extend(parsed),
                None => warn!(path, line = idx + 1, entry = line, "skipping malformed target line"),
            }
        }

        Ok(Self {
            targets: targets.into_iter(),
        })
    }
}

fn parse_line(line: &str, default_ports: &[u16]) -> Option<Vec<Target>> {
    if let Some((host, port)) = line.rsplit_once(':') {
        if let (Ok(addr), Ok(port)) = (IpAddr::from_str(host), port.parse::<u16>()) {
            return Some(vec![Target::new(addr, port)]);
        }
    }

    let addr = IpAddr::from_str(line).ok()?;
    Some(default_ports.iter().map(|&port| Target::new(addr, port)).collect())
}

impl TargetSource for FileSource {
    fn next(&mut self) -> Option<Target> {
        self.targets.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use std::io::Write;

    #[test]
    fn parses_bare_ip_and_ip_port_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# a comment").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "203.0.113.9").unwrap();
        writeln!(file, "203.0.113.10:25566").unwrap();

        let mut source = FileSource::load(file.path().to_str().unwrap(), &[25565]).unwrap();

        let first = source.next().unwrap();
        assert_eq!(first.port, 25565);
        let second = source.next().unwrap();
        assert_eq!(second.port, 25566);
        assert!(source.next().is_none());
    }
}
