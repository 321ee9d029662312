use std::io::{BufRead, BufReader, Read};
use std::net::IpAddr;
use std::str::FromStr;

use tracing::warn;

use crate::result::Target;
use crate::targets::TargetSource;

/// Drains `address[:port] `-per-line records from any byte stream — in
/// practice the stdout of a discovery tool (masscan, zmap, a shodan export)
/// piped into the scanner. The reader is generic so tests can hand it an
/// in-memory buffer instead of a child process's stdout.
pub struct ExternalSource<R: Read> {
    lines: std::io::Lines<BufReader<R>>,
    default_port: u16,
}

impl<R: Read> ExternalSource<R> {
    pub fn new(reader: R, default_port: u16) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            default_port,
        }
    }
}

impl<R: Read + Send> TargetSource for ExternalSource<R> {
    fn next(&mut self) -> Option<Target> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "external discovery stream read error");
                    return None;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((host, port)) = line.rsplit_once(':') {
                if let (Ok(addr), Ok(port)) = (IpAddr::from_str(host), port.parse::<u16>()) {
                    return Some(Target::new(addr, port));
                }
            }

            match IpAddr::from_str(line) {
                Ok(addr) => return Some(Target::new(addr, self.default_port)),
                Err(_) => {
                    warn!(entry = line, "skipping unparseable external discovery entry");
                    continue;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_targets_from_a_byte_stream() {
        let input = "203.0.113.5\n203.0.113.6:25566\n\ngarbage\n";
        let mut source = ExternalSource::new(Cursor::new(input), 25565);

        let first = source.next().unwrap();
        assert_eq!(first.port, 25565);
        let second = source.next().unwrap();
        assert_eq!(second.port, 25566);
        assert!(source.next().is_none());
    }
}
