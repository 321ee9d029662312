use std::net::IpAddr;

use ipnet::IpNet;
use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::result::Target;
use crate::targets::{is_private_or_reserved, TargetSource};

/// Cartesian product of every host address in one or more CIDR ranges with
/// a configured port list. When `randomize_scan_order` is set, addresses
/// are drawn in Fisher-Yates-shuffled batches of `batch_size` rather than
/// sequentially — a full-universe shuffle isn't required by the spec, only
/// batch-level randomization.
pub struct RangeSource {
    networks: Vec<IpNet>,
    network_idx: usize,
    host_iter: Box<dyn Iterator<Item = IpAddr> + Send>,
    ports: Vec<u16>,
    port_idx: usize,
    batch: Vec<IpAddr>,
    batch_idx: usize,
    batch_size: usize,
    randomize: bool,
    skip_private: bool,
    skip_reserved: bool,
}

impl RangeSource {
    pub fn new(
        networks: Vec<IpNet>,
        ports: Vec<u16>,
        batch_size: usize,
        randomize: bool,
        skip_private: bool,
        skip_reserved: bool,
    ) -> Self {
        let mut source = Self {
            networks,
            network_idx: 0,
            host_iter: Box::new(std::iter::empty()),
            ports,
            port_idx: 0,
            batch: Vec::new(),
            batch_idx: 0,
            batch_size: batch_size.max(1),
            randomize,
            skip_private,
            skip_reserved,
        };
        source.advance_network();
        source
    }

    fn advance_network(&mut self) {
        self.host_iter = match self.networks.get(self.network_idx) {
            Some(net) => Box::new(net.hosts()),
            None => Box::new(std::iter::empty()),
        };
    }

    fn refill_batch(&mut self) -> bool {
        self.batch.clear();
        self.batch_idx = 0;

        while self.batch.len() < self.batch_size {
            match self.host_iter.next() {
                Some(addr) => {
                    if !is_private_or_reserved(addr, self.skip_private, self.skip_reserved) {
                        self.batch.push(addr);
                    }
                }
                None => {
                    self.network_idx += 1;
                    if self.network_idx >= self.networks.len() {
                        break;
                    }
                    self.advance_network();
                }
            }
        }

        if self.randomize {
            self.batch.shuffle(&mut thread_rng());
        }

        !self.batch.is_empty()
    }
}

impl TargetSource for RangeSource {
    fn next(&mut self) -> Option<Target> {
        loop {
            if let Some(addr) = self.batch.get(self.batch_idx).copied() {
                let port = *self.ports.get(self.port_idx)?;
                if self.port_idx + 1 < self.ports.len() {
                    self.port_idx += 1;
                } else {
                    self.port_idx = 0;
                    self.batch_idx += 1;
                }
                return Some(Target::new(addr, port));
            }

            if !self.refill_batch() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn enumerates_cartesian_product_of_hosts_and_ports() {
        let net = IpNet::from_str("203.0.113.0/30").unwrap();
        let mut source = RangeSource::new(vec![net], vec![25565, 25566], 16, false, false, false);

        let mut seen = Vec::new();
        while let Some(target) = source.next() {
            seen.push((target.addr, target.port));
        }

        // /30 has 2 usable host addresses (.1, .2) by ipnet::hosts() semantics.
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn skips_private_ranges_when_requested() {
        let net = IpNet::from_str("10.0.0.0/29").unwrap();
        let mut source = RangeSource::new(vec![net], vec![25565], 16, false, true, true);
        assert_eq!(source.next(), None);
    }
}
