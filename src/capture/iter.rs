// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Saved-PCAP iteration (`spec.md` §4.2, C2).
//!
//! Grounded on `examples/original_source/VideoTester/sniffer.py`'s
//! `PcapIter`, rebuilt as a plain (blocking — see `spec.md` §5's suspension
//! points) [`Iterator`] over a `pcap::Capture<pcap::Offline>`.

use std::path::Path;

use super::offsets::{compute_offsets, HeaderOffsets};
use crate::error::Result;

/// One packet as yielded by [`PcapIterator`]: the captured length, the raw
/// frame bytes, and the PCAP timestamp in seconds.
#[derive(Debug, Clone)]
pub struct CapturedPacket {
    pub captured_length: u32,
    pub data: Vec<u8>,
    pub timestamp: f64,
}

/// Iterates a saved PCAP file in file order, applying a BPF filter.
pub struct PcapIterator {
    capture: pcap::Capture<pcap::Offline>,
}

impl PcapIterator {
    pub fn open(path: impl AsRef<Path>, filter: &str) -> Result<Self> {
        let mut capture = pcap::Capture::from_file(path)?;
        capture.filter(filter, false)?;
        Ok(Self { capture })
    }

    pub fn linktype(&self) -> pcap::Linktype {
        self.capture.get_datalink()
    }

    /// Computes the data-link/network/transport header offsets for a packet
    /// yielded by this iterator, using its link type.
    pub fn offsets(&self, pkt: &[u8]) -> Result<HeaderOffsets> {
        compute_offsets(self.linktype(), pkt)
    }
}

impl Iterator for PcapIterator {
    type Item = Result<CapturedPacket>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.capture.next_packet() {
            Ok(pkt) => {
                let timestamp =
                    pkt.header.ts.tv_sec as f64 + pkt.header.ts.tv_usec as f64 / 1_000_000.0;
                Some(Ok(CapturedPacket {
                    captured_length: pkt.header.caplen,
                    data: pkt.data.to_vec(),
                    timestamp,
                }))
            }
            Err(pcap::Error::NoMorePackets) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}
